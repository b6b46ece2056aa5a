//! Account deletion handler

use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::coordinator::{session_recently_verified, CascadeCoordinator};
use crate::auth::extractors::AuthedUser;
use crate::common::{ApiError, AppState};

/// DELETE /api/account
/// Deletes the caller's tasks and credential as one cascade
///
/// Requires a freshly verified session: the caller must have proven their
/// password (login/reauth) within the configured recency window, otherwise
/// 428 is returned and nothing is attempted.
pub async fn delete_account(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let state = state_lock.read().await.clone();

    if !session_recently_verified(
        &authed.last_verified_at,
        state.reauth_window_secs,
        Utc::now(),
    ) {
        warn!(
            user_id = %authed.id,
            session_id = %authed.session_id,
            "Account deletion rejected: session verification is stale"
        );
        return Err(ApiError::ReauthRequired(
            "recent authentication required; re-verify your password first".to_string(),
        ));
    }

    let coordinator = CascadeCoordinator::new(state.db.clone());
    coordinator.delete_account(&authed.id).await?;

    // Any still-open streams of this user see their data disappear
    state.subscriptions.publish(&state.db, &authed.id, None).await;

    info!(user_id = %authed.id, "Account deleted");

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "account_deleted"
        })),
    ))
}
