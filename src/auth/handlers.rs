//! Authentication handlers

use axum::extract::{Extension, Json};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::credentials::CredentialService;
use super::extractors::AuthedUser;
use super::models::{ChangePasswordRequest, LoginRequest, ReauthRequest, RegisterRequest, User};
use super::sessions::{decode_claims, SessionService};
use super::validators;
use crate::common::helpers::safe_token_log;
use crate::common::{safe_email_log, ApiError, AppState};

/// POST /api/auth/register
/// Creates an account and signs the new user in
///
/// # Response
/// ```json
/// {
///   "user_id": "U_K7NP3X",
///   "token": "<jwt token>"
/// }
/// ```
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    validators::validate_credentials(&payload.email, &payload.password)?;

    let credentials = CredentialService::new(state.db.clone());
    let user = credentials.register(&payload.email, &payload.password).await?;

    let sessions = SessionService::new(state.db.clone());
    let (_session, token) = sessions.issue(&user.id, &state.jwt_secret).await?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User registered and signed in"
    );

    Ok(Json(serde_json::json!({
        "user_id": user.id,
        "token": token,
    })))
}

/// POST /api/auth/login
/// Verifies credentials and issues a fresh session token
///
/// Unknown email and wrong password are indistinguishable in the response.
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let credentials = CredentialService::new(state.db.clone());
    let user = credentials.verify(&payload.email, &payload.password).await?;

    let sessions = SessionService::new(state.db.clone());
    let (_session, token) = sessions.issue(&user.id, &state.jwt_secret).await?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User logged in"
    );

    Ok(Json(serde_json::json!({
        "user_id": user.id,
        "token": token,
    })))
}

/// POST /api/auth/logout
/// Revokes the presented session; idempotent
///
/// A malformed, expired or already-revoked token still yields 204 so that
/// sign-out never fails on the client.
pub async fn logout(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let state = state_lock.read().await.clone();

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.strip_prefix("Bearer ").unwrap_or(s).to_string());

    if let Some(token) = token {
        if let Ok(claims) = decode_claims(&token, &state.jwt_secret) {
            let sessions = SessionService::new(state.db.clone());
            sessions.revoke(&claims.sid).await?;
            info!(session_id = %claims.sid, "User logged out");
        } else {
            debug!(token = %safe_token_log(&token), "Logout with undecodable token");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/reauth
/// Re-verifies the caller's password and refreshes the session's
/// verification timestamp, opening the recency window for sensitive
/// operations such as account deletion.
pub async fn reauth(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<ReauthRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let credentials = CredentialService::new(state.db.clone());
    credentials.verify_by_id(&authed.id, &payload.password).await?;

    let sessions = SessionService::new(state.db.clone());
    sessions.mark_verified(&authed.session_id).await?;

    info!(
        user_id = %authed.id,
        session_id = %authed.session_id,
        "Session reauthenticated"
    );

    Ok(Json(serde_json::json!({
        "message": "reauthenticated"
    })))
}

/// POST /api/auth/password
/// Changes the caller's password after re-verifying the current one
///
/// The successful re-verification also refreshes the session recency window.
pub async fn change_password(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    validators::validate_new_password(&payload.new_password)?;

    let credentials = CredentialService::new(state.db.clone());
    credentials
        .rotate_password(&authed.id, &payload.old_password, &payload.new_password)
        .await?;

    let sessions = SessionService::new(state.db.clone());
    sessions.mark_verified(&authed.session_id).await?;

    info!(user_id = %authed.id, "Password changed");

    Ok(Json(serde_json::json!({
        "message": "password updated"
    })))
}

/// GET /api/me
/// Returns the current authenticated user's information
pub async fn me(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(serde_json::json!({
        "user": user,
    })))
}
