//! Account routes

use axum::{routing::delete, Router};

use super::handlers;

/// Creates and returns the account router
///
/// # Routes
/// - `DELETE /api/account` - Cascade-delete the caller's tasks and credential
pub fn account_routes() -> Router {
    Router::new().route("/api/account", delete(handlers::delete_account))
}
