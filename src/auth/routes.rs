//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/register` - Create an account, returns a session token
/// - `POST /api/auth/login` - Email/password login
/// - `POST /api/auth/logout` - Revoke the presented session (idempotent)
/// - `POST /api/auth/reauth` - Re-verify the password for the live session
/// - `POST /api/auth/password` - Change password (requires current password)
/// - `GET /api/me` - Get current user information
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/reauth", post(handlers::reauth))
        .route("/api/auth/password", post(handlers::change_password))
        .route("/api/me", get(handlers::me))
}
