//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims structure
///
/// `sid` binds the token to a row in the sessions table so that sign-out and
/// account deletion actually invalidate outstanding tokens.
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub sid: String,
    pub exp: usize,
}

/// User database model
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: Option<String>,
}

/// Session database model
///
/// `revoked` uses SQLite's INTEGER boolean convention. `last_verified_at` is
/// bumped whenever the user proves their password (login, reauth, password
/// change) and gates sensitive operations such as account deletion.
#[derive(FromRow, Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub issued_at: String,
    pub last_verified_at: String,
    pub revoked: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ReauthRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}
