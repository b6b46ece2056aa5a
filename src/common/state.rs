// Application state shared across all modules

use sqlx::SqlitePool;

use crate::sync::subscriptions::SubscriptionManager;

/// Application state containing the database pool and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt_secret: String,
    /// How recently a session must have been verified (login/reauth) for
    /// sensitive operations such as account deletion, in seconds.
    pub reauth_window_secs: i64,
    pub subscriptions: SubscriptionManager,
}
