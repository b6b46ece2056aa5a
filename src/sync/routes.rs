//! Subscription stream routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the subscription stream router
///
/// # Routes
/// - `GET /ws/tasks?token=` - WebSocket stream of task list snapshots
/// - `GET /ws/tasks/:id?token=` - WebSocket stream of one task (or null)
pub fn sync_routes() -> Router {
    Router::new()
        .route("/ws/tasks", get(handlers::tasks_stream_handler))
        .route("/ws/tasks/:id", get(handlers::task_stream_handler))
}
