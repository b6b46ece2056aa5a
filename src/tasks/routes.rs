//! Task routes

use axum::{
    routing::{get, put},
    Router,
};

use super::handlers;

/// Creates and returns the task router
///
/// # Routes
/// - `POST /api/tasks` - Create a task
/// - `GET /api/tasks` - One-shot list of the caller's tasks
/// - `GET /api/tasks/:id` - One-shot single task (null when absent/foreign)
/// - `PUT /api/tasks/:id` - Overwrite a task (204 on silent no-op)
/// - `DELETE /api/tasks/:id` - Delete a task (204, no-op included)
pub fn tasks_routes() -> Router {
    Router::new()
        .route(
            "/api/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/tasks/:id",
            put(handlers::update_task)
                .get(handlers::get_task)
                .delete(handlers::delete_task),
        )
}
