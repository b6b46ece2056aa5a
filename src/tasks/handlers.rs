//! Task CRUD handlers
//!
//! Every mutation publishes a change event to the subscription layer after
//! the write commits and before the response is returned, so a client that
//! writes and then waits on its own stream always observes the write.

use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::{Task, TaskInput};
use super::service::TaskService;
use crate::auth::extractors::AuthedUser;
use crate::common::{ApiError, AppState};

/// POST /api/tasks
/// Creates a task owned by the caller
pub async fn create_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<TaskInput>,
) -> Result<Json<Task>, ApiError> {
    let state = state_lock.read().await.clone();

    let service = TaskService::new(state.db.clone());
    let task = service
        .add_task(&authed.id, &payload.title, &payload.description)
        .await?;

    state
        .subscriptions
        .publish(&state.db, &authed.id, Some(&task.id))
        .await;

    Ok(Json(task))
}

/// PUT /api/tasks/:id
/// Overwrites a task's fields; 204 when the write is silently dropped
/// because the task is absent or not owned by the caller
pub async fn update_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(task_id): Path<String>,
    Json(payload): Json<TaskInput>,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();

    let service = TaskService::new(state.db.clone());
    match service
        .update_task(&authed.id, &task_id, &payload.title, &payload.description)
        .await?
    {
        Some(task) => {
            state
                .subscriptions
                .publish(&state.db, &authed.id, Some(&task.id))
                .await;
            Ok((StatusCode::OK, Json(task)).into_response())
        }
        // No-op: no change event fires
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// DELETE /api/tasks/:id
/// Deletes a task; 204 either way (a non-owner delete is a silent no-op)
pub async fn delete_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let state = state_lock.read().await.clone();

    let service = TaskService::new(state.db.clone());
    let deleted = service.delete_task(&authed.id, &task_id).await?;

    if deleted {
        state
            .subscriptions
            .publish(&state.db, &authed.id, Some(&task_id))
            .await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/tasks/:id
/// One-shot read; null both for absent tasks and for tasks owned by others
pub async fn get_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(task_id): Path<String>,
) -> Result<Json<Option<Task>>, ApiError> {
    let state = state_lock.read().await.clone();

    let service = TaskService::new(state.db.clone());
    let task = service.get_task(&authed.id, &task_id).await?;

    Ok(Json(task))
}

/// GET /api/tasks
/// One-shot read of the caller's tasks
pub async fn list_tasks(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<Task>>, ApiError> {
    let state = state_lock.read().await.clone();

    let service = TaskService::new(state.db.clone());
    let tasks = service.list_tasks(&authed.id).await?;

    Ok(Json(tasks))
}
