//! WebSocket handlers for task subscription streams
//!
//! Opening a stream delivers the current matching state immediately, then a
//! fresh full snapshot after every committed matching mutation. Closing the
//! socket (or going silent past the heartbeat timeout) releases the
//! subscription; it has no effect on the underlying data.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::models::{StreamMessage, SubscriptionScope};
use crate::auth::models::User;
use crate::auth::sessions::SessionService;
use crate::common::{generate_subscription_id, ApiError, AppState};

/// Server ping cadence; well inside the 60s heartbeat timeout so a passive
/// but connected client is never reaped.
const PING_INTERVAL_SECS: u64 = 20;

/// GET /ws/tasks
/// Live stream of the caller's full task list
pub async fn tasks_stream_handler(
    ws: WebSocketUpgrade,
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = authenticate(&state_lock, &params).await?;
    Ok(ws.on_upgrade(move |socket| {
        handle_socket(socket, user_id, SubscriptionScope::OwnerTasks, state_lock)
    }))
}

/// GET /ws/tasks/:id
/// Live stream of a single task (null when absent or owned by someone else)
pub async fn task_stream_handler(
    ws: WebSocketUpgrade,
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(task_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = authenticate(&state_lock, &params).await?;
    Ok(ws.on_upgrade(move |socket| {
        handle_socket(
            socket,
            user_id,
            SubscriptionScope::SingleTask { task_id },
            state_lock,
        )
    }))
}

/// Authenticate a stream-open request from its `token` query parameter
async fn authenticate(
    state_lock: &Arc<RwLock<AppState>>,
    params: &HashMap<String, String>,
) -> Result<String, ApiError> {
    let token = params
        .get("token")
        .ok_or_else(|| ApiError::Unauthorized("Missing authentication token".to_string()))?;

    let state = state_lock.read().await.clone();

    let sessions = SessionService::new(state.db.clone());
    let session = sessions.validate(token, &state.jwt_secret).await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&session.user_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    info!(user_id = %user.id, "Subscription stream authenticated");

    Ok(user.id)
}

/// Drive one subscription stream for its whole lifetime
async fn handle_socket(
    socket: WebSocket,
    user_id: String,
    scope: SubscriptionScope,
    state_lock: Arc<RwLock<AppState>>,
) {
    let subscription_id = generate_subscription_id();

    info!(
        user_id = %user_id,
        subscription_id = %subscription_id,
        scope = ?scope,
        "Subscription stream opened"
    );

    let state = state_lock.read().await.clone();
    let manager = state.subscriptions.clone();

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Channel feeding this connection; snapshots are queued here by publish.
    // The manager holds the only sender, so reaping the subscription closes
    // the channel and ends the forward loop below.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    manager
        .register(user_id.clone(), subscription_id.clone(), scope, tx)
        .await;

    // Confirm, then deliver the current state before any further events
    let _ = manager
        .send_to_subscription(
            &subscription_id,
            StreamMessage::Connected {
                subscription_id: subscription_id.clone(),
            },
        )
        .await;
    manager.send_initial_snapshot(&state.db, &subscription_id).await;

    // Forward queued messages to the WebSocket, interleaved with server
    // pings; clients answer Ping with Pong automatically, which keeps the
    // heartbeat fresh without any client-side cooperation
    let mut send_task = tokio::spawn(async move {
        let mut ping_interval =
            tokio::time::interval(tokio::time::Duration::from_secs(PING_INTERVAL_SECS));
        ping_interval.tick().await;
        loop {
            tokio::select! {
                queued = rx.recv() => match queued {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    // Subscription reaped or unregistered
                    None => break,
                },
                _ = ping_interval.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Consume client frames: heartbeats and close only; the stream is
    // one-directional otherwise
    let manager_recv = manager.clone();
    let subscription_id_recv = subscription_id.clone();
    let user_id_recv = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Ping(_) | Message::Pong(_) => {
                    manager_recv.update_heartbeat(&subscription_id_recv).await;
                }
                Message::Text(text) if text.trim() == "ping" => {
                    manager_recv.update_heartbeat(&subscription_id_recv).await;
                    let _ = manager_recv
                        .send_to_subscription(&subscription_id_recv, StreamMessage::Pong)
                        .await;
                }
                Message::Text(_) | Message::Binary(_) => {
                    warn!(
                        user_id = %user_id_recv,
                        subscription_id = %subscription_id_recv,
                        "Ignoring unexpected client frame on subscription stream"
                    );
                }
                Message::Close(_) => {
                    debug!(
                        subscription_id = %subscription_id_recv,
                        "Subscription stream close frame received"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    // Cleanup: cancellation releases resources immediately and leaves the
    // underlying data untouched
    manager.unregister(&subscription_id).await;

    info!(
        user_id = %user_id,
        subscription_id = %subscription_id,
        "Subscription stream closed"
    );
}
