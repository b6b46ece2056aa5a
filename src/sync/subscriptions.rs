//! Change notifier: live subscriptions over the task store
//!
//! Each open stream is registered here with an unbounded sender; publishing a
//! change builds a fresh full snapshot per matching subscription and queues
//! it before the mutating call returns. Delivery to one subscriber follows
//! commit order; ordering across subscribers is not guaranteed.

use axum::extract::ws::Message;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::models::{StreamMessage, SubscriptionScope};
use crate::tasks::service::TaskService;

/// A live subscription over the task store
#[derive(Debug, Clone)]
pub struct Subscription {
    pub user_id: String,
    pub subscription_id: String,
    pub scope: SubscriptionScope,
    pub opened_at: chrono::DateTime<chrono::Utc>,
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
}

impl Subscription {
    /// Does a mutation touching `affected_task_id` (None = bulk change)
    /// produce a snapshot for this subscription?
    fn matches(&self, affected_task_id: Option<&str>) -> bool {
        match (&self.scope, affected_task_id) {
            (SubscriptionScope::OwnerTasks, _) => true,
            (SubscriptionScope::SingleTask { .. }, None) => true,
            (SubscriptionScope::SingleTask { task_id }, Some(affected)) => task_id == affected,
        }
    }
}

/// Manages active subscription streams
#[derive(Clone)]
pub struct SubscriptionManager {
    // Map of user_id -> list of subscription_ids
    owner_index: Arc<RwLock<HashMap<String, Vec<String>>>>,
    // Map of subscription_id -> sender channel
    senders: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<Message>>>>,
    // Map of subscription_id -> Subscription info
    info: Arc<RwLock<HashMap<String, Subscription>>>,
    // Serializes snapshot-build + enqueue so each subscriber's queue
    // observes mutations in commit order
    publish_lock: Arc<Mutex<()>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            owner_index: Arc::new(RwLock::new(HashMap::new())),
            senders: Arc::new(RwLock::new(HashMap::new())),
            info: Arc::new(RwLock::new(HashMap::new())),
            publish_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Register a new subscription stream
    pub async fn register(
        &self,
        user_id: String,
        subscription_id: String,
        scope: SubscriptionScope,
        sender: mpsc::UnboundedSender<Message>,
    ) {
        let now = chrono::Utc::now();

        self.senders
            .write()
            .await
            .insert(subscription_id.clone(), sender);

        let subscription = Subscription {
            user_id: user_id.clone(),
            subscription_id: subscription_id.clone(),
            scope,
            opened_at: now,
            last_heartbeat: now,
        };
        self.info
            .write()
            .await
            .insert(subscription_id.clone(), subscription);

        let mut owners = self.owner_index.write().await;
        owners
            .entry(user_id.clone())
            .or_insert_with(Vec::new)
            .push(subscription_id.clone());

        info!(
            user_id = %user_id,
            subscription_id = %subscription_id,
            "Subscription registered"
        );
    }

    /// Unregister a subscription and release its resources
    ///
    /// Closing a subscription has no effect on the underlying data.
    pub async fn unregister(&self, subscription_id: &str) {
        let sub = self.info.write().await.remove(subscription_id);

        if let Some(sub) = sub {
            self.senders.write().await.remove(subscription_id);

            let mut owners = self.owner_index.write().await;
            if let Some(subs) = owners.get_mut(&sub.user_id) {
                subs.retain(|id| id != subscription_id);
                if subs.is_empty() {
                    owners.remove(&sub.user_id);
                }
            }

            info!(
                user_id = %sub.user_id,
                subscription_id = %subscription_id,
                "Subscription unregistered"
            );
        }
    }

    /// Update heartbeat timestamp for a subscription
    pub async fn update_heartbeat(&self, subscription_id: &str) {
        if let Some(sub) = self.info.write().await.get_mut(subscription_id) {
            sub.last_heartbeat = chrono::Utc::now();
            debug!(subscription_id = %subscription_id, "Heartbeat updated");
        }
    }

    /// Remove stale subscriptions (no heartbeat for more than 60 seconds)
    pub async fn cleanup_stale_subscriptions(&self) {
        let now = chrono::Utc::now();
        let timeout = chrono::Duration::seconds(60);

        let stale: Vec<String> = self
            .info
            .read()
            .await
            .iter()
            .filter(|(_, sub)| now.signed_duration_since(sub.last_heartbeat) > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for subscription_id in stale {
            warn!(subscription_id = %subscription_id, "Removing stale subscription");
            self.unregister(&subscription_id).await;
        }
    }

    /// Start background task for cleaning up stale subscriptions
    pub fn start_cleanup_task(manager: SubscriptionManager) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(30));
            loop {
                interval.tick().await;
                manager.cleanup_stale_subscriptions().await;
            }
        });
    }

    /// Get subscription count for a user
    pub async fn subscription_count_for_user(&self, user_id: &str) -> usize {
        self.owner_index
            .read()
            .await
            .get(user_id)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Get total subscription count
    pub async fn total_subscriptions(&self) -> usize {
        self.senders.read().await.len()
    }

    /// Send a message to a specific subscription
    pub async fn send_to_subscription(
        &self,
        subscription_id: &str,
        message: StreamMessage,
    ) -> Result<(), String> {
        let json = serde_json::to_string(&message)
            .map_err(|e| format!("Failed to serialize message: {}", e))?;

        let senders = self.senders.read().await;
        if let Some(sender) = senders.get(subscription_id) {
            sender
                .send(Message::Text(json))
                .map_err(|e| format!("Failed to send message: {}", e))?;
            Ok(())
        } else {
            Err(format!("Subscription {} not found", subscription_id))
        }
    }

    /// Deliver the current state to a newly opened subscription
    pub async fn send_initial_snapshot(&self, db: &SqlitePool, subscription_id: &str) {
        let _guard = self.publish_lock.lock().await;

        let sub = match self.info.read().await.get(subscription_id).cloned() {
            Some(s) => s,
            None => return,
        };

        self.deliver_snapshot(db, &sub).await;
    }

    /// Fan out a committed mutation to every matching live subscription
    ///
    /// `affected_task_id` is None for bulk changes (e.g. account deletion),
    /// which match every scope. Snapshots are queued into each subscriber's
    /// channel before this returns, so a writer that then waits on its own
    /// stream is guaranteed to observe the write.
    pub async fn publish(&self, db: &SqlitePool, owner_id: &str, affected_task_id: Option<&str>) {
        let _guard = self.publish_lock.lock().await;

        let subscription_ids = self
            .owner_index
            .read()
            .await
            .get(owner_id)
            .cloned()
            .unwrap_or_default();

        for subscription_id in subscription_ids {
            let sub = match self.info.read().await.get(&subscription_id).cloned() {
                Some(s) => s,
                None => continue,
            };

            if !sub.matches(affected_task_id) {
                continue;
            }

            self.deliver_snapshot(db, &sub).await;
        }
    }

    /// Build and enqueue one full snapshot for a subscription
    ///
    /// A storage error here does not terminate the stream; the subscriber
    /// receives an error frame and the next mutation retries naturally.
    async fn deliver_snapshot(&self, db: &SqlitePool, sub: &Subscription) {
        let service = TaskService::new(db.clone());

        let message = match &sub.scope {
            SubscriptionScope::OwnerTasks => match service.list_tasks(&sub.user_id).await {
                Ok(tasks) => StreamMessage::TaskListSnapshot { tasks },
                Err(e) => {
                    error!(
                        error = %e,
                        subscription_id = %sub.subscription_id,
                        "Failed to build task list snapshot"
                    );
                    StreamMessage::Error {
                        code: "SNAPSHOT_ERROR".to_string(),
                        message: "failed to build snapshot".to_string(),
                    }
                }
            },
            SubscriptionScope::SingleTask { task_id } => {
                match service.get_task(&sub.user_id, task_id).await {
                    Ok(task) => StreamMessage::TaskSnapshot { task },
                    Err(e) => {
                        error!(
                            error = %e,
                            subscription_id = %sub.subscription_id,
                            "Failed to build task snapshot"
                        );
                        StreamMessage::Error {
                            code: "SNAPSHOT_ERROR".to_string(),
                            message: "failed to build snapshot".to_string(),
                        }
                    }
                }
            }
        };

        if let Err(e) = self
            .send_to_subscription(&sub.subscription_id, message)
            .await
        {
            // Channel closed mid-disconnect; the cleanup task reaps it
            debug!(
                subscription_id = %sub.subscription_id,
                error = %e,
                "Dropping snapshot for closed subscription"
            );
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
