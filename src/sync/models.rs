//! Wire models for task subscription streams

use serde::{Deserialize, Serialize};

use crate::tasks::models::Task;

/// Messages delivered over a subscription stream
///
/// Snapshots are always full state (the complete list, or the task-or-null),
/// so a duplicated or coalesced delivery never requires the client to
/// reconcile partial diffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    // Server → Client
    Connected {
        subscription_id: String,
    },
    TaskListSnapshot {
        tasks: Vec<Task>,
    },
    TaskSnapshot {
        task: Option<Task>,
    },
    Error {
        code: String,
        message: String,
    },
    Pong,
}

/// What a subscription watches
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionScope {
    /// The subscriber's full task list
    OwnerTasks,
    /// A single task by id, still filtered by owner match
    SingleTask { task_id: String },
}
