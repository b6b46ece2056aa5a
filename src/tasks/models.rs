//! Task data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Task database model
///
/// `owner_id` is assigned from the caller's session at creation time and is
/// immutable thereafter; every read and write path filters on it.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Request body for creating or updating a task
///
/// The store deliberately does not enforce non-empty titles; trimming and
/// emptiness checks are a client concern.
#[derive(Debug, Deserialize)]
pub struct TaskInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
}
