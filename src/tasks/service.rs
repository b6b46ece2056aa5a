//! Task store: per-owner task records
//!
//! Ownership is enforced in the SQL itself, never by trusting the caller's
//! payload. Update and delete against a task the caller does not own are
//! silent no-ops (`rows_affected == 0`), matching the behavior the mobile
//! client was built against; no change event fires for them.

use sqlx::SqlitePool;
use tracing::{error, info};

use super::models::Task;
use crate::common::{generate_task_id, ApiError};

pub struct TaskService {
    db: SqlitePool,
}

impl TaskService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a new task owned by the caller; the server assigns the id
    pub async fn add_task(
        &self,
        owner_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Task, ApiError> {
        let task_id = generate_task_id();

        sqlx::query("INSERT INTO tasks (id, owner_id, title, description) VALUES (?, ?, ?, ?)")
            .bind(&task_id)
            .bind(owner_id)
            .bind(title)
            .bind(description)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    owner_id = %owner_id,
                    task_id = %task_id,
                    "Database error creating task"
                );
                ApiError::DatabaseError(e)
            })?;

        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
            .bind(&task_id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        info!(
            owner_id = %owner_id,
            task_id = %task_id,
            "Task created"
        );

        Ok(task)
    }

    /// Overwrite a task's fields; returns None (silent no-op) when the task
    /// is absent or owned by someone else
    pub async fn update_task(
        &self,
        caller_id: &str,
        task_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Option<Task>, ApiError> {
        let result = sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, updated_at = datetime('now') \
             WHERE id = ? AND owner_id = ?",
        )
        .bind(title)
        .bind(description)
        .bind(task_id)
        .bind(caller_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            info!(
                caller_id = %caller_id,
                task_id = %task_id,
                "Task update dropped (absent or not owned by caller)"
            );
            return Ok(None);
        }

        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        info!(
            caller_id = %caller_id,
            task_id = %task_id,
            "Task updated"
        );

        Ok(Some(task))
    }

    /// Delete a task; returns false (silent no-op) when the task is absent
    /// or owned by someone else
    pub async fn delete_task(&self, caller_id: &str, task_id: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND owner_id = ?")
            .bind(task_id)
            .bind(caller_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(caller_id = %caller_id, task_id = %task_id, "Task deleted");
        } else {
            info!(
                caller_id = %caller_id,
                task_id = %task_id,
                "Task delete dropped (absent or not owned by caller)"
            );
        }

        Ok(deleted)
    }

    /// Fetch one task; None both when it does not exist and when it belongs
    /// to another user - the store never reveals foreign data
    pub async fn get_task(&self, caller_id: &str, task_id: &str) -> Result<Option<Task>, ApiError> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ? AND owner_id = ?")
            .bind(task_id)
            .bind(caller_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// List exactly the caller's tasks, in commit order
    pub async fn list_tasks(&self, caller_id: &str) -> Result<Vec<Task>, ApiError> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE owner_id = ? ORDER BY rowid")
            .bind(caller_id)
            .fetch_all(&self.db)
            .await
            .map_err(ApiError::DatabaseError)
    }
}
