//! Cascade coordinator for account deletion
//!
//! The cascade is a fixed two-stage sequence: first every task owned by the
//! user is deleted, then the user's sessions are revoked and the credential
//! removed. Stage two is only entered after stage one fully succeeds. A
//! failure is reported with its stage so the caller can tell "nothing
//! happened, retry from the start" (tasks stage) apart from "tasks are gone
//! but the credential remains" (credential stage).

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::SqlitePool;
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

/// The stage an account-deletion cascade was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStage {
    TasksDeleting,
    CredentialDeleting,
}

impl fmt::Display for CascadeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeStage::TasksDeleting => write!(f, "task deletion"),
            CascadeStage::CredentialDeleting => write!(f, "credential deletion"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("cascade failed during {stage}: {source}")]
    Stage {
        stage: CascadeStage,
        source: sqlx::Error,
    },
}

impl CascadeError {
    pub fn stage(&self) -> CascadeStage {
        match self {
            CascadeError::Stage { stage, .. } => *stage,
        }
    }
}

impl From<CascadeError> for crate::common::ApiError {
    fn from(e: CascadeError) -> Self {
        crate::common::ApiError::CascadeFailed(e.stage())
    }
}

pub struct CascadeCoordinator {
    db: SqlitePool,
}

impl CascadeCoordinator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Run the deletion cascade for one user
    ///
    /// On a tasks-stage failure the user, their sessions and their remaining
    /// tasks are left intact and the whole operation is retryable from the
    /// start.
    pub async fn delete_account(&self, user_id: &str) -> Result<(), CascadeError> {
        // Stage 1: delete every task owned by the user
        let removed = sqlx::query("DELETE FROM tasks WHERE owner_id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Cascade failed deleting tasks");
                CascadeError::Stage {
                    stage: CascadeStage::TasksDeleting,
                    source: e,
                }
            })?
            .rows_affected();

        info!(user_id = %user_id, removed = removed, "Cascade stage 1 complete: tasks deleted");

        // Stage 2: revoke sessions, then remove the credential
        sqlx::query("UPDATE sessions SET revoked = 1 WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Cascade failed revoking sessions");
                CascadeError::Stage {
                    stage: CascadeStage::CredentialDeleting,
                    source: e,
                }
            })?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Cascade failed deleting credential");
                CascadeError::Stage {
                    stage: CascadeStage::CredentialDeleting,
                    source: e,
                }
            })?;

        info!(user_id = %user_id, "Cascade complete: account deleted");

        Ok(())
    }
}

/// Was this session's password last verified within the recency window?
///
/// `last_verified_at` is the sessions table's `datetime('now')` TEXT format
/// (UTC). Unparseable timestamps count as stale.
pub fn session_recently_verified(
    last_verified_at: &str,
    window_secs: i64,
    now: DateTime<Utc>,
) -> bool {
    match NaiveDateTime::parse_from_str(last_verified_at, "%Y-%m-%d %H:%M:%S") {
        Ok(verified) => {
            now.signed_duration_since(verified.and_utc()) <= chrono::Duration::seconds(window_secs)
        }
        Err(_) => false,
    }
}
