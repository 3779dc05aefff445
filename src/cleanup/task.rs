use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Retry budget per queue item. Once a task has failed this many
/// processing attempts it is parked as `Failed` for operator attention.
pub const MAX_RETRY_COUNT: i32 = 3;

/// What to retry and the data needed to retry it. The serialized tag is
/// the task type, the variant fields are its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CleanupAction {
    BlobCleanup { bucket: String, prefix: String },
    RecordCleanup { partition_key: String },
    IdentityDisable { realm: String, subject: Uuid },
}

impl CleanupAction {
    pub fn kind(&self) -> &'static str {
        match self {
            CleanupAction::BlobCleanup { .. } => "BLOB_CLEANUP",
            CleanupAction::RecordCleanup { .. } => "RECORD_CLEANUP",
            CleanupAction::IdentityDisable { .. } => "IDENTITY_DISABLE",
        }
    }
}

/// One best-effort step that failed inline during account deletion.
/// Created only by the deletion handler and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupTask {
    pub action: CleanupAction,
    pub owner_id: Uuid,
    /// The error captured when the inline attempt failed. Diagnostic only.
    pub error: String,
    pub created_at: DateTime<Utc>,
}

impl CleanupTask {
    pub fn new(action: CleanupAction, owner_id: Uuid, error: String) -> Self {
        Self {
            action,
            owner_id,
            error,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
        }
    }
}

/// The persisted wrapper around a `CleanupTask`. Only `status`,
/// `retry_count` and `last_attempt` ever change; the task is write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub task: CleanupTask,
    pub status: QueueStatus,
    pub retry_count: i32,
    pub last_attempt: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(task: CleanupTask) -> Self {
        let last_attempt = task.created_at;
        Self {
            task,
            status: QueueStatus::Pending,
            retry_count: 0,
            last_attempt,
        }
    }

    /// Sort key inside the cleanup partition. Type + owner + creation
    /// micros makes separate failures for the same owner distinct items.
    pub fn sort_key(&self) -> String {
        format!(
            "{}#{}#{}",
            self.task.action.kind(),
            self.task.owner_id,
            self.task.created_at.timestamp_micros()
        )
    }
}
