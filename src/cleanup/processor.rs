//! The queue processor: one stateless pass over currently-pending cleanup
//! items. It is invoked by the scheduler; it never loops or retries
//! internally, so a crashed pass costs at most the items it had claimed.

use uuid::Uuid;

use crate::state::SharedState;
use crate::stores::blob::BlobStore;
use crate::stores::identity::IdentityProvider;
use crate::stores::record::RecordStore;
use crate::stores::StoreError;

use super::store;
use super::task::{CleanupAction, CleanupTask, QueueStatus};

#[derive(Debug, Default, PartialEq)]
pub struct ProcessorReport {
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ProcessorReport {
    pub fn total(&self) -> usize {
        self.completed + self.retried + self.failed + self.skipped
    }
}

/// Drain the pending queue once. Items are independent: a failure in one
/// only affects that item's own status.
pub async fn process_pending(state: &SharedState) -> Result<ProcessorReport, StoreError> {
    let pending = store::list_pending(state.records.as_ref()).await?;
    let mut report = ProcessorReport::default();

    for item in pending {
        let Some(claimed) = store::claim(state.records.as_ref(), &item).await? else {
            // Another invocation got there first.
            report.skipped += 1;
            continue;
        };

        match run_task(state, &claimed.task).await {
            Ok(()) => {
                if store::mark_completed(state.records.as_ref(), &claimed).await? {
                    tracing::info!("Cleanup task {} completed", claimed.sort_key());
                    report.completed += 1;
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Cleanup task {} failed on attempt {}: {e}",
                    claimed.sort_key(),
                    claimed.retry_count + 1
                );
                match store::mark_failed(state.records.as_ref(), &claimed).await? {
                    Some(QueueStatus::Failed) => {
                        tracing::error!(
                            "Cleanup task {} exhausted its retries; operator action required",
                            claimed.sort_key()
                        );
                        report.failed += 1;
                    }
                    Some(_) => report.retried += 1,
                    None => report.skipped += 1,
                }
            }
        }
    }

    Ok(report)
}

/// Execute one task. Every branch tolerates re-execution: the work is
/// deletion or disabling, and "already gone" counts as done.
async fn run_task(state: &SharedState, task: &CleanupTask) -> Result<(), StoreError> {
    match &task.action {
        CleanupAction::BlobCleanup { prefix, .. } => {
            purge_blobs(state.blobs.as_ref(), prefix).await
        }
        CleanupAction::RecordCleanup { partition_key } => {
            purge_records(state.records.as_ref(), partition_key).await
        }
        CleanupAction::IdentityDisable { subject, .. } => {
            disable_identity(state.identity.as_ref(), *subject).await
        }
    }
}

/// Delete every record in a member's partition. Re-runnable: an already
/// emptied partition yields nothing to delete.
pub async fn purge_records(
    records: &dyn RecordStore,
    partition_key: &str,
) -> Result<(), StoreError> {
    for record in records.query(partition_key, None).await? {
        records
            .delete(&record.partition_key, &record.sort_key)
            .await?;
    }
    Ok(())
}

/// List and bulk-delete everything under a blob prefix.
pub async fn purge_blobs(blobs: &dyn BlobStore, prefix: &str) -> Result<(), StoreError> {
    let keys = blobs.list(prefix).await?;
    if !keys.is_empty() {
        blobs.delete_batch(&keys).await?;
    }
    Ok(())
}

/// Disable an identity account. An account the provider no longer knows
/// about has nothing left to disable, so not-found is success.
pub async fn disable_identity(
    identity: &dyn IdentityProvider,
    subject: Uuid,
) -> Result<(), StoreError> {
    match identity.disable_user(subject).await {
        Ok(()) | Err(StoreError::NotFound) => Ok(()),
        Err(e) => Err(e),
    }
}
