//! Persistence for cleanup queue items, layered over the record store's
//! reserved `CLEANUP#QUEUE` partition. Every status transition is a
//! conditional write on the expected prior status so that two processor
//! runs can never both own the same item.

use chrono::Utc;

use crate::keys::CLEANUP_PARTITION;
use crate::stores::record::{RecordItem, RecordStore};
use crate::stores::StoreError;

use super::task::{CleanupTask, QueueItem, QueueStatus, MAX_RETRY_COUNT};

fn to_record(item: &QueueItem) -> Result<RecordItem, StoreError> {
    Ok(RecordItem {
        partition_key: CLEANUP_PARTITION.to_string(),
        sort_key: item.sort_key(),
        attributes: serde_json::to_value(item)
            .map_err(|e| StoreError::Backend(format!("serialize queue item: {e}")))?,
    })
}

fn from_record(record: &RecordItem) -> Result<QueueItem, StoreError> {
    serde_json::from_value(record.attributes.clone())
        .map_err(|e| StoreError::Backend(format!("deserialize queue item {}: {e}", record.sort_key)))
}

/// Persist freshly captured tasks as `Pending` items in one pass.
pub async fn enqueue_batch(
    records: &dyn RecordStore,
    tasks: Vec<CleanupTask>,
) -> Result<(), StoreError> {
    for task in tasks {
        let item = QueueItem::new(task);
        records.put(&to_record(&item)?).await?;
    }
    Ok(())
}

/// All queue items, optionally filtered by status, ordered by sort key.
pub async fn list_items(
    records: &dyn RecordStore,
    status: Option<QueueStatus>,
) -> Result<Vec<QueueItem>, StoreError> {
    let rows = records.query(CLEANUP_PARTITION, None).await?;
    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        let item = from_record(row)?;
        if status.is_none_or(|s| item.status == s) {
            items.push(item);
        }
    }
    Ok(items)
}

pub async fn list_pending(records: &dyn RecordStore) -> Result<Vec<QueueItem>, StoreError> {
    list_items(records, Some(QueueStatus::Pending)).await
}

/// Try to move an item from `Pending` to `Processing`. Returns the claimed
/// item, or `None` if another invocation won the race.
pub async fn claim(
    records: &dyn RecordStore,
    item: &QueueItem,
) -> Result<Option<QueueItem>, StoreError> {
    let mut claimed = item.clone();
    claimed.status = QueueStatus::Processing;
    claimed.last_attempt = Utc::now();

    let applied = records
        .put_if_status(&to_record(&claimed)?, QueueStatus::Pending.as_str())
        .await?;
    Ok(applied.then_some(claimed))
}

/// `Processing` -> `Completed`. Returns whether the transition applied.
pub async fn mark_completed(
    records: &dyn RecordStore,
    item: &QueueItem,
) -> Result<bool, StoreError> {
    let mut done = item.clone();
    done.status = QueueStatus::Completed;
    done.last_attempt = Utc::now();
    records
        .put_if_status(&to_record(&done)?, QueueStatus::Processing.as_str())
        .await
}

/// Record a failed attempt: bump the retry count, then either return the
/// item to `Pending` or park it as `Failed` once the budget is spent.
/// Returns the status the item ended up in, or `None` if the conditional
/// write lost out.
pub async fn mark_failed(
    records: &dyn RecordStore,
    item: &QueueItem,
) -> Result<Option<QueueStatus>, StoreError> {
    let mut next = item.clone();
    next.retry_count += 1;
    next.status = if next.retry_count >= MAX_RETRY_COUNT {
        QueueStatus::Failed
    } else {
        QueueStatus::Pending
    };
    next.last_attempt = Utc::now();

    let applied = records
        .put_if_status(&to_record(&next)?, QueueStatus::Processing.as_str())
        .await?;
    Ok(applied.then_some(next.status))
}
