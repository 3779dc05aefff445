use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::cleanup::store;
use crate::cleanup::task::{QueueItem, QueueStatus};
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CleanupQuery {
    pub status: Option<QueueStatus>,
}

#[derive(Serialize)]
pub struct QueueItemView {
    pub sort_key: String,
    #[serde(rename = "type")]
    pub task_type: &'static str,
    pub owner_id: Uuid,
    pub status: QueueStatus,
    pub retry_count: i32,
    pub error: String,
    pub created_at: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
}

impl From<QueueItem> for QueueItemView {
    fn from(item: QueueItem) -> Self {
        Self {
            sort_key: item.sort_key(),
            task_type: item.task.action.kind(),
            owner_id: item.task.owner_id,
            status: item.status,
            retry_count: item.retry_count,
            error: item.task.error.clone(),
            created_at: item.task.created_at,
            last_attempt: item.last_attempt,
        }
    }
}

/// Inspect the cleanup queue, mainly to find items whose retries are
/// exhausted. This subsystem never deletes terminal items, so the full
/// history stays visible here.
pub async fn list_cleanup(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<Vec<QueueItemView>>, AppError> {
    auth.require_admin()?;

    let items = store::list_items(state.records.as_ref(), query.status).await?;
    Ok(Json(items.into_iter().map(QueueItemView::from).collect()))
}
