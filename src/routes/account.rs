use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::cleanup::processor::{disable_identity, purge_blobs, purge_records};
use crate::cleanup::store;
use crate::cleanup::task::{CleanupAction, CleanupTask};
use crate::error::AppError;
use crate::keys;
use crate::state::SharedState;
use crate::stores::StoreError;

#[derive(Deserialize)]
pub struct DeleteAccountRequest {
    /// Re-entered password, verified against the identity provider before
    /// anything is touched.
    pub password: String,
}

#[derive(Serialize)]
pub struct DeleteAccountResponse {
    pub deleted: bool,
    pub message: String,
}

/// Permanently delete the calling member's account.
///
/// The profile record is the source of truth for "this account exists",
/// so its deletion is the one step that may fail the request. Everything
/// after it is best-effort: a failure is captured as a cleanup task and
/// retried later by the queue processor, and the caller still gets a
/// success response.
pub async fn delete_account(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(req): Json<DeleteAccountRequest>,
) -> Result<Json<DeleteAccountResponse>, AppError> {
    let member_id = auth.member_id;

    match state.identity.get_user(member_id).await {
        Ok(_) => {}
        Err(StoreError::NotFound) => {
            return Err(AppError::NotFound("Account not found".to_string()));
        }
        Err(e) => return Err(AppError::Internal(format!("Identity lookup failed: {e}"))),
    }

    let confirmed = state
        .identity
        .verify_password(member_id, &req.password)
        .await
        .map_err(|e| AppError::Internal(format!("Password verification failed: {e}")))?;
    if !confirmed {
        return Err(AppError::Unauthorized(
            "Confirmation password is incorrect".to_string(),
        ));
    }

    // Mandatory step. Past this point the request always succeeds.
    let member_pk = keys::member_partition(member_id);
    state
        .records
        .delete(&member_pk, keys::PROFILE_SORT_KEY)
        .await
        .map_err(|e| AppError::Internal(format!("Profile deletion failed: {e}")))?;

    let mut tasks: Vec<CleanupTask> = Vec::new();

    if let Err(e) = purge_records(state.records.as_ref(), &member_pk).await {
        tracing::warn!("Record cleanup for member {member_id} failed inline: {e}");
        tasks.push(CleanupTask::new(
            CleanupAction::RecordCleanup {
                partition_key: member_pk.clone(),
            },
            member_id,
            e.to_string(),
        ));
    }

    let blob_prefix = keys::member_blob_prefix(member_id);
    if let Err(e) = purge_blobs(state.blobs.as_ref(), &blob_prefix).await {
        tracing::warn!("Blob cleanup for member {member_id} failed inline: {e}");
        tasks.push(CleanupTask::new(
            CleanupAction::BlobCleanup {
                bucket: state.config.s3.bucket.clone(),
                prefix: blob_prefix,
            },
            member_id,
            e.to_string(),
        ));
    }

    if let Err(e) = disable_identity(state.identity.as_ref(), member_id).await {
        tracing::warn!("Identity disable for member {member_id} failed inline: {e}");
        tasks.push(CleanupTask::new(
            CleanupAction::IdentityDisable {
                realm: state.config.identity.realm.clone(),
                subject: member_id,
            },
            member_id,
            e.to_string(),
        ));
    }

    if !tasks.is_empty() {
        // Last line of defense; if even the queue write fails the tasks
        // are lost and have to be reconciled out of band.
        if let Err(e) = store::enqueue_batch(state.records.as_ref(), tasks).await {
            tracing::error!("Failed to persist cleanup tasks for member {member_id}: {e}");
        }
    }

    Ok(Json(DeleteAccountResponse {
        deleted: true,
        message: "Account deleted".to_string(),
    }))
}
