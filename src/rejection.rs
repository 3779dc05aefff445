//! Handler for artwork-rejection messages. The artwork's rejected flag
//! was already committed by the moderation flow before the message was
//! produced, so everything here is optional cleanup: each step is wrapped
//! so that a failure in one never prevents the others, and only a
//! malformed message fails the handler (leaving the message unacked for
//! queue redelivery).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::email::templates;
use crate::error::AppError;
use crate::keys;
use crate::state::SharedState;

pub const REJECTION_EMAIL_SUBJECT: &str = "Your Atelier submission was not accepted";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionMessage {
    pub art_id: Uuid,
    pub owner_id: Uuid,
    pub owner_email: String,
    pub owner_name: String,
    pub art_title: String,
}

pub async fn handle_rejection(state: &SharedState, body: &str) -> Result<(), AppError> {
    let msg: RejectionMessage = serde_json::from_str(body)
        .map_err(|e| AppError::BadRequest(format!("Malformed rejection message: {e}")))?;

    tracing::info!(
        "Processing rejection of art {} (owner {})",
        msg.art_id,
        msg.owner_id
    );

    // Blob variants. delete_one tolerates objects that are already gone,
    // which also covers redelivered messages.
    for key in keys::art_variant_keys(msg.owner_id, msg.art_id) {
        if let Err(e) = state.blobs.delete_one(&key).await {
            tracing::warn!("Failed to delete rejected art blob {key}: {e}");
        }
    }

    // Pointer record linking the owner to the artwork.
    let partition_key = keys::member_partition(msg.owner_id);
    let sort_key = keys::art_sort_key(msg.art_id);
    if let Err(e) = state.records.delete(&partition_key, &sort_key).await {
        tracing::warn!(
            "Failed to delete art pointer record {partition_key}/{sort_key}: {e}"
        );
    }

    // Notification email.
    match &state.mailer {
        Some(mailer) => {
            let (text, html) = templates::render_rejection(&msg.owner_name, &msg.art_title);
            if let Err(e) = mailer
                .send(&msg.owner_email, REJECTION_EMAIL_SUBJECT, &text, &html)
                .await
            {
                tracing::error!(
                    "Failed to send rejection email to {}: {e}",
                    msg.owner_email
                );
            }
        }
        None => {
            tracing::warn!(
                "SMTP not configured; skipping rejection email for art {}",
                msg.art_id
            );
        }
    }

    Ok(())
}
