//! Background loops. Each tick is one stateless unit of work; there is no
//! state carried between ticks, so a failed tick only affects itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cleanup::processor;
use crate::rejection;
use crate::state::SharedState;
use crate::stores::queue::MessageQueue;

/// Periodically drain the cleanup queue.
pub fn spawn_cleanup_loop(
    state: SharedState,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = Duration::from_secs(state.config.cleanup_interval_secs);
        tracing::info!("Cleanup scheduler started (interval {interval:?})");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match processor::process_pending(&state).await {
                Ok(report) if report.total() > 0 => {
                    tracing::info!(
                        "Cleanup pass: {} completed, {} retried, {} failed, {} skipped",
                        report.completed,
                        report.retried,
                        report.failed,
                        report.skipped
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Cleanup pass failed: {e}"),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        tracing::info!("Cleanup scheduler stopped");
    })
}

/// Consume artwork-rejection messages. A message is acknowledged only
/// after the handler returns success; otherwise the queue redelivers it.
pub fn spawn_rejection_consumer(
    state: SharedState,
    queue: Arc<dyn MessageQueue>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Rejection consumer started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match queue.receive(10).await {
                Ok(messages) => {
                    for message in messages {
                        match rejection::handle_rejection(&state, &message.body).await {
                            Ok(()) => {
                                if let Err(e) = queue.ack(&message.receipt).await {
                                    tracing::error!("Failed to ack rejection message: {e}");
                                }
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Rejection handler failed, leaving message for redelivery: {e}"
                                );
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to receive rejection messages: {e}");
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                _ = shutdown.changed() => {}
            }
        }

        tracing::info!("Rejection consumer stopped");
    })
}
