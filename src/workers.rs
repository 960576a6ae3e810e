//! Background tasks: the publisher that pushes round views to the chat
//! surface, and the reaper that closes stale rounds.

use crate::delivery::{DeliveryError, MessageDelivery};
use crate::error::GameError;
use crate::render::project;
use crate::state::AppState;
use crate::types::{MessageHandle, RoundId};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Posted(MessageHandle),
    Updated,
    SkippedInvalidToken,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Render a round's current state and hand it to the delivery collaborator.
///
/// Posts on first delivery and stores the returned handle, edits afterwards.
/// Delivery failures are returned but never touch round or score state.
pub async fn publish_round(
    state: &AppState,
    delivery: &dyn MessageDelivery,
    round_id: &RoundId,
) -> Result<PublishOutcome, PublishError> {
    if !delivery.has_valid_token().await {
        tracing::warn!(round_id = %round_id, "Skipping render, workspace token invalid");
        return Ok(PublishOutcome::SkippedInvalidToken);
    }

    let snapshot = state.round_snapshot(round_id).await?;
    let view = project(&snapshot.round, &snapshot.answers);
    let round = snapshot.round;

    match round.message_handle {
        Some(ref handle) => {
            delivery
                .update_message(handle, &round.channel, &view.fallback_text, &view)
                .await?;
            Ok(PublishOutcome::Updated)
        }
        None => {
            let handle = delivery
                .post_message(&round.channel, &view.fallback_text, &view)
                .await?;
            state.set_message_handle(round_id, handle.clone()).await?;
            Ok(PublishOutcome::Posted(handle))
        }
    }
}

/// Spawn a task that re-renders a round after every committed state change
pub fn spawn_publisher(state: Arc<AppState>, delivery: Arc<dyn MessageDelivery>) -> JoinHandle<()> {
    let mut events = state.subscribe();

    tokio::spawn(async move {
        tracing::info!(delivery = delivery.name(), "Publisher started");
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Publisher lagged behind round events, resyncing");
                    resync_all(&state, delivery.as_ref()).await;
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let round_id = event.round_id().clone();
            match publish_round(&state, delivery.as_ref(), &round_id).await {
                Ok(outcome) => tracing::debug!(round_id = %round_id, ?outcome, "Round published"),
                Err(e) => tracing::warn!(round_id = %round_id, "Failed to publish round: {}", e),
            }
        }
        tracing::info!("Publisher stopped");
    })
}

/// Re-render every round after events were dropped.
///
/// Projection only reads committed state, so publishing a round whose view
/// is already current just repeats the same edit.
async fn resync_all(state: &AppState, delivery: &dyn MessageDelivery) {
    for round_id in state.round_ids().await {
        if let Err(e) = publish_round(state, delivery, &round_id).await {
            tracing::warn!(round_id = %round_id, "Failed to resync round: {}", e);
        }
    }
}

/// Spawn a task that periodically closes rounds open longer than the configured timeout
pub fn spawn_round_reaper(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config.reaper_interval);
        loop {
            interval.tick().await;
            state
                .sweep_stale_rounds(chrono::Utc::now(), state.config.round_timeout)
                .await;
        }
    })
}
