//! Channel → open round tracking and stale round queries for the reaper

use super::AppState;
use crate::types::*;
use chrono::{DateTime, TimeDelta, Utc};

impl AppState {
    pub(super) async fn register_open_round(&self, round: &Round) {
        let previous = self
            .channels
            .write()
            .await
            .insert(round.channel.clone(), round.id.clone());

        if let Some(previous) = previous {
            // Starting rounds is the caller's business; we only track the latest
            tracing::warn!(
                channel = %round.channel,
                previous_round = %previous,
                "Channel already had an open round"
            );
        }
    }

    /// Forget the channel's current round, but only if it is still this one
    pub(super) async fn release_channel(&self, channel: &str, round_id: &str) {
        let mut channels = self.channels.write().await;
        if channels.get(channel).map(String::as_str) == Some(round_id) {
            channels.remove(channel);
        }
    }

    /// The open round currently tracked for a channel
    pub async fn current_round(&self, channel: &str) -> Option<Round> {
        let round_id = self.channels.read().await.get(channel).cloned()?;
        self.get_round(&round_id)
            .await
            .filter(|round| round.is_open())
    }

    /// Open rounds created before `now - timeout`.
    ///
    /// Each round's state is read under its own lock, so a round closed by a
    /// winning answer never shows up in a later scan.
    pub async fn stale_rounds(&self, now: DateTime<Utc>, timeout: TimeDelta) -> Vec<Round> {
        let cutoff = now - timeout;
        let mut stale = Vec::new();
        for entry in self.all_entries().await {
            let entry = entry.lock().await;
            if entry.round.is_open() && entry.round.created_at < cutoff {
                stale.push(entry.round.clone());
            }
        }
        stale.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        stale
    }

    /// Close every stale round. Returns the ids this sweep actually closed.
    pub async fn sweep_stale_rounds(&self, now: DateTime<Utc>, timeout: TimeDelta) -> Vec<RoundId> {
        let mut closed = Vec::new();
        for round in self.stale_rounds(now, timeout).await {
            match self.close_for_timeout(&round.id).await {
                Ok(CloseOutcome::Closed) => closed.push(round.id),
                // Won or closed elsewhere between the scan and the close
                Ok(CloseOutcome::NoOp) => {}
                Err(e) => tracing::warn!(round_id = %round.id, "Stale round vanished: {}", e),
            }
        }

        if !closed.is_empty() {
            tracing::info!(count = closed.len(), "Closed stale rounds");
        } else {
            tracing::debug!("No stale rounds");
        }
        closed
    }
}
