mod answer;
mod export;
mod registry;
mod round;
mod score;

pub use export::{StateExport, EXPORT_SCHEMA_VERSION};
pub use round::{Admission, RoundEntry};
pub use score::format_currency;

use crate::config::GameConfig;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Shared application state
///
/// Each round sits behind its own mutex so that accepting an answer and
/// closing the round happen in one critical section without blocking
/// submissions to other rounds.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GameConfig>,
    pub rounds: Arc<RwLock<HashMap<RoundId, Arc<Mutex<RoundEntry>>>>>,
    pub users: Arc<RwLock<HashMap<UserId, User>>>,
    /// Currently open round per channel
    pub channels: Arc<RwLock<HashMap<ChannelId, RoundId>>>,
    /// Round state changes, consumed by the publisher
    pub events: broadcast::Sender<RoundEvent>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::default())
    }

    pub fn with_config(config: GameConfig) -> Self {
        let (tx, _rx) = broadcast::channel(config.event_channel_capacity);
        Self {
            config: Arc::new(config),
            rounds: Arc::new(RwLock::new(HashMap::new())),
            users: Arc::new(RwLock::new(HashMap::new())),
            channels: Arc::new(RwLock::new(HashMap::new())),
            events: tx,
        }
    }

    /// Subscribe to round events
    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: RoundEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Look up the shared entry for a round without holding the table lock
    async fn entry(&self, round_id: &str) -> Option<Arc<Mutex<RoundEntry>>> {
        self.rounds.read().await.get(round_id).cloned()
    }

    async fn all_entries(&self) -> Vec<Arc<Mutex<RoundEntry>>> {
        self.rounds.read().await.values().cloned().collect()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub fn new_round(channel: &str, value: u32) -> NewRound {
        NewRound {
            channel: channel.to_string(),
            category: "world capitals".to_string(),
            question: "This city on the Danube is the capital of Hungary".to_string(),
            answer: "Budapest".to_string(),
            value,
            air_date: NaiveDate::from_ymd_opt(2004, 3, 3).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_events_are_emitted_in_order() {
        let state = AppState::new();
        let mut rx = state.subscribe();

        let round = state.start_round(new_round("C1", 200)).await.unwrap();
        let outcome = state
            .submit_answer(&round.id, "U1", "What is Budapest?".to_string(), true)
            .await
            .unwrap();
        let answer_id = match outcome {
            SubmitOutcome::Accepted { answer, .. } => answer.id,
            other => panic!("Expected Accepted, got {:?}", other),
        };

        assert_eq!(
            rx.recv().await.unwrap(),
            RoundEvent::Opened {
                round_id: round.id.clone()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            RoundEvent::AnswerAccepted {
                round_id: round.id.clone(),
                answer_id,
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            RoundEvent::Closed {
                round_id: round.id.clone(),
                reason: CloseReason::CorrectAnswer,
            }
        );
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_harmless() {
        let state = AppState::new();
        assert!(state.start_round(new_round("C1", 100)).await.is_ok());
    }
}
