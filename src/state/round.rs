use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// What a round decided about a single submission
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Accepted { answer: Answer, closed_round: bool },
    RejectedDuplicate,
    RejectedClosed,
}

/// A round together with the answers it owns.
///
/// This is the state machine proper; it does no locking or I/O; the caller
/// holds the round's mutex around every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundEntry {
    pub round: Round,
    /// Answers in submission order
    pub answers: Vec<Answer>,
}

impl RoundEntry {
    pub fn new(round: Round) -> Self {
        Self {
            round,
            answers: Vec::new(),
        }
    }

    /// Accept or reject a submission. A correct verdict closes the round in the same step.
    pub fn submit(
        &mut self,
        user_id: &str,
        text: String,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Admission {
        if !self.round.is_open() {
            return Admission::RejectedClosed;
        }
        if self.has_answer_by(user_id) {
            return Admission::RejectedDuplicate;
        }

        let answer = Answer {
            id: ulid::Ulid::new().to_string(),
            round_id: self.round.id.clone(),
            user_id: user_id.to_string(),
            text,
            badge: if is_correct {
                CORRECT_BADGE
            } else {
                INCORRECT_BADGE
            }
            .to_string(),
            is_correct,
            created_at: now,
        };
        self.answers.push(answer.clone());

        if is_correct {
            self.round.winning_answer_id = Some(answer.id.clone());
            self.close(CloseReason::CorrectAnswer, now);
        }

        Admission::Accepted {
            answer,
            closed_round: is_correct,
        }
    }

    /// Close the round. Closing an already closed round does nothing.
    pub fn close(&mut self, reason: CloseReason, now: DateTime<Utc>) -> CloseOutcome {
        if !self.round.is_open() {
            return CloseOutcome::NoOp;
        }
        self.round.state = RoundState::Closed;
        self.round.closed_at = Some(now);
        self.round.close_reason = Some(reason);
        CloseOutcome::Closed
    }

    pub fn has_correct_answer(&self) -> bool {
        self.answers.iter().any(|a| a.is_correct)
    }

    pub fn has_answer_by(&self, user_id: &str) -> bool {
        self.answers.iter().any(|a| a.user_id == user_id)
    }
}

impl AppState {
    /// Create a round and make it the current round of its channel
    pub async fn start_round(&self, new: NewRound) -> GameResult<Round> {
        for (field, value) in [
            ("category", &new.category),
            ("question", &new.question),
            ("answer", &new.answer),
            ("channel", &new.channel),
        ] {
            if value.trim().is_empty() {
                return Err(GameError::Validation(format!("{} must not be blank", field)));
            }
        }

        let round = Round {
            id: ulid::Ulid::new().to_string(),
            channel: new.channel,
            category: new.category,
            question: new.question,
            answer: new.answer,
            value: new.value,
            air_date: new.air_date,
            message_handle: None,
            state: RoundState::Open,
            created_at: Utc::now(),
            closed_at: None,
            close_reason: None,
            winning_answer_id: None,
        };

        self.rounds.write().await.insert(
            round.id.clone(),
            Arc::new(Mutex::new(RoundEntry::new(round.clone()))),
        );
        self.register_open_round(&round).await;

        tracing::info!(
            round_id = %round.id,
            channel = %round.channel,
            value = round.value,
            "Round started"
        );
        self.emit(RoundEvent::Opened {
            round_id: round.id.clone(),
        });
        Ok(round)
    }

    pub async fn get_round(&self, round_id: &str) -> Option<Round> {
        let entry = self.entry(round_id).await?;
        let round = entry.lock().await.round.clone();
        Some(round)
    }

    /// Ids of every stored round, open or closed
    pub async fn round_ids(&self) -> Vec<RoundId> {
        self.rounds.read().await.keys().cloned().collect()
    }

    /// Round and its answers, read under one lock so they are consistent
    pub async fn round_snapshot(&self, round_id: &str) -> GameResult<RoundEntry> {
        let entry = self
            .entry(round_id)
            .await
            .ok_or_else(|| GameError::RoundNotFound(round_id.to_string()))?;
        let snapshot = entry.lock().await.clone();
        Ok(snapshot)
    }

    /// Close a round that has been open too long. Idempotent.
    pub async fn close_for_timeout(&self, round_id: &str) -> GameResult<CloseOutcome> {
        self.close_with_reason(round_id, CloseReason::Timeout).await
    }

    /// Close a round on the moderator's request; behaves like a timeout close
    pub async fn close_round(&self, round_id: &str) -> GameResult<CloseOutcome> {
        self.close_with_reason(round_id, CloseReason::Manual).await
    }

    async fn close_with_reason(
        &self,
        round_id: &str,
        reason: CloseReason,
    ) -> GameResult<CloseOutcome> {
        let entry = self
            .entry(round_id)
            .await
            .ok_or_else(|| GameError::RoundNotFound(round_id.to_string()))?;

        let (outcome, channel) = {
            let mut entry = entry.lock().await;
            let outcome = entry.close(reason, Utc::now());
            (outcome, entry.round.channel.clone())
        };

        if outcome == CloseOutcome::Closed {
            self.release_channel(&channel, round_id).await;
            tracing::info!(round_id, ?reason, "Round closed");
            self.emit(RoundEvent::Closed {
                round_id: round_id.to_string(),
                reason,
            });
        } else {
            tracing::debug!(round_id, ?reason, "Round already closed");
        }

        Ok(outcome)
    }

    pub async fn has_correct_answer(&self, round_id: &str) -> GameResult<bool> {
        let entry = self
            .entry(round_id)
            .await
            .ok_or_else(|| GameError::RoundNotFound(round_id.to_string()))?;
        let has_correct = entry.lock().await.has_correct_answer();
        Ok(has_correct)
    }

    pub async fn has_answer_by(&self, round_id: &str, user_id: &str) -> GameResult<bool> {
        let entry = self
            .entry(round_id)
            .await
            .ok_or_else(|| GameError::RoundNotFound(round_id.to_string()))?;
        let answered = entry.lock().await.has_answer_by(user_id);
        Ok(answered)
    }

    /// Store the handle returned by the delivery collaborator on first post
    pub async fn set_message_handle(&self, round_id: &str, handle: MessageHandle) -> GameResult<()> {
        let entry = self
            .entry(round_id)
            .await
            .ok_or_else(|| GameError::RoundNotFound(round_id.to_string()))?;
        entry.lock().await.round.message_handle = Some(handle);
        Ok(())
    }

    /// Remove a round together with all of its answers
    pub async fn remove_round(&self, round_id: &str) -> GameResult<Round> {
        let entry = self
            .rounds
            .write()
            .await
            .remove(round_id)
            .ok_or_else(|| GameError::RoundNotFound(round_id.to_string()))?;

        let removed = entry.lock().await.clone();
        self.release_channel(&removed.round.channel, round_id).await;

        tracing::info!(
            round_id,
            answers = removed.answers.len(),
            "Round removed"
        );
        Ok(removed.round)
    }
}
