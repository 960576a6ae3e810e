use super::{Admission, AppState};
use crate::error::{GameError, GameResult};
use crate::types::*;
use chrono::Utc;

impl AppState {
    /// Submit an answer whose verdict was already decided by the judge.
    ///
    /// Accepting the answer and closing the round on a correct verdict happen
    /// under the round's mutex, so concurrent correct answers produce exactly
    /// one winner. The score change and events follow once the lock is released.
    pub async fn submit_answer(
        &self,
        round_id: &str,
        user_id: &str,
        text: String,
        is_correct: bool,
    ) -> GameResult<SubmitOutcome> {
        let entry = self
            .entry(round_id)
            .await
            .ok_or_else(|| GameError::RoundNotFound(round_id.to_string()))?;

        let (admission, round) = {
            let mut entry = entry.lock().await;
            let admission = entry.submit(user_id, text, is_correct, Utc::now());
            (admission, entry.round.clone())
        };

        let (answer, closed_round) = match admission {
            Admission::Accepted {
                answer,
                closed_round,
            } => (answer, closed_round),
            Admission::RejectedDuplicate => {
                tracing::info!(round_id, user_id, "Duplicate answer rejected");
                return Ok(SubmitOutcome::RejectedDuplicate);
            }
            Admission::RejectedClosed => {
                tracing::info!(round_id, user_id, "Answer to closed round rejected");
                return Ok(SubmitOutcome::RejectedClosed);
            }
        };

        let score = if is_correct {
            self.add_score(user_id, round.value).await
        } else {
            self.deduct_score(user_id, round.value).await
        };

        tracing::info!(
            round_id,
            user_id,
            is_correct,
            score,
            "Answer accepted"
        );

        self.emit(RoundEvent::AnswerAccepted {
            round_id: round_id.to_string(),
            answer_id: answer.id.clone(),
        });

        if closed_round {
            self.release_channel(&round.channel, round_id).await;
            tracing::info!(round_id, winner = user_id, "Round won");
            self.emit(RoundEvent::Closed {
                round_id: round_id.to_string(),
                reason: CloseReason::CorrectAnswer,
            });
        }

        Ok(SubmitOutcome::Accepted {
            answer,
            closed_round,
            score,
        })
    }

    /// Answers for a round, in submission order
    pub async fn get_answers(&self, round_id: &str) -> GameResult<Vec<Answer>> {
        let entry = self
            .entry(round_id)
            .await
            .ok_or_else(|| GameError::RoundNotFound(round_id.to_string()))?;
        let answers = entry.lock().await.answers.clone();
        Ok(answers)
    }

    /// A user's answers across all rounds, oldest first
    pub async fn answers_by_user(&self, user_id: &str) -> Vec<Answer> {
        let mut answers = Vec::new();
        for entry in self.all_entries().await {
            let entry = entry.lock().await;
            answers.extend(entry.answers.iter().filter(|a| a.user_id == user_id).cloned());
        }
        answers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        answers
    }
}
