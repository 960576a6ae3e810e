use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type RoundId = String;
pub type AnswerId = String;
pub type UserId = String;
pub type ChannelId = String;

/// Opaque token returned by the delivery collaborator when a round is first posted
pub type MessageHandle = String;

pub const CORRECT_BADGE: &str = "✅";
pub const INCORRECT_BADGE: &str = "❌";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundState {
    Open,
    Closed,
}

/// How a round reached `Closed`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    CorrectAnswer,
    Timeout,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Round {
    pub id: RoundId,
    pub channel: ChannelId,
    pub category: String,
    pub question: String,
    /// Canonical answer text, revealed once the round closes
    pub answer: String,
    pub value: u32,
    pub air_date: NaiveDate,
    pub message_handle: Option<MessageHandle>,
    pub state: RoundState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub close_reason: Option<CloseReason>,
    #[serde(default)]
    pub winning_answer_id: Option<AnswerId>,
}

impl Round {
    pub fn is_open(&self) -> bool {
        self.state == RoundState::Open
    }
}

/// Input for starting a new round
#[derive(Debug, Clone)]
pub struct NewRound {
    pub channel: ChannelId,
    pub category: String,
    pub question: String,
    pub answer: String,
    pub value: u32,
    pub air_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub id: AnswerId,
    pub round_id: RoundId,
    pub user_id: UserId,
    pub text: String,
    pub badge: String,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub score: i64,
}

/// Result of a submission attempt. Rejections are ordinary outcomes, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted {
        answer: Answer,
        /// True only for the submission that closed the round
        closed_round: bool,
        /// Submitter's score after the verdict was applied
        score: i64,
    },
    RejectedDuplicate,
    RejectedClosed,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    NoOp,
}

/// Emitted after a round's state change has been committed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum RoundEvent {
    Opened {
        round_id: RoundId,
    },
    AnswerAccepted {
        round_id: RoundId,
        answer_id: AnswerId,
    },
    Closed {
        round_id: RoundId,
        reason: CloseReason,
    },
}

impl RoundEvent {
    pub fn round_id(&self) -> &RoundId {
        match self {
            RoundEvent::Opened { round_id }
            | RoundEvent::AnswerAccepted { round_id, .. }
            | RoundEvent::Closed { round_id, .. } => round_id,
        }
    }
}

/// One row of the scoreboard
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub score: i64,
    pub pretty_score: String,
    pub longest_streak: u32,
}
