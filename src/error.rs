use crate::types::RoundId;

/// Result type for state operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors surfaced by state operations.
///
/// Submission rejections are not errors; see [`crate::types::SubmitOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Round not found: {0}")]
    RoundNotFound(RoundId),

    #[error("Invalid round: {0}")]
    Validation(String),

    #[error("Snapshot failed: {0}")]
    Snapshot(String),
}

impl From<std::io::Error> for GameError {
    fn from(e: std::io::Error) -> Self {
        GameError::Snapshot(e.to_string())
    }
}

impl From<serde_json::Error> for GameError {
    fn from(e: serde_json::Error) -> Self {
        GameError::Snapshot(e.to_string())
    }
}
