//! State export/import for restoring a running game after a restart.
//!
//! Snapshots carry exactly the durable fields: rounds, their answers, and
//! user scores. The channel registry is rebuilt from open rounds on import.

use super::{AppState, RoundEntry};
use crate::error::{GameError, GameResult};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Schema version for export format compatibility
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateExport {
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub rounds: HashMap<RoundId, Round>,
    pub answers: HashMap<AnswerId, Answer>,
    pub users: HashMap<UserId, User>,
}

impl StateExport {
    /// Validate the export before import
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Export schema version {} is newer than supported version {}",
                self.schema_version, EXPORT_SCHEMA_VERSION
            ));
        }

        for (round_id, round) in &self.rounds {
            if *round_id != round.id {
                return Err(format!(
                    "Round keyed '{}' carries id '{}'",
                    round_id, round.id
                ));
            }
        }

        let mut answered: HashSet<(&str, &str)> = HashSet::new();
        let mut correct: HashMap<&str, usize> = HashMap::new();
        for (answer_id, answer) in &self.answers {
            if *answer_id != answer.id {
                return Err(format!(
                    "Answer keyed '{}' carries id '{}'",
                    answer_id, answer.id
                ));
            }
            if !self.rounds.contains_key(&answer.round_id) {
                return Err(format!(
                    "Answer '{}' references round '{}' which doesn't exist",
                    answer_id, answer.round_id
                ));
            }
            if !answered.insert((answer.round_id.as_str(), answer.user_id.as_str())) {
                return Err(format!(
                    "User '{}' has more than one answer in round '{}'",
                    answer.user_id, answer.round_id
                ));
            }
            if answer.is_correct {
                *correct.entry(answer.round_id.as_str()).or_default() += 1;
            }
        }

        for (round_id, round) in &self.rounds {
            let correct_count = correct.get(round_id.as_str()).copied().unwrap_or(0);
            if correct_count > 1 {
                return Err(format!(
                    "Round '{}' has {} correct answers",
                    round_id, correct_count
                ));
            }

            if round.is_open()
                && (correct_count > 0
                    || round.closed_at.is_some()
                    || round.close_reason.is_some()
                    || round.winning_answer_id.is_some())
            {
                return Err(format!("Open round '{}' is already decided", round_id));
            }

            if let Some(ref winner) = round.winning_answer_id {
                let answer = self.answers.get(winner).ok_or_else(|| {
                    format!(
                        "Round '{}' references winning answer '{}' which doesn't exist",
                        round_id, winner
                    )
                })?;
                if answer.round_id != *round_id || !answer.is_correct {
                    return Err(format!(
                        "Round '{}' names winning answer '{}' which is not its correct answer",
                        round_id, winner
                    ));
                }
            }
        }

        Ok(())
    }

    pub async fn save(&self, path: &Path) -> GameResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load(path: &Path) -> GameResult<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl AppState {
    /// Snapshot rounds, answers and scores.
    ///
    /// Scores are copied before the round scan. `submit_answer` stores the
    /// answer before applying its score, so a snapshot never holds a score
    /// change without its answer, but one taken between those two steps can
    /// hold an accepted answer whose score change is not yet applied.
    pub async fn export_state(&self) -> StateExport {
        let users = self.users.read().await.clone();
        let mut rounds = HashMap::new();
        let mut answers = HashMap::new();
        for entry in self.all_entries().await {
            let entry = entry.lock().await;
            rounds.insert(entry.round.id.clone(), entry.round.clone());
            answers.extend(entry.answers.iter().map(|a| (a.id.clone(), a.clone())));
        }

        StateExport {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            rounds,
            answers,
            users,
        }
    }

    /// Replace all state with the snapshot's contents
    pub async fn import_state(&self, export: StateExport) -> GameResult<()> {
        export.validate().map_err(GameError::Snapshot)?;

        let mut entries: HashMap<RoundId, RoundEntry> = export
            .rounds
            .into_iter()
            .map(|(id, round)| (id, RoundEntry::new(round)))
            .collect();
        for answer in export.answers.into_values() {
            if let Some(entry) = entries.get_mut(&answer.round_id) {
                entry.answers.push(answer);
            }
        }

        let mut channels: HashMap<ChannelId, (RoundId, chrono::DateTime<chrono::Utc>)> =
            HashMap::new();
        for entry in entries.values_mut() {
            entry
                .answers
                .sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            if entry.round.is_open() {
                let newest = channels
                    .get(&entry.round.channel)
                    .map_or(true, |(_, created_at)| *created_at < entry.round.created_at);
                if newest {
                    channels.insert(
                        entry.round.channel.clone(),
                        (entry.round.id.clone(), entry.round.created_at),
                    );
                }
            }
        }

        let round_count = entries.len();
        *self.rounds.write().await = entries
            .into_iter()
            .map(|(id, entry)| (id, Arc::new(Mutex::new(entry))))
            .collect();
        *self.users.write().await = export.users;
        *self.channels.write().await = channels
            .into_iter()
            .map(|(channel, (round_id, _))| (channel, round_id))
            .collect();

        tracing::info!(rounds = round_count, "State imported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::new_round;

    async fn populated_state() -> (AppState, Round, Round) {
        let state = AppState::new();
        let won = state.start_round(new_round("C1", 200)).await.unwrap();
        state
            .submit_answer(&won.id, "A", "What is Vienna?".to_string(), false)
            .await
            .unwrap();
        state
            .submit_answer(&won.id, "B", "What is Budapest?".to_string(), true)
            .await
            .unwrap();
        let open = state.start_round(new_round("C2", 400)).await.unwrap();
        (state, won, open)
    }

    #[tokio::test]
    async fn test_export_import_restores_state() {
        let (state, won, open) = populated_state().await;
        let export = state.export_state().await;

        let restored = AppState::new();
        restored.import_state(export).await.unwrap();

        assert_eq!(
            restored.round_snapshot(&won.id).await.unwrap(),
            state.round_snapshot(&won.id).await.unwrap()
        );
        assert_eq!(restored.get_score("A").await, -200);
        assert_eq!(restored.get_score("B").await, 200);
        assert_eq!(restored.current_round("C2").await.unwrap().id, open.id);
        assert!(restored.current_round("C1").await.is_none());

        // Duplicate protection survives the restore
        let outcome = restored
            .submit_answer(&won.id, "C", "What is Budapest?".to_string(), true)
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::RejectedClosed);
    }

    #[tokio::test]
    async fn test_save_and_load_file() {
        let (state, _, _) = populated_state().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        state.export_state().await.save(&path).await.unwrap();
        let loaded = StateExport::load(&path).await.unwrap();

        assert_eq!(loaded.schema_version, EXPORT_SCHEMA_VERSION);
        assert_eq!(loaded.rounds.len(), 2);
        assert_eq!(loaded.answers.len(), 2);
        assert_eq!(loaded.users.len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = StateExport::load(&dir.path().join("missing.json")).await;
        assert!(matches!(result, Err(GameError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_validation_orphan_answer() {
        let (state, won, _) = populated_state().await;
        let mut export = state.export_state().await;
        export.rounds.remove(&won.id);

        let result = export.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("doesn't exist"));
    }

    #[tokio::test]
    async fn test_validation_duplicate_answer() {
        let (state, _, _) = populated_state().await;
        let mut export = state.export_state().await;
        let mut copy = export.answers.values().next().unwrap().clone();
        copy.id = "copy".to_string();
        export.answers.insert(copy.id.clone(), copy);

        let result = export.validate();
        assert!(result.unwrap_err().contains("more than one answer"));
    }

    #[tokio::test]
    async fn test_validation_future_schema() {
        let state = AppState::new();
        let mut export = state.export_state().await;
        export.schema_version = EXPORT_SCHEMA_VERSION + 1;

        let result = state.import_state(export).await;
        assert!(matches!(result, Err(GameError::Snapshot(msg)) if msg.contains("newer than supported")));
    }

    fn answer_of<'a>(export: &'a mut StateExport, user_id: &str) -> &'a mut Answer {
        export
            .answers
            .values_mut()
            .find(|a| a.user_id == user_id)
            .unwrap()
    }

    #[tokio::test]
    async fn test_validation_rejects_second_correct_answer() {
        let (state, _, _) = populated_state().await;
        let mut export = state.export_state().await;
        answer_of(&mut export, "A").is_correct = true;

        let result = export.validate();
        assert!(result.unwrap_err().contains("2 correct answers"));
    }

    #[tokio::test]
    async fn test_import_rejects_reopened_won_round() {
        let (state, won, _) = populated_state().await;
        let mut export = state.export_state().await;
        let round = export.rounds.get_mut(&won.id).unwrap();
        round.state = RoundState::Open;
        round.winning_answer_id = None;
        round.close_reason = None;
        round.closed_at = None;

        let restored = AppState::new();
        let result = restored.import_state(export).await;
        assert!(matches!(result, Err(GameError::Snapshot(msg)) if msg.contains("already decided")));

        // Nothing was installed, so no second winner can be accepted
        assert!(restored.get_round(&won.id).await.is_none());
        assert!(restored
            .submit_answer(&won.id, "C", "What is Budapest?".to_string(), true)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_validation_rejects_open_round_with_close_fields() {
        let (state, _, open) = populated_state().await;

        let mut export = state.export_state().await;
        export.rounds.get_mut(&open.id).unwrap().closed_at = Some(chrono::Utc::now());
        assert!(export.validate().unwrap_err().contains("already decided"));

        let mut export = state.export_state().await;
        export.rounds.get_mut(&open.id).unwrap().close_reason = Some(CloseReason::Timeout);
        assert!(export.validate().unwrap_err().contains("already decided"));
    }

    #[tokio::test]
    async fn test_validation_rejects_winner_from_another_round() {
        let (state, _, open) = populated_state().await;
        state.close_for_timeout(&open.id).await.unwrap();
        let mut export = state.export_state().await;
        let winner_id = answer_of(&mut export, "B").id.clone();
        export.rounds.get_mut(&open.id).unwrap().winning_answer_id = Some(winner_id);

        let result = export.validate();
        assert!(result.unwrap_err().contains("not its correct answer"));
    }

    #[tokio::test]
    async fn test_validation_rejects_key_mismatch() {
        let (state, won, _) = populated_state().await;

        let mut export = state.export_state().await;
        let round = export.rounds.remove(&won.id).unwrap();
        export.rounds.insert("renamed".to_string(), round);
        assert!(export.validate().unwrap_err().contains("carries id"));

        let mut export = state.export_state().await;
        let answer = answer_of(&mut export, "A").clone();
        export.answers.remove(&answer.id);
        export.answers.insert("renamed".to_string(), answer);
        assert!(export.validate().unwrap_err().contains("carries id"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_export_never_holds_score_without_answer() {
        let state = Arc::new(AppState::new());
        let round = state.start_round(new_round("C1", 100)).await.unwrap();

        let submitters = (0..32).map(|i| {
            let state = state.clone();
            let round_id = round.id.clone();
            tokio::spawn(async move {
                state
                    .submit_answer(&round_id, &format!("U{}", i), "What is it?".to_string(), false)
                    .await
                    .unwrap();
            })
        });
        let exporters = (0..8).map(|_| {
            let state = state.clone();
            tokio::spawn(async move { state.export_state().await })
        });
        let (_, snapshots) = tokio::join!(
            futures::future::join_all(submitters),
            futures::future::join_all(exporters)
        );

        for snapshot in snapshots {
            let snapshot = snapshot.unwrap();
            for user_id in snapshot.users.keys() {
                assert!(snapshot.answers.values().any(|a| &a.user_id == user_id));
            }
            assert!(snapshot.validate().is_ok());
        }
    }
}
