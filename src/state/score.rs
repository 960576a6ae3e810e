use crate::state::AppState;
use crate::streak::longest_streak;
use crate::types::*;
use std::collections::HashMap;

/// Format points as whole dollars with thousands separators, e.g. `-$1,500`
pub fn format_currency(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

impl AppState {
    /// Add points to a user's score, creating the user on first touch.
    /// Returns the new score.
    pub async fn add_score(&self, user_id: &str, amount: u32) -> i64 {
        self.adjust_score(user_id, i64::from(amount)).await
    }

    /// Deduct points from a user's score. Scores may go negative.
    pub async fn deduct_score(&self, user_id: &str, amount: u32) -> i64 {
        self.adjust_score(user_id, -i64::from(amount)).await
    }

    async fn adjust_score(&self, user_id: &str, delta: i64) -> i64 {
        let mut users = self.users.write().await;
        let user = users.entry(user_id.to_string()).or_insert_with(|| User {
            id: user_id.to_string(),
            score: 0,
        });
        user.score += delta;
        user.score
    }

    pub async fn get_score(&self, user_id: &str) -> i64 {
        self.users
            .read()
            .await
            .get(user_id)
            .map(|u| u.score)
            .unwrap_or(0)
    }

    pub async fn pretty_score(&self, user_id: &str) -> String {
        format_currency(self.get_score(user_id).await)
    }

    /// Longest run of correct answers across the user's whole history
    pub async fn longest_streak(&self, user_id: &str) -> u32 {
        let history = self.answers_by_user(user_id).await;
        longest_streak(history.iter().map(|a| a.is_correct))
    }

    /// All users ordered by score, highest first
    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let users: Vec<User> = self.users.read().await.values().cloned().collect();

        // One pass over all rounds instead of one per user
        let mut histories: HashMap<UserId, Vec<Answer>> = HashMap::new();
        for entry in self.all_entries().await {
            let entry = entry.lock().await;
            for answer in &entry.answers {
                histories
                    .entry(answer.user_id.clone())
                    .or_default()
                    .push(answer.clone());
            }
        }

        let mut board: Vec<LeaderboardEntry> = users
            .into_iter()
            .map(|user| {
                let streak = histories
                    .get_mut(&user.id)
                    .map(|history| {
                        history.sort_by(|a, b| {
                            a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
                        });
                        longest_streak(history.iter().map(|a| a.is_correct))
                    })
                    .unwrap_or(0);
                LeaderboardEntry {
                    pretty_score: format_currency(user.score),
                    user_id: user.id,
                    score: user.score,
                    longest_streak: streak,
                }
            })
            .collect();

        board.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.user_id.cmp(&b.user_id)));
        board
    }

    // Chat replies. Display names come pre-resolved from the identity collaborator.

    pub async fn correct_answer_message(&self, user_id: &str, display_name: &str) -> String {
        format!(
            "That is correct, {}! Your score is now {}.",
            display_name,
            self.pretty_score(user_id).await
        )
    }

    /// Correct verdict for a response not phrased as a question
    pub async fn not_a_question_message(&self, user_id: &str, display_name: &str) -> String {
        format!(
            "That is correct, {}, but responses must be in the form of a question. Your score is now {}.",
            display_name,
            self.pretty_score(user_id).await
        )
    }

    pub async fn incorrect_answer_message(&self, user_id: &str, display_name: &str) -> String {
        format!(
            "That is incorrect, {}. Your score is now {}.",
            display_name,
            self.pretty_score(user_id).await
        )
    }

    pub fn duplicate_answer_message(display_name: &str) -> String {
        format!(
            "You’ve had your chance, {}. Let somebody else answer.",
            display_name
        )
    }

    pub fn closed_round_message(display_name: &str) -> String {
        format!("Sorry, {}, this round is already over.", display_name)
    }
}
