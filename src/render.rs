//! Projection of a round into a presentation-agnostic view.
//!
//! The delivery collaborator turns a [`RenderView`] into whatever its chat
//! surface needs. Projection is pure: the same snapshot always yields the
//! same view, so re-posting a view is always safe.

use crate::state::format_currency;
use crate::types::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderView {
    pub header: Header,
    pub body: Body,
    /// Most recent answer first
    pub feed: Vec<FeedEntry>,
    pub footer: String,
    /// Plain-text fallback for surfaces that can't show the structured view
    pub fallback_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub category: String,
    pub value: String,
}

impl Header {
    pub fn label(&self) -> String {
        format!("*{}* | {}", self.category, self.value)
    }
}

/// The canonical answer is only revealed once the round is closed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum Body {
    Prompt { question: String },
    Revealed { question: String, answer: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub badge: String,
    pub user_id: UserId,
    pub text: String,
}

/// Capitalize each word, e.g. `"WORLD capitals"` → `"World Capitals"`
fn titleize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn fallback_text(round: &Round) -> String {
    format!(
        "The category is {}, for {}: “{}”",
        round.category,
        format_currency(i64::from(round.value)),
        round.question
    )
}

pub fn project(round: &Round, answers: &[Answer]) -> RenderView {
    let body = match round.state {
        RoundState::Open => Body::Prompt {
            question: round.question.clone(),
        },
        RoundState::Closed => Body::Revealed {
            question: round.question.clone(),
            answer: round.answer.clone(),
        },
    };

    let mut ordered: Vec<&Answer> = answers.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    let feed = ordered
        .into_iter()
        .map(|a| FeedEntry {
            badge: a.badge.clone(),
            user_id: a.user_id.clone(),
            text: a.text.clone(),
        })
        .collect();

    RenderView {
        header: Header {
            category: titleize(&round.category),
            value: format_currency(i64::from(round.value)),
        },
        body,
        feed,
        footer: format!("Originally aired {}", round.air_date.format("%B %-d, %Y")),
        fallback_text: fallback_text(round),
    }
}
