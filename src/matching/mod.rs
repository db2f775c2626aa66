//! Fuzzy retrieval over a knowledge snapshot.
//!
//! Resolution is a pure function of the query and the snapshot: every entry
//! is scored with [`token_set_ratio`] on lower-cased text, the first entry
//! holding the maximum score wins, and the answer is accepted only when that
//! score reaches the threshold.

mod token_set;

pub use token_set::{indel_ratio, token_set_ratio};

use crate::knowledge::KnowledgeSnapshot;
use serde::Serialize;

/// Minimum score (0-100) for a stored answer to be returned.
pub const DEFAULT_THRESHOLD: u8 = 40;

/// Answer returned when the snapshot holds no entries.
pub const NO_DATA_ANSWER: &str =
    "I don't have any data to answer your question. Please try again.";

/// Answer returned for blank queries.
pub const REPHRASE_ANSWER: &str = "Could you please rephrase your question?";

/// Outcome of resolving a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub answer: String,
    /// Best score, rounded to an integer in `0..=100`.
    pub score: u8,
    pub matched: bool,
}

impl MatchResult {
    fn unmatched(answer: impl Into<String>, score: u8) -> Self {
        Self {
            answer: answer.into(),
            score,
            matched: false,
        }
    }
}

/// Clarification reply that echoes the caller's query verbatim.
pub fn clarification_answer(query: &str) -> String {
    format!(
        "I'm not sure how to answer that question about '{}'. Could you rephrase it or ask something else?",
        query
    )
}

/// Resolver with a configurable acceptance threshold.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    threshold: u8,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl Matcher {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold: threshold.min(100),
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Pick the best answer for `query` from `snapshot`.
    pub fn resolve(&self, query: &str, snapshot: &KnowledgeSnapshot) -> MatchResult {
        if snapshot.is_empty() {
            return MatchResult::unmatched(NO_DATA_ANSWER, 0);
        }

        if query.trim().is_empty() {
            return MatchResult::unmatched(REPHRASE_ANSWER, 0);
        }

        let query_lower = query.to_lowercase();
        let mut best: Option<(usize, f64)> = None;

        for (idx, entry) in snapshot.entries().iter().enumerate() {
            let score = token_set_ratio(&query_lower, &entry.question.to_lowercase());
            // Strict comparison keeps the earliest entry on ties.
            let improves = match best {
                Some((_, best_score)) => score > best_score,
                None => true,
            };
            if improves {
                best = Some((idx, score));
            }
        }

        match best {
            Some((idx, score)) if score >= f64::from(self.threshold) => MatchResult {
                answer: snapshot.entries()[idx].answer.clone(),
                score: round_score(score),
                matched: true,
            },
            Some((_, score)) => MatchResult::unmatched(clarification_answer(query), round_score(score)),
            None => MatchResult::unmatched(clarification_answer(query), 0),
        }
    }
}

/// Resolve with the default threshold.
pub fn resolve(query: &str, snapshot: &KnowledgeSnapshot) -> MatchResult {
    Matcher::default().resolve(query, snapshot)
}

fn round_score(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}
