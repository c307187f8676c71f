//! Token usage accounting.
//!
//! Vendors report usage differently inside one streamed round: Claude
//! sends input tokens up front and a running output count at the end,
//! Gemini repeats a cumulative snapshot on every chunk, `OpenAI` sends a
//! single block. [`Usage::merge_snapshot`] folds all of those into one
//! per-round figure by keeping the largest value seen for each field.
//! Rounds are then summed with `+=`.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Token counts for one round or a whole session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub input_tokens: u64,
    /// Tokens produced by the model.
    pub output_tokens: u64,
    /// Tokens spent on reasoning, if reported.
    pub reasoning_tokens: Option<u64>,
    /// Tokens served from the vendor's prompt cache.
    pub cache_read_tokens: Option<u64>,
    /// Tokens written into the vendor's prompt cache.
    pub cache_write_tokens: Option<u64>,
}

fn add_optional(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.saturating_add(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

fn max_optional(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

impl Usage {
    /// Folds a usage snapshot from the same round into this one.
    pub fn merge_snapshot(&mut self, snapshot: &Self) {
        self.input_tokens = self.input_tokens.max(snapshot.input_tokens);
        self.output_tokens = self.output_tokens.max(snapshot.output_tokens);
        self.reasoning_tokens = max_optional(self.reasoning_tokens, snapshot.reasoning_tokens);
        self.cache_read_tokens = max_optional(self.cache_read_tokens, snapshot.cache_read_tokens);
        self.cache_write_tokens =
            max_optional(self.cache_write_tokens, snapshot.cache_write_tokens);
    }

    /// Returns `true` when nothing has been counted.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign<&Usage> for Usage {
    fn add_assign(&mut self, rhs: &Self) {
        self.input_tokens = self.input_tokens.saturating_add(rhs.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(rhs.output_tokens);
        self.reasoning_tokens = add_optional(self.reasoning_tokens, rhs.reasoning_tokens);
        self.cache_read_tokens = add_optional(self.cache_read_tokens, rhs.cache_read_tokens);
        self.cache_write_tokens = add_optional(self.cache_write_tokens, rhs.cache_write_tokens);
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        *self += &rhs;
    }
}
