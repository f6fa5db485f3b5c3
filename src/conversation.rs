//! # Conversation turns and history windowing
//!
//! A conversation is an ordered slice of [`ConversationTurn`]s, oldest first.
//! Callers own the sequence; the reply generator only reads it.
//!
//! Before history is sent upstream it passes through a [`HistoryWindow`], which
//! keeps request payloads bounded:
//!
//! - `max_turns` keeps at most the N most recent turns.
//! - `max_tokens` then evicts the oldest turns until the remaining text fits the
//!   budget, counted with `tiktoken_rs::cl100k_base`.
//! - After any eviction, a leading assistant turn is dropped as well so the
//!   window opens on a customer message.
//!
//! [`HistoryWindow::unbounded`] disables all of this and forwards the history
//! untouched.
//!
//! ```rust
//! use applemar_bot::conversation::{ConversationTurn, HistoryWindow};
//!
//! let history = vec![
//!     ConversationTurn::customer("Olá"),
//!     ConversationTurn::assistant("Olá! Em que posso ajudar?"),
//!     ConversationTurn::customer("Têm o MacBook em stock?"),
//! ];
//! let window = HistoryWindow { max_turns: Some(1), max_tokens: None };
//! assert_eq!(window.apply(&history).len(), 1);
//! ```

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tiktoken_rs::{CoreBPE, cl100k_base};
use uuid::Uuid;

/// Who produced a turn.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Customer,
    Assistant,
}

/// One message exchanged in a conversation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub text: String,
    pub origin: Origin,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn stamped with a fresh id and the current time.
    pub fn new(origin: Origin, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            origin,
            created_at: Utc::now(),
        }
    }

    pub fn customer(text: impl Into<String>) -> Self {
        Self::new(Origin::Customer, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Origin::Assistant, text)
    }

    /// Same as [`new`](Self::new) with an explicit timestamp.
    pub fn at(origin: Origin, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            ..Self::new(origin, text)
        }
    }
}

static BPE: Lazy<Option<CoreBPE>> = Lazy::new(|| match cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(err) => {
        tracing::warn!("cl100k_base tokenizer unavailable, estimating tokens: {err}");
        None
    }
});

/// Count tokens in `text`, falling back to a 4-chars-per-token estimate when
/// the tokenizer cannot be loaded.
pub fn count_tokens(text: &str) -> usize {
    match BPE.as_ref() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => text.chars().count().div_ceil(4),
    }
}

/// Bounding policy applied to history before each upstream request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct HistoryWindow {
    /// Most recent turns to keep. `None` keeps all.
    pub max_turns: Option<usize>,

    /// Token budget for the kept turns' text. `None` disables the budget.
    pub max_tokens: Option<usize>,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            max_turns: Some(40),
            max_tokens: Some(6000),
        }
    }
}

impl HistoryWindow {
    /// Forward every turn as-is.
    pub const fn unbounded() -> Self {
        Self {
            max_turns: None,
            max_tokens: None,
        }
    }

    /// Return the suffix of `history` that fits this window.
    pub fn apply<'h>(&self, history: &'h [ConversationTurn]) -> &'h [ConversationTurn] {
        let mut start = match self.max_turns {
            Some(max) => history.len().saturating_sub(max),
            None => 0,
        };

        if let Some(budget) = self.max_tokens {
            let mut used: usize = history[start..].iter().map(|t| count_tokens(&t.text)).sum();
            while used > budget && start < history.len() {
                used -= count_tokens(&history[start].text);
                start += 1;
            }
        }

        if start > 0 && history.get(start).map(|t| t.origin) == Some(Origin::Assistant) {
            start += 1;
        }

        if start > 0 {
            tracing::debug!(
                "History window dropped {} of {} turns",
                start,
                history.len()
            );
        }

        &history[start..]
    }
}
