//! Chat Log — bounded in-memory chat history.
//!
//! DESIGN
//! ======
//! Append-only ring buffer. At capacity the oldest entry is evicted, so
//! memory stays bounded without relying on restarts. Timestamps are
//! generated server-side at append time; a client-supplied timestamp is
//! never trusted, which keeps replayed history and live broadcasts in the
//! same order for every observer.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::frame::{ErrorCode, now_ms};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat message too long (max {max} characters, got {len})")]
    TooLong { max: usize, len: usize },
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::TooLong { .. } => "E_CHAT_TOO_LONG",
        }
    }
}

/// One chat message as stored and as broadcast. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub name: String,
    pub text: String,
    /// Milliseconds since Unix epoch, set by the server at append time.
    pub ts: i64,
}

// =============================================================================
// CHAT LOG
// =============================================================================

pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    cap: usize,
}

impl ChatLog {
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self { entries: VecDeque::with_capacity(cap), cap }
    }

    /// Validate a message against the configured length cap. Rejected
    /// messages are never truncated.
    pub fn validate(text: &str, max_len: usize) -> Result<(), ChatError> {
        let len = text.chars().count();
        if len > max_len {
            return Err(ChatError::TooLong { max: max_len, len });
        }
        Ok(())
    }

    /// Append an entry, evicting the oldest when at capacity. Returns the
    /// stored entry — byte-identical to what `snapshot` will later return.
    pub fn append(&mut self, name: impl Into<String>, text: impl Into<String>) -> ChatEntry {
        self.append_at(name, text, now_ms())
    }

    /// Internal: append with explicit timestamp (for testing).
    pub(crate) fn append_at(&mut self, name: impl Into<String>, text: impl Into<String>, ts: i64) -> ChatEntry {
        let entry = ChatEntry { name: name.into(), text: text.into(), ts };
        if self.entries.len() == self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.clone());
        entry
    }

    /// Full current history in chronological order, for join replay.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChatEntry> {
        self.entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
