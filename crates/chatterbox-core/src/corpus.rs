//! Per-chat message corpus.
//!
//! An append-only, size-bounded sequence of raw message lines plus a
//! monotone counter of every message the chat has ever produced. The
//! counter is deliberately independent of truncation: it feeds the
//! activity bonus in response selection, which should reward long-lived
//! chats even after old lines have been evicted.
//!
//! # Bounds
//!
//! The corpus is allowed to grow to `2 * max_messages` before a trim
//! cuts it back to exactly `max_messages` most-recent entries. Trimming
//! on every append would be O(n) per message; the slack factor keeps the
//! amortized cost low while bounding worst-case memory at a known
//! multiple.

use serde::{Deserialize, Serialize};

/// The accumulated raw message history for one chat.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCorpus {
    messages: Vec<String>,
    message_count: u64,
}

impl ChatCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a corpus from persisted lines and counter.
    ///
    /// A zero counter with a non-empty message list is normalized to
    /// the list length (older snapshots predate the counter).
    pub fn from_parts(messages: Vec<String>, message_count: u64) -> Self {
        let message_count = if message_count == 0 {
            messages.len() as u64
        } else {
            message_count
        };
        Self {
            messages,
            message_count,
        }
    }

    /// Record that a message was seen, without storing it.
    ///
    /// Called for every inbound message regardless of whether learning
    /// is enabled; only [`append`](ChatCorpus::append) is gated.
    pub fn record_seen(&mut self) {
        self.message_count += 1;
    }

    /// Append a line and enforce the size bound.
    ///
    /// The caller is responsible for having trimmed the text and checked
    /// the minimum length; the line is stored verbatim. When the corpus
    /// exceeds `2 * max_messages` it is cut back to the most recent
    /// `max_messages` entries.
    pub fn append(&mut self, text: String, max_messages: usize) {
        self.messages.push(text);
        if max_messages > 0 && self.messages.len() > 2 * max_messages {
            let excess = self.messages.len() - max_messages;
            self.messages.drain(..excess);
        }
    }

    /// The most recent `max_messages` entries — the trainer's only view.
    pub fn window(&self, max_messages: usize) -> &[String] {
        self.tail(max_messages)
    }

    /// The most recent `n` entries (or fewer).
    pub fn tail(&self, n: usize) -> &[String] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total messages ever seen, independent of truncation.
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Drop every stored line. The counter is preserved.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_window() {
        let mut corpus = ChatCorpus::new();
        for i in 0..10 {
            corpus.append(format!("message {}", i), 100);
        }
        assert_eq!(corpus.len(), 10);
        assert_eq!(corpus.window(3), &["message 7", "message 8", "message 9"]);
        assert_eq!(corpus.window(100).len(), 10);
    }

    #[test]
    fn test_trim_cuts_back_to_max() {
        let max = 5;
        let mut corpus = ChatCorpus::new();
        for i in 0..(2 * max) {
            corpus.append(format!("m{}", i), max);
            assert!(corpus.len() <= 2 * max);
        }
        assert_eq!(corpus.len(), 2 * max);

        // The append that pushes past the soft limit triggers the trim.
        corpus.append("overflow".to_string(), max);
        assert_eq!(corpus.len(), max);
        assert_eq!(corpus.tail(1), &["overflow"]);
    }

    #[test]
    fn test_counter_survives_trim_and_clear() {
        let mut corpus = ChatCorpus::new();
        for i in 0..30 {
            corpus.record_seen();
            corpus.append(format!("m{}", i), 4);
        }
        assert_eq!(corpus.message_count(), 30);
        assert!(corpus.len() <= 8);

        corpus.clear();
        assert!(corpus.is_empty());
        assert_eq!(corpus.message_count(), 30);
    }

    #[test]
    fn test_from_parts_normalizes_zero_counter() {
        let corpus = ChatCorpus::from_parts(vec!["a".into(), "b".into()], 0);
        assert_eq!(corpus.message_count(), 2);

        let corpus = ChatCorpus::from_parts(vec!["a".into()], 40);
        assert_eq!(corpus.message_count(), 40);
    }
}
