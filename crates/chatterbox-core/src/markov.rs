//! Order-2 Markov chain over whitespace-delimited words.
//!
//! Each training line is one independent sequence: the walk can never
//! cross a line boundary, so generated sentences only ever recombine
//! words that appeared together inside a single message.
//!
//! # Algorithm
//!
//! 1. Pad each line with two begin markers and one end marker.
//! 2. Record every `(word[i-2], word[i-1]) -> word[i]` transition.
//!    Transitions are stored with multiplicity, so a walk that picks
//!    uniformly from the successor list is frequency-weighted for free.
//! 3. To generate, walk from the begin state until the end marker or a
//!    hard word cap, then join with single spaces.
//! 4. Reject candidates that fall outside the requested character
//!    bounds or that reproduce a training line verbatim, and retry up
//!    to the caller's budget.

use std::collections::{HashMap, HashSet};

use rand::seq::IndexedRandom;
use rand::Rng;

/// Hard cap on words per generated sentence. A walk that runs this long
/// without hitting the end marker is abandoned for that attempt.
const MAX_WALK_WORDS: usize = 60;

/// An order-2 word-level Markov chain.
///
/// Built once from a set of lines and never mutated afterwards; callers
/// that want fresh training data build a new chain.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    /// `(prev2, prev1) -> successors`. Empty strings are the begin
    /// padding; `None` is the end marker.
    transitions: HashMap<(String, String), Vec<Option<String>>>,
    /// Exact training lines, used to reject verbatim reproductions.
    seen_lines: HashSet<String>,
}

impl Chain {
    /// Build a chain from newline-independent training lines.
    ///
    /// Blank and whitespace-only lines are skipped. Returns a chain
    /// that [`is_empty`](Chain::is_empty) when no line contributed a
    /// transition.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut chain = Chain::default();
        for line in lines {
            chain.feed_line(line.as_ref());
        }
        chain
    }

    fn feed_line(&mut self, line: &str) {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            return;
        }
        self.seen_lines.insert(words.join(" "));

        let mut prev2 = String::new();
        let mut prev1 = String::new();
        for word in &words {
            self.transitions
                .entry((prev2.clone(), prev1.clone()))
                .or_default()
                .push(Some((*word).to_string()));
            prev2 = std::mem::replace(&mut prev1, (*word).to_string());
        }
        self.transitions
            .entry((prev2, prev1))
            .or_default()
            .push(None);
    }

    /// True when the chain has no begin state to walk from.
    pub fn is_empty(&self) -> bool {
        !self
            .transitions
            .contains_key(&(String::new(), String::new()))
    }

    /// One unconstrained walk from the begin state.
    fn walk<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        let mut prev2 = String::new();
        let mut prev1 = String::new();
        let mut words: Vec<String> = Vec::new();

        loop {
            let successors = self.transitions.get(&(prev2.clone(), prev1.clone()))?;
            match successors.choose(rng)? {
                Some(word) => {
                    words.push(word.clone());
                    if words.len() >= MAX_WALK_WORDS {
                        return None;
                    }
                    prev2 = std::mem::replace(&mut prev1, word.clone());
                }
                None => break,
            }
        }

        if words.is_empty() {
            None
        } else {
            Some(words.join(" "))
        }
    }

    /// Generate a sentence whose length falls within `[min_chars, max_chars]`.
    ///
    /// Attempts up to `tries` walks; each candidate is rejected when it
    /// is out of bounds or reproduces a training line verbatim. Returns
    /// `None` when the budget is exhausted.
    pub fn make_sentence<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        min_chars: usize,
        max_chars: usize,
        tries: usize,
    ) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        for _ in 0..tries {
            let Some(candidate) = self.walk(rng) else {
                continue;
            };
            let len = candidate.chars().count();
            if len < min_chars || len > max_chars {
                continue;
            }
            if self.seen_lines.contains(&candidate) {
                continue;
            }
            return Some(candidate);
        }
        None
    }

    /// Generate a sentence of at most `max_chars` characters.
    pub fn make_short_sentence<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        max_chars: usize,
        tries: usize,
    ) -> Option<String> {
        self.make_sentence(rng, 1, max_chars, tries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn training_lines() -> Vec<String> {
        (0..30)
            .flat_map(|i| {
                vec![
                    format!("the quick brown fox number {} jumps over the lazy dog", i),
                    format!("a slow green turtle number {} crawls under the busy bridge", i),
                ]
            })
            .collect()
    }

    #[test]
    fn test_empty_input_is_empty_chain() {
        let chain = Chain::from_lines::<&str>(&[]);
        assert!(chain.is_empty());

        let mut rng = StdRng::seed_from_u64(1);
        assert!(chain.make_sentence(&mut rng, 1, 500, 100).is_none());
    }

    #[test]
    fn test_whitespace_only_lines_ignored() {
        let chain = Chain::from_lines(&["   ", "\t", ""]);
        assert!(chain.is_empty());
    }

    #[test]
    fn test_generates_within_bounds() {
        let chain = Chain::from_lines(&training_lines());
        let mut rng = StdRng::seed_from_u64(42);

        let sentence = chain.make_sentence(&mut rng, 10, 500, 100);
        let sentence = sentence.expect("two interleavable templates must yield a novel sentence");
        let len = sentence.chars().count();
        assert!((10..=500).contains(&len), "length {} out of bounds", len);
    }

    #[test]
    fn test_rejects_verbatim_training_line() {
        // A single training line can only ever be reproduced verbatim,
        // so every attempt must be rejected.
        let chain = Chain::from_lines(&["only one training line here"]);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(chain.make_sentence(&mut rng, 1, 500, 100).is_none());
    }

    #[test]
    fn test_short_sentence_respects_cap() {
        let chain = Chain::from_lines(&training_lines());
        let mut rng = StdRng::seed_from_u64(99);
        if let Some(sentence) = chain.make_short_sentence(&mut rng, 50, 100) {
            assert!(sentence.chars().count() <= 50);
        }
    }

    #[test]
    fn test_never_crosses_line_boundaries() {
        // Two disjoint vocabularies: any generated sentence must stay
        // inside one of them.
        let chain = Chain::from_lines(&[
            "alpha beta gamma delta epsilon zeta",
            "one two three four five six",
        ]);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            if let Some(s) = chain.make_sentence(&mut rng, 1, 500, 10) {
                let greek = s.contains("alpha") || s.contains("beta") || s.contains("gamma");
                let nums = s.contains("one") || s.contains("two") || s.contains("three");
                assert!(!(greek && nums), "walk crossed line boundary: {}", s);
            }
        }
    }
}
