//! Message generation: contextual sub-model, ordered fallback, and
//! post-processing.
//!
//! The generator never fails loudly. Every strategy that comes up empty
//! falls through to the next one, and when the whole chain is exhausted
//! the caller gets `None`, which means "do not send".
//!
//! # Strategy order
//!
//! 0. Contextual override — a throwaway chain built from recent corpus
//!    lines that share a word with the inbound message, tried once with
//!    a reduced budget.
//! 1. Long sentence from the trained model, bounded by
//!    `[MIN_SENTENCE_CHARS, MAX_SENTENCE_CHARS]`.
//! 2. Short sentence (≤ [`SHORT_SENTENCE_MAX`]).
//! 3. Random entry from the chat's custom responses.
//! 4. Random entry from the last 100 raw corpus lines.
//!
//! # Post-processing
//!
//! The chosen candidate has `@name` mention tokens rewritten to link
//! markup, and in hype mode may receive a thematic ending (recorded in
//! the bounded used-endings history so the trainer can mix it back in).

use std::sync::LazyLock;

use rand::seq::IndexedRandom;
use rand::Rng;
use regex::Regex;
use tracing::debug;

use crate::corpus::ChatCorpus;
use crate::markov::Chain;
use crate::policy::ChatPolicy;
use crate::theme::HYPE_ENDINGS;
use crate::trainer::TrainedModel;

/// Bounds for the long-form strategy.
pub const MIN_SENTENCE_CHARS: usize = 10;
pub const MAX_SENTENCE_CHARS: usize = 500;

/// Character cap for the short-form strategy.
pub const SHORT_SENTENCE_MAX: usize = 50;

/// Retry budget for the main fallback strategies.
pub const GENERATION_TRIES: usize = 100;

/// Reduced retry budget for the contextual sub-model.
pub const CONTEXT_TRIES: usize = 30;

/// How far back the contextual filter looks.
pub const CONTEXT_WINDOW: usize = 500;

/// The contextual subset must exceed this many combined words.
pub const CONTEXT_MIN_WORDS: usize = 10;

/// The raw-corpus fallback draws from this many recent lines.
pub const RECENT_FALLBACK: usize = 100;

/// Bounded history of hype endings already handed out.
pub const USED_ENDINGS_CAP: usize = 100;

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\w+)").expect("mention pattern is valid"));

/// Produce a candidate message, or `None` when every strategy fails.
///
/// `used_endings` is mutated when a hype ending is appended; everything
/// else is read-only. The contextual attempt operates on a snapshot of
/// the matching corpus lines taken here, under whatever lock the caller
/// holds.
pub fn generate<R: Rng + ?Sized>(
    model: Option<&TrainedModel>,
    corpus: &ChatCorpus,
    policy: &ChatPolicy,
    custom_responses: &[String],
    used_endings: &mut Vec<String>,
    context_hint: &str,
    rng: &mut R,
) -> Option<String> {
    let model = model?;

    if let Some(sentence) = contextual_attempt(corpus, context_hint, rng) {
        return Some(post_process(sentence, policy, used_endings, rng));
    }

    let candidate = model
        .chain
        .make_sentence(rng, MIN_SENTENCE_CHARS, MAX_SENTENCE_CHARS, GENERATION_TRIES)
        .or_else(|| {
            model
                .chain
                .make_short_sentence(rng, SHORT_SENTENCE_MAX, GENERATION_TRIES)
        })
        .or_else(|| custom_responses.choose(rng).cloned())
        .or_else(|| corpus.tail(RECENT_FALLBACK).choose(rng).cloned())?;

    Some(post_process(candidate, policy, used_endings, rng))
}

/// The contextual override: build a throwaway chain from recent lines
/// that share one of the hint's first three words, and try one short
/// sentence. Any miss falls through silently.
fn contextual_attempt<R: Rng + ?Sized>(
    corpus: &ChatCorpus,
    context_hint: &str,
    rng: &mut R,
) -> Option<String> {
    let hint = context_hint.trim();
    if hint.is_empty() {
        return None;
    }

    let needles: Vec<String> = hint
        .to_lowercase()
        .split_whitespace()
        .take(3)
        .map(|w| w.to_string())
        .collect();
    if needles.is_empty() {
        return None;
    }

    let subset: Vec<&String> = corpus
        .tail(CONTEXT_WINDOW)
        .iter()
        .filter(|msg| {
            let lower = msg.to_lowercase();
            needles.iter().any(|n| lower.contains(n.as_str()))
        })
        .collect();

    let word_count: usize = subset.iter().map(|m| m.split_whitespace().count()).sum();
    if word_count <= CONTEXT_MIN_WORDS {
        return None;
    }

    let chain = Chain::from_lines(&subset);
    let sentence = chain.make_short_sentence(rng, SHORT_SENTENCE_MAX, CONTEXT_TRIES);
    if sentence.is_none() {
        debug!(matched = subset.len(), "contextual generation came up empty");
    }
    sentence
}

fn post_process<R: Rng + ?Sized>(
    candidate: String,
    policy: &ChatPolicy,
    used_endings: &mut Vec<String>,
    rng: &mut R,
) -> String {
    let mut result = rewrite_mentions(&candidate);

    if policy.hype_mode && rng.random::<f64>() < 0.4 {
        let ending_chance = 0.2 + policy.hype_intensity as f64 * 0.1;
        if rng.random::<f64>() < ending_chance {
            if let Some(ending) = HYPE_ENDINGS.choose(rng) {
                result.push_str(ending);
                record_used_ending(used_endings, &result);
            }
        }
    }

    result
}

/// Rewrite `@name` tokens into platform user-link markup.
pub fn rewrite_mentions(text: &str) -> String {
    MENTION_RE
        .replace_all(text, r#"<a href="https://t.me/$1">@$1</a>"#)
        .into_owned()
}

fn record_used_ending(used_endings: &mut Vec<String>, phrase: &str) {
    if used_endings.iter().any(|p| p == phrase) {
        return;
    }
    used_endings.push(phrase.to_string());
    if used_endings.len() > USED_ENDINGS_CAP {
        let excess = used_endings.len() - USED_ENDINGS_CAP;
        used_endings.drain(..excess);
    }
}
