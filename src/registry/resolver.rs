//! Question-to-query resolution.
//!
//! Matching is deliberately simple and deterministic:
//!
//! 1. Both the question and the curated phrases are normalized into lowercase
//!    alphanumeric tokens (`"EUR/USD"` becomes `eur usd`).
//! 2. A question equal to a query's canonical question or one of its aliases is
//!    an exact match, which always wins.
//! 3. Otherwise a query matches when every one of its trigger phrases occurs in
//!    the question as a contiguous run of tokens. A trailing plural `s` is
//!    ignored here, so `spike` and `spikes` are the same word. The query with
//!    the most matched trigger tokens wins; ties go to the query loaded first.

use super::{CuratedQuery, CuratedStore};
use serde::Serialize;

/// How a question matched a curated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The question equals the canonical question or an alias.
    Exact,
    /// Every trigger phrase occurs in the question.
    Keywords,
}

/// Outcome of resolving a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A curated query answers the question.
    Matched {
        query: &'a CuratedQuery,
        kind: MatchKind,
        score: usize,
    },
    /// No curated query answers the question.
    NotFound,
}

impl<'a> Resolution<'a> {
    /// Returns the matched query, if any.
    pub fn query(&self) -> Option<&'a CuratedQuery> {
        match self {
            Self::Matched { query, .. } => Some(query),
            Self::NotFound => None,
        }
    }

    /// Returns true if a curated query was found.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Splits text into lowercase alphanumeric tokens.
pub fn normalize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A curated query with its phrases pre-tokenized.
#[derive(Debug)]
struct Entry {
    exact: Vec<Vec<String>>,
    triggers: Vec<Vec<String>>,
}

/// Matches free-text questions against a curated store.
#[derive(Debug)]
pub struct Resolver<'a> {
    store: &'a CuratedStore,
    entries: Vec<Entry>,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over the given store.
    pub fn new(store: &'a CuratedStore) -> Self {
        let entries = store
            .queries()
            .iter()
            .map(|q| Entry {
                exact: std::iter::once(&q.question)
                    .chain(q.aliases.iter())
                    .map(|s| normalize(s))
                    .filter(|tokens| !tokens.is_empty())
                    .collect(),
                triggers: q
                    .triggers
                    .iter()
                    .map(|s| normalize(s))
                    .filter(|tokens| !tokens.is_empty())
                    .collect(),
            })
            .collect();

        Self { store, entries }
    }

    /// Resolves a question to a curated query.
    pub fn resolve(&self, question: &str) -> Resolution<'a> {
        let tokens = normalize(question);
        if tokens.is_empty() {
            return Resolution::NotFound;
        }

        let queries = self.store.queries();

        if let Some(index) = self
            .entries
            .iter()
            .position(|entry| entry.exact.iter().any(|phrase| *phrase == tokens))
        {
            return Resolution::Matched {
                query: &queries[index],
                kind: MatchKind::Exact,
                score: tokens.len(),
            };
        }

        let mut best: Option<(usize, usize)> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.triggers.is_empty() {
                continue;
            }
            if !entry
                .triggers
                .iter()
                .all(|phrase| contains_phrase(&tokens, phrase))
            {
                continue;
            }
            let score: usize = entry.triggers.iter().map(Vec::len).sum();
            // Strictly greater keeps the earliest query on ties.
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }

        match best {
            Some((index, score)) => Resolution::Matched {
                query: &queries[index],
                kind: MatchKind::Keywords,
                score,
            },
            None => Resolution::NotFound,
        }
    }
}

/// Returns true if `phrase` occurs in `tokens` as a contiguous run.
fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty()
        && phrase.len() <= tokens.len()
        && tokens.windows(phrase.len()).any(|window| {
            window
                .iter()
                .zip(phrase)
                .all(|(token, word)| same_word(token, word))
        })
}

/// Shortest stem a plural `s` may be dropped from.
const MIN_STEM_LEN: usize = 3;

/// Token equality that treats `word` and `words` alike.
fn same_word(a: &str, b: &str) -> bool {
    let singular = |w: &str| -> String {
        match w.strip_suffix('s') {
            Some(stem) if stem.len() >= MIN_STEM_LEN && !stem.ends_with('s') => stem.to_string(),
            _ => w.to_string(),
        }
    };
    a == b || singular(a) == singular(b)
}
