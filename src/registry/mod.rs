//! Curated query store.
//!
//! Loads the vetted, pre-written SQL queries that FXLens can answer from a
//! directory of TOML files. Each file holds one or more `[[query]]` tables:
//!
//! ```toml
//! [[query]]
//! id = "max_pip_move_week"
//! question = "What was the highest EUR/USD pip movement last week?"
//! triggers = ["highest", "pip movement", "last week"]
//! sql = "SELECT MAX(pip_hl) FROM forex_bars WHERE ..."
//! interpretation = "The widest intraday range of the week."
//! learn_more = ["https://www.babypips.com/learn/forex/pips-and-pipettes"]
//! ```
//!
//! The store is loaded once at startup and never mutated afterwards.

mod resolver;

pub use resolver::{normalize, MatchKind, Resolution, Resolver};

use crate::error::{FxLensError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A pre-written, vetted query mapped to one or more trigger phrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedQuery {
    /// Unique identifier across the whole store.
    pub id: String,

    /// Canonical natural-language question.
    pub question: String,

    /// Alternative phrasings that count as an exact match.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Phrases that must all appear in a question for a keyword match.
    #[serde(default)]
    pub triggers: Vec<String>,

    /// SQL text, with `:name` parameter placeholders.
    pub sql: String,

    /// Business-level explanation shown with the result.
    #[serde(default)]
    pub interpretation: Option<String>,

    /// Links for further reading.
    #[serde(default)]
    pub learn_more: Vec<String>,
}

/// On-disk layout of a curated query file.
#[derive(Debug, Deserialize)]
struct QueryFile {
    #[serde(default, rename = "query")]
    queries: Vec<CuratedQuery>,
}

/// The immutable set of curated queries, in load order.
#[derive(Debug, Clone, Default)]
pub struct CuratedStore {
    queries: Vec<CuratedQuery>,
    source: Option<PathBuf>,
}

impl CuratedStore {
    /// Builds a store from already-parsed queries, validating id uniqueness.
    pub fn from_queries(queries: Vec<CuratedQuery>) -> Result<Self> {
        let mut seen = HashSet::new();
        for query in &queries {
            if query.id.trim().is_empty() {
                return Err(FxLensError::registry(format!(
                    "curated query '{}' has an empty id",
                    query.question
                )));
            }
            if query.sql.trim().is_empty() {
                return Err(FxLensError::registry(format!(
                    "curated query '{}' has no SQL",
                    query.id
                )));
            }
            if !seen.insert(query.id.as_str()) {
                return Err(FxLensError::registry(format!(
                    "duplicate query id '{}'",
                    query.id
                )));
            }
        }

        Ok(Self {
            queries,
            source: None,
        })
    }

    /// Loads every `*.toml` file in `dir`, in file-name order.
    ///
    /// Fails if the directory is missing, a file cannot be read or parsed, an id
    /// is duplicated, or no queries are found at all.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            FxLensError::registry(format!(
                "Cannot read curated query directory {}: {e}",
                dir.display()
            ))
        })?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                FxLensError::registry(format!("Cannot list {}: {e}", dir.display()))
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                files.push(path);
            }
        }
        files.sort();

        let mut queries = Vec::new();
        for path in &files {
            let content = std::fs::read_to_string(path).map_err(|e| {
                FxLensError::registry(format!("Cannot read {}: {e}", path.display()))
            })?;
            let parsed = Self::parse_file(&content, path)?;
            debug!("Loaded {} curated queries from {}", parsed.len(), path.display());
            queries.extend(parsed);
        }

        if queries.is_empty() {
            return Err(FxLensError::registry(format!(
                "No curated queries found in {}",
                dir.display()
            )));
        }

        let mut store = Self::from_queries(queries)?;
        store.source = Some(dir.to_path_buf());
        info!(
            "Curated store loaded: {} queries from {} files in {}",
            store.len(),
            files.len(),
            dir.display()
        );
        Ok(store)
    }

    /// Parses one curated query file.
    fn parse_file(content: &str, path: &Path) -> Result<Vec<CuratedQuery>> {
        toml::from_str::<QueryFile>(content)
            .map(|file| file.queries)
            .map_err(|e| {
                FxLensError::registry(format!(
                    "Invalid curated query file {}:\n  {}",
                    path.display(),
                    e
                ))
            })
    }

    /// Returns the number of curated queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Returns true if the store holds no queries.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Returns the queries in load order.
    pub fn queries(&self) -> &[CuratedQuery] {
        &self.queries
    }

    /// Looks up a query by id.
    pub fn get(&self, id: &str) -> Option<&CuratedQuery> {
        self.queries.iter().find(|q| q.id == id)
    }

    /// Returns the directory the store was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
