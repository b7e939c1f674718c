//! Read-only guard for SQL sent to the forex database.
//!
//! Curated SQL is vetted by hand, but it still passes through the guard, and
//! generated SQL must pass it before execution. Only a single, read-only
//! SELECT is allowed through.

mod parser;

pub use parser::{classify_sql, SqlClassifier};

use crate::error::{FxLensError, Result};
use std::fmt;

/// Functions with side effects outside the result set.
const FORBIDDEN_FUNCTIONS: &[&str] = &[
    "pg_sleep",
    "pg_terminate_backend",
    "pg_cancel_backend",
    "pg_read_file",
    "pg_read_binary_file",
    "lo_import",
    "lo_export",
    "dblink",
    "dblink_exec",
    "set_config",
    "nextval",
    "setval",
];

/// How dangerous a statement is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyLevel {
    /// Reads data only.
    Safe,
    /// Changes rows.
    Mutating,
    /// Removes data, changes schema or permissions.
    Destructive,
}

impl SafetyLevel {
    fn priority(self) -> u8 {
        match self {
            Self::Safe => 0,
            Self::Mutating => 1,
            Self::Destructive => 2,
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Mutating => write!(f, "mutating"),
            Self::Destructive => write!(f, "destructive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Explain,
    Show,
    Insert,
    Update,
    Merge,
    Copy,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Permission,
    Unknown,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Select => "SELECT",
            Self::Explain => "EXPLAIN",
            Self::Show => "SHOW",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Merge => "MERGE",
            Self::Copy => "COPY",
            Self::Delete => "DELETE",
            Self::Drop => "DROP",
            Self::Truncate => "TRUNCATE",
            Self::Alter => "ALTER",
            Self::Create => "CREATE",
            Self::Permission => "GRANT/REVOKE",
            Self::Unknown => "unknown statement",
        };
        f.write_str(name)
    }
}

/// What the classifier found in a piece of SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub level: SafetyLevel,
    /// The most dangerous statement kind found.
    pub kind: StatementKind,
    pub statement_count: usize,
    /// The query takes row locks (`FOR UPDATE` and friends).
    pub writes: bool,
    /// Why the SQL could not be classified normally.
    pub reason: Option<String>,
}

impl Classification {
    fn new(level: SafetyLevel, kind: StatementKind, statement_count: usize) -> Self {
        Self {
            level,
            kind,
            statement_count,
            writes: false,
            reason: None,
        }
    }

    fn rejected(kind: StatementKind, reason: impl Into<String>) -> Self {
        Self {
            level: SafetyLevel::Destructive,
            kind,
            statement_count: 0,
            writes: false,
            reason: Some(reason.into()),
        }
    }

    /// Returns true for exactly one side-effect-free SELECT.
    pub fn is_read_only_select(&self) -> bool {
        self.level == SafetyLevel::Safe
            && self.kind == StatementKind::Select
            && self.statement_count == 1
            && !self.writes
    }
}

/// Fails with [`FxLensError::Unsafe`] unless `sql` is a single read-only SELECT.
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let classification = classify_sql(sql);

    if let Some(reason) = &classification.reason {
        return Err(FxLensError::unsafe_sql(reason.clone()));
    }
    if classification.statement_count > 1 {
        return Err(FxLensError::unsafe_sql(format!(
            "expected one statement, found {}",
            classification.statement_count
        )));
    }
    if classification.writes {
        return Err(FxLensError::unsafe_sql("row locking clauses are not allowed"));
    }
    if !classification.is_read_only_select() {
        return Err(FxLensError::unsafe_sql(format!(
            "{} statements are not allowed ({})",
            classification.kind, classification.level
        )));
    }

    if let Some(function) = forbidden_function(sql) {
        return Err(FxLensError::unsafe_sql(format!(
            "function {function}() is not allowed"
        )));
    }

    Ok(())
}

fn forbidden_function(sql: &str) -> Option<&'static str> {
    let lower = sql.to_lowercase();
    FORBIDDEN_FUNCTIONS.iter().copied().find(|name| {
        lower.match_indices(name).any(|(start, _)| {
            let before = lower[..start].chars().next_back();
            let after = lower[start + name.len()..].trim_start().chars().next();
            !before.is_some_and(|c| c.is_alphanumeric() || c == '_') && after == Some('(')
        })
    })
}
