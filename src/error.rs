//! Error types for FXLens.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for FXLens operations.
#[derive(Error, Debug)]
pub enum FxLensError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, unknown parameters, timeouts, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// SQL rejected by the read-only guard.
    #[error("Unsafe SQL: {0}")]
    Unsafe(String),

    /// LLM API errors (unreachable endpoint, bad response, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, out-of-range filters, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Curated query store errors (missing directory, bad TOML, duplicate ids).
    #[error("Registry error: {0}")]
    Registry(String),

    /// Unanswered-question log errors (permissions, disk full, malformed CSV).
    #[error("Log error: {0}")]
    Log(String),

    /// Internal application errors (terminal setup, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FxLensError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an unsafe-SQL error with the given message.
    pub fn unsafe_sql(msg: impl Into<String>) -> Self {
        Self::Unsafe(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a registry error with the given message.
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Creates a log error with the given message.
    pub fn log(msg: impl Into<String>) -> Self {
        Self::Log(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Unsafe(_) => "Unsafe SQL",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Registry(_) => "Registry Error",
            Self::Log(_) => "Log Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using FxLensError.
pub type Result<T> = std::result::Result<T, FxLensError>;
