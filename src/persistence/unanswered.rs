//! Unanswered-question log.
//!
//! An append-only CSV file with the columns `timestamp,question,failed_sql`.
//! Records are flushed and synced before `append` returns, so they survive a
//! restart. Nothing in normal operation rewrites or removes existing rows; the
//! only destructive operation is the explicit admin [`UnansweredLog::clear`].

use crate::error::{FxLensError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column headers written at the top of a new log file.
const HEADER: [&str; 3] = ["timestamp", "question", "failed_sql"];

/// A question the dashboard could not answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnansweredRecord {
    /// When the question was asked (RFC 3339, UTC).
    pub timestamp: String,
    /// The raw question text.
    pub question: String,
    /// SQL that was tried and failed, or an `ERROR: ...` note. Empty for plain misses.
    #[serde(default)]
    pub failed_sql: String,
}

impl UnansweredRecord {
    /// Creates a record stamped with the given time.
    pub fn new(question: impl Into<String>, failed_sql: Option<&str>, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            question: question.into(),
            failed_sql: failed_sql.unwrap_or_default().to_string(),
        }
    }
}

/// Handle to the CSV log file.
#[derive(Debug, Clone)]
pub struct UnansweredLog {
    path: PathBuf,
}

impl UnansweredLog {
    /// Creates a handle for the log at `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a question stamped with the current time.
    pub fn append(&self, question: &str, failed_sql: Option<&str>) -> Result<UnansweredRecord> {
        let record = UnansweredRecord::new(question, failed_sql, Utc::now());
        self.append_record(&record)?;
        Ok(record)
    }

    /// Appends a prepared record.
    pub fn append_record(&self, record: &UnansweredRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error("open", e))?;

        let needs_header = file
            .metadata()
            .map_err(|e| self.io_error("inspect", e))?
            .len()
            == 0;

        // Serialize the whole batch in memory so the file sees one write.
        let mut writer = csv::Writer::from_writer(Vec::new());
        if needs_header {
            writer
                .write_record(HEADER)
                .map_err(|e| FxLensError::log(format!("Failed to encode header: {e}")))?;
        }
        writer
            .write_record([&record.timestamp, &record.question, &record.failed_sql])
            .map_err(|e| FxLensError::log(format!("Failed to encode record: {e}")))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| FxLensError::log(format!("Failed to encode record: {}", e.error())))?;

        file.write_all(&bytes)
            .map_err(|e| self.io_error("write", e))?;
        file.sync_data().map_err(|e| self.io_error("sync", e))?;

        debug!("Logged unanswered question to {}", self.path.display());
        Ok(())
    }

    /// Reads every record in the log. A missing file is an empty log.
    pub fn read_all(&self) -> Result<Vec<UnansweredRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| FxLensError::log(format!("Failed to open {}: {e}", self.path.display())))?;

        reader
            .deserialize::<UnansweredRecord>()
            .map(|row| {
                row.map_err(|e| {
                    FxLensError::log(format!("Malformed row in {}: {e}", self.path.display()))
                })
            })
            .collect()
    }

    /// Returns the number of logged questions.
    pub fn count(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    /// Removes all records, leaving only the header. Admin use only.
    pub fn clear(&self) -> Result<()> {
        self.ensure_parent_dir()?;

        let mut file = File::create(&self.path).map_err(|e| self.io_error("truncate", e))?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(HEADER)
            .map_err(|e| FxLensError::log(format!("Failed to encode header: {e}")))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| FxLensError::log(format!("Failed to encode header: {}", e.error())))?;
        file.write_all(&bytes)
            .map_err(|e| self.io_error("write", e))?;
        file.sync_data().map_err(|e| self.io_error("sync", e))?;

        info!("Cleared unanswered question log {}", self.path.display());
        Ok(())
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                FxLensError::log(format!(
                    "Failed to create log directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        Ok(())
    }

    fn io_error(&self, action: &str, error: std::io::Error) -> FxLensError {
        FxLensError::log(format!(
            "Failed to {action} {}: {error}",
            self.path.display()
        ))
    }
}
