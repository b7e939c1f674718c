//! Helpers for driving the `fxlens` binary.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// An isolated working directory with its own unanswered log and no config.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("unanswered.csv")
    }

    fn queries_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("queries")
    }

    /// Runs `fxlens` with the sample database, the shipped queries and this
    /// fixture's log. Returns (exit code, stdout, stderr).
    pub fn run(&self, args: &[&str]) -> (i32, String, String) {
        let mut full = vec!["--mock-db"];
        full.extend_from_slice(args);
        self.run_without_database(&full)
    }

    /// Like [`Fixture::run`], but with no database configured at all.
    pub fn run_without_database(&self, args: &[&str]) -> (i32, String, String) {
        let output = Command::new(env!("CARGO_BIN_EXE_fxlens"))
            .current_dir(self.dir.path())
            .arg("--config")
            .arg(self.dir.path().join("missing.toml"))
            .arg("--queries")
            .arg(Self::queries_dir())
            .arg("--log")
            .arg(self.log_path())
            .args(args)
            .env_remove("DATABASE_URL")
            .env_remove("POSTGRES_URL")
            .env_remove("DB_HOST")
            .env_remove("DB_NAME")
            .env_remove("DB_USER")
            .env_remove("DB_PASSWORD")
            .env_remove("FXLENS_CONFIG")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute fxlens");

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        (exit_code, stdout, stderr)
    }
}
