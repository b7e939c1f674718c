//! Logging setup for FXLens.
//!
//! The terminal dashboard owns the screen, so it logs to a file. One-shot
//! commands log to stderr and keep stdout for their output.

use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Truncated file under the platform state directory.
    File,
    /// Standard error.
    Stderr,
}

impl LogTarget {
    /// Level used when `RUST_LOG` is unset.
    fn default_level(self) -> &'static str {
        match self {
            Self::File => "info",
            Self::Stderr => "warn",
        }
    }
}

/// Builds the filter from `RUST_LOG`, falling back to `default_level`.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Installs the global subscriber for `target`.
pub fn init(target: LogTarget) {
    match target {
        LogTarget::File => init_file_logging(),
        LogTarget::Stderr => init_stderr_logging(),
    }
}

fn init_file_logging() {
    let log_path = log_path();

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            return;
        }
    }

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(LogTarget::File.default_level()))
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(LogTarget::Stderr.default_level()))
        .with_writer(std::io::stderr)
        .init();
}

/// Location of the dashboard log file: `<state dir>/fxlens/fxlens.log`, then
/// the config directory, then the temp directory.
pub fn log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("fxlens").join("fxlens.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("fxlens").join("fxlens.log");
    }

    std::env::temp_dir().join("fxlens.log")
}
