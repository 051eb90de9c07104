// src/errors.rs

//! Crate-wide error type and result alias.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// The command could not be resolved or started. Raised before any OS
    /// process exists.
    #[error("cannot launch '{command}': {reason} (search path: {search_path})")]
    Launch {
        command: String,
        search_path: String,
        reason: String,
    },

    /// Input was written to a process whose input is closed or which has
    /// already exited.
    #[error("input of '{command}' is closed")]
    InputClosed { command: String },

    #[error("no process found for '{0}'")]
    NotFound(String),

    #[error("'{fragment}' matches more than one process: {}", .candidates.join(", "))]
    Ambiguous {
        fragment: String,
        candidates: Vec<String>,
    },

    #[error("'{command}' did not finish within {timeout:?}")]
    TimeoutExceeded { command: String, timeout: Duration },

    #[error("'{command}' exited with status {exit_code}")]
    NonZeroExit { command: String, exit_code: i32 },

    #[error("waiting for '{command}' failed: {message}")]
    Wait { command: String, message: String },

    #[error("signalling '{command}' failed: {message}")]
    Signal { command: String, message: String },

    /// Failures collected while stopping or terminating a set of processes.
    #[error("{} process(es) failed to shut down: {}", .0.len(), CleanupList(.0))]
    Cleanup(Vec<CleanupFailure>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One handle that could not be stopped or terminated during a sweep.
#[derive(Debug)]
pub struct CleanupFailure {
    pub command: String,
    pub error: HarnessError,
}

struct CleanupList<'a>(&'a [CleanupFailure]);

impl fmt::Display for CleanupList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, failure) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.command, failure.error)?;
        }
        Ok(())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HarnessError>;
