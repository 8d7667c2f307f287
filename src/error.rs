use std::io;
use thiserror::Error;

use crate::config::settings::ConfigError;

/// Errors from running the external git binary.
///
/// Cloneable so that a coalesced read can deliver the same failure to every
/// subscriber waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("failed to spawn '{binary}': {message}")]
    SpawnFailure { binary: String, message: String },

    #[error("command timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("'{operation}' failed with exit code {code}: {stderr}")]
    NonZeroExit {
        operation: String,
        code: i32,
        stderr: String,
    },

    #[error("request was cancelled before it started")]
    Cancelled,

    #[error("operation queue is full")]
    QueueFull,

    #[error("operation queue has shut down")]
    QueueClosed,
}

/// Errors from turning raw command output into domain records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed output: {0}")]
    Malformed(String),
}

/// Top-level engine error that wraps all module-specific errors.
///
/// Module errors convert automatically via `From`, so `?` works across
/// layer boundaries while the original context is preserved.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not a git repository")]
    NotARepository,

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("commit graph is inconsistent: {0}")]
    GraphInconsistency(String),

    #[error("unsupported git version {0} (minimum {1})")]
    UnsupportedGitVersion(String, String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for command execution.
pub type ExecResult<T> = std::result::Result<T, ExecutionError>;

/// Result type for parsing.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Result type for engine-level operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
