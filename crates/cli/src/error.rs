//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Scenario parsing error
    #[error("Failed to parse scenario: {message}")]
    ScenarioParse { message: String },

    /// Scenario event refers to a stream the node does not declare
    #[error("Scenario event {event} refers to unknown stream '{stream}': {message}")]
    UnknownStream {
        event: usize,
        stream: String,
        message: String,
    },

    /// Replay execution error
    #[error("Replay failed: {message}")]
    Replay { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn scenario_parse(message: impl Into<String>) -> Self {
        Self::ScenarioParse {
            message: message.into(),
        }
    }

    pub fn replay(message: impl Into<String>) -> Self {
        Self::Replay {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
