//! Input stream handler error types

use contracts::ContractError;
use thiserror::Error;

/// Handler-specific errors
///
/// Configuration and consistency faults are never retried; the executor must
/// abort the run when it sees one.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Sync set configuration fault, detected at run start
    #[error("sync set config error at '{field}': {message}")]
    Config { field: String, message: String },

    /// Broken invariant between readiness evaluation and fill
    #[error("consistency fault: {message}")]
    Consistency { message: String },

    /// No factory registered under this name
    #[error("unknown input stream handler '{name}'")]
    UnknownHandler { name: String },

    /// Channel list does not match the tag map
    #[error("node '{node}' declares {expected} input streams but {actual} channels were given")]
    ChannelCountMismatch {
        node: String,
        expected: usize,
        actual: usize,
    },

    /// Handler state mutex poisoned by a panicking thread
    #[error("handler state lock poisoned")]
    LockPoisoned,

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl HandlerError {
    /// Create configuration error
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create consistency fault
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }

    /// Whether this is a consistency fault
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency { .. })
    }

    /// Whether this is a configuration fault
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::UnknownHandler { .. })
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, HandlerError>;
