//! Layered error definitions
//!
//! Categorized by source: config / tag map / channel

use thiserror::Error;

use crate::Timestamp;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Tag Map Errors =====
    /// Malformed input stream declaration
    #[error("invalid stream spec '{spec}': {message}")]
    InvalidStreamSpec { spec: String, message: String },

    /// Malformed `TAG:index` reference
    #[error("invalid tag/index '{spec}': {message}")]
    InvalidTagIndex { spec: String, message: String },

    // ===== Channel Errors =====
    /// Packet timestamp is not allowed in a stream
    #[error("channel '{channel}': timestamp {timestamp} is not allowed in a stream")]
    TimestampNotAllowed { channel: String, timestamp: Timestamp },

    /// Packet timestamp is below the channel bound
    #[error("channel '{channel}': timestamp {timestamp} is below the current bound {bound}")]
    TimestampOutOfOrder {
        channel: String,
        timestamp: Timestamp,
        bound: Timestamp,
    },

    /// Queue capacity exceeded
    #[error("channel '{channel}' is full: capacity={capacity}")]
    QueueFull { channel: String, capacity: usize },

    /// Packet pushed after close
    #[error("channel '{channel}' is closed")]
    ChannelClosed { channel: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create stream spec error
    pub fn invalid_stream_spec(spec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStreamSpec {
            spec: spec.into(),
            message: message.into(),
        }
    }

    /// Create tag/index error
    pub fn invalid_tag_index(spec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTagIndex {
            spec: spec.into(),
            message: message.into(),
        }
    }
}
