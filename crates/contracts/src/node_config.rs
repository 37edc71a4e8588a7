//! NodeConfig - Config Loader output
//!
//! Declares a node's inputs, which input stream handler drives it and the
//! handler options.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Handler used when the config does not name one
pub const DEFAULT_HANDLER: &str = "SyncSetInputStreamHandler";

/// Complete node configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NodeConfig {
    /// Node name
    #[validate(length(min = 1, message = "node name cannot be empty"))]
    pub name: String,

    /// Registered input stream handler name
    #[serde(default = "default_handler")]
    #[validate(length(min = 1, message = "handler name cannot be empty"))]
    pub handler: String,

    /// Input stream declarations (`TAG:index:name`, `TAG:name`, `name`)
    #[validate(length(min = 1, message = "at least one input stream is required"))]
    pub input_streams: Vec<String>,

    /// Capacity of each in-memory input queue
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, message = "queue_capacity must be > 0"))]
    pub queue_capacity: usize,

    /// Handler options
    #[serde(default)]
    #[validate(nested)]
    pub options: SyncSetHandlerOptions,
}

fn default_handler() -> String {
    DEFAULT_HANDLER.to_string()
}

fn default_queue_capacity() -> usize {
    100
}

/// Options of the sync-set handler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SyncSetHandlerOptions {
    /// Explicit sync sets. Unlisted inputs form one implicit trailing set.
    #[serde(default)]
    #[validate(nested)]
    pub sync_sets: Vec<SyncSetSpec>,
}

/// One explicitly configured sync set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SyncSetSpec {
    /// Member references (`TAG:index`, `TAG`, `:index` or a stream name)
    #[validate(length(min = 1, message = "sync set must name at least one stream"))]
    pub tag_index: Vec<String>,
}

impl SyncSetSpec {
    /// Build a spec from member references
    pub fn new<S: Into<String>>(members: impl IntoIterator<Item = S>) -> Self {
        Self {
            tag_index: members.into_iter().map(Into::into).collect(),
        }
    }
}

impl SyncSetHandlerOptions {
    /// Build options from explicit sets
    pub fn with_sets(sync_sets: Vec<SyncSetSpec>) -> Self {
        Self { sync_sets }
    }
}
