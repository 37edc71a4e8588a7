//! Packet - Timestamped unit of data flowing through a channel

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Timestamped payload.
///
/// Payload uses `Bytes` so handing packets from a queue to an input set never
/// copies the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Stream timestamp
    pub timestamp: Timestamp,
    /// Opaque payload
    pub payload: Bytes,
}

impl Packet {
    /// Create a packet
    pub fn new(timestamp: Timestamp, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }

    /// Create a packet without payload
    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            payload: Bytes::new(),
        }
    }
}
