//! Replay scenarios: an ordered list of packet, bound and close events.
//!
//! ```toml
//! [[events]]
//! kind = "packet"
//! stream = "mic"
//! timestamp = 10
//! payload = "frame-0"
//!
//! [[events]]
//! kind = "bound"
//! stream = "AUDIO:1"
//! timestamp = 20
//!
//! [[events]]
//! kind = "close_all"
//! ```

use std::path::Path;
use std::sync::Arc;

use contracts::{ChannelId, Packet, TagMap, Timestamp};
use serde::{Deserialize, Serialize};
use stream_handler::PacketQueue;

use crate::error::{CliError, Result};

/// One input event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioEvent {
    /// Push a packet onto a stream
    Packet {
        stream: String,
        timestamp: i64,
        #[serde(default)]
        payload: String,
    },
    /// Promise no packet earlier than `timestamp` will arrive on a stream
    Bound { stream: String, timestamp: i64 },
    /// Close one stream
    Close { stream: String },
    /// Close every stream
    CloseAll,
}

/// Events in delivery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

impl Scenario {
    /// Load a scenario, format by extension (.toml / .json)
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::file_not_found(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CliError::scenario_parse(e.to_string()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| CliError::scenario_parse(e.to_string()))
    }

    /// Check every stream reference against the node's tag map.
    pub fn check_streams(&self, tag_map: &TagMap) -> Result<()> {
        for (index, event) in self.events.iter().enumerate() {
            if let Some(stream) = event.stream() {
                resolve(tag_map, index, stream)?;
            }
        }
        Ok(())
    }
}

impl ScenarioEvent {
    /// Stream reference, `None` for `CloseAll`
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Packet { stream, .. } | Self::Bound { stream, .. } | Self::Close { stream } => {
                Some(stream)
            }
            Self::CloseAll => None,
        }
    }

    /// Apply the event to the node's input queues.
    ///
    /// `index` is the event position, used in error messages.
    pub fn apply(&self, index: usize, tag_map: &TagMap, queues: &[Arc<PacketQueue>]) -> Result<()> {
        let queue_of = |stream: &str| queue_of(queues, tag_map, index, stream);

        match self {
            Self::Packet {
                stream,
                timestamp,
                payload,
            } => queue_of(stream)?
                .add_packet(Packet::new(Timestamp::Value(*timestamp), payload.clone()))
                .map_err(|e| CliError::replay(format!("event {index}: {e}"))),
            Self::Bound { stream, timestamp } => {
                queue_of(stream)?.set_next_timestamp_bound(Timestamp::Value(*timestamp));
                Ok(())
            }
            Self::Close { stream } => {
                queue_of(stream)?.close();
                Ok(())
            }
            Self::CloseAll => {
                queues.iter().for_each(|q| q.close());
                Ok(())
            }
        }
    }
}

fn queue_of<'a>(
    queues: &'a [Arc<PacketQueue>],
    tag_map: &TagMap,
    event: usize,
    stream: &str,
) -> Result<&'a PacketQueue> {
    let id = resolve(tag_map, event, stream)?;
    queues
        .get(id.index())
        .map(|q| q.as_ref())
        .ok_or_else(|| CliError::replay(format!("no queue for channel {id}")))
}

fn resolve(tag_map: &TagMap, event: usize, stream: &str) -> Result<ChannelId> {
    tag_map
        .resolve(stream)
        .map_err(|e| CliError::UnknownStream {
            event,
            stream: stream.to_string(),
            message: e.to_string(),
        })
}
