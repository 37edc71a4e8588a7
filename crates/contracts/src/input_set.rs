//! InputSet - Handler output
//!
//! Per-invocation packet set delivered to node logic, plus readiness states.

use serde::{Deserialize, Serialize};

use crate::{ChannelId, Packet, Timestamp};

/// Node readiness reported by an input stream handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeReadiness {
    /// Not enough data yet
    NotReady,
    /// A set of inputs can be filled at the given timestamp
    ReadyForProcess(Timestamp),
    /// Every input is finished
    ReadyForClose,
}

impl NodeReadiness {
    /// Short label (used for metrics)
    pub fn label(&self) -> &'static str {
        match self {
            NodeReadiness::NotReady => "not_ready",
            NodeReadiness::ReadyForProcess(_) => "ready_for_process",
            NodeReadiness::ReadyForClose => "ready_for_close",
        }
    }
}

/// One channel's slot in an [`InputSet`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShard {
    /// Delivered packet, `None` when the channel had no packet at the timestamp
    pub packet: Option<Packet>,
    /// Whether the channel is finished
    pub done: bool,
    /// Whether the handler filled this shard in the current invocation
    pub filled: bool,
}

/// Destination of a fill, keyed by [`ChannelId`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSet {
    shards: Vec<InputShard>,
}

impl InputSet {
    /// Create an empty set for a node with `channel_count` inputs
    pub fn new(channel_count: usize) -> Self {
        Self {
            shards: vec![InputShard::default(); channel_count],
        }
    }

    /// Number of shards
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Whether the node has no inputs
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Shard of a channel
    pub fn get(&self, id: ChannelId) -> Option<&InputShard> {
        self.shards.get(id.index())
    }

    /// Mutable shard of a channel
    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut InputShard> {
        self.shards.get_mut(id.index())
    }

    /// Store a popped packet in the channel's shard
    ///
    /// Returns `false` if the id is outside this set.
    pub fn add_packet(&mut self, id: ChannelId, packet: Option<Packet>, done: bool) -> bool {
        match self.shards.get_mut(id.index()) {
            Some(shard) => {
                shard.packet = packet;
                shard.done = done;
                shard.filled = true;
                true
            }
            None => false,
        }
    }

    /// Channels filled in the current invocation
    pub fn filled_ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.shards
            .iter()
            .enumerate()
            .filter(|(_, shard)| shard.filled)
            .map(|(i, _)| ChannelId::new(i))
    }

    /// Number of filled shards carrying a packet
    pub fn packet_count(&self) -> usize {
        self.shards.iter().filter(|s| s.packet.is_some()).count()
    }

    /// Reset every shard before the next fill
    pub fn clear(&mut self) {
        self.shards.iter_mut().for_each(|s| *s = InputShard::default());
    }
}
