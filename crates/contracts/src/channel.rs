//! InputChannel trait - Channel accessor abstraction
//!
//! The queue implementation behind a node input is owned by the channel
//! subsystem. Readiness handlers only see this interface.

use crate::{Packet, Timestamp};

/// Earliest queued timestamp, or the bound when nothing is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampOrBound {
    /// Earliest queued timestamp, or the channel bound
    pub timestamp: Timestamp,
    /// `true` when the channel is empty and `timestamp` is a bound
    pub is_bound: bool,
}

impl TimestampOrBound {
    /// A queued packet at `timestamp`
    pub fn queued(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            is_bound: false,
        }
    }

    /// An empty channel bounded at `timestamp`
    pub fn bound(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            is_bound: true,
        }
    }
}

/// Result of [`InputChannel::pop_packet_at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoppedPacket {
    /// Packet at the requested timestamp, `None` if the channel had none
    pub packet: Option<Packet>,
    /// Packets earlier than the requested timestamp that were discarded
    pub num_dropped: usize,
    /// Whether the channel is finished after this pop
    pub stream_done: bool,
}

/// Input channel accessor.
///
/// Implementations synchronize their own state; every method may be called
/// concurrently from several threads. A channel's bound only moves forward.
pub trait InputChannel: Send + Sync {
    /// Channel name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Earliest queued timestamp, or if empty the smallest timestamp a future
    /// packet may carry (`Done` once the channel is finished).
    fn min_timestamp_or_bound(&self) -> TimestampOrBound;

    /// Remove the packet at `timestamp`, discarding any earlier packets.
    fn pop_packet_at(&self, timestamp: Timestamp) -> PoppedPacket;
}
