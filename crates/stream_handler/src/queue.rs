//! In-memory input channel with timestamp bound tracking.
//!
//! Uses index-based separation:
//! - HeapRb stores lightweight metadata (timestamp + slab key)
//! - Slab stores the payloads
//!
//! Timestamps are strictly increasing, so the front of the ring is always the
//! earliest packet.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use contracts::{
    ContractError, InputChannel, Packet, PoppedPacket, TagMap, Timestamp, TimestampOrBound,
};
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

/// Lightweight metadata stored in ring buffer
#[derive(Debug, Clone, Copy)]
struct PacketMeta {
    timestamp: Timestamp,
    slab_key: usize,
}

struct QueueState {
    index: HeapRb<PacketMeta>,
    storage: Slab<Bytes>,
    /// Smallest timestamp the next packet may carry; `Done` once closed
    bound: Timestamp,
    dropped_count: u64,
    added_count: u64,
}

impl QueueState {
    fn front(&self) -> Option<PacketMeta> {
        self.index.iter().next().copied()
    }

    fn pop_front(&mut self) -> Option<Packet> {
        let meta = self.index.try_pop()?;
        let payload = self.storage.remove(meta.slab_key);
        Some(Packet {
            timestamp: meta.timestamp,
            payload,
        })
    }
}

/// Bounded packet queue implementing [`InputChannel`].
///
/// All methods take `&self`; state lives behind a mutex owned by the queue,
/// independent of any handler lock.
pub struct PacketQueue {
    name: String,
    capacity: usize,
    state: Mutex<QueueState>,
}

impl fmt::Debug for PacketQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("PacketQueue")
            .field("name", &self.name)
            .field("len", &state.index.occupied_len())
            .field("capacity", &self.capacity)
            .field("bound", &state.bound)
            .finish()
    }
}

impl PacketQueue {
    /// Create an empty queue. The initial bound is `PreStream`.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            capacity,
            state: Mutex::new(QueueState {
                index: HeapRb::new(capacity),
                storage: Slab::with_capacity(capacity),
                bound: Timestamp::PreStream,
                dropped_count: 0,
                added_count: 0,
            }),
        }
    }

    /// Create one queue per channel of `tag_map`, in channel id order.
    pub fn for_tag_map(tag_map: &TagMap, capacity: usize) -> Vec<Arc<PacketQueue>> {
        tag_map
            .ids()
            .map(|id| {
                let name = tag_map.name(id).unwrap_or_default();
                Arc::new(PacketQueue::new(name, capacity))
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Queue state stays consistent across a panic in a caller, so the
        // poisoned guard is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a packet.
    ///
    /// # Errors
    /// - Queue closed
    /// - Timestamp not allowed in a stream, or below the current bound
    /// - Queue full
    pub fn add_packet(&self, packet: Packet) -> Result<(), ContractError> {
        let mut state = self.lock();
        let timestamp = packet.timestamp;

        if state.bound == Timestamp::Done {
            return Err(ContractError::ChannelClosed {
                channel: self.name.clone(),
            });
        }
        if !timestamp.is_allowed_in_stream() {
            return Err(ContractError::TimestampNotAllowed {
                channel: self.name.clone(),
                timestamp,
            });
        }
        if timestamp < state.bound {
            return Err(ContractError::TimestampOutOfOrder {
                channel: self.name.clone(),
                timestamp,
                bound: state.bound,
            });
        }
        if state.index.is_full() {
            return Err(ContractError::QueueFull {
                channel: self.name.clone(),
                capacity: self.capacity,
            });
        }

        let slab_key = state.storage.insert(packet.payload);
        let meta = PacketMeta {
            timestamp,
            slab_key,
        };
        if state.index.try_push(meta).is_err() {
            state.storage.remove(slab_key);
            return Err(ContractError::QueueFull {
                channel: self.name.clone(),
                capacity: self.capacity,
            });
        }
        state.bound = timestamp.next_allowed_in_stream();
        state.added_count += 1;

        observability::record_queue_depth(&self.name, state.index.occupied_len());
        Ok(())
    }

    /// Promise that no future packet is earlier than `bound`.
    ///
    /// Bounds only move forward; a lower bound is ignored.
    pub fn set_next_timestamp_bound(&self, bound: Timestamp) {
        let mut state = self.lock();
        if bound > state.bound {
            state.bound = bound;
        } else if bound < state.bound {
            tracing::debug!(
                channel = %self.name,
                requested = %bound,
                current = %state.bound,
                "ignoring bound below current bound"
            );
        }
    }

    /// Close the channel. Queued packets are still delivered.
    pub fn close(&self) {
        self.lock().bound = Timestamp::Done;
    }

    /// Number of queued packets
    pub fn len(&self) -> usize {
        self.lock().index.occupied_len()
    }

    /// Whether no packet is queued
    pub fn is_empty(&self) -> bool {
        self.lock().index.is_empty()
    }

    /// Whether the channel was closed (packets may still be queued)
    pub fn is_closed(&self) -> bool {
        self.lock().bound == Timestamp::Done
    }

    /// Whether the channel is closed and drained
    pub fn is_done(&self) -> bool {
        let state = self.lock();
        state.bound == Timestamp::Done && state.index.is_empty()
    }

    /// Queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Packets discarded by pops at a later timestamp
    pub fn dropped_count(&self) -> u64 {
        self.lock().dropped_count
    }

    /// Packets accepted so far
    pub fn added_count(&self) -> u64 {
        self.lock().added_count
    }
}

impl InputChannel for PacketQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_timestamp_or_bound(&self) -> TimestampOrBound {
        let state = self.lock();
        match state.front() {
            Some(meta) => TimestampOrBound::queued(meta.timestamp),
            None => TimestampOrBound::bound(state.bound),
        }
    }

    fn pop_packet_at(&self, timestamp: Timestamp) -> PoppedPacket {
        let mut state = self.lock();

        let mut num_dropped = 0;
        while matches!(state.front(), Some(meta) if meta.timestamp < timestamp) {
            state.pop_front();
            num_dropped += 1;
        }

        let packet = match state.front() {
            Some(meta) if meta.timestamp == timestamp => state.pop_front(),
            _ => None,
        };

        if state.index.is_empty() && state.bound <= timestamp {
            state.bound = timestamp.next_allowed_in_stream();
        }
        state.dropped_count += num_dropped as u64;

        let stream_done = state.index.is_empty() && state.bound == Timestamp::Done;
        observability::record_queue_depth(&self.name, state.index.occupied_len());

        PoppedPacket {
            packet,
            num_dropped,
            stream_done,
        }
    }
}
