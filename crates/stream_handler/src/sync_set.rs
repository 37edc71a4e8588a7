//! Sync-set input stream handler.
//!
//! Inputs are split into sync sets. Each set is synchronized on its own the
//! way a node with only those inputs would be, and sets advance independently.
//! The node is called with the packets of exactly one set per invocation;
//! timestamps are increasing within a set but may jump around between sets.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use contracts::{
    ChannelId, InputSet, NodeReadiness, SyncSetHandlerOptions, TagMap, Timestamp,
};
use tracing::instrument;

use crate::error::{HandlerError, Result};
use crate::handler::{HandlerCore, InputStreamHandler, RunCallbacks};

/// Channels synchronized together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSet {
    /// Position at partition time; stable while earlier sets are removed
    origin: usize,
    implicit: bool,
    ids: Vec<ChannelId>,
}

impl SyncSet {
    /// Member channels in configuration order
    pub fn ids(&self) -> &[ChannelId] {
        &self.ids
    }

    /// Position of this set when the run started
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Whether this is the catch-all set of unassigned channels
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }
}

/// Split the node's channels into sync sets.
///
/// Every configured set becomes one sync set, in order. Channels not named by
/// any set form one trailing implicit set, omitted when empty.
///
/// # Errors
/// Empty set, reference that does not resolve, or a channel named twice.
pub fn partition_sync_sets(
    options: &SyncSetHandlerOptions,
    tag_map: &TagMap,
) -> Result<Vec<SyncSet>> {
    let mut sync_sets = Vec::with_capacity(options.sync_sets.len() + 1);
    let mut used_ids = HashSet::new();

    for (set_index, spec) in options.sync_sets.iter().enumerate() {
        if spec.tag_index.is_empty() {
            return Err(HandlerError::config(
                format!("sync_sets[{set_index}]"),
                "sync set must name at least one stream",
            ));
        }

        let mut ids = Vec::with_capacity(spec.tag_index.len());
        for (member_index, reference) in spec.tag_index.iter().enumerate() {
            let field = format!("sync_sets[{set_index}].tag_index[{member_index}]");
            let id = tag_map
                .resolve(reference)
                .map_err(|e| HandlerError::config(&field, e.to_string()))?;
            if !used_ids.insert(id) {
                return Err(HandlerError::config(
                    field,
                    format!("stream \"{reference}\" is in more than one sync set"),
                ));
            }
            ids.push(id);
        }

        sync_sets.push(SyncSet {
            origin: set_index,
            implicit: false,
            ids,
        });
    }

    let remaining: Vec<ChannelId> = tag_map.ids().filter(|id| !used_ids.contains(id)).collect();
    if !remaining.is_empty() {
        sync_sets.push(SyncSet {
            origin: sync_sets.len(),
            implicit: true,
            ids: remaining,
        });
    }

    Ok(sync_sets)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadySet {
    /// Position in the live list
    index: usize,
    timestamp: Timestamp,
}

#[derive(Debug, Default)]
struct SyncSetState {
    /// Set by a successful `prepare_for_run`
    prepared: bool,
    sync_sets: Vec<SyncSet>,
    /// Set ready to be filled; `None` means the ready timestamp is `Done`
    ready: Option<ReadySet>,
}

impl SyncSetState {
    /// Scan every live set, drop exhausted ones and remember the earliest
    /// ready set.
    fn evaluate(&mut self, core: &HandlerCore) -> Result<NodeReadiness> {
        if !self.prepared {
            return Ok(NodeReadiness::NotReady);
        }
        if let Some(ready) = self.ready {
            return Ok(NodeReadiness::ReadyForProcess(ready.timestamp));
        }

        let mut retained = Vec::with_capacity(self.sync_sets.len());
        let mut fault = None;

        for sync_set in std::mem::take(&mut self.sync_sets) {
            let (min_timestamp, min_bound) = match set_minimums(&sync_set, core) {
                Ok(minimums) => minimums,
                Err(e) => {
                    fault.get_or_insert(e);
                    retained.push(sync_set);
                    continue;
                }
            };

            if min_timestamp == Timestamp::Done {
                tracing::debug!(
                    node = %core.node(),
                    sync_set = sync_set.origin,
                    "sync set exhausted, removing"
                );
                observability::record_sync_set_exhausted(core.node(), sync_set.origin);
                continue;
            }

            if min_bound > min_timestamp {
                // The minimum is a queued packet and every empty channel is
                // bounded past it. Ties keep the earlier set.
                if self.ready.map_or(true, |r| min_timestamp < r.timestamp) {
                    self.ready = Some(ReadySet {
                        index: retained.len(),
                        timestamp: min_timestamp,
                    });
                }
            } else if min_bound < min_timestamp {
                fault.get_or_insert(HandlerError::consistency(format!(
                    "sync set {} has bound {min_bound} below its minimum {min_timestamp}",
                    sync_set.origin
                )));
            }

            retained.push(sync_set);
        }

        self.sync_sets = retained;
        observability::record_live_sync_sets(core.node(), self.sync_sets.len());

        if let Some(fault) = fault {
            self.ready = None;
            return Err(fault);
        }

        Ok(match self.ready {
            Some(ready) => NodeReadiness::ReadyForProcess(ready.timestamp),
            None if self.sync_sets.is_empty() => NodeReadiness::ReadyForClose,
            None => NodeReadiness::NotReady,
        })
    }

    /// Pop one packet at `timestamp` from every channel of the ready set.
    fn fill(
        &mut self,
        core: &HandlerCore,
        timestamp: Timestamp,
        input_set: &mut InputSet,
    ) -> Result<usize> {
        if !timestamp.is_allowed_in_stream() {
            return Err(HandlerError::consistency(format!(
                "fill timestamp {timestamp} is not allowed in a stream"
            )));
        }
        let ready = self
            .ready
            .ok_or_else(|| HandlerError::consistency("fill requested but no sync set is ready"))?;
        if ready.timestamp != timestamp {
            return Err(HandlerError::consistency(format!(
                "fill timestamp {timestamp} does not match ready timestamp {}",
                ready.timestamp
            )));
        }
        let sync_set = self.sync_sets.get(ready.index).ok_or_else(|| {
            HandlerError::consistency(format!("ready sync set {} is gone", ready.index))
        })?;

        let mut packets = 0;
        for &id in &sync_set.ids {
            let channel = core.channel(id)?;
            let popped = channel.pop_packet_at(timestamp);
            if popped.num_dropped != 0 {
                return Err(HandlerError::consistency(format!(
                    "dropped {} packet(s) on input stream \"{}\"",
                    popped.num_dropped,
                    channel.name()
                )));
            }
            if popped.packet.is_some() {
                packets += 1;
            }
            if !input_set.add_packet(id, popped.packet, popped.stream_done) {
                return Err(HandlerError::consistency(format!(
                    "input set has no slot for channel {id}"
                )));
            }
        }

        observability::record_invocation(core.node(), sync_set.origin, packets);
        tracing::trace!(
            node = %core.node(),
            sync_set = sync_set.origin,
            %timestamp,
            packets,
            "filled sync set"
        );

        self.ready = None;
        Ok(sync_set.origin)
    }
}

/// Minimum over the set of "earliest packet or bound", and minimum over only
/// the bounds of empty channels.
fn set_minimums(sync_set: &SyncSet, core: &HandlerCore) -> Result<(Timestamp, Timestamp)> {
    let mut min_timestamp = Timestamp::Done;
    let mut min_bound = Timestamp::Done;
    for &id in &sync_set.ids {
        let reported = core.channel(id)?.min_timestamp_or_bound();
        if reported.is_bound {
            min_bound = min_bound.min(reported.timestamp);
        }
        min_timestamp = min_timestamp.min(reported.timestamp);
    }
    Ok((min_timestamp, min_bound))
}

/// Input stream handler synchronizing independent sets of inputs.
///
/// A node is ready when any of its sync sets is ready in the classic sense:
/// some channel has a packet at the set's minimum timestamp and every empty
/// channel of the set is bounded past it.
#[derive(Debug)]
pub struct SyncSetInputStreamHandler {
    core: HandlerCore,
    options: SyncSetHandlerOptions,
    state: Mutex<SyncSetState>,
}

impl SyncSetInputStreamHandler {
    /// Registered name
    pub const NAME: &'static str = "SyncSetInputStreamHandler";

    /// Create the handler. Sets are resolved in `prepare_for_run`.
    pub fn new(core: HandlerCore, options: SyncSetHandlerOptions) -> Self {
        Self {
            core,
            options,
            state: Mutex::new(SyncSetState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SyncSetState>> {
        self.state.lock().map_err(|_| HandlerError::LockPoisoned)
    }

    /// Snapshot of the live sync sets
    pub fn sync_sets(&self) -> Result<Vec<SyncSet>> {
        Ok(self.lock()?.sync_sets.clone())
    }

}

impl InputStreamHandler for SyncSetInputStreamHandler {
    fn handler_name(&self) -> &'static str {
        Self::NAME
    }

    fn core(&self) -> &HandlerCore {
        &self.core
    }

    #[instrument(
        name = "sync_set_prepare_for_run",
        skip(self, callbacks),
        fields(node = %self.core.node(), configured = self.options.sync_sets.len())
    )]
    fn prepare_for_run(&self, callbacks: RunCallbacks) -> Result<()> {
        let partitioned = partition_sync_sets(&self.options, self.core.tag_map());
        {
            let mut state = self.lock()?;
            state.ready = None;
            match partitioned {
                Ok(sync_sets) => {
                    state.sync_sets = sync_sets;
                    state.prepared = true;
                }
                Err(e) => {
                    state.sync_sets.clear();
                    state.prepared = false;
                    return Err(e);
                }
            }
            tracing::debug!(sync_sets = state.sync_sets.len(), "partitioned inputs");
            observability::record_live_sync_sets(self.core.node(), state.sync_sets.len());
        }

        self.core.prepare_for_run(callbacks)
    }

    fn node_readiness(&self) -> Result<NodeReadiness> {
        let readiness = self.lock()?.evaluate(&self.core)?;
        observability::record_readiness(self.core.node(), &readiness);
        Ok(readiness)
    }

    fn live_sync_sets(&self) -> Result<usize> {
        Ok(self.lock()?.sync_sets.len())
    }

    #[instrument(
        level = "trace",
        name = "sync_set_fill_input_set",
        skip(self, input_set),
        fields(node = %self.core.node(), %timestamp)
    )]
    fn fill_input_set(&self, timestamp: Timestamp, input_set: &mut InputSet) -> Result<usize> {
        self.lock()?.fill(&self.core, timestamp, input_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use contracts::{InputChannel, Packet, SyncSetSpec};

    use crate::queue::PacketQueue;

    struct Fixture {
        handler: SyncSetInputStreamHandler,
        queues: Vec<Arc<PacketQueue>>,
    }

    impl Fixture {
        fn queue(&self, name: &str) -> &PacketQueue {
            let id = self.handler.core().tag_map().id_by_name(name).unwrap();
            &self.queues[id.index()]
        }

        fn push(&self, name: &str, value: i64) {
            self.queue(name)
                .add_packet(Packet::empty(Timestamp::Value(value)))
                .unwrap();
        }

        fn bound(&self, name: &str, value: i64) {
            self.queue(name)
                .set_next_timestamp_bound(Timestamp::Value(value));
        }

        fn id(&self, name: &str) -> ChannelId {
            self.handler.core().tag_map().id_by_name(name).unwrap()
        }
    }

    fn fixture(streams: &[&str], sets: &[&[&str]]) -> Fixture {
        let tag_map = TagMap::from_streams(streams).unwrap();
        let queues = PacketQueue::for_tag_map(&tag_map, 16);
        let channels: Vec<Arc<dyn InputChannel>> = queues
            .iter()
            .map(|q| q.clone() as Arc<dyn InputChannel>)
            .collect();
        let core = HandlerCore::new("test_node", tag_map, channels).unwrap();
        let options = SyncSetHandlerOptions::with_sets(
            sets.iter().map(|members| SyncSetSpec::new(members.iter().copied())).collect(),
        );
        let handler = SyncSetInputStreamHandler::new(core, options);
        handler.prepare_for_run(RunCallbacks::noop()).unwrap();
        Fixture { handler, queues }
    }

    fn names(fixture: &Fixture) -> Vec<Vec<String>> {
        let tag_map = fixture.handler.core().tag_map();
        fixture
            .handler
            .sync_sets()
            .unwrap()
            .iter()
            .map(|set| {
                set.ids()
                    .iter()
                    .map(|id| tag_map.name(*id).unwrap().to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_partition_explicit_and_implicit() {
        let f = fixture(&["A:a", "B:b", "C:c", "D:d"], &[&["A", "B"], &["C"]]);
        assert_eq!(
            names(&f),
            vec![vec!["a", "b"], vec!["c"], vec!["d"]]
        );
        let sets = f.handler.sync_sets().unwrap();
        assert!(!sets[1].is_implicit());
        assert!(sets[2].is_implicit());
        assert_eq!(sets[2].origin(), 2);
    }

    #[test]
    fn test_partition_without_implicit_set() {
        let f = fixture(&["A:a", "B:b"], &[&["B"], &["A"]]);
        assert_eq!(names(&f), vec![vec!["b"], vec!["a"]]);
    }

    #[test]
    fn test_partition_unset_is_single_set() {
        let f = fixture(&["A:a", "B:b", "c"], &[]);
        assert_eq!(f.handler.live_sync_sets().unwrap(), 1);
        assert!(f.handler.sync_sets().unwrap()[0].is_implicit());
    }

    #[test]
    fn test_partition_errors() {
        let tag_map = TagMap::from_streams(&["A:a", "B:b"][..]).unwrap();

        let empty = SyncSetHandlerOptions::with_sets(vec![SyncSetSpec::new(Vec::<String>::new())]);
        let err = partition_sync_sets(&empty, &tag_map).unwrap_err();
        assert!(err.is_config());

        let unknown = SyncSetHandlerOptions::with_sets(vec![SyncSetSpec::new(["Z"])]);
        let err = partition_sync_sets(&unknown, &tag_map).unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");

        let twice = SyncSetHandlerOptions::with_sets(vec![
            SyncSetSpec::new(["A"]),
            SyncSetSpec::new(["b", "A:0"]),
        ]);
        let err = partition_sync_sets(&twice, &tag_map).unwrap_err();
        assert!(
            err.to_string().contains("more than one sync set"),
            "got: {err}"
        );
    }

    #[test]
    fn test_prepare_for_run_resets_state() {
        let f = fixture(&["A:a", "B:b"], &[&["A"]]);
        f.push("a", 1);
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(1))
        );

        f.handler.prepare_for_run(RunCallbacks::noop()).unwrap();
        let mut inputs = InputSet::new(2);
        // Cursor was cleared, so a fill without evaluation is a fault.
        let err = f
            .handler
            .fill_input_set(Timestamp::Value(1), &mut inputs)
            .unwrap_err();
        assert!(err.is_consistency());
    }

    #[test]
    fn test_failed_prepare_is_not_ready_for_close() {
        let tag_map = TagMap::from_streams(&["A:a", "B:b"][..]).unwrap();
        let queues = PacketQueue::for_tag_map(&tag_map, 4);
        let channels: Vec<Arc<dyn InputChannel>> = queues
            .iter()
            .map(|q| q.clone() as Arc<dyn InputChannel>)
            .collect();
        let core = HandlerCore::new("test_node", tag_map, channels).unwrap();
        let options = SyncSetHandlerOptions::with_sets(vec![SyncSetSpec::new(["Z"])]);
        let handler = SyncSetInputStreamHandler::new(core, options);

        assert!(handler.prepare_for_run(RunCallbacks::noop()).unwrap_err().is_config());
        queues.iter().for_each(|q| q.close());
        assert_eq!(handler.node_readiness().unwrap(), NodeReadiness::NotReady);
        assert_eq!(handler.live_sync_sets().unwrap(), 0);
        assert_eq!(handler.schedule_invocations(4).unwrap(), 0);
    }

    #[test]
    fn test_fill_reports_filled_set() {
        let f = fixture(&["A:a", "B:b", "C:c"], &[&["C"]]);
        f.push("a", 3);
        f.push("b", 3);
        f.push("c", 5);
        f.bound("a", 10);
        f.bound("b", 10);

        let mut inputs = InputSet::new(3);
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(3))
        );
        // The implicit set {a, b} comes after the explicit set {c}.
        assert_eq!(
            f.handler
                .fill_input_set(Timestamp::Value(3), &mut inputs)
                .unwrap(),
            1
        );

        let mut inputs = InputSet::new(3);
        f.handler.node_readiness().unwrap();
        assert_eq!(
            f.handler
                .fill_input_set(Timestamp::Value(5), &mut inputs)
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_not_ready_before_data() {
        let f = fixture(&["A:a", "B:b"], &[]);
        assert_eq!(f.handler.node_readiness().unwrap(), NodeReadiness::NotReady);
    }

    #[test]
    fn test_pure_bound_minimum_is_not_ready() {
        let f = fixture(&["A:a", "B:b"], &[]);
        f.push("a", 5);
        f.bound("b", 3);
        assert_eq!(f.handler.node_readiness().unwrap(), NodeReadiness::NotReady);

        // Bound equal to the queued minimum: b may still deliver at 5.
        f.bound("b", 5);
        assert_eq!(f.handler.node_readiness().unwrap(), NodeReadiness::NotReady);

        f.bound("b", 6);
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(5))
        );
    }

    #[test]
    fn test_readiness_is_stable_until_filled() {
        let f = fixture(&["A:a", "B:b"], &[&["A"]]);
        f.push("a", 4);
        let first = f.handler.node_readiness().unwrap();
        // Earlier data on another set must not displace the memoized set.
        f.push("b", 1);
        let second = f.handler.node_readiness().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, NodeReadiness::ReadyForProcess(Timestamp::Value(4)));
    }

    #[test]
    fn test_earliest_set_wins() {
        let f = fixture(&["A:a", "B:b"], &[&["A"], &["B"]]);
        f.push("a", 9);
        f.push("b", 2);
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(2))
        );

        let mut inputs = InputSet::new(2);
        f.handler
            .fill_input_set(Timestamp::Value(2), &mut inputs)
            .unwrap();
        assert!(inputs.get(f.id("b")).unwrap().packet.is_some());
        assert!(!inputs.get(f.id("a")).unwrap().filled);
    }

    #[test]
    fn test_tie_goes_to_lower_set() {
        let f = fixture(&["A:a", "B:b"], &[&["A"], &["B"]]);
        f.push("a", 3);
        f.push("b", 3);
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(3))
        );
        let mut inputs = InputSet::new(2);
        f.handler
            .fill_input_set(Timestamp::Value(3), &mut inputs)
            .unwrap();
        let filled: Vec<_> = inputs.filled_ids().collect();
        assert_eq!(filled, vec![f.id("a")]);

        // The other set is still ready at the same timestamp.
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(3))
        );
    }

    #[test]
    fn test_not_ready_set_does_not_hide_ready_set() {
        let f = fixture(&["A:a", "B:b", "C:c"], &[&["A", "B"], &["C"]]);
        // Set 0: a has 1 queued, b lags behind.
        f.push("a", 1);
        // Set 1: ready at 7.
        f.push("c", 7);
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(7))
        );
    }

    #[test]
    fn test_fill_marks_missing_packets() {
        let f = fixture(&["A:a", "B:b"], &[]);
        f.push("a", 2);
        f.bound("b", 10);
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(2))
        );

        let mut inputs = InputSet::new(2);
        f.handler
            .fill_input_set(Timestamp::Value(2), &mut inputs)
            .unwrap();
        let a = inputs.get(f.id("a")).unwrap();
        let b = inputs.get(f.id("b")).unwrap();
        assert_eq!(a.packet, Some(Packet::empty(Timestamp::Value(2))));
        assert!(a.filled && b.filled);
        assert!(b.packet.is_none());
        assert!(!b.done);
    }

    #[test]
    fn test_all_finished_is_ready_for_close() {
        let f = fixture(&["A:a", "B:b"], &[]);
        f.queue("a").close();
        f.queue("b").close();
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForClose
        );
        assert_eq!(f.handler.live_sync_sets().unwrap(), 0);
        // Terminal and repeatable.
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForClose
        );
    }

    #[test]
    fn test_exhausted_set_removed_without_skipping_next() {
        let f = fixture(&["A:a", "B:b", "C:c"], &[&["A"], &["B"], &["C"]]);
        f.queue("a").close();
        f.push("b", 4);
        f.push("c", 8);
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(4))
        );
        assert_eq!(f.handler.live_sync_sets().unwrap(), 2);

        let mut inputs = InputSet::new(3);
        f.handler
            .fill_input_set(Timestamp::Value(4), &mut inputs)
            .unwrap();
        assert_eq!(inputs.filled_ids().collect::<Vec<_>>(), vec![f.id("b")]);
    }

    #[test]
    fn test_last_packet_reports_done() {
        let f = fixture(&["A:a"], &[]);
        f.push("a", 1);
        f.queue("a").close();

        let mut inputs = InputSet::new(1);
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(1))
        );
        f.handler
            .fill_input_set(Timestamp::Value(1), &mut inputs)
            .unwrap();
        assert!(inputs.get(f.id("a")).unwrap().done);
        assert_eq!(
            f.handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForClose
        );
    }

    #[test]
    fn test_fill_with_wrong_timestamp_is_fault() {
        let f = fixture(&["A:a"], &[]);
        f.push("a", 5);
        f.handler.node_readiness().unwrap();

        let mut inputs = InputSet::new(1);
        let err = f
            .handler
            .fill_input_set(Timestamp::Value(6), &mut inputs)
            .unwrap_err();
        assert!(err.is_consistency());
        assert!(err.to_string().contains("does not match"), "got: {err}");
    }

    #[test]
    fn test_fill_with_done_is_fault() {
        let f = fixture(&["A:a"], &[]);
        f.push("a", 5);
        f.handler.node_readiness().unwrap();
        let mut inputs = InputSet::new(1);
        assert!(f
            .handler
            .fill_input_set(Timestamp::Done, &mut inputs)
            .unwrap_err()
            .is_consistency());
    }

    /// Channel whose pops always report a discarded packet.
    struct LossyChannel;

    impl InputChannel for LossyChannel {
        fn name(&self) -> &str {
            "lossy"
        }

        fn min_timestamp_or_bound(&self) -> contracts::TimestampOrBound {
            contracts::TimestampOrBound::queued(Timestamp::Value(1))
        }

        fn pop_packet_at(&self, _timestamp: Timestamp) -> contracts::PoppedPacket {
            contracts::PoppedPacket {
                packet: None,
                num_dropped: 1,
                stream_done: false,
            }
        }
    }

    #[test]
    fn test_dropped_packet_is_fault() {
        let tag_map = TagMap::from_streams(&["lossy"]).unwrap();
        let channels: Vec<Arc<dyn InputChannel>> = vec![Arc::new(LossyChannel)];
        let core = HandlerCore::new("lossy_node", tag_map, channels).unwrap();
        let handler = SyncSetInputStreamHandler::new(core, SyncSetHandlerOptions::default());
        handler.prepare_for_run(RunCallbacks::noop()).unwrap();

        assert_eq!(
            handler.node_readiness().unwrap(),
            NodeReadiness::ReadyForProcess(Timestamp::Value(1))
        );
        let mut inputs = InputSet::new(1);
        let err = handler
            .fill_input_set(Timestamp::Value(1), &mut inputs)
            .unwrap_err();
        assert!(err.is_consistency());
        assert!(err.to_string().contains("lossy"), "got: {err}");
    }
}
