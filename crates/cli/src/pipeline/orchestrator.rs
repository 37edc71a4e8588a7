//! Replay orchestrator - feeds scenario events to a node's input queues and
//! drives its input stream handler.
//!
//! ```text
//! producer task ──mpsc──► scheduler loop ──► PacketQueue(s)
//!                                │
//!                                └─► schedule_invocations ──► invocation log
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{ChannelId, InputChannel, NodeConfig, TagMap};
use serde::Serialize;
use stream_handler::{
    HandlerError, HandlerRegistry, InputStreamHandler, Invocation, PacketQueue, RunCallbacks,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ReplayStats;
use crate::scenario::{Scenario, ScenarioEvent};

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Node under test
    pub node: NodeConfig,

    /// Events to feed
    pub scenario: Scenario,

    /// Invocations scheduled per event (None = unlimited)
    pub max_allowance: Option<usize>,

    /// Channel buffer size between producer and scheduler
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One filled slot of a process invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotRecord {
    pub stream: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    pub done: bool,
}

/// One scheduled invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvocationRecord {
    Process {
        seq: usize,
        /// Event after which the invocation was scheduled
        after_event: usize,
        timestamp: String,
        sync_set: usize,
        slots: Vec<SlotRecord>,
    },
    Close {
        seq: usize,
        after_event: usize,
    },
}

impl std::fmt::Display for InvocationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Process {
                seq,
                timestamp,
                sync_set,
                slots,
                ..
            } => {
                write!(f, "#{seq:<4} t={timestamp:<8} set={sync_set}")?;
                for slot in slots {
                    match &slot.payload {
                        Some(payload) => write!(f, "  {}={:?}", slot.stream, payload)?,
                        None => write!(f, "  {}=-", slot.stream)?,
                    }
                    if slot.done {
                        write!(f, "(done)")?;
                    }
                }
                Ok(())
            }
            Self::Close { seq, .. } => write!(f, "#{seq:<4} close"),
        }
    }
}

/// Result of a replay
#[derive(Debug)]
pub struct ReplayOutcome {
    pub invocations: Vec<InvocationRecord>,
    pub stats: ReplayStats,
}

/// Main replay orchestrator
pub struct Replay {
    config: ReplayConfig,
}

impl Replay {
    /// Create a new replay with the given configuration
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    /// Run the replay to completion
    pub async fn run(self) -> Result<ReplayOutcome> {
        let start_time = Instant::now();
        let ReplayConfig {
            node,
            scenario,
            max_allowance,
            buffer_size,
            metrics_port,
        } = self.config;

        // Initialize Metrics (optional)
        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Build node inputs
        let tag_map = TagMap::from_streams(&node.input_streams)
            .context("Failed to build tag map from input streams")?;
        scenario.check_streams(&tag_map)?;

        let queues = PacketQueue::for_tag_map(&tag_map, node.queue_capacity);
        let channels: Vec<Arc<dyn InputChannel>> = queues
            .iter()
            .map(|q| q.clone() as Arc<dyn InputChannel>)
            .collect();

        let handler = HandlerRegistry::with_builtin()
            .build(&node, channels)
            .with_context(|| format!("Failed to build handler '{}'", node.handler))?;

        // Run callbacks
        let (invocation_tx, mut invocation_rx) = mpsc::unbounded_channel();
        let notifications = Arc::new(AtomicU64::new(0));
        let errors_reported = Arc::new(AtomicU64::new(0));
        let callbacks = {
            let notifications = notifications.clone();
            let errors_reported = errors_reported.clone();
            RunCallbacks {
                notification: Arc::new(move || {
                    notifications.fetch_add(1, Ordering::Relaxed);
                }),
                schedule: Arc::new(move |invocation: Invocation| {
                    // Receiver lives until the loop below finishes.
                    let _ = invocation_tx.send(invocation);
                }),
                error: Arc::new(move |_: &HandlerError| {
                    errors_reported.fetch_add(1, Ordering::Relaxed);
                }),
            }
        };
        handler
            .prepare_for_run(callbacks)
            .context("Failed to prepare input stream handler")?;
        let sync_set_count = handler
            .live_sync_sets()
            .context("Failed to read sync sets")?;

        info!(
            node = %node.name,
            handler = handler.handler_name(),
            inputs = tag_map.len(),
            sync_sets = sync_set_count,
            events = scenario.events.len(),
            "Replay starting"
        );

        // Producer task
        let (event_tx, mut event_rx) =
            mpsc::channel::<(usize, ScenarioEvent)>(buffer_size.max(1));
        let events = scenario.events;
        let producer = tokio::spawn(async move {
            for (index, event) in events.into_iter().enumerate() {
                if event_tx.send((index, event)).await.is_err() {
                    debug!("Scheduler stopped, producer exiting");
                    break;
                }
            }
        });

        // Scheduler loop
        let allowance = max_allowance.unwrap_or(usize::MAX);
        let mut stats = ReplayStats {
            input_streams: tag_map.len(),
            sync_sets: sync_set_count,
            ..Default::default()
        };
        let mut records = Vec::new();
        let mut last_event = 0;

        while let Some((index, event)) = event_rx.recv().await {
            event.apply(index, &tag_map, &queues)?;
            stats.events_applied += 1;
            last_event = index;
            handler.core().notify();

            let scheduled = handler
                .schedule_invocations(allowance)
                .with_context(|| format!("Scheduling failed after event {index}"))?;
            debug!(event = index, scheduled, "Event applied");

            drain(&mut invocation_rx, index, &tag_map, &mut records, &mut stats);
            if stats.sync_metrics.closed {
                break;
            }
        }
        drop(event_rx);
        producer.await.context("Producer task panicked")?;

        // Scenario exhausted; flush anything still ready.
        if !stats.sync_metrics.closed {
            handler
                .schedule_invocations(allowance)
                .context("Final scheduling failed")?;
            drain(&mut invocation_rx, last_event, &tag_map, &mut records, &mut stats);
        }
        if !stats.sync_metrics.closed {
            warn!("Scenario ended before every input stream was closed");
        }

        stats.notifications = notifications.load(Ordering::Relaxed);
        stats.errors_reported = errors_reported.load(Ordering::Relaxed);
        stats.duration = start_time.elapsed();

        info!(
            invocations = stats.sync_metrics.total_invocations,
            closed = stats.sync_metrics.closed,
            duration_ms = stats.duration.as_millis() as u64,
            "Replay finished"
        );

        Ok(ReplayOutcome {
            invocations: records,
            stats,
        })
    }
}

/// Move scheduled invocations into the log.
fn drain(
    invocation_rx: &mut mpsc::UnboundedReceiver<Invocation>,
    after_event: usize,
    tag_map: &TagMap,
    records: &mut Vec<InvocationRecord>,
    stats: &mut ReplayStats,
) {
    while let Ok(invocation) = invocation_rx.try_recv() {
        let seq = records.len();
        let record = match invocation {
            Invocation::Process {
                timestamp,
                sync_set,
                inputs,
            } => {
                // Every channel of the filled set gets a slot.
                let filled: Vec<ChannelId> = inputs.filled_ids().collect();
                stats.sync_metrics.record_invocation(
                    sync_set,
                    timestamp,
                    inputs.packet_count(),
                    filled.len(),
                );

                let slots = filled
                    .iter()
                    .filter_map(|id| {
                        let shard = inputs.get(*id)?;
                        Some(SlotRecord {
                            stream: tag_map.name(*id).unwrap_or_default().to_string(),
                            payload: shard
                                .packet
                                .as_ref()
                                .map(|p| String::from_utf8_lossy(&p.payload).into_owned()),
                            done: shard.done,
                        })
                    })
                    .collect();

                InvocationRecord::Process {
                    seq,
                    after_event,
                    timestamp: timestamp.to_string(),
                    sync_set,
                    slots,
                }
            }
            Invocation::Close => {
                stats.sync_metrics.record_close();
                InvocationRecord::Close { seq, after_event }
            }
        };
        records.push(record);
    }
}
