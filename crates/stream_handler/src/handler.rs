//! Base scheduling contract shared by every input stream handler.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use contracts::{ChannelId, InputChannel, InputSet, NodeReadiness, TagMap, Timestamp};
use tracing::instrument;

use crate::error::{HandlerError, Result};

/// Data-ready notification
pub type NotificationCallback = Arc<dyn Fn() + Send + Sync>;

/// Receives every scheduled invocation
pub type ScheduleCallback = Arc<dyn Fn(Invocation) + Send + Sync>;

/// Receives run-level errors
pub type ErrorCallback = Arc<dyn Fn(&HandlerError) + Send + Sync>;

/// Work handed to the executor by [`InputStreamHandler::schedule_invocations`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Run node logic on the filled inputs
    Process {
        timestamp: Timestamp,
        /// Config index of the sync set that was filled
        sync_set: usize,
        inputs: InputSet,
    },
    /// Every input is finished; close the node
    Close,
}

/// Run-lifecycle callbacks passed to `prepare_for_run`
#[derive(Clone)]
pub struct RunCallbacks {
    pub notification: NotificationCallback,
    pub schedule: ScheduleCallback,
    pub error: ErrorCallback,
}

impl RunCallbacks {
    /// Callbacks that do nothing
    pub fn noop() -> Self {
        Self {
            notification: Arc::new(|| {}),
            schedule: Arc::new(|_: Invocation| {}),
            error: Arc::new(|_: &HandlerError| {}),
        }
    }
}

impl Default for RunCallbacks {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for RunCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunCallbacks").finish_non_exhaustive()
    }
}

/// State every handler shares: the node's channels and the run callbacks.
pub struct HandlerCore {
    node: String,
    tag_map: TagMap,
    channels: Vec<Arc<dyn InputChannel>>,
    callbacks: RwLock<Option<RunCallbacks>>,
    close_scheduled: AtomicBool,
    scheduling: Mutex<()>,
}

impl fmt::Debug for HandlerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCore")
            .field("node", &self.node)
            .field("channels", &self.channels.len())
            .finish()
    }
}

impl HandlerCore {
    /// Create the core. `channels[i]` must be the channel of `ChannelId(i)`.
    ///
    /// # Errors
    /// Channel count differs from the tag map.
    pub fn new(
        node: impl Into<String>,
        tag_map: TagMap,
        channels: Vec<Arc<dyn InputChannel>>,
    ) -> Result<Self> {
        let node = node.into();
        if channels.len() != tag_map.len() {
            return Err(HandlerError::ChannelCountMismatch {
                node,
                expected: tag_map.len(),
                actual: channels.len(),
            });
        }
        Ok(Self {
            node,
            tag_map,
            channels,
            callbacks: RwLock::new(None),
            close_scheduled: AtomicBool::new(false),
            scheduling: Mutex::new(()),
        })
    }

    /// Node name
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Channel registry
    pub fn tag_map(&self) -> &TagMap {
        &self.tag_map
    }

    /// Number of input channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Channel accessor of `id`
    ///
    /// # Errors
    /// Unknown id; ids come from the tag map so this is a consistency fault.
    pub fn channel(&self, id: ChannelId) -> Result<&dyn InputChannel> {
        self.channels
            .get(id.index())
            .map(|c| c.as_ref())
            .ok_or_else(|| HandlerError::consistency(format!("no channel with id {id}")))
    }

    /// Store the callbacks of a new run.
    pub fn prepare_for_run(&self, callbacks: RunCallbacks) -> Result<()> {
        let mut slot = self
            .callbacks
            .write()
            .map_err(|_| HandlerError::LockPoisoned)?;
        *slot = Some(callbacks);
        self.close_scheduled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn callbacks(&self) -> Option<RunCallbacks> {
        self.callbacks.read().ok().and_then(|slot| slot.clone())
    }

    /// Signal that new data or a new bound arrived on some channel.
    pub fn notify(&self) {
        if let Some(callbacks) = self.callbacks() {
            (callbacks.notification)();
        }
    }

    /// Forward an invocation to the executor.
    pub fn schedule(&self, invocation: Invocation) {
        if let Some(callbacks) = self.callbacks() {
            (callbacks.schedule)(invocation);
        }
    }

    /// Report a run-level error.
    pub fn report_error(&self, error: &HandlerError) {
        tracing::error!(node = %self.node, error = %error, "input stream handler error");
        if error.is_consistency() {
            observability::record_consistency_fault(&self.node);
        }
        if let Some(callbacks) = self.callbacks() {
            (callbacks.error)(error);
        }
    }

    /// Exclusive right to run the readiness/fill loop of this node.
    ///
    /// # Errors
    /// A previous scheduler panicked while holding it.
    pub fn scheduling_guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.scheduling.lock().map_err(|_| HandlerError::LockPoisoned)
    }

    /// Mark close as scheduled; returns `false` if it already was this run.
    fn take_close(&self) -> bool {
        !self.close_scheduled.swap(true, Ordering::SeqCst)
    }
}

/// Readiness strategy of a node.
///
/// Each call takes the handler's state lock, so `node_readiness` and
/// `fill_input_set` are safe to call from several threads. A fill only
/// matches the readiness reported just before it, so callers running both
/// must hold [`HandlerCore::scheduling_guard`] across the pair, as
/// `schedule_invocations` does.
pub trait InputStreamHandler: Send + Sync {
    /// Registered handler name
    fn handler_name(&self) -> &'static str;

    /// Shared handler state
    fn core(&self) -> &HandlerCore;

    /// Reset per-run state and store the run callbacks.
    ///
    /// # Errors
    /// Configuration faults; the run must not start.
    fn prepare_for_run(&self, callbacks: RunCallbacks) -> Result<()>;

    /// Whether the node can run, and at which timestamp.
    ///
    /// # Errors
    /// Consistency faults.
    fn node_readiness(&self) -> Result<NodeReadiness>;

    /// Number of sync sets not yet exhausted in this run.
    ///
    /// # Errors
    /// Poisoned state lock.
    fn live_sync_sets(&self) -> Result<usize>;

    /// Move the packets at `timestamp` into `input_set` and return the config
    /// index of the sync set that was filled.
    ///
    /// Only valid right after `node_readiness` returned
    /// `ReadyForProcess(timestamp)`.
    ///
    /// # Errors
    /// Consistency faults.
    fn fill_input_set(&self, timestamp: Timestamp, input_set: &mut InputSet) -> Result<usize>;

    /// Fill and schedule invocations until the node is no longer ready or
    /// `max_allowance` invocations were scheduled. Returns the number
    /// scheduled.
    ///
    /// Concurrent callers are serialized on the node's scheduling guard.
    /// Errors are passed to the run's error callback before being returned.
    #[instrument(
        level = "debug",
        name = "schedule_invocations",
        skip(self),
        fields(node = %self.core().node())
    )]
    fn schedule_invocations(&self, max_allowance: usize) -> Result<usize> {
        let core = self.core();
        let _scheduling = core.scheduling_guard().inspect_err(|e| core.report_error(e))?;
        let mut scheduled = 0;

        while scheduled < max_allowance {
            let readiness = self.node_readiness().inspect_err(|e| core.report_error(e))?;
            match readiness {
                NodeReadiness::NotReady => break,
                NodeReadiness::ReadyForClose => {
                    if core.take_close() {
                        core.schedule(Invocation::Close);
                        scheduled += 1;
                    }
                    break;
                }
                NodeReadiness::ReadyForProcess(timestamp) => {
                    let mut inputs = InputSet::new(core.channel_count());
                    let sync_set = self
                        .fill_input_set(timestamp, &mut inputs)
                        .inspect_err(|e| core.report_error(e))?;
                    core.schedule(Invocation::Process {
                        timestamp,
                        sync_set,
                        inputs,
                    });
                    scheduled += 1;
                }
            }
        }

        Ok(scheduled)
    }
}
