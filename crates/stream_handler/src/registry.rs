//! Handler registry - name to factory lookup
//!
//! Nodes pick their input stream handler by name in the node config. The
//! registry is an explicit value; there is no process-wide registration.

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{
    InputChannel, InputSet, NodeConfig, NodeReadiness, SyncSetHandlerOptions, TagMap, Timestamp,
};

use crate::error::{HandlerError, Result};
use crate::handler::{HandlerCore, InputStreamHandler, RunCallbacks};
use crate::sync_set::SyncSetInputStreamHandler;

/// Builds a handler from its shared core and options
pub type HandlerFactory = fn(HandlerCore, &SyncSetHandlerOptions) -> Box<dyn InputStreamHandler>;

/// Name of the handler that treats all inputs as one sync set
pub const DEFAULT_INPUT_STREAM_HANDLER: &str = "DefaultInputStreamHandler";

fn sync_set_factory(
    core: HandlerCore,
    options: &SyncSetHandlerOptions,
) -> Box<dyn InputStreamHandler> {
    Box::new(SyncSetInputStreamHandler::new(core, options.clone()))
}

fn default_factory(
    core: HandlerCore,
    _options: &SyncSetHandlerOptions,
) -> Box<dyn InputStreamHandler> {
    Box::new(DefaultInputStreamHandler::new(core))
}

/// Name to factory table
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    factories: BTreeMap<String, HandlerFactory>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl HandlerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in handlers
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SyncSetInputStreamHandler::NAME, sync_set_factory);
        registry.register(DEFAULT_INPUT_STREAM_HANDLER, default_factory);
        registry
    }

    /// Register a factory, replacing any previous one under `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: HandlerFactory) {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            tracing::warn!(handler = %name, "replacing registered input stream handler");
        }
    }

    /// Whether a factory is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build the handler registered under `name`.
    ///
    /// # Errors
    /// Unknown name.
    pub fn create(
        &self,
        name: &str,
        core: HandlerCore,
        options: &SyncSetHandlerOptions,
    ) -> Result<Box<dyn InputStreamHandler>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HandlerError::UnknownHandler {
                name: name.to_string(),
            })?;
        Ok(factory(core, options))
    }

    /// Build the handler of a node from its config and channels.
    ///
    /// `channels[i]` must belong to the i-th channel of the node's tag map.
    pub fn build(
        &self,
        config: &NodeConfig,
        channels: Vec<Arc<dyn InputChannel>>,
    ) -> Result<Box<dyn InputStreamHandler>> {
        let tag_map = TagMap::from_streams(&config.input_streams)?;
        let core = HandlerCore::new(&config.name, tag_map, channels)?;
        tracing::debug!(
            node = %config.name,
            handler = %config.handler,
            "building input stream handler"
        );
        self.create(&config.handler, core, &config.options)
    }
}

/// Handler that synchronizes every input together.
///
/// Behaves as a sync-set handler whose inputs all fall in the implicit set.
#[derive(Debug)]
pub struct DefaultInputStreamHandler {
    inner: SyncSetInputStreamHandler,
}

impl DefaultInputStreamHandler {
    pub fn new(core: HandlerCore) -> Self {
        Self {
            inner: SyncSetInputStreamHandler::new(core, SyncSetHandlerOptions::default()),
        }
    }
}

impl InputStreamHandler for DefaultInputStreamHandler {
    fn handler_name(&self) -> &'static str {
        DEFAULT_INPUT_STREAM_HANDLER
    }

    fn core(&self) -> &HandlerCore {
        self.inner.core()
    }

    fn prepare_for_run(&self, callbacks: RunCallbacks) -> Result<()> {
        self.inner.prepare_for_run(callbacks)
    }

    fn node_readiness(&self) -> Result<NodeReadiness> {
        self.inner.node_readiness()
    }

    fn live_sync_sets(&self) -> Result<usize> {
        self.inner.live_sync_sets()
    }

    fn fill_input_set(&self, timestamp: Timestamp, input_set: &mut InputSet) -> Result<usize> {
        self.inner.fill_input_set(timestamp, input_set)
    }
}
