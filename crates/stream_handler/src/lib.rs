//! # Stream Handler
//!
//! Input stream handlers decide when a node can run and which packets it
//! receives.
//!
//! ## Architecture
//!
//! ```text
//! PacketQueue (per input) ──► InputStreamHandler ──► Invocation ──► executor
//!                               │
//!                               ├─ node_readiness()
//!                               └─ fill_input_set()
//! ```
//!
//! ## Core Features
//! - **Sync sets**: inputs split into groups synchronized independently
//! - **Readiness**: earliest ready group wins, ties go to the lower group
//! - **Exhaustion**: finished groups are dropped; close once all are gone
//! - **Thread-safe**: evaluation and fill serialize on one mutex

pub mod error;
pub mod handler;
pub mod queue;
pub mod registry;
pub mod sync_set;

pub use error::{HandlerError, Result};
pub use handler::{
    ErrorCallback, HandlerCore, InputStreamHandler, Invocation, NotificationCallback,
    RunCallbacks, ScheduleCallback,
};
pub use queue::PacketQueue;
pub use registry::{
    DefaultInputStreamHandler, HandlerFactory, HandlerRegistry, DEFAULT_INPUT_STREAM_HANDLER,
};
pub use sync_set::{partition_sync_sets, SyncSet, SyncSetInputStreamHandler};
