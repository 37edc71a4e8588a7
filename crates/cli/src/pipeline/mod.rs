//! Replay orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{InvocationRecord, Replay, ReplayConfig};
pub use stats::{ReplayStats, StatsReport};
