//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - [`Timestamp`] is a sum type: `PreStream`, ranged `Value(i64)`, `PostStream`, `Done`
//! - `Done` orders after every other value and marks a finished channel

mod channel;
mod channel_id;
mod error;
mod input_set;
mod node_config;
mod packet;
mod tag_map;
mod timestamp;

pub use channel::{InputChannel, PoppedPacket, TimestampOrBound};
pub use channel_id::ChannelId;
pub use error::*;
pub use input_set::*;
pub use node_config::*;
pub use packet::Packet;
pub use tag_map::{TagIndex, TagMap};
pub use timestamp::Timestamp;
