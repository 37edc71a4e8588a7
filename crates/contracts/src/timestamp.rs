//! Timestamp - Stream time domain
//!
//! Totally ordered instants with explicit special values instead of numeric sentinels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stream timestamp.
///
/// Variant order defines the total order:
/// `PreStream < Value(i64::MIN) < .. < Value(i64::MAX) < PostStream < Done`.
///
/// `Done` never carries data. It is reported by a channel that will produce no
/// further packets and by handlers whose inputs are all finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timestamp {
    /// Single packet allowed before any ranged value (e.g. headers, side data)
    PreStream,
    /// Ordinary instant
    Value(i64),
    /// Single packet allowed after every ranged value
    PostStream,
    /// Terminal sentinel: the stream is finished
    Done,
}

impl Timestamp {
    /// Smallest ranged value
    pub const MIN: Timestamp = Timestamp::Value(i64::MIN);
    /// Largest ranged value
    pub const MAX: Timestamp = Timestamp::Value(i64::MAX);

    /// Whether a packet may carry this timestamp.
    #[inline]
    pub fn is_allowed_in_stream(self) -> bool {
        !matches!(self, Timestamp::Done)
    }

    /// Whether this is an ordinary ranged instant.
    #[inline]
    pub fn is_range_value(self) -> bool {
        matches!(self, Timestamp::Value(_))
    }

    /// Smallest timestamp a subsequent packet may carry after a packet at `self`.
    ///
    /// `PreStream` and `PostStream` admit a single packet, so anything after them
    /// (and after `Value(i64::MAX)`) is `Done`.
    #[inline]
    pub fn next_allowed_in_stream(self) -> Timestamp {
        match self {
            Timestamp::Value(v) if v < i64::MAX => Timestamp::Value(v + 1),
            _ => Timestamp::Done,
        }
    }

    /// Raw value for ranged instants.
    #[inline]
    pub fn value(self) -> Option<i64> {
        match self {
            Timestamp::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for Timestamp {
    #[inline]
    fn from(v: i64) -> Self {
        Timestamp::Value(v)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::PreStream => write!(f, "PreStream"),
            Timestamp::Value(v) => write!(f, "{v}"),
            Timestamp::PostStream => write!(f, "PostStream"),
            Timestamp::Done => write!(f, "Done"),
        }
    }
}
