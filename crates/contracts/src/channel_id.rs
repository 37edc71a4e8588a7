//! ChannelId - Dense input channel identifier
//!
//! Ids are assigned by [`TagMap`](crate::TagMap) in `0..channel_count` and are
//! only meaningful for the node that owns the tag map.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one input channel of a node.
///
/// Ordered and densely enumerable, so per-channel state can live in a `Vec`
/// indexed by [`ChannelId::index`].
///
/// # Examples
/// ```
/// use contracts::ChannelId;
///
/// let ids: Vec<ChannelId> = ChannelId::range(3).collect();
/// assert_eq!(ids[2].index(), 2);
/// assert!(ids[0] < ids[1]);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(usize);

impl ChannelId {
    /// Create an id from its dense index.
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Dense index of this channel.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Iterate every id of a node with `count` channels, in order.
    pub fn range(count: usize) -> impl DoubleEndedIterator<Item = ChannelId> + ExactSizeIterator {
        (0..count).map(ChannelId)
    }
}

impl From<usize> for ChannelId {
    #[inline]
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}
