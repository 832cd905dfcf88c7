// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cluster identifiers and cross-level connection keys.

use core::fmt;
use core::num::NonZeroU32;

use understory_cell_tree::{ArrayIndex, CellId, InstanceId};

/// Identifier of a cluster inside one cell.
///
/// Real clusters are numbered from `1` in creation order and are never
/// renumbered, even after they have been merged into another cluster.
/// Connector clusters share this id space but are allocated downward from
/// `u32::MAX`; see [`ConnectedClusters::insert_dummy`](crate::ConnectedClusters::insert_dummy).
///
/// There is no "nil" id: lookups that may find nothing return `Option<ClusterId>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(NonZeroU32);

impl ClusterId {
    /// Wrap a raw id; `None` for zero.
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// The raw id.
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Arena slot of this id (may be beyond the arena).
    pub(crate) const fn slot(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// Id of the arena slot `slot`.
    pub(crate) fn from_slot(slot: usize) -> Self {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ClusterId uses 32-bit indices by design."
        )]
        Self(NonZeroU32::MIN.saturating_add(slot as u32))
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One specific placement of one specific child instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstElement {
    /// The instance inside the parent cell.
    pub inst: InstanceId,
    /// The placed cell.
    pub cell: CellId,
    /// The array element of the instance; `(0, 0)` for a single placement.
    pub index: ArrayIndex,
}

impl InstElement {
    /// Create a placement key.
    pub const fn new(inst: InstanceId, cell: CellId, index: ArrayIndex) -> Self {
        Self { inst, cell, index }
    }
}

/// A child cell's cluster seen through exactly one placement.
///
/// Connections spanning several levels are chains of these keys, one per level.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterInstance {
    /// Cluster id inside the placed cell.
    pub id: ClusterId,
    /// The placement.
    pub inst: InstElement,
}

impl ClusterInstance {
    /// Create a key.
    pub const fn new(id: ClusterId, inst: InstElement) -> Self {
        Self { id, inst }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_id() {
        assert!(ClusterId::new(0).is_none());
        assert_eq!(ClusterId::new(7).map(ClusterId::get), Some(7));
    }

    #[test]
    fn slots_are_one_based() {
        let id = ClusterId::from_slot(0);
        assert_eq!(id.get(), 1);
        assert_eq!(id.slot(), 0);
        assert_eq!(ClusterId::from_slot(41).get(), 42);
        assert_eq!(format!("{}", ClusterId::from_slot(2)), "#3");
    }
}
