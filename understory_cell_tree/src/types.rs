// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public identifier types and shape selection flags.

use core::fmt;

/// Identifier of a cell definition inside a [`Layout`](crate::Layout).
///
/// Cell ids are dense indices assigned by [`Layout::add_cell`](crate::Layout::add_cell)
/// in creation order. Cells are never removed, so an id stays valid for the
/// lifetime of its layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(pub(crate) u32);

impl CellId {
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// The raw index of this cell.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Opaque layer key partitioning a cell's shapes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u32);

/// Index of an instance (a possibly repeated placement) in its parent cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub(crate) u32);

impl InstanceId {
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// The raw index of this instance inside its parent cell.
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Position of one element in a regular array.
///
/// Element `(a, b)` is displaced by `a * step_a + b * step_b`. A single
/// placement only has the element `(0, 0)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayIndex {
    /// Index along the first lattice vector.
    pub a: u32,
    /// Index along the second lattice vector.
    pub b: u32,
}

impl ArrayIndex {
    /// The only element of a single placement.
    pub const ORIGIN: Self = Self { a: 0, b: 0 };

    /// Create an array index.
    pub const fn new(a: u32, b: u32) -> Self {
        Self { a, b }
    }
}

bitflags::bitflags! {
    /// Shape kinds taking part in clustering.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ShapeKinds: u8 {
        /// Axis-aligned boxes.
        const BOXES    = 0b0000_0001;
        /// Polygons.
        const POLYGONS = 0b0000_0010;
    }
}

impl Default for ShapeKinds {
    fn default() -> Self {
        Self::all()
    }
}
