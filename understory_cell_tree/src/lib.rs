// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Cell Tree: a Kurbo-native layout hierarchy.
//!
//! A [`Layout`] is a set of cell definitions. Each [`Cell`] holds shapes
//! partitioned by [`LayerId`] and places other cells through
//! [`CellInstArray`]s: a single placement or a regular `na` x `nb` array of
//! placements sharing one base transform.
//!
//! - [`Shape`]: an axis-aligned box or a simple polygon, with a boundary
//!   inclusive interaction test under a relative transform.
//! - [`CellInstArray::touching`]: the elements of an array whose boxes touch a
//!   region, found by lattice arithmetic. Arrays with billions of elements are
//!   fine as long as the query region is small.
//! - [`CellInstArray::self_touching_offsets`]: the lattice displacements at
//!   which elements of one array touch each other.
//!
//! The instance graph is kept acyclic: [`Layout::insert_instance`] rejects
//! placements that would make a cell contain itself.
//!
//! # Example
//!
//! ```
//! use kurbo::{Affine, Rect, Vec2};
//! use understory_cell_tree::{ArrayIndex, CellInstArray, LayerId, Layout};
//!
//! let mut layout = Layout::new();
//! let via = layout.add_cell("VIA");
//! let top = layout.add_cell("TOP");
//! layout.insert_shape(via, LayerId(1), Rect::new(0.0, 0.0, 2.0, 2.0)).unwrap();
//!
//! // A 1000 x 1000 array of vias on a 10 unit pitch.
//! let array = CellInstArray::array(
//!     via,
//!     Affine::IDENTITY,
//!     Vec2::new(10.0, 0.0),
//!     1000,
//!     Vec2::new(0.0, 10.0),
//!     1000,
//! );
//! let hits: Vec<_> = array
//!     .touching(Rect::new(21.0, 31.0, 22.0, 32.0), Some(Rect::new(0.0, 0.0, 2.0, 2.0)))
//!     .collect();
//! assert_eq!(hits, [ArrayIndex::new(2, 3)]);
//!
//! layout.insert_instance(top, array).unwrap();
//! assert_eq!(layout.child_cells(top), [via]);
//! assert_eq!(layout.top_cells(), [top]);
//! ```

pub mod array;
pub mod geom;
pub mod layout;
pub mod shape;
pub mod types;

pub use array::{CellInstArray, Repetition, TouchingElements};
pub use geom::{
    preserves_axes, rect_overlap, rect_to_aabb, rect_touches, transform_rect_bbox, union_bbox,
};
pub use layout::{Cell, Layout, LayoutError};
pub use shape::{INTERACTION_TOLERANCE, Polygon, Shape};
pub use types::{ArrayIndex, CellId, InstanceId, LayerId, ShapeKinds};
