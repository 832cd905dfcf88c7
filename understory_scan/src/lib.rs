// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Scan: touching queries over axis-aligned boxes.
//!
//! This crate holds the geometry-free building blocks the clustering engine
//! uses to find candidate pairs:
//!
//! - [`Aabb2D`]: a closed box; boxes that share only an edge or a corner touch.
//! - [`TouchTree`]: an immutable packed tree answering "which entries touch this region".
//! - [`BoxScanner`] and [`BoxScanner2`]: sort-and-sweep scanners reporting every
//!   touching pair within one set, or between two sets.
//!
//! Scanner callbacks return [`ControlFlow`](core::ops::ControlFlow), so a scan
//! can stop at the first hit.
//!
//! It is generic over the scalar type `T` and does not depend on any geometry crate.
//!
//! # Example
//!
//! ```rust
//! use core::ops::ControlFlow;
//! use understory_scan::{Aabb2D, BoxScanner, TouchTree};
//!
//! let mut scanner = BoxScanner::new();
//! scanner.insert(Aabb2D::new(0, 0, 1, 1), "a");
//! scanner.insert(Aabb2D::new(1, 0, 2, 1), "b");
//! scanner.insert(Aabb2D::new(5, 5, 6, 6), "c");
//!
//! let mut pairs = Vec::new();
//! let _ = scanner.process(|a, b| {
//!     pairs.push((*a, *b));
//!     ControlFlow::Continue(())
//! });
//! assert_eq!(pairs.len(), 1);
//!
//! let tree = TouchTree::build([(Aabb2D::new(0.0, 0.0, 10.0, 10.0), 7_u32)]);
//! let hits: Vec<_> = tree.touching(Aabb2D::new(10.0, 10.0, 20.0, 20.0)).collect();
//! assert_eq!(hits, [7]);
//! ```
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates.

#![no_std]

extern crate alloc;

pub mod scanner;
pub mod tree;
pub mod types;

pub use scanner::{BoxScanner, BoxScanner2};
pub use tree::{TouchTree, Touching};
pub use types::{Aabb2D, Scalar};
