// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Clusters: hierarchical connectivity clustering without flattening.
//!
//! Given a [`Layout`](understory_cell_tree::Layout) and a [`Connectivity`]
//! relation over layers, this crate groups touching shapes into clusters and
//! links them across the cell hierarchy. Each cell definition is processed
//! exactly once, however often it is placed, so a cell placed a million
//! times in an array costs no more than a cell placed once.
//!
//! ## Model
//!
//! - [`LocalCluster`]: shapes of one cell forming one equivalence class.
//! - [`LocalClusters`]: an id-stable arena of local clusters; merged or removed
//!   clusters leave an empty slot behind and ids never change.
//! - [`ConnectedClusters`]: the local clusters of a cell plus single-hop links
//!   to child clusters, keyed by [`ClusterInstance`] (a child cluster seen
//!   through exactly one placement). Connector clusters carry links but no
//!   shapes; they exist where two child clusters connect without any local
//!   shape in between.
//! - [`HierClusters`]: the finished [`ConnectedClusters`] of every cell below
//!   a top cell.
//!
//! A net spanning several levels is a chain of these single-hop links.
//! Following it from the top cell down means looking up each key's cluster in
//! the placed cell's own graph.
//!
//! ## Logging
//!
//! [`HierClusters::build`] runs inside a `hier_clusters_build` debug span and
//! emits one debug event per finished cell. Connector allocation and deferred
//! joins are reported at trace level. Install any `tracing` subscriber to see
//! them; the crate never installs one itself.
//!
//! ## Example
//!
//! ```
//! use kurbo::Rect;
//! use understory_cell_tree::{LayerId, Layout, ShapeKinds};
//! use understory_clusters::{Connectivity, HierClusters};
//!
//! let (metal, via) = (LayerId(1), LayerId(2));
//! let mut conn = Connectivity::new();
//! conn.connect_self(metal).connect(metal, via);
//!
//! let mut layout = Layout::new();
//! let top = layout.add_cell("TOP");
//! layout.insert_shape(top, metal, Rect::new(0.0, 0.0, 10.0, 1.0)).unwrap();
//! layout.insert_shape(top, via, Rect::new(9.0, 0.0, 10.0, 1.0)).unwrap();
//! layout.insert_shape(top, metal, Rect::new(20.0, 0.0, 30.0, 1.0)).unwrap();
//!
//! let mut hc = HierClusters::new();
//! hc.build(&layout, top, ShapeKinds::default(), &conn).unwrap();
//! let sizes: Vec<_> = hc
//!     .clusters_per_cell(top)
//!     .unwrap()
//!     .iter()
//!     .map(|c| c.shape_count())
//!     .collect();
//! assert_eq!(sizes, [2, 1]);
//! ```

mod boxes;
mod connected;
mod connectivity;
mod error;
mod hier;
mod join;
mod local_cluster;
mod local_clusters;
mod types;

pub use connected::ConnectedClusters;
pub use connectivity::Connectivity;
pub use error::{ClusterError, Result};
pub use hier::HierClusters;
pub use local_cluster::LocalCluster;
pub use local_clusters::LocalClusters;
pub use types::{ClusterId, ClusterInstance, InstElement};
