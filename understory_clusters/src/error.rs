// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use understory_cell_tree::CellId;

/// Errors reported by [`HierClusters::build`](crate::HierClusters::build).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    /// The requested top cell does not exist in the layout.
    #[error("unknown top cell {0}")]
    UnknownCell(CellId),
}

/// Result alias for cluster builds.
pub type Result<T> = core::result::Result<T, ClusterError>;
