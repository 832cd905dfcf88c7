// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The clusters of one cell, built from the cell's own shapes.

use std::cell::OnceCell;
use std::mem;
use std::ops::ControlFlow;

use kurbo::{Affine, Rect};
use understory_cell_tree::{Cell, INTERACTION_TOLERANCE, LayerId, Shape, ShapeKinds, rect_to_aabb};
use understory_scan::{BoxScanner, TouchTree};

use crate::connectivity::Connectivity;
use crate::local_cluster::LocalCluster;
use crate::types::ClusterId;

/// An id-stable arena of [`LocalCluster`]s.
///
/// Ids are `1..=len()`. Removing or merging a cluster only empties its slot,
/// so ids held elsewhere never dangle. Ids beyond the arena resolve to a
/// shared empty cluster.
#[derive(Clone, Debug)]
pub struct LocalClusters {
    clusters: Vec<LocalCluster>,
    empty: LocalCluster,
    index: OnceCell<TouchTree<f64, ClusterId>>,
}

impl Default for LocalClusters {
    fn default() -> Self {
        Self {
            clusters: Vec::new(),
            empty: LocalCluster::new(ClusterId::from_slot(u32::MAX as usize - 1)),
            index: OnceCell::new(),
        }
    }
}

impl LocalClusters {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fresh empty cluster and return its id.
    pub fn insert(&mut self) -> ClusterId {
        let id = ClusterId::from_slot(self.clusters.len());
        self.clusters.push(LocalCluster::new(id));
        self.index = OnceCell::new();
        id
    }

    /// The cluster with `id`; the shared empty cluster for ids beyond the arena.
    ///
    /// The shared empty cluster reports `u32::MAX` as its [`id`](LocalCluster::id),
    /// which is also the first connector id. Callers that need ids must take
    /// them from [`iter`](Self::iter) or from the id they looked up.
    pub fn cluster_by_id(&self, id: ClusterId) -> &LocalCluster {
        self.clusters.get(id.slot()).unwrap_or(&self.empty)
    }

    /// Mutable access to a real cluster.
    ///
    /// # Panics
    ///
    /// Panics if `id` is beyond the arena.
    pub fn cluster_mut(&mut self, id: ClusterId) -> &mut LocalCluster {
        let len = self.clusters.len();
        assert!(id.slot() < len, "cluster {id} is not in an arena of {len}");
        self.index = OnceCell::new();
        &mut self.clusters[id.slot()]
    }

    /// Empty the cluster `id`. Its slot and id stay reserved.
    pub fn remove_cluster(&mut self, id: ClusterId) {
        if let Some(c) = self.clusters.get_mut(id.slot()) {
            c.clear();
            self.index = OnceCell::new();
        }
    }

    /// Move the shapes of `with_id` into `id` and empty `with_id`.
    ///
    /// No-op if the ids are equal or either one is beyond the arena.
    pub fn join_cluster_with(&mut self, id: ClusterId, with_id: ClusterId) {
        let len = self.clusters.len();
        if id == with_id || id.slot() >= len || with_id.slot() >= len {
            return;
        }
        let other = mem::replace(&mut self.clusters[with_id.slot()], LocalCluster::new(with_id));
        self.clusters[id.slot()].join_with(other);
        self.index = OnceCell::new();
    }

    /// Non-empty clusters in id order. Never yields the shared empty cluster.
    pub fn iter(&self) -> impl Iterator<Item = &LocalCluster> + '_ {
        self.clusters.iter().filter(|c| !c.is_empty())
    }

    /// Arena size, including emptied slots.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// True if no cluster was ever inserted.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Union of all cluster boxes.
    pub fn bbox(&self) -> Option<Rect> {
        self.index().bounds().map(|b| Rect::new(b.min_x, b.min_y, b.max_x, b.max_y))
    }

    /// Ids of the clusters whose boxes touch `region`.
    pub fn touching(&self, region: Rect) -> impl Iterator<Item = ClusterId> + '_ {
        self.index().touching(rect_to_aabb(region))
    }

    fn index(&self) -> &TouchTree<f64, ClusterId> {
        self.index.get_or_init(|| {
            TouchTree::build(
                self.clusters
                    .iter()
                    .filter_map(|c| c.bbox().map(|b| (rect_to_aabb(b), c.id()))),
            )
        })
    }

    /// Cluster the cell's own shapes on all layers of `conn`.
    ///
    /// Two shapes end up in one cluster if a chain of pairwise connecting
    /// shapes links them. Shapes without any partner become singleton
    /// clusters. The partition does not depend on the order of the shapes.
    pub fn build_clusters(&mut self, cell: &Cell, kinds: ShapeKinds, conn: &Connectivity) {
        let shapes: Vec<(LayerId, &Shape)> = conn
            .layers()
            .flat_map(|l| cell.shapes(l).iter().map(move |s| (l, s)))
            .filter(|(_, s)| selected(s, kinds))
            .collect();

        let mut scanner = BoxScanner::with_capacity(shapes.len());
        for (i, (_, s)) in shapes.iter().enumerate() {
            let b = s.bbox().inflate(INTERACTION_TOLERANCE, INTERACTION_TOLERANCE);
            scanner.insert(rect_to_aabb(b), i);
        }

        // Provisional clusters form a union-find; the smaller id is always the root.
        let mut assigned: Vec<Option<usize>> = vec![None; shapes.len()];
        let mut parent: Vec<usize> = Vec::new();
        let _ = scanner.process(|&i, &j| {
            let ((li, si), (lj, sj)) = (shapes[i], shapes[j]);
            if !conn.interacts(si, li, sj, lj, Affine::IDENTITY) {
                return ControlFlow::Continue(());
            }
            match (assigned[i], assigned[j]) {
                (None, None) => {
                    parent.push(parent.len());
                    assigned[i] = Some(parent.len() - 1);
                    assigned[j] = assigned[i];
                }
                (Some(c), None) => assigned[j] = Some(c),
                (None, Some(c)) => assigned[i] = Some(c),
                (Some(a), Some(b)) => {
                    let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
                    if ra != rb {
                        let (lo, hi) = (ra.min(rb), ra.max(rb));
                        parent[hi] = lo;
                    }
                }
            }
            ControlFlow::Continue(())
        });

        // Merged provisional clusters keep their (now empty) slot.
        let base = self.clusters.len();
        for _ in 0..parent.len() {
            self.insert();
        }
        for (i, (layer, shape)) in shapes.iter().enumerate() {
            let slot = match assigned[i] {
                Some(p) => base + find(&mut parent, p),
                None => {
                    self.insert();
                    self.clusters.len() - 1
                }
            };
            self.clusters[slot].add((*shape).clone(), *layer);
        }
        self.index = OnceCell::new();
    }
}

fn selected(shape: &Shape, kinds: ShapeKinds) -> bool {
    match shape {
        Shape::Box(_) => kinds.contains(ShapeKinds::BOXES),
        Shape::Polygon(_) => kinds.contains(ShapeKinds::POLYGONS),
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}
