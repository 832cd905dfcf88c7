// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A single cluster of connected shapes inside one cell.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::ops::ControlFlow;

use kurbo::{Affine, Rect};
use understory_cell_tree::{
    INTERACTION_TOLERANCE, LayerId, Shape, rect_overlap, rect_to_aabb, transform_rect_bbox,
    union_bbox,
};
use understory_scan::{BoxScanner2, TouchTree};

use crate::connectivity::Connectivity;
use crate::types::ClusterId;

/// Lazily derived data; dropped on every mutation.
#[derive(Clone, Debug)]
struct Cache {
    bbox: Option<Rect>,
    trees: BTreeMap<LayerId, TouchTree<f64, usize>>,
}

/// Shapes of one cell forming one equivalence class, partitioned by layer.
#[derive(Clone, Debug)]
pub struct LocalCluster {
    id: ClusterId,
    shapes: BTreeMap<LayerId, Vec<Shape>>,
    cache: OnceCell<Cache>,
}

impl LocalCluster {
    pub(crate) fn new(id: ClusterId) -> Self {
        Self {
            id,
            shapes: BTreeMap::new(),
            cache: OnceCell::new(),
        }
    }

    /// The cluster's id.
    ///
    /// Meaningless on the shared empty cluster returned for ids beyond an
    /// arena; see [`LocalClusters::cluster_by_id`](crate::LocalClusters::cluster_by_id).
    pub fn id(&self) -> ClusterId {
        self.id
    }

    /// Add a shape on `layer`.
    pub fn add(&mut self, shape: Shape, layer: LayerId) {
        self.shapes.entry(layer).or_default().push(shape);
        self.cache = OnceCell::new();
    }

    /// Move all shapes of `other` into this cluster.
    ///
    /// Duplicates are kept. Callers own the tombstoning of `other`'s slot.
    pub fn join_with(&mut self, other: Self) {
        for (layer, shapes) in other.shapes {
            self.shapes.entry(layer).or_default().extend(shapes);
        }
        self.cache = OnceCell::new();
    }

    /// Drop all shapes; the id stays.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.cache = OnceCell::new();
    }

    /// True if the cluster holds no shapes.
    pub fn is_empty(&self) -> bool {
        self.shapes.values().all(Vec::is_empty)
    }

    /// Total number of shapes on all layers.
    pub fn shape_count(&self) -> usize {
        self.shapes.values().map(Vec::len).sum()
    }

    /// Layers holding shapes of this cluster, ascending.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.shapes
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(l, _)| *l)
    }

    /// Shapes on `layer`.
    pub fn shapes(&self, layer: LayerId) -> &[Shape] {
        self.shapes.get(&layer).map_or(&[], Vec::as_slice)
    }

    /// Bounding box of all shapes; `None` for an empty cluster.
    pub fn bbox(&self) -> Option<Rect> {
        self.cache().bbox
    }

    fn cache(&self) -> &Cache {
        self.cache.get_or_init(|| {
            let mut bbox = None;
            let mut trees = BTreeMap::new();
            for (layer, shapes) in &self.shapes {
                if shapes.is_empty() {
                    continue;
                }
                let entries: Vec<_> = shapes
                    .iter()
                    .enumerate()
                    .map(|(i, s)| {
                        let b = s.bbox();
                        bbox = union_bbox(bbox, b);
                        (rect_to_aabb(b), i)
                    })
                    .collect();
                trees.insert(*layer, TouchTree::build(entries));
            }
            Cache { bbox, trees }
        })
    }

    fn touching(&self, layer: LayerId, region: Rect) -> impl Iterator<Item = usize> + '_ {
        self.cache()
            .trees
            .get(&layer)
            .into_iter()
            .flat_map(move |t| t.touching(rect_to_aabb(region)))
    }

    /// Whether any shape of this cluster connects to a shape of `other`,
    /// where `other` is mapped into this cluster's frame by `trans`.
    ///
    /// Stops at the first connecting pair.
    pub fn interacts(&self, other: &Self, trans: Affine, conn: &Connectivity) -> bool {
        let (Some(b1), Some(b2)) = (self.bbox(), other.bbox()) else {
            return false;
        };
        let b1 = b1.inflate(INTERACTION_TOLERANCE, INTERACTION_TOLERANCE);
        let Some(common) = rect_overlap(b1, transform_rect_bbox(trans, b2)) else {
            return false;
        };
        let common = common.inflate(INTERACTION_TOLERANCE, INTERACTION_TOLERANCE);
        let common_other = transform_rect_bbox(trans.inverse(), common);

        let mut scanner = BoxScanner2::new();
        for layer in self.layers() {
            if conn.connected(layer).next().is_none() {
                continue;
            }
            for i in self.touching(layer, common) {
                let b = self.shapes[&layer][i].bbox();
                let b = b.inflate(INTERACTION_TOLERANCE, INTERACTION_TOLERANCE);
                scanner.insert1(rect_to_aabb(b), (layer, i));
            }
        }
        for layer in other.layers() {
            if conn.connected(layer).next().is_none() {
                continue;
            }
            for j in other.touching(layer, common_other) {
                let b = transform_rect_bbox(trans, other.shapes[&layer][j].bbox());
                scanner.insert2(rect_to_aabb(b), (layer, j));
            }
        }

        scanner
            .process(|&(la, i), &(lb, j)| {
                if conn.interacts(&self.shapes[&la][i], la, &other.shapes[&lb][j], lb, trans) {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .is_break()
    }
}
