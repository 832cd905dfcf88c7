// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Memoized cell boxes and per-cell instance lookup.

use std::collections::BTreeMap;

use kurbo::Rect;
use understory_cell_tree::{CellId, InstanceId, Layout, rect_to_aabb, union_bbox};
use understory_scan::TouchTree;

use crate::connected::ConnectedClusters;

/// Box oracle for the cells of one build.
///
/// A cell's box covers its own clusters and every placement of its children,
/// so an empty cell (no clusters anywhere below it) has no box. Boxes are
/// queried only for cells whose graphs are finished.
#[derive(Debug, Default)]
pub(crate) struct CellBoxes {
    boxes: BTreeMap<CellId, Option<Rect>>,
    instances: BTreeMap<CellId, TouchTree<f64, InstanceId>>,
}

impl CellBoxes {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cell_box(
        &mut self,
        layout: &Layout,
        per_cell: &BTreeMap<CellId, ConnectedClusters>,
        cell: CellId,
    ) -> Option<Rect> {
        if let Some(b) = self.boxes.get(&cell) {
            return *b;
        }
        let mut bbox = per_cell.get(&cell).and_then(ConnectedClusters::bbox);
        if let Some(c) = layout.cell(cell) {
            for (_, array) in c.instances() {
                if let Some(cb) = self.cell_box(layout, per_cell, array.cell) {
                    bbox = union_bbox(bbox, array.bbox(cb));
                }
            }
        }
        self.boxes.insert(cell, bbox);
        bbox
    }

    /// Instances of `cell` whose array boxes touch `region` (in `cell`'s frame).
    pub(crate) fn instances_touching(
        &mut self,
        layout: &Layout,
        per_cell: &BTreeMap<CellId, ConnectedClusters>,
        cell: CellId,
        region: Rect,
    ) -> Vec<InstanceId> {
        if !self.instances.contains_key(&cell) {
            let mut entries = Vec::new();
            if let Some(c) = layout.cell(cell) {
                for (id, array) in c.instances() {
                    if let Some(cb) = self.cell_box(layout, per_cell, array.cell) {
                        entries.push((rect_to_aabb(array.bbox(cb)), id));
                    }
                }
            }
            self.instances.insert(cell, TouchTree::build(entries));
        }
        self.instances
            .get(&cell)
            .map(|t| t.touching(rect_to_aabb(region)).collect())
            .unwrap_or_default()
    }
}
