// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-cell cluster graphs for a whole hierarchy.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;

use kurbo::{Affine, Rect};
use tracing::{debug, debug_span, trace};
use understory_cell_tree::{
    ArrayIndex, CellId, CellInstArray, INTERACTION_TOLERANCE, InstanceId, Layout, ShapeKinds,
    rect_overlap, rect_to_aabb, transform_rect_bbox,
};
use understory_scan::{BoxScanner, BoxScanner2};

use crate::boxes::CellBoxes;
use crate::connected::ConnectedClusters;
use crate::connectivity::Connectivity;
use crate::error::{ClusterError, Result};
use crate::join::JoinSets;
use crate::types::{ClusterId, ClusterInstance, InstElement};

/// Connected cluster graphs of every cell below a top cell.
///
/// Each cell is processed once no matter how often it is placed. A cluster
/// of a cell is connected to clusters of its children only through
/// single-hop [`ClusterInstance`] keys; connections spanning several levels
/// are chains of connector clusters, one per intermediate cell.
///
/// ```
/// use kurbo::{Affine, Rect, Vec2};
/// use understory_cell_tree::{CellInstArray, LayerId, Layout, ShapeKinds};
/// use understory_clusters::{Connectivity, HierClusters};
///
/// let metal = LayerId(1);
/// let mut conn = Connectivity::new();
/// conn.connect_self(metal);
///
/// let mut layout = Layout::new();
/// let top = layout.add_cell("TOP");
/// let pad = layout.add_cell("PAD");
/// layout.insert_shape(pad, metal, Rect::new(0.0, 0.0, 1.0, 1.0)).unwrap();
/// for x in [0.0, 1.0] {
///     let placed = CellInstArray::single(pad, Affine::translate(Vec2::new(x, 0.0)));
///     layout.insert_instance(top, placed).unwrap();
/// }
///
/// let mut hc = HierClusters::new();
/// hc.build(&layout, top, ShapeKinds::default(), &conn).unwrap();
///
/// // The two pads touch, so TOP gets one connector holding both placements.
/// let graph = hc.clusters_per_cell(top).unwrap();
/// let ids = graph.cluster_ids();
/// assert_eq!(ids.len(), 1);
/// assert!(graph.is_connector(ids[0]));
/// assert_eq!(graph.connections_for_cluster(ids[0]).len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct HierClusters {
    per_cell: BTreeMap<CellId, ConnectedClusters>,
}

impl HierClusters {
    /// Create an empty set of graphs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graphs of `top` and every cell below it.
    ///
    /// Previously built graphs are discarded first, so building twice gives
    /// the same result.
    pub fn build(
        &mut self,
        layout: &Layout,
        top: CellId,
        kinds: ShapeKinds,
        conn: &Connectivity,
    ) -> Result<()> {
        if !layout.contains(top) {
            return Err(ClusterError::UnknownCell(top));
        }
        let _span = debug_span!("hier_clusters_build", %top).entered();
        self.per_cell.clear();
        let mut builder = Builder {
            layout,
            conn,
            kinds,
            per_cell: &mut self.per_cell,
            boxes: CellBoxes::new(),
            building: BTreeSet::new(),
        };
        builder.build_cell(top);
        Ok(())
    }

    /// The graph of `cell`, or `None` if it was not part of the last build.
    pub fn clusters_per_cell(&self, cell: CellId) -> Option<&ConnectedClusters> {
        self.per_cell.get(&cell)
    }

    /// Whether `cell` has a finished graph.
    pub fn is_built(&self, cell: CellId) -> bool {
        self.per_cell.contains_key(&cell)
    }

    /// Cells with finished graphs, ascending.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.per_cell.keys().copied()
    }

    /// Drop all graphs.
    pub fn clear(&mut self) {
        self.per_cell.clear();
    }
}

/// `r` grown by [`INTERACTION_TOLERANCE`] on every side.
///
/// Every pruning box goes through this, so placements that touch only up to
/// transform rounding still reach the exact shape test.
fn widen(r: Rect) -> Rect {
    r.inflate(INTERACTION_TOLERANCE, INTERACTION_TOLERANCE)
}

/// Placements of one instance array, seen from the cell being built.
#[derive(Clone, Debug)]
struct Side<'a> {
    inst: InstanceId,
    array: &'a CellInstArray,
    /// Placements leading from the cell being built to the array's parent.
    path: Vec<InstElement>,
    /// From the array's parent frame into the frame of the cell being built.
    trans: Affine,
    /// Restricts the side to a single element.
    only: Option<ArrayIndex>,
}

impl<'a> Side<'a> {
    fn top(inst: InstanceId, array: &'a CellInstArray) -> Self {
        Self {
            inst,
            array,
            path: Vec::new(),
            trans: Affine::IDENTITY,
            only: None,
        }
    }

    fn element(&self, index: ArrayIndex) -> InstElement {
        InstElement::new(self.inst, self.array.cell, index)
    }

    fn element_trans(&self, index: ArrayIndex) -> Affine {
        self.trans * self.array.element_trans(index)
    }

    fn element_path(&self, index: ArrayIndex) -> Vec<InstElement> {
        let mut path = self.path.clone();
        path.push(self.element(index));
        path
    }

    fn restricted(&self, index: ArrayIndex) -> Self {
        Self {
            only: Some(index),
            ..self.clone()
        }
    }

    /// Elements whose boxes may touch `region`.
    fn elements_touching(&self, region: Rect, cell_box: Rect) -> Vec<ArrayIndex> {
        let local = transform_rect_bbox(self.trans.inverse(), region);
        match self.only {
            Some(index) => {
                let hit = rect_overlap(local, self.array.element_bbox(index, cell_box)).is_some();
                if hit { vec![index] } else { Vec::new() }
            }
            None => self.array.touching(local, Some(cell_box)).collect(),
        }
    }
}

/// One placement as seen from the cell being built.
#[derive(Clone, Debug)]
struct Placed {
    cell: CellId,
    path: Vec<InstElement>,
    trans: Affine,
}

/// The graph under construction plus its deferred merges.
#[derive(Debug, Default)]
struct CellState {
    graph: ConnectedClusters,
    joins: JoinSets,
}

struct Builder<'a> {
    layout: &'a Layout,
    conn: &'a Connectivity,
    kinds: ShapeKinds,
    per_cell: &'a mut BTreeMap<CellId, ConnectedClusters>,
    boxes: CellBoxes,
    building: BTreeSet<CellId>,
}

impl<'a> Builder<'a> {
    fn build_cell(&mut self, cell_id: CellId) {
        if self.per_cell.contains_key(&cell_id) {
            return;
        }
        assert!(
            self.building.insert(cell_id),
            "cell {cell_id} entered twice while building"
        );
        let layout = self.layout;
        let Some(cell) = layout.cell(cell_id) else {
            self.building.remove(&cell_id);
            return;
        };

        let mut state = CellState::default();
        state.graph.build_clusters(cell, self.kinds, self.conn);

        for child in layout.child_cells(cell_id) {
            self.build_cell(child);
        }

        let instances: Vec<(InstanceId, &'a CellInstArray, Rect)> = cell
            .instances()
            .filter_map(|(id, array)| {
                let cb = self.boxes.cell_box(layout, self.per_cell, array.cell)?;
                Some((id, array, cb))
            })
            .collect();

        self.instance_pairs(&mut state, &instances);
        self.array_self_pairs(&mut state, &instances);
        self.local_instance_pairs(&mut state, &instances);

        let sets = std::mem::take(&mut state.joins).into_sets();
        let join_count = sets.iter().map(|s| s.len() - 1).sum::<usize>();
        for set in sets {
            let (target, rest) = (set[0], &set[1..]);
            for &other in rest {
                trace!(%target, %other, "joining clusters");
                state.graph.join_cluster_with(target, other);
            }
        }

        debug!(
            cell = %cell_id,
            clusters = state.graph.local().iter().count(),
            connectors = state.graph.connector_count(),
            joins = join_count,
            "cell clusters built"
        );
        self.per_cell.insert(cell_id, state.graph);
        self.building.remove(&cell_id);
    }

    /// Pairs of distinct instance arrays with touching boxes.
    fn instance_pairs(
        &mut self,
        state: &mut CellState,
        instances: &[(InstanceId, &'a CellInstArray, Rect)],
    ) {
        let mut scanner = BoxScanner::with_capacity(instances.len());
        for (i, (_, array, cb)) in instances.iter().enumerate() {
            scanner.insert(rect_to_aabb(widen(array.bbox(*cb))), i);
        }
        let mut pairs = Vec::new();
        let _ = scanner.process(|&i, &j| {
            pairs.push((i, j));
            ControlFlow::Continue(())
        });
        for (i, j) in pairs {
            let (id1, a1, cb1) = instances[i];
            let (id2, a2, cb2) = instances[j];
            if let Some(common) = rect_overlap(widen(a1.bbox(cb1)), widen(a2.bbox(cb2))) {
                self.add_pair(state, common, &Side::top(id1, a1), &Side::top(id2, a2));
            }
        }
    }

    /// Touching neighbours inside one array.
    fn array_self_pairs(
        &mut self,
        state: &mut CellState,
        instances: &[(InstanceId, &'a CellInstArray, Rect)],
    ) {
        for &(id, array, cb) in instances {
            let side = Side::top(id, array);
            for offset in array.self_touching_offsets(cb) {
                for (e, f) in array.element_pairs(offset) {
                    let region = rect_overlap(
                        widen(array.element_bbox(e, cb)),
                        widen(array.element_bbox(f, cb)),
                    );
                    if let Some(common) = region {
                        self.add_pair(state, common, &side.restricted(e), &side.restricted(f));
                    }
                }
            }
        }
    }

    /// Local clusters against instance arrays.
    fn local_instance_pairs(
        &mut self,
        state: &mut CellState,
        instances: &[(InstanceId, &'a CellInstArray, Rect)],
    ) {
        let mut scanner = BoxScanner2::new();
        for c in state.graph.iter() {
            if let Some(b) = c.bbox() {
                scanner.insert1(rect_to_aabb(widen(b)), c.id());
            }
        }
        for (i, (_, array, cb)) in instances.iter().enumerate() {
            scanner.insert2(rect_to_aabb(widen(array.bbox(*cb))), i);
        }
        let mut pairs = Vec::new();
        let _ = scanner.process(|&c, &i| {
            pairs.push((c, i));
            ControlFlow::Continue(())
        });
        for (c, i) in pairs {
            let (id, array, _) = instances[i];
            let Some(region) = state.graph.cluster_by_id(c).bbox() else {
                continue;
            };
            self.add_local_pair(state, c, widen(region), &Side::top(id, array));
        }
    }

    fn child_sides(&mut self, placed: &Placed, region: Rect) -> Vec<Side<'a>> {
        let layout = self.layout;
        let Some(cell) = layout.cell(placed.cell) else {
            return Vec::new();
        };
        let local = transform_rect_bbox(placed.trans.inverse(), region);
        self.boxes
            .instances_touching(layout, self.per_cell, placed.cell, local)
            .into_iter()
            .filter_map(|id| {
                let array = cell.instance(id)?;
                Some(Side {
                    inst: id,
                    array,
                    path: placed.path.clone(),
                    trans: placed.trans,
                    only: None,
                })
            })
            .collect()
    }

    /// Resolve every touching pair of placements of `s1` and `s2` inside `region`.
    fn add_pair(&mut self, state: &mut CellState, region: Rect, s1: &Side<'a>, s2: &Side<'a>) {
        let layout = self.layout;
        let Some(cb1) = self.boxes.cell_box(layout, self.per_cell, s1.array.cell) else {
            return;
        };
        let Some(cb2) = self.boxes.cell_box(layout, self.per_cell, s2.array.cell) else {
            return;
        };

        for e1 in s1.elements_touching(region, cb1) {
            let t1 = s1.element_trans(e1);
            let Some(c1) = rect_overlap(region, widen(transform_rect_bbox(t1, cb1))) else {
                continue;
            };
            let p1 = Placed {
                cell: s1.array.cell,
                path: s1.element_path(e1),
                trans: t1,
            };

            for e2 in s2.elements_touching(c1, cb2) {
                let t2 = s2.element_trans(e2);
                let Some(c12) = rect_overlap(c1, widen(transform_rect_bbox(t2, cb2))) else {
                    continue;
                };
                let p2 = Placed {
                    cell: s2.array.cell,
                    path: s2.element_path(e2),
                    trans: t2,
                };
                self.add_single_pair(state, c12, &p1, &p2);

                let only1 = s1.restricted(e1);
                for child in self.child_sides(&p2, c12) {
                    self.add_pair(state, c12, &only1, &child);
                }
            }

            for child in self.child_sides(&p1, c1) {
                self.add_pair(state, c1, &child, s2);
            }
        }
    }

    /// Connect the clusters of two concrete placements.
    fn add_single_pair(&mut self, state: &mut CellState, region: Rect, p1: &Placed, p2: &Placed) {
        let (g1, g2) = (self.graph(p1.cell), self.graph(p2.cell));
        let r1 = widen(transform_rect_bbox(p1.trans.inverse(), region));
        let r2 = widen(transform_rect_bbox(p2.trans.inverse(), region));
        let t21 = p1.trans.inverse() * p2.trans;

        let mut hits = Vec::new();
        for i in g1.touching(r1) {
            let c1 = g1.cluster_by_id(i);
            for j in g2.touching(r2) {
                if c1.interacts(g2.cluster_by_id(j), t21, self.conn) {
                    hits.push((i, j));
                }
            }
        }

        for (i, j) in hits {
            let k1 = self.make_path(i, &p1.path);
            let k2 = self.make_path(j, &p2.path);
            let graph = &mut state.graph;
            match (
                graph.find_cluster_with_connection(&k1),
                graph.find_cluster_with_connection(&k2),
            ) {
                (None, None) => {
                    let connector = graph.insert_dummy();
                    graph.add_connection(connector, k1);
                    graph.add_connection(connector, k2);
                }
                (Some(x1), None) => graph.add_connection(x1, k2),
                (None, Some(x2)) => graph.add_connection(x2, k1),
                (Some(x1), Some(x2)) if x1 != x2 => {
                    if graph.is_connector(x1) && graph.is_connector(x2) {
                        // Keep the list that is longer; fewer owners to repoint.
                        let (to, from) = if graph.connections_for_cluster(x1).len()
                            < graph.connections_for_cluster(x2).len()
                        {
                            (x2, x1)
                        } else {
                            (x1, x2)
                        };
                        trace!(%to, %from, "joining connectors");
                        graph.join_cluster_with(to, from);
                    } else {
                        state.joins.mark(x1, x2);
                    }
                }
                _ => {}
            }
        }
    }

    /// Connect the local cluster `c1` to every placement of `s2` inside `region`.
    fn add_local_pair(&mut self, state: &mut CellState, c1: ClusterId, region: Rect, s2: &Side<'a>) {
        let layout = self.layout;
        let Some(cb2) = self.boxes.cell_box(layout, self.per_cell, s2.array.cell) else {
            return;
        };
        for e2 in s2.elements_touching(region, cb2) {
            let t2 = s2.element_trans(e2);
            let Some(common) = rect_overlap(region, widen(transform_rect_bbox(t2, cb2))) else {
                continue;
            };
            let p2 = Placed {
                cell: s2.array.cell,
                path: s2.element_path(e2),
                trans: t2,
            };
            self.add_local_single_pair(state, c1, common, &p2);
            for child in self.child_sides(&p2, common) {
                self.add_local_pair(state, c1, common, &child);
            }
        }
    }

    fn add_local_single_pair(
        &mut self,
        state: &mut CellState,
        c1: ClusterId,
        region: Rect,
        p2: &Placed,
    ) {
        let g2 = self.graph(p2.cell);
        let local = state.graph.cluster_by_id(c1);
        let r2 = widen(transform_rect_bbox(p2.trans.inverse(), region));
        let hits: Vec<ClusterId> = g2
            .touching(r2)
            .filter(|&j| local.interacts(g2.cluster_by_id(j), p2.trans, self.conn))
            .collect();

        for j in hits {
            let k2 = self.make_path(j, &p2.path);
            match state.graph.find_cluster_with_connection(&k2) {
                None => state.graph.add_connection(c1, k2),
                Some(other) if other != c1 => state.joins.mark(c1, other),
                Some(_) => {}
            }
        }
    }

    /// The finished graph of a placed cell.
    ///
    /// # Panics
    ///
    /// Panics if `cell` has not been built; children are always built first.
    fn graph(&self, cell: CellId) -> &ConnectedClusters {
        self.per_cell
            .get(&cell)
            .unwrap_or_else(|| panic!("cell {cell} has no cluster graph"))
    }

    /// Fold a cluster seen through a multi-level path into a single-hop key.
    ///
    /// Every intermediate cell gets (or reuses) a cluster owning the key of
    /// the level below, so repeated paths create nothing new.
    fn make_path(&mut self, id: ClusterId, path: &[InstElement]) -> ClusterInstance {
        assert!(!path.is_empty(), "cluster paths need at least one placement");
        let mut id = id;
        for k in (1..path.len()).rev() {
            let key = ClusterInstance::new(id, path[k]);
            let parent = path[k - 1].cell;
            let graph = self
                .per_cell
                .get_mut(&parent)
                .unwrap_or_else(|| panic!("cell {parent} has no cluster graph"));
            id = match graph.find_cluster_with_connection(&key) {
                Some(owner) => owner,
                None => {
                    let connector = graph.insert_dummy();
                    graph.add_connection(connector, key);
                    connector
                }
            };
        }
        ClusterInstance::new(id, path[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;
    use understory_cell_tree::LayerId;

    const M1: LayerId = LayerId(1);

    fn conn() -> Connectivity {
        let mut conn = Connectivity::new();
        conn.connect_self(M1);
        conn
    }

    #[test]
    fn unknown_top_is_an_error() {
        let mut layout = Layout::new();
        let top = layout.add_cell("TOP");
        let mut other = Layout::new();
        other.add_cell("A");
        let missing = other.add_cell("B");
        let mut hc = HierClusters::new();
        assert_eq!(
            hc.build(&layout, missing, ShapeKinds::default(), &conn()),
            Err(ClusterError::UnknownCell(missing))
        );
        assert!(hc.build(&layout, top, ShapeKinds::default(), &conn()).is_ok());
        assert!(hc.is_built(top));
        hc.clear();
        assert_eq!(hc.cells().count(), 0);
    }

    #[test]
    fn make_path_reuses_intermediate_connectors() {
        let mut layout = Layout::new();
        let top = layout.add_cell("TOP");
        let mid = layout.add_cell("MID");
        let leaf = layout.add_cell("LEAF");
        layout.insert_shape(leaf, M1, Rect::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        let mid_inst = layout
            .insert_instance(top, CellInstArray::single(mid, Affine::IDENTITY))
            .unwrap();
        let leaf_inst = layout
            .insert_instance(mid, CellInstArray::single(leaf, Affine::IDENTITY))
            .unwrap();

        let mut hc = HierClusters::new();
        hc.build(&layout, top, ShapeKinds::default(), &conn()).unwrap();
        let before = hc.clusters_per_cell(mid).unwrap().connector_count();

        let conn = conn();
        let mut builder = Builder {
            layout: &layout,
            conn: &conn,
            kinds: ShapeKinds::default(),
            per_cell: &mut hc.per_cell,
            boxes: CellBoxes::new(),
            building: BTreeSet::new(),
        };
        let path = [
            InstElement::new(mid_inst, mid, ArrayIndex::ORIGIN),
            InstElement::new(leaf_inst, leaf, ArrayIndex::ORIGIN),
        ];
        let leaf_cluster = ClusterId::new(1).unwrap();
        let k1 = builder.make_path(leaf_cluster, &path);
        let k2 = builder.make_path(leaf_cluster, &path);
        assert_eq!(k1, k2);
        assert_eq!(k1.inst, path[0]);

        let graph = hc.clusters_per_cell(mid).unwrap();
        assert_eq!(graph.connector_count(), before + 1);
        assert!(graph.is_connector(k1.id));
        assert_eq!(
            graph.connections_for_cluster(k1.id),
            [ClusterInstance::new(leaf_cluster, path[1])]
        );
    }

    fn unbuilt_builder<'a>(
        layout: &'a Layout,
        conn: &'a Connectivity,
        per_cell: &'a mut BTreeMap<CellId, ConnectedClusters>,
    ) -> Builder<'a> {
        Builder {
            layout,
            conn,
            kinds: ShapeKinds::default(),
            per_cell,
            boxes: CellBoxes::new(),
            building: BTreeSet::new(),
        }
    }

    #[test]
    #[should_panic(expected = "has no cluster graph")]
    fn pairing_placements_of_an_unbuilt_cell_panics() {
        let mut layout = Layout::new();
        let leaf = layout.add_cell("LEAF");
        let conn = conn();
        let mut per_cell = BTreeMap::new();
        let mut builder = unbuilt_builder(&layout, &conn, &mut per_cell);
        let placed = Placed {
            cell: leaf,
            path: Vec::new(),
            trans: Affine::IDENTITY,
        };
        let region = Rect::new(0.0, 0.0, 1.0, 1.0);
        builder.add_single_pair(&mut CellState::default(), region, &placed, &placed);
    }

    #[test]
    #[should_panic(expected = "has no cluster graph")]
    fn pairing_a_local_cluster_with_an_unbuilt_cell_panics() {
        let mut layout = Layout::new();
        let leaf = layout.add_cell("LEAF");
        let conn = conn();
        let mut per_cell = BTreeMap::new();
        let mut builder = unbuilt_builder(&layout, &conn, &mut per_cell);
        let placed = Placed {
            cell: leaf,
            path: Vec::new(),
            trans: Affine::IDENTITY,
        };
        let region = Rect::new(0.0, 0.0, 1.0, 1.0);
        let local = ClusterId::new(1).unwrap();
        builder.add_local_single_pair(&mut CellState::default(), local, region, &placed);
    }

    #[test]
    fn rotated_placements_connect() {
        let mut layout = Layout::new();
        let top = layout.add_cell("TOP");
        let bar = layout.add_cell("BAR");
        layout.insert_shape(bar, M1, Rect::new(0.0, 0.0, 4.0, 1.0)).unwrap();
        layout.insert_instance(top, CellInstArray::single(bar, Affine::IDENTITY)).unwrap();
        // A quarter turn around the origin maps the bar onto x in [-1, 0], y in [0, 4].
        let turned = Affine::rotate(core::f64::consts::FRAC_PI_2);
        layout.insert_instance(top, CellInstArray::single(bar, turned)).unwrap();
        // Moved away, the turned bar no longer reaches the first one.
        let away = Affine::translate(Vec2::new(-0.5, 0.0)) * turned;
        let lonely = layout.add_cell("LONELY");
        layout.insert_instance(lonely, CellInstArray::single(bar, Affine::IDENTITY)).unwrap();
        layout.insert_instance(lonely, CellInstArray::single(bar, away)).unwrap();

        let mut hc = HierClusters::new();
        hc.build(&layout, top, ShapeKinds::default(), &conn()).unwrap();
        let graph = hc.clusters_per_cell(top).unwrap();
        assert_eq!(graph.cluster_ids().len(), 1);
        assert_eq!(graph.connections_for_cluster(graph.cluster_ids()[0]).len(), 2);

        hc.build(&layout, lonely, ShapeKinds::default(), &conn()).unwrap();
        assert!(hc.clusters_per_cell(lonely).unwrap().cluster_ids().is_empty());
        assert!(!hc.is_built(top));
    }
}
