// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Local clusters plus single-hop links into child cells.

use std::collections::{BTreeMap, BTreeSet};

use kurbo::Rect;
use tracing::trace;
use understory_cell_tree::{Cell, ShapeKinds};

use crate::connectivity::Connectivity;
use crate::local_cluster::LocalCluster;
use crate::local_clusters::LocalClusters;
use crate::types::{ClusterId, ClusterInstance};

/// The cluster graph of one cell.
///
/// Each cluster id (real or connector) owns a list of [`ClusterInstance`]s:
/// clusters of child cells, seen through one placement, that belong to it.
/// The reverse map answers which id already owns a given key; it is always
/// the exact transpose of the forward lists.
///
/// Connector ("dummy") clusters have no shapes. They are allocated downward
/// from `u32::MAX`, so they can never collide with the arena's real ids and
/// [`cluster_by_id`](Self::cluster_by_id) resolves them to the empty cluster.
#[derive(Clone, Debug)]
pub struct ConnectedClusters {
    clusters: LocalClusters,
    connections: BTreeMap<ClusterId, Vec<ClusterInstance>>,
    owners: BTreeMap<ClusterInstance, ClusterId>,
    next_connector: u32,
}

impl Default for ConnectedClusters {
    fn default() -> Self {
        Self {
            clusters: LocalClusters::new(),
            connections: BTreeMap::new(),
            owners: BTreeMap::new(),
            next_connector: u32::MAX,
        }
    }
}

impl ConnectedClusters {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying local clusters.
    pub fn local(&self) -> &LocalClusters {
        &self.clusters
    }

    /// Mutable access to the underlying local clusters.
    pub fn local_mut(&mut self) -> &mut LocalClusters {
        &mut self.clusters
    }

    /// Build the local clusters from `cell`'s own shapes.
    pub fn build_clusters(&mut self, cell: &Cell, kinds: ShapeKinds, conn: &Connectivity) {
        self.clusters.build_clusters(cell, kinds, conn);
    }

    /// Record that `key` belongs to `id`.
    pub fn add_connection(&mut self, id: ClusterId, key: ClusterInstance) {
        self.connections.entry(id).or_default().push(key);
        self.owners.insert(key, id);
    }

    /// The id owning `key`, if any.
    pub fn find_cluster_with_connection(&self, key: &ClusterInstance) -> Option<ClusterId> {
        self.owners.get(key).copied()
    }

    /// Keys owned by `id`, in insertion order.
    pub fn connections_for_cluster(&self, id: ClusterId) -> &[ClusterInstance] {
        self.connections.get(&id).map_or(&[], Vec::as_slice)
    }

    /// All ids owning keys, ascending, with their keys.
    pub fn connections(&self) -> impl Iterator<Item = (ClusterId, &[ClusterInstance])> + '_ {
        self.connections.iter().map(|(id, keys)| (*id, keys.as_slice()))
    }

    /// Merge `with_id` into `id`: shapes (for real clusters) and keys.
    ///
    /// No-op if the ids are equal.
    pub fn join_cluster_with(&mut self, id: ClusterId, with_id: ClusterId) {
        if id == with_id {
            return;
        }
        self.clusters.join_cluster_with(id, with_id);
        if let Some(keys) = self.connections.remove(&with_id) {
            for key in &keys {
                self.owners.insert(*key, id);
            }
            self.connections.entry(id).or_default().extend(keys);
        }
    }

    /// Empty the real cluster `id`; no-op for connectors.
    pub fn remove_cluster(&mut self, id: ClusterId) {
        self.clusters.remove_cluster(id);
    }

    /// Allocate a new connector id.
    ///
    /// # Panics
    ///
    /// Panics if the connector range runs into the real ids.
    pub fn insert_dummy(&mut self) -> ClusterId {
        let raw = self.next_connector;
        let id = ClusterId::new(raw)
            .filter(|id| id.slot() >= self.clusters.len())
            .unwrap_or_else(|| panic!("connector id {raw} collides with the cluster arena"));
        self.next_connector -= 1;
        trace!(connector = id.get(), "connector allocated");
        id
    }

    /// Whether `id` was allocated by [`insert_dummy`](Self::insert_dummy).
    pub fn is_connector(&self, id: ClusterId) -> bool {
        id.get() > self.next_connector
    }

    /// Number of connectors allocated so far.
    pub fn connector_count(&self) -> u32 {
        u32::MAX - self.next_connector
    }

    /// Live ids: non-empty real clusters and ids owning keys, ascending.
    ///
    /// Connectors come last since they are numbered from the top of the range.
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.clusters
            .iter()
            .map(LocalCluster::id)
            .chain(self.connections.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// See [`LocalClusters::cluster_by_id`]. Connector ids resolve to the
    /// shared empty cluster, whose own id is a placeholder.
    pub fn cluster_by_id(&self, id: ClusterId) -> &LocalCluster {
        self.clusters.cluster_by_id(id)
    }

    /// See [`LocalClusters::iter`].
    pub fn iter(&self) -> impl Iterator<Item = &LocalCluster> + '_ {
        self.clusters.iter()
    }

    /// See [`LocalClusters::bbox`].
    pub fn bbox(&self) -> Option<Rect> {
        self.clusters.bbox()
    }

    /// See [`LocalClusters::touching`].
    pub fn touching(&self, region: Rect) -> impl Iterator<Item = ClusterId> + '_ {
        self.clusters.touching(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Affine;
    use understory_cell_tree::{ArrayIndex, CellInstArray, LayerId, Layout, Shape};

    use crate::types::InstElement;

    fn key(id: u32, inst: u32) -> ClusterInstance {
        let mut layout = Layout::new();
        let parent = layout.add_cell("P");
        let child = layout.add_cell("C");
        let mut last = None;
        for _ in 0..=inst {
            last = Some(
                layout
                    .insert_instance(parent, CellInstArray::single(child, Affine::IDENTITY))
                    .unwrap(),
            );
        }
        ClusterInstance::new(
            ClusterId::new(id).unwrap(),
            InstElement::new(last.unwrap(), child, ArrayIndex::ORIGIN),
        )
    }

    #[test]
    fn connectors_count_down_from_the_top() {
        let mut cc = ConnectedClusters::new();
        let real = cc.local_mut().insert();
        let d1 = cc.insert_dummy();
        let d2 = cc.insert_dummy();
        assert_eq!(d1.get(), u32::MAX);
        assert_eq!(d2.get(), u32::MAX - 1);
        assert!(cc.is_connector(d1) && cc.is_connector(d2));
        assert!(!cc.is_connector(real));
        assert!(cc.cluster_by_id(d1).is_empty());
        assert_eq!(cc.connector_count(), 2);
    }

    #[test]
    fn connector_lookups_never_leak_the_placeholder_id() {
        let mut cc = ConnectedClusters::new();
        let real = cc.local_mut().insert();
        cc.local_mut()
            .cluster_mut(real)
            .add(Shape::Box(kurbo::Rect::new(0.0, 0.0, 1.0, 1.0)), LayerId(1));
        let conn = cc.insert_dummy();
        cc.add_connection(conn, key(1, 0));

        assert!(cc.cluster_by_id(conn).is_empty());
        assert_eq!(cc.cluster_by_id(conn).shape_count(), 0);
        let ids: Vec<_> = cc.iter().map(LocalCluster::id).collect();
        assert_eq!(ids, [real]);
        assert!(!ids.contains(&conn));
        assert_eq!(cc.cluster_ids(), [real, conn]);
    }

    #[test]
    fn reverse_map_follows_joins() {
        let mut cc = ConnectedClusters::new();
        let (k1, k2, k3) = (key(1, 0), key(1, 1), key(2, 0));
        let a = cc.insert_dummy();
        let b = cc.insert_dummy();
        cc.add_connection(a, k1);
        cc.add_connection(b, k2);
        cc.add_connection(b, k3);
        assert_eq!(cc.find_cluster_with_connection(&k2), Some(b));

        cc.join_cluster_with(a, b);
        assert_eq!(cc.connections_for_cluster(a), [k1, k2, k3]);
        assert!(cc.connections_for_cluster(b).is_empty());
        for k in [k1, k2, k3] {
            assert_eq!(cc.find_cluster_with_connection(&k), Some(a));
        }
        assert_eq!(cc.cluster_ids(), [a]);

        cc.join_cluster_with(a, a);
        assert_eq!(cc.connections_for_cluster(a).len(), 3);
    }

    #[test]
    fn cluster_ids_list_real_clusters_first() {
        let mut cc = ConnectedClusters::new();
        let real = cc.local_mut().insert();
        cc.local_mut()
            .cluster_mut(real)
            .add(Shape::Box(Rect::new(0.0, 0.0, 1.0, 1.0)), LayerId(0));
        let _empty = cc.local_mut().insert();
        let d = cc.insert_dummy();
        cc.add_connection(d, key(1, 0));
        // Unconnected connectors and emptied slots are not live.
        let _unused = cc.insert_dummy();
        assert_eq!(cc.cluster_ids(), [real, d]);
    }
}
