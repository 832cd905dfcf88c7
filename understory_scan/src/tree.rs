// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable packed tree answering "which entries touch this region".
//!
//! The tree is bulk-loaded once with an STR-like pass (sort by centroid x,
//! slice, sort each slice by centroid y, pack) and never updated. Callers that
//! mutate their entries rebuild the tree lazily on the next query.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::ops::Range;

use crate::types::{Aabb2D, Scalar, cmp_t, union_aabb};

/// Maximum number of children per node.
const NODE_CAPACITY: usize = 8;

#[derive(Clone, Debug)]
enum Children {
    /// Contiguous range into the reordered entry list.
    Entries(Range<usize>),
    /// Indices of child nodes.
    Nodes(Vec<usize>),
}

#[derive(Clone, Debug)]
struct Node<T> {
    bbox: Aabb2D<T>,
    children: Children,
}

/// Static touching tree over `(box, payload)` entries.
#[derive(Clone)]
pub struct TouchTree<T: Scalar, P: Copy> {
    entries: Vec<(Aabb2D<T>, P)>,
    nodes: Vec<Node<T>>,
    root: Option<usize>,
}

impl<T: Scalar, P: Copy> Default for TouchTree<T, P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<T: Scalar, P: Copy> Debug for TouchTree<T, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TouchTree")
            .field("entries", &self.entries.len())
            .field("nodes", &self.nodes.len())
            .field("bounds", &self.bounds())
            .finish_non_exhaustive()
    }
}

impl<T: Scalar, P: Copy> TouchTree<T, P> {
    /// Bulk-load a tree. Empty boxes are dropped since they can never touch.
    pub fn build(entries: impl IntoIterator<Item = (Aabb2D<T>, P)>) -> Self {
        let mut entries: Vec<(Aabb2D<T>, P)> = entries
            .into_iter()
            .filter(|(b, _)| !b.is_empty())
            .collect();
        if entries.is_empty() {
            return Self::default();
        }

        let mut nodes: Vec<Node<T>> = Vec::new();

        // Leaf level: reorder the entries so every leaf owns a contiguous range.
        let n = entries.len();
        let slice_size = Self::slice_size(n);
        entries.sort_by(|a, b| cmp_t(&Self::centroid_x(&a.0), &Self::centroid_x(&b.0)));
        let mut level: Vec<usize> = Vec::new();
        let mut start = 0;
        while start < n {
            let end = core::cmp::min(start + slice_size, n);
            entries[start..end]
                .sort_by(|a, b| cmp_t(&Self::centroid_y(&a.0), &Self::centroid_y(&b.0)));
            let mut i = start;
            while i < end {
                let j = core::cmp::min(i + NODE_CAPACITY, end);
                let bbox = entries[i + 1..j]
                    .iter()
                    .fold(entries[i].0, |acc, e| union_aabb(acc, e.0));
                level.push(nodes.len());
                nodes.push(Node {
                    bbox,
                    children: Children::Entries(i..j),
                });
                i = j;
            }
            start = end;
        }

        // Promote until a single root remains.
        while level.len() > 1 {
            let count = level.len();
            let slice_size = Self::slice_size(count);
            level.sort_by(|&a, &b| {
                cmp_t(
                    &Self::centroid_x(&nodes[a].bbox),
                    &Self::centroid_x(&nodes[b].bbox),
                )
            });
            let mut next: Vec<usize> = Vec::new();
            for slice in level.chunks_mut(slice_size) {
                slice.sort_by(|&a, &b| {
                    cmp_t(
                        &Self::centroid_y(&nodes[a].bbox),
                        &Self::centroid_y(&nodes[b].bbox),
                    )
                });
                for chunk in slice.chunks(NODE_CAPACITY) {
                    let bbox = chunk[1..]
                        .iter()
                        .fold(nodes[chunk[0]].bbox, |acc, &c| union_aabb(acc, nodes[c].bbox));
                    next.push(nodes.len());
                    nodes.push(Node {
                        bbox,
                        children: Children::Nodes(chunk.to_vec()),
                    });
                }
            }
            level = next;
        }

        Self {
            entries,
            nodes,
            root: level.first().copied(),
        }
    }

    /// Number of (non-empty) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of all entry boxes, or `None` for an empty tree.
    pub fn bounds(&self) -> Option<Aabb2D<T>> {
        self.root.map(|r| self.nodes[r].bbox)
    }

    /// Iterate all entries in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &(Aabb2D<T>, P)> + '_ {
        self.entries.iter()
    }

    /// Iterate the payloads of all entries whose box touches `region`.
    pub fn touching(&self, region: Aabb2D<T>) -> Touching<'_, T, P> {
        let mut stack = Vec::new();
        if let Some(r) = self.root {
            stack.push(r);
        }
        Touching {
            tree: self,
            region,
            stack,
            leaf: 0..0,
        }
    }

    fn slice_size(n: usize) -> usize {
        let leaves = n.div_ceil(NODE_CAPACITY);
        let mut slices = 1_usize;
        while slices * slices < leaves {
            slices += 1;
        }
        n.div_ceil(slices).max(1)
    }

    fn centroid_x(a: &Aabb2D<T>) -> T {
        Scalar::mid(a.min_x, a.max_x)
    }

    fn centroid_y(a: &Aabb2D<T>) -> T {
        Scalar::mid(a.min_y, a.max_y)
    }
}

/// Iterator returned by [`TouchTree::touching`].
#[derive(Debug)]
pub struct Touching<'a, T: Scalar, P: Copy> {
    tree: &'a TouchTree<T, P>,
    region: Aabb2D<T>,
    stack: Vec<usize>,
    leaf: Range<usize>,
}

impl<T: Scalar, P: Copy> Iterator for Touching<'_, T, P> {
    type Item = P;

    fn next(&mut self) -> Option<P> {
        loop {
            for i in self.leaf.by_ref() {
                let (bbox, payload) = &self.tree.entries[i];
                if bbox.touches(&self.region) {
                    return Some(*payload);
                }
            }
            let n = self.stack.pop()?;
            let node = &self.tree.nodes[n];
            if !node.bbox.touches(&self.region) {
                continue;
            }
            match &node.children {
                Children::Entries(r) => self.leaf = r.clone(),
                Children::Nodes(c) => self.stack.extend(c.iter().copied()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn grid(n: i64) -> TouchTree<i64, (i64, i64)> {
        let mut items = Vec::new();
        for y in 0..n {
            for x in 0..n {
                items.push((Aabb2D::<i64>::from_xywh(x * 10, y * 10, 5, 5), (x, y)));
            }
        }
        TouchTree::build(items)
    }

    #[test]
    fn empty_tree_has_no_bounds() {
        let t: TouchTree<f64, u32> = TouchTree::build(Vec::new());
        assert!(t.is_empty());
        assert!(t.bounds().is_none());
        assert_eq!(t.touching(Aabb2D::new(0.0, 0.0, 1.0, 1.0)).count(), 0);
    }

    #[test]
    fn touching_matches_linear_filter() {
        let t = grid(23);
        assert_eq!(t.len(), 23 * 23);
        assert_eq!(t.bounds(), Some(Aabb2D::new(0, 0, 225, 225)));
        let region = Aabb2D::new(15, 25, 45, 40);
        let mut hits: Vec<_> = t.touching(region).collect();
        hits.sort_unstable();
        let mut expected: Vec<_> = t
            .iter()
            .filter(|(b, _)| b.touches(&region))
            .map(|(_, p)| *p)
            .collect();
        expected.sort_unstable();
        assert_eq!(hits, expected);
        // Boxes at x = 20..25 and x = 40..45 touch the region boundary.
        assert!(hits.contains(&(4, 4)));
        assert!(hits.contains(&(2, 2)));
    }

    #[test]
    fn empty_entries_are_dropped() {
        let t = TouchTree::build([
            (Aabb2D::new(0, 0, 10, 10), 1_u8),
            (Aabb2D::new(5, 5, 0, 0), 2_u8),
        ]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.touching(Aabb2D::new(2, 2, 3, 3)).collect::<Vec<_>>(), [1]);
    }
}
