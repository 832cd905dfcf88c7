// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred cluster merges.

use std::collections::BTreeMap;

use crate::types::ClusterId;

/// Union-find over cluster ids whose merge is postponed to the end of a cell build.
///
/// The smaller id is always the root, so committing a set into its first id
/// keeps the result independent of the order pairs were marked in.
#[derive(Clone, Debug, Default)]
pub(crate) struct JoinSets {
    parent: BTreeMap<ClusterId, ClusterId>,
}

impl JoinSets {
    fn find(&mut self, id: ClusterId) -> ClusterId {
        let mut root = id;
        while let Some(&p) = self.parent.get(&root)
            && p != root
        {
            root = p;
        }
        // Path compression.
        let mut cur = id;
        while cur != root {
            let next = self.parent.get(&cur).copied().unwrap_or(root);
            self.parent.insert(cur, root);
            cur = next;
        }
        root
    }

    /// Record that `a` and `b` belong together.
    pub(crate) fn mark(&mut self, a: ClusterId, b: ClusterId) {
        let (ra, rb) = (self.find(a), self.find(b));
        self.parent.entry(ra).or_insert(ra);
        self.parent.entry(rb).or_insert(rb);
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent.insert(hi, lo);
        }
    }

    /// The sets with at least two members, each sorted with its smallest id first.
    pub(crate) fn into_sets(mut self) -> Vec<Vec<ClusterId>> {
        let ids: Vec<_> = self.parent.keys().copied().collect();
        let mut sets: BTreeMap<ClusterId, Vec<ClusterId>> = BTreeMap::new();
        for id in ids {
            let root = self.find(id);
            sets.entry(root).or_default().push(id);
        }
        // Keys were visited in ascending order, so every set is already sorted.
        sets.into_values().filter(|s| s.len() > 1).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ClusterId {
        ClusterId::new(raw).unwrap()
    }

    #[test]
    fn sets_are_rooted_at_the_smallest_id() {
        let mut j = JoinSets::default();
        j.mark(id(7), id(3));
        j.mark(id(9), id(8));
        j.mark(id(8), id(7));
        j.mark(id(20), id(20));
        j.mark(id(5), id(6));
        let sets = j.into_sets();
        assert_eq!(sets, [vec![id(3), id(7), id(8), id(9)], vec![id(5), id(6)]]);
    }

    #[test]
    fn marking_order_does_not_matter() {
        let pairs = [(1, 4), (4, 2), (6, 5), (2, 6), (10, 11)];
        let mut fwd = JoinSets::default();
        let mut rev = JoinSets::default();
        for &(a, b) in &pairs {
            fwd.mark(id(a), id(b));
        }
        for &(a, b) in pairs.iter().rev() {
            rev.mark(id(b), id(a));
        }
        assert_eq!(fwd.into_sets(), rev.into_sets());
    }
}
