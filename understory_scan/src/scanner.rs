// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sort-and-sweep box scanners.
//!
//! A scanner collects boxes tagged with a payload and reports every pair of
//! touching boxes exactly once. Entries are sorted by their left edge; each
//! entry is then compared only against the following entries whose left edge
//! lies within its own x extent.
//!
//! The callback returns [`ControlFlow`]; returning `Break` stops the scan and
//! `process` returns `Break` as well, which turns a scan into an existence
//! query.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::ops::ControlFlow;

use crate::types::{Aabb2D, cmp_t, le};

/// 1-to-1 scanner: reports touching pairs within one set of boxes.
#[derive(Clone)]
pub struct BoxScanner<T, P> {
    entries: Vec<(Aabb2D<T>, P)>,
}

impl<T, P> Default for BoxScanner<T, P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T, P> Debug for BoxScanner<T, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoxScanner")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<T: Copy + PartialOrd, P> BoxScanner<T, P> {
    /// Create an empty scanner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty scanner with room for `n` entries.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n),
        }
    }

    /// Add a box. Empty boxes are accepted but never reported.
    pub fn insert(&mut self, aabb: Aabb2D<T>, payload: P) {
        self.entries.push((aabb, payload));
    }

    /// Number of inserted entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was inserted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Report every unordered pair of distinct touching entries once.
    pub fn process<F>(&mut self, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(&P, &P) -> ControlFlow<()>,
    {
        self.entries.retain(|(b, _)| !b.is_empty());
        self.entries.sort_by(|a, b| cmp_t(&a.0.min_x, &b.0.min_x));
        for (i, (bi, pi)) in self.entries.iter().enumerate() {
            for (bj, pj) in &self.entries[i + 1..] {
                if !le(bj.min_x, bi.max_x) {
                    break;
                }
                if bi.touches(bj) {
                    f(pi, pj)?;
                }
            }
        }
        ControlFlow::Continue(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    First,
    Second,
}

/// 1-to-2 scanner: reports touching pairs between two sets of boxes.
///
/// Pairs inside one set are never reported.
#[derive(Clone)]
pub struct BoxScanner2<T, P1, P2> {
    first: Vec<(Aabb2D<T>, P1)>,
    second: Vec<(Aabb2D<T>, P2)>,
}

impl<T, P1, P2> Default for BoxScanner2<T, P1, P2> {
    fn default() -> Self {
        Self {
            first: Vec::new(),
            second: Vec::new(),
        }
    }
}

impl<T, P1, P2> Debug for BoxScanner2<T, P1, P2> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoxScanner2")
            .field("first", &self.first.len())
            .field("second", &self.second.len())
            .finish_non_exhaustive()
    }
}

impl<T: Copy + PartialOrd, P1, P2> BoxScanner2<T, P1, P2> {
    /// Create an empty scanner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a box to the first set.
    pub fn insert1(&mut self, aabb: Aabb2D<T>, payload: P1) {
        self.first.push((aabb, payload));
    }

    /// Add a box to the second set.
    pub fn insert2(&mut self, aabb: Aabb2D<T>, payload: P2) {
        self.second.push((aabb, payload));
    }

    /// True if either set is empty (no pair can be reported).
    pub fn is_empty(&self) -> bool {
        self.first.is_empty() || self.second.is_empty()
    }

    /// Report every touching `(first, second)` pair once.
    pub fn process<F>(&mut self, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(&P1, &P2) -> ControlFlow<()>,
    {
        if self.is_empty() {
            return ControlFlow::Continue(());
        }
        let mut order: Vec<(Aabb2D<T>, Side, usize)> =
            Vec::with_capacity(self.first.len() + self.second.len());
        order.extend(
            self.first
                .iter()
                .enumerate()
                .filter(|(_, (b, _))| !b.is_empty())
                .map(|(i, (b, _))| (*b, Side::First, i)),
        );
        order.extend(
            self.second
                .iter()
                .enumerate()
                .filter(|(_, (b, _))| !b.is_empty())
                .map(|(i, (b, _))| (*b, Side::Second, i)),
        );
        order.sort_by(|a, b| cmp_t(&a.0.min_x, &b.0.min_x));

        for (k, (bk, sk, ik)) in order.iter().enumerate() {
            for (bj, sj, ij) in &order[k + 1..] {
                if !le(bj.min_x, bk.max_x) {
                    break;
                }
                if sj == sk || !bk.touches(bj) {
                    continue;
                }
                let (i1, i2) = match sk {
                    Side::First => (*ik, *ij),
                    Side::Second => (*ij, *ik),
                };
                f(&self.first[i1].1, &self.second[i2].1)?;
            }
        }
        ControlFlow::Continue(())
    }
}
