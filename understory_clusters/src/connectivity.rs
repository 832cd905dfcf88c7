// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Which layers may connect when their shapes touch.

use std::collections::{BTreeMap, BTreeSet};

use kurbo::Affine;
use understory_cell_tree::{LayerId, Shape};

/// A symmetric relation over layers.
///
/// Shapes on the same layer only connect if that layer was registered with
/// [`Connectivity::connect_self`]. The relation is not transitive: connecting
/// `A`-`B` and `B`-`C` does not connect `A`-`C` directly, although shapes on `A`
/// and `C` can still end up in one cluster through a shape on `B`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Connectivity {
    connected: BTreeMap<LayerId, BTreeSet<LayerId>>,
}

impl Connectivity {
    /// Create an empty relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Let shapes on `a` connect to shapes on `b` (and vice versa).
    pub fn connect(&mut self, a: LayerId, b: LayerId) -> &mut Self {
        self.connected.entry(a).or_default().insert(b);
        self.connected.entry(b).or_default().insert(a);
        self
    }

    /// Let shapes on `a` connect to each other.
    pub fn connect_self(&mut self, a: LayerId) -> &mut Self {
        self.connect(a, a)
    }

    /// Layers taking part in the relation, ascending.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.connected.keys().copied()
    }

    /// Layers `a` may connect to, ascending.
    pub fn connected(&self, a: LayerId) -> impl Iterator<Item = LayerId> + '_ {
        self.connected.get(&a).into_iter().flatten().copied()
    }

    /// Whether shapes on `a` and `b` may connect.
    pub fn may_connect(&self, a: LayerId, b: LayerId) -> bool {
        self.connected.get(&a).is_some_and(|s| s.contains(&b))
    }

    /// Whether shape `a` on `la` connects to shape `b` on `lb`, where `b` is
    /// mapped into `a`'s frame by `trans`.
    pub fn interacts(&self, a: &Shape, la: LayerId, b: &Shape, lb: LayerId, trans: Affine) -> bool {
        self.may_connect(la, lb) && a.interacts(b, trans)
    }
}
