// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grouping edges into runs of parallel, connected edges.

use std::ops::ControlFlow;

use kurbo::{Line, Point, Vec2};
use understory_scan::{Aabb2D, BoxScanner};

use crate::PREC_DISTANCE;

/// Which input an edge came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Origin {
    A,
    B,
}

fn is_degenerate(l: Line) -> bool {
    l.p0 == l.p1
}

fn direction(l: Line) -> Vec2 {
    l.p1 - l.p0
}

fn bbox(l: Line) -> Aabb2D<f64> {
    Aabb2D::new(
        l.p0.x.min(l.p1.x),
        l.p0.y.min(l.p1.y),
        l.p0.x.max(l.p1.x),
        l.p0.y.max(l.p1.y),
    )
}

fn parallel(a: Line, b: Line) -> bool {
    let (da, db) = (direction(a), direction(b));
    da.cross(db).abs() < PREC_DISTANCE * da.hypot().min(db.hypot())
}

fn share_endpoint(a: Line, b: Line) -> bool {
    a.p0 == b.p0 || a.p0 == b.p1 || a.p1 == b.p0 || a.p1 == b.p1
}

/// Whether parallel edges `a` and `b` lie on one carrier and overlap.
fn coincident(a: Line, b: Line) -> bool {
    let d = direction(a);
    let len = d.hypot();
    let off = |p: Point| (p - a.p0).cross(d).abs() / len;
    if off(b.p0) >= PREC_DISTANCE || off(b.p1) >= PREC_DISTANCE {
        return false;
    }
    let t = |p: Point| (p - a.p0).dot(d) / len;
    let (lo, hi) = {
        let (t0, t1) = (t(b.p0), t(b.p1));
        (t0.min(t1), t0.max(t1))
    };
    lo.max(0.0) < hi.min(len)
}

/// Crossing point of two segments, if they share one.
fn crossing(a: Line, b: Line) -> Option<Point> {
    let (da, db) = (direction(a), direction(b));
    let denom = da.cross(db);
    if denom == 0.0 {
        return None;
    }
    let w = b.p0 - a.p0;
    let s = w.cross(db) / denom;
    let u = w.cross(da) / denom;
    let eps = PREC_DISTANCE / da.hypot().max(db.hypot());
    let inside = |v: f64| (-eps..=1.0 + eps).contains(&v);
    (inside(s) && inside(u)).then(|| a.p0 + da * s)
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Split `edges` into runs, each a list of edge indices in ascending order.
///
/// Runs come out ordered by their first index. Edges that join nothing form
/// runs of one. When `intersections` is given, the crossing points of
/// first-input edges with second-input edges outside a common run are pushed
/// to it as zero-length edges.
pub(crate) fn group_edges(
    edges: &[(Line, Origin)],
    mut intersections: Option<&mut Vec<Line>>,
) -> Vec<Vec<usize>> {
    let mut scanner = BoxScanner::with_capacity(edges.len());
    for (i, (l, _)) in edges.iter().enumerate() {
        scanner.insert(bbox(*l), i);
    }

    let mut parent: Vec<usize> = (0..edges.len()).collect();
    let _ = scanner.process(|&i, &j| {
        let ((a, oa), (b, ob)) = (edges[i], edges[j]);
        if !is_degenerate(a)
            && !is_degenerate(b)
            && parallel(a, b)
            && (share_endpoint(a, b) || coincident(a, b))
        {
            let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
            if ri != rj {
                parent[ri.max(rj)] = ri.min(rj);
            }
        } else if oa != ob
            && let Some(points) = intersections.as_deref_mut()
            && let Some(p) = crossing(a, b)
        {
            points.push(Line::new(p, p));
        }
        ControlFlow::Continue(())
    });

    let mut runs: Vec<Vec<usize>> = Vec::new();
    let mut slot_of_root = vec![usize::MAX; edges.len()];
    for i in 0..edges.len() {
        let root = find(&mut parent, i);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = runs.len();
            runs.push(Vec::new());
        }
        runs[slot_of_root[root]].push(i);
    }
    runs
}
