// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Edge Bool: boolean operations on sets of straight edges.
//!
//! Edges are directed [`Line`]s. Two edges take part in the same run when they
//! are parallel (within [`PREC_DISTANCE`]) and connected, meaning they share an
//! endpoint or overlap on a common carrier line. Every run is projected onto
//! one base line and the two inputs are combined piecewise:
//!
//! - [`EdgeBoolOp::Or`]: the merged coverage of both inputs.
//! - [`EdgeBoolOp::And`]: the parts of the first input covered by the second.
//! - [`EdgeBoolOp::Not`]: the parts of the first input not covered by the second.
//! - [`EdgeBoolOp::Xor`]: the parts covered by exactly one input.
//! - [`EdgeBoolOp::Intersections`]: like `And`, plus every crossing point of a
//!   first-input edge with a second-input edge, reported as a zero-length edge.
//!
//! Edge direction matters: coverage is counted with a sign, so two edges of
//! the first input running in opposite directions over the same stretch
//! cancel. Output pieces keep the direction of the coverage they come from.
//!
//! Output order is deterministic: runs are emitted in the order of their
//! first edge, pieces of a run along the base line.
//!
//! # Example
//!
//! ```
//! use kurbo::{Line, Point};
//! use understory_edge_bool::{EdgeBoolOp, edge_boolean};
//!
//! let a = [Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0))];
//! let b = [Line::new(Point::new(5.0, 0.0), Point::new(15.0, 0.0))];
//!
//! let and = edge_boolean(&a, &b, EdgeBoolOp::And);
//! assert_eq!(and, [Line::new(Point::new(5.0, 0.0), Point::new(10.0, 0.0))]);
//!
//! let not = edge_boolean(&a, &b, EdgeBoolOp::Not);
//! assert_eq!(not, [Line::new(Point::new(0.0, 0.0), Point::new(5.0, 0.0))]);
//! ```

mod coverage;
mod group;

pub use kurbo::Line;

use group::{Origin, group_edges};

/// Parallelism and coincidence tolerance, in coordinate units.
pub const PREC_DISTANCE: f64 = 1e-5;

/// The boolean operation applied by [`edge_boolean`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EdgeBoolOp {
    /// Union of both inputs.
    Or,
    /// First input minus second input.
    Not,
    /// Symmetric difference.
    Xor,
    /// Intersection.
    And,
    /// Intersection plus crossing points of non-parallel edges.
    Intersections,
}

/// Combine two edge sets.
///
/// For [`EdgeBoolOp::Intersections`] the crossing points are appended to the
/// output after the `And` pieces; use [`edge_boolean_with_intersections`] to
/// keep them apart.
pub fn edge_boolean(a: &[Line], b: &[Line], op: EdgeBoolOp) -> Vec<Line> {
    let mut out = Vec::new();
    let mut points = Vec::new();
    run(a, b, op, &mut out, (op == EdgeBoolOp::Intersections).then_some(&mut points));
    out.extend(points);
    out
}

/// Combine two edge sets and collect crossing points separately.
///
/// `op` is applied as in [`edge_boolean`] (with `Intersections` treated as
/// `And`). The second vector holds one zero-length edge per crossing of a
/// first-input edge with a second-input edge that are not part of one run.
pub fn edge_boolean_with_intersections(
    a: &[Line],
    b: &[Line],
    op: EdgeBoolOp,
) -> (Vec<Line>, Vec<Line>) {
    let mut out = Vec::new();
    let mut points = Vec::new();
    run(a, b, op, &mut out, Some(&mut points));
    (out, points)
}

fn run(
    a: &[Line],
    b: &[Line],
    op: EdgeBoolOp,
    out: &mut Vec<Line>,
    intersections: Option<&mut Vec<Line>>,
) {
    let op = match op {
        EdgeBoolOp::Intersections => EdgeBoolOp::And,
        other => other,
    };
    let edges: Vec<(Line, Origin)> = a
        .iter()
        .map(|l| (*l, Origin::A))
        .chain(b.iter().map(|l| (*l, Origin::B)))
        .collect();

    for members in group_edges(&edges, intersections) {
        if let [single] = members.as_slice() {
            let (line, origin) = edges[*single];
            let keep = match origin {
                Origin::A => op != EdgeBoolOp::And,
                Origin::B => matches!(op, EdgeBoolOp::Or | EdgeBoolOp::Xor),
            };
            if keep {
                out.push(line);
            }
            continue;
        }
        let run: Vec<(Line, Origin)> = members.iter().map(|&i| edges[i]).collect();
        coverage::combine(&run, op, out);
    }
}
