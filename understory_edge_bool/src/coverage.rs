// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Signed coverage of one run along its base line.

use kurbo::{Line, Point, Vec2};

use crate::group::Origin;
use crate::{EdgeBoolOp, PREC_DISTANCE};

/// Signed interval `[lo, hi]` along the base line; `dir` is `+1` or `-1`.
#[derive(Copy, Clone, Debug)]
struct Span {
    lo: f64,
    hi: f64,
    dir: i32,
}

impl Span {
    fn covers(&self, t: f64) -> bool {
        self.lo <= t && t <= self.hi
    }
}

/// Apply the per-piece join of `op` to first-input coverage `q` and
/// second-input coverage `n`.
fn join(op: EdgeBoolOp, q: i32, n: i32) -> i32 {
    match op {
        EdgeBoolOp::Or => q,
        EdgeBoolOp::And | EdgeBoolOp::Intersections => {
            if n == 0 {
                0
            } else {
                q
            }
        }
        EdgeBoolOp::Not => {
            if n == 0 {
                q
            } else {
                0
            }
        }
        EdgeBoolOp::Xor => match (n, q) {
            (0, q) => q,
            (n, 0) => n.signum(),
            _ => 0,
        },
    }
}

/// Combine a run of two or more parallel connected edges and append the
/// result to `out`.
pub(crate) fn combine(run: &[(Line, Origin)], op: EdgeBoolOp, out: &mut Vec<Line>) {
    let Some(&(base, _)) = run.first() else {
        return;
    };
    // Stretch the base line over the projections of every member.
    let rd = base.p1 - base.p0;
    let rn = 1.0 / rd.hypot();
    let (mut p1, mut p2) = (base.p0, base.p1);
    let (mut l1, mut l2) = (0.0, rd.hypot());
    for (line, _) in &run[1..] {
        for p in [line.p0, line.p1] {
            let t = (p - base.p0).dot(rd) * rn;
            if t < l1 {
                p1 = p;
                l1 = t;
            }
            if t > l2 {
                p2 = p;
                l2 = t;
            }
        }
    }

    let d: Vec2 = p2 - p1;
    let len = d.hypot();
    if len == 0.0 {
        return;
    }
    let at = |t: f64| -> Point { p1 + d * t / len };

    // With `Or` both inputs count as coverage of the first.
    let mut a_spans = Vec::new();
    let mut b_spans = Vec::new();
    for &(line, origin) in run {
        let t0 = (line.p0 - p1).dot(d) / len;
        let t1 = (line.p1 - p1).dot(d) / len;
        let span = if t0 < t1 {
            Span { lo: t0, hi: t1, dir: 1 }
        } else if t0 > t1 {
            Span { lo: t1, hi: t0, dir: -1 }
        } else {
            continue;
        };
        if origin == Origin::A || op == EdgeBoolOp::Or {
            a_spans.push(span);
        } else {
            b_spans.push(span);
        }
    }

    let mut cuts: Vec<f64> = a_spans
        .iter()
        .chain(&b_spans)
        .flat_map(|s| [s.lo, s.hi])
        .chain([0.0, len])
        .collect();
    cuts.sort_by(f64::total_cmp);
    cuts.dedup_by(|b, a| (*b - *a).abs() <= PREC_DISTANCE);

    // Pieces with their resulting signed coverage, merged when adjacent and equal.
    let mut pieces: Vec<(f64, f64, i32)> = Vec::new();
    for w in cuts.windows(2) {
        let (lo, hi) = (w[0], w[1]);
        let mid = 0.5 * (lo + hi);
        let sum = |spans: &[Span]| -> i32 {
            spans.iter().filter(|s| s.covers(mid)).map(|s| s.dir).sum()
        };
        let q = sum(&a_spans).signum();
        let v = join(op, q, sum(&b_spans));
        if v == 0 {
            continue;
        }
        match pieces.last_mut() {
            Some(last) if last.2 == v && (last.1 - lo).abs() <= PREC_DISTANCE => last.1 = hi,
            _ => pieces.push((lo, hi, v)),
        }
    }

    out.extend(pieces.into_iter().map(|(lo, hi, v)| {
        if v > 0 {
            Line::new(at(lo), at(hi))
        } else {
            Line::new(at(hi), at(lo))
        }
    }));
}
