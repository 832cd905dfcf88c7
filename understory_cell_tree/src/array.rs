// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell instances and regular arrays of them.
//!
//! Element `(i, j)` of an array is the base placement followed by a
//! displacement of `i * a + j * b`. Queries never enumerate the array: the
//! candidate index ranges are solved from the lattice, so the work done by
//! [`CellInstArray::touching`] is bounded by the size of the query region, not by
//! the element count.

use kurbo::{Affine, Rect, Vec2};

use crate::geom::{rect_touches, transform_rect_bbox};
use crate::shape::INTERACTION_TOLERANCE;
use crate::types::{ArrayIndex, CellId};

/// Slack (in index units) added around solved lattice ranges before the exact filter.
const LATTICE_EPSILON: f64 = 1e-6;

/// Relative cross product below which two lattice vectors count as collinear.
const COLLINEAR_EPSILON: f64 = 1e-12;

/// A regular two-dimensional repetition.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Repetition {
    /// First lattice vector.
    pub a: Vec2,
    /// Second lattice vector.
    pub b: Vec2,
    /// Number of elements along `a` (at least one; [`Layout::insert_instance`](crate::Layout::insert_instance) rejects zero).
    pub na: u32,
    /// Number of elements along `b` (at least one).
    pub nb: u32,
}

/// A placement of a cell, optionally repeated as a regular array.
#[derive(Clone, Debug, PartialEq)]
pub struct CellInstArray {
    /// The placed cell.
    pub cell: CellId,
    /// Base transform from the child's frame into the parent's frame.
    pub trans: Affine,
    /// Array repetition, or `None` for a single placement.
    pub repetition: Option<Repetition>,
}

impl CellInstArray {
    /// A single placement.
    pub fn single(cell: CellId, trans: Affine) -> Self {
        Self {
            cell,
            trans,
            repetition: None,
        }
    }

    /// An `na` x `nb` array with lattice vectors `a` and `b`.
    ///
    /// # Panics
    ///
    /// Panics if either count is zero.
    pub fn array(cell: CellId, trans: Affine, a: Vec2, na: u32, b: Vec2, nb: u32) -> Self {
        assert!(na > 0 && nb > 0, "array dimensions must be positive");
        Self {
            cell,
            trans,
            repetition: Some(Repetition { a, b, na, nb }),
        }
    }

    /// `(na, nb)`; `(1, 1)` for a single placement.
    pub fn dims(&self) -> (u32, u32) {
        self.repetition.map_or((1, 1), |r| (r.na, r.nb))
    }

    /// Number of placed elements.
    pub fn element_count(&self) -> u64 {
        let (na, nb) = self.dims();
        u64::from(na) * u64::from(nb)
    }

    /// Whether `index` names an element of this array.
    pub fn contains(&self, index: ArrayIndex) -> bool {
        let (na, nb) = self.dims();
        index.a < na && index.b < nb
    }

    fn lattice(&self) -> (Vec2, Vec2) {
        self.repetition.map_or((Vec2::ZERO, Vec2::ZERO), |r| (r.a, r.b))
    }

    fn displacement(&self, da: f64, db: f64) -> Vec2 {
        let (a, b) = self.lattice();
        a * da + b * db
    }

    /// Transform of one element from the child's frame into the parent's frame.
    pub fn element_trans(&self, index: ArrayIndex) -> Affine {
        let d = self.displacement(f64::from(index.a), f64::from(index.b));
        Affine::translate(d) * self.trans
    }

    /// Box of one element in the parent's frame, given the child cell's box.
    pub fn element_bbox(&self, index: ArrayIndex, cell_box: Rect) -> Rect {
        let d = self.displacement(f64::from(index.a), f64::from(index.b));
        transform_rect_bbox(self.trans, cell_box) + d
    }

    /// Box covering every element, given the child cell's box.
    pub fn bbox(&self, cell_box: Rect) -> Rect {
        let base = transform_rect_bbox(self.trans, cell_box);
        let (na, nb) = self.dims();
        let (la, lb) = (f64::from(na.saturating_sub(1)), f64::from(nb.saturating_sub(1)));
        [(la, 0.0), (0.0, lb), (la, lb)]
            .into_iter()
            .fold(base, |acc, (i, j)| acc.union(base + self.displacement(i, j)))
    }

    /// Iterate the elements whose boxes touch `region`.
    ///
    /// `cell_box` is the box of the placed cell in its own frame; `None` (an
    /// empty cell) yields nothing.
    pub fn touching(&self, region: Rect, cell_box: Option<Rect>) -> TouchingElements {
        let Some(cell_box) = cell_box else {
            return TouchingElements::empty();
        };
        let (a, b) = self.lattice();
        let base = transform_rect_bbox(self.trans, cell_box);
        let (na, nb) = self.dims();
        // Displacements moving `base` onto something touching `region`.
        let window = Rect::new(
            region.x0 - base.x1,
            region.y0 - base.y1,
            region.x1 - base.x0,
            region.y1 - base.y0,
        );
        let (i_span, j_span) = ((0, i64::from(na) - 1), (0, i64::from(nb) - 1));
        TouchingElements {
            a,
            b,
            base,
            region,
            candidates: Candidates::new(a, b, window, i_span, j_span),
        }
    }

    /// Lattice offsets `(da, db)` such that element `e` touches element `e + d`.
    ///
    /// Only offsets greater than `(0, 0)` in lexicographic order are returned,
    /// ascending, so every unordered pair of distinct touching elements
    /// corresponds to exactly one offset. Elements of a single placement have
    /// no neighbours. Touching is tested with [`INTERACTION_TOLERANCE`].
    #[allow(
        clippy::cast_precision_loss,
        reason = "lattice offsets are 32-bit and exact in f64"
    )]
    pub fn self_touching_offsets(&self, cell_box: Rect) -> Vec<(i64, i64)> {
        let (na, nb) = self.dims();
        if na <= 1 && nb <= 1 {
            return Vec::new();
        }
        let (a, b) = self.lattice();
        let base = transform_rect_bbox(self.trans, cell_box);
        let grown = base.inflate(INTERACTION_TOLERANCE, INTERACTION_TOLERANCE);
        let (w, h) = (grown.width(), grown.height());
        let window = Rect::new(-w, -h, w, h);
        let (ma, mb) = (i64::from(na) - 1, i64::from(nb) - 1);
        let mut out: Vec<(i64, i64)> = Candidates::new(a, b, window, (0, ma), (-mb, mb))
            .filter(|&(da, db)| da > 0 || db > 0)
            .filter(|&(da, db)| rect_touches(grown + (a * da as f64 + b * db as f64), base))
            .collect();
        out.sort_unstable();
        out
    }

    /// All element pairs `(e, e + offset)` inside this array.
    pub fn element_pairs(
        &self,
        offset: (i64, i64),
    ) -> impl Iterator<Item = (ArrayIndex, ArrayIndex)> + '_ {
        let (na, nb) = self.dims();
        let (da, db) = offset;
        let a_range = i64::max(0, -da)..i64::from(na) - i64::max(0, da);
        let b_range = i64::max(0, -db)..i64::from(nb) - i64::max(0, db);
        a_range.flat_map(move |i| {
            b_range.clone().filter_map(move |j| {
                let from = ArrayIndex::new(u32::try_from(i).ok()?, u32::try_from(j).ok()?);
                let to = ArrayIndex::new(
                    u32::try_from(i + da).ok()?,
                    u32::try_from(j + db).ok()?,
                );
                Some((from, to))
            })
        })
    }
}

/// Iterator returned by [`CellInstArray::touching`].
#[derive(Clone, Debug)]
pub struct TouchingElements {
    a: Vec2,
    b: Vec2,
    base: Rect,
    region: Rect,
    candidates: Candidates,
}

impl TouchingElements {
    fn empty() -> Self {
        Self {
            a: Vec2::ZERO,
            b: Vec2::ZERO,
            base: Rect::ZERO,
            region: Rect::ZERO,
            candidates: Candidates::empty(),
        }
    }
}

impl Iterator for TouchingElements {
    type Item = ArrayIndex;

    fn next(&mut self) -> Option<ArrayIndex> {
        for (i, j) in self.candidates.by_ref() {
            let (Ok(i), Ok(j)) = (u32::try_from(i), u32::try_from(j)) else {
                continue;
            };
            let d = self.a * f64::from(i) + self.b * f64::from(j);
            if rect_touches(self.base + d, self.region) {
                return Some(ArrayIndex::new(i, j));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, usize::try_from(self.candidates.remaining()).ok())
    }
}

/// Lattice indices `(i, j)` whose displacement may fall inside a window,
/// visited row by row.
///
/// A row is one value of the outer index and carries its own inner span, so
/// the diagonal band cut out of a collinear lattice is walked without
/// visiting the indices around it.
#[derive(Clone, Debug)]
struct Candidates {
    rows: Rows,
    outer: i64,
    outer_hi: i64,
    inner: i64,
    inner_hi: i64,
}

/// How the inner span of one row is found.
#[derive(Copy, Clone, Debug)]
enum Rows {
    /// Independent lattice vectors: `i` is the outer index and every row
    /// shares the span `[lo, hi]` of `j`.
    Grid { lo: i64, hi: i64 },
    /// Collinear lattice vectors. Positions along the common direction are
    /// `outer * p + inner * q` and must lie in `[lo, hi]`.
    Band {
        /// The outer index is `j` and the inner one `i`.
        swap: bool,
        p: f64,
        q: f64,
        lo: f64,
        hi: f64,
        inner: (i64, i64),
    },
}

impl Rows {
    #[allow(
        clippy::cast_precision_loss,
        reason = "lattice indices are 32-bit and exact in f64"
    )]
    fn span(&self, outer: i64) -> Option<(i64, i64)> {
        match *self {
            Self::Grid { lo, hi } => (lo <= hi).then_some((lo, hi)),
            Self::Band {
                p, q, lo, hi, inner, ..
            } => {
                if q == 0.0 {
                    return (inner.0 <= inner.1).then_some(inner);
                }
                let at = outer as f64 * p;
                let (t0, t1) = ((lo - at) / q, (hi - at) / q);
                clamp_span(t0.min(t1), t0.max(t1), inner.0, inner.1)
            }
        }
    }

    fn index(&self, outer: i64, inner: i64) -> (i64, i64) {
        match self {
            Self::Band { swap: true, .. } => (inner, outer),
            _ => (outer, inner),
        }
    }

    /// Upper bound on the candidates of any one row.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "the band width is non-negative and below the row count"
    )]
    fn width(&self) -> u64 {
        match *self {
            Self::Grid { lo, hi } => count(lo, hi),
            Self::Band {
                q, lo, hi, inner, ..
            } => {
                let full = count(inner.0, inner.1);
                // Not finite (and never below `full`) for `q == 0` or an unbounded band.
                let band = (hi - lo) / q.abs() + 2.0 * LATTICE_EPSILON;
                if band < full as f64 {
                    band.floor() as u64 + 1
                } else {
                    full
                }
            }
        }
    }
}

impl Candidates {
    fn empty() -> Self {
        Self {
            rows: Rows::Grid { lo: 1, hi: 0 },
            outer: 1,
            outer_hi: 0,
            inner: 1,
            inner_hi: 0,
        }
    }

    /// Indices in `i_span` x `j_span` (inclusive) whose displacement
    /// `i * a + j * b` may lie inside `window`.
    ///
    /// A span of `(0, 0)` pins its axis, whatever its lattice vector.
    fn new(a: Vec2, b: Vec2, window: Rect, i_span: (i64, i64), j_span: (i64, i64)) -> Self {
        let a = if i_span == (0, 0) { Vec2::ZERO } else { a };
        let b = if j_span == (0, 0) { Vec2::ZERO } else { b };
        let det = a.cross(b);
        let solved = if det.abs() > COLLINEAR_EPSILON * a.hypot() * b.hypot() {
            Self::grid(a, b, det, window, i_span, j_span)
        } else {
            Self::band(a, b, window, i_span, j_span)
        };
        solved.unwrap_or_else(Self::empty)
    }

    fn grid(
        a: Vec2,
        b: Vec2,
        det: f64,
        window: Rect,
        i_span: (i64, i64),
        j_span: (i64, i64),
    ) -> Option<Self> {
        let mut bounds = [f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY];
        for (x, y) in [
            (window.x0, window.y0),
            (window.x1, window.y0),
            (window.x0, window.y1),
            (window.x1, window.y1),
        ] {
            let c = Vec2::new(x, y);
            let i = c.cross(b) / det;
            let j = a.cross(c) / det;
            bounds[0] = bounds[0].min(i);
            bounds[1] = bounds[1].max(i);
            bounds[2] = bounds[2].min(j);
            bounds[3] = bounds[3].max(j);
        }
        let (i0, i1) = clamp_span(bounds[0], bounds[1], i_span.0, i_span.1)?;
        let (lo, hi) = clamp_span(bounds[2], bounds[3], j_span.0, j_span.1)?;
        Some(Self {
            rows: Rows::Grid { lo, hi },
            outer: i0,
            outer_hi: i1,
            inner: lo,
            inner_hi: hi,
        })
    }

    /// Both vectors lie on one line through the origin (or vanish), so the
    /// window reduces to a range along that line.
    #[allow(
        clippy::cast_precision_loss,
        reason = "lattice indices are 32-bit and exact in f64"
    )]
    fn band(a: Vec2, b: Vec2, window: Rect, i_span: (i64, i64), j_span: (i64, i64)) -> Option<Self> {
        let (u, off_span) = if a.hypot2() >= b.hypot2() {
            (a, j_span)
        } else {
            (b, i_span)
        };
        let (lo, hi, p, q) = if u.hypot2() == 0.0 {
            let (lo, hi) = axis_bounds(Vec2::ZERO, window)?;
            (lo, hi, 0.0, 0.0)
        } else {
            // Nearly collinear vectors drift off the line by `det / |u|` per step.
            let n = off_span.0.abs().max(off_span.1.abs()) as f64;
            let drift = a.cross(b).abs() / u.hypot() * n;
            let (lo, hi) = axis_bounds(u, window.inflate(drift, drift))?;
            (lo, hi, a.dot(u) / u.hypot2(), b.dot(u) / u.hypot2())
        };

        let swap = q.abs() > p.abs();
        let (po, qi, outer_span, inner_span) = if swap {
            (q, p, j_span, i_span)
        } else {
            (p, q, i_span, j_span)
        };
        let (o0, o1) = if po == 0.0 {
            (outer_span.0 <= outer_span.1).then_some(outer_span)?
        } else {
            let (c0, c1) = (qi * inner_span.0 as f64, qi * inner_span.1 as f64);
            let (t0, t1) = ((lo - c0.max(c1)) / po, (hi - c0.min(c1)) / po);
            clamp_span(t0.min(t1), t0.max(t1), outer_span.0, outer_span.1)?
        };

        let rows = Rows::Band {
            swap,
            p: po,
            q: qi,
            lo,
            hi,
            inner: inner_span,
        };
        let (inner, inner_hi) = rows.span(o0).unwrap_or((1, 0));
        Some(Self {
            rows,
            outer: o0,
            outer_hi: o1,
            inner,
            inner_hi,
        })
    }

    /// Upper bound on the candidates still to come.
    fn remaining(&self) -> u64 {
        if self.outer > self.outer_hi {
            return 0;
        }
        let rows = u64::try_from(self.outer_hi - self.outer).unwrap_or(0);
        count(self.inner, self.inner_hi).saturating_add(rows.saturating_mul(self.rows.width()))
    }
}

impl Iterator for Candidates {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<(i64, i64)> {
        while self.outer <= self.outer_hi {
            if self.inner <= self.inner_hi {
                let inner = self.inner;
                self.inner += 1;
                return Some(self.rows.index(self.outer, inner));
            }
            self.outer += 1;
            if self.outer <= self.outer_hi {
                (self.inner, self.inner_hi) = self.rows.span(self.outer).unwrap_or((1, 0));
            }
        }
        None
    }
}

/// Number of integers in `[lo, hi]`.
fn count(lo: i64, hi: i64) -> u64 {
    u64::try_from(hi - lo + 1).unwrap_or(0)
}

/// Range of `t` such that `t * v` lies inside `window`.
fn axis_bounds(v: Vec2, window: Rect) -> Option<(f64, f64)> {
    let mut lo = f64::NEG_INFINITY;
    let mut hi = f64::INFINITY;
    for (vc, w0, w1) in [(v.x, window.x0, window.x1), (v.y, window.y0, window.y1)] {
        if vc == 0.0 {
            if w0 > 0.0 || w1 < 0.0 {
                return None;
            }
        } else {
            let (t0, t1) = (w0 / vc, w1 / vc);
            lo = lo.max(t0.min(t1));
            hi = hi.min(t0.max(t1));
        }
    }
    (lo <= hi).then_some((lo, hi))
}

/// Integers inside `[lo, hi]` (widened by the lattice epsilon) clamped to `[min, max]`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "values are clamped to the i64 bounds before the cast"
)]
fn clamp_span(lo: f64, hi: f64, min: i64, max: i64) -> Option<(i64, i64)> {
    let (fmin, fmax) = (min as f64, max as f64);
    let lo = (lo - LATTICE_EPSILON).ceil().max(fmin);
    let hi = (hi + LATTICE_EPSILON).floor().min(fmax);
    (lo <= hi).then(|| (lo as i64, hi as i64))
}
