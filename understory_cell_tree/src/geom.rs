// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small rectangle helpers shared by the layout and the clustering engine.
//!
//! All predicates here are closed: rectangles sharing only an edge or a corner
//! touch, and their overlap is a zero-width (or zero-area) rectangle.

use kurbo::{Affine, Point, Rect};
use understory_scan::Aabb2D;

/// Coefficient magnitude below which an affine term counts as zero.
const AXIS_EPSILON: f64 = 1e-12;

/// Transform an axis-aligned `Rect` by an `Affine` and return a conservative
/// axis-aligned bounding box.
pub fn transform_rect_bbox(affine: Affine, rect: Rect) -> Rect {
    let p0 = affine * Point::new(rect.x0, rect.y0);
    let p1 = affine * Point::new(rect.x1, rect.y0);
    let p2 = affine * Point::new(rect.x0, rect.y1);
    let p3 = affine * Point::new(rect.x1, rect.y1);
    let min_x = p0.x.min(p1.x).min(p2.x).min(p3.x);
    let min_y = p0.y.min(p1.y).min(p2.y).min(p3.y);
    let max_x = p0.x.max(p1.x).max(p2.x).max(p3.x);
    let max_y = p0.y.max(p1.y).max(p2.y).max(p3.y);
    Rect::new(min_x, min_y, max_x, max_y)
}

/// Whether two (normalized) rectangles share at least one point.
pub fn rect_touches(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// The closed intersection of two rectangles, or `None` if they do not touch.
pub fn rect_overlap(a: Rect, b: Rect) -> Option<Rect> {
    let r = Rect::new(a.x0.max(b.x0), a.y0.max(b.y0), a.x1.min(b.x1), a.y1.min(b.y1));
    (r.x0 <= r.x1 && r.y0 <= r.y1).then_some(r)
}

/// Extend an optional accumulated box by `r`.
pub fn union_bbox(acc: Option<Rect>, r: Rect) -> Option<Rect> {
    Some(match acc {
        Some(a) => a.union(r),
        None => r,
    })
}

/// Whether `affine` maps axis-aligned boxes onto axis-aligned boxes.
///
/// True for translations, scales, mirrors and multiples of 90° rotations.
pub fn preserves_axes(affine: Affine) -> bool {
    let [a, b, c, d, _, _] = affine.as_coeffs();
    (b.abs() <= AXIS_EPSILON && c.abs() <= AXIS_EPSILON)
        || (a.abs() <= AXIS_EPSILON && d.abs() <= AXIS_EPSILON)
}

/// Convert a `Rect` into the scan crate's box type.
pub fn rect_to_aabb(r: Rect) -> Aabb2D<f64> {
    Aabb2D::new(r.x0, r.y0, r.x1, r.y1)
}
