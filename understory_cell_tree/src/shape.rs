// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable shape values: axis-aligned boxes and simple polygons.

use std::sync::Arc;

use kurbo::{Affine, Point, Rect, Vec2};

use crate::geom::{preserves_axes, rect_touches, transform_rect_bbox};

/// Absolute distance below which two pieces of geometry are considered to touch.
///
/// Collinearity tests scale this by the length of the edge being tested, so the
/// tolerance is a distance, not an area.
pub const INTERACTION_TOLERANCE: f64 = 1e-9;

/// A simple polygon given by its vertices; the closing edge is implicit.
///
/// Vertex storage is shared, so cloning a polygon is cheap.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    points: Arc<[Point]>,
}

impl Polygon {
    /// Create a polygon from its vertices.
    pub fn new(points: impl IntoIterator<Item = Point>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    /// The polygon's vertices.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Bounding box of the vertices; `Rect::ZERO` for a polygon without points.
    pub fn bbox(&self) -> Rect {
        let mut it = self.points.iter();
        let Some(first) = it.next() else {
            return Rect::ZERO;
        };
        it.fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
    }

    /// Signed area (positive for counter-clockwise vertices in a y-up frame).
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                p.x * q.y - q.x * p.y
            })
            .sum();
        0.5 * twice
    }

    /// The polygon with every vertex mapped through `affine`.
    pub fn transformed(&self, affine: Affine) -> Self {
        Self::new(self.points.iter().map(|p| affine * *p))
    }
}

/// A piece of layout geometry.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Axis-aligned box.
    Box(Rect),
    /// Simple polygon.
    Polygon(Polygon),
}

impl From<Rect> for Shape {
    fn from(r: Rect) -> Self {
        Self::Box(r.abs())
    }
}

impl From<Polygon> for Shape {
    fn from(p: Polygon) -> Self {
        Self::Polygon(p)
    }
}

impl Shape {
    /// Bounding box in the shape's own frame.
    pub fn bbox(&self) -> Rect {
        match self {
            Self::Box(r) => *r,
            Self::Polygon(p) => p.bbox(),
        }
    }

    /// True for [`Shape::Box`].
    pub fn is_box(&self) -> bool {
        matches!(self, Self::Box(_))
    }

    /// The box, if this shape is one.
    pub fn as_box(&self) -> Option<Rect> {
        match self {
            Self::Box(r) => Some(*r),
            Self::Polygon(_) => None,
        }
    }

    /// Zero-area boxes and polygons with fewer than three vertices or zero area.
    ///
    /// Degenerate shapes still take part in clustering.
    pub fn is_degenerate(&self) -> bool {
        match self {
            Self::Box(r) => r.width() == 0.0 || r.height() == 0.0,
            Self::Polygon(p) => p.points().len() < 3 || p.area() == 0.0,
        }
    }

    /// This shape mapped through `affine`.
    ///
    /// Boxes stay boxes under axis-preserving transforms and become polygons
    /// otherwise.
    pub fn transformed(&self, affine: Affine) -> Self {
        match self {
            Self::Box(r) if preserves_axes(affine) => Self::Box(transform_rect_bbox(affine, *r)),
            Self::Box(r) => Self::Polygon(Polygon::new(
                box_corners(*r).into_iter().map(|p| affine * p),
            )),
            Self::Polygon(p) => Self::Polygon(p.transformed(affine)),
        }
    }

    /// Whether this shape and `other` mapped through `trans` share a point.
    ///
    /// Touching boundaries count as interaction.
    pub fn interacts(&self, other: &Self, trans: Affine) -> bool {
        if let (Self::Box(a), Self::Box(b)) = (self, other)
            && preserves_axes(trans)
        {
            let a = a.inflate(INTERACTION_TOLERANCE, INTERACTION_TOLERANCE);
            return rect_touches(a, transform_rect_bbox(trans, *b));
        }

        let pa = self.vertices(Affine::IDENTITY);
        let pb = other.vertices(trans);
        if pa.is_empty() || pb.is_empty() {
            return false;
        }
        let ba = bounds_of(&pa).inflate(INTERACTION_TOLERANCE, INTERACTION_TOLERANCE);
        let bb = bounds_of(&pb);
        if !rect_touches(ba, bb) {
            return false;
        }

        for (a0, a1) in edges(&pa) {
            for (b0, b1) in edges(&pb) {
                if segments_touch(a0, a1, b0, b1) {
                    return true;
                }
            }
        }
        contains_point(&pa, pb[0]) || contains_point(&pb, pa[0])
    }

    fn vertices(&self, affine: Affine) -> Vec<Point> {
        match self {
            Self::Box(r) => box_corners(*r).into_iter().map(|p| affine * p).collect(),
            Self::Polygon(p) => p.points().iter().map(|q| affine * *q).collect(),
        }
    }
}

fn box_corners(r: Rect) -> [Point; 4] {
    [
        Point::new(r.x0, r.y0),
        Point::new(r.x1, r.y0),
        Point::new(r.x1, r.y1),
        Point::new(r.x0, r.y1),
    ]
}

fn bounds_of(points: &[Point]) -> Rect {
    points
        .iter()
        .fold(Rect::from_points(points[0], points[0]), |r, p| r.union_pt(*p))
}

/// Closed edge list; a single point yields one zero-length edge.
fn edges(points: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = points.len();
    let count = match n {
        0 => 0,
        1 | 2 => 1,
        _ => n,
    };
    (0..count).map(move |i| (points[i], points[(i + 1) % n]))
}

/// Side of `c` relative to the line `a -> b`: `0` when within tolerance.
fn orient(a: Point, b: Point, c: Point) -> i8 {
    let ab: Vec2 = b - a;
    let cross = ab.cross(c - a);
    if cross.abs() <= INTERACTION_TOLERANCE * ab.hypot() {
        0
    } else if cross > 0.0 {
        1
    } else {
        -1
    }
}

fn within_span(a: Point, b: Point, p: Point) -> bool {
    let t = INTERACTION_TOLERANCE;
    p.x >= a.x.min(b.x) - t
        && p.x <= a.x.max(b.x) + t
        && p.y >= a.y.min(b.y) - t
        && p.y <= a.y.max(b.y) + t
}

fn segments_touch(p0: Point, p1: Point, q0: Point, q1: Point) -> bool {
    let o1 = orient(p0, p1, q0);
    let o2 = orient(p0, p1, q1);
    let o3 = orient(q0, q1, p0);
    let o4 = orient(q0, q1, p1);
    if o1 * o2 < 0 && o3 * o4 < 0 {
        return true;
    }
    (o1 == 0 && within_span(p0, p1, q0))
        || (o2 == 0 && within_span(p0, p1, q1))
        || (o3 == 0 && within_span(q0, q1, p0))
        || (o4 == 0 && within_span(q0, q1, p1))
}

/// Even-odd containment of `p` in the closed polygon `poly` (interior only;
/// boundary hits are found by the edge test).
fn contains_point(poly: &[Point], p: Point) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
