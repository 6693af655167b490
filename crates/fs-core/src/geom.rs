//! Planar geometry primitives used by the sweep.

use core::fmt;

use crate::numeric::{MOVE_EPSILON, Real};

/// A point or displacement in the model plane.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2 {
    pub x: Real,
    pub y: Real,
}

impl Point2 {
    pub const ORIGIN: Point2 = Point2 { x: 0.0, y: 0.0 };

    pub const fn new(x: Real, y: Real) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: Real, dy: Real) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_negligible(self) -> bool {
        self.x.abs() <= MOVE_EPSILON && self.y.abs() <= MOVE_EPSILON
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle stored as `(left, bottom, right, top)`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub left: Real,
    pub bottom: Real,
    pub right: Real,
    pub top: Real,
}

impl Rect {
    pub const fn new(left: Real, bottom: Real, right: Real, top: Real) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Build from two arbitrary corners.
    pub fn from_corners(x1: Real, y1: Real, x2: Real, y2: Real) -> Self {
        Self::new(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
    }

    /// Smallest rectangle containing every point, or `None` for no points.
    pub fn from_points<I: IntoIterator<Item = Point2>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            rect.left = rect.left.min(p.x);
            rect.bottom = rect.bottom.min(p.y);
            rect.right = rect.right.max(p.x);
            rect.top = rect.top.max(p.y);
        }
        Some(rect)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.left.min(other.left),
            self.bottom.min(other.bottom),
            self.right.max(other.right),
            self.top.max(other.top),
        )
    }

    /// Union of many rectangles, or `None` when the input is empty.
    pub fn union_all<'a, I: IntoIterator<Item = &'a Rect>>(rects: I) -> Option<Rect> {
        rects
            .into_iter()
            .fold(None, |acc: Option<Rect>, r| match acc {
                Some(u) => Some(u.union(r)),
                None => Some(*r),
            })
    }

    pub fn translated(&self, dx: Real, dy: Real) -> Rect {
        Rect::new(
            self.left + dx,
            self.bottom + dy,
            self.right + dx,
            self.top + dy,
        )
    }

    /// Grow the rectangle by `epsilon` on every side.
    pub fn expanded(&self, epsilon: Real) -> Rect {
        Rect::new(
            self.left - epsilon,
            self.bottom - epsilon,
            self.right + epsilon,
            self.top + epsilon,
        )
    }

    /// Shrink by `inset` on every side; `None` if the rectangle collapses.
    pub fn inset(&self, inset: Real) -> Option<Rect> {
        let r = self.expanded(-inset);
        if r.left >= r.right || r.bottom >= r.top {
            None
        } else {
            Some(r)
        }
    }

    pub fn contains_point(&self, p: Point2) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.bottom && p.y <= self.top
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.bottom >= self.bottom
            && other.top <= self.top
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.left + self.right) / 2.0,
            (self.bottom + self.top) / 2.0,
        )
    }

    pub fn corners(&self) -> [Point2; 4] {
        [
            Point2::new(self.left, self.bottom),
            Point2::new(self.left, self.top),
            Point2::new(self.right, self.top),
            Point2::new(self.right, self.bottom),
        ]
    }

    pub fn approx_eq(&self, other: &Rect, tol: Real) -> bool {
        (self.left - other.left).abs() <= tol
            && (self.bottom - other.bottom).abs() <= tol
            && (self.right - other.right).abs() <= tol
            && (self.top - other.top).abs() <= tol
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.left, self.bottom, self.right, self.top
        )
    }
}

/// Bounding box of a moving group, tracked by translation only.
///
/// The baseline rectangle is captured once; every successful move is added to
/// the cumulative offset. Live geometry is never re-read, so a partially
/// applied or failed move cannot feed back into later selections.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedRect {
    baseline: Rect,
    offset: Point2,
}

impl TrackedRect {
    pub fn new(baseline: Rect) -> Self {
        Self {
            baseline,
            offset: Point2::ORIGIN,
        }
    }

    pub fn baseline(&self) -> Rect {
        self.baseline
    }

    /// Cumulative displacement applied since the baseline.
    pub fn offset(&self) -> Point2 {
        self.offset
    }

    pub fn current(&self) -> Rect {
        self.baseline.translated(self.offset.x, self.offset.y)
    }

    /// Record a move that the host reported as applied.
    pub fn apply(&mut self, dx: Real, dy: Real) {
        self.offset = self.offset.offset(dx, dy);
    }

    /// Delta needed to reach `target` (a displacement from baseline).
    pub fn delta_to(&self, target: Point2) -> Point2 {
        Point2::new(target.x - self.offset.x, target.y - self.offset.y)
    }

    pub fn at_baseline(&self) -> bool {
        self.offset.is_negligible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn union_of_disjoint_rects() {
        let rects = [Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(2.0, 2.0, 3.0, 3.0)];
        let u = Rect::union_all(&rects).unwrap();
        assert_eq!(u, Rect::new(0.0, 0.0, 3.0, 3.0));
        assert!(Rect::union_all(&Vec::<Rect>::new()).is_none());
    }

    #[test]
    fn from_corners_normalises_order() {
        let r = Rect::from_corners(3.0, 1.0, -1.0, 4.0);
        assert_eq!(r, Rect::new(-1.0, 1.0, 3.0, 4.0));
    }

    #[test]
    fn inset_collapses() {
        let r = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert!(r.inset(0.25).is_some());
        assert!(r.inset(0.5).is_none());
    }

    #[test]
    fn tracked_rect_follows_applied_moves() {
        let mut t = TrackedRect::new(Rect::new(0.0, 0.0, 1.0, 2.0));
        t.apply(0.5, 0.0);
        t.apply(0.5, -1.0);
        assert_eq!(t.offset(), Point2::new(1.0, -1.0));
        assert_eq!(t.current(), Rect::new(1.0, -1.0, 2.0, 1.0));
        assert_eq!(t.delta_to(Point2::new(3.0, 0.0)), Point2::new(2.0, 1.0));
        assert!(!t.at_baseline());
    }

    proptest! {
        #[test]
        fn tracked_rect_round_trip(
            dx in -1.0e3..1.0e3f64,
            dy in -1.0e3..1.0e3f64,
            l in -10.0..10.0f64,
            b in -10.0..10.0f64,
        ) {
            let base = Rect::new(l, b, l + 1.0, b + 2.0);
            let mut t = TrackedRect::new(base);
            t.apply(dx, dy);
            t.apply(-dx, -dy);
            prop_assert!(t.current().approx_eq(&base, 1e-9));
            prop_assert!(t.at_baseline());
        }
    }
}
