//! Robust geometric predicates for collision tests.
//!
//! Orientation is computed with Shewchuk's adaptive precision arithmetic (the
//! `robust` crate), so the segment and containment tests below give exact
//! answers for the integer and fixed-precision coordinates the engine works
//! with.
//!
//! Two segment-intersection variants are provided:
//!
//! - [`segments_intersect_closed`] reports any shared point, including touching
//!   endpoints and collinear overlap. The refinement loop uses it so that no
//!   contact slips through.
//! - [`segments_intersect_open`] reports proper crossings only.
//!
//! ```rust
//! use seqarrange_core::robust::{segments_intersect_closed, segments_intersect_open};
//!
//! // Segments meeting at an endpoint.
//! let (a, b) = ((0.0, 0.0), (1.0, 0.0));
//! let (c, d) = ((1.0, 0.0), (1.0, 1.0));
//! assert!(segments_intersect_closed(a, b, c, d));
//! assert!(!segments_intersect_open(a, b, c, d));
//! ```

use robust::{orient2d as robust_orient2d, Coord};

/// Result of an orientation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Left turn.
    CounterClockwise,
    /// Right turn.
    Clockwise,
    /// On the same line.
    Collinear,
}

impl Orientation {
    /// Returns true if the orientation is counter-clockwise.
    #[inline]
    pub fn is_ccw(self) -> bool {
        matches!(self, Orientation::CounterClockwise)
    }

    /// Returns true if the orientation is clockwise.
    #[inline]
    pub fn is_cw(self) -> bool {
        matches!(self, Orientation::Clockwise)
    }

    /// Returns true if the points are collinear.
    #[inline]
    pub fn is_collinear(self) -> bool {
        matches!(self, Orientation::Collinear)
    }

    fn sign(self) -> i8 {
        match self {
            Orientation::CounterClockwise => 1,
            Orientation::Clockwise => -1,
            Orientation::Collinear => 0,
        }
    }
}

/// Orientation of `pc` relative to the directed line `pa -> pb`.
#[inline]
pub fn orient2d(pa: (f64, f64), pb: (f64, f64), pc: (f64, f64)) -> Orientation {
    let result = robust_orient2d(
        Coord { x: pa.0, y: pa.1 },
        Coord { x: pb.0, y: pb.1 },
        Coord { x: pc.0, y: pc.1 },
    );

    if result > 0.0 {
        Orientation::CounterClockwise
    } else if result < 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

/// Whether `p` lies within the bounding box of `a` and `b`; only meaningful
/// for collinear triples.
fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Tests whether the closed segments `[a, b]` and `[c, d]` share any point.
pub fn segments_intersect_closed(
    a: (f64, f64),
    b: (f64, f64),
    c: (f64, f64),
    d: (f64, f64),
) -> bool {
    let o1 = orient2d(a, b, c);
    let o2 = orient2d(a, b, d);
    let o3 = orient2d(c, d, a);
    let o4 = orient2d(c, d, b);

    if o1.sign() * o2.sign() < 0 && o3.sign() * o4.sign() < 0 {
        return true;
    }

    (o1.is_collinear() && on_segment(a, b, c))
        || (o2.is_collinear() && on_segment(a, b, d))
        || (o3.is_collinear() && on_segment(c, d, a))
        || (o4.is_collinear() && on_segment(c, d, b))
}

/// Tests whether the open segments `(a, b)` and `(c, d)` cross properly.
///
/// Touching at an endpoint and collinear overlap are not crossings.
pub fn segments_intersect_open(
    a: (f64, f64),
    b: (f64, f64),
    c: (f64, f64),
    d: (f64, f64),
) -> bool {
    let o1 = orient2d(a, b, c).sign();
    let o2 = orient2d(a, b, d).sign();
    let o3 = orient2d(c, d, a).sign();
    let o4 = orient2d(c, d, b).sign();

    o1 * o2 < 0 && o3 * o4 < 0
}

/// Tests whether `p` lies inside or on the boundary of a convex CCW polygon.
pub fn point_in_convex_closed(polygon: &[(f64, f64)], p: (f64, f64)) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    (0..polygon.len()).all(|i| {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        !orient2d(a, b, p).is_cw()
    })
}

/// Tests whether `p` lies strictly inside a convex CCW polygon.
pub fn point_in_convex_open(polygon: &[(f64, f64)], p: (f64, f64)) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    (0..polygon.len()).all(|i| {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        orient2d(a, b, p).is_ccw()
    })
}
