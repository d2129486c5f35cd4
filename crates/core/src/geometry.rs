//! Integer polygon geometry.
//!
//! Coordinates are `i64` in either application units (slicer scale) or solver
//! units; the type does not carry the unit. Polygons are stored without a
//! closing duplicate vertex and are expected to be counter-clockwise after
//! [`Polygon::make_ccw`].

use std::ops::{Add, Neg, Sub};

use geo::{ConvexHull, MultiPoint, Point as GeoPoint};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of an object to be printed.
pub type ObjectId = i32;

/// Integer coordinate.
pub type Coord = i64;

/// A 2D point with integer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    /// X coordinate.
    pub x: Coord,
    /// Y coordinate.
    pub y: Coord,
}

impl Point {
    /// Creates a new point.
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Converts to a floating-point tuple.
    #[inline]
    pub fn as_f64(self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }

    /// Cross product of two vectors, widened to avoid overflow.
    #[inline]
    pub fn cross(self, other: Point) -> i128 {
        self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Axis-aligned bounding box with inclusive corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    /// Lower-left corner.
    pub min: Point,
    /// Upper-right corner.
    pub max: Point,
}

impl BoundingBox {
    /// Creates a bounding box from its corners.
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all points, or `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bbox = Self::new(first, first);
        for p in iter {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    /// Width along X.
    pub fn width(&self) -> Coord {
        self.max.x - self.min.x
    }

    /// Height along Y.
    pub fn height(&self) -> Coord {
        self.max.y - self.min.y
    }

    /// Area, widened.
    pub fn area(&self) -> i128 {
        self.width() as i128 * self.height() as i128
    }

    /// Returns true if `other` lies entirely within this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// The box as a CCW rectangle polygon.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::rectangle(self.min, self.max)
    }
}

/// A simple polygon given by its vertices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon from its vertices; a trailing duplicate of the first
    /// vertex is dropped.
    pub fn new(mut points: Vec<Point>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    /// Creates a polygon from coordinate pairs.
    pub fn from_coords(coords: &[(Coord, Coord)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    /// Axis-aligned CCW rectangle with the given corners.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self {
            points: vec![
                Point::new(min.x, min.y),
                Point::new(max.x, min.y),
                Point::new(max.x, max.y),
                Point::new(min.x, max.y),
            ],
        }
    }

    /// Vertices in order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns true if the polygon has fewer than three vertices or zero area.
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3 || self.signed_area2() == 0
    }

    /// Twice the signed area; positive for CCW orientation.
    pub fn signed_area2(&self) -> i128 {
        let n = self.points.len();
        (0..n)
            .map(|i| self.points[i].cross(self.points[(i + 1) % n]))
            .sum()
    }

    /// Unsigned area.
    pub fn area(&self) -> f64 {
        (self.signed_area2() as f64 / 2.0).abs()
    }

    /// Returns true if the vertices run counter-clockwise.
    pub fn is_ccw(&self) -> bool {
        self.signed_area2() > 0
    }

    /// Reverses the vertex order if the polygon is clockwise.
    pub fn make_ccw(&mut self) {
        if self.signed_area2() < 0 {
            self.points.reverse();
        }
    }

    /// Returns true if the polygon is convex (collinear vertices allowed).
    pub fn is_convex(&self) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut sign = 0i128;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let c = self.points[(i + 2) % n];
            let turn = (b - a).cross(c - b).signum();
            if turn != 0 {
                if sign != 0 && turn != sign {
                    return false;
                }
                sign = turn;
            }
        }
        sign != 0
    }

    /// Bounding box, or `None` if the polygon is empty.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }

    /// Directed edges `(points[i], points[i + 1])`, wrapping around.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Outward normal of edge `i` for a CCW polygon.
    pub fn edge_normal(&self, i: usize) -> Point {
        let n = self.points.len();
        let d = self.points[(i + 1) % n] - self.points[i];
        Point::new(d.y, -d.x)
    }

    /// Polygon translated by `offset`.
    pub fn translated(&self, offset: Point) -> Polygon {
        Polygon {
            points: self.points.iter().map(|&p| p + offset).collect(),
        }
    }

    /// Divides every coordinate by `factor`, rounding to nearest.
    pub fn scaled_down(&self, factor: Coord) -> Polygon {
        let f = factor as f64;
        Polygon {
            points: self
                .points
                .iter()
                .map(|p| Point::new((p.x as f64 / f).round() as Coord, (p.y as f64 / f).round() as Coord))
                .collect(),
        }
    }

    /// Multiplies every coordinate by `factor`.
    pub fn scaled_up(&self, factor: Coord) -> Polygon {
        Polygon {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x * factor, p.y * factor))
                .collect(),
        }
    }

    /// Returns true if `p` is inside or on the boundary of this convex CCW polygon.
    pub fn convex_contains_point(&self, p: Point) -> bool {
        self.points.len() >= 3 && self.edges().all(|(a, b)| (b - a).cross(p - a) >= 0)
    }

    /// Returns true if every vertex of `other` lies within this convex CCW polygon.
    pub fn convex_contains(&self, other: &Polygon) -> bool {
        !other.is_empty() && other.points.iter().all(|&p| self.convex_contains_point(p))
    }

    /// Minkowski sum of two convex polygons.
    pub fn minkowski_sum(&self, other: &Polygon) -> Polygon {
        let sums: Vec<Point> = self
            .points
            .iter()
            .flat_map(|&a| other.points.iter().map(move |&b| a + b))
            .collect();
        convex_hull(&sums)
    }

    /// Sum of the bounding boxes of two polygons, as a rectangle.
    pub fn bounding_box_sum(&self, other: &Polygon) -> Option<Polygon> {
        let a = self.bounding_box()?;
        let b = other.bounding_box()?;
        Some(Polygon::rectangle(a.min + b.min, a.max + b.max))
    }
}

/// Convex hull of a point set as a CCW polygon without collinear vertices.
pub fn convex_hull(points: &[Point]) -> Polygon {
    if points.is_empty() {
        return Polygon::default();
    }
    let multi: MultiPoint<f64> = points
        .iter()
        .map(|p| GeoPoint::new(p.x as f64, p.y as f64))
        .collect::<Vec<_>>()
        .into();
    let hull = multi.convex_hull();

    let mut vertices: Vec<Point> = Vec::with_capacity(hull.exterior().0.len());
    for c in hull.exterior().coords() {
        let p = Point::new(c.x.round() as Coord, c.y.round() as Coord);
        if vertices.last() != Some(&p) {
            vertices.push(p);
        }
    }
    let mut polygon = Polygon::new(vertices);
    polygon.make_ccw();
    polygon.drop_collinear();
    polygon
}

impl Polygon {
    fn drop_collinear(&mut self) {
        if self.points.len() < 3 {
            return;
        }
        let mut i = 0;
        while self.points.len() > 3 && i < self.points.len() {
            let n = self.points.len();
            let prev = self.points[(i + n - 1) % n];
            let next = self.points[(i + 1) % n];
            if (self.points[i] - prev).cross(next - self.points[i]) == 0 {
                self.points.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

/// Convex hull of the union of several polygons.
pub fn convex_hull_of(polygons: &[Polygon]) -> Polygon {
    let points: Vec<Point> = polygons.iter().flat_map(|p| p.points.iter().copied()).collect();
    convex_hull(&points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: Coord) -> Polygon {
        Polygon::rectangle(Point::new(0, 0), Point::new(size, size))
    }

    #[test]
    fn test_closing_vertex_dropped() {
        let p = Polygon::from_coords(&[(0, 0), (1, 0), (1, 1), (0, 0)]);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn test_area_and_orientation() {
        let mut p = Polygon::from_coords(&[(0, 0), (0, 10), (10, 10), (10, 0)]);
        assert!(!p.is_ccw());
        assert_relative_eq!(p.area(), 100.0);
        p.make_ccw();
        assert!(p.is_ccw());
        assert_eq!(p.signed_area2(), 200);
    }

    #[test]
    fn test_bounding_box() {
        let p = Polygon::from_coords(&[(-5, 2), (7, -3), (1, 9)]);
        let bbox = p.bounding_box().unwrap();
        assert_eq!(bbox.min, Point::new(-5, -3));
        assert_eq!(bbox.max, Point::new(7, 9));
        assert_eq!(bbox.width(), 12);
        assert_eq!(bbox.height(), 12);
        assert!(Polygon::default().bounding_box().is_none());
    }

    #[test]
    fn test_convexity() {
        assert!(square(4).is_convex());
        let l_shape = Polygon::from_coords(&[(0, 0), (4, 0), (4, 2), (2, 2), (2, 4), (0, 4)]);
        assert!(!l_shape.is_convex());
    }

    #[test]
    fn test_edge_normal_points_outward() {
        let sq = square(4);
        assert_eq!(sq.edge_normal(0), Point::new(0, -4));
        assert_eq!(sq.edge_normal(1), Point::new(4, 0));
    }

    #[test]
    fn test_convex_hull() {
        let pts = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(5, 5),
            Point::new(10, 10),
            Point::new(0, 10),
            Point::new(5, 0),
        ];
        let hull = convex_hull(&pts);
        assert!(hull.is_ccw());
        assert_eq!(hull.len(), 4);
        assert_relative_eq!(hull.area(), 100.0);
    }

    #[test]
    fn test_minkowski_sum_of_squares() {
        let a = square(10);
        let b = Polygon::rectangle(Point::new(-1, -1), Point::new(1, 1));
        let sum = a.minkowski_sum(&b);
        let bbox = sum.bounding_box().unwrap();
        assert_eq!(bbox.min, Point::new(-1, -1));
        assert_eq!(bbox.max, Point::new(11, 11));
        assert_relative_eq!(sum.area(), 144.0);
    }

    #[test]
    fn test_bounding_box_sum() {
        let a = Polygon::from_coords(&[(0, 0), (4, 1), (2, 3)]);
        let b = Polygon::rectangle(Point::new(-10, -1), Point::new(10, 1));
        let sum = a.bounding_box_sum(&b).unwrap();
        assert_eq!(sum.bounding_box().unwrap().min, Point::new(-10, -1));
        assert_eq!(sum.bounding_box().unwrap().max, Point::new(14, 4));
    }

    #[test]
    fn test_containment() {
        let outer = square(10);
        let inner = Polygon::rectangle(Point::new(2, 2), Point::new(8, 8));
        assert!(outer.convex_contains(&inner));
        assert!(!inner.convex_contains(&outer));
        assert!(outer.convex_contains_point(Point::new(10, 5)));
    }

    #[test]
    fn test_scaling() {
        let p = Polygon::from_coords(&[(150_000, -250_000), (340_000, 0), (0, 99_999)]);
        let down = p.scaled_down(100_000);
        assert_eq!(
            down.points(),
            &[Point::new(2, -3), Point::new(3, 0), Point::new(0, 1)]
        );
        assert_eq!(down.scaled_up(10).points()[0], Point::new(20, -30));
    }
}
