//! Objects and printer descriptions.

use std::collections::{BTreeMap, BTreeSet};

use seqarrange_core::{BoundingBox, Coord, ObjectId, Polygon};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Swept-volume description of a printer, in application units.
///
/// Each height present in `extruder_slices` is either a convex height (the
/// unreachable zone is the Minkowski sum of the object slice with the
/// hardware polygons) or a box height (the zone is the sum of bounding
/// boxes, used for gantry-like parts spanning the whole plate).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrinterGeometry {
    /// Plate outline.
    pub plate: Polygon,
    /// Heights handled by Minkowski sums.
    pub convex_heights: BTreeSet<Coord>,
    /// Heights handled by bounding-box sums.
    pub box_heights: BTreeSet<Coord>,
    /// Hardware cross-sections per height, relative to the nozzle.
    pub extruder_slices: BTreeMap<Coord, Vec<Polygon>>,
}

impl PrinterGeometry {
    /// Creates a printer geometry with the given plate and no slices.
    pub fn new(plate: Polygon) -> Self {
        Self {
            plate,
            ..Default::default()
        }
    }

    /// Adds hardware polygons handled by Minkowski sums at `height`.
    pub fn with_convex_slice(mut self, height: Coord, polygons: Vec<Polygon>) -> Self {
        self.convex_heights.insert(height);
        self.extruder_slices.entry(height).or_default().extend(polygons);
        self
    }

    /// Adds hardware polygons handled by bounding-box sums at `height`.
    pub fn with_box_slice(mut self, height: Coord, polygons: Vec<Polygon>) -> Self {
        self.box_heights.insert(height);
        self.extruder_slices.entry(height).or_default().extend(polygons);
        self
    }

    /// Hardware polygons at `height`.
    pub fn slices_at(&self, height: Coord) -> &[Polygon] {
        self.extruder_slices
            .get(&height)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// An object as delivered by the slicer, in application units.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectToPrint {
    /// Object identifier.
    pub id: ObjectId,
    /// Must be printed right before the next object in the list.
    pub glued_to_next: bool,
    /// Total object height.
    pub total_height: Coord,
    /// Object cross-section at each printer slice height.
    pub pgns_at_height: Vec<(Coord, Polygon)>,
}

impl ObjectToPrint {
    /// Creates an unglued object.
    pub fn new(id: ObjectId, total_height: Coord, pgns_at_height: Vec<(Coord, Polygon)>) -> Self {
        Self {
            id,
            glued_to_next: false,
            total_height,
            pgns_at_height,
        }
    }

    /// Marks the object as glued to the next one.
    pub fn glued(mut self, glued_to_next: bool) -> Self {
        self.glued_to_next = glued_to_next;
        self
    }
}

/// An object prepared for solving, in solver units.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolvableObject {
    /// Object identifier.
    pub id: ObjectId,
    /// Convex footprint, counter-clockwise, relative to the object origin.
    pub polygon: Polygon,
    /// Hardware no-go zones by increasing height, counter-clockwise.
    pub unreachable_polygons: Vec<Polygon>,
    /// Must be printed right before the next object in the list.
    pub glued_to_next: bool,
}

impl SolvableObject {
    /// Creates an object without unreachable zones.
    pub fn new(id: ObjectId, mut polygon: Polygon) -> Self {
        polygon.make_ccw();
        Self {
            id,
            polygon,
            unreachable_polygons: Vec::new(),
            glued_to_next: false,
        }
    }

    /// Sets the unreachable zones.
    pub fn with_unreachable(mut self, polygons: Vec<Polygon>) -> Self {
        self.unreachable_polygons = polygons
            .into_iter()
            .filter(|p| !p.is_degenerate())
            .map(|mut p| {
                p.make_ccw();
                p
            })
            .collect();
        self
    }

    /// Marks the object as glued to the next one.
    pub fn glued(mut self, glued_to_next: bool) -> Self {
        self.glued_to_next = glued_to_next;
        self
    }

    /// Footprint area.
    pub fn area(&self) -> f64 {
        self.polygon.area()
    }

    /// Footprint extents relative to the origin.
    pub fn extents(&self) -> Option<BoundingBox> {
        self.polygon.bounding_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqarrange_core::Point;

    #[test]
    fn test_solvable_object_normalizes_orientation() {
        let cw = Polygon::from_coords(&[(0, 0), (0, 10), (10, 10), (10, 0)]);
        let obj = SolvableObject::new(1, cw.clone()).with_unreachable(vec![
            cw,
            Polygon::from_coords(&[(0, 0), (1, 1)]),
        ]);
        assert!(obj.polygon.is_ccw());
        assert_eq!(obj.unreachable_polygons.len(), 1);
        assert!(obj.unreachable_polygons[0].is_ccw());
        assert_eq!(obj.extents().unwrap().max, Point::new(10, 10));
    }

    #[test]
    fn test_printer_geometry_slices() {
        let nozzle = Polygon::rectangle(Point::new(-5, -5), Point::new(5, 5));
        let gantry = Polygon::rectangle(Point::new(-100, -2), Point::new(100, 2));
        let printer = PrinterGeometry::new(Polygon::rectangle(Point::new(0, 0), Point::new(50, 50)))
            .with_convex_slice(0, vec![nozzle.clone()])
            .with_box_slice(30, vec![gantry]);
        assert!(printer.convex_heights.contains(&0));
        assert!(printer.box_heights.contains(&30));
        assert_eq!(printer.slices_at(0), &[nozzle]);
        assert!(printer.slices_at(7).is_empty());
    }
}
