//! Conversion of printer profiles and slicer objects into solver input.
//!
//! Everything arriving here is in application units; everything leaving is
//! in solver units (`1 / SCALE_FACTOR` of the input). Each object slice is
//! reduced to its convex hull, which always contains the original, so
//! separation proven for the hulls holds for the real slices.

use seqarrange_core::{convex_hull, Coord, Error, Polygon, Rational, Result};

use crate::config::{PlateBounds, SolverConfiguration, SCALE_FACTOR};
use crate::object::{ObjectToPrint, PrinterGeometry, SolvableObject};

/// Converts a printer plate outline into solver-unit plate bounds.
///
/// A plate whose area equals its bounding-box area is treated as a box,
/// anything else as a convex bounding polygon.
pub fn convert_geometry_to_plate_bounds(printer_geometry: &PrinterGeometry) -> Result<PlateBounds> {
    let mut plate = printer_geometry.plate.clone();
    if plate.is_degenerate() {
        return Err(Error::UnsupportedConfiguration(
            "printer plate outline is empty or degenerate".into(),
        ));
    }
    plate.make_ccw();

    let bbox = plate
        .bounding_box()
        .ok_or_else(|| Error::UnsupportedConfiguration("printer plate outline is empty".into()))?;
    if plate.signed_area2() == 2 * bbox.area() {
        let scaled = bbox.to_polygon().scaled_down(SCALE_FACTOR);
        let scaled_box = scaled
            .bounding_box()
            .ok_or_else(|| Error::UnsupportedConfiguration("printer plate outline is empty".into()))?;
        return Ok(PlateBounds::Box(scaled_box));
    }

    if !plate.is_convex() {
        return Err(Error::UnsupportedConfiguration(
            "printer plate outline must be convex".into(),
        ));
    }
    let mut scaled = plate.scaled_down(SCALE_FACTOR);
    scaled.make_ccw();
    Ok(PlateBounds::Polygon(scaled))
}

/// Scales an application-unit polygon to solver units, counter-clockwise.
pub fn scale_down_polygon(polygon: &Polygon) -> Polygon {
    let mut scaled = polygon.scaled_down(SCALE_FACTOR);
    scaled.make_ccw();
    scaled
}

/// Exact solver-unit value of an application-unit coordinate.
pub fn scale_down_coordinate(value: Coord) -> Rational {
    Rational::new(value, SCALE_FACTOR).unwrap_or(Rational::ZERO)
}

/// Checks that an application-unit polygon fits the plate extents.
pub fn check_polygon_size_fit_to_plate(polygon: &Polygon, plate: &PlateBounds) -> bool {
    let Some(extents) = polygon.bounding_box() else {
        return true;
    };
    let plate_box = plate.bounding_box();
    extents.width() <= plate_box.width() * SCALE_FACTOR
        && extents.height() <= plate_box.height() * SCALE_FACTOR
}

/// Drops levels whose polygons are all contained in polygons of another
/// level; such levels add constraints without excluding anything.
pub fn simplify_unreachable_zone_polygons(levels: Vec<Vec<Polygon>>) -> Vec<Vec<Polygon>> {
    let n = levels.len();
    let mut removed = vec![false; n];

    for i in 0..n {
        if levels[i].is_empty() {
            removed[i] = true;
            continue;
        }
        let consumed = (0..n).any(|j| {
            j != i
                && !removed[j]
                && levels[i]
                    .iter()
                    .all(|inner| levels[j].iter().any(|outer| outer.convex_contains(inner)))
        });
        if consumed {
            log::debug!("Unreachable zone level {} consumed by another level", i);
            removed[i] = true;
        }
    }

    levels
        .into_iter()
        .zip(removed)
        .filter(|(_, gone)| !gone)
        .map(|(level, _)| level)
        .collect()
}

/// Prepares one slicer object for solving.
pub fn prepare_solvable_object(
    config: &SolverConfiguration,
    printer_geometry: &PrinterGeometry,
    object: &ObjectToPrint,
) -> Result<SolvableObject> {
    let mut slices: Vec<&(Coord, Polygon)> = object.pgns_at_height.iter().collect();
    slices.sort_by_key(|(height, _)| *height);

    let mut footprint: Option<Polygon> = None;
    let mut levels: Vec<Vec<Polygon>> = Vec::with_capacity(slices.len());

    for (height, slice) in slices {
        if slice.is_empty() {
            continue;
        }
        let hull = convex_hull(slice.points());
        if !check_polygon_size_fit_to_plate(&hull, &config.plate) {
            return Err(Error::ObjectTooLarge { id: object.id });
        }

        let hardware = printer_geometry.slices_at(*height);
        if printer_geometry.convex_heights.contains(height) {
            if footprint.is_none() {
                footprint = Some(hull.clone());
            }
            levels.push(hardware.iter().map(|h| hull.minkowski_sum(h)).collect());
        } else if printer_geometry.box_heights.contains(height) {
            levels.push(
                hardware
                    .iter()
                    .filter_map(|h| hull.bounding_box_sum(h))
                    .collect(),
            );
        } else {
            return Err(Error::UnsupportedConfiguration(format!(
                "object {} has a slice at height {} which the printer does not describe",
                object.id, height
            )));
        }
    }

    let footprint = footprint.ok_or_else(|| {
        Error::UnsupportedConfiguration(format!(
            "object {} has no slice at a convex printer height",
            object.id
        ))
    })?;
    let polygon = scale_down_polygon(&footprint);
    if polygon.is_degenerate() {
        return Err(Error::InvalidGeometry(format!(
            "footprint of object {} vanishes in solver units",
            object.id
        )));
    }

    let unreachable: Vec<Polygon> = simplify_unreachable_zone_polygons(levels)
        .into_iter()
        .flatten()
        .map(|p| scale_down_polygon(&p))
        .collect();

    Ok(SolvableObject::new(object.id, polygon)
        .with_unreachable(unreachable)
        .glued(object.glued_to_next))
}

/// Prepares every object, failing on the first invalid one.
pub fn prepare_solvable_objects(
    config: &SolverConfiguration,
    printer_geometry: &PrinterGeometry,
    objects: &[ObjectToPrint],
) -> Result<Vec<SolvableObject>> {
    objects
        .iter()
        .map(|object| prepare_solvable_object(config, printer_geometry, object))
        .collect()
}

/// Total footprint area of a set of objects.
pub fn calc_polygon_area(objects: &[SolvableObject]) -> f64 {
    objects.iter().map(SolvableObject::area).sum()
}

/// Area of the largest unreachable zone of an object, or its footprint area
/// if it has none.
pub fn calc_polygon_unreachable_zone_area(object: &SolvableObject) -> f64 {
    object
        .unreachable_polygons
        .iter()
        .map(Polygon::area)
        .fold(object.area(), f64::max)
}
