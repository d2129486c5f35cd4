//! Sequential printability checks for given schedules.
//!
//! A schedule is printable if no object printed earlier on a plate touches an
//! unreachable zone of an object printed later on the same plate. The check
//! works on the same prepared polygons as the scheduler: closed
//! point-in-polygon tests in both directions, plus proper edge crossings.

use std::collections::HashMap;

use seqarrange_core::robust::{point_in_convex_closed, segments_intersect_open};
use seqarrange_core::{Error, ObjectId, Point, Polygon, Result, ScheduledPlate};

use crate::config::{SolverConfiguration, GROUND_PRESENCE_TIME};
use crate::object::{ObjectToPrint, PrinterGeometry, SolvableObject};
use crate::preprocess::{convert_geometry_to_plate_bounds, prepare_solvable_object, scale_down_coordinate};

/// An object placed for checking, in solver units.
#[derive(Debug, Clone)]
pub struct CheckedObject<'a> {
    /// Prepared object.
    pub object: &'a SolvableObject,
    /// Offset in solver units.
    pub position: (f64, f64),
    /// Schedule time.
    pub t: i64,
}

fn placed(polygon: &Polygon, (dx, dy): (f64, f64)) -> Vec<(f64, f64)> {
    polygon
        .points()
        .iter()
        .map(|p: &Point| (p.x as f64 + dx, p.y as f64 + dy))
        .collect()
}

fn edges(points: &[(f64, f64)]) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
    (0..points.len()).map(move |i| (points[i], points[(i + 1) % points.len()]))
}

/// Whether the footprint `earlier` reaches into any zone of `later`.
pub fn objects_conflict(earlier: &CheckedObject<'_>, later: &CheckedObject<'_>) -> bool {
    let footprint = placed(&earlier.object.polygon, earlier.position);

    later.object.unreachable_polygons.iter().any(|zone| {
        let zone = placed(zone, later.position);
        footprint.iter().any(|&v| point_in_convex_closed(&zone, v))
            || zone.iter().any(|&v| point_in_convex_closed(&footprint, v))
            || edges(&footprint).any(|(a, b)| edges(&zone).any(|(c, d)| segments_intersect_open(a, b, c, d)))
    })
}

/// First conflicting `(earlier, later)` pair of a plate, by time.
pub fn plate_conflict(objects: &[CheckedObject<'_>]) -> Option<(ObjectId, ObjectId)> {
    let mut order: Vec<&CheckedObject<'_>> = objects.iter().collect();
    order.sort_by_key(|o| o.t);
    for (i, earlier) in order.iter().enumerate() {
        for later in &order[i + 1..] {
            if objects_conflict(earlier, later) {
                return Some((earlier.object.id, later.object.id));
            }
        }
    }
    None
}

/// Schedule time of the `k`-th object of a plate.
pub fn plate_time(config: &SolverConfiguration, k: usize) -> i64 {
    GROUND_PRESENCE_TIME + (k as i64 + 1) * 2 * config.temporal_spread * config.object_group_size as i64
}

/// Finds the first pair of objects on a plate where the earlier one collides
/// with the later one's unreachable zones. Plates are in application units and
/// in print order.
///
/// # Errors
///
/// Returns [`Error::UnsupportedConfiguration`] if a plate names an object that
/// is not in `objects`, and any error of object preparation.
pub fn check_scheduled_objects_for_sequential_conflict(
    config: &SolverConfiguration,
    printer_geometry: &PrinterGeometry,
    objects: &[ObjectToPrint],
    plates: &[ScheduledPlate],
) -> Result<Option<(ObjectId, ObjectId)>> {
    let config = config.clone().with_plate(convert_geometry_to_plate_bounds(printer_geometry)?);
    let prepared: HashMap<ObjectId, SolvableObject> = objects
        .iter()
        .map(|o| Ok((o.id, prepare_solvable_object(&config, printer_geometry, o)?)))
        .collect::<Result<_>>()?;

    for plate in plates {
        let checked = plate
            .scheduled_objects
            .iter()
            .enumerate()
            .map(|(k, s)| {
                let object = prepared.get(&s.id).ok_or_else(|| {
                    Error::UnsupportedConfiguration(format!("scheduled object {} is unknown", s.id))
                })?;
                Ok(CheckedObject {
                    object,
                    position: (scale_down_coordinate(s.x).as_f64(), scale_down_coordinate(s.y).as_f64()),
                    t: plate_time(&config, k),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(conflict) = plate_conflict(&checked) {
            log::debug!("Objects {} and {} conflict", conflict.0, conflict.1);
            return Ok(Some(conflict));
        }
    }
    Ok(None)
}

/// Returns whether every plate can be printed sequentially.
pub fn check_scheduled_objects_for_sequential_printability(
    config: &SolverConfiguration,
    printer_geometry: &PrinterGeometry,
    objects: &[ObjectToPrint],
    plates: &[ScheduledPlate],
) -> Result<bool> {
    Ok(check_scheduled_objects_for_sequential_conflict(config, printer_geometry, objects, plates)?.is_none())
}
