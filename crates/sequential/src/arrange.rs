//! Multi-plate arrangement and public entry points.

use seqarrange_core::{
    Error, ProgressRange, ProgressReporter, Result, ScheduledPlate, SolvedPlate,
};

use crate::config::{SolverConfiguration, SCALE_FACTOR};
use crate::object::{ObjectToPrint, PrinterGeometry, SolvableObject};
use crate::preprocess::{convert_geometry_to_plate_bounds, prepare_solvable_objects};
use crate::scheduler::schedule_plate;

/// Rejects objects whose footprint cannot fit the plate extents.
fn check_sizes(config: &SolverConfiguration, objects: &[SolvableObject]) -> Result<()> {
    let plate = config.plate.bounding_box();
    for object in objects {
        let ext = object.extents().ok_or_else(|| {
            Error::InvalidGeometry(format!("object {} has an empty footprint", object.id))
        })?;
        if ext.width() > plate.width() || ext.height() > plate.height() {
            return Err(Error::ObjectTooLarge { id: object.id });
        }
    }
    Ok(())
}

/// Moves the glued chain starting at `index` to the front, keeping the
/// relative order of everything else.
fn move_chain_to_front(objects: &mut Vec<SolvableObject>, index: usize) {
    let mut end = index + 1;
    while end < objects.len() && objects[end - 1].glued_to_next {
        end += 1;
    }
    let chain: Vec<SolvableObject> = objects.drain(index..end).collect();
    objects.splice(0..0, chain);
}

/// Schedules prepared objects over as many plates as needed.
///
/// Objects are taken in list order; objects that do not fit a plate move to
/// the next one in their original order. Progress is reported as a monotone
/// percentage ending at 100, also when an error is returned.
///
/// # Errors
///
/// - [`Error::ObjectTooLarge`] if a footprint exceeds the plate extents.
/// - [`Error::SchedulingFailure`] if an object fits no empty plate.
pub fn schedule_solvable_objects<F>(
    config: &SolverConfiguration,
    objects: &[SolvableObject],
    mut progress: F,
) -> Result<Vec<SolvedPlate>>
where
    F: FnMut(i32),
{
    let mut reporter = ProgressReporter::new(&mut progress);
    let result = schedule_plates(config, objects, &mut reporter);
    reporter.finish();
    result
}

fn schedule_plates(
    config: &SolverConfiguration,
    objects: &[SolvableObject],
    reporter: &mut ProgressReporter<'_>,
) -> Result<Vec<SolvedPlate>> {
    config.validate()?;
    check_sizes(config, objects)?;

    let total = objects.len();
    let mut remaining: Vec<SolvableObject> = objects.to_vec();
    let mut trans_bed_lepox = false;
    let mut plates = Vec::new();
    reporter.report(0);

    while !remaining.is_empty() {
        let done = total - remaining.len();
        let range = ProgressRange::full().slice(done, total, total);
        log::info!(
            "Scheduling plate {} with {} remaining objects",
            plates.len() + 1,
            remaining.len()
        );

        let outcome = schedule_plate(config, &remaining, trans_bed_lepox, reporter, range)?;
        if outcome.placed.is_empty() {
            return Err(Error::SchedulingFailure(format!(
                "no object could be placed on plate {}",
                plates.len() + 1
            )));
        }
        plates.push(outcome.to_solved_plate(&remaining));

        let split_successor = outcome.split_glue.map(|index| remaining[index + 1].id);
        remaining = outcome
            .deferred
            .iter()
            .map(|&index| remaining[index].clone())
            .collect();

        trans_bed_lepox = false;
        if let Some(id) = split_successor {
            if let Some(index) = remaining.iter().position(|o| o.id == id) {
                log::debug!("Glued object {} continues on the next plate", id);
                move_chain_to_front(&mut remaining, index);
                trans_bed_lepox = true;
            }
        }
        reporter.report(ProgressRange::full().at(total - remaining.len(), total));
    }
    Ok(plates)
}

/// Schedules slicer objects for sequential printing on the printer described
/// by `printer_geometry`, returning plates in application units.
///
/// The plate region is taken from `printer_geometry`; all other tuning comes
/// from `config`.
///
/// # Example
///
/// ```rust,ignore
/// use seqarrange_core::{Point, Polygon};
/// use seqarrange_sequential::{
///     schedule_objects_for_sequential_print, ObjectToPrint, PrinterGeometry, SolverConfiguration,
/// };
///
/// let printer = PrinterGeometry::new(Polygon::rectangle(Point::new(0, 0), Point::new(250_000_000, 210_000_000)))
///     .with_convex_slice(0, vec![Polygon::rectangle(Point::new(-500_000, -500_000), Point::new(500_000, 500_000))]);
/// let cube = Polygon::rectangle(Point::new(-1_000_000, -1_000_000), Point::new(1_000_000, 1_000_000));
/// let objects = vec![ObjectToPrint::new(1, 2_000_000, vec![(0, cube)])];
///
/// let plates = schedule_objects_for_sequential_print(&SolverConfiguration::new(), &printer, &objects, |_| {})?;
/// assert_eq!(plates.len(), 1);
/// ```
pub fn schedule_objects_for_sequential_print<F>(
    config: &SolverConfiguration,
    printer_geometry: &PrinterGeometry,
    objects: &[ObjectToPrint],
    mut progress: F,
) -> Result<Vec<ScheduledPlate>>
where
    F: FnMut(i32),
{
    let prepared = convert_geometry_to_plate_bounds(printer_geometry).and_then(|plate| {
        let config = config.clone().with_plate(plate);
        let solvable = prepare_solvable_objects(&config, printer_geometry, objects)?;
        Ok((config, solvable))
    });
    let (config, solvable) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            progress(100);
            return Err(e);
        }
    };
    let plates = schedule_solvable_objects(&config, &solvable, progress)?;
    Ok(plates.iter().map(|p| p.to_scheduled(SCALE_FACTOR)).collect())
}
