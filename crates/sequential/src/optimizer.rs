//! Bounding optimization.
//!
//! Searches for the smallest usable plate region that still admits a
//! crossing-free arrangement of a batch. Each probe adds containment
//! assumptions for the present batch objects and runs the refinement loop;
//! probes that fail the area or extents pre-filter are rejected without
//! calling the solver.
//!
//! Two strategies are available:
//!
//! - [`optimize_binary_centered`] bisects a uniform scale of the plate box (or
//!   plate polygon) about its centre.
//! - [`optimize_linear`] shrinks the region step by step from the full plate.

use seqarrange_core::{Formula, LinearSolver, ProgressRange, ProgressReporter};

use crate::config::{BoundingSearch, PlateBounds, SolverConfiguration};
use crate::constraints::{ConstraintBuilder, Presence, Region, ResolvedMember};
use crate::refine::{refine, Refinement};

/// Objects of a batch and how they take part in a probe.
#[derive(Debug, Clone)]
pub struct BatchView<'v> {
    /// Presence of each undecided arena object.
    pub presence: &'v [(usize, Presence)],
    /// Refinement cap; `None` uses the hard cap.
    pub max_refines: Option<usize>,
}

impl BatchView<'_> {
    /// Arena indices of the objects that must be placed.
    pub fn present(&self) -> Vec<usize> {
        self.presence
            .iter()
            .filter(|(_, p)| *p == Presence::Present)
            .map(|(i, _)| *i)
            .collect()
    }
}

/// Best assignment found by a search.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Resolved state of every undecided arena object of the batch.
    pub members: Vec<(usize, ResolvedMember)>,
    /// Region the assignment was found in.
    pub region: Region,
}

/// The region of the plate scaled by `size / full` about its centre.
pub fn scaled_region(plate: &PlateBounds, size: f64, full: f64) -> Region {
    let bbox = plate.bounding_box();
    let (x0, y0) = bbox.min.as_f64();
    let (x1, y1) = bbox.max.as_f64();
    let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
    let k = if full > 0.0 { (size / full).clamp(0.0, 1.0) } else { 1.0 };

    match plate {
        PlateBounds::Box(_) => Region::Box {
            min: (cx - (cx - x0) * k, cy - (cy - y0) * k),
            max: (cx + (x1 - cx) * k, cy + (y1 - cy) * k),
        },
        PlateBounds::Polygon(polygon) => Region::Polygon(
            polygon
                .points()
                .iter()
                .map(|p| {
                    let (px, py) = p.as_f64();
                    (cx + (px - cx) * k, cy + (py - cy) * k)
                })
                .collect(),
        ),
    }
}

/// Cheap necessary condition for a batch to fit into `region`: total
/// footprint area and every footprint's extents.
pub fn check_area<S: LinearSolver>(builder: &ConstraintBuilder<'_, S>, present: &[usize], region: &Region) -> bool {
    let (width, height) = region.extents();
    let mut area = 0.0;
    for &index in present {
        let Some(member) = builder.member_of(index) else {
            continue;
        };
        let shape = builder.shape(member);
        area += shape.area();
        if let Some(ext) = shape.extents() {
            if ext.width() as f64 > width || ext.height() as f64 > height {
                return false;
            }
        }
    }
    area <= region.area()
}

fn snapshot<S: LinearSolver>(builder: &ConstraintBuilder<'_, S>, view: &BatchView<'_>, region: &Region) -> Option<Assignment> {
    let members = view
        .presence
        .iter()
        .map(|&(index, _)| {
            let member = builder.member_of(index)?;
            Some((index, builder.resolve(member)?))
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Assignment {
        members,
        region: region.clone(),
    })
}

/// Runs one probe: pre-filter, containment assumptions, refinement.
fn probe<S: LinearSolver>(
    builder: &mut ConstraintBuilder<'_, S>,
    view: &BatchView<'_>,
    base: &[Formula],
    region: &Region,
) -> Option<Assignment> {
    let present = view.present();
    if !check_area(builder, &present, region) {
        log::trace!("Probe rejected by area pre-filter");
        return None;
    }
    let mut assumptions = base.to_vec();
    assumptions.extend(builder.containment_assumptions(&present, region));

    match refine(builder, &assumptions, view.max_refines) {
        Refinement::Solved => snapshot(builder, view, region),
        Refinement::Infeasible(result) => {
            log::trace!("Probe {}", result);
            None
        }
        Refinement::Exhausted => None,
    }
}

fn full_size(plate: &PlateBounds) -> i64 {
    let bbox = plate.bounding_box();
    bbox.width().max(bbox.height())
}

/// Bisects the region scale between `minimum_bounding_box_size` and the full
/// plate. Returns `None` if the batch does not fit on the full plate.
pub fn optimize_binary_centered<S: LinearSolver>(
    builder: &mut ConstraintBuilder<'_, S>,
    config: &SolverConfiguration,
    view: &BatchView<'_>,
    progress: &mut ProgressReporter<'_>,
    range: ProgressRange,
) -> Option<Assignment> {
    let base = builder.presence_assumptions(view.presence);
    let full = full_size(&config.plate);
    let step = config.bounding_box_size_optimization_step.max(1);

    let mut best = probe(builder, view, &base, &scaled_region(&config.plate, full as f64, full as f64))?;
    let mut feasible = full;
    let mut infeasible = config.minimum_bounding_box_size.clamp(0, full);

    let total = {
        let mut span = (feasible - infeasible).max(1) / step;
        let mut n = 1;
        while span > 1 {
            span /= 2;
            n += 1;
        }
        n
    };
    let mut done = 1;
    progress.report(range.at(done, total));

    while feasible - infeasible > step {
        let mid = infeasible + (feasible - infeasible) / 2;
        let region = scaled_region(&config.plate, mid as f64, full as f64);
        match probe(builder, view, &base, &region) {
            Some(assignment) => {
                log::debug!("Bounding size {} feasible", mid);
                feasible = mid;
                best = assignment;
            }
            None => {
                log::debug!("Bounding size {} infeasible", mid);
                infeasible = mid;
            }
        }
        done += 1;
        progress.report(range.at(done, total));
    }
    progress.report(range.max);
    Some(best)
}

/// Shrinks the region by `bounding_box_size_optimization_step` from the full
/// plate until a probe fails or the minimum size is reached.
pub fn optimize_linear<S: LinearSolver>(
    builder: &mut ConstraintBuilder<'_, S>,
    config: &SolverConfiguration,
    view: &BatchView<'_>,
    progress: &mut ProgressReporter<'_>,
    range: ProgressRange,
) -> Option<Assignment> {
    let base = builder.presence_assumptions(view.presence);
    let full = full_size(&config.plate);
    let step = config.bounding_box_size_optimization_step.max(1);
    let minimum = config.minimum_bounding_box_size.clamp(0, full);
    let total = ((full - minimum) / step + 1) as usize;

    let mut best = probe(builder, view, &base, &scaled_region(&config.plate, full as f64, full as f64))?;
    let mut size = full - step;
    let mut done = 1;
    while size >= minimum {
        let region = scaled_region(&config.plate, size as f64, full as f64);
        match probe(builder, view, &base, &region) {
            Some(assignment) => best = assignment,
            None => break,
        }
        size -= step;
        done += 1;
        progress.report(range.at(done, total));
    }
    progress.report(range.max);
    Some(best)
}

/// Runs the configured search strategy.
pub fn optimize<S: LinearSolver>(
    builder: &mut ConstraintBuilder<'_, S>,
    config: &SolverConfiguration,
    view: &BatchView<'_>,
    progress: &mut ProgressReporter<'_>,
    range: ProgressRange,
) -> Option<Assignment> {
    match config.bounding_search {
        BoundingSearch::BinaryCentered => optimize_binary_centered(builder, config, view, progress, range),
        BoundingSearch::Linear => optimize_linear(builder, config, view, progress, range),
    }
}
