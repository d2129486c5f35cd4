//! Subglobal scheduling of one plate.
//!
//! Objects are taken from the arena in list order, `object_group_size` at a
//! time. Each batch gets its own solver session in which earlier decisions are
//! immovable background (or a single proxy once there are more than
//! `fixed_object_grouping_limit` of them). If no arrangement of a batch fits,
//! the present member with the highest list position is marked absent and the
//! batch is re-optimized in the same session; an object that fails on its own
//! is deferred to a later plate.

use seqarrange_core::{
    convex_hull, Error, Point, Polygon, ProgressRange, ProgressReporter, Rational,
    Result, SolvedObject, SolvedPlate,
};

use crate::config::{SolverConfiguration, GROUND_PRESENCE_TIME};
use crate::constraints::{ConstraintBuilder, Presence};
use crate::milp::MilpSession;
use crate::object::SolvableObject;
use crate::optimizer::{optimize, BatchView};

/// Decided placement of an arena object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Arena index.
    pub index: usize,
    /// X offset.
    pub x: Rational,
    /// Y offset.
    pub y: Rational,
    /// Schedule time.
    pub t: Rational,
}

/// Result of scheduling one plate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlateOutcome {
    /// Placed objects in ascending time.
    pub placed: Vec<Placement>,
    /// Arena indices left for later plates, in list order.
    pub deferred: Vec<usize>,
    /// Placed glued object whose successor was deferred.
    pub split_glue: Option<usize>,
}

impl PlateOutcome {
    /// Converts the placements to a solver-unit plate.
    pub fn to_solved_plate(&self, objects: &[SolvableObject]) -> SolvedPlate {
        SolvedPlate {
            objects: self
                .placed
                .iter()
                .map(|p| SolvedObject {
                    id: objects[p.index].id,
                    x: p.x,
                    y: p.y,
                    t: p.t,
                })
                .collect(),
        }
    }
}

/// Upper bound on schedule times for an arena of `n` objects.
pub fn time_horizon(config: &SolverConfiguration, n: usize) -> f64 {
    let s = config.temporal_spread as f64;
    let g = config.object_group_size as f64;
    GROUND_PRESENCE_TIME as f64 + (n + config.object_group_size + 2) as f64 * 2.0 * s * g
}

/// Convex hull of the placed footprints, with vertices rounded outward.
fn coalesce(objects: &[SolvableObject], decided: &[Placement]) -> Polygon {
    let mut points = Vec::new();
    for p in decided {
        let (dx, dy) = (p.x.as_f64(), p.y.as_f64());
        for v in objects[p.index].polygon.points() {
            let (x, y) = (v.x as f64 + dx, v.y as f64 + dy);
            for px in [x.floor(), x.ceil()] {
                for py in [y.floor(), y.ceil()] {
                    points.push(Point::new(px as i64, py as i64));
                }
            }
        }
    }
    convex_hull(&points)
}

/// Next batch starting at `cursor`; a glued pair is never split between
/// batches.
fn next_batch(objects: &[SolvableObject], cursor: usize, group_size: usize) -> Vec<usize> {
    let mut end = (cursor + group_size).min(objects.len());
    while end < objects.len() && end > cursor && objects[end - 1].glued_to_next {
        end += 1;
    }
    (cursor..end).collect()
}

/// Reassigns the times of placed objects to `32 + (k + 1) * 2 * s * g` by
/// ascending model time, keeping a glued successor `1.25 * s` after its
/// predecessor. Placements are left sorted by time.
pub fn augment_temporal_spread(
    config: &SolverConfiguration,
    objects: &[SolvableObject],
    placed: &mut [Placement],
) -> Result<()> {
    placed.sort_by_key(|p| p.t);
    if placed.windows(2).any(|w| w[0].t == w[1].t) {
        return Err(Error::InvariantViolation(
            "two objects resolved to the same schedule time".into(),
        ));
    }

    let s = config.temporal_spread;
    let g = config.object_group_size as i64;
    let glue_gap = Rational::new(5 * s, 4)?;
    let mut previous: Option<(usize, Rational)> = None;

    for (rank, p) in placed.iter_mut().enumerate() {
        let base = Rational::from_integer(GROUND_PRESENCE_TIME + (rank as i64 + 1) * 2 * s * g);
        p.t = match previous {
            Some((prev_index, prev_t)) if prev_index + 1 == p.index && objects[prev_index].glued_to_next => {
                prev_t + glue_gap
            }
            _ => base,
        };
        previous = Some((p.index, p.t));
    }
    Ok(())
}

/// Adds a solved batch to the decided objects and renormalises all decided
/// times. Decided objects stay sorted by time.
fn commit_batch(
    config: &SolverConfiguration,
    objects: &[SolvableObject],
    decided: &mut Vec<Placement>,
    placed: Vec<Placement>,
) -> Result<()> {
    decided.extend(placed);
    augment_temporal_spread(config, objects, decided)
}

/// Plate-level scheduler over an arena of objects.
#[derive(Debug)]
pub struct SubglobalScheduler<'a> {
    config: &'a SolverConfiguration,
    objects: &'a [SolvableObject],
    trans_bed_lepox: bool,
}

impl<'a> SubglobalScheduler<'a> {
    /// Creates a scheduler. With `trans_bed_lepox` set, arena object 0 is the
    /// glued successor of the last object of the previous plate.
    pub fn new(config: &'a SolverConfiguration, objects: &'a [SolvableObject], trans_bed_lepox: bool) -> Self {
        Self {
            config,
            objects,
            trans_bed_lepox,
        }
    }

    /// Schedules as many objects as fit on one plate.
    pub fn schedule_plate(&self, progress: &mut ProgressReporter<'_>, range: ProgressRange) -> Result<PlateOutcome> {
        let n = self.objects.len();
        let horizon = time_horizon(self.config, n);
        let mut decided: Vec<Placement> = Vec::new();
        let mut deferred: Vec<usize> = Vec::new();
        let mut is_deferred = vec![false; n];
        let mut closing: Option<usize> = None;
        let mut cursor = 0;

        while cursor < n {
            let candidates = next_batch(self.objects, cursor, self.config.object_group_size);
            cursor += candidates.len();

            let mut batch = Vec::with_capacity(candidates.len());
            for index in candidates {
                // A successor never lands on a plate without its predecessor.
                if index > 0 && self.objects[index - 1].glued_to_next && is_deferred[index - 1] {
                    is_deferred[index] = true;
                    deferred.push(index);
                } else {
                    batch.push(index);
                }
            }
            if batch.is_empty() {
                continue;
            }

            let batch_range = range.slice(cursor - batch.len(), cursor, n);
            let (placed, missing) = self.solve_batch(&decided, &batch, closing, horizon, progress, batch_range)?;

            // The first member is dropped last, so it failed on its own.
            if placed.is_empty() && decided.is_empty() {
                return Err(Error::SchedulingFailure(format!(
                    "object {} does not fit on an empty plate",
                    self.objects[batch[0]].id
                )));
            }

            for &index in &missing {
                is_deferred[index] = true;
                deferred.push(index);
            }
            commit_batch(self.config, self.objects, &mut decided, placed)?;

            for p in &decided {
                let next = p.index + 1;
                if self.objects[p.index].glued_to_next && next < n && is_deferred[next] {
                    closing = Some(p.index);
                }
            }
            log::info!(
                "Batch done: {} placed, {} deferred so far",
                decided.len(),
                deferred.len()
            );
            progress.report(batch_range.max);
        }

        deferred.sort_unstable();
        Ok(PlateOutcome {
            placed: decided,
            deferred,
            split_glue: closing,
        })
    }

    /// Solves one batch, dropping members until an arrangement is found.
    /// Returns the placements and the arena indices left out.
    fn solve_batch(
        &self,
        decided: &[Placement],
        batch: &[usize],
        closing: Option<usize>,
        horizon: f64,
        progress: &mut ProgressReporter<'_>,
        range: ProgressRange,
    ) -> Result<(Vec<Placement>, Vec<usize>)> {
        let mut builder = ConstraintBuilder::new(MilpSession::new(), self.objects, self.config);

        let use_proxy = closing.is_none() && decided.len() > self.config.fixed_object_grouping_limit;
        if use_proxy {
            let hull = coalesce(self.objects, decided);
            let latest = decided.iter().map(|p| p.t).max().unwrap_or(Rational::ZERO);
            log::debug!("Coalescing {} decided objects into a proxy", decided.len());
            let proxy = builder.add_proxy(SolvableObject::new(-1, hull), latest);
            builder.introduce_proxy_precedence(proxy);
        } else {
            for p in decided {
                builder.add_fixed(p.index, p.x, p.y, p.t);
            }
        }
        for &index in batch {
            builder.add_undecided(index, horizon);
        }

        builder.introduce_all();
        if self.trans_bed_lepox {
            builder.introduce_trans_bed_lepox();
        }
        if let Some(member) = closing.and_then(|index| builder.member_of(index)) {
            builder.introduce_closing_object(member);
        }

        let max_refines = use_proxy.then_some(self.config.max_refines);
        let mut presence: Vec<(usize, Presence)> = batch.iter().map(|&i| (i, Presence::Present)).collect();

        loop {
            let present = presence.iter().filter(|(_, p)| *p == Presence::Present).count();
            if present == 0 {
                return Ok((Vec::new(), batch.to_vec()));
            }

            let view = BatchView {
                presence: &presence,
                max_refines,
            };
            if let Some(assignment) = optimize(&mut builder, self.config, &view, progress, range) {
                let mut placed = Vec::new();
                let mut missing = Vec::new();
                for (index, state) in assignment.members {
                    if state.present {
                        placed.push(Placement {
                            index,
                            x: state.x,
                            y: state.y,
                            t: state.t,
                        });
                    } else {
                        missing.push(index);
                    }
                }
                log::debug!(
                    "Batch of {} solved with {} lines in {} checks",
                    batch.len(),
                    builder.lines_added(),
                    builder.session().num_checks()
                );
                return Ok((placed, missing));
            }

            // Drop the present member with the highest list position.
            if let Some(slot) = presence.iter_mut().rev().find(|(_, p)| *p == Presence::Present) {
                log::debug!("Batch infeasible, leaving out object {}", self.objects[slot.0].id);
                slot.1 = Presence::Absent;
            }
        }
    }
}

/// Schedules one plate of the arena with a HiGHS-backed session.
pub fn schedule_plate(
    config: &SolverConfiguration,
    objects: &[SolvableObject],
    trans_bed_lepox: bool,
    progress: &mut ProgressReporter<'_>,
    range: ProgressRange,
) -> Result<PlateOutcome> {
    SubglobalScheduler::new(config, objects, trans_bed_lepox).schedule_plate(progress, range)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(id: i32) -> SolvableObject {
        SolvableObject::new(id, Polygon::rectangle(Point::new(-10, -10), Point::new(10, 10)))
    }

    fn placement(index: usize, t: i64) -> Placement {
        Placement {
            index,
            x: Rational::ZERO,
            y: Rational::ZERO,
            t: Rational::from_integer(t),
        }
    }

    #[test]
    fn test_next_batch_keeps_glued_pairs() {
        let objects = vec![square(1), square(2).glued(true), square(3), square(4)];
        assert_eq!(next_batch(&objects, 0, 2), vec![0, 1, 2]);
        assert_eq!(next_batch(&objects, 3, 2), vec![3]);
        assert_eq!(next_batch(&objects, 0, 8), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_augment_temporal_spread() {
        let config = SolverConfiguration::default();
        let objects = vec![square(1), square(2).glued(true), square(3)];
        let mut placed = vec![placement(2, 100), placement(0, 10), placement(1, 50)];
        augment_temporal_spread(&config, &objects, &mut placed).unwrap();

        let order: Vec<usize> = placed.iter().map(|p| p.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        // 32 + k * 2 * 16 * 4
        assert_eq!(placed[0].t, Rational::from_integer(160));
        assert_eq!(placed[1].t, Rational::from_integer(288));
        assert_eq!(placed[2].t, Rational::from_integer(308));
    }

    #[test]
    fn test_augment_rejects_equal_times() {
        let config = SolverConfiguration::default();
        let objects = vec![square(1), square(2)];
        let mut placed = vec![placement(0, 10), placement(1, 10)];
        assert!(matches!(
            augment_temporal_spread(&config, &objects, &mut placed),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_commit_renormalises_decided_times() {
        let config = SolverConfiguration::default()
            .with_object_group_size(1)
            .with_fixed_object_grouping_limit(1);
        let objects: Vec<SolvableObject> = (1..=5).map(square).collect();
        let horizon = time_horizon(&config, objects.len());
        let mut decided = Vec::new();

        // Raw model times at the top of the horizon.
        commit_batch(&config, &objects, &mut decided, vec![placement(0, horizon as i64)]).unwrap();
        commit_batch(&config, &objects, &mut decided, vec![placement(1, horizon as i64 - 1)]).unwrap();

        let times: Vec<Rational> = decided.iter().map(|p| p.t).collect();
        assert_eq!(times, vec![Rational::from_integer(64), Rational::from_integer(96)]);
        let order: Vec<usize> = decided.iter().map(|p| p.index).collect();
        assert_eq!(order, vec![0, 1]);

        // A proxy at the latest time leaves room for every remaining object.
        let latest = decided.iter().map(|p| p.t).max().unwrap().as_f64();
        let remaining = (objects.len() - decided.len()) as f64;
        assert!(latest + (remaining + 1.0) * config.temporal_spread as f64 <= horizon);
    }

    #[test]
    fn test_time_horizon() {
        let config = SolverConfiguration::default();
        assert_eq!(time_horizon(&config, 4), 32.0 + 10.0 * 128.0);
    }

    #[test]
    fn test_coalesce_covers_footprints() {
        let objects = vec![square(1), square(2)];
        let decided = vec![
            Placement {
                index: 0,
                x: Rational::new(201, 2).unwrap(),
                y: Rational::from_integer(100),
                t: Rational::from_integer(32),
            },
            Placement {
                index: 1,
                x: Rational::from_integer(150),
                y: Rational::from_integer(100),
                t: Rational::from_integer(64),
            },
        ];
        let hull = coalesce(&objects, &decided);
        let bbox = hull.bounding_box().unwrap();
        assert_eq!(bbox.min, Point::new(90, 90));
        assert_eq!(bbox.max, Point::new(160, 110));
    }
}
