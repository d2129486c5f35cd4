//! Lazy refinement of weak non-overlap.
//!
//! Weak non-overlap only separates vertices, so an earlier footprint and a
//! later unreachable zone may still cross edge-to-edge. After each satisfiable
//! check the model is scanned for such crossings; each one found becomes a
//! segment constraint and the check is repeated.

use seqarrange_core::robust::segments_intersect_closed;
use seqarrange_core::{Formula, LinearSolver, Point, SatResult};

use crate::constraints::{ConstraintBuilder, MemberId, ResolvedMember};

/// Refinement rounds allowed when no explicit cap applies.
pub const REFINEMENT_HARD_CAP: usize = 32;

/// Outcome of a refined check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refinement {
    /// The model is free of crossings.
    Solved,
    /// The check failed; carries the solver verdict.
    Infeasible(SatResult),
    /// Crossings remained when the round cap was hit.
    Exhausted,
}

impl Refinement {
    /// Returns true if a crossing-free model is available.
    pub fn is_solved(self) -> bool {
        matches!(self, Refinement::Solved)
    }
}

/// An edge crossing found in a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    /// Member printed first.
    pub earlier: MemberId,
    /// Footprint edge of `earlier`, object-local.
    pub footprint_edge: (Point, Point),
    /// Member printed later.
    pub later: MemberId,
    /// Unreachable zone edge of `later`, object-local.
    pub zone_edge: (Point, Point),
}

fn placed(p: Point, state: &ResolvedMember) -> (f64, f64) {
    (p.x as f64 + state.x.as_f64(), p.y as f64 + state.y.as_f64())
}

/// Every crossing between an earlier footprint and a later zone in the
/// current model. Pairs of background members are skipped.
pub fn find_crossings<S: LinearSolver>(builder: &ConstraintBuilder<'_, S>) -> Vec<Crossing> {
    let states: Vec<Option<ResolvedMember>> = (0..builder.num_members())
        .map(|m| builder.resolve(m))
        .collect();

    let mut crossings = Vec::new();
    for earlier in 0..states.len() {
        let Some(e_state) = states[earlier].filter(|s| s.present) else {
            continue;
        };
        for later in 0..states.len() {
            if earlier == later || (!builder.is_undecided(earlier) && !builder.is_undecided(later)) {
                continue;
            }
            let Some(l_state) = states[later].filter(|s| s.present) else {
                continue;
            };
            if e_state.t >= l_state.t {
                continue;
            }

            let footprint = &builder.shape(earlier).polygon;
            for zone in &builder.shape(later).unreachable_polygons {
                for (a1, b1) in footprint.edges() {
                    for (a2, b2) in zone.edges() {
                        if segments_intersect_closed(
                            placed(a1, &e_state),
                            placed(b1, &e_state),
                            placed(a2, &l_state),
                            placed(b2, &l_state),
                        ) {
                            crossings.push(Crossing {
                                earlier,
                                footprint_edge: (a1, b1),
                                later,
                                zone_edge: (a2, b2),
                            });
                        }
                    }
                }
            }
        }
    }
    crossings
}

/// Checks under `assumptions` and adds segment constraints until the model
/// is crossing-free, the check fails, or `max_rounds` rounds of additions
/// were made (a hard cap when `None`).
pub fn refine<S: LinearSolver>(
    builder: &mut ConstraintBuilder<'_, S>,
    assumptions: &[Formula],
    max_rounds: Option<usize>,
) -> Refinement {
    let cap = max_rounds.unwrap_or(REFINEMENT_HARD_CAP);
    let mut rounds = 0;

    loop {
        let result = builder.check(assumptions);
        if !result.is_sat() {
            return Refinement::Infeasible(result);
        }

        let crossings = find_crossings(builder);
        if crossings.is_empty() {
            return Refinement::Solved;
        }
        if rounds >= cap {
            log::debug!(
                "Refinement gave up after {} rounds with {} crossings left",
                rounds,
                crossings.len()
            );
            return Refinement::Exhausted;
        }

        let mut added = 0;
        for c in &crossings {
            if builder.introduce_line_nonintersection(c.earlier, c.footprint_edge, c.later, c.zone_edge) {
                added += 1;
            }
        }
        rounds += 1;
        log::debug!("Refinement round {}: {} segment constraints", rounds, added);

        // Only parallel overlaps left, which no segment constraint can separate.
        if added == 0 {
            return Refinement::Exhausted;
        }
    }
}
