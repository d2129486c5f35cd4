//! Constraint building for one batch session.
//!
//! A [`ConstraintBuilder`] owns one solver session and a set of *members*:
//! objects of the arena that take part in the current batch, either as
//! immovable background (decided earlier on this plate, [`PositionRef::Fixed`])
//! or as fresh decision variables ([`PositionRef::Variable`]). A coalesced
//! proxy of many decided objects can stand in for them.
//!
//! Every undecided member gets a boolean presence variable. All permanent
//! constraints are guarded by the presence of the undecided members they
//! mention, so the scheduler can drop members from a failed batch by
//! changing assumptions instead of rebuilding the session.
//!
//! Geometric predicates:
//!
//! - *Point outside convex polygon*: a disjunction over the polygon's edges
//!   of strict half-plane atoms, each normalised by the L-infinity norm of the
//!   edge direction.
//! - *Weak non-overlap*: when A is printed before B, every footprint vertex of
//!   A is outside each unreachable polygon of B, and one vertex of each such
//!   polygon is outside A's footprint (which rules out the zone lying inside
//!   the footprint). Crossing edges are left to refinement.
//! - *Line non-intersection*: see [`ConstraintBuilder::introduce_line_nonintersection`].

use std::borrow::Cow;

use seqarrange_core::{
    BoundingBox, Formula, LinExpr, LinearSolver, Point, Polygon, Rational, SatResult, VarId,
};

use crate::config::{
    LineEncoding, SolverConfiguration, INTERSECTION_REPULSION_MAX, INTERSECTION_REPULSION_MIN,
};
use crate::object::SolvableObject;

/// Position of a member: resolved, or decided by the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionRef {
    /// Known offset.
    Fixed(Rational, Rational),
    /// Solver variables for X and Y.
    Variable(VarId, VarId),
}

impl PositionRef {
    /// X offset as an expression.
    pub fn x(&self) -> LinExpr {
        match self {
            PositionRef::Fixed(x, _) => LinExpr::from(*x),
            PositionRef::Variable(x, _) => LinExpr::var(*x),
        }
    }

    /// Y offset as an expression.
    pub fn y(&self) -> LinExpr {
        match self {
            PositionRef::Fixed(_, y) => LinExpr::from(*y),
            PositionRef::Variable(_, y) => LinExpr::var(*y),
        }
    }

    /// Returns true for solver-decided positions.
    pub fn is_variable(&self) -> bool {
        matches!(self, PositionRef::Variable(..))
    }
}

/// Schedule time of a member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeRef {
    /// Known time.
    Fixed(Rational),
    /// Solver variable.
    Variable(VarId),
}

impl TimeRef {
    /// Time as an expression.
    pub fn expr(&self) -> LinExpr {
        match self {
            TimeRef::Fixed(t) => LinExpr::from(*t),
            TimeRef::Variable(t) => LinExpr::var(*t),
        }
    }
}

/// Whether an undecided object takes part in a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    /// The object must be placed on this plate.
    #[default]
    Present,
    /// The object is left out of this plate.
    Absent,
    /// The solver may choose.
    Undecided,
}

/// Usable plate sub-region probed by the bounding search.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// Axis-aligned box `(min, max)`.
    Box {
        /// Lower-left corner.
        min: (f64, f64),
        /// Upper-right corner.
        max: (f64, f64),
    },
    /// Convex counter-clockwise polygon.
    Polygon(Vec<(f64, f64)>),
}

impl Region {
    /// Region covering a bounding box.
    pub fn from_box(bbox: &BoundingBox) -> Self {
        Region::Box {
            min: bbox.min.as_f64(),
            max: bbox.max.as_f64(),
        }
    }

    /// Area of the region.
    pub fn area(&self) -> f64 {
        match self {
            Region::Box { min, max } => ((max.0 - min.0) * (max.1 - min.1)).max(0.0),
            Region::Polygon(points) => {
                let n = points.len();
                let twice: f64 = (0..n)
                    .map(|i| {
                        let (a, b) = (points[i], points[(i + 1) % n]);
                        a.0 * b.1 - a.1 * b.0
                    })
                    .sum();
                (twice / 2.0).abs()
            }
        }
    }

    /// Width and height of the region's extents.
    pub fn extents(&self) -> (f64, f64) {
        match self {
            Region::Box { min, max } => (max.0 - min.0, max.1 - min.1),
            Region::Polygon(points) => {
                let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
                let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
                for &(x, y) in points {
                    x0 = x0.min(x);
                    y0 = y0.min(y);
                    x1 = x1.max(x);
                    y1 = y1.max(y);
                }
                ((x1 - x0).max(0.0), (y1 - y0).max(0.0))
            }
        }
    }
}

/// Index of a member within a builder.
pub type MemberId = usize;

/// Resolved state of a member in the current model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMember {
    /// X offset.
    pub x: Rational,
    /// Y offset.
    pub y: Rational,
    /// Schedule time.
    pub t: Rational,
    /// Whether the member is on the plate in this model.
    pub present: bool,
}

#[derive(Debug, Clone)]
struct Member<'a> {
    shape: Cow<'a, SolvableObject>,
    arena_index: Option<usize>,
    position: PositionRef,
    time: TimeRef,
    presence: Option<VarId>,
}

/// Builds the constraint system of one batch and owns its solver session.
pub struct ConstraintBuilder<'a, S: LinearSolver> {
    session: S,
    objects: &'a [SolvableObject],
    plate: BoundingBox,
    members: Vec<Member<'a>>,
    by_arena: Vec<Option<MemberId>>,
    spread: f64,
    line_encoding: LineEncoding,
    fresh_params: usize,
    lines_added: usize,
}

impl<'a, S: LinearSolver> ConstraintBuilder<'a, S> {
    /// Creates a builder over the arena `objects`.
    pub fn new(mut session: S, objects: &'a [SolvableObject], config: &SolverConfiguration) -> Self {
        session.set_timeout(config.optimization_timeout);
        Self {
            session,
            objects,
            plate: config.plate.bounding_box(),
            members: Vec::new(),
            by_arena: vec![None; objects.len()],
            spread: config.temporal_spread as f64,
            line_encoding: config.line_encoding,
            fresh_params: 0,
            lines_added: 0,
        }
    }

    /// Solver session.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Number of members.
    pub fn num_members(&self) -> usize {
        self.members.len()
    }

    /// Member of an arena object, if it takes part in this session.
    pub fn member_of(&self, arena_index: usize) -> Option<MemberId> {
        self.by_arena.get(arena_index).copied().flatten()
    }

    /// Arena index of a member; `None` for a proxy.
    pub fn arena_index(&self, member: MemberId) -> Option<usize> {
        self.members[member].arena_index
    }

    /// Shape of a member.
    pub fn shape(&self, member: MemberId) -> &SolvableObject {
        &self.members[member].shape
    }

    /// Returns true for members decided by the solver.
    pub fn is_undecided(&self, member: MemberId) -> bool {
        self.members[member].presence.is_some()
    }

    /// Number of segment constraints added so far.
    pub fn lines_added(&self) -> usize {
        self.lines_added
    }

    /// Adds an already decided arena object as immovable background.
    pub fn add_fixed(&mut self, arena_index: usize, x: Rational, y: Rational, t: Rational) -> MemberId {
        let objects = self.objects;
        let id = self.members.len();
        self.members.push(Member {
            shape: Cow::Borrowed(&objects[arena_index]),
            arena_index: Some(arena_index),
            position: PositionRef::Fixed(x, y),
            time: TimeRef::Fixed(t),
            presence: None,
        });
        self.by_arena[arena_index] = Some(id);
        id
    }

    /// Adds a coalesced proxy for decided objects, positioned at the origin.
    pub fn add_proxy(&mut self, shape: SolvableObject, t: Rational) -> MemberId {
        let id = self.members.len();
        self.members.push(Member {
            shape: Cow::Owned(shape),
            arena_index: None,
            position: PositionRef::Fixed(Rational::ZERO, Rational::ZERO),
            time: TimeRef::Fixed(t),
            presence: None,
        });
        id
    }

    /// Adds an arena object with fresh position, time and presence variables.
    ///
    /// Positions are bounded so that the footprint stays on the plate; times
    /// lie in `[0, time_horizon]`.
    pub fn add_undecided(&mut self, arena_index: usize, time_horizon: f64) -> MemberId {
        let objects = self.objects;
        let object = &objects[arena_index];
        let ext = object
            .extents()
            .unwrap_or(BoundingBox::new(Point::new(0, 0), Point::new(0, 0)));
        let x_lo = (self.plate.min.x - ext.min.x) as f64;
        let x_hi = (self.plate.max.x - ext.max.x) as f64;
        let y_lo = (self.plate.min.y - ext.min.y) as f64;
        let y_hi = (self.plate.max.y - ext.max.y) as f64;

        let x = self.session.declare_real(&format!("x_{}", object.id), x_lo, x_hi);
        let y = self.session.declare_real(&format!("y_{}", object.id), y_lo, y_hi);
        let t = self.session.declare_real(&format!("t_{}", object.id), 0.0, time_horizon);
        let p = self.session.declare_bool(&format!("present_{}", object.id));

        let id = self.members.len();
        self.members.push(Member {
            shape: Cow::Borrowed(object),
            arena_index: Some(arena_index),
            position: PositionRef::Variable(x, y),
            time: TimeRef::Variable(t),
            presence: Some(p),
        });
        self.by_arena[arena_index] = Some(id);
        id
    }

    /// Literal "member is absent"; `False` for background members.
    fn absent(&self, member: MemberId) -> Formula {
        match self.members[member].presence {
            Some(p) => LinExpr::var(p).le(0.0),
            None => Formula::False,
        }
    }

    /// Literal "member is present"; `True` for background members.
    fn present(&self, member: MemberId) -> Formula {
        match self.members[member].presence {
            Some(p) => LinExpr::var(p).ge(1.0),
            None => Formula::True,
        }
    }

    fn time(&self, member: MemberId) -> LinExpr {
        self.members[member].time.expr()
    }

    /// Pairs of members with at least one undecided side.
    fn active_pairs(&self) -> Vec<(MemberId, MemberId)> {
        let n = self.members.len();
        let mut pairs = Vec::new();
        for a in 0..n {
            for b in (a + 1)..n {
                if self.is_undecided(a) || self.is_undecided(b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Strict half-plane atoms stating that vertex `v` of a shape placed at
    /// `p_pos` lies outside `polygon` placed at `q_pos`.
    fn point_outside(&self, p_pos: &PositionRef, v: Point, q_pos: &PositionRef, polygon: &Polygon) -> Formula {
        let mut sides = Vec::with_capacity(polygon.len());
        for (u, w) in polygon.edges() {
            let d = w - u;
            let norm = d.x.abs().max(d.y.abs());
            if norm == 0 {
                continue;
            }
            let (dx, dy) = (d.x as f64, d.y as f64);
            // cross(d, (p + v) - (q + u))
            let expr = (p_pos.y() - q_pos.y()) * dx - (p_pos.x() - q_pos.x()) * dy
                + (dx * (v.y - u.y) as f64 - dy * (v.x - u.x) as f64);
            sides.push((expr * (1.0 / norm as f64)).lt(0.0));
        }
        Formula::or(sides)
    }

    fn weak_nonoverlap_clauses(&self, a: MemberId, b: MemberId) -> Vec<Formula> {
        let guards = vec![self.absent(a), self.absent(b)];
        let mut clauses = Vec::new();

        for (earlier, later) in [(a, b), (b, a)] {
            let e = &self.members[earlier];
            let l = &self.members[later];
            let not_earlier = self.time(earlier).ge(self.time(later));

            for zone in &l.shape.unreachable_polygons {
                for &v in e.shape.polygon.points() {
                    let mut parts = guards.clone();
                    parts.push(not_earlier.clone());
                    parts.push(self.point_outside(&e.position, v, &l.position, zone));
                    clauses.push(Formula::or(parts));
                }
                if let Some(&reference) = zone.points().first() {
                    let mut parts = guards.clone();
                    parts.push(not_earlier.clone());
                    parts.push(self.point_outside(&l.position, reference, &e.position, &e.shape.polygon));
                    clauses.push(Formula::or(parts));
                }
            }
        }
        clauses
    }

    /// Requires distinct members to be at least `temporal_spread` apart in time.
    pub fn introduce_time_ordering(&mut self) {
        let mut clauses = Vec::new();
        for (a, b) in self.active_pairs() {
            clauses.push(Formula::or(vec![
                self.absent(a),
                self.absent(b),
                self.time(a).ge(self.time(b) + self.spread),
                self.time(b).ge(self.time(a) + self.spread),
            ]));
        }
        for clause in clauses {
            self.session.assert(clause);
        }
    }

    /// Separates every earlier footprint from every later unreachable zone.
    pub fn introduce_weak_nonoverlap(&mut self) {
        let mut clauses = Vec::new();
        for (a, b) in self.active_pairs() {
            clauses.extend(self.weak_nonoverlap_clauses(a, b));
        }
        log::debug!("Weak non-overlap: {} clauses", clauses.len());
        for clause in clauses {
            self.session.assert(clause);
        }
    }

    /// Glue constraints for every arena object marked `glued_to_next` whose
    /// pair takes part in this session.
    pub fn introduce_lepox(&mut self) {
        let mut clauses = Vec::new();
        for i in 0..self.objects.len().saturating_sub(1) {
            if !self.objects[i].glued_to_next {
                continue;
            }
            let (Some(mi), Some(mj)) = (self.member_of(i), self.member_of(i + 1)) else {
                continue;
            };
            if !self.is_undecided(mi) && !self.is_undecided(mj) {
                continue;
            }

            let ti = self.time(mi);
            let tj = self.time(mj);
            // Next object inside [t_i + s, t_i + 1.5 s].
            clauses.push(Formula::or(vec![
                self.absent(mi),
                self.absent(mj),
                Formula::and(vec![
                    tj.clone().ge(ti.clone() + self.spread),
                    tj.le(ti.clone() + 1.5 * self.spread),
                ]),
            ]));

            // Successor postponed: the glued object closes the plate.
            if self.is_undecided(mj) {
                for k in 0..self.members.len() {
                    if k == mi || k == mj {
                        continue;
                    }
                    if !self.is_undecided(k) && !self.is_undecided(mi) {
                        continue;
                    }
                    clauses.push(Formula::or(vec![
                        self.absent(mi),
                        self.present(mj),
                        self.absent(k),
                        self.time(k).lt(ti.clone()),
                    ]));
                }
            }

            // No successor without its predecessor.
            clauses.push(Formula::or(vec![self.absent(mj), self.present(mi)]));
        }
        for clause in clauses {
            self.session.assert(clause);
        }
    }

    /// Requires every present undecided member to precede `member`, which is
    /// a background object whose glued successor has left this plate.
    pub fn introduce_closing_object(&mut self, member: MemberId) {
        let t = self.time(member);
        let clauses: Vec<Formula> = (0..self.members.len())
            .filter(|&k| k != member && self.is_undecided(k))
            .map(|k| Formula::or(vec![self.absent(k), self.time(k).lt(t.clone())]))
            .collect();
        for clause in clauses {
            self.session.assert(clause);
        }
    }

    /// Requires arena object 0 to predate every other member by more than the
    /// temporal spread; used when its glued predecessor closed the previous
    /// plate.
    pub fn introduce_trans_bed_lepox(&mut self) {
        let Some(member) = self.member_of(0) else {
            return;
        };
        let t = self.time(member);
        let mut clauses = Vec::new();
        for k in 0..self.members.len() {
            if k == member || (!self.is_undecided(k) && !self.is_undecided(member)) {
                continue;
            }
            clauses.push(Formula::or(vec![
                self.absent(member),
                self.absent(k),
                self.time(k).gt(t.clone() + self.spread),
            ]));
        }
        for clause in clauses {
            self.session.assert(clause);
        }
    }

    /// Requires every undecided member to follow the proxy `member`.
    pub fn introduce_proxy_precedence(&mut self, member: MemberId) {
        let t = self.time(member);
        let clauses: Vec<Formula> = (0..self.members.len())
            .filter(|&k| self.is_undecided(k))
            .map(|k| Formula::or(vec![self.absent(k), self.time(k).gt(t.clone() + self.spread)]))
            .collect();
        for clause in clauses {
            self.session.assert(clause);
        }
    }

    /// Forbids edge `footprint_edge` of `earlier`'s footprint from crossing
    /// edge `zone_edge` of one of `later`'s unreachable polygons, unless
    /// `later` is in fact printed first or either member is absent.
    ///
    /// With the explicit encoding two fresh parameters `t1`, `t2` pin the
    /// intersection point of the infinite lines,
    /// `E + a1 + t1 d1 == L + a2 + t2 d2`, and at least one of them must lie
    /// outside the band `[-0.01, 1.01]`. The implicit encoding states the same
    /// band condition with the parameters solved for. Parallel or degenerate
    /// edges are skipped; returns whether a constraint was added.
    pub fn introduce_line_nonintersection(
        &mut self,
        earlier: MemberId,
        footprint_edge: (Point, Point),
        later: MemberId,
        zone_edge: (Point, Point),
    ) -> bool {
        let (a1, b1) = footprint_edge;
        let (a2, b2) = zone_edge;
        let d1 = b1 - a1;
        let d2 = b2 - a2;
        let c = d1.cross(d2);
        if c == 0 {
            return false;
        }
        let c = c as f64;

        let e_pos = self.members[earlier].position;
        let l_pos = self.members[later].position;
        let delta_x = l_pos.x() - e_pos.x() + (a2.x - a1.x) as f64;
        let delta_y = l_pos.y() - e_pos.y() + (a2.y - a1.y) as f64;

        let mut parts = vec![
            self.absent(earlier),
            self.absent(later),
            self.time(earlier).ge(self.time(later)),
        ];

        match self.line_encoding {
            LineEncoding::Explicit => {
                let bound1 = self.parameter_bound(&delta_x, &delta_y, d2, c);
                let bound2 = self.parameter_bound(&delta_x, &delta_y, d1, c);
                let t1 = self.fresh_parameter(bound1);
                let t2 = self.fresh_parameter(bound2);

                // E + a1 + t1 d1 == L + a2 + t2 d2
                let pin_x = (LinExpr::term(t1, d1.x as f64) - LinExpr::term(t2, d2.x as f64))
                    .equals(delta_x);
                let pin_y = (LinExpr::term(t1, d1.y as f64) - LinExpr::term(t2, d2.y as f64))
                    .equals(delta_y);
                self.session.assert(pin_x);
                self.session.assert(pin_y);

                for t in [t1, t2] {
                    parts.push(LinExpr::var(t).lt(INTERSECTION_REPULSION_MIN));
                    parts.push(LinExpr::var(t).gt(INTERSECTION_REPULSION_MAX));
                }
            }
            LineEncoding::Implicit => {
                // t1 = cross(delta, d2) / c, t2 = cross(delta, d1) / c
                let t1 = (delta_x.clone() * d2.y as f64 - delta_y.clone() * d2.x as f64) * (1.0 / c);
                let t2 = (delta_x * d1.y as f64 - delta_y * d1.x as f64) * (1.0 / c);
                for t in [t1, t2] {
                    parts.push(t.clone().lt(INTERSECTION_REPULSION_MIN));
                    parts.push(t.gt(INTERSECTION_REPULSION_MAX));
                }
            }
        }

        self.session.assert(Formula::or(parts));
        self.lines_added += 1;
        true
    }

    /// Bound on `|cross(delta, d) / c|` under the variable bounds.
    fn parameter_bound(&self, delta_x: &LinExpr, delta_y: &LinExpr, d: Point, c: f64) -> f64 {
        let (xl, xh) = self.session.range(delta_x);
        let (yl, yh) = self.session.range(delta_y);
        let max_x = xl.abs().max(xh.abs());
        let max_y = yl.abs().max(yh.abs());
        (max_x * (d.y as f64).abs() + max_y * (d.x as f64).abs()) / c.abs() + 2.0
    }

    fn fresh_parameter(&mut self, bound: f64) -> VarId {
        let name = format!("line_param_{}", self.fresh_params);
        self.fresh_params += 1;
        self.session.declare_real(&name, -bound, bound)
    }

    /// Assumption literals fixing the presence of undecided arena objects.
    pub fn presence_assumptions(&self, presence: &[(usize, Presence)]) -> Vec<Formula> {
        presence
            .iter()
            .filter_map(|&(arena_index, tag)| {
                let member = self.member_of(arena_index)?;
                match tag {
                    Presence::Present => Some(self.present(member)),
                    Presence::Absent => Some(self.absent(member)),
                    Presence::Undecided => None,
                }
            })
            .filter(|f| *f != Formula::True)
            .collect()
    }

    /// Assumptions keeping the footprints of the given undecided arena objects
    /// inside `region`.
    pub fn containment_assumptions(&self, arena_indices: &[usize], region: &Region) -> Vec<Formula> {
        let mut assumptions = Vec::new();
        for &arena_index in arena_indices {
            let Some(member) = self.member_of(arena_index) else {
                continue;
            };
            let m = &self.members[member];
            if !m.position.is_variable() {
                continue;
            }
            match region {
                Region::Box { min, max } => {
                    let Some(ext) = m.shape.extents() else {
                        continue;
                    };
                    assumptions.push((m.position.x() + ext.min.x as f64).ge(min.0));
                    assumptions.push((m.position.x() + ext.max.x as f64).le(max.0));
                    assumptions.push((m.position.y() + ext.min.y as f64).ge(min.1));
                    assumptions.push((m.position.y() + ext.max.y as f64).le(max.1));
                }
                Region::Polygon(points) => {
                    let n = points.len();
                    for i in 0..n {
                        let (qx, qy) = points[i];
                        let (rx, ry) = points[(i + 1) % n];
                        let (dx, dy) = (rx - qx, ry - qy);
                        let norm = dx.abs().max(dy.abs());
                        if norm == 0.0 {
                            continue;
                        }
                        for v in m.shape.polygon.points() {
                            // cross(d, (pos + v) - q) >= 0
                            let expr = (m.position.y() + (v.y as f64 - qy)) * dx
                                - (m.position.x() + (v.x as f64 - qx)) * dy;
                            assumptions.push((expr * (1.0 / norm)).ge(0.0));
                        }
                    }
                }
            }
        }
        assumptions
    }

    /// Checks the permanent constraints under `assumptions`.
    pub fn check(&mut self, assumptions: &[Formula]) -> SatResult {
        self.session.check(assumptions)
    }

    /// State of a member in the model of the last satisfiable check.
    pub fn resolve(&self, member: MemberId) -> Option<ResolvedMember> {
        let m = &self.members[member];
        let (x, y) = match m.position {
            PositionRef::Fixed(x, y) => (x, y),
            PositionRef::Variable(x, y) => (self.session.value(x)?, self.session.value(y)?),
        };
        let t = match m.time {
            TimeRef::Fixed(t) => t,
            TimeRef::Variable(t) => self.session.value(t)?,
        };
        let present = match m.presence {
            Some(p) => self.session.value(p)?.as_f64() > 0.5,
            None => true,
        };
        Some(ResolvedMember { x, y, t, present })
    }

    /// Emits all permanent constraints of a batch.
    pub fn introduce_all(&mut self) {
        self.introduce_time_ordering();
        self.introduce_weak_nonoverlap();
        self.introduce_lepox();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::MilpSession;

    fn square_object(id: i32, half: i64, zone_half: i64) -> SolvableObject {
        SolvableObject::new(id, Polygon::rectangle(Point::new(-half, -half), Point::new(half, half)))
            .with_unreachable(vec![Polygon::rectangle(
                Point::new(-zone_half, -zone_half),
                Point::new(zone_half, zone_half),
            )])
    }

    fn config() -> SolverConfiguration {
        SolverConfiguration::default()
    }

    #[test]
    fn test_region_area_and_extents() {
        let b = Region::Box {
            min: (0.0, 0.0),
            max: (10.0, 4.0),
        };
        assert_eq!(b.area(), 40.0);
        assert_eq!(b.extents(), (10.0, 4.0));
        let p = Region::Polygon(vec![(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]);
        assert_eq!(p.area(), 8.0);
        assert_eq!(p.extents(), (4.0, 4.0));
    }

    #[test]
    fn test_members_and_bounds() {
        let objects = vec![square_object(1, 10, 20), square_object(2, 10, 20)];
        let mut builder = ConstraintBuilder::new(MilpSession::new(), &objects, &config());
        let fixed = builder.add_fixed(0, Rational::from_integer(100), Rational::from_integer(100), Rational::from_integer(48));
        let free = builder.add_undecided(1, 500.0);

        assert!(!builder.is_undecided(fixed));
        assert!(builder.is_undecided(free));
        assert_eq!(builder.member_of(1), Some(free));
        assert_eq!(builder.arena_index(fixed), Some(0));
        // x, y, t and presence
        assert_eq!(builder.session().num_vars(), 4);
        assert_eq!(builder.session().bounds(VarId::new(0)), (10.0, 2490.0));
        assert_eq!(builder.session().bounds(VarId::new(2)), (0.0, 500.0));
    }

    #[test]
    fn test_presence_assumptions() {
        let objects = vec![square_object(1, 10, 20), square_object(2, 10, 20), square_object(3, 10, 20)];
        let mut builder = ConstraintBuilder::new(MilpSession::new(), &objects, &config());
        builder.add_fixed(0, Rational::ZERO, Rational::ZERO, Rational::from_integer(32));
        builder.add_undecided(1, 100.0);
        builder.add_undecided(2, 100.0);
        let literals = builder.presence_assumptions(&[
            (0, Presence::Present),
            (1, Presence::Absent),
            (2, Presence::Undecided),
        ]);
        assert_eq!(literals.len(), 1);
    }

    #[test]
    fn test_parallel_lines_skipped() {
        let objects = vec![square_object(1, 10, 20), square_object(2, 10, 20)];
        let mut builder = ConstraintBuilder::new(MilpSession::new(), &objects, &config());
        let a = builder.add_undecided(0, 100.0);
        let b = builder.add_undecided(1, 100.0);
        let added = builder.introduce_line_nonintersection(
            a,
            (Point::new(0, 0), Point::new(10, 0)),
            b,
            (Point::new(0, 5), Point::new(20, 5)),
        );
        assert!(!added);
        assert_eq!(builder.lines_added(), 0);

        let added = builder.introduce_line_nonintersection(
            a,
            (Point::new(0, 0), Point::new(10, 0)),
            b,
            (Point::new(5, -5), Point::new(5, 5)),
        );
        assert!(added);
        // Two fresh parameters on top of 2 x 4 member variables.
        assert_eq!(builder.session().num_vars(), 10);
    }

    #[test]
    fn test_containment_assumptions_box() {
        let objects = vec![square_object(1, 10, 20)];
        let mut builder = ConstraintBuilder::new(MilpSession::new(), &objects, &config());
        builder.add_undecided(0, 100.0);
        let region = Region::Box {
            min: (0.0, 0.0),
            max: (100.0, 100.0),
        };
        assert_eq!(builder.containment_assumptions(&[0], &region).len(), 4);
        let triangle = Region::Polygon(vec![(0.0, 0.0), (100.0, 0.0), (0.0, 100.0)]);
        assert_eq!(builder.containment_assumptions(&[0], &triangle).len(), 12);
    }

    #[cfg(feature = "milp")]
    #[test]
    fn test_two_objects_are_separated() {
        let objects = vec![square_object(1, 10, 15), square_object(2, 10, 15)];
        let mut builder = ConstraintBuilder::new(MilpSession::new(), &objects, &config());
        let a = builder.add_undecided(0, 200.0);
        let b = builder.add_undecided(1, 200.0);
        builder.introduce_all();

        let mut assumptions = builder.presence_assumptions(&[(0, Presence::Present), (1, Presence::Present)]);
        assumptions.extend(builder.containment_assumptions(
            &[0, 1],
            &Region::Box {
                min: (0.0, 0.0),
                max: (60.0, 30.0),
            },
        ));
        assert_eq!(builder.check(&assumptions), SatResult::Sat);

        let ra = builder.resolve(a).unwrap();
        let rb = builder.resolve(b).unwrap();
        assert!(ra.present && rb.present);
        assert!((ra.t - rb.t).as_f64().abs() > 16.0);
        // Squares of half-size 10 with zones of half-size 15 need 25 apart.
        let dx = (ra.x - rb.x).as_f64().abs();
        let dy = (ra.y - rb.y).as_f64().abs();
        assert!(dx >= 25.0 - 0.1 || dy >= 25.0 - 0.1, "dx={} dy={}", dx, dy);
    }

    #[cfg(feature = "milp")]
    #[test]
    fn test_absent_member_is_ignored() {
        let objects = vec![square_object(1, 10, 15), square_object(2, 10, 15)];
        let mut builder = ConstraintBuilder::new(MilpSession::new(), &objects, &config());
        builder.add_undecided(0, 200.0);
        builder.add_undecided(1, 200.0);
        builder.introduce_all();

        let region = Region::Box {
            min: (0.0, 0.0),
            max: (30.0, 30.0),
        };
        let mut both = builder.presence_assumptions(&[(0, Presence::Present), (1, Presence::Present)]);
        both.extend(builder.containment_assumptions(&[0, 1], &region));
        assert_ne!(builder.check(&both), SatResult::Sat);

        let mut one = builder.presence_assumptions(&[(0, Presence::Present), (1, Presence::Absent)]);
        one.extend(builder.containment_assumptions(&[0], &region));
        assert_eq!(builder.check(&one), SatResult::Sat);
    }

    #[cfg(feature = "milp")]
    #[test]
    fn test_lepox_window() {
        let objects = vec![
            square_object(1, 10, 12).glued(true),
            square_object(2, 10, 12),
        ];
        let mut builder = ConstraintBuilder::new(MilpSession::new(), &objects, &config());
        let a = builder.add_undecided(0, 400.0);
        let b = builder.add_undecided(1, 400.0);
        builder.introduce_all();
        let assumptions = builder.presence_assumptions(&[(0, Presence::Present), (1, Presence::Present)]);
        assert_eq!(builder.check(&assumptions), SatResult::Sat);

        let ta = builder.resolve(a).unwrap().t.as_f64();
        let tb = builder.resolve(b).unwrap().t.as_f64();
        let gap = tb - ta;
        assert!(gap >= 16.0 && gap <= 24.0 + 0.05, "gap {}", gap);
    }

    #[cfg(feature = "milp")]
    #[test]
    fn test_lepox_window_is_closed() {
        let objects = vec![
            square_object(1, 10, 12).glued(true),
            square_object(2, 10, 12),
        ];
        let mut builder = ConstraintBuilder::new(MilpSession::new(), &objects, &config());
        let a = builder.add_undecided(0, 400.0);
        let b = builder.add_undecided(1, 400.0);
        builder.introduce_all();
        let presence = builder.presence_assumptions(&[(0, Presence::Present), (1, Presence::Present)]);

        let with_gap = |builder: &ConstraintBuilder<'_, MilpSession>, gap: f64| {
            let mut assumptions = presence.clone();
            assumptions.push(builder.time(b).equals(builder.time(a) + gap));
            assumptions
        };
        for gap in [16.0, 24.0] {
            let assumptions = with_gap(&builder, gap);
            assert_eq!(builder.check(&assumptions), SatResult::Sat, "gap {}", gap);
        }
        for gap in [15.0, 25.0] {
            let assumptions = with_gap(&builder, gap);
            assert_eq!(builder.check(&assumptions), SatResult::Unsat, "gap {}", gap);
        }
    }

    #[cfg(feature = "milp")]
    #[test]
    fn test_successor_needs_predecessor() {
        let objects = vec![
            square_object(1, 10, 12).glued(true),
            square_object(2, 10, 12),
        ];
        let mut builder = ConstraintBuilder::new(MilpSession::new(), &objects, &config());
        builder.add_undecided(0, 400.0);
        builder.add_undecided(1, 400.0);
        builder.introduce_all();
        let assumptions = builder.presence_assumptions(&[(0, Presence::Absent), (1, Presence::Present)]);
        assert_eq!(builder.check(&assumptions), SatResult::Unsat);
    }
}
