//! MILP-backed linear-arithmetic session.
//!
//! [`MilpSession`] implements [`LinearSolver`] on top of the HiGHS solver via
//! the `good_lp` crate. Every check re-encodes the permanent constraints and
//! the assumptions into a fresh feasibility MILP:
//!
//! - Real variables keep their declared bounds; boolean variables become
//!   binaries.
//! - A disjunction gets one activation binary per disjunct and a covering row
//!   `sum(b) >= a`, where `a` is the activation of the enclosing formula.
//! - An atom `g <= c` under activation `a` becomes `g <= c + M (1 - a)`, with
//!   `M` computed from the interval of `g` under the variable bounds, so no
//!   global big-M constant is needed.
//! - Strict inequalities are enforced with a margin
//!   ([`MilpSettings::strict_margin`]).
//!
//! A model returned by HiGHS is checked against every formula before it is
//! accepted. A model that fails that check, a timeout and a backend error all
//! yield [`SatResult::Unknown`], which callers treat as unsatisfiable.
//!
//! # Example
//!
//! ```ignore
//! use seqarrange_core::{LinExpr, LinearSolver, SatResult};
//! use seqarrange_sequential::milp::MilpSession;
//!
//! let mut session = MilpSession::new();
//! let x = session.declare_real("x", 0.0, 10.0);
//! session.assert(LinExpr::var(x).ge(4.0));
//! assert_eq!(session.check(&[LinExpr::var(x).le(5.0)]), SatResult::Sat);
//! assert_eq!(session.check(&[LinExpr::var(x).lt(3.0)]), SatResult::Unsat);
//! ```

use std::time::Duration;

use seqarrange_core::{Formula, LinearSolver, Rational, SatResult, VarId};

#[cfg(feature = "milp")]
use seqarrange_core::{LinExpr, Rel};

#[cfg(feature = "milp")]
use good_lp::solvers::highs::highs;
#[cfg(feature = "milp")]
use good_lp::{
    constraint, variable, Constraint, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};

/// Tuning of the MILP encoding.
#[derive(Debug, Clone)]
pub struct MilpSettings {
    /// Amount by which strict inequalities are tightened.
    pub strict_margin: f64,
    /// Slack allowed when checking a returned model against the formulas.
    pub verification_tolerance: f64,
    /// Forward HiGHS output to stdout.
    pub verbose: bool,
}

impl Default for MilpSettings {
    fn default() -> Self {
        Self {
            strict_margin: 0.05,
            verification_tolerance: 0.02,
            verbose: false,
        }
    }
}

impl MilpSettings {
    /// Sets the strict-inequality margin.
    pub fn with_strict_margin(mut self, margin: f64) -> Self {
        self.strict_margin = margin;
        self
    }

    /// Sets the model verification tolerance.
    pub fn with_verification_tolerance(mut self, tolerance: f64) -> Self {
        self.verification_tolerance = tolerance;
        self
    }

    /// Enables solver output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[derive(Debug, Clone)]
struct VarDecl {
    name: String,
    lower: f64,
    upper: f64,
    boolean: bool,
}

/// Incremental session over the HiGHS MILP solver.
#[derive(Debug)]
pub struct MilpSession {
    vars: Vec<VarDecl>,
    constraints: Vec<Formula>,
    model: Option<Vec<f64>>,
    timeout: Duration,
    settings: MilpSettings,
    checks: usize,
}

impl Default for MilpSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MilpSession {
    /// Creates an empty session with default settings.
    pub fn new() -> Self {
        Self::with_settings(MilpSettings::default())
    }

    /// Creates an empty session.
    pub fn with_settings(settings: MilpSettings) -> Self {
        Self {
            vars: Vec::new(),
            constraints: Vec::new(),
            model: None,
            timeout: Duration::from_secs(8),
            settings,
            checks: 0,
        }
    }

    /// Number of declared variables.
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// Number of permanent constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Number of satisfiability checks performed.
    pub fn num_checks(&self) -> usize {
        self.checks
    }

    fn model_value(&self, var: VarId) -> f64 {
        self.model
            .as_ref()
            .and_then(|m| m.get(var.index()).copied())
            .unwrap_or(0.0)
    }

    fn verify(&self, assumptions: &[Formula]) -> bool {
        let value = |v: VarId| self.model_value(v);
        let tol = self.settings.verification_tolerance;
        self.constraints
            .iter()
            .chain(assumptions.iter())
            .all(|f| f.holds(&value, tol))
    }

    #[cfg(feature = "milp")]
    fn solve(&mut self, assumptions: &[Formula]) -> SatResult {
        let mut encoder = Encoder::new(&self.vars, self.settings.strict_margin);
        for formula in self.constraints.iter().chain(assumptions.iter()) {
            encoder.encode(formula, None);
            if encoder.infeasible {
                log::debug!("Constraint set is trivially infeasible");
                return SatResult::Unsat;
            }
        }

        log::debug!(
            "Solving MILP with {} variables, {} binaries, {} rows",
            self.vars.len(),
            encoder.binaries,
            encoder.rows.len()
        );

        let Encoder {
            problem_vars,
            mapped,
            rows,
            ..
        } = encoder;

        let mut problem = problem_vars
            .minimise(Expression::from(0.0))
            .using(highs)
            .set_verbose(self.settings.verbose)
            .set_time_limit(self.timeout.as_secs_f64());
        for row in rows {
            problem = problem.with(row);
        }

        match problem.solve() {
            Ok(solution) => {
                self.model = Some(mapped.iter().map(|&v| solution.value(v)).collect());
                if self.verify(assumptions) {
                    SatResult::Sat
                } else {
                    log::warn!("MILP model failed verification, treating check as unknown");
                    self.model = None;
                    SatResult::Unknown
                }
            }
            Err(ResolutionError::Infeasible) => SatResult::Unsat,
            Err(e) => {
                log::warn!("MILP solver error: {:?}", e);
                SatResult::Unknown
            }
        }
    }

    #[cfg(not(feature = "milp"))]
    fn solve(&mut self, _assumptions: &[Formula]) -> SatResult {
        log::warn!("MILP solver not available (compile with 'milp' feature)");
        SatResult::Unknown
    }
}

impl LinearSolver for MilpSession {
    fn declare_real(&mut self, name: &str, lower: f64, upper: f64) -> VarId {
        self.vars.push(VarDecl {
            name: name.to_string(),
            lower: lower.min(upper),
            upper: upper.max(lower),
            boolean: false,
        });
        VarId::new(self.vars.len() - 1)
    }

    fn declare_bool(&mut self, name: &str) -> VarId {
        self.vars.push(VarDecl {
            name: name.to_string(),
            lower: 0.0,
            upper: 1.0,
            boolean: true,
        });
        VarId::new(self.vars.len() - 1)
    }

    fn bounds(&self, var: VarId) -> (f64, f64) {
        self.vars
            .get(var.index())
            .map(|d| (d.lower, d.upper))
            .unwrap_or((0.0, 0.0))
    }

    fn assert(&mut self, formula: Formula) {
        if formula != Formula::True {
            self.constraints.push(formula);
        }
    }

    fn check(&mut self, assumptions: &[Formula]) -> SatResult {
        self.checks += 1;
        self.model = None;

        let trivially_false = self
            .constraints
            .iter()
            .chain(assumptions.iter())
            .any(|f| *f == Formula::False);
        if trivially_false {
            return SatResult::Unsat;
        }

        if self.vars.is_empty() {
            self.model = Some(Vec::new());
            return if self.verify(assumptions) {
                SatResult::Sat
            } else {
                self.model = None;
                SatResult::Unsat
            };
        }

        self.solve(assumptions)
    }

    fn value(&self, var: VarId) -> Option<Rational> {
        self.model
            .as_ref()
            .and_then(|m| m.get(var.index()))
            .map(|&v| Rational::from_solver_value(v))
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

/// Translation of formulas into MILP rows.
#[cfg(feature = "milp")]
struct Encoder<'a> {
    decls: &'a [VarDecl],
    problem_vars: ProblemVariables,
    mapped: Vec<Variable>,
    rows: Vec<Constraint>,
    margin: f64,
    binaries: usize,
    infeasible: bool,
}

#[cfg(feature = "milp")]
impl<'a> Encoder<'a> {
    fn new(decls: &'a [VarDecl], margin: f64) -> Self {
        let mut problem_vars = ProblemVariables::new();
        let mapped = decls
            .iter()
            .map(|d| {
                if d.boolean {
                    problem_vars.add(variable().binary().name(d.name.clone()))
                } else {
                    problem_vars.add(variable().min(d.lower).max(d.upper).name(d.name.clone()))
                }
            })
            .collect();
        Self {
            decls,
            problem_vars,
            mapped,
            rows: Vec::new(),
            margin,
            binaries: 0,
            infeasible: false,
        }
    }

    fn activation(&mut self) -> Variable {
        self.binaries += 1;
        self.problem_vars
            .add(variable().binary().name(format!("act_{}", self.binaries)))
    }

    fn range(&self, expr: &LinExpr) -> (f64, f64) {
        expr.terms()
            .iter()
            .fold((expr.constant_part(), expr.constant_part()), |(lo, hi), &(v, c)| {
                let d = &self.decls[v.index()];
                if c >= 0.0 {
                    (lo + c * d.lower, hi + c * d.upper)
                } else {
                    (lo + c * d.upper, hi + c * d.lower)
                }
            })
    }

    fn expression(&self, expr: &LinExpr) -> Expression {
        expr.terms()
            .iter()
            .fold(Expression::from(expr.constant_part()), |acc, &(v, c)| {
                acc + c * self.mapped[v.index()]
            })
    }

    fn encode(&mut self, formula: &Formula, active: Option<Variable>) {
        match formula {
            Formula::True => {}
            Formula::False => match active {
                Some(a) => self.rows.push(constraint!(a <= 0.0)),
                None => self.infeasible = true,
            },
            Formula::Atom { expr, rel } => {
                let margin = self.margin;
                match rel {
                    Rel::Lt => self.encode_le(expr.clone(), -margin, active),
                    Rel::Le => self.encode_le(expr.clone(), 0.0, active),
                    Rel::Ge => self.encode_le(-expr.clone(), 0.0, active),
                    Rel::Gt => self.encode_le(-expr.clone(), -margin, active),
                    Rel::Eq => {
                        self.encode_le(expr.clone(), 0.0, active);
                        self.encode_le(-expr.clone(), 0.0, active);
                    }
                }
            }
            Formula::And(parts) => {
                for part in parts {
                    self.encode(part, active);
                }
            }
            Formula::Or(parts) => {
                if parts.len() == 1 {
                    self.encode(&parts[0], active);
                    return;
                }
                let mut cover = Expression::from(0.0);
                for part in parts {
                    let b = self.activation();
                    cover += b;
                    self.encode(part, Some(b));
                }
                match active {
                    Some(a) => self.rows.push(constraint!(cover - a >= 0.0)),
                    None => self.rows.push(constraint!(cover >= 1.0)),
                }
            }
        }
    }

    /// Encodes `expr <= rhs`, relaxed when `active` is zero.
    fn encode_le(&mut self, expr: LinExpr, rhs: f64, active: Option<Variable>) {
        let (lo, hi) = self.range(&expr);
        if hi <= rhs {
            return;
        }
        if lo > rhs {
            match active {
                Some(a) => self.rows.push(constraint!(a <= 0.0)),
                None => self.infeasible = true,
            }
            return;
        }
        let lhs = self.expression(&expr);
        match active {
            Some(a) => {
                let big_m = hi - rhs;
                self.rows.push(constraint!(lhs + big_m * a <= rhs + big_m));
            }
            None => self.rows.push(constraint!(lhs <= rhs)),
        }
    }
}

/// Check if the MILP backend is compiled in.
pub fn is_milp_available() -> bool {
    cfg!(feature = "milp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqarrange_core::LinExpr;

    #[test]
    fn test_is_milp_available() {
        assert_eq!(is_milp_available(), cfg!(feature = "milp"));
    }

    #[test]
    fn test_declarations() {
        let mut session = MilpSession::new();
        let x = session.declare_real("x", 5.0, -5.0);
        let b = session.declare_bool("b");
        assert_eq!(session.bounds(x), (-5.0, 5.0));
        assert_eq!(session.bounds(b), (0.0, 1.0));
        assert_eq!(session.num_vars(), 2);
        session.assert(Formula::True);
        assert_eq!(session.num_constraints(), 0);
    }

    #[test]
    fn test_trivially_false_is_unsat() {
        let mut session = MilpSession::new();
        let x = session.declare_real("x", 0.0, 1.0);
        session.assert(LinExpr::var(x).ge(0.0));
        assert_eq!(session.check(&[Formula::False]), SatResult::Unsat);
        assert!(session.value(x).is_none());
        assert_eq!(session.num_checks(), 1);
    }

    #[test]
    fn test_no_variables() {
        let mut session = MilpSession::new();
        assert_eq!(session.check(&[]), SatResult::Sat);
    }

    #[cfg(feature = "milp")]
    #[test]
    fn test_bounds_and_assumptions() {
        let mut session = MilpSession::new();
        let x = session.declare_real("x", 0.0, 10.0);
        session.assert(LinExpr::var(x).ge(4.0));

        assert_eq!(session.check(&[LinExpr::var(x).le(5.0)]), SatResult::Sat);
        let v = session.value(x).unwrap().as_f64();
        assert!((4.0 - 1e-6..=5.0 + 1e-6).contains(&v));

        assert_eq!(session.check(&[LinExpr::var(x).lt(3.0)]), SatResult::Unsat);
        // Assumptions do not persist.
        assert_eq!(session.check(&[]), SatResult::Sat);
    }

    #[cfg(feature = "milp")]
    #[test]
    fn test_disjunction() {
        let mut session = MilpSession::new();
        let x = session.declare_real("x", 0.0, 100.0);
        let y = session.declare_real("y", 0.0, 100.0);
        session.assert(Formula::or(vec![
            (LinExpr::var(x) + 10.0).le(LinExpr::var(y)),
            (LinExpr::var(y) + 10.0).le(LinExpr::var(x)),
        ]));

        let assumptions = [LinExpr::var(x).le(5.0), LinExpr::var(y).le(20.0)];
        assert_eq!(session.check(&assumptions), SatResult::Sat);
        let vx = session.value(x).unwrap().as_f64();
        let vy = session.value(y).unwrap().as_f64();
        assert!(vy - vx >= 10.0 - 1e-3);

        let tight = [LinExpr::var(x).le(5.0), LinExpr::var(y).le(5.0)];
        assert_eq!(session.check(&tight), SatResult::Unsat);
    }

    #[cfg(feature = "milp")]
    #[test]
    fn test_strict_inequality_and_equality() {
        let mut session = MilpSession::new();
        let x = session.declare_real("x", -10.0, 10.0);
        let y = session.declare_real("y", -10.0, 10.0);
        session.assert(LinExpr::var(x).gt(LinExpr::var(y)));
        session.assert((LinExpr::var(x) + LinExpr::var(y)).equals(2.0));
        assert_eq!(session.check(&[LinExpr::var(x).le(1.0)]), SatResult::Sat);
        let vx = session.value(x).unwrap().as_f64();
        let vy = session.value(y).unwrap().as_f64();
        assert!(vx > vy);
        assert!((vx + vy - 2.0).abs() < 1e-3);
    }

    #[cfg(feature = "milp")]
    #[test]
    fn test_boolean_guard() {
        let mut session = MilpSession::new();
        let p = session.declare_bool("present");
        let x = session.declare_real("x", 0.0, 10.0);
        // present -> x >= 8
        session.assert(Formula::or(vec![
            LinExpr::var(p).le(0.0),
            LinExpr::var(x).ge(8.0),
        ]));
        let absent = [LinExpr::var(p).le(0.0), LinExpr::var(x).le(1.0)];
        assert_eq!(session.check(&absent), SatResult::Sat);
        let present = [LinExpr::var(p).ge(1.0), LinExpr::var(x).le(1.0)];
        assert_eq!(session.check(&present), SatResult::Unsat);
    }

    #[cfg(not(feature = "milp"))]
    #[test]
    fn test_stub_reports_unknown() {
        let mut session = MilpSession::new();
        let x = session.declare_real("x", 0.0, 1.0);
        session.assert(LinExpr::var(x).ge(0.5));
        assert_eq!(session.check(&[]), SatResult::Unknown);
    }
}
