//! Linear-arithmetic solver capability.
//!
//! The arrangement engine states its problem as boolean combinations of
//! linear (in)equalities over bounded real and boolean variables, and hands
//! them to a [`LinearSolver`] session. A session accumulates permanent
//! constraints and answers satisfiability queries under transient
//! assumptions, which do not persist across calls.
//!
//! ```rust
//! use seqarrange_core::solver::{Formula, LinExpr};
//! use seqarrange_core::VarId;
//!
//! let x = VarId::new(0);
//! let y = VarId::new(1);
//!
//! // x + 2 <= y  or  y + 2 <= x
//! let apart = Formula::or(vec![
//!     (LinExpr::var(x) + 2.0).le(LinExpr::var(y)),
//!     (LinExpr::var(y) + 2.0).le(LinExpr::var(x)),
//! ]);
//! assert!(apart.holds(&|v| if v == x { 0.0 } else { 5.0 }, 1e-9));
//! ```

use std::ops::{Add, Mul, Neg, Sub};
use std::time::Duration;

use crate::rational::Rational;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle of a variable declared in a solver session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VarId(usize);

impl VarId {
    /// Wraps a session-local variable index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Session-local index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Linear expression `sum(coef * var) + constant`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinExpr {
    /// Constant expression.
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// A single variable with coefficient one.
    pub fn var(var: VarId) -> Self {
        Self::term(var, 1.0)
    }

    /// A single weighted variable.
    pub fn term(var: VarId, coef: f64) -> Self {
        Self {
            terms: vec![(var, coef)],
            constant: 0.0,
        }
    }

    /// Adds `coef * var` in place, merging repeated variables.
    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef == 0.0 {
            return;
        }
        match self.terms.iter_mut().find(|(v, _)| *v == var) {
            Some((_, c)) => *c += coef,
            None => self.terms.push((var, coef)),
        }
    }

    /// Variable terms.
    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    /// Constant part.
    pub fn constant_part(&self) -> f64 {
        self.constant
    }

    /// Returns true if the expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(|(_, c)| *c == 0.0)
    }

    /// Evaluates the expression under an assignment.
    pub fn eval(&self, value: &dyn Fn(VarId) -> f64) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, &(v, c)| acc + c * value(v))
    }

    /// `self < rhs`.
    pub fn lt(self, rhs: impl Into<LinExpr>) -> Formula {
        Formula::atom(self - rhs.into(), Rel::Lt)
    }

    /// `self <= rhs`.
    pub fn le(self, rhs: impl Into<LinExpr>) -> Formula {
        Formula::atom(self - rhs.into(), Rel::Le)
    }

    /// `self == rhs`.
    pub fn equals(self, rhs: impl Into<LinExpr>) -> Formula {
        Formula::atom(self - rhs.into(), Rel::Eq)
    }

    /// `self >= rhs`.
    pub fn ge(self, rhs: impl Into<LinExpr>) -> Formula {
        Formula::atom(self - rhs.into(), Rel::Ge)
    }

    /// `self > rhs`.
    pub fn gt(self, rhs: impl Into<LinExpr>) -> Formula {
        Formula::atom(self - rhs.into(), Rel::Gt)
    }
}

impl From<f64> for LinExpr {
    fn from(value: f64) -> Self {
        LinExpr::constant(value)
    }
}

impl From<VarId> for LinExpr {
    fn from(var: VarId) -> Self {
        LinExpr::var(var)
    }
}

impl From<Rational> for LinExpr {
    fn from(value: Rational) -> Self {
        LinExpr::constant(value.as_f64())
    }
}

impl Add for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: LinExpr) -> LinExpr {
        for (v, c) in rhs.terms {
            self.add_term(v, c);
        }
        self.constant += rhs.constant;
        self
    }
}

impl Add<f64> for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: f64) -> LinExpr {
        self.constant += rhs;
        self
    }
}

impl Sub for LinExpr {
    type Output = LinExpr;

    fn sub(self, rhs: LinExpr) -> LinExpr {
        self + (-rhs)
    }
}

impl Sub<f64> for LinExpr {
    type Output = LinExpr;

    fn sub(mut self, rhs: f64) -> LinExpr {
        self.constant -= rhs;
        self
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;

    fn mul(mut self, rhs: f64) -> LinExpr {
        if rhs == 0.0 {
            return LinExpr::default();
        }
        for (_, c) in &mut self.terms {
            *c *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        self * -1.0
    }
}

/// Relation of an atom's expression to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rel {
    /// `expr < 0`
    Lt,
    /// `expr <= 0`
    Le,
    /// `expr == 0`
    Eq,
    /// `expr >= 0`
    Ge,
    /// `expr > 0`
    Gt,
}

/// Boolean combination of linear atoms.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// Always satisfied.
    True,
    /// Never satisfied.
    False,
    /// `expr rel 0`.
    Atom {
        /// Left-hand side; the right-hand side is zero.
        expr: LinExpr,
        /// Relation.
        rel: Rel,
    },
    /// Conjunction.
    And(Vec<Formula>),
    /// Disjunction.
    Or(Vec<Formula>),
}

impl Formula {
    /// Builds an atom, folding constant expressions to `True`/`False`.
    pub fn atom(expr: LinExpr, rel: Rel) -> Formula {
        if expr.is_constant() {
            let v = expr.constant;
            let holds = match rel {
                Rel::Lt => v < 0.0,
                Rel::Le => v <= 0.0,
                Rel::Eq => v == 0.0,
                Rel::Ge => v >= 0.0,
                Rel::Gt => v > 0.0,
            };
            return if holds { Formula::True } else { Formula::False };
        }
        Formula::Atom { expr, rel }
    }

    /// Conjunction with flattening and constant folding.
    pub fn and(parts: Vec<Formula>) -> Formula {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Formula::True => {}
                Formula::False => return Formula::False,
                Formula::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Formula::True,
            1 => flat.pop().unwrap_or(Formula::True),
            _ => Formula::And(flat),
        }
    }

    /// Disjunction with flattening and constant folding.
    pub fn or(parts: Vec<Formula>) -> Formula {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Formula::False => {}
                Formula::True => return Formula::True,
                Formula::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Formula::False,
            1 => flat.pop().unwrap_or(Formula::False),
            _ => Formula::Or(flat),
        }
    }

    /// `premise -> conclusion`.
    pub fn implies(premise: Formula, conclusion: Formula) -> Formula {
        Formula::or(vec![premise.negate(), conclusion])
    }

    /// Logical negation, pushed down to the atoms.
    pub fn negate(self) -> Formula {
        match self {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Atom { expr, rel } => match rel {
                Rel::Lt => Formula::atom(expr, Rel::Ge),
                Rel::Le => Formula::atom(expr, Rel::Gt),
                Rel::Ge => Formula::atom(expr, Rel::Lt),
                Rel::Gt => Formula::atom(expr, Rel::Le),
                Rel::Eq => Formula::or(vec![
                    Formula::atom(expr.clone(), Rel::Lt),
                    Formula::atom(expr, Rel::Gt),
                ]),
            },
            Formula::And(parts) => Formula::or(parts.into_iter().map(Formula::negate).collect()),
            Formula::Or(parts) => Formula::and(parts.into_iter().map(Formula::negate).collect()),
        }
    }

    /// Evaluates the formula under an assignment, allowing `tolerance` slack
    /// on every atom.
    pub fn holds(&self, value: &dyn Fn(VarId) -> f64, tolerance: f64) -> bool {
        match self {
            Formula::True => true,
            Formula::False => false,
            Formula::Atom { expr, rel } => {
                let v = expr.eval(value);
                match rel {
                    Rel::Lt => v < tolerance,
                    Rel::Le => v <= tolerance,
                    Rel::Eq => v.abs() <= tolerance,
                    Rel::Ge => v >= -tolerance,
                    Rel::Gt => v > -tolerance,
                }
            }
            Formula::And(parts) => parts.iter().all(|p| p.holds(value, tolerance)),
            Formula::Or(parts) => parts.iter().any(|p| p.holds(value, tolerance)),
        }
    }
}

/// Answer of a satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SatResult {
    /// A model was found and can be queried with [`LinearSolver::value`].
    Sat,
    /// No model exists.
    Unsat,
    /// Timeout or backend failure; callers treat it as unsatisfiable.
    Unknown,
}

impl SatResult {
    /// Returns true only for [`SatResult::Sat`].
    pub fn is_sat(self) -> bool {
        matches!(self, SatResult::Sat)
    }
}

impl std::fmt::Display for SatResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sat => write!(f, "sat"),
            Self::Unsat => write!(f, "unsat"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// An incremental decision procedure over linear arithmetic.
pub trait LinearSolver {
    /// Declares a real variable with finite bounds.
    fn declare_real(&mut self, name: &str, lower: f64, upper: f64) -> VarId;

    /// Declares a boolean variable, usable in atoms as a 0/1 quantity.
    fn declare_bool(&mut self, name: &str) -> VarId;

    /// Declared bounds of a variable.
    fn bounds(&self, var: VarId) -> (f64, f64);

    /// Adds a permanent constraint.
    fn assert(&mut self, formula: Formula);

    /// Checks satisfiability of the permanent constraints together with the
    /// given assumptions.
    fn check(&mut self, assumptions: &[Formula]) -> SatResult;

    /// Value of a variable in the model of the last satisfiable check.
    fn value(&self, var: VarId) -> Option<Rational>;

    /// Wall-clock limit for each subsequent check.
    fn set_timeout(&mut self, timeout: Duration);

    /// Interval an expression can take under the declared variable bounds.
    fn range(&self, expr: &LinExpr) -> (f64, f64) {
        expr.terms()
            .iter()
            .fold((expr.constant_part(), expr.constant_part()), |(lo, hi), &(v, c)| {
                let (vl, vh) = self.bounds(v);
                if c >= 0.0 {
                    (lo + c * vl, hi + c * vh)
                } else {
                    (lo + c * vh, hi + c * vl)
                }
            })
    }
}
