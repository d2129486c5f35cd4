//! Exact rational numbers for solver-derived coordinates and times.
//!
//! Every position and schedule time that comes back from the solver is held as
//! a [`Rational`] rather than an `f64`, so that repeated refinement rounds see
//! the same values they stored. Values read from a model are snapped to a fixed
//! precision of `1 / RATIONAL_PRECISION` which suppresses solver noise.
//!
//! ```rust
//! use seqarrange_core::Rational;
//!
//! let half = Rational::new(1, 2).unwrap();
//! let x = half * 3 + 1;
//! assert_eq!(x, Rational::new(5, 2).unwrap());
//! assert_eq!(x.as_i64(), 2);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed precision used by [`Rational::normalize`] and model extraction.
pub const RATIONAL_PRECISION: i64 = 1_000_000;

/// A rational number `numerator / denominator` with 64-bit components.
///
/// The denominator is never zero. The sign may be carried by either
/// component; comparisons and predicates account for both.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rational {
    numerator: i64,
    denominator: i64,
}

impl Rational {
    /// Zero.
    pub const ZERO: Rational = Rational {
        numerator: 0,
        denominator: 1,
    };

    /// One.
    pub const ONE: Rational = Rational {
        numerator: 1,
        denominator: 1,
    };

    /// Creates `numerator / denominator`.
    pub fn new(numerator: i64, denominator: i64) -> Result<Self> {
        if denominator == 0 {
            return Err(Error::InvariantViolation(format!(
                "rational {}/0 has a zero denominator",
                numerator
            )));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Creates an integral rational.
    pub const fn from_integer(value: i64) -> Self {
        Self {
            numerator: value,
            denominator: 1,
        }
    }

    /// Converts a value reported by a solver into a fixed-precision rational.
    pub fn from_solver_value(value: f64) -> Self {
        let scaled = (value * RATIONAL_PRECISION as f64).round();
        let clamped = scaled.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Self::reduced(clamped as i128, RATIONAL_PRECISION as i128)
    }

    /// Returns the numerator as stored.
    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    /// Returns the denominator as stored.
    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    /// Returns true if the value is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        (self.numerator > 0 && self.denominator > 0) || (self.numerator < 0 && self.denominator < 0)
    }

    /// Returns true if the value is strictly less than zero.
    pub fn is_negative(&self) -> bool {
        (self.numerator > 0 && self.denominator < 0) || (self.numerator < 0 && self.denominator > 0)
    }

    /// Returns true if the value is zero.
    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    /// Lossy conversion to `f64`.
    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Integer part, truncated toward zero.
    pub fn as_i64(&self) -> i64 {
        self.numerator / self.denominator
    }

    /// Rounds to the nearest multiple of `1 / RATIONAL_PRECISION`.
    pub fn normalize(&self) -> Self {
        let (n, d) = self.signed_parts();
        let scaled = n * RATIONAL_PRECISION as i128;
        let half = d / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / d
        } else {
            (scaled - half) / d
        };
        Self::reduced(rounded, RATIONAL_PRECISION as i128)
    }

    fn signed_parts(&self) -> (i128, i128) {
        let (n, d) = (self.numerator as i128, self.denominator as i128);
        if d < 0 {
            (-n, -d)
        } else {
            (n, d)
        }
    }

    /// Builds a rational from wide components with `d > 0`, reducing by the gcd
    /// and falling back to fixed precision when the result exceeds 64 bits.
    fn reduced(n: i128, d: i128) -> Self {
        let g = gcd(n.unsigned_abs(), d.unsigned_abs()).max(1) as i128;
        let (n, d) = (n / g, d / g);
        if let (Ok(numerator), Ok(denominator)) = (i64::try_from(n), i64::try_from(d)) {
            return Self {
                numerator,
                denominator,
            };
        }
        let precision = RATIONAL_PRECISION as i128;
        let approx = n
            .checked_mul(precision)
            .map_or_else(|| (n / d).saturating_mul(precision), |scaled| scaled / d);
        let numerator = approx.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Self {
            numerator,
            denominator: RATIONAL_PRECISION,
        }
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl PartialEq for Rational {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rational {}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let (an, ad) = self.signed_parts();
        let (bn, bd) = other.signed_parts();
        (an * bd).cmp(&(bn * ad))
    }
}

impl Add for Rational {
    type Output = Rational;

    fn add(self, rhs: Rational) -> Rational {
        let (an, ad) = self.signed_parts();
        let (bn, bd) = rhs.signed_parts();
        let (left, right, d) = (an * bd, bn * ad, ad * bd);
        match left.checked_add(right) {
            Some(n) => Rational::reduced(n, d),
            // Only reachable with both denominators near 2^63.
            None => Rational::reduced(left / 2 + right / 2, (d / 2).max(1)),
        }
    }
}

impl Sub for Rational {
    type Output = Rational;

    fn sub(self, rhs: Rational) -> Rational {
        self + (-rhs)
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        let (n, d) = self.signed_parts();
        Rational::reduced(-n, d)
    }
}

impl Add<i64> for Rational {
    type Output = Rational;

    fn add(self, rhs: i64) -> Rational {
        let (n, d) = self.signed_parts();
        Rational::reduced(n + rhs as i128 * d, d)
    }
}

impl Mul<i64> for Rational {
    type Output = Rational;

    fn mul(self, rhs: i64) -> Rational {
        let (n, d) = self.signed_parts();
        Rational::reduced(n * rhs as i128, d)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
