//! # Seqarrange Core
//!
//! Core types for the sequential print arrangement engine.
//!
//! This crate provides the foundational pieces that the scheduling crate builds
//! on: exact rationals for solver-derived values, integer polygon geometry with
//! robust predicates, the linear-arithmetic solver capability, progress
//! reporting and the result types.
//!
//! ## Core Components
//!
//! - **Exact arithmetic**: [`Rational`]
//! - **Geometry**: [`Point`], [`Polygon`], [`BoundingBox`], [`convex_hull`]
//! - **Predicates**: [`robust`] segment and containment tests
//! - **Solver capability**: [`LinearSolver`], [`Formula`], [`LinExpr`], [`SatResult`]
//! - **Progress**: [`ProgressRange`], [`ProgressReporter`]
//! - **Results**: [`ScheduledPlate`], [`SolvedPlate`]
//!
//! ## Example
//!
//! ```rust
//! use seqarrange_core::{Point, Polygon};
//!
//! let footprint = Polygon::rectangle(Point::new(-50, -50), Point::new(50, 50));
//! let nozzle = Polygon::rectangle(Point::new(-5, -5), Point::new(5, 5));
//! let zone = footprint.minkowski_sum(&nozzle);
//! assert_eq!(zone.bounding_box().unwrap().width(), 110);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod error;
pub mod geometry;
pub mod progress;
pub mod rational;
pub mod result;
pub mod robust;
pub mod solver;

// Re-exports
pub use error::{Error, Result};
pub use geometry::{convex_hull, convex_hull_of, BoundingBox, Coord, ObjectId, Point, Polygon};
pub use progress::{ProgressRange, ProgressReporter, PROGRESS_RANGE};
pub use rational::{Rational, RATIONAL_PRECISION};
pub use result::{ScheduledObject, ScheduledPlate, SolvedObject, SolvedPlate};
pub use solver::{Formula, LinExpr, LinearSolver, Rel, SatResult, VarId};
