//! # Seqarrange Sequential
//!
//! Placement and scheduling of objects for sequential 3D printing.
//!
//! In sequential printing each object is printed completely before the next
//! one starts. The printing hardware (nozzle, extruder body, hose, gantry)
//! sweeps a region around the object it is printing, so every object printed
//! earlier must stay clear of that region. This crate decides a position and a
//! print time for each object, packs plates tightly, and spreads the list
//! over as many plates as needed.
//!
//! ## Features
//!
//! - Convex footprints and per-height unreachable zones from printer geometry
//! - Batched solving with immovable earlier decisions
//! - Lazy segment refinement on top of vertex separation
//! - Binary or linear shrinking of the usable plate region
//! - Glued objects printed back to back, also across plates
//! - Conflict and printability checks for given schedules
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use seqarrange_core::{Point, Polygon};
//! use seqarrange_sequential::{schedule_solvable_objects, SolvableObject, SolverConfiguration};
//!
//! let footprint = Polygon::rectangle(Point::new(-50, -50), Point::new(50, 50));
//! let zone = Polygon::rectangle(Point::new(-80, -80), Point::new(80, 80));
//! let objects: Vec<SolvableObject> = (1..=4)
//!     .map(|id| SolvableObject::new(id, footprint.clone()).with_unreachable(vec![zone.clone()]))
//!     .collect();
//!
//! let plates = schedule_solvable_objects(&SolverConfiguration::new(), &objects, |p| {
//!     println!("{}%", p);
//! })?;
//! assert_eq!(plates.len(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! - `milp` (default): HiGHS backend for [`milp::MilpSession`]
//! - `serde`: Enable serialization/deserialization support

pub mod arrange;
pub mod check;
pub mod config;
pub mod constraints;
pub mod milp;
pub mod object;
pub mod optimizer;
pub mod preprocess;
pub mod refine;
pub mod scheduler;

// Re-exports
pub use arrange::{schedule_objects_for_sequential_print, schedule_solvable_objects};
pub use check::{
    check_scheduled_objects_for_sequential_conflict,
    check_scheduled_objects_for_sequential_printability,
};
pub use config::{
    BoundingSearch, DecimationPrecision, LineEncoding, PlateBounds, SolverConfiguration,
    GROUND_PRESENCE_TIME, SCALE_FACTOR,
};
pub use constraints::{ConstraintBuilder, PositionRef, Presence, Region, TimeRef};
pub use milp::{is_milp_available, MilpSession, MilpSettings};
pub use object::{ObjectToPrint, PrinterGeometry, SolvableObject};
pub use preprocess::{
    calc_polygon_area, calc_polygon_unreachable_zone_area, check_polygon_size_fit_to_plate,
    convert_geometry_to_plate_bounds, prepare_solvable_object, prepare_solvable_objects,
};
pub use scheduler::augment_temporal_spread;
