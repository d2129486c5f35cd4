//! Solver configuration.

use std::time::Duration;

use seqarrange_core::{BoundingBox, Coord, Error, Point, Polygon, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Application units per solver unit.
pub const SCALE_FACTOR: Coord = 100_000;

/// Time assigned to the first object on a plate by the printability check and
/// by temporal spread normalisation.
pub const GROUND_PRESENCE_TIME: i64 = 32;

/// Lower edge of the repulsion band around a segment parameter.
pub const INTERSECTION_REPULSION_MIN: f64 = -0.01;

/// Upper edge of the repulsion band around a segment parameter.
pub const INTERSECTION_REPULSION_MAX: f64 = 1.01;

/// Decimation tolerance for [`DecimationPrecision::Low`], application units.
pub const DECIMATION_TOLERANCE_LOW: Coord = 650_000;

/// Decimation tolerance for [`DecimationPrecision::High`], application units.
pub const DECIMATION_TOLERANCE_HIGH: Coord = 150_000;

/// Precision of polygon decimation applied before solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DecimationPrecision {
    /// No decimation.
    Undefined,
    /// Coarse polygons, fast solving.
    #[default]
    Low,
    /// Fine polygons.
    High,
}

impl DecimationPrecision {
    /// Tolerance in application units.
    pub fn tolerance(self) -> Coord {
        match self {
            DecimationPrecision::Undefined => 0,
            DecimationPrecision::Low => DECIMATION_TOLERANCE_LOW,
            DecimationPrecision::High => DECIMATION_TOLERANCE_HIGH,
        }
    }
}

/// Encoding of segment non-intersection constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LineEncoding {
    /// Two fresh per-segment parameters pinned by equalities.
    #[default]
    Explicit,
    /// Parameters eliminated; the band condition is stated on positions.
    Implicit,
}

/// Strategy for shrinking the usable plate region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BoundingSearch {
    /// Bisection between known-infeasible and known-feasible sizes.
    #[default]
    BinaryCentered,
    /// Step-wise shrink from the full plate.
    Linear,
}

/// Usable region of the plate in solver units.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlateBounds {
    /// Rectangular plate.
    Box(BoundingBox),
    /// Convex non-rectangular plate, counter-clockwise.
    Polygon(Polygon),
}

impl PlateBounds {
    /// Axis-aligned extents of the plate.
    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            PlateBounds::Box(bbox) => *bbox,
            PlateBounds::Polygon(polygon) => polygon
                .bounding_box()
                .unwrap_or(BoundingBox::new(Point::new(0, 0), Point::new(0, 0))),
        }
    }

    /// Plate area in square solver units.
    pub fn area(&self) -> f64 {
        match self {
            PlateBounds::Box(bbox) => bbox.area() as f64,
            PlateBounds::Polygon(polygon) => polygon.area(),
        }
    }
}

impl Default for PlateBounds {
    fn default() -> Self {
        PlateBounds::Box(BoundingBox::new(Point::new(0, 0), Point::new(2500, 2100)))
    }
}

/// Tuning and plate description for one scheduling call.
///
/// Read-only while a solve is running.
///
/// # Example
///
/// ```rust
/// use seqarrange_sequential::{PlateBounds, SolverConfiguration};
/// use seqarrange_core::{BoundingBox, Point};
///
/// let config = SolverConfiguration::new()
///     .with_object_group_size(2)
///     .with_plate(PlateBounds::Box(BoundingBox::new(Point::new(0, 0), Point::new(3600, 3600))));
/// assert_eq!(config.object_group_size, 2);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfiguration {
    /// Objects solved together per batch.
    pub object_group_size: usize,

    /// Number of decided objects above which they are coalesced into one proxy.
    pub fixed_object_grouping_limit: usize,

    /// Minimum time separation between two objects.
    pub temporal_spread: i64,

    /// Granularity of the bounding search, solver units.
    pub bounding_box_size_optimization_step: Coord,

    /// Smallest region size the bounding search probes, solver units.
    pub minimum_bounding_box_size: Coord,

    /// Refinement rounds allowed when a proxy stands in for decided objects.
    pub max_refines: usize,

    /// Decimation precision of input polygons.
    pub decimation_precision: DecimationPrecision,

    /// Wall-clock limit per satisfiability check.
    pub optimization_timeout: Duration,

    /// Usable plate region.
    pub plate: PlateBounds,

    /// Segment non-intersection encoding.
    pub line_encoding: LineEncoding,

    /// Bounding search strategy.
    pub bounding_search: BoundingSearch,
}

impl Default for SolverConfiguration {
    fn default() -> Self {
        Self {
            object_group_size: 4,
            fixed_object_grouping_limit: 64,
            temporal_spread: 16,
            bounding_box_size_optimization_step: 4,
            minimum_bounding_box_size: 16,
            max_refines: 2,
            decimation_precision: DecimationPrecision::default(),
            optimization_timeout: Duration::from_millis(8000),
            plate: PlateBounds::default(),
            line_encoding: LineEncoding::default(),
            bounding_search: BoundingSearch::default(),
        }
    }
}

impl SolverConfiguration {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size.
    pub fn with_object_group_size(mut self, size: usize) -> Self {
        self.object_group_size = size;
        self
    }

    /// Sets the proxy threshold.
    pub fn with_fixed_object_grouping_limit(mut self, limit: usize) -> Self {
        self.fixed_object_grouping_limit = limit;
        self
    }

    /// Sets the temporal spread.
    pub fn with_temporal_spread(mut self, spread: i64) -> Self {
        self.temporal_spread = spread;
        self
    }

    /// Sets the bounding search step.
    pub fn with_optimization_step(mut self, step: Coord) -> Self {
        self.bounding_box_size_optimization_step = step;
        self
    }

    /// Sets the smallest probed region size.
    pub fn with_minimum_bounding_box_size(mut self, size: Coord) -> Self {
        self.minimum_bounding_box_size = size;
        self
    }

    /// Sets the refinement cap.
    pub fn with_max_refines(mut self, max_refines: usize) -> Self {
        self.max_refines = max_refines;
        self
    }

    /// Sets the decimation precision.
    pub fn with_decimation_precision(mut self, precision: DecimationPrecision) -> Self {
        self.decimation_precision = precision;
        self
    }

    /// Sets the per-check timeout.
    pub fn with_optimization_timeout(mut self, timeout: Duration) -> Self {
        self.optimization_timeout = timeout;
        self
    }

    /// Sets the plate region.
    pub fn with_plate(mut self, plate: PlateBounds) -> Self {
        self.plate = plate;
        self
    }

    /// Sets the segment constraint encoding.
    pub fn with_line_encoding(mut self, encoding: LineEncoding) -> Self {
        self.line_encoding = encoding;
        self
    }

    /// Sets the bounding search strategy.
    pub fn with_bounding_search(mut self, search: BoundingSearch) -> Self {
        self.bounding_search = search;
        self
    }

    /// Changes the decimation precision. Must not be called during a solve.
    pub fn set_decimation_precision(&mut self, precision: DecimationPrecision) {
        self.decimation_precision = precision;
    }

    /// Changes the batch size. Must not be called during a solve.
    pub fn set_object_group_size(&mut self, size: usize) {
        self.object_group_size = size;
    }

    /// Rejects configurations the scheduler cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.object_group_size == 0 {
            return Err(Error::UnsupportedConfiguration(
                "object group size must be positive".into(),
            ));
        }
        if self.temporal_spread <= 0 {
            return Err(Error::UnsupportedConfiguration(
                "temporal spread must be positive".into(),
            ));
        }
        if self.bounding_box_size_optimization_step <= 0 {
            return Err(Error::UnsupportedConfiguration(
                "bounding box optimization step must be positive".into(),
            ));
        }
        let bbox = self.plate.bounding_box();
        if bbox.width() <= 0 || bbox.height() <= 0 {
            return Err(Error::UnsupportedConfiguration(format!(
                "plate {:?} is empty",
                self.plate
            )));
        }
        if let PlateBounds::Polygon(polygon) = &self.plate {
            if !polygon.is_convex() || !polygon.is_ccw() {
                return Err(Error::UnsupportedConfiguration(
                    "plate polygon must be convex and counter-clockwise".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = SolverConfiguration::default();
        assert_eq!(config.object_group_size, 4);
        assert_eq!(config.fixed_object_grouping_limit, 64);
        assert_eq!(config.temporal_spread, 16);
        assert_eq!(config.bounding_box_size_optimization_step, 4);
        assert_eq!(config.minimum_bounding_box_size, 16);
        assert_eq!(config.max_refines, 2);
        assert_eq!(config.optimization_timeout, Duration::from_millis(8000));
        assert_eq!(config.plate.bounding_box().width(), 2500);
        assert_eq!(config.plate.bounding_box().height(), 2100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_setters() {
        let mut config = SolverConfiguration::new()
            .with_temporal_spread(8)
            .with_max_refines(5)
            .with_line_encoding(LineEncoding::Implicit);
        config.set_object_group_size(2);
        config.set_decimation_precision(DecimationPrecision::High);
        assert_eq!(config.temporal_spread, 8);
        assert_eq!(config.max_refines, 5);
        assert_eq!(config.object_group_size, 2);
        assert_eq!(config.decimation_precision.tolerance(), DECIMATION_TOLERANCE_HIGH);
        assert_eq!(config.line_encoding, LineEncoding::Implicit);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SolverConfiguration::new().with_object_group_size(0).validate().is_err());
        assert!(SolverConfiguration::new().with_temporal_spread(0).validate().is_err());

        let concave = Polygon::from_coords(&[(0, 0), (10, 0), (5, 2), (10, 10), (0, 10)]);
        let config = SolverConfiguration::new().with_plate(PlateBounds::Polygon(concave));
        assert!(matches!(
            config.validate(),
            Err(Error::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_decimation_tolerances() {
        assert_eq!(DecimationPrecision::Undefined.tolerance(), 0);
        assert_eq!(DecimationPrecision::Low.tolerance(), 650_000);
        assert_eq!(DecimationPrecision::High.tolerance(), 150_000);
    }
}
