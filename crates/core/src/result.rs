//! Schedule result representation.

use crate::geometry::{Coord, ObjectId};
use crate::rational::Rational;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position of one object on a plate, in application units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScheduledObject {
    /// Object identifier.
    pub id: ObjectId,
    /// X offset.
    pub x: Coord,
    /// Y offset.
    pub y: Coord,
}

impl ScheduledObject {
    /// Creates a scheduled object.
    pub fn new(id: ObjectId, x: Coord, y: Coord) -> Self {
        Self { id, x, y }
    }
}

/// Objects of one plate in print order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScheduledPlate {
    /// Objects ordered by ascending print time.
    pub scheduled_objects: Vec<ScheduledObject>,
}

impl ScheduledPlate {
    /// Identifiers in print order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.scheduled_objects.iter().map(|o| o.id).collect()
    }

    /// Number of objects on the plate.
    pub fn len(&self) -> usize {
        self.scheduled_objects.len()
    }

    /// Returns true if the plate holds no objects.
    pub fn is_empty(&self) -> bool {
        self.scheduled_objects.is_empty()
    }
}

/// Resolved placement of one object in solver units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolvedObject {
    /// Object identifier.
    pub id: ObjectId,
    /// X offset.
    pub x: Rational,
    /// Y offset.
    pub y: Rational,
    /// Schedule time.
    pub t: Rational,
}

/// Resolved plate in solver units, ordered by ascending time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolvedPlate {
    /// Objects ordered by ascending time.
    pub objects: Vec<SolvedObject>,
}

impl SolvedPlate {
    /// Converts to application units by normalising each offset and scaling
    /// it by `scale_factor`.
    pub fn to_scheduled(&self, scale_factor: Coord) -> ScheduledPlate {
        ScheduledPlate {
            scheduled_objects: self
                .objects
                .iter()
                .map(|o| {
                    ScheduledObject::new(
                        o.id,
                        (o.x.normalize() * scale_factor).as_i64(),
                        (o.y.normalize() * scale_factor).as_i64(),
                    )
                })
                .collect(),
        }
    }

    /// Identifiers in print order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }
}
