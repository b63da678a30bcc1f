//! 2D positions for the waiting spots around a chamber.

use serde::{Deserialize, Serialize};

/// A point in metres on a local 2D plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalPosition {
    pub x: f64,
    pub y: f64,
}

impl LocalPosition {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance to another point.
    pub fn distance_to(&self, other: &LocalPosition) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Where an endpoint sits in settlement coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    /// Rotation of the endpoint's local frame, counter-clockwise.
    pub facing_degrees: f64,
}

impl Placement {
    /// Converts a position relative to the endpoint into settlement
    /// coordinates: rotate by `facing_degrees`, then translate.
    pub fn to_settlement(&self, local: LocalPosition) -> LocalPosition {
        let (sin, cos) = self.facing_degrees.to_radians().sin_cos();
        LocalPosition {
            x: local.x * cos - local.y * sin + self.x,
            y: local.x * sin + local.y * cos + self.y,
        }
    }
}

/// The three fixed spots an endpoint exposes: where to wait on the
/// settlement side, where to wait on the surface side, and the chamber
/// itself.
///
/// Always stored in settlement coordinates; [`Anchors::place`] does the
/// one-time conversion at construction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Anchors {
    pub interior: LocalPosition,
    pub exterior: LocalPosition,
    pub chamber: LocalPosition,
}

impl Anchors {
    /// Builds anchors from positions given relative to the endpoint.
    pub fn place(relative: Anchors, placement: &Placement) -> Self {
        Self {
            interior: placement.to_settlement(relative.interior),
            exterior: placement.to_settlement(relative.exterior),
            chamber: placement.to_settlement(relative.chamber),
        }
    }
}
