//! Identity and location types shared by every airlock layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CodecError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a transit entity (a colonist, a robot, any
/// mobile agent that moves through an airlock).
///
/// `#[serde(transparent)]` keeps it a plain number on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

/// Identifies a container that can own entities: the Martian surface, a
/// settlement, or a vehicle cabin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub u64);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// Identifies the pressurizable internal volume of a chamber. The
/// atmosphere manager uses it to know how much air to release or
/// recapture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeId(pub u64);

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V-{}", self.0)
    }
}

/// Identifies a transit endpoint (the building or vehicle housing a
/// chamber).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(pub u64);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// LocationState
// ---------------------------------------------------------------------------

/// Where a transit entity currently is.
///
/// This tag is the single source of truth for an entity's whereabouts.
/// Only the airlock protocol's transfer step changes it, always together
/// with the owning container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationState {
    /// On the surface, owned by the surface container.
    Outside,
    /// Holding a chamber slot. Still owned by the container it came from.
    InAirlock,
    /// Inside a settlement (or vehicle cabin).
    InSettlement,
}

impl fmt::Display for LocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outside => write!(f, "Outside"),
            Self::InAirlock => write!(f, "InAirlock"),
            Self::InSettlement => write!(f, "InSettlement"),
        }
    }
}

// ---------------------------------------------------------------------------
// EndpointKind
// ---------------------------------------------------------------------------

/// What kind of structure houses a chamber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointKind {
    /// A settlement building. Normally coupled to a heating system.
    Building,
    /// A rover or other vehicle. Usually has no thermal coupling.
    Vehicle,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => write!(f, "Building"),
            Self::Vehicle => write!(f, "Vehicle"),
        }
    }
}

// ---------------------------------------------------------------------------
// EntityRecord: the persisted form of an entity's location
// ---------------------------------------------------------------------------

/// The plain data persisted for each transit entity when a simulation is
/// saved. Chamber occupancy and queues are never persisted; on restore,
/// entities come back with exactly these tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub location: LocationState,
    pub container: ContainerId,
}

impl EntityRecord {
    /// Checks the record is consistent with the given surface container.
    ///
    /// An `Outside` entity must be owned by the surface and an
    /// `InSettlement` entity must not be. `InAirlock` records are rejected
    /// outright: chamber state is transient, so a saved entity can never
    /// legitimately be mid-transit.
    pub fn validate(&self, surface: ContainerId) -> Result<(), CodecError> {
        match self.location {
            LocationState::Outside if self.container != surface => {
                Err(CodecError::InvalidRecord(format!(
                    "{} is Outside but owned by {}",
                    self.id, self.container
                )))
            }
            LocationState::InSettlement if self.container == surface => {
                Err(CodecError::InvalidRecord(format!(
                    "{} is InSettlement but owned by the surface",
                    self.id
                )))
            }
            LocationState::InAirlock => Err(CodecError::InvalidRecord(format!(
                "{} was saved mid-transit",
                self.id
            ))),
            _ => Ok(()),
        }
    }
}
