//! The interfaces the chamber consumes from the rest of the simulation.
//!
//! The chamber never reaches for global state. Everything it touches
//! outside its own fields comes through one of these traits, injected
//! when the endpoint is built:
//!
//! - [`TransitEntity`]: the thing moving through the chamber
//! - [`ContainerTransferService`]: moves ownership between containers
//! - [`AtmosphereManager`]: releases or recaptures the chamber's air
//! - [`ThermalCoupling`]: told when the outer door dumps heat
//!
//! All calls are synchronous and made from the single simulation thread.

use airlock_types::{ContainerId, EntityId, EntityRecord, LocationState, VolumeId};

use crate::{AtmosphereError, TransferError};

/// A mobile agent that can transit an airlock.
///
/// The chamber reads the location tag to check preconditions and writes it
/// through [`set_location_state`](Self::set_location_state), which is its
/// only mutation of entity state. The tag and the owning container always
/// change together.
pub trait TransitEntity {
    fn id(&self) -> EntityId;

    fn location_state(&self) -> LocationState;

    /// The container currently holding this entity.
    fn owner_container(&self) -> ContainerId;

    /// Sets the location tag and owning container in one step.
    fn set_location_state(&mut self, state: LocationState, container: ContainerId);

    /// The persisted form of this entity's location.
    fn record(&self) -> EntityRecord {
        EntityRecord {
            id: self.id(),
            location: self.location_state(),
            container: self.owner_container(),
        }
    }
}

/// A bare record is the simplest transit entity: it is nothing but the
/// location fields.
impl TransitEntity for EntityRecord {
    fn id(&self) -> EntityId {
        self.id
    }

    fn location_state(&self) -> LocationState {
        self.location
    }

    fn owner_container(&self) -> ContainerId {
        self.container
    }

    fn set_location_state(&mut self, state: LocationState, container: ContainerId) {
        self.location = state;
        self.container = container;
    }
}

/// Relocates entity ownership between containers.
pub trait ContainerTransferService {
    /// Moves `entity` from `from` to `to`.
    ///
    /// Must be all-or-nothing: on `Err` the entity is still held by
    /// `from` and nothing else, on `Ok` it is held by `to` and nothing
    /// else.
    fn transfer(
        &mut self,
        entity: EntityId,
        from: ContainerId,
        to: ContainerId,
    ) -> Result<(), TransferError>;
}

/// Settlement life support, as seen from one chamber.
///
/// Each method is called exactly once per completed half-cycle, keyed by
/// the chamber's volume id.
pub trait AtmosphereManager {
    /// Fills the chamber volume with breathable air (pressurize).
    fn release_air(&mut self, volume: VolumeId) -> Result<(), AtmosphereError>;

    /// Pumps the chamber's air back into reserve (depressurize).
    fn recapture_air(&mut self, volume: VolumeId) -> Result<(), AtmosphereError>;
}

/// The heating system of the building housing the chamber.
pub trait ThermalCoupling {
    /// The outer door opened to the cold exterior. Fire-and-forget.
    fn notify_outer_door_opened(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_as_entity_moves_tag_and_container_together() {
        let mut record = EntityRecord {
            id: EntityId(4),
            location: LocationState::InSettlement,
            container: ContainerId(1),
        };
        record.set_location_state(LocationState::Outside, ContainerId(0));
        assert_eq!(record.location_state(), LocationState::Outside);
        assert_eq!(record.owner_container(), ContainerId(0));
        assert_eq!(record.record(), record);
    }
}
