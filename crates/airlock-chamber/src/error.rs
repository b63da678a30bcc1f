//! Error types for the chamber layer.
//!
//! Two classes live here. Caller-contract violations mean the task logic
//! invoked an operation out of protocol order; they never mutate state and
//! are not worth retrying as-is. Environmental failures come from a
//! collaborator refusing a request; the chamber leaves everything
//! untouched so the caller can retry on a later tick.

use airlock_types::{ContainerId, EndpointId, EntityId, VolumeId};

use crate::Phase;

/// A container refused or failed to move an entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransferError {
    /// The destination container would not accept the entity.
    #[error("{to} refused {entity}")]
    Refused { entity: EntityId, to: ContainerId },

    /// The entity is not held by the source container.
    #[error("{entity} is not in {container}")]
    NotInContainer {
        entity: EntityId,
        container: ContainerId,
    },
}

/// The settlement could not release or recapture the chamber's air.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AtmosphereError {
    /// Not enough breathable air in reserve to pressurize the volume.
    #[error("insufficient air to pressurize {0}")]
    Insufficient(VolumeId),

    /// The life-support system is offline or otherwise unavailable.
    #[error("life support unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by chamber and endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum AirlockError {
    /// Every chamber slot is taken. The caller retries later; nothing is
    /// queued on its behalf.
    #[error("airlock {endpoint} is full ({capacity} occupants)")]
    ChamberFull {
        endpoint: EndpointId,
        capacity: usize,
    },

    /// The entity does not hold a slot in this chamber (or its location
    /// tag says it is somewhere else).
    #[error("{0} is not in the chamber")]
    NotInChamber(EntityId),

    /// The entity already holds a slot in this chamber.
    #[error("{0} is already in the chamber")]
    AlreadyInChamber(EntityId),

    /// A phase-drive request arrived while a cycle is active.
    #[error("chamber is already cycling ({0})")]
    AlreadyCycling(Phase),

    /// A cycle was requested but nobody is present to operate the pump.
    #[error("no entity available to operate the chamber")]
    NoOperator,

    /// The operation is not valid in the chamber's current state.
    #[error("illegal airlock state: {0}")]
    IllegalState(String),

    /// An endpoint was built without one of its required collaborators.
    #[error("endpoint is missing its {0} collaborator")]
    MissingCollaborator(&'static str),

    /// The container transfer failed; the entity was not moved.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The atmosphere manager failed; the cycle did not complete.
    #[error(transparent)]
    Atmosphere(#[from] AtmosphereError),
}

impl AirlockError {
    /// Returns `true` for caller-contract violations: programming errors
    /// in the task logic that should not be retried unchanged.
    pub fn is_caller_error(&self) -> bool {
        !self.is_environmental()
    }

    /// Returns `true` for recoverable collaborator failures. State was
    /// left untouched; retrying on a later tick is safe.
    pub fn is_environmental(&self) -> bool {
        matches!(self, Self::Transfer(_) | Self::Atmosphere(_))
    }
}
