//! Error types for the site layer, and the unified error of the facade.

use airlock_chamber::AirlockError;
use airlock_types::{CodecError, EndpointId, EntityId};

/// Errors from [`AirlockSite`](crate::AirlockSite) operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// No endpoint with this id is registered.
    #[error("airlock {0} not found")]
    UnknownEndpoint(EndpointId),

    /// An endpoint with this id is already registered.
    #[error("airlock {0} already registered")]
    DuplicateEndpoint(EndpointId),

    /// The entity already holds a slot somewhere. An entity uses at most
    /// one airlock at a time.
    #[error("{entity} is already using airlock {endpoint}")]
    AlreadyUsingAirlock {
        entity: EntityId,
        endpoint: EndpointId,
    },

    /// The entity holds no slot at any airlock of this site.
    #[error("{0} is not using any airlock")]
    NotUsingAirlock(EntityId),

    /// Every airlock is full.
    #[error("no airlock has room for {0}")]
    NoEndpointAvailable(EntityId),

    /// The chamber rejected the operation.
    #[error(transparent)]
    Chamber(#[from] AirlockError),
}

impl SiteError {
    /// See [`AirlockError::is_environmental`]. Site-level errors are
    /// never environmental.
    pub fn is_environmental(&self) -> bool {
        match self {
            Self::Chamber(err) => err.is_environmental(),
            _ => false,
        }
    }
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` conversions let `?` lift errors from any layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Site(#[from] SiteError),

    #[error(transparent)]
    Chamber(#[from] AirlockError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
