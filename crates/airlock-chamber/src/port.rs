//! The capability interface a chamber is parameterized by.
//!
//! A chamber does not know whether it lives in a building or a rover. It
//! gets everything endpoint-specific through [`EndpointPort`]: identity,
//! the containers on either side, the anchors, and handles to its
//! collaborators.

use airlock_types::{Anchors, ContainerId, EndpointId, EndpointKind, VolumeId};
use serde::{Deserialize, Serialize};

use crate::{AtmosphereManager, ContainerTransferService, ThermalCoupling};

/// Fixed facts about an endpoint, loaded once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub id: EndpointId,
    pub name: String,
    pub kind: EndpointKind,
    /// Key for the atmosphere manager.
    pub volume: VolumeId,
    /// The settlement (or vehicle cabin) container on the inner side.
    pub settlement: ContainerId,
    /// The surface container on the outer side.
    pub surface: ContainerId,
    /// Waiting spots, already in settlement coordinates.
    pub anchors: Anchors,
}

/// Capabilities a chamber needs from the endpoint that houses it.
pub trait EndpointPort {
    fn descriptor(&self) -> &EndpointDescriptor;

    fn transfers(&mut self) -> &mut dyn ContainerTransferService;

    fn atmosphere(&mut self) -> &mut dyn AtmosphereManager;

    /// `None` for endpoints with no heating to account for (most vehicles).
    fn thermal(&mut self) -> Option<&mut dyn ThermalCoupling>;
}

/// The standard port: a descriptor plus boxed collaborator handles.
///
/// Built by [`EndpointBuilder`](crate::EndpointBuilder).
pub struct Handles {
    pub(crate) descriptor: EndpointDescriptor,
    pub(crate) transfers: Box<dyn ContainerTransferService>,
    pub(crate) atmosphere: Box<dyn AtmosphereManager>,
    pub(crate) thermal: Option<Box<dyn ThermalCoupling>>,
}

impl EndpointPort for Handles {
    fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    fn transfers(&mut self) -> &mut dyn ContainerTransferService {
        self.transfers.as_mut()
    }

    fn atmosphere(&mut self) -> &mut dyn AtmosphereManager {
        self.atmosphere.as_mut()
    }

    fn thermal(&mut self) -> Option<&mut dyn ThermalCoupling> {
        match &mut self.thermal {
            Some(thermal) => Some(thermal.as_mut()),
            None => None,
        }
    }
}

impl std::fmt::Debug for Handles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handles")
            .field("descriptor", &self.descriptor)
            .field("thermal", &self.thermal.is_some())
            .finish_non_exhaustive()
    }
}
