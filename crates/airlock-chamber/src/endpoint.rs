//! Transit endpoints: the buildings and vehicles that house a chamber.

use airlock_clock::ClockPulse;
use airlock_types::{
    Anchors, ContainerId, EndpointId, EndpointKind, LocalPosition, Placement, VolumeId,
};
use tracing::debug;

use crate::port::{EndpointDescriptor, Handles};
use crate::{
    AirlockChamber, AirlockError, AtmosphereManager, ChamberConfig, ContainerTransferService,
    EndpointPort, SealedSide, ThermalCoupling,
};

/// A concrete housing for one chamber.
///
/// The endpoint is the only writer of its chamber's state. Callers read
/// the anchors from here and reach protocol operations through
/// [`chamber_mut`](Self::chamber_mut).
pub struct TransitEndpoint<P: EndpointPort> {
    chamber: AirlockChamber<P>,
}

impl<P: EndpointPort> TransitEndpoint<P> {
    pub fn new(port: P, config: ChamberConfig) -> Self {
        Self {
            chamber: AirlockChamber::new(port, config),
        }
    }

    fn descriptor(&self) -> &EndpointDescriptor {
        self.chamber.port().descriptor()
    }

    pub fn id(&self) -> EndpointId {
        self.descriptor().id
    }

    pub fn name(&self) -> &str {
        &self.descriptor().name
    }

    pub fn kind(&self) -> EndpointKind {
        self.descriptor().kind
    }

    pub fn anchors(&self) -> Anchors {
        self.descriptor().anchors
    }

    /// Where an entity waits on the settlement side before entering.
    pub fn interior_anchor(&self) -> LocalPosition {
        self.descriptor().anchors.interior
    }

    /// Where an entity waits on the surface side before entering.
    pub fn exterior_anchor(&self) -> LocalPosition {
        self.descriptor().anchors.exterior
    }

    /// Where an occupant stands inside the chamber.
    pub fn chamber_anchor(&self) -> LocalPosition {
        self.descriptor().anchors.chamber
    }

    pub fn chamber(&self) -> &AirlockChamber<P> {
        &self.chamber
    }

    pub fn chamber_mut(&mut self) -> &mut AirlockChamber<P> {
        &mut self.chamber
    }

    /// The endpoint's periodic time-advance: moves the active cycle
    /// forward, then starts a new one if the queues call for it.
    ///
    /// Returns the side sealed by a cycle completing on this pulse.
    pub fn time_passing(&mut self, pulse: &ClockPulse) -> Result<Option<SealedSide>, AirlockError> {
        let completed = self.chamber.time_passing(pulse);
        if let Some(heading) = self.chamber.auto_cycle() {
            debug!(endpoint = %self.id(), %heading, "auto cycle started");
        }
        completed
    }
}

impl<P: EndpointPort> std::fmt::Debug for TransitEndpoint<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitEndpoint")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("chamber", &self.chamber)
            .finish()
    }
}

/// Builder for a [`TransitEndpoint`] backed by boxed collaborator
/// handles.
///
/// # Example
///
/// ```rust,ignore
/// let endpoint = EndpointBuilder::new(EndpointId(1), "Lander Hab", settlement, surface)
///     .placement(Placement { x: 12.0, y: -4.0, facing_degrees: 90.0 })
///     .transfers(registry.clone())
///     .atmosphere(life_support.clone())
///     .thermal(heating.clone())
///     .build()?;
/// ```
pub struct EndpointBuilder {
    id: EndpointId,
    name: String,
    kind: EndpointKind,
    volume: VolumeId,
    settlement: ContainerId,
    surface: ContainerId,
    placement: Placement,
    relative_anchors: Anchors,
    config: ChamberConfig,
    transfers: Option<Box<dyn ContainerTransferService>>,
    atmosphere: Option<Box<dyn AtmosphereManager>>,
    thermal: Option<Box<dyn ThermalCoupling>>,
}

impl EndpointBuilder {
    /// Starts a building endpoint. The volume id defaults to the endpoint
    /// id.
    pub fn new(
        id: EndpointId,
        name: impl Into<String>,
        settlement: ContainerId,
        surface: ContainerId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind: EndpointKind::Building,
            volume: VolumeId(id.0),
            settlement,
            surface,
            placement: Placement::default(),
            relative_anchors: Anchors::default(),
            config: ChamberConfig::default(),
            transfers: None,
            atmosphere: None,
            thermal: None,
        }
    }

    pub fn kind(mut self, kind: EndpointKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn volume(mut self, volume: VolumeId) -> Self {
        self.volume = volume;
        self
    }

    /// Where the endpoint sits in the settlement.
    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Anchors relative to the endpoint; converted with the placement on
    /// [`build`](Self::build).
    pub fn anchors(mut self, relative: Anchors) -> Self {
        self.relative_anchors = relative;
        self
    }

    pub fn config(mut self, config: ChamberConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transfers(mut self, transfers: impl ContainerTransferService + 'static) -> Self {
        self.transfers = Some(Box::new(transfers));
        self
    }

    pub fn atmosphere(mut self, atmosphere: impl AtmosphereManager + 'static) -> Self {
        self.atmosphere = Some(Box::new(atmosphere));
        self
    }

    pub fn thermal(mut self, thermal: impl ThermalCoupling + 'static) -> Self {
        self.thermal = Some(Box::new(thermal));
        self
    }

    /// Builds the endpoint. Fails if the transfer service or atmosphere
    /// manager was not supplied; thermal coupling is optional.
    pub fn build(self) -> Result<TransitEndpoint<Handles>, AirlockError> {
        let transfers = self
            .transfers
            .ok_or(AirlockError::MissingCollaborator("transfer"))?;
        let atmosphere = self
            .atmosphere
            .ok_or(AirlockError::MissingCollaborator("atmosphere"))?;

        let descriptor = EndpointDescriptor {
            id: self.id,
            name: self.name,
            kind: self.kind,
            volume: self.volume,
            settlement: self.settlement,
            surface: self.surface,
            anchors: Anchors::place(self.relative_anchors, &self.placement),
        };

        Ok(TransitEndpoint::new(
            Handles {
                descriptor,
                transfers,
                atmosphere,
                thermal: self.thermal,
            },
            self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtmosphereError, TransferError};
    use airlock_types::EntityId;

    struct NoopTransfers;

    impl ContainerTransferService for NoopTransfers {
        fn transfer(
            &mut self,
            _entity: EntityId,
            _from: ContainerId,
            _to: ContainerId,
        ) -> Result<(), TransferError> {
            Ok(())
        }
    }

    struct NoopAtmosphere;

    impl AtmosphereManager for NoopAtmosphere {
        fn release_air(&mut self, _volume: VolumeId) -> Result<(), AtmosphereError> {
            Ok(())
        }

        fn recapture_air(&mut self, _volume: VolumeId) -> Result<(), AtmosphereError> {
            Ok(())
        }
    }

    fn builder() -> EndpointBuilder {
        EndpointBuilder::new(EndpointId(3), "Workshop", ContainerId(1), ContainerId(0))
    }

    #[test]
    fn test_build_requires_transfer_service() {
        let err = builder().atmosphere(NoopAtmosphere).build().unwrap_err();
        assert!(matches!(err, AirlockError::MissingCollaborator("transfer")));
    }

    #[test]
    fn test_build_requires_atmosphere() {
        let err = builder().transfers(NoopTransfers).build().unwrap_err();
        assert!(matches!(err, AirlockError::MissingCollaborator("atmosphere")));
    }

    #[test]
    fn test_anchors_are_placed_in_settlement_coordinates() {
        let endpoint = builder()
            .kind(EndpointKind::Vehicle)
            .placement(Placement {
                x: 10.0,
                y: 5.0,
                facing_degrees: 90.0,
            })
            .anchors(Anchors {
                interior: LocalPosition::new(-1.0, 0.0),
                exterior: LocalPosition::new(1.0, 0.0),
                chamber: LocalPosition::new(0.0, 0.0),
            })
            .transfers(NoopTransfers)
            .atmosphere(NoopAtmosphere)
            .build()
            .unwrap();

        assert_eq!(endpoint.id(), EndpointId(3));
        assert_eq!(endpoint.name(), "Workshop");
        assert_eq!(endpoint.kind(), EndpointKind::Vehicle);
        assert_eq!(endpoint.chamber_anchor(), LocalPosition::new(10.0, 5.0));

        let exterior = endpoint.exterior_anchor();
        assert!((exterior.x - 10.0).abs() < 1e-9);
        assert!((exterior.y - 6.0).abs() < 1e-9);
        let interior = endpoint.interior_anchor();
        assert!((interior.x - 10.0).abs() < 1e-9);
        assert!((interior.y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_volume_defaults_to_endpoint_id() {
        let endpoint = builder()
            .transfers(NoopTransfers)
            .atmosphere(NoopAtmosphere)
            .build()
            .unwrap();
        assert_eq!(endpoint.chamber().port().descriptor().volume, VolumeId(3));
        assert!(endpoint.chamber().port().descriptor().anchors == Anchors::default());
    }
}
