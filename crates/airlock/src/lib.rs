//! # Airlock
//!
//! Airlock transit for settlement simulations.
//!
//! Colonists cross between a pressurized settlement and the exterior
//! through capacity-limited chambers that cycle one half at a time. Task
//! logic polls; nothing blocks. This crate ties the layers together:
//!
//! - [`AirlockSite`] owns every endpoint of a settlement and enforces
//!   "one airlock per entity"
//! - [`SiteRunner`] drives a site from a real-time [`SimClock`]
//! - [`Error`] wraps the error of every layer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use airlock::prelude::*;
//!
//! let mut site = AirlockSite::new();
//! site.add_endpoint(
//!     EndpointBuilder::new(EndpointId(1), "Lander Hab", settlement_id, surface_id)
//!         .transfers(registry)
//!         .atmosphere(life_support)
//!         .build()?,
//! )?;
//!
//! site.reserve_any(&mut colonist)?;
//! let mut clock = ManualClock::new();
//! loop {
//!     if site.egress(&mut colonist)?.is_completed() {
//!         break;
//!     }
//!     site.time_passing(&clock.step());
//! }
//! ```

mod error;
mod runner;
mod site;

pub use error::{Error, SiteError};
pub use runner::{RunSummary, SiteRunner};
pub use site::{AirlockSite, SiteTick};

pub use airlock_chamber as chamber;
pub use airlock_clock as clock;
pub use airlock_types as types;

pub use airlock_clock::SimClock;

/// Everything needed to wire and drive a site.
pub mod prelude {
    pub use crate::{AirlockSite, Error, RunSummary, SiteError, SiteRunner, SiteTick};

    pub use airlock_chamber::{
        AirlockChamber, AirlockError, AirlockMode, AtmosphereError, AtmosphereManager,
        ChamberConfig, ChamberStatus, ContainerTransferService, EndpointBuilder, EndpointPort,
        Handles, Phase, QueueLengths, SealedSide, ThermalCoupling, TransferError, Transit,
        TransitEndpoint, TransitEntity,
    };
    pub use airlock_clock::{ClockConfig, ClockPulse, ManualClock, OverrunPolicy, SimClock};
    pub use airlock_types::{
        Anchors, Codec, CodecError, ContainerId, EndpointId, EndpointKind, EntityId,
        EntityRecord, JsonCodec, LocalPosition, LocationState, Placement, VolumeId,
    };
}
