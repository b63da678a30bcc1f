//! The airlock transit protocol.
//!
//! An airlock chamber sits between a pressurized settlement and the
//! exterior. Entities reserve a slot, wait for the door on their far side
//! to become safe, and cross. The chamber cycles between the two sides one
//! half-cycle at a time, each driven by an elected operator and advanced
//! by the owning endpoint's time-advance call.
//!
//! # Key types
//!
//! - [`AirlockChamber`]: the protocol state machine
//! - [`TransitEndpoint`]: a building or vehicle housing one chamber
//! - [`EndpointBuilder`]: wires an endpoint to its collaborators
//! - [`EndpointPort`]: what a chamber needs from its housing
//! - [`Phase`] / [`SealedSide`]: cycle position and which door is safe
//! - [`ChamberConfig`]: capacity, cycle length, booking limits
//!
//! # Call pattern
//!
//! ```rust,ignore
//! let chamber = endpoint.chamber_mut();
//! chamber.reserve(&mut colonist)?;
//! // every tick, from task logic:
//! if chamber.egress(&mut colonist)?.is_completed() {
//!     // colonist is outside
//! }
//! // every tick, from the simulation loop:
//! endpoint.time_passing(&pulse)?;
//! ```

mod booking;
mod chamber;
mod collaborators;
mod config;
mod endpoint;
mod error;
mod port;

pub use chamber::{AirlockChamber, ChamberStatus, QueueLengths, Transit};
pub use collaborators::{AtmosphereManager, ContainerTransferService, ThermalCoupling, TransitEntity};
pub use config::{AirlockMode, ChamberConfig, Phase, SealedSide};
pub use endpoint::{EndpointBuilder, TransitEndpoint};
pub use error::{AirlockError, AtmosphereError, TransferError};
pub use port::{EndpointDescriptor, EndpointPort, Handles};
