//! Shared vocabulary for the airlock subsystem.
//!
//! This crate defines the plain data that every other layer speaks:
//!
//! - **Identity** ([`EntityId`], [`ContainerId`], [`VolumeId`],
//!   [`EndpointId`]): newtype wrappers so an entity can never be passed
//!   where a container is expected.
//! - **Location** ([`LocationState`], [`EntityRecord`]): where a transit
//!   entity is, and the form in which that fact is persisted.
//! - **Geometry** ([`LocalPosition`], [`Placement`], [`Anchors`]): the
//!   waiting spots an endpoint exposes to callers.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how records and status
//!   snapshots are turned into bytes.
//!
//! # Architecture
//!
//! ```text
//! airlock-types (data) → airlock-chamber (protocol) → airlock (site, runner)
//! ```
//!
//! Nothing in here knows about phases, queues or collaborators.

mod codec;
mod error;
mod position;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::CodecError;
pub use position::{Anchors, LocalPosition, Placement};
pub use types::{
    ContainerId, EndpointId, EndpointKind, EntityId, EntityRecord, LocationState, VolumeId,
};
