//! A site: every airlock of a settlement, and who is using which.

use std::collections::{BTreeMap, HashMap};

use airlock_chamber::{
    AirlockError, ChamberStatus, EndpointPort, SealedSide, Transit, TransitEndpoint,
    TransitEntity,
};
use airlock_clock::ClockPulse;
use airlock_types::{EndpointId, EntityId};
use tracing::{debug, info, warn};

use crate::SiteError;

/// What one site-wide time advance produced.
#[derive(Debug, Default)]
pub struct SiteTick {
    /// Endpoints whose cycle completed, and the side they sealed.
    pub completed: Vec<(EndpointId, SealedSide)>,
    /// Endpoints whose atmosphere exchange failed. Their cycles are held
    /// and retried on the next pulse.
    pub failures: Vec<(EndpointId, AirlockError)>,
}

/// Owns a settlement's airlocks and tracks which entity is using which.
///
/// An entity holds a slot in at most one airlock at a time. The index is
/// kept in step with the chambers by routing every admission and exit
/// through the site.
pub struct AirlockSite<P: EndpointPort> {
    /// Registered endpoints, ordered by id so iteration is deterministic.
    endpoints: BTreeMap<EndpointId, TransitEndpoint<P>>,

    /// Maps each entity in a chamber to the endpoint housing it.
    users: HashMap<EntityId, EndpointId>,
}

impl<P: EndpointPort> AirlockSite<P> {
    pub fn new() -> Self {
        Self {
            endpoints: BTreeMap::new(),
            users: HashMap::new(),
        }
    }

    /// Registers an endpoint.
    pub fn add_endpoint(&mut self, endpoint: TransitEndpoint<P>) -> Result<(), SiteError> {
        let id = endpoint.id();
        if self.endpoints.contains_key(&id) {
            return Err(SiteError::DuplicateEndpoint(id));
        }
        info!(endpoint = %id, name = endpoint.name(), kind = ?endpoint.kind(), "airlock registered");
        self.endpoints.insert(id, endpoint);
        Ok(())
    }

    pub fn endpoint(&self, id: EndpointId) -> Option<&TransitEndpoint<P>> {
        self.endpoints.get(&id)
    }

    pub fn endpoint_ids(&self) -> impl Iterator<Item = EndpointId> + '_ {
        self.endpoints.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// The airlock `entity` currently holds a slot in, if any.
    pub fn airlock_of(&self, entity: EntityId) -> Option<EndpointId> {
        self.users.get(&entity).copied()
    }

    /// Reserves a slot for `entity` in a specific airlock.
    pub fn reserve<E: TransitEntity + ?Sized>(
        &mut self,
        entity: &mut E,
        endpoint: EndpointId,
    ) -> Result<(), SiteError> {
        let id = entity.id();
        if let Some(current) = self.users.get(&id) {
            return Err(SiteError::AlreadyUsingAirlock {
                entity: id,
                endpoint: *current,
            });
        }

        let target = self
            .endpoints
            .get_mut(&endpoint)
            .ok_or(SiteError::UnknownEndpoint(endpoint))?;
        target.chamber_mut().reserve(entity)?;
        self.users.insert(id, endpoint);
        Ok(())
    }

    /// Reserves a slot in whichever airlock has the most free slots.
    /// Ties go to the lowest endpoint id.
    pub fn reserve_any<E: TransitEntity + ?Sized>(
        &mut self,
        entity: &mut E,
    ) -> Result<EndpointId, SiteError> {
        let id = entity.id();
        if let Some(current) = self.users.get(&id) {
            return Err(SiteError::AlreadyUsingAirlock {
                entity: id,
                endpoint: *current,
            });
        }

        let mut best: Option<(EndpointId, usize)> = None;
        for (endpoint_id, endpoint) in &self.endpoints {
            let free = endpoint.chamber().free_slots();
            if free > 0 && best.is_none_or(|(_, most)| free > most) {
                best = Some((*endpoint_id, free));
            }
        }
        let Some((chosen, free)) = best else {
            debug!(entity = %id, "no airlock has a free slot");
            return Err(SiteError::NoEndpointAvailable(id));
        };

        debug!(entity = %id, endpoint = %chosen, free, "airlock chosen");
        self.reserve(entity, chosen)?;
        Ok(chosen)
    }

    /// Books an airlock in advance. Returns `false` if its booking
    /// places are taken.
    pub fn book(
        &mut self,
        entity: EntityId,
        endpoint: EndpointId,
        now_tick: u64,
    ) -> Result<bool, SiteError> {
        let target = self
            .endpoints
            .get_mut(&endpoint)
            .ok_or(SiteError::UnknownEndpoint(endpoint))?;
        Ok(target.chamber_mut().book(entity, now_tick))
    }

    /// Polls an egress for `entity` at the airlock it is using.
    pub fn egress<E: TransitEntity + ?Sized>(&mut self, entity: &mut E) -> Result<Transit, SiteError> {
        let endpoint = self.endpoint_in_use(entity.id())?;
        let transit = endpoint.chamber_mut().egress(entity)?;
        if transit.is_completed() {
            self.users.remove(&entity.id());
        }
        Ok(transit)
    }

    /// Polls an ingress for `entity` at the airlock it is using.
    pub fn ingress<E: TransitEntity + ?Sized>(&mut self, entity: &mut E) -> Result<Transit, SiteError> {
        let endpoint = self.endpoint_in_use(entity.id())?;
        let transit = endpoint.chamber_mut().ingress(entity)?;
        if transit.is_completed() {
            self.users.remove(&entity.id());
        }
        Ok(transit)
    }

    /// Sends `entity` back out the door it came in by.
    pub fn release<E: TransitEntity + ?Sized>(&mut self, entity: &mut E) -> Result<(), SiteError> {
        let endpoint = self.endpoint_in_use(entity.id())?;
        endpoint.chamber_mut().release(entity)?;
        self.users.remove(&entity.id());
        Ok(())
    }

    /// Forgets a vanished entity everywhere: its slot, queue places and
    /// bookings. Returns `true` if any airlock knew it.
    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.users.remove(&entity);
        let mut known = false;
        for endpoint in self.endpoints.values_mut() {
            known |= endpoint.chamber_mut().remove(entity);
        }
        known
    }

    /// Advances every endpoint by one pulse.
    ///
    /// One endpoint's environmental failure does not stop the others;
    /// failures are collected in the returned [`SiteTick`].
    pub fn time_passing(&mut self, pulse: &ClockPulse) -> SiteTick {
        let mut report = SiteTick::default();
        for (id, endpoint) in &mut self.endpoints {
            match endpoint.time_passing(pulse) {
                Ok(Some(side)) => report.completed.push((*id, side)),
                Ok(None) => {}
                Err(err) => {
                    warn!(endpoint = %id, tick = pulse.tick, error = %err, "airlock held");
                    report.failures.push((*id, err));
                }
            }
        }
        report
    }

    /// Status snapshots of every endpoint, ordered by id.
    pub fn statuses(&self) -> Vec<ChamberStatus> {
        self.endpoints
            .values()
            .map(|endpoint| endpoint.chamber().status())
            .collect()
    }

    fn endpoint_in_use(&mut self, entity: EntityId) -> Result<&mut TransitEndpoint<P>, SiteError> {
        let id = self
            .users
            .get(&entity)
            .copied()
            .ok_or(SiteError::NotUsingAirlock(entity))?;
        self.endpoints
            .get_mut(&id)
            .ok_or(SiteError::UnknownEndpoint(id))
    }
}

impl<P: EndpointPort> Default for AirlockSite<P> {
    fn default() -> Self {
        Self::new()
    }
}
