//! The airlock chamber: the transit protocol state machine.
//!
//! A chamber owns its phase, occupancy, per-door wait queues, and current
//! operator. Callers reach it only through the operations below; every one
//! of them returns immediately with a success, "not yet", or error
//! result. Nothing blocks. Task logic polls again on a later tick.
//!
//! # Safety invariants
//!
//! - At most `capacity` occupants.
//! - At most one half-cycle active; `operator` is set iff one is.
//! - A door opens only while the chamber is idle and sealed on that door's
//!   side, so both doors are never open together and nobody crosses
//!   mid-cycle.
//! - An entity's container and location tag change only after the
//!   transfer service reports success.

use std::collections::VecDeque;
use std::fmt;

use airlock_clock::ClockPulse;
use airlock_types::{ContainerId, EndpointId, EndpointKind, EntityId, LocationState};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::booking::BookingLedger;
use crate::{
    AirlockError, AirlockMode, ChamberConfig, EndpointPort, Phase, SealedSide, TransitEntity,
};

/// Result of an egress or ingress poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transit {
    /// The entity crossed and is now on the far side.
    Completed,
    /// The door is not open for this entity yet; it is queued. Poll again
    /// on a later tick.
    Waiting,
}

impl Transit {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Number of entities waiting at each door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueLengths {
    /// Waiting to ingress (through the inner door, once pressurized).
    pub inner: usize,
    /// Waiting to egress (through the outer door, once depressurized).
    pub outer: usize,
}

/// A read-only snapshot of a chamber, for diagnostics and task selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChamberStatus {
    pub endpoint: EndpointId,
    pub name: String,
    pub kind: EndpointKind,
    pub phase: Phase,
    pub steady_state: Phase,
    pub sealed_side: SealedSide,
    pub mode: AirlockMode,
    pub occupants: usize,
    pub capacity: usize,
    pub volume_liters: f64,
    pub queues: QueueLengths,
    pub operator: Option<EntityId>,
    pub remaining_ticks: u32,
    pub cycles_completed: u64,
    pub inner_door_locked: bool,
    pub outer_door_locked: bool,
    pub bookings: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Egress,
    Ingress,
}

impl Direction {
    /// The side whose door the entity leaves the chamber through.
    fn exit_side(self) -> SealedSide {
        match self {
            Self::Egress => SealedSide::Exterior,
            Self::Ingress => SealedSide::Interior,
        }
    }

    fn arrival_state(self) -> LocationState {
        match self {
            Self::Egress => LocationState::Outside,
            Self::Ingress => LocationState::InSettlement,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Egress => write!(f, "egress"),
            Self::Ingress => write!(f, "ingress"),
        }
    }
}

/// A capacity-limited chamber with two independently controlled doors.
pub struct AirlockChamber<P: EndpointPort> {
    port: P,
    config: ChamberConfig,
    phase: Phase,
    sealed: SealedSide,
    mode: AirlockMode,
    /// Slot holders in reservation order; the first is the longest-standing.
    occupants: Vec<EntityId>,
    inner_queue: VecDeque<EntityId>,
    outer_queue: VecDeque<EntityId>,
    operator: Option<EntityId>,
    remaining_ticks: u32,
    /// Set once the thermal coupling has been told about the current
    /// vacuum window.
    outer_door_vented: bool,
    cycles_completed: u64,
    bookings: BookingLedger,
}

impl<P: EndpointPort> AirlockChamber<P> {
    /// Creates an idle chamber, pressurized and sealed on the interior
    /// side.
    pub fn new(port: P, config: ChamberConfig) -> Self {
        let config = config.validated();
        let bookings = BookingLedger::new(config.max_bookings, config.booking_ttl_ticks);
        debug!(
            endpoint = %port.descriptor().id,
            capacity = config.capacity,
            cycle_ticks = config.cycle_ticks,
            "chamber created"
        );
        Self {
            port,
            config,
            phase: Phase::Idle,
            sealed: SealedSide::Interior,
            mode: AirlockMode::NotInUse,
            occupants: Vec::new(),
            inner_queue: VecDeque::new(),
            outer_queue: VecDeque::new(),
            operator: None,
            remaining_ticks: 0,
            outer_door_vented: false,
            cycles_completed: 0,
            bookings,
        }
    }

    // -----------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------

    /// Gives `entity` a chamber slot and tags it `InAirlock`.
    ///
    /// The entity keeps its current container until it crosses. Fails
    /// with [`AirlockError::ChamberFull`] rather than queuing: callers
    /// retry later, so nobody waits without holding a slot.
    pub fn reserve<E: TransitEntity + ?Sized>(&mut self, entity: &mut E) -> Result<(), AirlockError> {
        let id = entity.id();
        if self.occupants.contains(&id) {
            return Err(self.reject(AirlockError::AlreadyInChamber(id)));
        }
        if entity.location_state() == LocationState::InAirlock {
            return Err(self.reject(AirlockError::IllegalState(format!(
                "{id} is already in another airlock"
            ))));
        }
        if self.occupants.len() >= self.config.capacity {
            return Err(self.reject(AirlockError::ChamberFull {
                endpoint: self.endpoint_id(),
                capacity: self.config.capacity,
            }));
        }

        let container = entity.owner_container();
        let descriptor = self.port.descriptor();
        let mode = if container == descriptor.settlement {
            AirlockMode::Egress
        } else if container == descriptor.surface {
            AirlockMode::Ingress
        } else {
            return Err(self.reject(AirlockError::IllegalState(format!(
                "{id} is held by {container}, which this airlock does not connect"
            ))));
        };

        self.occupants.push(id);
        entity.set_location_state(LocationState::InAirlock, container);
        self.bookings.cancel(id);
        if self.mode == AirlockMode::NotInUse {
            self.mode = mode;
        }

        info!(
            endpoint = %self.endpoint_id(),
            entity = %id,
            occupants = self.occupants.len(),
            "entered chamber"
        );
        Ok(())
    }

    /// Books the airlock in advance. Returns `false` when all booking
    /// places hold live bookings.
    pub fn book(&mut self, entity: EntityId, now_tick: u64) -> bool {
        let booked = self.bookings.book(entity, now_tick);
        debug!(endpoint = %self.endpoint_id(), %entity, booked, "booking request");
        booked
    }

    pub fn has_booking(&self, entity: EntityId, now_tick: u64) -> bool {
        self.bookings.has_booking(entity, now_tick)
    }

    pub fn cancel_booking(&mut self, entity: EntityId) -> bool {
        self.bookings.cancel(entity)
    }

    // -----------------------------------------------------------------
    // Transit
    // -----------------------------------------------------------------

    /// Moves an occupant out to the surface, if the outer door is open
    /// for it.
    ///
    /// Returns [`Transit::Waiting`] (and queues the entity at the outer
    /// door) until the chamber is idle at vacuum and the entity is at the
    /// head of the queue.
    pub fn egress<E: TransitEntity + ?Sized>(&mut self, entity: &mut E) -> Result<Transit, AirlockError> {
        self.transit(entity, Direction::Egress)
    }

    /// Moves an occupant into the settlement, if the inner door is open
    /// for it. The mirror of [`egress`](Self::egress).
    pub fn ingress<E: TransitEntity + ?Sized>(&mut self, entity: &mut E) -> Result<Transit, AirlockError> {
        self.transit(entity, Direction::Ingress)
    }

    fn transit<E: TransitEntity + ?Sized>(
        &mut self,
        entity: &mut E,
        direction: Direction,
    ) -> Result<Transit, AirlockError> {
        let id = entity.id();
        if !self.occupants.contains(&id) || entity.location_state() != LocationState::InAirlock {
            return Err(self.reject(AirlockError::NotInChamber(id)));
        }

        let (from, to) = self.containers(direction);
        if entity.owner_container() != from {
            return Err(self.reject(AirlockError::IllegalState(format!(
                "{id} is held by {}, cannot {direction} from {from}",
                entity.owner_container()
            ))));
        }

        let side = direction.exit_side();
        if self.queue(side.opposite()).contains(&id) {
            return Err(self.reject(AirlockError::IllegalState(format!(
                "{id} is queued at the {} door",
                side.opposite()
            ))));
        }

        let door_open = self.phase == Phase::Idle && self.sealed == side;
        let at_head = self.queue(side).front().is_none_or(|head| *head == id);
        if !door_open || !at_head {
            if !self.queue(side).contains(&id) {
                self.queue_mut(side).push_back(id);
                debug!(
                    endpoint = %self.endpoint_id(),
                    entity = %id,
                    door = %side,
                    position = self.queue(side).len(),
                    "waiting at door"
                );
            }
            return Ok(Transit::Waiting);
        }

        if let Err(err) = self.port.transfers().transfer(id, from, to) {
            warn!(
                endpoint = %self.endpoint_id(),
                entity = %id,
                error = %err,
                "{direction} transfer failed, entity stays in chamber"
            );
            return Err(err.into());
        }

        entity.set_location_state(direction.arrival_state(), to);
        self.occupants.retain(|o| *o != id);
        self.queue_mut(side).retain(|q| *q != id);
        self.bookings.cancel(id);

        if direction == Direction::Egress && !self.outer_door_vented {
            self.outer_door_vented = true;
            if let Some(thermal) = self.port.thermal() {
                thermal.notify_outer_door_opened();
            }
        }

        info!(
            endpoint = %self.endpoint_id(),
            entity = %id,
            occupants = self.occupants.len(),
            "completed {direction}"
        );
        Ok(Transit::Completed)
    }

    /// Lets an occupant step back out through the door it came in by,
    /// abandoning its transit.
    ///
    /// Only possible while idle with that door unlocked; a chamber that
    /// has already cycled to the far side must cycle back first.
    pub fn release<E: TransitEntity + ?Sized>(&mut self, entity: &mut E) -> Result<(), AirlockError> {
        let id = entity.id();
        if !self.occupants.contains(&id) || entity.location_state() != LocationState::InAirlock {
            return Err(self.reject(AirlockError::NotInChamber(id)));
        }

        let container = entity.owner_container();
        let descriptor = self.port.descriptor();
        let (origin, state) = if container == descriptor.settlement {
            (SealedSide::Interior, LocationState::InSettlement)
        } else if container == descriptor.surface {
            (SealedSide::Exterior, LocationState::Outside)
        } else {
            return Err(self.reject(AirlockError::IllegalState(format!(
                "{id} is held by unrelated container {container}"
            ))));
        };

        if self.phase != Phase::Idle || self.sealed != origin {
            return Err(self.reject(AirlockError::IllegalState(format!(
                "{origin} door is sealed, {id} cannot step back out"
            ))));
        }

        self.remove(id);
        entity.set_location_state(state, container);
        Ok(())
    }

    /// Forgets an entity that vanished (died, was removed from the
    /// simulation). Tolerated at any time.
    ///
    /// If it was the operator, a replacement is elected; with nobody left
    /// to operate, the active cycle is aborted back to `Idle`. Returns
    /// `true` if the chamber knew the entity.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        let before = self.occupants.len() + self.inner_queue.len() + self.outer_queue.len();
        self.occupants.retain(|o| *o != entity);
        self.inner_queue.retain(|q| *q != entity);
        self.outer_queue.retain(|q| *q != entity);
        let after = self.occupants.len() + self.inner_queue.len() + self.outer_queue.len();
        let booked = self.bookings.cancel(entity);

        if self.operator == Some(entity) {
            self.operator = None;
            self.check_operator();
        }

        let known = before != after || booked;
        if known {
            debug!(endpoint = %self.endpoint_id(), %entity, "removed from chamber");
        }
        known
    }

    // -----------------------------------------------------------------
    // Phase drive
    // -----------------------------------------------------------------

    /// Starts pumping the chamber down to vacuum.
    pub fn request_depressurize(&mut self) -> Result<(), AirlockError> {
        self.request_cycle(SealedSide::Exterior)
    }

    /// Starts filling the chamber back to settlement pressure.
    pub fn request_pressurize(&mut self) -> Result<(), AirlockError> {
        self.request_cycle(SealedSide::Interior)
    }

    fn request_cycle(&mut self, target: SealedSide) -> Result<(), AirlockError> {
        if self.phase != Phase::Idle {
            return Err(self.reject(AirlockError::AlreadyCycling(self.phase)));
        }
        if self.sealed == target {
            return Err(self.reject(AirlockError::IllegalState(format!(
                "chamber is already sealed {target}"
            ))));
        }
        let Some(operator) = self.elect(target) else {
            return Err(self.reject(AirlockError::NoOperator));
        };

        let (phase, mode) = match target {
            SealedSide::Exterior => (Phase::Depressurizing, AirlockMode::Egress),
            SealedSide::Interior => (Phase::Pressurizing, AirlockMode::Ingress),
        };
        self.phase = phase;
        self.mode = mode;
        self.operator = Some(operator);
        self.remaining_ticks = self.config.cycle_ticks;

        info!(
            endpoint = %self.endpoint_id(),
            %phase,
            %operator,
            ticks = self.remaining_ticks,
            "cycle started"
        );
        Ok(())
    }

    /// Picks who drives a cycle toward `target`: whoever has waited
    /// longest at the door that opens when it completes, else the
    /// longest-standing occupant.
    fn elect(&self, target: SealedSide) -> Option<EntityId> {
        self.queue(target)
            .front()
            .copied()
            .or_else(|| self.occupants.first().copied())
    }

    /// Re-validates the operator of an active cycle, electing a
    /// replacement or aborting the cycle if nobody is left.
    fn check_operator(&mut self) {
        let Some(target) = self.phase.target_side().filter(|_| self.phase.is_cycling()) else {
            return;
        };
        if let Some(operator) = self.operator {
            if self.occupants.contains(&operator) {
                return;
            }
        }
        match self.elect(target) {
            Some(next) => {
                debug!(endpoint = %self.endpoint_id(), operator = %next, "operator re-elected");
                self.operator = Some(next);
            }
            None => {
                warn!(
                    endpoint = %self.endpoint_id(),
                    phase = %self.phase,
                    sealed = %self.sealed,
                    "no operator left, aborting cycle"
                );
                self.phase = Phase::Idle;
                self.operator = None;
                self.remaining_ticks = 0;
            }
        }
    }

    /// Starts a cycle on queue demand: the far door has waiters and the
    /// near door has none. Returns the side the new cycle is heading to.
    pub fn auto_cycle(&mut self) -> Option<SealedSide> {
        if !self.config.auto_cycle || self.phase != Phase::Idle {
            return None;
        }
        let target = self.sealed.opposite();
        if self.queue(target).is_empty() || !self.queue(self.sealed).is_empty() {
            return None;
        }
        self.request_cycle(target).ok().map(|()| target)
    }

    // -----------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------

    /// Advances the active cycle by the pulse's elapsed ticks.
    ///
    /// Returns the newly sealed side when a cycle completes on this call.
    /// If the atmosphere manager fails, the cycle stays active with no
    /// ticks remaining and completion is retried on the next call.
    pub fn time_passing(&mut self, pulse: &ClockPulse) -> Result<Option<SealedSide>, AirlockError> {
        let lapsed = self.bookings.expire(pulse.tick);
        if !lapsed.is_empty() {
            debug!(endpoint = %self.endpoint_id(), count = lapsed.len(), "bookings lapsed");
        }

        let result = self.advance_cycle(pulse.elapsed_ticks);

        if self.phase == Phase::Idle && self.occupants.is_empty() {
            self.mode = AirlockMode::NotInUse;
        }
        result
    }

    fn advance_cycle(&mut self, elapsed: u32) -> Result<Option<SealedSide>, AirlockError> {
        self.check_operator();
        let cycling = self.phase;
        let (Some(terminal), Some(target)) = (cycling.terminal(), cycling.target_side()) else {
            return Ok(None);
        };

        self.remaining_ticks = self.remaining_ticks.saturating_sub(elapsed);
        if self.remaining_ticks > 0 {
            return Ok(None);
        }

        self.phase = terminal;
        let volume = self.port.descriptor().volume;
        let outcome = match target {
            SealedSide::Exterior => self.port.atmosphere().recapture_air(volume),
            SealedSide::Interior => self.port.atmosphere().release_air(volume),
        };
        if let Err(err) = outcome {
            self.phase = cycling;
            warn!(
                endpoint = %self.endpoint_id(),
                phase = %cycling,
                error = %err,
                "atmosphere exchange failed, cycle held"
            );
            return Err(err.into());
        }

        self.sealed = target;
        self.phase = Phase::Idle;
        self.operator = None;
        self.cycles_completed += 1;
        if target == SealedSide::Exterior {
            self.outer_door_vented = false;
        }

        info!(
            endpoint = %self.endpoint_id(),
            reached = %terminal,
            sealed = %target,
            cycles = self.cycles_completed,
            "cycle complete"
        );
        Ok(Some(target))
    }

    // -----------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------

    pub fn endpoint_id(&self) -> EndpointId {
        self.port.descriptor().id
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn config(&self) -> &ChamberConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sealed_side(&self) -> SealedSide {
        self.sealed
    }

    /// `Pressurized` or `Vacuum` while idle, the active phase otherwise.
    pub fn steady_state(&self) -> Phase {
        if self.phase == Phase::Idle {
            Phase::steady(self.sealed)
        } else {
            self.phase
        }
    }

    pub fn mode(&self) -> AirlockMode {
        self.mode
    }

    pub fn operator(&self) -> Option<EntityId> {
        self.operator
    }

    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    pub fn occupants(&self) -> &[EntityId] {
        &self.occupants
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.occupants.contains(&entity)
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn free_slots(&self) -> usize {
        self.config.capacity.saturating_sub(self.occupants.len())
    }

    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    pub fn queue_lengths(&self) -> QueueLengths {
        QueueLengths {
            inner: self.inner_queue.len(),
            outer: self.outer_queue.len(),
        }
    }

    /// Zero-based position of `entity` in a door queue, and which door.
    pub fn queue_position(&self, entity: EntityId) -> Option<(SealedSide, usize)> {
        [SealedSide::Interior, SealedSide::Exterior]
            .into_iter()
            .find_map(|side| {
                self.queue(side)
                    .iter()
                    .position(|q| *q == entity)
                    .map(|pos| (side, pos))
            })
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    pub fn is_inner_door_locked(&self) -> bool {
        !(self.phase == Phase::Idle && self.sealed == SealedSide::Interior)
    }

    pub fn is_outer_door_locked(&self) -> bool {
        !(self.phase == Phase::Idle && self.sealed == SealedSide::Exterior)
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    pub fn status(&self) -> ChamberStatus {
        let descriptor = self.port.descriptor();
        ChamberStatus {
            endpoint: descriptor.id,
            name: descriptor.name.clone(),
            kind: descriptor.kind,
            phase: self.phase,
            steady_state: self.steady_state(),
            sealed_side: self.sealed,
            mode: self.mode,
            occupants: self.occupants.len(),
            capacity: self.config.capacity,
            volume_liters: self.config.volume_liters,
            queues: self.queue_lengths(),
            operator: self.operator,
            remaining_ticks: self.remaining_ticks,
            cycles_completed: self.cycles_completed,
            inner_door_locked: self.is_inner_door_locked(),
            outer_door_locked: self.is_outer_door_locked(),
            bookings: self.bookings.len(),
        }
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn containers(&self, direction: Direction) -> (ContainerId, ContainerId) {
        let descriptor = self.port.descriptor();
        match direction {
            Direction::Egress => (descriptor.settlement, descriptor.surface),
            Direction::Ingress => (descriptor.surface, descriptor.settlement),
        }
    }

    /// The queue of entities waiting for the door on `side` to open.
    fn queue(&self, side: SealedSide) -> &VecDeque<EntityId> {
        match side {
            SealedSide::Interior => &self.inner_queue,
            SealedSide::Exterior => &self.outer_queue,
        }
    }

    fn queue_mut(&mut self, side: SealedSide) -> &mut VecDeque<EntityId> {
        match side {
            SealedSide::Interior => &mut self.inner_queue,
            SealedSide::Exterior => &mut self.outer_queue,
        }
    }

    /// Logs a caller-contract violation and hands the error back.
    fn reject(&self, err: AirlockError) -> AirlockError {
        error!(endpoint = %self.endpoint_id(), error = %err, "airlock protocol violation");
        err
    }
}

impl<P: EndpointPort> fmt::Debug for AirlockChamber<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirlockChamber")
            .field("endpoint", &self.endpoint_id())
            .field("phase", &self.phase)
            .field("sealed", &self.sealed)
            .field("occupants", &self.occupants)
            .field("inner_queue", &self.inner_queue)
            .field("outer_queue", &self.outer_queue)
            .field("operator", &self.operator)
            .finish()
    }
}
