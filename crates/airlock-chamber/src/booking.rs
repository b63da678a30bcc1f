//! Advance bookings: an entity claims an airlock before walking to it.
//!
//! A booking is not a chamber slot. It only signals intent so task logic
//! can spread colonists across airlocks; `reserve` still applies the hard
//! capacity check. Bookings lapse after a fixed number of ticks.

use std::collections::BTreeMap;

use airlock_types::EntityId;

#[derive(Debug, Clone)]
pub(crate) struct BookingLedger {
    /// Tick each booking was made (or last refreshed).
    bookings: BTreeMap<EntityId, u64>,
    max: usize,
    ttl: u64,
}

impl BookingLedger {
    pub(crate) fn new(max: usize, ttl: u64) -> Self {
        Self {
            bookings: BTreeMap::new(),
            max,
            ttl,
        }
    }

    fn lapsed(&self, booked_at: u64, now: u64) -> bool {
        now.saturating_sub(booked_at) > self.ttl
    }

    /// Books (or refreshes a lapsed booking for) `entity`.
    ///
    /// Returns `false` when the ledger is full of live bookings.
    pub(crate) fn book(&mut self, entity: EntityId, now: u64) -> bool {
        if let Some(&booked_at) = self.bookings.get(&entity) {
            if self.lapsed(booked_at, now) {
                self.bookings.insert(entity, now);
            }
            return true;
        }
        self.expire(now);
        if self.bookings.len() >= self.max {
            return false;
        }
        self.bookings.insert(entity, now);
        true
    }

    pub(crate) fn has_booking(&self, entity: EntityId, now: u64) -> bool {
        self.bookings
            .get(&entity)
            .is_some_and(|&booked_at| !self.lapsed(booked_at, now))
    }

    pub(crate) fn cancel(&mut self, entity: EntityId) -> bool {
        self.bookings.remove(&entity).is_some()
    }

    /// Drops every lapsed booking and returns whose they were.
    pub(crate) fn expire(&mut self, now: u64) -> Vec<EntityId> {
        let lapsed: Vec<EntityId> = self
            .bookings
            .iter()
            .filter(|&(_, &booked_at)| self.lapsed(booked_at, now))
            .map(|(&id, _)| id)
            .collect();
        for id in &lapsed {
            self.bookings.remove(id);
        }
        lapsed
    }

    pub(crate) fn len(&self) -> usize {
        self.bookings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_until_full() {
        let mut ledger = BookingLedger::new(2, 40);
        assert!(ledger.book(EntityId(1), 0));
        assert!(ledger.book(EntityId(2), 0));
        assert!(!ledger.book(EntityId(3), 0));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_rebooking_is_not_a_new_slot() {
        let mut ledger = BookingLedger::new(1, 40);
        assert!(ledger.book(EntityId(1), 0));
        assert!(ledger.book(EntityId(1), 5));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_booking_lapses_after_ttl() {
        let mut ledger = BookingLedger::new(4, 40);
        ledger.book(EntityId(1), 10);
        assert!(ledger.has_booking(EntityId(1), 50));
        assert!(!ledger.has_booking(EntityId(1), 51));
        assert_eq!(ledger.expire(51), vec![EntityId(1)]);
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn test_lapsed_bookings_free_room_for_new_ones() {
        let mut ledger = BookingLedger::new(1, 40);
        ledger.book(EntityId(1), 0);
        assert!(ledger.book(EntityId(2), 100));
        assert!(!ledger.has_booking(EntityId(1), 100));
        assert!(ledger.has_booking(EntityId(2), 100));
    }

    #[test]
    fn test_refresh_of_lapsed_booking() {
        let mut ledger = BookingLedger::new(1, 40);
        ledger.book(EntityId(1), 0);
        ledger.book(EntityId(1), 100);
        assert!(ledger.has_booking(EntityId(1), 120));
    }

    #[test]
    fn test_cancel() {
        let mut ledger = BookingLedger::new(4, 40);
        ledger.book(EntityId(1), 0);
        assert!(ledger.cancel(EntityId(1)));
        assert!(!ledger.cancel(EntityId(1)));
    }
}
