//! Chamber configuration and the phase state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ChamberConfig
// ---------------------------------------------------------------------------

/// Configuration for one airlock chamber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChamberConfig {
    /// Maximum simultaneous occupants of the physical chamber.
    pub capacity: usize,

    /// Ticks a single pressurize or depressurize half-cycle takes.
    pub cycle_ticks: u32,

    /// Whether the endpoint starts cycles by itself when one door queue
    /// has demand and the other is empty.
    pub auto_cycle: bool,

    /// Maximum number of live advance bookings.
    pub max_bookings: usize,

    /// Ticks after which an advance booking lapses.
    pub booking_ttl_ticks: u64,

    /// Internal volume of the chamber in litres, reported in
    /// `ChamberStatus`. The atmosphere manager keys its bookkeeping on the
    /// volume id, not on this figure.
    pub volume_liters: f64,
}

impl Default for ChamberConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            cycle_ticks: 10,
            auto_cycle: true,
            max_bookings: 4,
            booking_ttl_ticks: 40,
            volume_liters: 12_000.0,
        }
    }
}

impl ChamberConfig {
    /// Clamps values the protocol cannot run with: a chamber holds at
    /// least one entity and a half-cycle lasts at least one tick.
    pub fn validated(mut self) -> Self {
        if self.capacity == 0 {
            tracing::warn!("chamber capacity of 0 clamped to 1");
            self.capacity = 1;
        }
        if self.cycle_ticks == 0 {
            tracing::warn!("cycle_ticks of 0 clamped to 1");
            self.cycle_ticks = 1;
        }
        if !self.volume_liters.is_finite() || self.volume_liters < 0.0 {
            self.volume_liters = 0.0;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// SealedSide
// ---------------------------------------------------------------------------

/// Which door is currently safe to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SealedSide {
    /// The chamber is at settlement pressure; the inner door may open.
    Interior,
    /// The chamber is at vacuum; the outer door may open.
    Exterior,
}

impl SealedSide {
    pub fn opposite(self) -> Self {
        match self {
            Self::Interior => Self::Exterior,
            Self::Exterior => Self::Interior,
        }
    }
}

impl fmt::Display for SealedSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interior => write!(f, "Interior"),
            Self::Exterior => write!(f, "Exterior"),
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The chamber's position in the pressurize/depressurize cycle.
///
/// ```text
///          request_depressurize              cycle_ticks elapse
/// Idle(Interior) ──→ Depressurizing ──→ Vacuum ──→ Idle(Exterior)
///
///          request_pressurize                cycle_ticks elapse
/// Idle(Exterior) ──→ Pressurizing ──→ Pressurized ──→ Idle(Interior)
/// ```
///
/// `Vacuum` and `Pressurized` are terminal sub-states a cycle passes
/// through at the moment it completes; the chamber settles back to `Idle`
/// in the same time-advance call, with the sealed side recording which
/// steady state it is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Pressurized,
    Depressurizing,
    Vacuum,
    Pressurizing,
}

impl Phase {
    /// Returns `true` for the two phases that have an active cycle and
    /// therefore an operator.
    pub fn is_cycling(&self) -> bool {
        matches!(self, Self::Depressurizing | Self::Pressurizing)
    }

    /// The terminal sub-state an active cycle reaches, `None` otherwise.
    pub fn terminal(self) -> Option<Self> {
        match self {
            Self::Depressurizing => Some(Self::Vacuum),
            Self::Pressurizing => Some(Self::Pressurized),
            _ => None,
        }
    }

    /// The side that becomes safe once this phase's cycle completes.
    pub fn target_side(self) -> Option<SealedSide> {
        match self {
            Self::Depressurizing | Self::Vacuum => Some(SealedSide::Exterior),
            Self::Pressurizing | Self::Pressurized => Some(SealedSide::Interior),
            Self::Idle => None,
        }
    }

    /// The steady state an idle chamber sealed on `side` is in.
    pub fn steady(side: SealedSide) -> Self {
        match side {
            SealedSide::Interior => Self::Pressurized,
            SealedSide::Exterior => Self::Vacuum,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Pressurized => write!(f, "Pressurized"),
            Self::Depressurizing => write!(f, "Depressurizing"),
            Self::Vacuum => write!(f, "Vacuum"),
            Self::Pressurizing => write!(f, "Pressurizing"),
        }
    }
}

// ---------------------------------------------------------------------------
// AirlockMode
// ---------------------------------------------------------------------------

/// What the chamber is currently being used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AirlockMode {
    #[default]
    NotInUse,
    Ingress,
    Egress,
}

impl fmt::Display for AirlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInUse => write!(f, "NotInUse"),
            Self::Ingress => write!(f, "Ingress"),
            Self::Egress => write!(f, "Egress"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_half_cycles_are_cycling() {
        assert!(Phase::Depressurizing.is_cycling());
        assert!(Phase::Pressurizing.is_cycling());
        assert!(!Phase::Idle.is_cycling());
        assert!(!Phase::Vacuum.is_cycling());
        assert!(!Phase::Pressurized.is_cycling());
    }

    #[test]
    fn test_terminal_sub_states() {
        assert_eq!(Phase::Depressurizing.terminal(), Some(Phase::Vacuum));
        assert_eq!(Phase::Pressurizing.terminal(), Some(Phase::Pressurized));
        assert_eq!(Phase::Idle.terminal(), None);
    }

    #[test]
    fn test_target_side() {
        assert_eq!(
            Phase::Depressurizing.target_side(),
            Some(SealedSide::Exterior)
        );
        assert_eq!(
            Phase::Pressurizing.target_side(),
            Some(SealedSide::Interior)
        );
        assert_eq!(Phase::Idle.target_side(), None);
    }

    #[test]
    fn test_steady_state_for_side() {
        assert_eq!(Phase::steady(SealedSide::Interior), Phase::Pressurized);
        assert_eq!(Phase::steady(SealedSide::Exterior), Phase::Vacuum);
        assert_eq!(SealedSide::Interior.opposite(), SealedSide::Exterior);
    }

    #[test]
    fn test_config_default() {
        let config = ChamberConfig::default();
        assert_eq!(config.capacity, 4);
        assert_eq!(config.cycle_ticks, 10);
        assert!(config.auto_cycle);
        assert_eq!(config.max_bookings, 4);
        assert_eq!(config.booking_ttl_ticks, 40);
    }

    #[test]
    fn test_config_validated_clamps_zeroes() {
        let config = ChamberConfig {
            capacity: 0,
            cycle_ticks: 0,
            volume_liters: f64::NAN,
            ..ChamberConfig::default()
        }
        .validated();
        assert_eq!(config.capacity, 1);
        assert_eq!(config.cycle_ticks, 1);
        assert_eq!(config.volume_liters, 0.0);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: ChamberConfig = serde_json::from_str(r#"{"capacity": 2}"#).unwrap();
        assert_eq!(config.capacity, 2);
        assert_eq!(config.cycle_ticks, 10);
    }

    #[test]
    fn test_display() {
        assert_eq!(Phase::Depressurizing.to_string(), "Depressurizing");
        assert_eq!(SealedSide::Exterior.to_string(), "Exterior");
        assert_eq!(AirlockMode::NotInUse.to_string(), "NotInUse");
    }
}
