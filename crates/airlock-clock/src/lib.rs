//! Simulation tick source for the airlock subsystem.
//!
//! Ticks are the only notion of time the airlock protocol has. Every
//! time-advance call receives a [`ClockPulse`] saying which tick the
//! simulation has reached and how many ticks the pulse covers; chamber
//! cycles consume `elapsed_ticks`, never wall-clock time.
//!
//! Two sources produce pulses:
//!
//! - [`ManualClock`]: stepped explicitly. Deterministic; what tests and
//!   headless replays use.
//! - [`SimClock`]: fires pulses at a fixed rate on the Tokio timer, with
//!   an overrun policy for when the host falls behind.
//!
//! # Manual mode
//!
//! A `SimClock` configured with `pulse_rate_hz == 0` never fires:
//! [`SimClock::wait_for_pulse`] pends forever, so it can sit inside a
//! `tokio::select!` next to other branches without spinning.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         pulse = clock.wait_for_pulse() => site.time_passing(&pulse),
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// ClockPulse
// ---------------------------------------------------------------------------

/// One time-advance step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockPulse {
    /// The simulation tick reached at the end of this pulse. Monotonic.
    pub tick: u64,
    /// How many ticks this pulse advances. Normally 1; larger when a
    /// catch-up policy folds missed ticks in, 0 for a housekeeping-only
    /// pulse.
    pub elapsed_ticks: u32,
    /// `true` if the pulse fired noticeably after its deadline.
    pub late: bool,
}

impl ClockPulse {
    pub fn new(tick: u64, elapsed_ticks: u32) -> Self {
        Self {
            tick,
            elapsed_ticks,
            late: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// A clock advanced by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    tick: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting from `tick`, e.g. when resuming a saved simulation.
    pub fn starting_at(tick: u64) -> Self {
        Self { tick }
    }

    /// Advances the clock by `ticks` and returns the pulse covering them.
    pub fn advance(&mut self, ticks: u32) -> ClockPulse {
        self.tick += u64::from(ticks);
        ClockPulse::new(self.tick, ticks)
    }

    /// Shorthand for `advance(1)`.
    pub fn step(&mut self) -> ClockPulse {
        self.advance(1)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the host wakes up after one or more pulse deadlines
/// have already passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrunPolicy {
    /// Drop the missed ticks; the simulation simply runs slower.
    #[default]
    Skip,
    /// Fold up to `max_catchup` missed ticks into the next pulse's
    /// `elapsed_ticks`. Anything beyond the cap is dropped.
    CatchUp { max_catchup: u32 },
    /// Keep the original cadence: the next deadline stays where it was
    /// scheduled, even if that means firing again immediately.
    Drop,
}

/// Configuration for [`SimClock`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Pulses per second. 0 = manual mode (never fires).
    pub pulse_rate_hz: u32,
    pub policy: OverrunPolicy,
    /// Random delay (0..max µs) added to the first pulse only, so clocks
    /// started together do not fire in lockstep.
    pub initial_jitter_us: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            pulse_rate_hz: 0,
            policy: OverrunPolicy::default(),
            initial_jitter_us: 2_000,
        }
    }
}

impl ClockConfig {
    /// Maximum supported pulse rate.
    pub const MAX_PULSE_RATE_HZ: u32 = 128;

    pub fn with_rate(pulse_rate_hz: u32) -> Self {
        Self {
            pulse_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`SimClock::new`].
    pub fn validated(mut self) -> Self {
        if self.pulse_rate_hz > Self::MAX_PULSE_RATE_HZ {
            warn!(
                rate = self.pulse_rate_hz,
                max = Self::MAX_PULSE_RATE_HZ,
                "pulse_rate_hz exceeds maximum, clamping"
            );
            self.pulse_rate_hz = Self::MAX_PULSE_RATE_HZ;
        }
        self
    }

    /// Interval between pulses, or `None` in manual mode.
    pub fn pulse_interval(&self) -> Option<Duration> {
        if self.pulse_rate_hz == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / self.pulse_rate_hz as f64))
        }
    }
}

// ---------------------------------------------------------------------------
// SimClock
// ---------------------------------------------------------------------------

/// Fixed-rate pulse source driven by the Tokio timer.
///
/// One clock drives a whole site: every endpoint advances on the same
/// pulse, which keeps the simulation single-threaded and ordered.
pub struct SimClock {
    config: ClockConfig,
    interval: Option<Duration>,
    tick: u64,
    next_pulse: Option<Instant>,
    paused: bool,
    missed_ticks: u64,
}

impl SimClock {
    pub fn new(config: ClockConfig) -> Self {
        let config = config.validated();
        let interval = config.pulse_interval();

        let next_pulse = interval.map(|d| {
            let jitter = if config.initial_jitter_us > 0 {
                Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
            } else {
                Duration::ZERO
            };
            Instant::now() + d + jitter
        });

        match interval {
            None => debug!("sim clock created in manual mode"),
            Some(d) => debug!(
                rate_hz = config.pulse_rate_hz,
                interval_ms = d.as_secs_f64() * 1000.0,
                policy = ?config.policy,
                "sim clock created"
            ),
        }

        Self {
            config,
            interval,
            tick: 0,
            next_pulse,
            paused: false,
            missed_ticks: 0,
        }
    }

    pub fn with_rate(pulse_rate_hz: u32) -> Self {
        Self::new(ClockConfig::with_rate(pulse_rate_hz))
    }

    /// Waits until the next pulse is due.
    ///
    /// In manual mode or while paused this future never resolves.
    pub async fn wait_for_pulse(&mut self) -> ClockPulse {
        let (deadline, interval) = match (self.next_pulse, self.interval) {
            (Some(deadline), Some(interval)) if !self.paused => (deadline, interval),
            _ => std::future::pending().await,
        };

        time::sleep_until(deadline).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(deadline);
        // More than 10% of an interval late counts as an overrun.
        let late = late_by > interval / 10;
        let behind = if late {
            (late_by.as_nanos() / interval.as_nanos()) as u64
        } else {
            0
        };

        let (elapsed, missed, next) = match self.config.policy {
            OverrunPolicy::Skip => (1, behind, now + interval),
            OverrunPolicy::CatchUp { max_catchup } => {
                let folded = behind.min(u64::from(max_catchup));
                (1 + folded, behind - folded, now + interval)
            }
            OverrunPolicy::Drop => (1, 0, deadline + interval),
        };
        self.next_pulse = Some(next);

        if missed > 0 {
            warn!(
                tick = self.tick,
                missed,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "clock overrun, dropping ticks"
            );
        }
        self.missed_ticks += missed;

        let elapsed_ticks = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.tick += u64::from(elapsed_ticks);

        trace!(tick = self.tick, elapsed_ticks, late, "pulse fired");

        ClockPulse {
            tick: self.tick,
            elapsed_ticks,
            late,
        }
    }

    /// Stops pulses until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick, "sim clock paused");
        }
    }

    /// Resumes after a pause. The next deadline is one interval from now,
    /// so time spent paused is never caught up.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(interval) = self.interval {
                self.next_pulse = Some(Instant::now() + interval);
            }
            debug!(tick = self.tick, "sim clock resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_manual(&self) -> bool {
        self.interval.is_none()
    }

    /// The simulation tick reached so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Total ticks dropped by the overrun policy.
    pub fn missed_ticks(&self) -> u64 {
        self.missed_ticks
    }

    pub fn pulse_rate_hz(&self) -> u32 {
        self.config.pulse_rate_hz
    }

    pub fn pulse_interval(&self) -> Option<Duration> {
        self.interval
    }
}
