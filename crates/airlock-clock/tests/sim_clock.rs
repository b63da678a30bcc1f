//! Integration tests for the fixed-rate sim clock.
//!
//! Uses paused Tokio time so `sleep_until` resolves as soon as the
//! runtime auto-advances the clock.

use std::time::Duration;

use airlock_clock::{ClockConfig, OverrunPolicy, SimClock};

fn config_20hz() -> ClockConfig {
    ClockConfig {
        initial_jitter_us: 0,
        ..ClockConfig::with_rate(20)
    }
}

// =========================================================================
// ClockConfig
// =========================================================================

#[test]
fn test_default_config_is_manual() {
    let cfg = ClockConfig::default();
    assert_eq!(cfg.pulse_rate_hz, 0);
    assert_eq!(cfg.pulse_interval(), None);
}

#[test]
fn test_with_rate_sets_interval() {
    let cfg = ClockConfig::with_rate(20);
    assert_eq!(cfg.pulse_interval(), Some(Duration::from_millis(50)));
}

#[test]
fn test_clock_initial_state() {
    let clock = SimClock::new(config_20hz());
    assert_eq!(clock.tick(), 0);
    assert_eq!(clock.pulse_rate_hz(), 20);
    assert!(!clock.is_manual());
    assert!(!clock.is_paused());
    assert_eq!(clock.missed_ticks(), 0);
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pulses_advance_one_tick_each() {
    let mut clock = SimClock::new(config_20hz());

    for expected in 1..=5 {
        let pulse = clock.wait_for_pulse().await;
        assert_eq!(pulse.tick, expected);
        assert_eq!(pulse.elapsed_ticks, 1);
        assert!(!pulse.late);
    }
    assert_eq!(clock.tick(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_manual_mode_never_fires() {
    let mut clock = SimClock::new(ClockConfig::default());
    assert!(clock.is_manual());

    let result = tokio::time::timeout(Duration::from_secs(5), clock.wait_for_pulse()).await;
    assert!(result.is_err(), "manual clock should pend forever");
}

// =========================================================================
// Overrun policies
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_skip_policy_drops_missed_ticks() {
    let mut clock = SimClock::new(config_20hz());
    clock.wait_for_pulse().await;

    // Fall behind by ~4 intervals.
    tokio::time::advance(Duration::from_millis(250)).await;

    let pulse = clock.wait_for_pulse().await;
    assert!(pulse.late);
    assert_eq!(pulse.elapsed_ticks, 1);
    assert_eq!(pulse.tick, 2);
    assert!(clock.missed_ticks() > 0);
}

#[tokio::test(start_paused = true)]
async fn test_catch_up_folds_missed_ticks_into_pulse() {
    let mut clock = SimClock::new(ClockConfig {
        policy: OverrunPolicy::CatchUp { max_catchup: 2 },
        ..config_20hz()
    });
    clock.wait_for_pulse().await;

    tokio::time::advance(Duration::from_millis(250)).await;

    let pulse = clock.wait_for_pulse().await;
    assert!(pulse.late);
    // One regular tick plus at most two folded ones.
    assert_eq!(pulse.elapsed_ticks, 3);
    assert_eq!(pulse.tick, 4);
}

#[tokio::test(start_paused = true)]
async fn test_drop_policy_keeps_cadence() {
    let mut clock = SimClock::new(ClockConfig {
        policy: OverrunPolicy::Drop,
        ..config_20hz()
    });
    clock.wait_for_pulse().await;

    tokio::time::advance(Duration::from_millis(250)).await;

    let pulse = clock.wait_for_pulse().await;
    assert_eq!(pulse.elapsed_ticks, 1);
    assert_eq!(clock.missed_ticks(), 0);
}

// =========================================================================
// Pause / resume
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_stops_pulses() {
    let mut clock = SimClock::new(config_20hz());
    clock.wait_for_pulse().await;

    clock.pause();
    assert!(clock.is_paused());

    let result = tokio::time::timeout(Duration::from_secs(1), clock.wait_for_pulse()).await;
    assert!(result.is_err(), "paused clock should pend");
}

#[tokio::test(start_paused = true)]
async fn test_resume_continues_tick_count() {
    let mut clock = SimClock::new(config_20hz());
    clock.wait_for_pulse().await;
    clock.pause();
    clock.pause();
    clock.resume();
    clock.resume();
    assert!(!clock.is_paused());

    let pulse = clock.wait_for_pulse().await;
    assert_eq!(pulse.tick, 2);
    assert!(!pulse.late);
}
