//! Integration tests for the async site runner.
//!
//! Runs with paused tokio time: pulse deadlines resolve as soon as the
//! runtime is otherwise idle.

mod common;

use std::ops::ControlFlow;
use std::time::Duration;

use airlock::prelude::*;
use common::{SETTLEMENT, Settlement};
use tokio::sync::watch;

fn runner(settlement: &Settlement, rate_hz: u32) -> SiteRunner<Handles> {
    let mut site = AirlockSite::new();
    site.add_endpoint(settlement.endpoint(1, ChamberConfig::default()))
        .unwrap();
    let clock = SimClock::new(ClockConfig {
        initial_jitter_us: 0,
        ..ClockConfig::with_rate(rate_hz)
    });
    SiteRunner::new(site, clock)
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_after_max_pulses() {
    let settlement = Settlement::default();
    let mut runner = runner(&settlement, 20);
    let (_tx, rx) = watch::channel(false);

    let mut seen = Vec::new();
    let summary = runner
        .run_until(rx, Some(5), |_, pulse| {
            seen.push(pulse.tick);
            ControlFlow::Continue(())
        })
        .await;

    assert_eq!(summary.pulses, 5);
    assert_eq!(summary.last_tick, 5);
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_run_drives_egress_to_completion() {
    let settlement = Settlement::default();
    let mut runner = runner(&settlement, 10);
    let (_tx, rx) = watch::channel(false);
    let mut colonist = settlement.spawn(1, SETTLEMENT);
    runner
        .site_mut()
        .reserve(&mut colonist, EndpointId(1))
        .unwrap();

    let summary = runner
        .run_until(rx, Some(100), |site, _| {
            match site.egress(&mut colonist) {
                Ok(Transit::Completed) => ControlFlow::Break(()),
                Ok(Transit::Waiting) => ControlFlow::Continue(()),
                Err(e) => panic!("egress failed: {e}"),
            }
        })
        .await;

    // Pulse 1 queues and starts the cycle, pulses 2-11 run it, pulse 12
    // opens the outer door.
    assert_eq!(summary.pulses, 12);
    assert_eq!(summary.cycles_completed, 1);
    assert_eq!(summary.failures, 0);
    assert_eq!(colonist.location, LocationState::Outside);
    assert_eq!(runner.site().airlock_of(colonist.id), None);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_already_requested() {
    let settlement = Settlement::default();
    let mut runner = runner(&settlement, 20);
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let summary = runner
        .run_until(rx, None, |_, _| ControlFlow::Continue(()))
        .await;
    assert_eq!(summary.pulses, 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_sender_stops_run() {
    let settlement = Settlement::default();
    let mut runner = runner(&settlement, 20);
    let (tx, rx) = watch::channel(false);
    drop(tx);

    let summary = runner
        .run_until(rx, None, |_, _| ControlFlow::Continue(()))
        .await;
    assert_eq!(summary.pulses, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_run() {
    let settlement = Settlement::default();
    let mut runner = runner(&settlement, 10);
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(550)).await;
        let _ = tx.send(true);
    });

    let summary = runner
        .run_until(rx, None, |_, _| ControlFlow::Continue(()))
        .await;
    assert_eq!(summary.pulses, 5);
}

#[tokio::test(start_paused = true)]
async fn test_manual_clock_only_stops_on_shutdown() {
    let settlement = Settlement::default();
    let mut runner = runner(&settlement, 0);
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        let _ = tx.send(true);
    });

    let summary = runner
        .run_until(rx, Some(3), |_, _| ControlFlow::Continue(()))
        .await;
    assert_eq!(summary.pulses, 0);
    assert!(runner.clock().is_manual());
}
