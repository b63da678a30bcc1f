//! The async pulse loop that drives a site in real time.

use std::ops::ControlFlow;

use airlock_chamber::EndpointPort;
use airlock_clock::{ClockPulse, SimClock};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::AirlockSite;

/// Totals for one [`SiteRunner::run_until`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub pulses: u64,
    pub cycles_completed: u64,
    pub failures: u64,
    /// The tick the clock had reached when the run stopped.
    pub last_tick: u64,
}

/// Drives an [`AirlockSite`] from a [`SimClock`].
///
/// On every pulse the caller's task logic runs first (reserving, polling
/// egress and ingress), then the site advances. Everything happens on the
/// task awaiting [`run_until`](Self::run_until), so the site itself
/// needs no locking.
pub struct SiteRunner<P: EndpointPort> {
    site: AirlockSite<P>,
    clock: SimClock,
}

impl<P: EndpointPort> SiteRunner<P> {
    pub fn new(site: AirlockSite<P>, clock: SimClock) -> Self {
        Self { site, clock }
    }

    pub fn site(&self) -> &AirlockSite<P> {
        &self.site
    }

    pub fn site_mut(&mut self) -> &mut AirlockSite<P> {
        &mut self.site
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut SimClock {
        &mut self.clock
    }

    pub fn into_site(self) -> AirlockSite<P> {
        self.site
    }

    /// Runs pulses until `shutdown` turns `true` (or its sender is
    /// dropped), `max_pulses` have fired, or `on_pulse` breaks.
    ///
    /// A manual or paused clock never pulses, so the run then only ends
    /// on shutdown.
    pub async fn run_until<F>(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
        max_pulses: Option<u64>,
        mut on_pulse: F,
    ) -> RunSummary
    where
        F: FnMut(&mut AirlockSite<P>, &ClockPulse) -> ControlFlow<()>,
    {
        let mut summary = RunSummary {
            last_tick: self.clock.tick(),
            ..RunSummary::default()
        };
        info!(rate_hz = self.clock.pulse_rate_hz(), ?max_pulses, "site runner started");

        loop {
            if max_pulses.is_some_and(|max| summary.pulses >= max) {
                debug!(pulses = summary.pulses, "pulse limit reached");
                break;
            }

            tokio::select! {
                biased;

                _ = shutdown.wait_for(|stop| *stop) => {
                    info!(tick = self.clock.tick(), "shutdown requested");
                    break;
                }
                pulse = self.clock.wait_for_pulse() => {
                    summary.pulses += 1;
                    summary.last_tick = pulse.tick;

                    let flow = on_pulse(&mut self.site, &pulse);
                    let report = self.site.time_passing(&pulse);
                    summary.cycles_completed += report.completed.len() as u64;
                    summary.failures += report.failures.len() as u64;

                    if flow.is_break() {
                        debug!(tick = pulse.tick, "task logic finished");
                        break;
                    }
                }
            }
        }

        info!(
            pulses = summary.pulses,
            cycles = summary.cycles_completed,
            failures = summary.failures,
            "site runner stopped"
        );
        summary
    }
}
