use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::rc::Rc;

use airlock::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const SURFACE: ContainerId = ContainerId(0);
const SETTLEMENT: ContainerId = ContainerId(1);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Drill settings, read from the JSON file named by the first argument.
/// Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct DrillConfig {
    colonists: usize,
    airlocks: usize,
    clock: ClockConfig,
    max_pulses: u64,
    seed: Option<u64>,
    /// Chance that the settlement refuses any single transfer.
    transfer_refusal_chance: f64,
    air_reserve_liters: f64,
    chamber: ChamberConfig,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            colonists: 8,
            airlocks: 2,
            clock: ClockConfig::with_rate(20),
            max_pulses: 2_000,
            seed: None,
            transfer_refusal_chance: 0.05,
            air_reserve_liters: 200_000.0,
            chamber: ChamberConfig::default(),
        }
    }
}

impl DrillConfig {
    fn validated(mut self) -> Self {
        if self.airlocks == 0 {
            warn!("a drill needs at least one airlock");
            self.airlocks = 1;
        }
        if self.clock.pulse_rate_hz == 0 {
            warn!("a drill cannot run on a manual clock, using 20 Hz");
            self.clock.pulse_rate_hz = 20;
        }
        self.transfer_refusal_chance = if self.transfer_refusal_chance.is_finite() {
            self.transfer_refusal_chance.clamp(0.0, 0.9)
        } else {
            0.0
        };
        self.chamber = self.chamber.validated();
        self
    }
}

// ---------------------------------------------------------------------------
// In-memory settlement
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct LifeSupport {
    holders: HashMap<EntityId, ContainerId>,
    rng: StdRng,
    refusal_chance: f64,
    air_reserve: f64,
    chamber_liters: f64,
    refusals: u32,
    heat_losses: u32,
}

/// The settlement side of every collaborator, shared by all airlocks.
#[derive(Debug, Clone)]
struct Settlement(Rc<RefCell<LifeSupport>>);

impl Settlement {
    fn new(config: &DrillConfig, rng: StdRng) -> Self {
        Self(Rc::new(RefCell::new(LifeSupport {
            holders: HashMap::new(),
            rng,
            refusal_chance: config.transfer_refusal_chance,
            air_reserve: config.air_reserve_liters,
            chamber_liters: config.chamber.volume_liters,
            refusals: 0,
            heat_losses: 0,
        })))
    }

    fn admit(&self, entity: EntityId, container: ContainerId) {
        self.0.borrow_mut().holders.insert(entity, container);
    }
}

impl ContainerTransferService for Settlement {
    fn transfer(
        &mut self,
        entity: EntityId,
        from: ContainerId,
        to: ContainerId,
    ) -> Result<(), TransferError> {
        let mut life = self.0.borrow_mut();
        if life.holders.get(&entity) != Some(&from) {
            return Err(TransferError::NotInContainer {
                entity,
                container: from,
            });
        }
        let chance = life.refusal_chance;
        if life.rng.random_bool(chance) {
            life.refusals += 1;
            return Err(TransferError::Refused { entity, to });
        }
        life.holders.insert(entity, to);
        Ok(())
    }
}

impl AtmosphereManager for Settlement {
    fn release_air(&mut self, volume: VolumeId) -> Result<(), AtmosphereError> {
        let mut life = self.0.borrow_mut();
        if life.air_reserve < life.chamber_liters {
            return Err(AtmosphereError::Insufficient(volume));
        }
        let liters = life.chamber_liters;
        life.air_reserve -= liters;
        Ok(())
    }

    fn recapture_air(&mut self, _volume: VolumeId) -> Result<(), AtmosphereError> {
        let mut life = self.0.borrow_mut();
        // Pumps never get the last few percent back.
        let liters = life.chamber_liters;
        life.air_reserve += liters * 0.97;
        Ok(())
    }
}

impl ThermalCoupling for Settlement {
    fn notify_outer_door_opened(&mut self) {
        self.0.borrow_mut().heat_losses += 1;
    }
}

fn build_site(config: &DrillConfig, settlement: &Settlement) -> Result<AirlockSite<Handles>, Error> {
    let mut site = AirlockSite::new();
    for i in 1..=config.airlocks as u64 {
        let endpoint = EndpointBuilder::new(EndpointId(i), format!("Airlock {i}"), SETTLEMENT, SURFACE)
            .placement(Placement {
                x: 20.0 * i as f64,
                y: 0.0,
                facing_degrees: 90.0 * (i % 4) as f64,
            })
            .anchors(Anchors {
                interior: LocalPosition::new(-3.0, 0.0),
                exterior: LocalPosition::new(3.0, 0.0),
                chamber: LocalPosition::new(0.0, 0.0),
            })
            .config(config.chamber.clone())
            .transfers(settlement.clone())
            .atmosphere(settlement.clone())
            .thermal(settlement.clone())
            .build()?;
        site.add_endpoint(endpoint)?;
    }
    Ok(site)
}

// ---------------------------------------------------------------------------
// Colonists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
enum Heading {
    Out,
    In,
}

#[derive(Debug)]
struct Colonist {
    record: EntityRecord,
    heading: Heading,
    arrived_at: Option<u64>,
}

impl TransitEntity for Colonist {
    fn id(&self) -> EntityId {
        self.record.id
    }

    fn location_state(&self) -> LocationState {
        self.record.location
    }

    fn owner_container(&self) -> ContainerId {
        self.record.container
    }

    fn set_location_state(&mut self, state: LocationState, container: ContainerId) {
        self.record.location = state;
        self.record.container = container;
    }
}

/// Task logic: every colonist tries to get through an airlock.
struct Drill {
    colonists: Vec<Colonist>,
    order: Vec<usize>,
    rng: StdRng,
}

impl Drill {
    /// Even ids start inside and head out; odd ids start outside and head
    /// in.
    fn new(count: usize, settlement: &Settlement, rng: StdRng) -> Self {
        let colonists: Vec<Colonist> = (1..=count as u64)
            .map(|id| {
                let (location, container, heading) = if id % 2 == 0 {
                    (LocationState::InSettlement, SETTLEMENT, Heading::Out)
                } else {
                    (LocationState::Outside, SURFACE, Heading::In)
                };
                settlement.admit(EntityId(id), container);
                Colonist {
                    record: EntityRecord {
                        id: EntityId(id),
                        location,
                        container,
                    },
                    heading,
                    arrived_at: None,
                }
            })
            .collect();
        let order = (0..colonists.len()).collect();
        Self {
            colonists,
            order,
            rng,
        }
    }

    fn remaining(&self) -> usize {
        self.colonists
            .iter()
            .filter(|c| c.arrived_at.is_none())
            .count()
    }

    /// One pulse of task logic. Breaks once everyone has arrived.
    fn step(&mut self, site: &mut AirlockSite<Handles>, pulse: &ClockPulse) -> ControlFlow<()> {
        self.order.shuffle(&mut self.rng);
        for &i in &self.order {
            let colonist = &mut self.colonists[i];
            if colonist.arrived_at.is_some() {
                continue;
            }
            let id = colonist.id();

            if site.airlock_of(id).is_none() {
                match site.reserve_any(colonist) {
                    Ok(endpoint) => debug!(entity = %id, %endpoint, "reserved"),
                    Err(SiteError::NoEndpointAvailable(_)) => {}
                    Err(err) => warn!(entity = %id, error = %err, "reserve failed"),
                }
                continue;
            }

            let polled = match colonist.heading {
                Heading::Out => site.egress(colonist),
                Heading::In => site.ingress(colonist),
            };
            match polled {
                Ok(Transit::Completed) => {
                    colonist.arrived_at = Some(pulse.tick);
                    info!(entity = %id, heading = ?colonist.heading, tick = pulse.tick, "arrived");
                }
                Ok(Transit::Waiting) => {}
                Err(err) if err.is_environmental() => {
                    debug!(entity = %id, error = %err, "retrying next pulse");
                }
                Err(err) => warn!(entity = %id, error = %err, "transit rejected"),
            }
        }

        if self.remaining() == 0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Persistable roster. Anyone caught mid-transit is saved on the side
    /// of the container still holding them.
    fn roster(&self) -> Result<Vec<EntityRecord>, CodecError> {
        self.colonists
            .iter()
            .map(|c| {
                let mut record = c.record.clone();
                if record.location == LocationState::InAirlock {
                    record.location = if record.container == SURFACE {
                        LocationState::Outside
                    } else {
                        LocationState::InSettlement
                    };
                }
                record.validate(SURFACE)?;
                Ok(record)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct Arrival {
    entity: EntityId,
    heading: Heading,
    tick: Option<u64>,
}

#[derive(Debug, Serialize)]
struct DrillReport {
    run: RunSummary,
    refused_transfers: u32,
    heat_losses: u32,
    air_reserve_liters: f64,
    airlocks: Vec<ChamberStatus>,
    arrivals: Vec<Arrival>,
    roster: Vec<EntityRecord>,
}

fn build_report(
    summary: &RunSummary,
    site: &AirlockSite<Handles>,
    drill: &Drill,
    settlement: &Settlement,
) -> Result<DrillReport, CodecError> {
    let life = settlement.0.borrow();
    Ok(DrillReport {
        run: *summary,
        refused_transfers: life.refusals,
        heat_losses: life.heat_losses,
        air_reserve_liters: life.air_reserve,
        airlocks: site.statuses(),
        arrivals: drill
            .colonists
            .iter()
            .map(|c| Arrival {
                entity: c.record.id,
                heading: c.heading,
                tick: c.arrived_at,
            })
            .collect(),
        roster: drill.roster()?,
    })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => JsonCodec.decode::<DrillConfig>(&std::fs::read(&path)?)?,
        None => DrillConfig::default(),
    }
    .validated();

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let settlement = Settlement::new(&config, StdRng::seed_from_u64(rng.random()));
    let mut drill = Drill::new(config.colonists, &settlement, rng);
    let site = build_site(&config, &settlement)?;

    info!(
        colonists = config.colonists,
        airlocks = config.airlocks,
        rate_hz = config.clock.pulse_rate_hz,
        policy = ?config.clock.policy,
        "egress drill starting, ctrl-c to stop"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received, stopping drill");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        }
    });

    let mut runner = SiteRunner::new(site, SimClock::new(config.clock.clone()));
    let summary = runner
        .run_until(shutdown_rx, Some(config.max_pulses), |site, pulse| {
            drill.step(site, pulse)
        })
        .await;

    if drill.remaining() > 0 {
        warn!(stranded = drill.remaining(), "drill ended before everyone arrived");
    }

    let report = build_report(&summary, runner.site(), &drill, &settlement)?;
    println!("{}", String::from_utf8_lossy(&JsonCodec.encode_pretty(&report)?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drill_config(seed: u64) -> DrillConfig {
        DrillConfig {
            seed: Some(seed),
            ..DrillConfig::default()
        }
        .validated()
    }

    fn setup(config: &DrillConfig) -> (Settlement, Drill, AirlockSite<Handles>) {
        let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or(0));
        let settlement = Settlement::new(config, StdRng::seed_from_u64(rng.random()));
        let drill = Drill::new(config.colonists, &settlement, rng);
        let site = build_site(config, &settlement).unwrap();
        (settlement, drill, site)
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DrillConfig = JsonCodec
            .decode(br#"{"colonists": 3, "chamber": {"capacity": 2}}"#)
            .unwrap();
        assert_eq!(config.colonists, 3);
        assert_eq!(config.airlocks, 2);
        assert_eq!(config.chamber.capacity, 2);
        assert_eq!(config.chamber.cycle_ticks, 10);
        assert_eq!(config.clock.pulse_rate_hz, 20);
    }

    #[test]
    fn test_config_sets_clock_policy() {
        let config: DrillConfig = JsonCodec
            .decode(
                br#"{"clock": {"pulse_rate_hz": 50, "policy": {"catch_up": {"max_catchup": 4}}, "initial_jitter_us": 0}}"#,
            )
            .unwrap();
        assert_eq!(config.clock.pulse_rate_hz, 50);
        assert_eq!(config.clock.policy, OverrunPolicy::CatchUp { max_catchup: 4 });
        assert_eq!(config.clock.initial_jitter_us, 0);
        assert_eq!(config.colonists, 8);
    }

    #[test]
    fn test_validated_config_is_runnable() {
        let config = DrillConfig {
            airlocks: 0,
            clock: ClockConfig::with_rate(0),
            transfer_refusal_chance: 3.0,
            ..DrillConfig::default()
        }
        .validated();
        assert_eq!(config.airlocks, 1);
        assert_eq!(config.clock.pulse_rate_hz, 20);
        assert_eq!(config.transfer_refusal_chance, 0.9);
    }

    #[test]
    fn test_colonists_split_between_headings() {
        let (settlement, drill, _) = setup(&drill_config(1));
        let out = drill
            .colonists
            .iter()
            .filter(|c| c.heading == Heading::Out)
            .count();
        assert_eq!(out, 4);
        assert_eq!(settlement.0.borrow().holders.len(), 8);
    }

    #[test]
    fn test_drill_completes_on_manual_clock() {
        for seed in [3, 11, 29] {
            let config = drill_config(seed);
            let (settlement, mut drill, mut site) = setup(&config);
            let mut clock = ManualClock::new();

            let mut finished = false;
            for _ in 0..config.max_pulses {
                let pulse = clock.step();
                let flow = drill.step(&mut site, &pulse);
                site.time_passing(&pulse);
                if flow.is_break() {
                    finished = true;
                    break;
                }
            }
            assert!(finished, "seed {seed}: drill did not finish");

            let life = settlement.0.borrow();
            for colonist in &drill.colonists {
                let expected = match colonist.heading {
                    Heading::Out => SURFACE,
                    Heading::In => SETTLEMENT,
                };
                assert_eq!(colonist.record.container, expected);
                assert_eq!(life.holders.get(&colonist.record.id), Some(&expected));
            }
            assert!(life.heat_losses >= 1);
            assert!(site.statuses().iter().all(|s| s.occupants == 0));
        }
    }

    #[test]
    fn test_roster_saves_mid_transit_colonists_on_their_side() {
        let config = drill_config(5);
        let (_settlement, mut drill, mut site) = setup(&config);
        let mut clock = ManualClock::new();

        // One pulse: colonists reserve but nobody has crossed yet.
        drill.step(&mut site, &clock.step());
        assert!(
            drill
                .colonists
                .iter()
                .any(|c| c.record.location == LocationState::InAirlock)
        );

        let roster = drill.roster().unwrap();
        assert!(roster.iter().all(|r| r.location != LocationState::InAirlock));
        for record in &roster {
            assert!(record.validate(SURFACE).is_ok());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drill_runs_under_site_runner() {
        let config = drill_config(17);
        let (settlement, mut drill, site) = setup(&config);
        let (_tx, rx) = watch::channel(false);

        let mut runner = SiteRunner::new(site, SimClock::new(config.clock.clone()));
        let summary = runner
            .run_until(rx, Some(config.max_pulses), |site, pulse| {
                drill.step(site, pulse)
            })
            .await;

        assert_eq!(drill.remaining(), 0);
        assert!(summary.pulses < config.max_pulses);
        assert!(summary.cycles_completed >= 1);

        let report = build_report(&summary, runner.site(), &drill, &settlement).unwrap();
        assert_eq!(report.roster.len(), 8);
        let bytes = JsonCodec.encode_pretty(&report).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("\"airlocks\""));
    }
}
