//! The `Engine` struct and its tick entry point.

use log::debug;

use ctc_core::{EngineConfig, PlatoonId, TimeStep, Timestamp, VehicleId};
use ctc_world::census::{self, Census};
use ctc_world::World;

use crate::{arbiter, platoons, reservations, speed};

/// Which coordination policy drives the outbound speeds.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Algorithm {
    /// The full platoon/priority/reservation pipeline.
    #[default]
    Coordinated,
    /// Ingest the census and echo observed speeds unchanged, leaving all
    /// control to the simulator.  Used as the comparison baseline.
    Passthrough,
}

/// The per-tick coordination engine.
///
/// Owns the [`World`] outright; a tick runs the full phase pipeline with no
/// interleaving.  Consumers (metrics, reporting) observe the world between
/// ticks through the observer hooks or by reading `world` directly.
pub struct Engine {
    pub config: EngineConfig,
    pub world: World,
    pub algorithm: Algorithm,
    /// Completed census exchanges.
    pub step: TimeStep,
    last_tick_at: Option<Timestamp>,
}

impl Engine {
    pub fn new(config: EngineConfig, algorithm: Algorithm) -> Self {
        Self {
            config,
            world: World::new(),
            algorithm,
            step: TimeStep::ZERO,
            last_tick_at: None,
        }
    }

    /// Process one census at time `now`.
    ///
    /// Runs ingest, the per-vehicle clocks, and — under
    /// [`Algorithm::Coordinated`] — the platoon, reservation, arbitration
    /// and speed phases, in that order.  Desired speeds for every vehicle
    /// are final once this returns.
    pub fn tick(&mut self, census: &Census, now: Timestamp) {
        self.step = self.step.next();
        let dt = self
            .last_tick_at
            .map(|last| now.since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick_at = Some(now);

        census::apply(&mut self.world, census, now, &self.config);
        for v in self.world.vehicles.values_mut() {
            v.speed_pinned = false;
        }
        self.update_vehicle_clocks(dt);
        self.world.throughput_step = 0;
        self.world.mark_throughput();

        match self.algorithm {
            Algorithm::Passthrough => {
                for v in self.world.vehicles.values_mut() {
                    v.desired_speed = v.speed;
                }
            }
            Algorithm::Coordinated => {
                let membership = self.world.vehicle_platoon.clone();
                platoons::update(&mut self.world, &self.config, self.step);
                self.age_memberships(&membership, dt);

                reservations::estimate_stability(&mut self.world, &self.config);
                reservations::schedule_slots(&mut self.world, &self.config, now);
                arbiter::manage_intersections(&mut self.world, &self.config, now, self.step);

                speed::synchronize(&mut self.world, &self.config);
                speed::platoon_cohesion(&mut self.world, &self.config);
                speed::density_adjust(&mut self.world, &self.config);
            }
        }

        let stats = self.world.stats();
        debug!(
            "step {}: vehicles: {}, platoons: {}, intersections: {}",
            self.step, stats.vehicle_count, stats.platoon_count, stats.intersection_count
        );
    }

    /// Per-vehicle waiting and travel clocks.
    fn update_vehicle_clocks(&mut self, dt: f64) {
        for v in self.world.vehicles.values_mut() {
            if v.speed < 0.5 {
                v.waiting_time += 1;
            } else {
                v.waiting_time = 0;
            }
            v.travel_time += dt;
        }
    }

    /// Grow `stable_platoon_time` for vehicles that kept their platoon
    /// through this tick's maintenance phases.  Joins and moves were reset
    /// to zero by the relational helpers.
    fn age_memberships(&mut self, before: &std::collections::BTreeMap<VehicleId, PlatoonId>, dt: f64) {
        for (vid, v) in self.world.vehicles.iter_mut() {
            if let Some(pid) = &v.platoon_id {
                if before.get(vid) == Some(pid) {
                    v.stable_platoon_time += dt;
                }
            }
        }
    }

}
