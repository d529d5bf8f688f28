//! Engine configuration.
//!
//! Every tunable of the coordination engine in one place.  Speeds are m/s
//! (13.9 ≈ 50 km/h, 16.7 ≈ 60, 19.4 ≈ 70, 22.2 ≈ 80); distances are metres.
//! The defaults are the values the coordination policy was calibrated
//! against and are what every test uses.

use std::time::Duration;

/// Top-level configuration threaded through every engine phase.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    // ── Platoon formation ─────────────────────────────────────────────────
    /// How far ahead a vehicle looks for a same-lane leader.
    pub detection_distance: f64,

    /// Maximum leader gap at which a brand-new platoon forms.
    pub formation_gap: f64,

    /// Radius within which two platoon leaders trigger consolidation.
    pub consolidation_range: f64,

    /// Hard cap on platoon size; larger platoons are split.
    pub max_platoon_size: usize,

    /// Seconds of continuous membership before a follower counts as stable.
    pub stable_membership_secs: f64,

    // ── Car following ─────────────────────────────────────────────────────
    /// Base optimal following gap before speed/stability scaling.
    pub following_gap: f64,

    /// Default desired speed assigned to newly observed vehicles.
    pub default_desired_speed: f64,

    /// Default driver reaction time (seconds) for the time-gap term.
    pub default_reaction_time: f64,

    // ── Speed ceilings ────────────────────────────────────────────────────
    pub max_regular_speed: f64,
    pub max_platoon_speed: f64,
    /// Ceiling granted to highly stable platoons on open road.
    pub stable_platoon_speed: f64,

    // ── Intersection policy ───────────────────────────────────────────────
    /// How long a granted priority window lasts.
    pub priority_window: Duration,

    /// Minimum spacing between scored priority grants at one intersection.
    pub pass_cooldown: Duration,

    /// Accumulated wait (weighted units) that forces priority on its own.
    pub forced_priority_wait: u32,

    /// Platoon size that forces priority on its own.
    pub forced_priority_size: usize,

    // ── Reservations ──────────────────────────────────────────────────────
    /// Only book slots for platoons at least this large…
    pub reservation_min_size: usize,

    /// …and at least this stable.
    pub reservation_min_stability: f64,

    /// Look-ahead distance beyond which no slot is booked.
    pub reservation_horizon: f64,

    /// Floor applied to leader speed when estimating arrival.
    pub reservation_min_speed: f64,

    /// Slot seconds reserved per platoon member.
    pub slot_secs_per_vehicle: f64,

    // ── Census ────────────────────────────────────────────────────────────
    /// Minimum interval between traffic-density recomputations.
    pub density_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detection_distance: 50.0,
            formation_gap: 25.0,
            consolidation_range: 30.0,
            max_platoon_size: 15,
            stable_membership_secs: 5.0,

            following_gap: 10.0,
            default_desired_speed: 13.9,
            default_reaction_time: 0.5,

            max_regular_speed: 16.7,
            max_platoon_speed: 19.4,
            stable_platoon_speed: 22.2,

            priority_window: Duration::from_secs(15),
            pass_cooldown: Duration::from_secs(3),
            forced_priority_wait: 60,
            forced_priority_size: 5,

            reservation_min_size: 3,
            reservation_min_stability: 0.6,
            reservation_horizon: 100.0,
            reservation_min_speed: 5.0,
            slot_secs_per_vehicle: 1.5,

            density_interval: Duration::from_secs(2),
        }
    }
}
