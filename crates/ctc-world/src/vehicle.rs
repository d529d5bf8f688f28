//! Vehicle state.

use ctc_core::edge::{self, Edge};
use ctc_core::{IntersectionId, PlatoonId, Timestamp, TurnDirection, VehicleId};

use crate::census::CensusRecord;

/// One tracked vehicle.
///
/// The first five fields mirror the census and are overwritten on every
/// ingest; everything else is engine-managed state that survives between
/// ticks until the vehicle disappears from the census.
#[derive(Clone, Debug)]
pub struct Vehicle {
    pub id: VehicleId,
    pub lane: String,
    /// Metres along `edge`.
    pub pos: f64,
    /// Observed speed, m/s.
    pub speed: f64,
    /// Raw simulator edge name; may be an internal `:`-prefixed edge.
    pub edge: String,
    /// Canonical classification of `edge`; `None` while in-junction or on an
    /// unknown edge.  Kept in lock-step with `edge` by the census ingest.
    pub road: Option<Edge>,

    /// The speed the engine wants this vehicle to hold next tick.
    pub desired_speed: f64,
    /// Nearest same-edge same-lane vehicle ahead within detection range.
    pub leader_id: Option<VehicleId>,
    pub platoon_id: Option<PlatoonId>,
    pub is_leader: bool,
    pub turn_direction: Option<TurnDirection>,
    /// Announced next edge, when the simulator provides one.
    pub next_edge: Option<String>,
    pub at_intersection: bool,
    /// Set when intersection arbitration fixed this vehicle's desired speed
    /// for the current tick; car-following synthesis must not override it.
    /// Cleared at every tick start.
    pub speed_pinned: bool,

    /// Seconds of uninterrupted membership in the current platoon.
    pub stable_platoon_time: f64,
    /// Driver reaction time feeding the time-gap term of gap control.
    pub reaction_time: f64,
    /// Consecutive ticks spent below walking pace.
    pub waiting_time: u32,
    /// Seconds since first observed.
    pub travel_time: f64,
    pub counted_in_throughput: bool,
    pub creation_time: Timestamp,
}

impl Vehicle {
    /// Build a vehicle first observed in a census at `now`.
    pub fn observed(
        id: VehicleId,
        record: &CensusRecord,
        now: Timestamp,
        default_desired_speed: f64,
        default_reaction_time: f64,
    ) -> Self {
        let road = Edge::parse(&record.edge);
        Self {
            id,
            lane: record.lane.clone(),
            pos: record.pos,
            speed: record.speed,
            edge: record.edge.clone(),
            road,
            desired_speed: default_desired_speed,
            leader_id: None,
            platoon_id: None,
            is_leader: false,
            turn_direction: None,
            next_edge: None,
            at_intersection: false,
            speed_pinned: false,
            stable_platoon_time: 0.0,
            reaction_time: default_reaction_time,
            waiting_time: 0,
            travel_time: 0.0,
            counted_in_throughput: false,
            creation_time: now,
        }
    }

    /// Effectively standing still.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.speed < 0.5
    }

    /// Fix the desired speed for the rest of this tick; car-following
    /// synthesis leaves pinned vehicles alone.
    #[inline]
    pub fn pin_speed(&mut self, target: f64) {
        self.desired_speed = target;
        self.speed_pinned = true;
    }

    #[inline]
    pub fn on_incoming_edge(&self) -> bool {
        self.road.is_some_and(Edge::is_incoming)
    }

    #[inline]
    pub fn on_leaving_edge(&self) -> bool {
        self.road.is_some_and(Edge::is_leaving)
    }

    /// The intersection owning this vehicle's internal edge, if it is on one.
    pub fn internal_intersection(&self) -> Option<IntersectionId> {
        edge::intersection_prefix(&self.edge).map(IntersectionId::from)
    }
}
