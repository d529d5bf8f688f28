//! Intersections and reservation slots.

use ctc_core::edge::Edge;
use ctc_core::{IntersectionId, PlatoonId, ReservationId, Timestamp, TurnDirection};

/// A logical junction, created lazily the first time a vehicle is observed
/// on one of its internal edges.
#[derive(Clone, Debug)]
pub struct Intersection {
    pub id: IntersectionId,
    /// Canonical edges adjacent to this junction.  In the single-crossing
    /// topology every canonical edge is adjacent.
    pub edges: Vec<Edge>,
    /// Vehicles currently considered at this intersection, id-sorted.
    /// Rebuilt from scratch on every census ingest.
    pub vehicles: Vec<ctc_core::VehicleId>,
    /// When scored priority last released a platoon through, driving the
    /// grant cooldown.
    pub last_platoon_pass_time: Timestamp,
    pub has_reservation: bool,
}

impl Intersection {
    /// New intersection observed at `now`.  The pass timer starts in the
    /// past so the first scored grant is not held back by the cooldown.
    pub fn observed(id: IntersectionId, now: Timestamp) -> Self {
        Self {
            id,
            edges: Edge::ALL.to_vec(),
            vehicles: Vec::new(),
            last_platoon_pass_time: now.rewind(std::time::Duration::from_secs(10)),
            has_reservation: false,
        }
    }

    pub fn is_adjacent(&self, edge: Edge) -> bool {
        self.edges.contains(&edge)
    }
}

/// A time-bounded permission for one platoon to traverse one intersection
/// from a given approach and movement.
#[derive(Clone, Debug)]
pub struct Reservation {
    /// Always `<platoon_id>_<intersection_id>`.
    pub id: ReservationId,
    pub intersection_id: IntersectionId,
    pub platoon_id: PlatoonId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Approach edge at booking time (raw simulator name).
    pub edge_from: String,
    /// Movement at booking time; `None` when the platoon leader had not
    /// been classified yet.
    pub direction: Option<TurnDirection>,
}

impl Reservation {
    /// Is the slot currently open?
    #[inline]
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.start_time < now && now < self.end_time
    }

    /// Has the slot passed entirely?
    #[inline]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.end_time < now
    }

    /// Does `[start, end]` overlap this slot's window?
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        !(self.end_time < start || end < self.start_time)
    }
}
