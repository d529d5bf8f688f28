//! Platoon state.

use ctc_core::{PlatoonId, Timestamp, VehicleId};

/// A same-edge, same-lane convoy of at least two vehicles.
///
/// `vehicle_ids` preserves attachment order; front-to-back position order is
/// recovered on demand by [`World::ordered_members`][crate::World::ordered_members].
/// Exactly one member — `leader_id` — carries `is_leader`.
#[derive(Clone, Debug)]
pub struct Platoon {
    pub id: PlatoonId,
    pub vehicle_ids: Vec<VehicleId>,
    pub leader_id: VehicleId,
    /// Edge the platoon formed on (raw simulator name).
    pub edge: String,
    pub lane: String,

    /// Fraction of followers with stable membership, in `[0, 1]`.
    pub stability_ratio: f64,
    /// Weighted wait units accumulated while the leader is held at the
    /// crossing; larger platoons accumulate faster.
    pub intersection_wait_time: u32,
    /// End of a granted priority window, if one is active.
    pub priority_until: Option<Timestamp>,
}

impl Platoon {
    pub fn new(id: PlatoonId, leader_id: VehicleId, edge: String, lane: String) -> Self {
        Self {
            id,
            vehicle_ids: vec![leader_id.clone()],
            leader_id,
            edge,
            lane,
            stability_ratio: 0.0,
            intersection_wait_time: 0,
            priority_until: None,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.vehicle_ids.len()
    }

    pub fn contains(&self, vehicle: &VehicleId) -> bool {
        self.vehicle_ids.iter().any(|v| v == vehicle)
    }

    /// Is a previously granted priority window still open?
    #[inline]
    pub fn has_active_priority(&self, now: Timestamp) -> bool {
        self.priority_until.is_some_and(|until| now < until)
    }
}
