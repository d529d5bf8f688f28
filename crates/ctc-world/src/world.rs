//! The `World` aggregate: every store plus the relational fix-up helpers.

use std::collections::BTreeMap;

use log::warn;

use ctc_core::edge::Edge;
use ctc_core::{IntersectionId, PlatoonId, ReservationId, Timestamp, VehicleId};

use crate::intersection::{Intersection, Reservation};
use crate::platoon::Platoon;
use crate::vehicle::Vehicle;

/// The complete mutable state the tick driver owns.
///
/// All stores are ordered maps: engine phases that iterate a store visit
/// entities in ascending id order, so selection ties resolve the same way on
/// every run.  Cross-references are ids; the helpers below keep the
/// `vehicle ↔ platoon` relation and its reverse map consistent.
#[derive(Default)]
pub struct World {
    pub vehicles: BTreeMap<VehicleId, Vehicle>,
    pub platoons: BTreeMap<PlatoonId, Platoon>,
    pub intersections: BTreeMap<IntersectionId, Intersection>,
    /// Reverse map of `Vehicle::platoon_id`, kept in lock-step by the
    /// attach/detach/merge helpers.
    pub vehicle_platoon: BTreeMap<VehicleId, PlatoonId>,
    pub reservations: BTreeMap<ReservationId, Reservation>,

    /// Vehicles per 100 m, by canonical edge.  Refreshed on the census
    /// density cadence, not every tick.
    pub traffic_density: BTreeMap<Edge, f64>,
    pub(crate) last_density_at: Option<Timestamp>,

    // ── Session counters ──────────────────────────────────────────────────
    pub total_created: u64,
    pub total_removed: u64,
    /// Vehicles that have ever reached a leaving edge.
    pub throughput_total: u64,
    /// Same, counted since the last tick boundary.
    pub throughput_step: u64,
}

/// Primitive aggregates copied out for reporting; holds no references into
/// the live world.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorldStats {
    pub vehicle_count: usize,
    pub platoon_count: usize,
    pub intersection_count: usize,
    pub reservation_count: usize,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            vehicle_count: self.vehicles.len(),
            platoon_count: self.platoons.len(),
            intersection_count: self.intersections.len(),
            reservation_count: self.reservations.len(),
        }
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    /// The platoon a vehicle belongs to, via the reverse map.
    pub fn platoon_of(&self, vehicle: &VehicleId) -> Option<&Platoon> {
        let pid = self.vehicle_platoon.get(vehicle)?;
        self.platoons.get(pid)
    }

    /// The platoon this vehicle *leads*, if any.
    pub fn led_platoon(&self, vehicle: &VehicleId) -> Option<&Platoon> {
        self.platoon_of(vehicle)
            .filter(|p| &p.leader_id == vehicle)
    }

    /// Current per-edge density, if the vehicle sits on a canonical edge
    /// that has been measured.
    pub fn density_at(&self, road: Option<Edge>) -> Option<f64> {
        self.traffic_density.get(&road?).copied()
    }

    // ── Vehicle ↔ platoon relation ────────────────────────────────────────

    /// Attach `vehicle` to `platoon` as a follower.
    ///
    /// No-op (with a warning) if either side is missing — a vehicle can
    /// leave the census between phases of the same tick.
    pub fn attach(&mut self, vehicle: &VehicleId, platoon: &PlatoonId) {
        let Some(p) = self.platoons.get_mut(platoon) else {
            warn!("attach: platoon {platoon} vanished, skipping {vehicle}");
            return;
        };
        let Some(v) = self.vehicles.get_mut(vehicle) else {
            warn!("attach: vehicle {vehicle} vanished, skipping");
            return;
        };

        if !p.vehicle_ids.iter().any(|id| id == vehicle) {
            p.vehicle_ids.push(vehicle.clone());
        }
        v.platoon_id = Some(platoon.clone());
        v.is_leader = false;
        v.stable_platoon_time = 0.0;
        self.vehicle_platoon
            .insert(vehicle.clone(), platoon.clone());
    }

    /// Detach `vehicle` from `platoon`, handing leadership to the first
    /// remaining member if the leader left.  Returns the remaining size so
    /// the caller can decide whether to disband.
    pub fn detach(&mut self, vehicle: &VehicleId, platoon: &PlatoonId) -> usize {
        let Some(p) = self.platoons.get_mut(platoon) else {
            // Dangling reference: heal the vehicle side anyway.
            self.vehicle_platoon.remove(vehicle);
            if let Some(v) = self.vehicles.get_mut(vehicle) {
                v.platoon_id = None;
                v.is_leader = false;
                v.stable_platoon_time = 0.0;
            }
            return 0;
        };

        p.vehicle_ids.retain(|id| id != vehicle);

        if &p.leader_id == vehicle {
            if let Some(next_leader) = p.vehicle_ids.first().cloned() {
                p.leader_id = next_leader.clone();
                if let Some(v) = self.vehicles.get_mut(&next_leader) {
                    v.is_leader = true;
                }
            }
        }
        let remaining = p.vehicle_ids.len();

        if let Some(v) = self.vehicles.get_mut(vehicle) {
            v.platoon_id = None;
            v.is_leader = false;
            v.stable_platoon_time = 0.0;
        }
        self.vehicle_platoon.remove(vehicle);
        remaining
    }

    /// Destroy a platoon, clearing every member's membership fields.
    pub fn disband(&mut self, platoon: &PlatoonId) {
        let Some(p) = self.platoons.remove(platoon) else {
            return;
        };
        for vid in &p.vehicle_ids {
            if let Some(v) = self.vehicles.get_mut(vid) {
                v.platoon_id = None;
                v.is_leader = false;
                v.stable_platoon_time = 0.0;
            }
            self.vehicle_platoon.remove(vid);
        }
    }

    /// Fold `trailing` into `leading`, preserving the leading platoon's
    /// leader.  Both platoons must be on the same edge and lane; the caller
    /// checks that.
    pub fn merge(&mut self, leading: &PlatoonId, trailing: &PlatoonId) {
        if leading == trailing || !self.platoons.contains_key(leading) {
            return;
        }
        let Some(absorbed) = self.platoons.remove(trailing) else {
            return;
        };

        for vid in &absorbed.vehicle_ids {
            if let Some(v) = self.vehicles.get_mut(vid) {
                v.platoon_id = Some(leading.clone());
                v.is_leader = false;
                v.stable_platoon_time = 0.0;
            }
            self.vehicle_platoon.insert(vid.clone(), leading.clone());
        }

        let lead = self
            .platoons
            .get_mut(leading)
            .expect("checked above");
        for vid in absorbed.vehicle_ids {
            if !lead.vehicle_ids.iter().any(|id| id == &vid) {
                lead.vehicle_ids.push(vid);
            }
        }
    }

    /// Register a freshly built platoon and point every member at it.
    pub fn insert_platoon(&mut self, platoon: Platoon) {
        for vid in &platoon.vehicle_ids {
            if let Some(v) = self.vehicles.get_mut(vid) {
                v.platoon_id = Some(platoon.id.clone());
                v.is_leader = vid == &platoon.leader_id;
                v.stable_platoon_time = 0.0;
            }
            self.vehicle_platoon
                .insert(vid.clone(), platoon.id.clone());
        }
        self.platoons.insert(platoon.id.clone(), platoon);
    }

    // ── Geometry queries ──────────────────────────────────────────────────

    /// Nearest same-edge, same-lane vehicle strictly ahead of `vehicle`
    /// within `detection` metres.  Distance ties resolve to the lower id
    /// because iteration is id-ordered and the comparison is strict.
    pub fn find_vehicle_ahead(&self, vehicle: &VehicleId, detection: f64) -> Option<VehicleId> {
        let v = self.vehicles.get(vehicle)?;
        let mut best: Option<(f64, &VehicleId)> = None;

        for (oid, other) in &self.vehicles {
            if oid == vehicle || other.edge != v.edge || other.lane != v.lane {
                continue;
            }
            let distance = other.pos - v.pos;
            if distance <= 0.0 || distance > detection {
                continue;
            }
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, oid));
            }
        }
        best.map(|(_, id)| id.clone())
    }

    /// Platoon leaders on the same edge and lane within `range` metres of
    /// `vehicle` (itself excluded), in id order.
    pub fn nearby_platoon_leaders(&self, vehicle: &VehicleId, range: f64) -> Vec<VehicleId> {
        let Some(v) = self.vehicles.get(vehicle) else {
            return Vec::new();
        };
        self.vehicles
            .iter()
            .filter(|(oid, o)| {
                *oid != vehicle
                    && o.is_leader
                    && o.edge == v.edge
                    && o.lane == v.lane
                    && (o.pos - v.pos).abs() <= range
            })
            .map(|(oid, _)| oid.clone())
            .collect()
    }

    /// Platoon members front-to-back: descending position, id ascending on
    /// exact ties.  Members missing from the vehicle store are skipped.
    pub fn ordered_members(&self, platoon: &PlatoonId) -> Vec<VehicleId> {
        let Some(p) = self.platoons.get(platoon) else {
            return Vec::new();
        };
        let mut members: Vec<(&VehicleId, f64)> = p
            .vehicle_ids
            .iter()
            .filter_map(|vid| self.vehicles.get(vid).map(|v| (vid, v.pos)))
            .collect();
        members.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        members.into_iter().map(|(vid, _)| vid.clone()).collect()
    }

    // ── Reservations ──────────────────────────────────────────────────────

    /// Reservation ids targeting `intersection`, in id order.
    pub fn reservations_at(&self, intersection: &IntersectionId) -> Vec<ReservationId> {
        self.reservations
            .iter()
            .filter(|(_, r)| &r.intersection_id == intersection)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drop every reservation whose window has passed and refresh the
    /// per-intersection `has_reservation` flags.
    pub fn purge_expired_reservations(&mut self, now: Timestamp) {
        self.reservations.retain(|_, r| !r.is_expired(now));
        for intersection in self.intersections.values_mut() {
            intersection.has_reservation = false;
        }
        let targeted: Vec<IntersectionId> = self
            .reservations
            .values()
            .map(|r| r.intersection_id.clone())
            .collect();
        for iid in targeted {
            if let Some(intersection) = self.intersections.get_mut(&iid) {
                intersection.has_reservation = true;
            }
        }
    }

    // ── Throughput ────────────────────────────────────────────────────────

    /// Count vehicles reaching a leaving edge for the first time.
    pub fn mark_throughput(&mut self) {
        for v in self.vehicles.values_mut() {
            if v.on_leaving_edge() && !v.counted_in_throughput {
                v.counted_in_throughput = true;
                self.throughput_total += 1;
                self.throughput_step += 1;
            }
        }
    }
}
