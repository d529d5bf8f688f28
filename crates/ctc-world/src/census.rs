//! Per-tick ingest of the simulator vehicle census.
//!
//! The census is the full set of vehicles alive in the simulator this tick.
//! Ingest reconciles the world against it: upserts every reported vehicle,
//! deletes the ones that vanished (fixing platoon and intersection
//! back-pointers), rebuilds the intersection rosters, refreshes per-edge
//! density on its cadence, and purges dead reservations.

use std::collections::BTreeMap;

use log::debug;

use ctc_core::edge::{self, Edge};
use ctc_core::{EngineConfig, IntersectionId, Timestamp, VehicleId};

use crate::intersection::Intersection;
use crate::vehicle::Vehicle;
use crate::world::World;

/// One vehicle's record in the inbound census.
///
/// The wire payload is duck-typed JSON; deserialization rejects records with
/// missing fields (failing the whole tick at the transport layer) and
/// silently drops unknown ones.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CensusRecord {
    pub lane: String,
    pub pos: f64,
    pub speed: f64,
    pub edge: String,
}

/// A full tick snapshot: vehicle id → observed state.
pub type Census = BTreeMap<VehicleId, CensusRecord>;

/// Reconcile `world` against `census` at time `now`.
pub fn apply(world: &mut World, census: &Census, now: Timestamp, config: &EngineConfig) {
    upsert_vehicles(world, census, now, config);
    remove_vanished(world, census);
    measure_density(world, now, config);
    rebuild_rosters(world, now);
    world.purge_expired_reservations(now);
}

fn upsert_vehicles(world: &mut World, census: &Census, now: Timestamp, config: &EngineConfig) {
    for (id, record) in census {
        match world.vehicles.get_mut(id) {
            Some(v) => {
                v.lane.clone_from(&record.lane);
                v.pos = record.pos;
                v.speed = record.speed;
                if v.edge != record.edge {
                    v.edge.clone_from(&record.edge);
                    v.road = Edge::parse(&record.edge);
                }
            }
            None => {
                let v = Vehicle::observed(
                    id.clone(),
                    record,
                    now,
                    config.default_desired_speed,
                    config.default_reaction_time,
                );
                world.vehicles.insert(id.clone(), v);
                world.total_created += 1;
            }
        }
        // Recomputed for new and known vehicles alike: the flag depends on
        // position and speed, not just the edge.
        let v = world.vehicles.get_mut(id).expect("just upserted");
        v.at_intersection = near_junction(&v.edge, v.road, v.pos, v.speed);
    }
}

/// Is a vehicle close enough to the crossing to queue there?
///
/// True on any internal edge; otherwise true within 15 m of the end of a
/// known edge, within 20 m on a junction-connected edge, or when crawling
/// (< 5 m/s) on a junction-connected edge.  Unknown edges are neutral:
/// never at the intersection.
pub fn near_junction(edge_name: &str, road: Option<Edge>, pos: f64, speed: f64) -> bool {
    if edge::is_internal(edge_name) {
        return true;
    }
    let Some(road) = road else {
        return false;
    };

    let to_end = road.length_m() - pos;
    if to_end < 15.0 {
        return true;
    }
    if road.connects_to_junction() && (to_end < 20.0 || speed < 5.0) {
        return true;
    }
    false
}

fn remove_vanished(world: &mut World, census: &Census) {
    let vanished: Vec<VehicleId> = world
        .vehicles
        .keys()
        .filter(|id| !census.contains_key(*id))
        .cloned()
        .collect();

    for id in vanished {
        if let Some(pid) = world.vehicle_platoon.get(&id).cloned() {
            let remaining = world.detach(&id, &pid);
            if remaining <= 1 {
                world.disband(&pid);
            }
        }
        for intersection in world.intersections.values_mut() {
            intersection.vehicles.retain(|vid| vid != &id);
        }
        world.vehicles.remove(&id);
        world.total_removed += 1;
    }
}

fn measure_density(world: &mut World, now: Timestamp, config: &EngineConfig) {
    if let Some(last) = world.last_density_at {
        if now.since(last) < config.density_interval {
            return;
        }
    }
    world.last_density_at = Some(now);

    let mut counts: BTreeMap<Edge, usize> = BTreeMap::new();
    for v in world.vehicles.values() {
        if v.at_intersection {
            continue;
        }
        if let Some(road) = v.road {
            *counts.entry(road).or_default() += 1;
        }
    }

    for (road, count) in counts {
        let density = count as f64 / road.length_m() * 100.0;
        world.traffic_density.insert(road, density);
        debug!("density {road}: {density:.1} veh/100m");
    }
}

fn rebuild_rosters(world: &mut World, now: Timestamp) {
    for intersection in world.intersections.values_mut() {
        intersection.vehicles.clear();
    }

    // In-junction vehicles first: their internal edge names the intersection
    // and creates it lazily on first sighting.
    let internal: Vec<(VehicleId, IntersectionId)> = world
        .vehicles
        .values()
        .filter(|v| v.at_intersection)
        .filter_map(|v| v.internal_intersection().map(|iid| (v.id.clone(), iid)))
        .collect();
    for (vid, iid) in internal {
        let intersection = world
            .intersections
            .entry(iid.clone())
            .or_insert_with(|| Intersection::observed(iid, now));
        intersection.vehicles.push(vid);
    }

    // Then vehicles queued on the approaches: they join the first known
    // intersection adjacent to their edge.  Until some vehicle has crossed
    // (naming the junction), there is nothing to queue at.
    let queued: Vec<(VehicleId, Edge)> = world
        .vehicles
        .values()
        .filter(|v| v.at_intersection && !edge::is_internal(&v.edge))
        .filter_map(|v| v.road.map(|road| (v.id.clone(), road)))
        .collect();
    for (vid, road) in queued {
        let adjacent = world
            .intersections
            .values_mut()
            .find(|i| i.is_adjacent(road));
        if let Some(intersection) = adjacent {
            intersection.vehicles.push(vid);
        }
    }
}
