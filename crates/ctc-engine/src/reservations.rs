//! Platoon stability estimation and intersection slot booking.

use std::time::Duration;

use log::info;

use ctc_core::edge::Edge;
use ctc_core::turn::{movements_compatible, turn_between};
use ctc_core::{EngineConfig, IntersectionId, PlatoonId, ReservationId, Timestamp};
use ctc_world::{Reservation, World};

// ── Stability ─────────────────────────────────────────────────────────────────

/// Refresh every platoon's stability ratio: the fraction of followers whose
/// membership has lasted past the stability threshold.  Highly stable
/// platoons of three or more get their leader released toward the stable
/// cruise speed while away from the crossing.
pub fn estimate_stability(world: &mut World, config: &EngineConfig) {
    let pids: Vec<PlatoonId> = world.platoons.keys().cloned().collect();

    for pid in pids {
        let Some(p) = world.platoons.get(&pid) else {
            continue;
        };
        if p.size() < 2 {
            continue;
        }
        let leader_id = p.leader_id.clone();
        if !world.vehicles.contains_key(leader_id.as_str()) {
            continue;
        }

        let stable = p
            .vehicle_ids
            .iter()
            .filter(|vid| **vid != leader_id)
            .filter_map(|vid| world.vehicles.get(vid))
            .filter(|v| v.stable_platoon_time > config.stable_membership_secs)
            .count();
        let size = p.size();
        let ratio = stable as f64 / (size - 1) as f64;

        world.platoons.get_mut(&pid).expect("checked above").stability_ratio = ratio;

        if ratio > 0.7 && size >= 3 {
            let release = config.stable_platoon_speed;
            if let Some(leader) = world.vehicles.get_mut(&leader_id) {
                if !leader.at_intersection {
                    leader.desired_speed = release;
                }
            }
        }
    }
}

// ── Slot booking ──────────────────────────────────────────────────────────────

/// Book crossing slots for stable platoons approaching an intersection.
///
/// A slot is `1.5 s × size` long, starting at the leader's estimated
/// arrival.  Booking is skipped when the platoon already holds a slot there
/// or when an active slot with an incompatible movement overlaps in time.
pub fn schedule_slots(world: &mut World, config: &EngineConfig, now: Timestamp) {
    let pids: Vec<PlatoonId> = world.platoons.keys().cloned().collect();

    for pid in pids {
        let Some(p) = world.platoons.get(&pid) else {
            continue;
        };
        if p.size() < config.reservation_min_size
            || p.stability_ratio < config.reservation_min_stability
        {
            continue;
        }
        let size = p.size();
        let Some(leader) = world.vehicles.get(p.leader_id.as_str()) else {
            continue;
        };
        if leader.at_intersection {
            continue;
        }

        // The leader must still be on its route's approach edge for the
        // look-ahead to mean anything.
        let Some((approach, exit)) = ctc_core::turn::route_from_id(leader.id.as_str()) else {
            continue;
        };
        if leader.road != Some(approach) {
            continue;
        }
        let Some(iid) = next_intersection_for(world, exit) else {
            continue;
        };

        let distance = approach.length_m() - leader.pos;
        if !(0.0..=config.reservation_horizon).contains(&distance) {
            continue;
        }

        let speed = leader.speed.max(config.reservation_min_speed);
        let start = now + Duration::from_secs_f64(distance / speed);
        let end = start + Duration::from_secs_f64(size as f64 * config.slot_secs_per_vehicle);
        let edge_from = leader.edge.clone();
        let direction = Some(turn_between(approach, exit));

        let rid = ReservationId::slot(&pid, &iid);
        if world.reservations.contains_key(&rid) {
            continue;
        }
        if has_conflicting_slot(world, &iid, start, end, &edge_from, direction) {
            continue;
        }

        info!("reserved {iid} for platoon {pid}, arrival at {start}");
        world.reservations.insert(
            rid.clone(),
            Reservation {
                id: rid,
                intersection_id: iid.clone(),
                platoon_id: pid,
                start_time: start,
                end_time: end,
                edge_from,
                direction,
            },
        );
        if let Some(intersection) = world.intersections.get_mut(&iid) {
            intersection.has_reservation = true;
        }
    }
}

/// The first known intersection adjacent to the route's next edge.
fn next_intersection_for(world: &World, next_edge: Edge) -> Option<IntersectionId> {
    world
        .intersections
        .values()
        .find(|i| i.is_adjacent(next_edge))
        .map(|i| i.id.clone())
}

fn has_conflicting_slot(
    world: &World,
    intersection: &IntersectionId,
    start: Timestamp,
    end: Timestamp,
    edge_from: &str,
    direction: Option<ctc_core::TurnDirection>,
) -> bool {
    world.reservations.values().any(|existing| {
        existing.intersection_id == *intersection
            && existing.overlaps(start, end)
            && !movements_compatible(
                &existing.edge_from,
                existing.direction,
                edge_from,
                direction,
            )
    })
}
