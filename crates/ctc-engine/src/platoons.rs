//! Platoon formation and maintenance.
//!
//! Five phases run back to back each tick; a sixth (the size cap) runs just
//! before arbitration.  Every phase iterates stores in id order, so the
//! platoon structure produced from a given census is the same on every run.

use log::info;

use ctc_core::edge::{self, Edge};
use ctc_core::{EngineConfig, PlatoonId, TimeStep, VehicleId};
use ctc_world::{Platoon, World};

/// Run the five maintenance phases.
pub fn update(world: &mut World, config: &EngineConfig, step: TimeStep) {
    rebuild_leader_links(world, config);
    form_and_extend(world, config);
    disband_singletons(world);
    split_edge_transitions(world, step);
    consolidate(world, config);
}

// ── Phase (a): leader links ───────────────────────────────────────────────────

/// Recompute every vehicle's forward leader link from scratch.
fn rebuild_leader_links(world: &mut World, config: &EngineConfig) {
    for v in world.vehicles.values_mut() {
        v.leader_id = None;
    }

    let ids: Vec<VehicleId> = world.vehicles.keys().cloned().collect();
    for id in ids {
        let ahead = world.find_vehicle_ahead(&id, config.detection_distance);
        if let Some(v) = world.vehicles.get_mut(&id) {
            v.leader_id = ahead;
        }
    }
}

// ── Phase (b): form / extend ──────────────────────────────────────────────────

/// Grow existing platoons along leader links and seed new two-vehicle
/// platoons where none exists yet.
fn form_and_extend(world: &mut World, config: &EngineConfig) {
    let ids: Vec<VehicleId> = world.vehicles.keys().cloned().collect();

    for id in ids {
        let Some((leader_id, own_pos, own_edge)) = world
            .vehicles
            .get(&id)
            .and_then(|v| v.leader_id.clone().map(|l| (l, v.pos, v.edge.clone())))
        else {
            continue;
        };
        let Some((leader_pos, leader_edge, leader_lane)) = world
            .vehicles
            .get(&leader_id)
            .map(|l| (l.pos, l.edge.clone(), l.lane.clone()))
        else {
            continue;
        };

        if let Some(leader_pid) = world.vehicle_platoon.get(&leader_id).cloned() {
            // Follow the vehicle ahead into its platoon.
            let current = world.vehicle_platoon.get(&id).cloned();
            if current.as_ref() != Some(&leader_pid) {
                if let Some(old) = current {
                    world.detach(&id, &old);
                }
                world.attach(&id, &leader_pid);
            }
        } else {
            let gap = leader_pos - own_pos;
            if gap <= config.formation_gap && !edge::is_edge_transition(&leader_edge, &own_edge) {
                // The follower may still sit in a platoon of its own (it
                // could even lead one); pull it out cleanly first.
                if let Some(old) = world.vehicle_platoon.get(&id).cloned() {
                    world.detach(&id, &old);
                }
                let pid = PlatoonId::formed(&leader_edge, &leader_id);
                let mut platoon =
                    Platoon::new(pid, leader_id.clone(), leader_edge, leader_lane);
                platoon.vehicle_ids = vec![leader_id, id];
                world.insert_platoon(platoon);
            }
        }
    }
}

// ── Phase (c): disband singletons ─────────────────────────────────────────────

fn disband_singletons(world: &mut World) {
    let lone: Vec<PlatoonId> = world
        .platoons
        .iter()
        .filter(|(_, p)| p.size() <= 1)
        .map(|(id, _)| id.clone())
        .collect();
    for pid in lone {
        world.disband(&pid);
    }
}

// ── Phase (d): edge-transition splits ─────────────────────────────────────────

/// Break up platoons whose members straddle the crossing.
///
/// The parent platoon is destroyed.  Each leaving-edge cluster of two or
/// more re-forms as its own platoon led by its front vehicle; everyone else
/// reverts to road-free driving.
fn split_edge_transitions(world: &mut World, step: TimeStep) {
    let pids: Vec<PlatoonId> = world.platoons.keys().cloned().collect();

    for pid in pids {
        let Some(p) = world.platoons.get(&pid) else {
            continue;
        };

        let mut by_edge: std::collections::BTreeMap<String, Vec<VehicleId>> = Default::default();
        for vid in &p.vehicle_ids {
            if let Some(v) = world.vehicles.get(vid) {
                by_edge.entry(v.edge.clone()).or_default().push(vid.clone());
            }
        }
        if by_edge.len() <= 1 {
            continue;
        }

        let straddles = by_edge
            .keys()
            .any(|a| by_edge.keys().any(|b| edge::is_edge_transition(a, b)));
        if !straddles {
            continue;
        }

        let members = world.platoons.remove(&pid).map(|p| p.vehicle_ids).unwrap_or_default();
        let mut regrouped: Vec<VehicleId> = Vec::new();

        for (edge_name, cluster) in &by_edge {
            let on_leaving = Edge::parse(edge_name).is_some_and(Edge::is_leaving);
            if !on_leaving || cluster.len() < 2 {
                continue;
            }
            if let Some(new_pid) = regroup_cluster(world, cluster, edge_name, step) {
                info!("platoon {pid} split across the crossing; regrouped {new_pid} on {edge_name}");
                regrouped.extend(cluster.iter().cloned());
            }
        }

        // Members not captured by a regroup revert to road-free driving.
        for vid in members {
            if regrouped.contains(&vid) {
                continue;
            }
            if let Some(v) = world.vehicles.get_mut(&vid) {
                v.platoon_id = None;
                v.is_leader = false;
                v.stable_platoon_time = 0.0;
            }
            world.vehicle_platoon.remove(&vid);
        }
    }
}

/// Re-form `cluster` (all on `edge_name`) as a fresh platoon, front vehicle
/// leading.  Returns the new id, or `None` if the cluster evaporated.
pub(crate) fn regroup_cluster(
    world: &mut World,
    cluster: &[VehicleId],
    edge_name: &str,
    step: TimeStep,
) -> Option<PlatoonId> {
    let mut ordered: Vec<(VehicleId, f64, String)> = cluster
        .iter()
        .filter_map(|vid| {
            world
                .vehicles
                .get(vid)
                .map(|v| (vid.clone(), v.pos, v.lane.clone()))
        })
        .collect();
    if ordered.len() < 2 {
        return None;
    }
    ordered.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let (leader_id, _, leader_lane) = ordered[0].clone();
    let pid = PlatoonId::regrouped(edge_name, &leader_id, step);
    let mut platoon = Platoon::new(pid.clone(), leader_id, edge_name.to_owned(), leader_lane);
    platoon.vehicle_ids = ordered.into_iter().map(|(vid, _, _)| vid).collect();
    world.insert_platoon(platoon);
    Some(pid)
}

// ── Phase (e): consolidation ──────────────────────────────────────────────────

/// Merge platoons whose leaders travel within consolidation range on the
/// same edge and lane.  The platoon whose leader is behind folds into the
/// one whose leader is ahead.
fn consolidate(world: &mut World, config: &EngineConfig) {
    let pids: Vec<PlatoonId> = world.platoons.keys().cloned().collect();

    for pid in pids {
        let Some(leader_id) = world.platoons.get(&pid).map(|p| p.leader_id.clone()) else {
            continue; // absorbed by an earlier merge this phase
        };
        let Some(leader_pos) = world.vehicles.get(&leader_id).map(|v| v.pos) else {
            continue;
        };

        for other_leader in world.nearby_platoon_leaders(&leader_id, config.consolidation_range) {
            let Some(other_pos) = world.vehicles.get(&other_leader).map(|v| v.pos) else {
                continue;
            };
            let Some(other_pid) = world.vehicle_platoon.get(&other_leader).cloned() else {
                continue;
            };
            if other_pid == pid || !world.platoons.contains_key(&other_pid) {
                continue;
            }

            if other_pos > leader_pos {
                world.merge(&other_pid, &pid);
                break; // this platoon is gone
            } else {
                world.merge(&pid, &other_pid);
            }
        }
    }
}

// ── Size cap ──────────────────────────────────────────────────────────────────

/// Split any platoon over the size cap: the front `max` vehicles keep the
/// platoon (and its leader), the tail re-forms behind its own front vehicle.
/// Tails that are themselves oversized go back on the work list, so no
/// platoon exceeds the cap once this returns.
pub fn enforce_size_limit(world: &mut World, config: &EngineConfig, step: TimeStep) {
    let mut work: std::collections::VecDeque<PlatoonId> = world
        .platoons
        .iter()
        .filter(|(_, p)| p.size() > config.max_platoon_size)
        .map(|(id, _)| id.clone())
        .collect();

    while let Some(pid) = work.pop_front() {
        let ordered = world.ordered_members(&pid);
        if ordered.len() <= config.max_platoon_size {
            continue;
        }
        info!("splitting large platoon {pid} with {} vehicles", ordered.len());

        let (front, tail) = ordered.split_at(config.max_platoon_size);
        let (front, tail) = (front.to_vec(), tail.to_vec());

        let Some(edge_name) = world.platoons.get(&pid).map(|p| p.edge.clone()) else {
            continue;
        };
        let tail_leader = tail[0].clone();
        let tail_lane = world
            .vehicles
            .get(&tail_leader)
            .map(|v| v.lane.clone())
            .unwrap_or_default();

        // One capped id per edge and step; cascading tails fall back to the
        // regroup naming so ids stay unique.
        let mut new_pid = PlatoonId::capped(&edge_name, step);
        if world.platoons.contains_key(&new_pid) {
            new_pid = PlatoonId::regrouped(&edge_name, &tail_leader, step);
        }
        let oversize_tail = tail.len() > config.max_platoon_size;
        let mut platoon = Platoon::new(new_pid.clone(), tail_leader, edge_name, tail_lane);
        platoon.vehicle_ids = tail;
        world.insert_platoon(platoon);

        let mut promoted: Option<VehicleId> = None;
        if let Some(p) = world.platoons.get_mut(&pid) {
            p.vehicle_ids = front;
            // A leader that fell into the tail was reassigned by the insert;
            // the front group promotes its own front vehicle.
            if !p.vehicle_ids.contains(&p.leader_id) {
                if let Some(new_leader) = p.vehicle_ids.first().cloned() {
                    p.leader_id = new_leader.clone();
                    promoted = Some(new_leader);
                }
            }
        }
        if let Some(leader) = promoted {
            if let Some(v) = world.vehicles.get_mut(&leader) {
                v.is_leader = true;
            }
        }
        if oversize_tail {
            work.push_back(new_pid);
        }
    }
}
