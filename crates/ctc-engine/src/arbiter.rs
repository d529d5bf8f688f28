//! Intersection arbitration.
//!
//! Per intersection with at least two queued vehicles, in strict order:
//! forced priority (pre-empts the rest of the pipeline for that
//! intersection), reservation enforcement, scored priority behind a grant
//! cooldown, then the low-priority non-conflicting releases.  A final
//! world-wide pass keeps the leaving edges tidy.
//!
//! Vehicles queued on internal edges are bucketed under the source-approach
//! token of their internal edge so that conflict checks always compare
//! approaches, not in-junction lanes.

use std::collections::BTreeMap;

use log::info;

use ctc_core::edge::{self, Edge};
use ctc_core::turn::{
    internal_lane_turn, lane_turn_hint, movements_compatible, route_from_id, turn_between,
    TurnDirection,
};
use ctc_core::{EngineConfig, IntersectionId, PlatoonId, TimeStep, Timestamp, VehicleId};
use ctc_world::{Vehicle, World};

use crate::platoons;

/// Run intersection arbitration for the whole world.
pub fn manage_intersections(
    world: &mut World,
    config: &EngineConfig,
    now: Timestamp,
    step: TimeStep,
) {
    update_platoon_wait_times(world);
    platoons::enforce_size_limit(world, config, step);

    let iids: Vec<IntersectionId> = world.intersections.keys().cloned().collect();
    for iid in iids {
        let queued = world
            .intersections
            .get(&iid)
            .map(|i| i.vehicles.clone())
            .unwrap_or_default();
        if queued.len() < 2 {
            continue;
        }

        let buckets = classify_queue(world, &queued);

        if apply_forced_priority(world, config, now, &iid, &buckets) {
            continue;
        }
        enforce_reservations(world, config, now, &iid, &buckets);
        apply_scored_priority(world, config, now, &iid, &buckets);
        release_nonconflicting(world, &iid, &buckets);
    }

    post_intersection_pass(world, step);
}

// ── Queue classification ──────────────────────────────────────────────────────

struct QueueBuckets {
    left: Vec<VehicleId>,
    right: Vec<VehicleId>,
    straight: Vec<VehicleId>,
    /// Queued vehicles keyed by source approach (internal edges resolve to
    /// the approach token baked into their name).
    vehicles_by_edge: BTreeMap<String, Vec<VehicleId>>,
    /// Distinct platoons represented on each approach.
    platoons_by_edge: BTreeMap<String, Vec<PlatoonId>>,
}

/// The approach key a queued vehicle is bucketed under.
fn source_edge_key(v: &Vehicle) -> String {
    edge::internal_source_token(&v.edge)
        .unwrap_or(&v.edge)
        .to_owned()
}

/// Classify a vehicle's movement, in falling order of confidence: internal
/// lane name, announced next edge, id-derived route, lane heuristics.
fn determine_turn(v: &Vehicle) -> TurnDirection {
    if edge::is_internal(&v.edge) {
        return internal_lane_turn(&v.lane);
    }
    if let Some(next) = &v.next_edge {
        return match (Edge::parse(&v.edge), Edge::parse(next)) {
            (Some(from), Some(to)) => turn_between(from, to),
            _ => TurnDirection::Straight,
        };
    }
    if let Some((approach, exit)) = route_from_id(v.id.as_str()) {
        if v.edge == approach.as_str() {
            return turn_between(approach, exit);
        }
    }
    lane_turn_hint(&v.lane).unwrap_or(TurnDirection::Straight)
}

fn classify_queue(world: &mut World, queued: &[VehicleId]) -> QueueBuckets {
    let mut buckets = QueueBuckets {
        left: Vec::new(),
        right: Vec::new(),
        straight: Vec::new(),
        vehicles_by_edge: BTreeMap::new(),
        platoons_by_edge: BTreeMap::new(),
    };

    for vid in queued {
        let Some(v) = world.vehicles.get(vid) else {
            continue;
        };
        let dir = match v.turn_direction {
            Some(dir) => dir,
            None => {
                let dir = determine_turn(v);
                world
                    .vehicles
                    .get_mut(vid)
                    .expect("present above")
                    .turn_direction = Some(dir);
                dir
            }
        };
        let v = world.vehicles.get(vid).expect("present above");

        match dir {
            TurnDirection::Left => buckets.left.push(vid.clone()),
            TurnDirection::Right => buckets.right.push(vid.clone()),
            TurnDirection::Straight => buckets.straight.push(vid.clone()),
        }

        let key = source_edge_key(v);
        buckets
            .vehicles_by_edge
            .entry(key.clone())
            .or_default()
            .push(vid.clone());
        if let Some(pid) = world.vehicle_platoon.get(vid) {
            let platoons = buckets.platoons_by_edge.entry(key).or_default();
            if !platoons.contains(pid) {
                platoons.push(pid.clone());
            }
        }
    }
    buckets
}

// ── Wait accounting ───────────────────────────────────────────────────────────

/// Accumulate weighted wait units for platoons held at the crossing.
///
/// The bump per tick is +3, plus +5 for platoons of five or more and +2 for
/// three or more, so large held platoons escalate toward forced priority
/// faster.  A leader off the incoming edges also loses any granted window.
fn update_platoon_wait_times(world: &mut World) {
    let pids: Vec<PlatoonId> = world.platoons.keys().cloned().collect();

    for pid in pids {
        let Some(p) = world.platoons.get(&pid) else {
            continue;
        };
        let Some(leader) = world.vehicles.get(p.leader_id.as_str()) else {
            continue;
        };
        let on_incoming = leader.on_incoming_edge();
        let held = leader.speed < 1.0 && leader.at_intersection;
        let size = p.size();

        let p = world.platoons.get_mut(&pid).expect("present above");
        if !on_incoming {
            p.intersection_wait_time = 0;
            p.priority_until = None;
        } else if held {
            p.intersection_wait_time += 3;
            if size >= 5 {
                p.intersection_wait_time += 5;
            } else if size >= 3 {
                p.intersection_wait_time += 2;
            }
        } else {
            p.intersection_wait_time = 0;
        }
    }
}

// ── Forced priority ───────────────────────────────────────────────────────────

/// Reassert an open priority window, or grant one to any platoon that is
/// large enough or has waited long enough.  Returns `true` when a window was
/// applied — the rest of the arbitration pipeline is skipped for this
/// intersection in that case.
fn apply_forced_priority(
    world: &mut World,
    config: &EngineConfig,
    now: Timestamp,
    iid: &IntersectionId,
    buckets: &QueueBuckets,
) -> bool {
    // Reassert before considering new grants.
    for (edge_key, pids) in &buckets.platoons_by_edge {
        for pid in pids {
            let Some(p) = world.platoons.get(pid) else {
                continue;
            };
            if !p.has_active_priority(now) || !world.vehicles.contains_key(p.leader_id.as_str()) {
                continue;
            }
            info!(
                "maintaining priority for platoon {pid} (size: {}, wait: {}) at {iid}",
                p.size(),
                p.intersection_wait_time
            );
            push_platoon_through(world, pid, 5.0, 4.0, config.max_platoon_speed);
            halt_edges_except(world, buckets, edge_key);
            return true;
        }
    }

    for (edge_key, pids) in &buckets.platoons_by_edge {
        for pid in pids {
            let Some(p) = world.platoons.get(pid) else {
                continue;
            };
            if p.size() < config.forced_priority_size
                && p.intersection_wait_time < config.forced_priority_wait
            {
                continue;
            }
            if !world.vehicles.contains_key(p.leader_id.as_str()) {
                continue;
            }
            info!(
                "forced priority for platoon {pid} (size: {}, wait: {}) at {iid}",
                p.size(),
                p.intersection_wait_time
            );
            world
                .platoons
                .get_mut(pid)
                .expect("present above")
                .priority_until = Some(now + config.priority_window);
            push_platoon_through(world, pid, 5.0, 4.0, config.max_platoon_speed);
            halt_edges_except(world, buckets, edge_key);
            return true;
        }
    }
    false
}

/// Raise the platoon leader by `leader_gain` (capped) and let followers
/// close up without overtaking the leader's target.
fn push_platoon_through(
    world: &mut World,
    pid: &PlatoonId,
    leader_gain: f64,
    follower_gain: f64,
    cap: f64,
) {
    let Some(p) = world.platoons.get(pid) else {
        return;
    };
    let leader_id = p.leader_id.clone();
    let members = p.vehicle_ids.clone();

    let Some(leader) = world.vehicles.get_mut(&leader_id) else {
        return;
    };
    let leader_target = (leader.speed + leader_gain).min(cap);
    leader.pin_speed(leader_target);

    for vid in members {
        if vid == leader_id {
            continue;
        }
        if let Some(follower) = world.vehicles.get_mut(&vid) {
            let target = leader_target.min(follower.speed + follower_gain);
            follower.pin_speed(target);
        }
    }
}

/// Stop every queued vehicle not approaching on `granted_key`.
fn halt_edges_except(world: &mut World, buckets: &QueueBuckets, granted_key: &str) {
    for (key, vids) in &buckets.vehicles_by_edge {
        if key == granted_key {
            continue;
        }
        for vid in vids {
            if let Some(v) = world.vehicles.get_mut(vid) {
                v.pin_speed(0.0);
            }
        }
    }
}

// ── Reservation enforcement ───────────────────────────────────────────────────

/// For each reservation currently in its window: speed the holder through
/// and shave speed off every queued vehicle whose movement conflicts.
fn enforce_reservations(
    world: &mut World,
    config: &EngineConfig,
    now: Timestamp,
    iid: &IntersectionId,
    buckets: &QueueBuckets,
) {
    for rid in world.reservations_at(iid) {
        let Some(r) = world.reservations.get(&rid) else {
            continue;
        };
        if !r.is_active(now) {
            continue;
        }
        let edge_from = r.edge_from.clone();
        let direction = r.direction;
        let holder = r.platoon_id.clone();

        if let Some(p) = world.platoons.get(&holder) {
            let leader_id = p.leader_id.clone();
            let members = p.vehicle_ids.clone();
            let leader_state = world.vehicles.get(&leader_id).map(|l| (l.pos, l.speed));

            for vid in members {
                let Some(v) = world.vehicles.get(&vid) else {
                    continue;
                };
                if !v.at_intersection {
                    continue;
                }
                if vid == leader_id {
                    let v = world.vehicles.get_mut(&vid).expect("present above");
                    let target = (v.speed + 3.0).min(config.max_platoon_speed);
                    v.pin_speed(target);
                } else if let Some((leader_pos, leader_speed)) = leader_state {
                    let follow_dist = leader_pos - v.pos;
                    let target = if follow_dist > 20.0 {
                        (leader_speed * 1.2).min(leader_speed + 5.0)
                    } else if follow_dist < 8.0 {
                        (leader_speed * 0.8).max(5.0)
                    } else {
                        leader_speed
                    };
                    world.vehicles.get_mut(&vid).expect("present above").pin_speed(target);
                }
            }
        }

        for (key, vids) in &buckets.vehicles_by_edge {
            if key == &edge_from {
                continue;
            }
            for vid in vids {
                let Some((speed, dir)) = world.vehicles.get(vid).map(|v| (v.speed, v.turn_direction))
                else {
                    continue;
                };
                if !movements_compatible(&edge_from, direction, key, dir) {
                    world
                        .vehicles
                        .get_mut(vid)
                        .expect("present above")
                        .pin_speed((speed - 2.0).max(0.0));
                }
            }
        }
    }
}

// ── Scored priority ───────────────────────────────────────────────────────────

/// Pick the stalled platoon with the highest urgency score and release it,
/// at most once per cooldown interval per intersection.
fn apply_scored_priority(
    world: &mut World,
    config: &EngineConfig,
    now: Timestamp,
    iid: &IntersectionId,
    buckets: &QueueBuckets,
) {
    let Some(intersection) = world.intersections.get(iid) else {
        return;
    };
    if now.since(intersection.last_platoon_pass_time) < config.pass_cooldown {
        return;
    }

    struct Candidate {
        score: f64,
        edge_key: String,
        pid: PlatoonId,
        wait: u32,
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for (key, pids) in &buckets.platoons_by_edge {
        for pid in pids {
            let Some(p) = world.platoons.get(pid) else {
                continue;
            };
            let Some(leader) = world.vehicles.get(p.leader_id.as_str()) else {
                continue;
            };
            if leader.speed > 3.0 {
                continue;
            }

            let size = p.size();
            let wait = p.intersection_wait_time;
            let mut score = size as f64 * 20.0 + wait as f64 * 10.0;
            score += match size {
                s if s >= 5 => 150.0,
                s if s >= 3 => 75.0,
                _ => 0.0,
            };
            score += match wait {
                w if w > 60 => 300.0,
                w if w > 30 => 150.0,
                w if w > 15 => 75.0,
                _ => 0.0,
            };

            candidates.push(Candidate {
                score,
                edge_key: key.clone(),
                pid: pid.clone(),
                wait,
            });
        }
    }
    if candidates.is_empty() {
        return;
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.pid.cmp(&b.pid))
    });
    let winner = &candidates[0];

    let Some(p) = world.platoons.get_mut(&winner.pid) else {
        return;
    };
    p.priority_until = Some(now + config.priority_window);
    info!(
        "giving priority to platoon {} on edge {} with score {:.1} (size: {}, wait: {})",
        winner.pid,
        winner.edge_key,
        winner.score,
        p.size(),
        winner.wait
    );
    push_platoon_through(world, &winner.pid, 4.0, 3.0, config.max_regular_speed);

    // Other approaches stop, except platoons that have themselves waited at
    // least half as long as the winner.
    for (key, vids) in &buckets.vehicles_by_edge {
        if key == &winner.edge_key {
            continue;
        }
        for vid in vids {
            let spared = world
                .vehicle_platoon
                .get(vid)
                .and_then(|opid| world.platoons.get(opid))
                .is_some_and(|other| other.intersection_wait_time >= winner.wait / 2);
            if spared {
                continue;
            }
            if let Some(v) = world.vehicles.get_mut(vid) {
                v.pin_speed(0.0);
            }
        }
    }

    if let Some(intersection) = world.intersections.get_mut(iid) {
        intersection.last_platoon_pass_time = now;
    }
}

// ── Non-conflicting movements ─────────────────────────────────────────────────

/// Low-priority releases that never contest a priority grant: protected
/// right turns, opposed left turns against pure right-turn traffic, and a
/// mild bias toward the visibly busier axis.  Vehicles already pinned by a
/// grant or a reservation this tick are left alone.
fn release_nonconflicting(world: &mut World, iid: &IntersectionId, buckets: &QueueBuckets) {
    use Edge::*;

    // Right turns proceed unless straight traffic queues on the approach to
    // their left.
    for vid in &buckets.right {
        let Some(v) = world.vehicles.get(vid) else {
            continue;
        };
        if v.speed_pinned {
            continue;
        }
        let key = source_edge_key(v);
        let speed = v.speed;

        let blocked = Edge::parse(&key)
            .and_then(Edge::left_neighbor)
            .and_then(|left| buckets.vehicles_by_edge.get(left.as_str()))
            .is_some_and(|vids| {
                vids.iter().any(|lv| {
                    world
                        .vehicles
                        .get(lv)
                        .is_some_and(|l| l.turn_direction == Some(TurnDirection::Straight))
                })
            });
        if blocked {
            continue;
        }

        world
            .vehicles
            .get_mut(vid)
            .expect("present above")
            .pin_speed((speed + 3.5).min(16.0));
        boost_led_followers(world, vid, 3.0, 14.0);
        info!("vehicle {vid} allowed to turn right at {iid}");
    }

    // Left turns proceed only when the opposite approach holds right-turners
    // and nothing else.
    for vid in &buckets.left {
        let Some(v) = world.vehicles.get(vid) else {
            continue;
        };
        if v.speed_pinned {
            continue;
        }
        let key = source_edge_key(v);
        let speed = v.speed;
        let Some(opposite) = Edge::parse(&key).and_then(Edge::opposite) else {
            continue;
        };

        let (mut rights, mut others) = (0usize, 0usize);
        for ovid in buckets
            .vehicles_by_edge
            .get(opposite.as_str())
            .into_iter()
            .flatten()
        {
            match world.vehicles.get(ovid).and_then(|o| o.turn_direction) {
                Some(TurnDirection::Right) => rights += 1,
                _ => others += 1,
            }
        }
        if rights == 0 || others > 0 {
            continue;
        }

        world
            .vehicles
            .get_mut(vid)
            .expect("present above")
            .pin_speed((speed + 2.0).min(10.0));
        boost_led_followers(world, vid, 1.5, 9.0);
        info!("vehicle {vid} allowed to turn left at {iid} (no conflicts)");
    }

    // Directional biasing: favor the clearly busier axis.
    let count = |e: Edge| buckets.vehicles_by_edge.get(e.as_str()).map_or(0, Vec::len);
    let platoon_count = |e: Edge| buckets.platoons_by_edge.get(e.as_str()).map_or(0, Vec::len);

    let mut north_south = count(DownIncoming) + count(UpIncoming);
    let mut east_west = count(LeftIncoming) + count(RightIncoming);
    let ns_platoons = platoon_count(DownIncoming) + platoon_count(UpIncoming);
    let ew_platoons = platoon_count(LeftIncoming) + platoon_count(RightIncoming);
    if ns_platoons > ew_platoons {
        north_south += 5;
    } else if ew_platoons > ns_platoons {
        east_west += 5;
    }

    if north_south > east_west + 2 {
        bias_axis(world, buckets, [DownIncoming, UpIncoming]);
    } else if east_west > north_south + 2 {
        bias_axis(world, buckets, [LeftIncoming, RightIncoming]);
    }
}

/// Boost straight traffic on the `favored` approaches, decay it everywhere
/// else.  Only through movements are touched.
fn bias_axis(world: &mut World, buckets: &QueueBuckets, favored: [Edge; 2]) {
    for vid in &buckets.straight {
        let Some(v) = world.vehicles.get(vid) else {
            continue;
        };
        if v.speed_pinned {
            continue;
        }
        let Some(road) = Edge::parse(&source_edge_key(v)) else {
            continue;
        };
        if !road.is_incoming() {
            continue;
        }
        let speed = v.speed;
        let target = if favored.contains(&road) {
            (speed + 3.0).min(14.0)
        } else {
            (speed - 1.5).max(0.0)
        };
        world.vehicles.get_mut(vid).expect("present above").pin_speed(target);
    }
}

/// If `vid` leads a platoon, give its followers a bounded boost.
fn boost_led_followers(world: &mut World, vid: &VehicleId, gain: f64, cap: f64) {
    let Some(p) = world.led_platoon(vid) else {
        return;
    };
    let members = p.vehicle_ids.clone();
    for member in members {
        if &member == vid {
            continue;
        }
        if let Some(follower) = world.vehicles.get_mut(&member) {
            if !follower.speed_pinned {
                let target = (follower.speed + gain).min(cap);
                follower.pin_speed(target);
            }
        }
    }
}

// ── Post-intersection hygiene ─────────────────────────────────────────────────

/// On each leaving edge: split platoons that no longer sit together on the
/// edge, then enforce spacing front to back.
fn post_intersection_pass(world: &mut World, step: TimeStep) {
    let mut by_leaving_edge: BTreeMap<Edge, Vec<VehicleId>> = BTreeMap::new();
    for (vid, v) in &world.vehicles {
        if v.at_intersection {
            continue;
        }
        if let Some(road) = v.road.filter(|r| r.is_leaving()) {
            by_leaving_edge.entry(road).or_default().push(vid.clone());
        }
    }

    for (road, vids) in by_leaving_edge {
        if vids.len() < 2 {
            continue;
        }

        let mut members_here: BTreeMap<PlatoonId, Vec<VehicleId>> = BTreeMap::new();
        for vid in &vids {
            if let Some(pid) = world.vehicles.get(vid).and_then(|v| v.platoon_id.clone()) {
                members_here.entry(pid).or_default().push(vid.clone());
            }
        }

        for (pid, present) in members_here {
            if present.len() < 2 {
                continue;
            }
            let Some(p) = world.platoons.get(&pid) else {
                continue;
            };
            let straggling = p.vehicle_ids.iter().any(|vid| {
                world
                    .vehicles
                    .get(vid)
                    .map_or(true, |v| v.edge != road.as_str())
            });
            if straggling {
                split_off_leaving_edge(world, &pid, road, step);
            }
        }

        enforce_spacing(world, &vids);
    }
}

/// Carve the members still on `road` out of `pid` into their own platoon.
fn split_off_leaving_edge(world: &mut World, pid: &PlatoonId, road: Edge, step: TimeStep) {
    let Some(p) = world.platoons.get(pid) else {
        return;
    };
    let old_leader = p.leader_id.clone();

    let mut on_edge: Vec<VehicleId> = Vec::new();
    let mut elsewhere: Vec<VehicleId> = Vec::new();
    for vid in &p.vehicle_ids {
        match world.vehicles.get(vid) {
            Some(v) if v.edge == road.as_str() => on_edge.push(vid.clone()),
            Some(_) => elsewhere.push(vid.clone()),
            None => {}
        }
    }
    if on_edge.len() < 2 || elsewhere.is_empty() {
        return;
    }

    platoons::regroup_cluster(world, &on_edge, road.as_str(), step);

    if elsewhere.len() < 2 {
        // The remnant cannot stand on its own.
        for vid in &elsewhere {
            if let Some(v) = world.vehicles.get_mut(vid) {
                v.platoon_id = None;
                v.is_leader = false;
                v.stable_platoon_time = 0.0;
            }
            world.vehicle_platoon.remove(vid);
        }
        world.platoons.remove(pid);
    } else {
        let new_leader = front_of(world, &elsewhere);
        let p = world.platoons.get_mut(pid).expect("checked above");
        p.vehicle_ids = elsewhere;
        if !p.vehicle_ids.contains(&old_leader) {
            if let Some(leader_id) = new_leader {
                p.leader_id = leader_id.clone();
                if let Some(v) = world.vehicles.get_mut(&leader_id) {
                    v.is_leader = true;
                }
            }
        }
    }
}

/// Front-most vehicle of `ids` (greatest position, lowest id on ties).
fn front_of(world: &World, ids: &[VehicleId]) -> Option<VehicleId> {
    ids.iter()
        .filter_map(|vid| world.vehicles.get(vid).map(|v| (vid, v.pos)))
        .max_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.cmp(a.0))
        })
        .map(|(vid, _)| vid.clone())
}

/// Gap-tier spacing over one leaving edge, front to back.
fn enforce_spacing(world: &mut World, vids: &[VehicleId]) {
    let mut ordered: Vec<(VehicleId, f64)> = vids
        .iter()
        .filter_map(|vid| world.vehicles.get(vid).map(|v| (vid.clone(), v.pos)))
        .collect();
    if ordered.len() < 2 {
        return;
    }
    ordered.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    for window in ordered.windows(2) {
        let (front_id, front_pos) = &window[0];
        let (cur_id, cur_pos) = &window[1];
        let Some(front_speed) = world.vehicles.get(front_id).map(|v| v.speed) else {
            continue;
        };
        let Some(cur_speed) = world.vehicles.get(cur_id).map(|v| v.speed) else {
            continue;
        };
        let gap = front_pos - cur_pos;

        let mut target = if gap > 25.0 {
            19.4
        } else if gap > 15.0 {
            (front_speed * 1.3).min(16.7)
        } else if gap > 10.0 {
            (front_speed * 1.2).min(13.9)
        } else if gap < 4.0 {
            (front_speed * 0.7).max(5.0)
        } else {
            front_speed
        };

        if front_speed < 5.0 && gap > 10.0 {
            target = 11.1;
        }
        if cur_speed < 0.5 && gap > 5.0 {
            target = 8.3;
        }

        if let Some(v) = world.vehicles.get_mut(cur_id) {
            v.pin_speed(target);
        }
    }
}
