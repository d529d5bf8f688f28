//! Desired-speed synthesis.
//!
//! Three passes, in order:
//!
//! 1. [`synchronize`] — per-vehicle car following against the leader link,
//!    with special cases for reservation holders and road-free leaders.
//! 2. [`platoon_cohesion`] — per-platoon front-to-back pass with a tighter
//!    gap model; overrides pass 1 for platoon members.
//! 3. [`density_adjust`] — per-edge density caps, applied last so congested
//!    edges win over everything the earlier passes decided.
//!
//! Passes 1 and 2 leave pinned vehicles alone: an arbitration decision
//! (priority grant, conflict stop, spacing target) outranks car following
//! for the rest of the tick.  The density pass still applies — congestion
//! caps are absolute.
//!
//! Thresholds and target tables are the calibrated policy; they are kept
//! literal here rather than spread across the config.

use ctc_core::edge;
use ctc_core::{EngineConfig, PlatoonId, ReservationId, VehicleId};
use ctc_world::World;

// ── Pass 1: car following ─────────────────────────────────────────────────────

/// Per-vehicle desired speed from the leader link.
pub fn synchronize(world: &mut World, config: &EngineConfig) {
    let ids: Vec<VehicleId> = world.vehicles.keys().cloned().collect();

    for vid in &ids {
        let Some(v) = world.vehicles.get(vid) else {
            continue;
        };
        if v.speed_pinned {
            continue;
        }
        if reservation_holder_boost(world, config, vid) {
            continue;
        }

        let Some(v) = world.vehicles.get(vid) else {
            continue;
        };

        // Road-free: no vehicle within detection range ahead.
        let Some(leader_id) = v.leader_id.clone() else {
            let target = road_free_speed(world, config, vid);
            world.vehicles.get_mut(vid).expect("present above").desired_speed = target;
            continue;
        };

        let Some((leader_pos, leader_speed)) = world
            .vehicles
            .get(&leader_id)
            .map(|l| (l.pos, l.speed))
        else {
            world.vehicles.get_mut(vid).expect("present above").desired_speed =
                config.default_desired_speed;
            continue;
        };

        let v = world.vehicles.get(vid).expect("present above");
        let current_gap = leader_pos - v.pos;
        let optimal_gap = optimal_gap(world, config, vid);
        let in_platoon = v.platoon_id.is_some();
        let own_speed = v.speed;

        let mut target = if leader_speed < 0.5 {
            stopped_leader_target(current_gap, optimal_gap)
        } else {
            moving_leader_target(current_gap, optimal_gap, leader_speed)
        };

        // Stall escape: a stopped follower with room ahead must creep.
        if own_speed < 0.5 && current_gap > optimal_gap {
            target = target.max(5.0);
        }

        target = target.max(0.0);
        target = if in_platoon {
            target.min(config.max_platoon_speed)
        } else {
            target.min(config.max_regular_speed)
        };

        world.vehicles.get_mut(vid).expect("present above").desired_speed = target;
    }
}

/// An at-intersection platoon leader holding a slot for this intersection
/// gets waved through ahead of any gap logic.
fn reservation_holder_boost(world: &mut World, config: &EngineConfig, vid: &VehicleId) -> bool {
    let Some(v) = world.vehicles.get(vid) else {
        return false;
    };
    if !v.at_intersection {
        return false;
    }
    let Some(pid) = world.vehicle_platoon.get(vid) else {
        return false;
    };
    let Some(p) = world.platoons.get(pid) else {
        return false;
    };
    if &p.leader_id != vid {
        return false;
    }
    let Some(prefix) = edge::intersection_prefix(&v.edge) else {
        return false;
    };
    let rid = ReservationId::slot(pid, &prefix.into());
    if !world.reservations.contains_key(&rid) {
        return false;
    }

    let target = (v.speed + 2.0).min(config.max_platoon_speed);
    world.vehicles.get_mut(vid).expect("present above").desired_speed = target;
    true
}

/// Target speed when nothing drives ahead: stable platoon leaders creep
/// toward the stable cruise speed, everyone else reverts to a default.
fn road_free_speed(world: &World, config: &EngineConfig, vid: &VehicleId) -> f64 {
    let Some(v) = world.vehicles.get(vid) else {
        return config.default_desired_speed;
    };
    let Some(p) = world.led_platoon(vid) else {
        return config.default_desired_speed;
    };

    if p.stability_ratio > 0.8 && p.size() > 3 {
        config.stable_platoon_speed.min(v.speed + 1.0)
    } else if p.stability_ratio > 0.6 {
        config.max_platoon_speed.min(v.speed + 0.8)
    } else {
        config.max_regular_speed
    }
}

/// The gap a follower should hold: the base gap scaled up with speed and
/// down with platoon stability, bounded by the reaction-time gap, floored
/// at 5 m.
fn optimal_gap(world: &World, config: &EngineConfig, vid: &VehicleId) -> f64 {
    let Some(v) = world.vehicles.get(vid) else {
        return config.following_gap;
    };

    let mut base = config.following_gap;
    let speed_factor = v.speed / 10.0;
    if speed_factor > 1.0 {
        base *= speed_factor;
    }
    if v.platoon_id.is_some() && v.stable_platoon_time > config.stable_membership_secs {
        base *= 0.7;
    }
    if world
        .platoon_of(vid)
        .is_some_and(|p| p.stability_ratio > 0.7)
    {
        base *= 0.8;
    }

    let time_gap = v.reaction_time * v.speed;
    base.min(time_gap).max(5.0)
}

fn stopped_leader_target(gap: f64, optimal: f64) -> f64 {
    if gap > optimal * 3.0 {
        16.7
    } else if gap > optimal * 2.0 {
        11.1
    } else if gap > optimal * 1.5 {
        8.3
    } else if gap > optimal * 1.2 {
        5.6
    } else if gap > optimal * 1.05 {
        2.8
    } else if gap > optimal {
        1.4
    } else {
        0.0
    }
}

fn moving_leader_target(gap: f64, optimal: f64, leader_speed: f64) -> f64 {
    if gap > optimal * 3.0 {
        (leader_speed * 1.5).max(22.2)
    } else if gap > optimal * 2.0 {
        (leader_speed * 1.4).max(19.4)
    } else if gap > optimal * 1.5 {
        (leader_speed * 1.3).max(16.7)
    } else if gap > optimal * 1.1 {
        (leader_speed * 1.1).min(leader_speed + 2.0)
    } else if gap < optimal * 0.5 {
        leader_speed * 0.5
    } else if gap < optimal * 0.8 {
        leader_speed * 0.85
    } else {
        leader_speed
    }
}

// ── Pass 2: intra-platoon cohesion ────────────────────────────────────────────

/// Front-to-back pass over every platoon with a tighter gap model, so a
/// platoon behaves as one unit rather than a chain of loosely coupled
/// followers.
pub fn platoon_cohesion(world: &mut World, config: &EngineConfig) {
    let pids: Vec<PlatoonId> = world.platoons.keys().cloned().collect();

    for pid in pids {
        let ordered = world.ordered_members(&pid);
        if ordered.len() < 2 {
            continue;
        }
        let base_gap = if world
            .platoons
            .get(&pid)
            .is_some_and(|p| p.stability_ratio > 0.6)
        {
            5.0
        } else {
            7.0
        };

        for window in ordered.windows(2) {
            let front = &window[0];
            let follower = &window[1];
            let Some((front_pos, front_speed)) =
                world.vehicles.get(front).map(|v| (v.pos, v.speed))
            else {
                continue;
            };
            let Some((own_pos, own_speed)) =
                world.vehicles.get(follower).map(|v| (v.pos, v.speed))
            else {
                continue;
            };
            let gap = front_pos - own_pos;

            let mut target = if front_speed < 0.5 {
                stopped_leader_target(gap, base_gap)
            } else if gap > base_gap * 2.0 {
                (front_speed * 1.4).max(19.4)
            } else if gap > base_gap * 1.5 {
                (front_speed * 1.3).max(16.7)
            } else if gap > base_gap * 1.2 {
                front_speed * 1.2
            } else if gap < base_gap * 0.6 {
                front_speed * 0.6
            } else if gap < base_gap * 0.8 {
                front_speed * 0.8
            } else {
                front_speed
            };

            if own_speed < 0.5 && gap > base_gap {
                target = target.max(5.0);
            }

            if let Some(v) = world.vehicles.get_mut(follower) {
                if !v.speed_pinned {
                    v.desired_speed = target;
                }
            }
        }
    }
}

// ── Pass 3: density adjustment ────────────────────────────────────────────────

/// Clamp speeds on congested edges; loosen small stable platoons on empty
/// ones.  Runs last so its caps are final.
pub fn density_adjust(world: &mut World, config: &EngineConfig) {
    let ids: Vec<VehicleId> = world.vehicles.keys().cloned().collect();

    for vid in &ids {
        let Some(v) = world.vehicles.get(vid) else {
            continue;
        };
        if v.at_intersection {
            continue;
        }
        let Some(density) = world.density_at(v.road) else {
            continue;
        };

        let led = world.led_platoon(vid).map(|p| p.size());
        let is_leader_flag = v.is_leader;

        let v = world.vehicles.get_mut(vid).expect("present above");
        match led {
            Some(platoon_size) => {
                if density > 70.0 {
                    v.desired_speed = v.desired_speed.min(8.3);
                } else if density > 50.0 {
                    v.desired_speed = v.desired_speed.min(11.1);
                } else if density > 30.0 {
                    let cap = if platoon_size > 5 {
                        config.max_platoon_speed
                    } else {
                        16.7
                    };
                    v.desired_speed = v.desired_speed.min(cap);
                } else if platoon_size > 3 && density < 20.0 {
                    v.desired_speed = config.stable_platoon_speed.min(v.desired_speed * 1.1);
                }
            }
            None if !is_leader_flag => {
                if density > 70.0 {
                    v.desired_speed = v.desired_speed.min(7.8);
                }
            }
            None => {}
        }
    }
}
