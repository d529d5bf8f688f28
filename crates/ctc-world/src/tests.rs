//! Unit tests for the world model and census ingest.

use std::time::Duration;

use ctc_core::{EngineConfig, Timestamp, VehicleId};

use crate::census::{self, Census, CensusRecord};
use crate::world::World;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn record(edge: &str, lane: &str, pos: f64, speed: f64) -> CensusRecord {
    CensusRecord {
        lane: lane.to_owned(),
        pos,
        speed,
        edge: edge.to_owned(),
    }
}

fn census(entries: &[(&str, &str, &str, f64, f64)]) -> Census {
    entries
        .iter()
        .map(|(id, edge, lane, pos, speed)| {
            (VehicleId::from(*id), record(edge, lane, *pos, *speed))
        })
        .collect()
}

fn ingest(world: &mut World, entries: &[(&str, &str, &str, f64, f64)], now: Timestamp) {
    census::apply(world, &census(entries), now, &EngineConfig::default());
}

fn vid(id: &str) -> VehicleId {
    VehicleId::from(id)
}

// ── Census ingest ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod ingest_tests {
    use super::*;

    #[test]
    fn new_vehicles_get_defaults_and_are_counted() {
        let mut world = World::new();
        ingest(
            &mut world,
            &[("a", "up_incoming", "u0", 50.0, 10.0)],
            Timestamp::ZERO,
        );

        let v = &world.vehicles[&vid("a")];
        assert_eq!(v.desired_speed, 13.9);
        assert_eq!(v.reaction_time, 0.5);
        assert_eq!(v.road, Some(ctc_core::Edge::UpIncoming));
        assert_eq!(world.total_created, 1);
    }

    #[test]
    fn repeat_census_updates_in_place() {
        let mut world = World::new();
        ingest(&mut world, &[("a", "up_incoming", "u0", 50.0, 10.0)], Timestamp::ZERO);
        ingest(&mut world, &[("a", "up_incoming", "u0", 60.0, 12.0)], Timestamp::ZERO);

        let v = &world.vehicles[&vid("a")];
        assert_eq!(v.pos, 60.0);
        assert_eq!(v.speed, 12.0);
        assert_eq!(world.total_created, 1, "no duplicate creation");
    }

    #[test]
    fn vanished_vehicle_is_deleted_and_platoon_disbanded() {
        let mut world = World::new();
        ingest(
            &mut world,
            &[
                ("a", "up_incoming", "u0", 50.0, 10.0),
                ("b", "up_incoming", "u0", 40.0, 10.0),
            ],
            Timestamp::ZERO,
        );

        // Hand-build the platoon relation the engine would have created.
        let mut p = crate::Platoon::new(
            ctc_core::PlatoonId::from("p_test"),
            vid("a"),
            "up_incoming".into(),
            "u0".into(),
        );
        p.vehicle_ids = vec![vid("a"), vid("b")];
        world.insert_platoon(p);

        // `a` disappears: `b` alone cannot sustain the platoon.
        ingest(&mut world, &[("b", "up_incoming", "u0", 45.0, 10.0)], Timestamp::ZERO);

        assert!(!world.vehicles.contains_key("a"));
        assert!(world.platoons.is_empty());
        assert!(world.vehicle_platoon.is_empty());
        assert_eq!(world.vehicles[&vid("b")].platoon_id, None);
        assert_eq!(world.total_removed, 1);
    }

    #[test]
    fn roster_consistency_after_ingest() {
        let mut world = World::new();
        ingest(
            &mut world,
            &[
                ("a", ":center_1_0", ":c0", 2.0, 4.0),
                ("b", ":center_2_0", ":c1", 1.0, 3.0),
                ("c", "up_incoming", "u0", 10.0, 10.0),
            ],
            Timestamp::ZERO,
        );

        let roster = &world.intersections[&ctc_core::IntersectionId::from(":center")].vehicles;
        assert_eq!(roster, &[vid("a"), vid("b")]);

        // Every roster entry exists, and each vehicle sits in one roster only.
        for intersection in world.intersections.values() {
            for v in &intersection.vehicles {
                assert!(world.vehicles.contains_key(v.as_str()));
            }
        }
    }

    #[test]
    fn roster_rebuilt_from_scratch_each_tick() {
        let mut world = World::new();
        ingest(&mut world, &[("a", ":center_1_0", ":c0", 2.0, 4.0)], Timestamp::ZERO);
        // `a` exits the junction onto a leaving edge, far from the end.
        ingest(&mut world, &[("a", "up_leaving", "u0", 5.0, 10.0)], Timestamp::ZERO);

        let roster = &world.intersections[&ctc_core::IntersectionId::from(":center")].vehicles;
        assert!(roster.is_empty());
    }
}

// ── At-intersection classification ────────────────────────────────────────────

#[cfg(test)]
mod near_junction_tests {
    use ctc_core::Edge;

    use crate::census::near_junction;

    #[test]
    fn internal_edge_always_queues() {
        assert!(near_junction(":center_1_0", None, 0.0, 20.0));
    }

    #[test]
    fn close_to_edge_end_queues() {
        // up_incoming is 126.10 m long.
        let road = Some(Edge::UpIncoming);
        assert!(near_junction("up_incoming", road, 112.0, 15.0)); // 14.1 m to go
        assert!(near_junction("up_incoming", road, 107.0, 15.0)); // 19.1 m, junction edge
        assert!(!near_junction("up_incoming", road, 100.0, 15.0)); // 26.1 m
    }

    #[test]
    fn crawling_on_junction_edge_queues() {
        assert!(near_junction("up_incoming", Some(Edge::UpIncoming), 30.0, 4.9));
        assert!(!near_junction("up_incoming", Some(Edge::UpIncoming), 30.0, 5.0));
    }

    #[test]
    fn unknown_edge_is_neutral() {
        assert!(!near_junction("ramp_7", None, 999.0, 0.0));
    }
}

// ── Density ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod density_tests {
    use super::*;

    fn ingest_n(world: &mut World, edge: &'static str, n: usize, now: Timestamp) {
        let entries: Census = (0..n)
            .map(|i| (VehicleId::new(format!("v{i:03}")), record(edge, "l0", i as f64, 10.0)))
            .collect();
        census::apply(world, &entries, now, &EngineConfig::default());
    }

    #[test]
    fn density_measured_on_cadence_only() {
        let mut world = World::new();
        let t0 = Timestamp::ZERO;
        ingest_n(&mut world, "up_incoming", 30, t0);
        let first = world.traffic_density[&ctc_core::Edge::UpIncoming];

        // One second later the count changes but the cadence holds the value.
        ingest_n(&mut world, "up_incoming", 60, t0 + Duration::from_secs(1));
        assert_eq!(world.traffic_density[&ctc_core::Edge::UpIncoming], first);

        // At the two-second mark it refreshes.
        ingest_n(&mut world, "up_incoming", 60, t0 + Duration::from_secs(2));
        assert!(world.traffic_density[&ctc_core::Edge::UpIncoming] > first);
    }

    #[test]
    fn density_is_per_100m_of_edge() {
        let mut world = World::new();
        ingest_n(&mut world, "up_incoming", 30, Timestamp::ZERO);
        // 30 vehicles over 126.10 m ≈ 23.8 per 100 m.
        let d = world.traffic_density[&ctc_core::Edge::UpIncoming];
        assert!((d - 23.79).abs() < 0.05, "got {d}");
    }

    #[test]
    fn queued_vehicles_do_not_count() {
        let mut world = World::new();
        // pos 120 of 126.10 → 6.1 m to the end: at intersection.
        ingest(&mut world, &[("a", "up_incoming", "u0", 120.0, 10.0)], Timestamp::ZERO);
        assert!(world.traffic_density.get(&ctc_core::Edge::UpIncoming).is_none());
    }
}

// ── Relational fix-ups ────────────────────────────────────────────────────────

#[cfg(test)]
mod relation_tests {
    use super::*;
    use crate::Platoon;
    use ctc_core::PlatoonId;

    fn seeded_world() -> World {
        let mut world = World::new();
        ingest(
            &mut world,
            &[
                ("a", "up_incoming", "u0", 60.0, 10.0),
                ("b", "up_incoming", "u0", 50.0, 10.0),
                ("c", "up_incoming", "u0", 40.0, 10.0),
            ],
            Timestamp::ZERO,
        );
        let mut p = Platoon::new(PlatoonId::from("p_abc"), vid("a"), "up_incoming".into(), "u0".into());
        p.vehicle_ids = vec![vid("a"), vid("b"), vid("c")];
        world.insert_platoon(p);
        world
    }

    #[test]
    fn insert_platoon_wires_both_directions() {
        let world = seeded_world();
        for id in ["a", "b", "c"] {
            assert_eq!(
                world.vehicle_platoon[&vid(id)],
                PlatoonId::from("p_abc")
            );
            assert_eq!(
                world.vehicles[&vid(id)].platoon_id,
                Some(PlatoonId::from("p_abc"))
            );
        }
    }

    #[test]
    fn detach_leader_hands_off() {
        let mut world = seeded_world();
        let remaining = world.detach(&vid("a"), &PlatoonId::from("p_abc"));
        assert_eq!(remaining, 2);

        let p = &world.platoons[&PlatoonId::from("p_abc")];
        assert_eq!(p.leader_id, vid("b"));
        assert!(world.vehicles[&vid("b")].is_leader);
        assert!(!world.vehicles[&vid("a")].is_leader);
        assert_eq!(world.vehicles[&vid("a")].platoon_id, None);
    }

    #[test]
    fn disband_clears_all_members() {
        let mut world = seeded_world();
        world.disband(&PlatoonId::from("p_abc"));
        assert!(world.platoons.is_empty());
        assert!(world.vehicle_platoon.is_empty());
        for id in ["a", "b", "c"] {
            assert_eq!(world.vehicles[&vid(id)].platoon_id, None);
            assert!(!world.vehicles[&vid(id)].is_leader);
        }
    }

    #[test]
    fn merge_keeps_leading_leader() {
        let mut world = seeded_world();
        ingest_extra(&mut world);

        world.merge(&PlatoonId::from("p_abc"), &PlatoonId::from("p_de"));

        assert!(!world.platoons.contains_key("p_de"));
        let p = &world.platoons[&PlatoonId::from("p_abc")];
        assert_eq!(p.size(), 5);
        assert_eq!(p.leader_id, vid("a"));
        assert!(!world.vehicles[&vid("d")].is_leader, "absorbed leader demoted");
        assert_eq!(world.vehicle_platoon[&vid("e")], PlatoonId::from("p_abc"));
    }

    fn ingest_extra(world: &mut World) {
        ingest(
            world,
            &[
                ("a", "up_incoming", "u0", 60.0, 10.0),
                ("b", "up_incoming", "u0", 50.0, 10.0),
                ("c", "up_incoming", "u0", 40.0, 10.0),
                ("d", "up_incoming", "u0", 30.0, 10.0),
                ("e", "up_incoming", "u0", 20.0, 10.0),
            ],
            Timestamp::ZERO,
        );
        let mut p = Platoon::new(PlatoonId::from("p_de"), vid("d"), "up_incoming".into(), "u0".into());
        p.vehicle_ids = vec![vid("d"), vid("e")];
        world.insert_platoon(p);
    }

    #[test]
    fn ordered_members_front_to_back() {
        let world = seeded_world();
        assert_eq!(
            world.ordered_members(&PlatoonId::from("p_abc")),
            vec![vid("a"), vid("b"), vid("c")]
        );
    }

    #[test]
    fn find_vehicle_ahead_respects_window() {
        let world = seeded_world();
        // 10 m ahead of b is a.
        assert_eq!(world.find_vehicle_ahead(&vid("b"), 50.0), Some(vid("a")));
        // Nothing ahead of the front vehicle.
        assert_eq!(world.find_vehicle_ahead(&vid("a"), 50.0), None);
        // Window shorter than the gap finds nothing.
        assert_eq!(world.find_vehicle_ahead(&vid("b"), 5.0), None);
    }
}

// ── Reservations and throughput ───────────────────────────────────────────────

#[cfg(test)]
mod bookkeeping_tests {
    use super::*;
    use crate::Reservation;
    use ctc_core::{IntersectionId, PlatoonId, ReservationId};

    #[test]
    fn expired_reservations_purged_and_flag_cleared() {
        let mut world = World::new();
        ingest(&mut world, &[("a", ":center_1_0", ":c0", 1.0, 2.0)], Timestamp::ZERO);

        let iid = IntersectionId::from(":center");
        let rid = ReservationId::from("p_x_:center");
        world.reservations.insert(
            rid.clone(),
            Reservation {
                id: rid,
                intersection_id: iid.clone(),
                platoon_id: PlatoonId::from("p_x"),
                start_time: Timestamp::ZERO,
                end_time: Timestamp::from_secs_f64(5.0),
                edge_from: "up_incoming".into(),
                direction: None,
            },
        );
        world.intersections.get_mut(&iid).unwrap().has_reservation = true;

        // Still active at t=4: survives.
        world.purge_expired_reservations(Timestamp::from_secs_f64(4.0));
        assert_eq!(world.reservations.len(), 1);
        assert!(world.intersections[&iid].has_reservation);

        // Gone at t=6.
        world.purge_expired_reservations(Timestamp::from_secs_f64(6.0));
        assert!(world.reservations.is_empty());
        assert!(!world.intersections[&iid].has_reservation);
    }

    #[test]
    fn throughput_counts_each_vehicle_once() {
        let mut world = World::new();
        ingest(&mut world, &[("a", "up_leaving", "u0", 30.0, 10.0)], Timestamp::ZERO);

        world.mark_throughput();
        world.mark_throughput();
        assert_eq!(world.throughput_total, 1);
        assert!(world.vehicles[&vid("a")].counted_in_throughput);
    }
}
