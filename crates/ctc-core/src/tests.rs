//! Unit tests for ctc-core primitives.

#[cfg(test)]
mod ids {
    use crate::{IntersectionId, PlatoonId, ReservationId, TimeStep, VehicleId};

    #[test]
    fn ordering_is_lexicographic() {
        assert!(VehicleId::from("a") < VehicleId::from("b"));
        assert!(PlatoonId::from("p_10") < PlatoonId::from("p_9"));
    }

    #[test]
    fn formed_platoon_id_names_the_site() {
        let id = PlatoonId::formed("up_incoming", &VehicleId::from("flow.3"));
        assert_eq!(id.as_str(), "p_up_incoming_flow.3");
    }

    #[test]
    fn capped_platoon_id_embeds_step() {
        let id = PlatoonId::capped("up_incoming", TimeStep(42));
        assert_eq!(id.as_str(), "p_split_up_incoming_42");
    }

    #[test]
    fn reservation_slot_id() {
        let id = ReservationId::slot(
            &PlatoonId::from("p_x"),
            &IntersectionId::from(":center"),
        );
        assert_eq!(id.as_str(), "p_x_:center");
    }
}

#[cfg(test)]
mod edges {
    use crate::edge::{
        edge_length, intersection_prefix, internal_source_token, is_edge_transition, Edge,
    };

    #[test]
    fn parse_roundtrip() {
        for edge in Edge::ALL {
            assert_eq!(Edge::parse(edge.as_str()), Some(edge));
        }
        assert_eq!(Edge::parse(":center_1_0"), None);
        assert_eq!(Edge::parse("nowhere"), None);
    }

    #[test]
    fn lengths_are_symmetric() {
        assert_eq!(Edge::DownIncoming.length_m(), Edge::UpLeaving.length_m());
        assert_eq!(Edge::UpIncoming.length_m(), Edge::DownLeaving.length_m());
        assert_eq!(Edge::LeftIncoming.length_m(), Edge::RightLeaving.length_m());
        assert_eq!(Edge::RightIncoming.length_m(), Edge::LeftLeaving.length_m());
    }

    #[test]
    fn unknown_edge_has_no_length() {
        assert_eq!(edge_length("up_incoming"), Some(126.10));
        assert_eq!(edge_length(":center_1_0"), None);
    }

    #[test]
    fn opposite_and_left_are_rotations() {
        use Edge::*;
        assert_eq!(DownIncoming.opposite(), Some(UpIncoming));
        assert_eq!(DownIncoming.left_neighbor(), Some(RightIncoming));
        assert_eq!(LeftIncoming.left_neighbor(), Some(DownIncoming));
        assert_eq!(UpIncoming.left_neighbor(), Some(LeftIncoming));
        assert_eq!(RightIncoming.left_neighbor(), Some(UpIncoming));
        assert_eq!(DownLeaving.opposite(), None);
        assert_eq!(DownLeaving.left_neighbor(), None);
    }

    #[test]
    fn internal_edge_tokens() {
        assert_eq!(intersection_prefix(":center_1_0"), Some(":center"));
        assert_eq!(intersection_prefix("up_incoming"), None);
        assert_eq!(internal_source_token(":center_1_0"), Some("1"));
    }

    #[test]
    fn edge_transition_detection() {
        assert!(is_edge_transition("up_incoming", "up_leaving"));
        assert!(is_edge_transition("down_leaving", "left_incoming"));
        assert!(!is_edge_transition("up_incoming", "down_incoming"));
        assert!(!is_edge_transition("up_incoming", ":center_1_0"));
    }
}

#[cfg(test)]
mod turns {
    use crate::edge::Edge::*;
    use crate::turn::{
        internal_lane_turn, lane_turn_hint, movements_compatible, route_from_id, turn_between,
        TurnDirection::*,
    };

    #[test]
    fn turn_table_covers_all_approaches() {
        assert_eq!(turn_between(DownIncoming, LeftLeaving), Right);
        assert_eq!(turn_between(DownIncoming, DownLeaving), Straight);
        assert_eq!(turn_between(DownIncoming, RightLeaving), Left);
        assert_eq!(turn_between(UpIncoming, RightLeaving), Right);
        assert_eq!(turn_between(RightIncoming, UpLeaving), Left);
        // Unlisted pairs default to straight.
        assert_eq!(turn_between(UpLeaving, DownIncoming), Straight);
    }

    #[test]
    fn route_inference_flips_compass() {
        // A vehicle coming *from* the up arm drives on down_incoming.
        assert_eq!(
            route_from_id("flow_up_to_left.7"),
            Some((DownIncoming, LeftLeaving))
        );
        assert_eq!(
            route_from_id("down_to_up.0"),
            Some((UpIncoming, UpLeaving))
        );
        assert_eq!(
            route_from_id("left_to_right.12"),
            Some((RightIncoming, RightLeaving))
        );
        assert_eq!(route_from_id("veh_123"), None);
    }

    #[test]
    fn internal_lane_hints() {
        assert_eq!(internal_lane_turn(":center_1_left_0"), Left);
        assert_eq!(internal_lane_turn(":center_2_right_0"), Right);
        assert_eq!(internal_lane_turn(":center_3_l"), Left);
        assert_eq!(internal_lane_turn(":center_3_sl2"), Left);
        assert_eq!(internal_lane_turn(":center_3_sr1"), Right);
        assert_eq!(internal_lane_turn(":center_4_0"), Straight);
    }

    #[test]
    fn weak_lane_hint() {
        assert_eq!(lane_turn_hint("up_incoming_left"), Some(Left));
        assert_eq!(lane_turn_hint("up_incoming_0"), None);
    }

    #[test]
    fn same_edge_always_compatible() {
        assert!(movements_compatible(
            "up_incoming",
            Some(Straight),
            "up_incoming",
            Some(Left)
        ));
    }

    #[test]
    fn opposite_edges_compatible_only_for_double_right() {
        assert!(movements_compatible(
            "up_incoming",
            Some(Right),
            "down_incoming",
            Some(Right)
        ));
        assert!(!movements_compatible(
            "up_incoming",
            Some(Right),
            "down_incoming",
            Some(Straight)
        ));
        assert!(!movements_compatible(
            "up_incoming",
            Some(Straight),
            "down_incoming",
            Some(Straight)
        ));
    }

    #[test]
    fn right_turn_clears_its_left_neighbor_unless_crossed() {
        // right_incoming is the left neighbor of down_incoming: a right
        // turn off down_incoming only conflicts with straight/left flow
        // from right_incoming.
        assert!(movements_compatible(
            "right_incoming",
            Some(Right),
            "down_incoming",
            Some(Right)
        ));
        assert!(!movements_compatible(
            "right_incoming",
            Some(Right),
            "down_incoming",
            Some(Straight)
        ));
    }

    #[test]
    fn unrelated_edges_incompatible() {
        assert!(!movements_compatible(
            "up_incoming",
            Some(Straight),
            "left_incoming",
            Some(Straight)
        ));
    }
}

#[cfg(test)]
mod errors {
    use crate::{CtcError, PlatoonId, VehicleId};

    #[test]
    fn messages_name_the_entity() {
        let e = CtcError::VehicleNotFound(VehicleId::from("veh.7"));
        assert_eq!(e.to_string(), "vehicle veh.7 not found");
        let e = CtcError::PlatoonNotFound(PlatoonId::from("p_x"));
        assert_eq!(e.to_string(), "platoon p_x not found");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let e: CtcError = io.into();
        assert!(matches!(e, CtcError::Io(_)));
    }
}

#[cfg(test)]
mod time {
    use std::time::Duration;

    use crate::{TimeStep, Timestamp};

    #[test]
    fn timestamps_order_and_advance() {
        let t0 = Timestamp::ZERO;
        let t1 = t0 + Duration::from_secs(3);
        assert!(t1 > t0);
        assert_eq!(t1.since(t0), Duration::from_secs(3));
        // Saturates instead of panicking near session start.
        assert_eq!(t0.since(t1), Duration::ZERO);
        assert_eq!(t0.rewind(Duration::from_secs(10)), Timestamp::ZERO);
    }

    #[test]
    fn steps_advance() {
        assert_eq!(TimeStep::ZERO.next(), TimeStep(1));
        assert_eq!(TimeStep(7).to_string(), "7");
    }
}
