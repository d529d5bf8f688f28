//! Unit tests for framing and payload mapping.

#[cfg(test)]
mod frame_tests {
    use std::io::Cursor;

    use crate::error::TransportError;
    use crate::frame::{read_frame, write_frame};

    #[test]
    fn frame_roundtrip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"{\"x\":1}").unwrap();

        let mut cursor = Cursor::new(buf);
        let payload = read_frame(&mut cursor).unwrap();
        assert_eq!(payload, b"{\"x\":1}");
    }

    #[test]
    fn length_prefix_is_big_endian() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"abcd").unwrap();
        assert_eq!(&buf[..4], &[0, 0, 0, 4]);
        assert_eq!(&buf[4..], b"abcd");
    }

    #[test]
    fn empty_frame_is_legal() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"").unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn short_read_is_an_error() {
        // Prefix promises 10 bytes; only 3 follow.
        let mut data = vec![0, 0, 0, 10];
        data.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            read_frame(&mut cursor),
            Err(TransportError::Io(_))
        ));
    }

    #[test]
    fn absurd_length_prefix_rejected_before_allocating() {
        let data = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            read_frame(&mut cursor),
            Err(TransportError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn back_to_back_frames_stay_separated() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"first").unwrap();
        write_frame(&mut buf, b"second").unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).unwrap(), b"first");
        assert_eq!(read_frame(&mut cursor).unwrap(), b"second");
    }
}

#[cfg(test)]
mod protocol_tests {
    use ctc_core::{TimeStep, Timestamp, VehicleId};
    use ctc_world::census::{self, CensusRecord};
    use ctc_world::World;

    use crate::protocol::{decode_census, CommandBundle};

    #[test]
    fn census_decodes_typed_records() {
        let census = decode_census(
            br#"{"veh.0": {"lane": "u0", "pos": 12.5, "speed": 8.0, "edge": "up_incoming"}}"#,
        )
        .unwrap();

        let record = &census[&VehicleId::from("veh.0")];
        assert_eq!(
            record,
            &CensusRecord {
                lane: "u0".into(),
                pos: 12.5,
                speed: 8.0,
                edge: "up_incoming".into(),
            }
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let census = decode_census(
            br#"{"veh.0": {"lane": "u0", "pos": 1.0, "speed": 2.0, "edge": "up_incoming", "color": "red"}}"#,
        )
        .unwrap();
        assert_eq!(census.len(), 1);
    }

    #[test]
    fn missing_required_field_fails_the_tick() {
        let result = decode_census(br#"{"veh.0": {"lane": "u0", "pos": 1.0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn malformed_json_fails_the_tick() {
        assert!(decode_census(b"not json").is_err());
    }

    #[test]
    fn bundle_snapshot_matches_world() {
        let mut world = World::new();
        let census = decode_census(
            br#"{
                "a": {"lane": "u0", "pos": 50.0, "speed": 10.0, "edge": "up_incoming"},
                "b": {"lane": "u0", "pos": 40.0, "speed": 10.0, "edge": "up_incoming"}
            }"#,
        )
        .unwrap();
        census::apply(
            &mut world,
            &census,
            Timestamp::ZERO,
            &ctc_core::EngineConfig::default(),
        );
        world.vehicles.get_mut("a").unwrap().desired_speed = 11.1;

        let bundle = CommandBundle::from_world(&world, TimeStep(7));
        assert_eq!(bundle.speeds["a"], 11.1);
        assert_eq!(bundle.speeds["b"], 13.9);
        assert_eq!(bundle.stats.time_step, 7);
        assert_eq!(bundle.stats.vehicle_count, 2);
        assert_eq!(bundle.stats.platoon_count, 0);
    }

    #[test]
    fn bundle_encodes_expected_shape() {
        let world = World::new();
        let bundle = CommandBundle::from_world(&world, TimeStep(1));
        let encoded = bundle.encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();

        assert!(value["speeds"].is_object());
        assert!(value["platoons"].is_object());
        assert_eq!(value["stats"]["time_step"], 1);
        assert_eq!(value["stats"]["vehicle_count"], 0);
        assert_eq!(value["stats"]["reservations_count"], 0);
    }
}
