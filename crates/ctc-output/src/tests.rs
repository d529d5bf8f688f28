//! Unit tests for metrics sampling and report writing.

use ctc_core::{EngineConfig, Timestamp, VehicleId};
use ctc_world::census::{Census, CensusRecord};
use ctc_world::World;

fn small_world() -> World {
    let mut world = World::new();
    let census: Census = [
        ("a", 50.0, 10.0),
        ("b", 40.0, 6.0),
        ("c", 30.0, 0.2),
    ]
    .into_iter()
    .map(|(id, pos, speed)| {
        (
            VehicleId::from(id),
            CensusRecord {
                lane: "u0".into(),
                pos,
                speed,
                edge: "up_incoming".into(),
            },
        )
    })
    .collect();
    ctc_world::census::apply(&mut world, &census, Timestamp::ZERO, &EngineConfig::default());
    world
}

#[cfg(test)]
mod metrics_tests {
    use super::*;
    use crate::metrics::{RunSummary, StepMetrics};

    #[test]
    fn sample_reflects_world_aggregates() {
        let mut world = small_world();
        world.vehicles.get_mut("c").unwrap().waiting_time = 4;
        world.vehicles.get_mut("b").unwrap().travel_time = 12.0;

        let m = StepMetrics::sample(&world, 9, 1.5);
        assert_eq!(m.time_step, 9);
        assert_eq!(m.total_vehicles, 3);
        assert!((m.average_speed - (10.0 + 6.0 + 0.2) / 3.0).abs() < 1e-9);
        assert_eq!(m.max_wait_time, 4);
        assert_eq!(m.min_wait_time, 4);
        assert!((m.average_wait_time - 4.0).abs() < 1e-9);
        assert!((m.average_travel_time - 12.0).abs() < 1e-9);
        assert_eq!(m.total_created_vehicles, 3);
        assert_eq!(m.simulation_time_elapsed, 1.5);
    }

    #[test]
    fn empty_world_samples_to_zeroes() {
        let m = StepMetrics::sample(&World::new(), 0, 0.0);
        assert_eq!(m.total_vehicles, 0);
        assert_eq!(m.average_speed, 0.0);
        assert_eq!(m.average_wait_time, 0.0);
        assert_eq!(m.max_platoon_size, 0);
    }

    #[test]
    fn summary_aggregates_rows() {
        let rows = vec![
            StepMetrics {
                time_step: 1,
                total_vehicles: 10,
                average_speed: 8.0,
                max_wait_time: 2,
                max_platoon_size: 3,
                total_created_vehicles: 10,
                total_throughput: 0,
                simulation_time_elapsed: 0.5,
                ..Default::default()
            },
            StepMetrics {
                time_step: 2,
                total_vehicles: 20,
                average_speed: 12.0,
                max_wait_time: 7,
                max_platoon_size: 5,
                total_created_vehicles: 25,
                total_throughput: 4,
                average_travel_time: 3.0,
                simulation_time_elapsed: 1.0,
                ..Default::default()
            },
        ];

        let s = RunSummary::from_rows("custom", &rows);
        assert_eq!(s.algorithm_type, "custom");
        assert_eq!(s.total_steps, 2);
        assert!((s.average_vehicles - 15.0).abs() < 1e-9);
        assert!((s.average_speed - 10.0).abs() < 1e-9);
        assert_eq!(s.max_wait_time, 7);
        assert_eq!(s.max_platoon_size, 5);
        assert_eq!(s.total_unique_vehicles, 25);
        assert_eq!(s.final_throughput, 4);
        assert_eq!(s.average_travel_time, 3.0);
        assert_eq!(s.simulation_runtime, 1.0);
    }

    #[test]
    fn empty_run_summary_is_default() {
        assert_eq!(RunSummary::from_rows("x", &[]), RunSummary::default());
    }
}

#[cfg(test)]
mod report_tests {
    use tempfile::TempDir;

    use super::*;
    use crate::metrics::{RunSummary, StepMetrics};
    use crate::report::{write_csv, write_json};

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir = tmp();
        let path = dir.path().join("bench.csv");
        let rows = vec![
            StepMetrics::sample(&small_world(), 1, 0.1),
            StepMetrics::sample(&small_world(), 2, 0.2),
        ];
        write_csv(&path, &rows).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<_> = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(headers[0], "TimeStep");
        assert_eq!(headers[headers.len() - 1], "SimulationTimeElapsed");

        let records: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "1");
        assert_eq!(&records[0][1], "3"); // total vehicles
    }

    #[test]
    fn json_summary_round_trips() {
        let dir = tmp();
        let path = dir.path().join("summary.json");
        let summary = RunSummary::from_rows(
            "custom",
            &[StepMetrics::sample(&small_world(), 5, 2.0)],
        );
        write_json(&path, &summary).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["algorithmType"], "custom");
        assert_eq!(value["totalSteps"], 5);
    }
}

#[cfg(test)]
mod recorder_tests {
    use tempfile::TempDir;

    use super::*;
    use crate::recorder::BenchmarkRecorder;
    use ctc_core::TimeStep;
    use ctc_engine::EngineObserver;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn recorder_samples_until_duration_then_saves() {
        let dir = tmp();
        let mut recorder = BenchmarkRecorder::start("custom", dir.path(), 3);
        let world = small_world();

        for step in 1..=5u64 {
            recorder.on_tick_end(TimeStep(step), &world);
        }

        assert!(recorder.is_finished());
        assert_eq!(recorder.rows().len(), 3, "sampling stops at the duration");
        assert!(recorder.take_error().is_none());

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert!(files.iter().any(|f| f.starts_with("benchmark_custom_")));
        assert!(files.iter().any(|f| f.starts_with("summary_custom_")));
    }

    #[test]
    fn early_run_end_saves_partial_results() {
        let dir = tmp();
        let mut recorder = BenchmarkRecorder::start("custom", dir.path(), 100);
        let world = small_world();

        recorder.on_tick_end(TimeStep(1), &world);
        recorder.on_run_end(TimeStep(1));

        assert!(recorder.is_finished());
        assert_eq!(recorder.rows().len(), 1);
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 2);
    }

    #[test]
    fn empty_run_writes_nothing() {
        let dir = tmp();
        let mut recorder = BenchmarkRecorder::start("custom", dir.path(), 10);
        recorder.on_run_end(TimeStep::ZERO);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
