//! CSV and JSON report writers.

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::error::OutputResult;
use crate::metrics::{RunSummary, StepMetrics};

/// Write one row per recorded step, with an explicit header.
pub fn write_csv(path: &Path, rows: &[StepMetrics]) -> OutputResult<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "TimeStep",
        "TotalVehicles",
        "AverageSpeed",
        "AverageWaitTime",
        "MaxWaitTime",
        "MinWaitTime",
        "IntersectionQueueSize",
        "ThroughputCount",
        "TotalThroughput",
        "PlatoonCount",
        "AveragePlatoonSize",
        "MaxPlatoonSize",
        "TotalCreatedVehicles",
        "TotalRemovedVehicles",
        "AverageTravelTime",
        "MaxTravelTime",
        "TrafficDensity",
        "SimulationTimeElapsed",
    ])?;

    for m in rows {
        writer.write_record(&[
            m.time_step.to_string(),
            m.total_vehicles.to_string(),
            format!("{:.2}", m.average_speed),
            format!("{:.2}", m.average_wait_time),
            m.max_wait_time.to_string(),
            m.min_wait_time.to_string(),
            m.intersection_queue_size.to_string(),
            m.throughput_count.to_string(),
            m.total_throughput.to_string(),
            m.platoon_count.to_string(),
            format!("{:.2}", m.average_platoon_size),
            m.max_platoon_size.to_string(),
            m.total_created_vehicles.to_string(),
            m.total_removed_vehicles.to_string(),
            format!("{:.2}", m.average_travel_time),
            format!("{:.2}", m.max_travel_time),
            format!("{:.5}", m.traffic_density),
            format!("{:.2}", m.simulation_time_elapsed),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the pretty-printed run summary.
pub fn write_json(path: &Path, summary: &RunSummary) -> OutputResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}
