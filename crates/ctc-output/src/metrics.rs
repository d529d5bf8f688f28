//! Metric row types and their computation from world aggregates.

use serde::Serialize;

use ctc_core::edge::Edge;
use ctc_world::{Platoon, World};

/// One benchmark sample, taken at the end of a tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepMetrics {
    pub time_step: u64,
    pub total_vehicles: usize,
    pub average_speed: f64,
    pub average_wait_time: f64,
    pub max_wait_time: u32,
    pub min_wait_time: u32,
    pub intersection_queue_size: usize,
    pub throughput_count: u64,
    pub total_throughput: u64,
    pub platoon_count: usize,
    pub average_platoon_size: f64,
    pub max_platoon_size: usize,
    pub total_created_vehicles: u64,
    pub total_removed_vehicles: u64,
    pub average_travel_time: f64,
    pub max_travel_time: f64,
    /// Network-wide vehicles per metre of canonical road.
    pub traffic_density: f64,
    pub simulation_time_elapsed: f64,
}

impl StepMetrics {
    /// Sample the world at the end of step `time_step`.
    pub fn sample(world: &World, time_step: u64, elapsed_secs: f64) -> Self {
        let (max_wait, min_wait, avg_wait) = wait_stats(world);
        let (avg_travel, max_travel) = travel_stats(world);

        Self {
            time_step,
            total_vehicles: world.vehicles.len(),
            average_speed: average_speed(world),
            average_wait_time: avg_wait,
            max_wait_time: max_wait,
            min_wait_time: min_wait,
            intersection_queue_size: world
                .intersections
                .values()
                .map(|i| i.vehicles.len())
                .sum(),
            throughput_count: world.throughput_step,
            total_throughput: world.throughput_total,
            platoon_count: world.platoons.len(),
            average_platoon_size: average_platoon_size(world),
            max_platoon_size: world
                .platoons
                .values()
                .map(Platoon::size)
                .max()
                .unwrap_or(0),
            total_created_vehicles: world.total_created,
            total_removed_vehicles: world.total_removed,
            average_travel_time: avg_travel,
            max_travel_time: max_travel,
            traffic_density: network_density(world),
            simulation_time_elapsed: elapsed_secs,
        }
    }
}

fn average_speed(world: &World) -> f64 {
    if world.vehicles.is_empty() {
        return 0.0;
    }
    world.vehicles.values().map(|v| v.speed).sum::<f64>() / world.vehicles.len() as f64
}

/// `(max, min, average)` over vehicles that are actually waiting.
fn wait_stats(world: &World) -> (u32, u32, f64) {
    let waits: Vec<u32> = world
        .vehicles
        .values()
        .map(|v| v.waiting_time)
        .filter(|&w| w > 0)
        .collect();
    if waits.is_empty() {
        return (0, 0, 0.0);
    }
    let max = waits.iter().copied().max().unwrap_or(0);
    let min = waits.iter().copied().min().unwrap_or(0);
    let avg = waits.iter().map(|&w| w as f64).sum::<f64>() / waits.len() as f64;
    (max, min, avg)
}

fn travel_stats(world: &World) -> (f64, f64) {
    let times: Vec<f64> = world
        .vehicles
        .values()
        .map(|v| v.travel_time)
        .filter(|&t| t > 0.0)
        .collect();
    if times.is_empty() {
        return (0.0, 0.0);
    }
    let max = times.iter().copied().fold(0.0, f64::max);
    let avg = times.iter().sum::<f64>() / times.len() as f64;
    (avg, max)
}

fn average_platoon_size(world: &World) -> f64 {
    if world.platoons.is_empty() {
        return 0.0;
    }
    world.platoons.values().map(Platoon::size).sum::<usize>() as f64
        / world.platoons.len() as f64
}

fn network_density(world: &World) -> f64 {
    let total_length: f64 = Edge::ALL.iter().map(|e| e.length_m()).sum();
    world.vehicles.len() as f64 / total_length
}

// ── Run summary ───────────────────────────────────────────────────────────────

/// Whole-run aggregation of the recorded rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub algorithm_type: String,
    pub total_steps: u64,
    pub average_vehicles: f64,
    pub total_unique_vehicles: u64,
    pub final_throughput: u64,
    pub average_speed: f64,
    pub average_wait_time: f64,
    pub max_wait_time: u32,
    pub average_travel_time: f64,
    pub max_travel_time: f64,
    pub average_intersection_queue: f64,
    pub average_platoon_size: f64,
    pub max_platoon_size: usize,
    pub average_traffic_density: f64,
    pub simulation_runtime: f64,
}

impl RunSummary {
    /// Aggregate the recorded rows for algorithm `name`.
    pub fn from_rows(name: &str, rows: &[StepMetrics]) -> Self {
        let Some(last) = rows.last() else {
            return Self::default();
        };
        let n = rows.len() as f64;

        Self {
            algorithm_type: name.to_owned(),
            total_steps: last.time_step,
            average_vehicles: rows.iter().map(|m| m.total_vehicles as f64).sum::<f64>() / n,
            total_unique_vehicles: last.total_created_vehicles,
            final_throughput: last.total_throughput,
            average_speed: rows.iter().map(|m| m.average_speed).sum::<f64>() / n,
            average_wait_time: rows.iter().map(|m| m.average_wait_time).sum::<f64>() / n,
            max_wait_time: rows.iter().map(|m| m.max_wait_time).max().unwrap_or(0),
            average_travel_time: last.average_travel_time,
            max_travel_time: rows.iter().map(|m| m.max_travel_time).fold(0.0, f64::max),
            average_intersection_queue: rows
                .iter()
                .map(|m| m.intersection_queue_size as f64)
                .sum::<f64>()
                / n,
            average_platoon_size: rows.iter().map(|m| m.average_platoon_size).sum::<f64>() / n,
            max_platoon_size: rows.iter().map(|m| m.max_platoon_size).max().unwrap_or(0),
            average_traffic_density: rows.iter().map(|m| m.traffic_density).sum::<f64>() / n,
            simulation_runtime: last.simulation_time_elapsed,
        }
    }
}
