//! Payload types and their mapping from the world model.
//!
//! The inbound census is duck-typed JSON keyed by vehicle id; records with
//! missing fields fail deserialization (and the tick), unknown fields are
//! ignored.  The outbound bundle carries the per-vehicle speed commands, the
//! platoon layout for visualization, and a stats block.

use std::collections::BTreeMap;

use serde::Serialize;

use ctc_core::TimeStep;
use ctc_world::census::Census;
use ctc_world::World;

use crate::error::TransportResult;

/// Decode an inbound census frame.
pub fn decode_census(payload: &[u8]) -> TransportResult<Census> {
    Ok(serde_json::from_slice(payload)?)
}

/// One platoon in the outbound bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlatoonSummary {
    pub leader: String,
    pub vehicles: Vec<String>,
    pub edge: String,
    pub lane: String,
}

/// Aggregate counters sent with every tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatsBlock {
    pub time_step: u64,
    pub vehicle_count: usize,
    pub platoon_count: usize,
    pub intersection_count: usize,
    pub reservations_count: usize,
}

/// The full outbound command set for one tick.
#[derive(Clone, Debug, Serialize)]
pub struct CommandBundle {
    pub speeds: BTreeMap<String, f64>,
    pub platoons: BTreeMap<String, PlatoonSummary>,
    pub stats: StatsBlock,
}

impl CommandBundle {
    /// Snapshot the world into a bundle.  Copies primitives only; nothing
    /// borrows the live world after this returns.
    pub fn from_world(world: &World, step: TimeStep) -> Self {
        let speeds = world
            .vehicles
            .iter()
            .map(|(id, v)| (id.as_str().to_owned(), v.desired_speed))
            .collect();

        let platoons = world
            .platoons
            .iter()
            .map(|(id, p)| {
                (
                    id.as_str().to_owned(),
                    PlatoonSummary {
                        leader: p.leader_id.as_str().to_owned(),
                        vehicles: p.vehicle_ids.iter().map(|v| v.as_str().to_owned()).collect(),
                        edge: p.edge.clone(),
                        lane: p.lane.clone(),
                    },
                )
            })
            .collect();

        let stats = world.stats();
        CommandBundle {
            speeds,
            platoons,
            stats: StatsBlock {
                time_step: step.0,
                vehicle_count: stats.vehicle_count,
                platoon_count: stats.platoon_count,
                intersection_count: stats.intersection_count,
                reservations_count: stats.reservation_count,
            },
        }
    }

    pub fn encode(&self) -> TransportResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
