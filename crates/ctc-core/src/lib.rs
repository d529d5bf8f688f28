//! `ctc-core` — foundational types for the `ctc` traffic-control coordinator.
//!
//! This crate is a dependency of every other `ctc-*` crate.  It intentionally
//! has no `ctc-*` dependencies and minimal external ones (only `thiserror`,
//! plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`ids`]     | `VehicleId`, `PlatoonId`, `IntersectionId`, `ReservationId` |
//! | [`edge`]    | The eight canonical edges, length/adjacency tables        |
//! | [`turn`]    | `TurnDirection`, turn table, route inference, movement compatibility |
//! | [`time`]    | `Timestamp`, `TimeStep`                                   |
//! | [`config`]  | `EngineConfig` — every tunable of the coordination engine |
//! | [`error`]   | `CtcError`, `CtcResult`                                   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to the id and turn types.   |
//!           | Required by `ctc-transport`.                               |

pub mod config;
pub mod edge;
pub mod error;
pub mod ids;
pub mod time;
pub mod turn;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::EngineConfig;
pub use edge::Edge;
pub use error::{CtcError, CtcResult};
pub use ids::{IntersectionId, PlatoonId, ReservationId, VehicleId};
pub use time::{TimeStep, Timestamp};
pub use turn::TurnDirection;
