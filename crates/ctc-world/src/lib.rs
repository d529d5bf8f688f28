//! `ctc-world` — the mutable world model the coordination engine drives.
//!
//! # Entity graph
//!
//! Vehicles, platoons, intersections and reservations form a cyclic graph
//! (vehicle ↔ platoon ↔ intersection).  Every entity therefore lives in an
//! id-keyed store on [`World`] and cross-references are ids, never handles;
//! deletion fixes up back-pointers in a single pass.  The stores are
//! `BTreeMap`s so that any engine phase iterating a store visits entities in
//! id order, which is what makes tie-breaking deterministic.
//!
//! | Module           | Contents                                          |
//! |------------------|---------------------------------------------------|
//! | [`vehicle`]      | `Vehicle` — census state + engine-managed fields  |
//! | [`platoon`]      | `Platoon`                                         |
//! | [`intersection`] | `Intersection`, `Reservation`                     |
//! | [`world`]        | `World` — stores, relational fix-ups, stats       |
//! | [`census`]       | Per-tick ingest of the simulator vehicle census   |

pub mod census;
pub mod intersection;
pub mod platoon;
pub mod vehicle;
pub mod world;

#[cfg(test)]
mod tests;

pub use census::{Census, CensusRecord};
pub use intersection::{Intersection, Reservation};
pub use platoon::Platoon;
pub use vehicle::Vehicle;
pub use world::{World, WorldStats};
