//! `ctc-engine` — the per-tick coordination engine.
//!
//! # Phase order
//!
//! ```text
//! for every census exchange:
//!   ① Ingest        — reconcile the world against the vehicle census.
//!   ② Clocks        — waiting/travel timers, throughput, membership ages.
//!   ③ Platoons      — leader links, form/extend, disband singletons,
//!                     edge-transition splits, consolidation.
//!   ④ Stability     — per-platoon stability ratio; open-road leader boost.
//!   ⑤ Reservations  — book crossing slots for stable approaching platoons.
//!   ⑥ Arbitration   — per intersection: forced priority, reservation
//!                     enforcement, scored priority, non-conflicting
//!                     movements; then post-intersection hygiene.
//!   ⑦ Speed         — car-following synthesis, intra-platoon cohesion,
//!                     density adjustment.
//! ```
//!
//! Each phase is a free function over `&mut World`; the [`Engine`] ties them
//! together and owns the step counter.  Nothing here blocks, sleeps or reads
//! a clock — `now` is always an argument — so a test can replay any tick
//! sequence exactly.

pub mod arbiter;
pub mod engine;
pub mod observer;
pub mod platoons;
pub mod reservations;
pub mod speed;


pub use engine::{Algorithm, Engine};
pub use observer::{EngineObserver, NoopObserver};
