//! `ctc-transport` — the framed JSON link to the external simulator.
//!
//! # Wire format
//!
//! Both directions carry frames of a 4-byte big-endian unsigned length
//! followed by exactly that many bytes of UTF-8 JSON:
//!
//! ```text
//! inbound  (per tick): { "<vehicle_id>": { "lane", "pos", "speed", "edge" }, … }
//! outbound (per tick): { "speeds": {…}, "platoons": {…}, "stats": {…} }
//! ```
//!
//! Any transport failure — short read, oversized frame, malformed JSON,
//! missing record field — is fatal to the session: the tick loop surfaces
//! the error and exits.  Nothing here retries.
//!
//! | Module       | Contents                                               |
//! |--------------|--------------------------------------------------------|
//! | [`frame`]    | Length-prefixed frame reader/writer                    |
//! | [`protocol`] | Census decoding, `CommandBundle` construction/encoding |
//! | [`session`]  | `Session` — a connected simulator exchange             |
//! | [`error`]    | `TransportError`, `TransportResult`                    |

pub mod error;
pub mod frame;
pub mod protocol;
pub mod session;

#[cfg(test)]
mod tests;

pub use error::{TransportError, TransportResult};
pub use protocol::{CommandBundle, PlatoonSummary, StatsBlock};
pub use session::Session;
