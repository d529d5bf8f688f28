//! Framework error type.
//!
//! Sub-crates may define their own error enums and convert them into
//! `CtcError` via `From` impls, or keep them separate.  Phase-internal
//! failures (a platoon referencing a vehicle that left the census mid-tick)
//! are not errors at all: they are logged and skipped where they occur, so
//! this enum only covers conditions that cross a crate boundary.

use thiserror::Error;

use crate::{PlatoonId, VehicleId};

/// The top-level error type for `ctc-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CtcError {
    #[error("vehicle {0} not found")]
    VehicleNotFound(VehicleId),

    #[error("platoon {0} not found")]
    PlatoonNotFound(PlatoonId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `ctc-*` crates.
pub type CtcResult<T> = Result<T, CtcError>;
