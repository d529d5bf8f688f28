//! Transport error type.

use thiserror::Error;

/// Errors on the simulator link.  All of them end the session.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds the {max} byte limit", max = crate::frame::MAX_FRAME_BYTES)]
    FrameTooLarge(usize),
}

/// Alias for `Result<T, TransportError>`.
pub type TransportResult<T> = Result<T, TransportError>;
