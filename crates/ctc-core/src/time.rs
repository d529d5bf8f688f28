//! Coordination-engine time model.
//!
//! # Design
//!
//! Two clocks exist and must not be confused:
//!
//! - [`TimeStep`] counts completed census exchanges with the simulator.  It
//!   is the unit of the outbound `time_step` stat and of id suffixes.
//! - [`Timestamp`] is elapsed monotonic time since the session started, used
//!   by every *policy* decision (priority windows, reservation slots, the
//!   density cadence).
//!
//! Every function that consults the clock takes `now: Timestamp` as an
//! argument; only the host binary derives one from `std::time::Instant`.
//! Tests fabricate timestamps directly, so the 3-second pass cooldown, the
//! 15-second priority window and the 2-second density cadence are all
//! reproducible without sleeping.

use std::fmt;
use std::ops::Add;
use std::time::Duration;

// ── TimeStep ──────────────────────────────────────────────────────────────────

/// An absolute engine step counter, incremented once per census exchange.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeStep(pub u64);

impl TimeStep {
    pub const ZERO: TimeStep = TimeStep(0);

    /// The step following `self`.
    #[inline]
    pub fn next(self) -> TimeStep {
        TimeStep(self.0 + 1)
    }
}

impl fmt::Display for TimeStep {
    /// Bare number — step counters are embedded in derived platoon ids.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Timestamp ─────────────────────────────────────────────────────────────────

/// Monotonic elapsed time since session start.
///
/// Wraps a `Duration`, so ordering and arithmetic are exact; policy code
/// never touches wall-clock or floating-point seconds except for display.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    pub fn from_secs_f64(secs: f64) -> Self {
        Timestamp(Duration::from_secs_f64(secs))
    }

    pub fn from_elapsed(elapsed: Duration) -> Self {
        Timestamp(elapsed)
    }

    /// Elapsed time from `earlier` to `self`; zero if `earlier` is later.
    #[inline]
    pub fn since(self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    /// The timestamp `d` before `self`, clamped at session start.
    #[inline]
    pub fn rewind(self, d: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(d))
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;
    #[inline]
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T+{:.3}s", self.0.as_secs_f64())
    }
}
