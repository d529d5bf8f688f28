//! Engine observer trait for progress reporting and metrics collection.

use ctc_core::TimeStep;
use ctc_world::World;

/// Callbacks invoked by the host loop at tick boundaries.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  `on_tick_end` receives the world
/// read-only *between* ticks; observers copy out what they need and never
/// hold references past the call.
pub trait EngineObserver {
    /// Called before the census for `step` is ingested.
    fn on_tick_start(&mut self, _step: TimeStep) {}

    /// Called after the full phase pipeline for `step` has run.
    fn on_tick_end(&mut self, _step: TimeStep, _world: &World) {}

    /// Called once when the session ends (signal or transport loss).
    fn on_run_end(&mut self, _final_step: TimeStep) {}
}

/// An [`EngineObserver`] that does nothing.
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}
