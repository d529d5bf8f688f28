//! `BenchmarkRecorder` — an engine observer that samples every tick and
//! writes the reports when the run completes.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};

use ctc_core::TimeStep;
use ctc_engine::EngineObserver;
use ctc_world::World;

use crate::error::OutputResult;
use crate::metrics::{RunSummary, StepMetrics};
use crate::report;

/// Records per-step metrics for `duration_steps` ticks, then saves a CSV of
/// rows and a JSON summary into `out_dir`.
///
/// Observer hooks cannot return errors, so write failures are logged and
/// stored; check [`take_error`][Self::take_error] after the run.
pub struct BenchmarkRecorder {
    name: String,
    out_dir: PathBuf,
    duration_steps: u64,
    started: Instant,
    rows: Vec<StepMetrics>,
    finished: bool,
    last_error: Option<crate::OutputError>,
}

impl BenchmarkRecorder {
    /// Start recording under algorithm `name`, reporting into `out_dir`.
    pub fn start(name: impl Into<String>, out_dir: impl Into<PathBuf>, duration_steps: u64) -> Self {
        let name = name.into();
        info!("starting {name} benchmark for {duration_steps} steps");
        Self {
            name,
            out_dir: out_dir.into(),
            duration_steps,
            started: Instant::now(),
            rows: Vec::new(),
            finished: false,
            last_error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The stored write error, if any hook failed.
    pub fn take_error(&mut self) -> Option<crate::OutputError> {
        self.last_error.take()
    }

    /// Recorded rows so far (mainly for tests).
    pub fn rows(&self) -> &[StepMetrics] {
        &self.rows
    }

    fn save(&mut self) -> OutputResult<()> {
        if self.rows.is_empty() {
            warn!("no benchmark metrics to save");
            return Ok(());
        }
        std::fs::create_dir_all(&self.out_dir)?;

        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let csv_path = self.out_dir.join(format!("benchmark_{}_{stamp}.csv", self.name));
        let json_path = self.out_dir.join(format!("summary_{}_{stamp}.json", self.name));

        report::write_csv(&csv_path, &self.rows)?;
        let summary = RunSummary::from_rows(&self.name, &self.rows);
        report::write_json(&json_path, &summary)?;

        info!(
            "benchmark results saved to {} and {}",
            csv_path.display(),
            json_path.display()
        );
        Ok(())
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.save() {
            warn!("failed to save benchmark results: {e}");
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
        info!("benchmark completed: {}", self.name);
    }

    /// Directory the reports land in.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl EngineObserver for BenchmarkRecorder {
    fn on_tick_end(&mut self, step: TimeStep, world: &World) {
        if self.finished {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        self.rows.push(StepMetrics::sample(world, step.0, elapsed));

        if step.0 >= self.duration_steps {
            self.finish();
        }
    }

    fn on_run_end(&mut self, _final_step: TimeStep) {
        self.finish();
    }
}
