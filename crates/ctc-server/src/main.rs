//! ctc-server — host binary for the cooperative traffic-control coordinator.
//!
//! Binds the simulator port, accepts one client, then drives the engine at a
//! soft 10 ms cadence: receive census → tick → send commands → sleep.  A
//! termination signal lets the in-flight tick finish but suppresses its
//! outbound bundle; any transport failure ends the session with a non-zero
//! exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};

use ctc_core::{EngineConfig, Timestamp};
use ctc_engine::{Algorithm, Engine, EngineObserver, NoopObserver};
use ctc_output::BenchmarkRecorder;
use ctc_transport::{CommandBundle, Session};

const LISTEN_ADDR: &str = "localhost:5555";
const TICK_CADENCE: Duration = Duration::from_millis(10);
const STATISTICS_DIR: &str = "statistics";

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum AlgorithmArg {
    /// The full platoon coordination pipeline.
    Custom,
    /// Pass-through baseline: echo the simulator's own speeds.
    Sumo,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Custom => Algorithm::Coordinated,
            AlgorithmArg::Sumo => Algorithm::Passthrough,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Cooperative traffic-control coordinator", version)]
struct Args {
    /// Record per-step metrics and write CSV/JSON reports.
    #[arg(long)]
    benchmark: bool,

    /// Traffic algorithm to use.
    #[arg(long, value_enum, default_value = "custom")]
    algorithm: AlgorithmArg,

    /// Benchmark duration in steps.
    #[arg(long, default_value_t = 1000)]
    duration: u64,
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            info!("shutdown signal received, finishing current tick");
            stop.store(true, Ordering::SeqCst);
        })
        .context("failed to install signal handler")?;
    }

    let algorithm_name = match args.algorithm {
        AlgorithmArg::Custom => "custom",
        AlgorithmArg::Sumo => "sumo",
    };
    let mut engine = Engine::new(EngineConfig::default(), args.algorithm.into());
    let mut observer: Box<dyn EngineObserver> = if args.benchmark {
        Box::new(BenchmarkRecorder::start(
            algorithm_name,
            STATISTICS_DIR,
            args.duration,
        ))
    } else {
        Box::new(NoopObserver)
    };

    let mut session =
        Session::accept(LISTEN_ADDR).with_context(|| format!("failed to listen on {LISTEN_ADDR}"))?;

    let clean = run_loop(&mut engine, &mut session, observer.as_mut(), &stop);
    observer.on_run_end(engine.step);

    match clean {
        Ok(()) => {
            info!("session closed after {} steps", engine.step);
            Ok(())
        }
        Err(e) => {
            error!("transport failure: {e}");
            Err(e.into())
        }
    }
}

/// The census/commands exchange.  Returns `Ok` only on signal shutdown.
fn run_loop(
    engine: &mut Engine,
    session: &mut Session,
    observer: &mut dyn EngineObserver,
    stop: &AtomicBool,
) -> Result<(), ctc_transport::TransportError> {
    let started = Instant::now();

    loop {
        if stop.load(Ordering::SeqCst) {
            return Ok(());
        }

        let census = session.receive_census()?;
        let now = Timestamp::from_elapsed(started.elapsed());

        observer.on_tick_start(engine.step.next());
        engine.tick(&census, now);
        observer.on_tick_end(engine.step, &engine.world);

        // A signal during the tick: the decision is complete but the
        // commands for it are not sent.
        if stop.load(Ordering::SeqCst) {
            return Ok(());
        }

        let bundle = CommandBundle::from_world(&engine.world, engine.step);
        session.send_commands(&bundle)?;

        std::thread::sleep(TICK_CADENCE);
    }
}
