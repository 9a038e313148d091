//! Scheduler sweep commands: a single pass, or a periodic watch loop.
//!
//! The watch loop is the cron-style trigger the engine itself does not
//! provide: it invokes `run_sweep(now)` on a fixed cadence. The engine
//! stays correct if several triggers overlap, so running `watch` alongside
//! an external scheduler is harmless.

use chrono::Utc;
use clap::Subcommand;
use nudgekeeper_core::storage::{Config, Database};
use nudgekeeper_core::sweep::run_sweep;
use tracing::info;

use super::resolve_now;

#[derive(Subcommand)]
pub enum SweepAction {
    /// Run one sweep pass now
    Run {
        /// Evaluate the sweep at this RFC3339 instant instead of now
        #[arg(long)]
        at: Option<String>,
        /// Max commitments examined this pass
        #[arg(long)]
        batch: Option<usize>,
    },
    /// Run sweeps periodically until interrupted
    Watch {
        /// Seconds between passes (default from config)
        #[arg(long)]
        interval: Option<u64>,
        /// Max commitments examined per pass
        #[arg(long)]
        batch: Option<usize>,
    },
}

pub fn run(action: SweepAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    match action {
        SweepAction::Run { at, batch } => {
            let db = Database::open()?;
            let now = resolve_now(at.as_deref())?;
            let batch = batch.unwrap_or(config.sweep.batch_size);
            let outcome = run_sweep(&db, now, batch)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        SweepAction::Watch { interval, batch } => {
            init_tracing();
            let interval = interval.unwrap_or(config.sweep.interval_secs);
            let batch = batch.unwrap_or(config.sweep.batch_size);
            let db = Database::open()?;

            info!(interval_secs = interval, batch, "sweep watch started");
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async {
                let mut ticker =
                    tokio::time::interval(std::time::Duration::from_secs(interval.max(1)));
                loop {
                    ticker.tick().await;
                    match run_sweep(&db, Utc::now(), batch) {
                        Ok(outcome) => {
                            if outcome.processed > 0 {
                                println!(
                                    "sweep: processed={} sent={} errors={}",
                                    outcome.processed, outcome.sent, outcome.errors
                                );
                            }
                        }
                        // A failed pass is retried on the next tick.
                        Err(e) => eprintln!("sweep failed: {e}"),
                    }
                }
            })
        }
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
