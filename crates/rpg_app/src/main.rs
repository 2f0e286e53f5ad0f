//! # rpg_app: headless runner
//!
//! Runs the dungeon simulation without a window: builds the demo world,
//! drives it with a fixed-step tick loop and optionally saves snapshots in
//! the background.
//!
//! ## Startup Sequence
//!
//! 1. Initialise structured logging (`RUST_LOG` overrides `rpg_app=info`).
//! 2. Load and validate the simulation config (`--config`, JSON).
//! 3. Install a panic hook that appends to the crash log (`--crash-log`).
//! 4. Start the save worker if `--save-dir` is given.
//! 5. Run `--ticks` frames.

mod demo;
mod save;
mod tick;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rpg_system::{LogContext, SimConfig, Simulation};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use save::{FileSink, SaveWorker};
use tick::{TickConfig, TickLoop};

#[derive(Debug, Parser)]
#[command(name = "rpg_app", version, about = "Headless dungeon simulation")]
struct Args {
    /// JSON simulation config. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to run (0 = until interrupted).
    #[arg(long, default_value_t = 500)]
    ticks: u64,

    /// Directory for periodic world snapshots.
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// File that panics are appended to.
    #[arg(long)]
    crash_log: Option<PathBuf>,

    /// Pace frames to wall-clock time.
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rpg_app=info".parse()?))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    config.validate()?;

    let mut log = LogContext::new("rpg_app");
    if let Some(path) = &args.crash_log {
        log = log.with_crash_log(path.clone());
    }
    install_panic_hook(log.clone());

    info!(ticks = args.ticks, frametime_ms = config.frametime_ms, "dungeon simulation starting");

    let tick_config = TickConfig {
        frametime_ms: config.frametime_ms,
        max_ticks: args.ticks,
        save_interval: if args.save_dir.is_some() {
            config.save_interval_frames
        } else {
            0
        },
        realtime: args.realtime,
    };
    let mut sim = Simulation::new(config, &log);
    let demo = demo::build(&mut sim).context("failed to build the demo world")?;
    info!(start = %demo.start, vault = %demo.vault, "demo world built");

    let mut tick_loop = TickLoop::new(tick_config, sim);
    if let Some(dir) = &args.save_dir {
        let sink = FileSink::new(dir)?;
        info!(dir = %sink.dir().display(), "saving snapshots");
        tick_loop = tick_loop.with_saver(SaveWorker::spawn(sink)?);
    }

    tick_loop.run(|sim| demo.script(sim))?;

    let hero = tick_loop.simulation().movement().data().get(demo.hero).copied();
    if let Some(hero) = hero {
        info!(
            scene = %hero.scene,
            x = hero.pos.x,
            y = hero.pos.y,
            in_vault = hero.scene == demo.vault,
            "hero final position"
        );
    }
    let saved = tick_loop.finish();
    info!(saved, "dungeon simulation shut down");
    Ok(())
}

/// Log panics and append them to the crash log before the default hook runs.
fn install_panic_hook(log: LogContext) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!(%info, "simulation panicked");
        if let Err(err) = log.record_crash(&info.to_string()) {
            error!(%err, "failed to write crash log");
        }
        default_hook(info);
    }));
}
