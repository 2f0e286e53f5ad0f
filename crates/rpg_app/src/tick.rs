//! Fixed-step tick loop.
//!
//! Each tick:
//!
//! 1. Lets the driver script queue input for the frame.
//! 2. Runs one [`Simulation::update`] of the configured frame time.
//! 3. Every `save_interval` ticks, submits a snapshot to the save worker.
//! 4. Sleeps out the rest of the frame budget when running in real time.

use std::time::{Duration, Instant};

use rpg_system::{FrameContext, Simulation};
use tracing::{debug, info, trace, warn};

use crate::save::{SaveError, SaveWorker, WorldSnapshot};

#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Simulated milliseconds per tick.
    pub frametime_ms: u32,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Ticks between snapshots (0 = never).
    pub save_interval: u64,
    /// Sleep to keep ticks at wall-clock pace.
    pub realtime: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            frametime_ms: 20,
            max_ticks: 0,
            save_interval: 0,
            realtime: false,
        }
    }
}

#[derive(Debug)]
pub struct TickLoop {
    config: TickConfig,
    sim: Simulation,
    saver: Option<SaveWorker>,
    ticks: u64,
}

impl TickLoop {
    #[must_use]
    pub fn new(config: TickConfig, sim: Simulation) -> Self {
        Self {
            config,
            sim,
            saver: None,
            ticks: 0,
        }
    }

    #[must_use]
    pub fn with_saver(mut self, saver: SaveWorker) -> Self {
        self.saver = Some(saver);
        self
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Closed`] if a snapshot is due and the save worker
    /// has gone away.
    pub fn tick(&mut self) -> Result<FrameContext, SaveError> {
        let ctx = self.sim.update(self.config.frametime_ms);
        self.ticks += 1;

        for (stage, time) in self.sim.profile().iter() {
            trace!(
                frame = ctx.frame,
                stage = stage.name(),
                micros = time.as_micros() as u64,
                "stage time"
            );
        }

        let interval = self.config.save_interval;
        if interval > 0
            && self.ticks % interval == 0
            && let Some(saver) = &self.saver
        {
            saver.submit(WorldSnapshot::capture(&self.sim))?;
            debug!(frame = ctx.frame, "snapshot submitted");
        }
        Ok(ctx)
    }

    /// Run until the configured number of ticks, calling `script` before
    /// every frame.
    ///
    /// # Errors
    ///
    /// Stops at the first failing [`TickLoop::tick`].
    pub fn run(&mut self, mut script: impl FnMut(&mut Simulation)) -> Result<(), SaveError> {
        let budget = Duration::from_millis(u64::from(self.config.frametime_ms));
        info!(
            frametime_ms = self.config.frametime_ms,
            max_ticks = self.config.max_ticks,
            realtime = self.config.realtime,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            script(&mut self.sim);
            let ctx = self.tick()?;

            if self.config.max_ticks > 0 && self.ticks >= self.config.max_ticks {
                info!(ticks = self.ticks, actors = self.sim.actor_count(), "tick loop complete");
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed > budget {
                warn!(
                    frame = ctx.frame,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = budget.as_millis() as u64,
                    "tick exceeded time budget"
                );
            } else if self.config.realtime {
                std::thread::sleep(budget - elapsed);
            }
        }
    }

    /// Stop the save worker, if any, and return the number of snapshots it
    /// saved.
    pub fn finish(self) -> usize {
        self.saver.map_or(0, SaveWorker::shutdown)
    }
}
