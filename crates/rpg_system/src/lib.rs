//! # rpg_system
//!
//! The simulation subsystems and the frame driver that runs them.
//!
//! Each subsystem owns the component records it works on and talks to the
//! others only through `rpg_event` channels:
//!
//! 1. [`MovementSystem`] turns input into cell-to-cell steps.
//! 2. [`CollisionSystem`] sweeps every moved actor and reports the first
//!    wall or actor on its path.
//! 3. [`TriggerSystem`] runs the trigger of each cell an actor arrived on.
//! 4. [`FocusSystem`] keeps every observer focused on its nearest visible
//!    actor.
//!
//! [`Simulation`] wires them together and runs one frame per
//! [`Simulation::update`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rpg_dungeon::Terrain;
//! use rpg_event::InputEvent;
//! use rpg_math::{IVec2, IntRect, UVec2};
//! use rpg_system::{LogContext, SimConfig, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::default(), &LogContext::new("demo"));
//! let scene = sim.create_dungeon(16, 16, UVec2::new(32, 32));
//! sim.dungeons_mut()[scene].fill(IntRect::new(1, 1, 14, 14), Terrain::Floor);
//!
//! let hero = sim.spawn(sim.actor(scene, IVec2::new(2, 2))).unwrap();
//! sim.send_input(InputEvent { actor: hero, move_dir: IVec2::X, look: IVec2::ZERO });
//! for _ in 0..50 {
//!     sim.update(20);
//! }
//! ```

pub mod collision;
pub mod components;
pub mod config;
pub mod context;
pub mod error;
pub mod focus;
pub mod log;
pub mod movement;
pub mod simulation;
pub mod trigger;

pub use collision::CollisionSystem;
pub use components::{CollisionData, FocusData, MovementData};
pub use config::{ConfigError, SimConfig};
pub use context::FrameContext;
pub use error::SimError;
pub use focus::FocusSystem;
pub use log::LogContext;
pub use movement::{
    MAX_COLLISION_RADIUS, MAX_FRAMETIME_MS, MAX_SPEED, MAX_STEP, MovementSystem, effective_speed,
};
pub use simulation::{ActorSpec, Simulation, Stage, StageProfile};
pub use trigger::TriggerSystem;
