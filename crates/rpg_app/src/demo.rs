//! The built-in demo world: two rooms joined by a corridor, a second scene
//! behind a region exit, and a hero that walks a precomputed path to it.

use rpg_component::{ObjectId, SceneId};
use rpg_dungeon::{Navigator, Terrain, Trigger};
use rpg_event::{InputEvent, PowerupEffect};
use rpg_math::{IVec2, IntRect, UVec2, cell_of};
use rpg_system::{MovementData, SimError, Simulation};
use tracing::{info, warn};

const TILE: UVec2 = UVec2::new(32, 32);
const MAX_EXPANSIONS: usize = 4096;

const HERO_START: IVec2 = IVec2::new(2, 4);
const EXIT: IVec2 = IVec2::new(13, 7);
const ARRIVAL: IVec2 = IVec2::new(2, 2);

/// Follows a fixed cell path by feeding one input per change of direction.
#[derive(Debug, Clone)]
pub struct Patrol {
    actor: ObjectId,
    scene: SceneId,
    path: Vec<IVec2>,
}

impl Patrol {
    #[must_use]
    pub fn new(actor: ObjectId, scene: SceneId, path: Vec<IVec2>) -> Self {
        Self { actor, scene, path }
    }

    /// Direction to step in once the current step is done. Zero at the end
    /// of the path or when the actor has left it.
    #[must_use]
    pub fn heading(&self, data: &MovementData) -> IVec2 {
        if data.scene != self.scene {
            return IVec2::ZERO;
        }
        let from = if data.is_moving() {
            data.target
        } else {
            cell_of(data.pos)
        };
        self.path
            .iter()
            .position(|cell| *cell == from)
            .and_then(|i| self.path.get(i + 1))
            .map_or(IVec2::ZERO, |next| *next - from)
    }

    pub fn steer(&self, sim: &mut Simulation) {
        let Some(data) = sim.movement().data().get(self.actor) else {
            return;
        };
        let (dir, current) = (self.heading(data), data.next_move);
        if dir != current {
            sim.send_input(InputEvent {
                actor: self.actor,
                move_dir: dir,
                look: IVec2::ZERO,
            });
        }
    }
}

#[derive(Debug)]
pub struct Demo {
    pub start: SceneId,
    pub vault: SceneId,
    pub hero: ObjectId,
    patrol: Option<Patrol>,
}

impl Demo {
    /// Queue the hero's input for the next frame.
    pub fn script(&self, sim: &mut Simulation) {
        if let Some(patrol) = &self.patrol {
            patrol.steer(sim);
        }
    }
}

/// Lay out the demo dungeons and spawn its actors.
///
/// # Errors
///
/// Fails if an actor or trigger lands outside the walkable area.
pub fn build(sim: &mut Simulation) -> Result<Demo, SimError> {
    let start = sim.create_dungeon(16, 10, TILE);
    let vault = sim.create_dungeon(6, 6, TILE);
    {
        let dungeons = sim.dungeons_mut();
        let hall = &mut dungeons[start];
        hall.fill(IntRect::new(1, 1, 6, 8), Terrain::Floor);
        hall.fill(IntRect::new(9, 1, 6, 8), Terrain::Floor);
        hall.fill(IntRect::new(7, 4, 2, 1), Terrain::Floor);
        hall.set_trigger(IVec2::new(4, 4), Trigger::powerup(PowerupEffect::SpeedBonus(1)))?;
        hall.set_trigger(IVec2::new(8, 4), Trigger::combat_gate(1))?;
        hall.set_trigger(IVec2::new(3, 2), Trigger::timed(7, 2_000))?;
        hall.set_trigger(EXIT, Trigger::region_exit(vault, ARRIVAL))?;
        dungeons[vault].fill(IntRect::new(1, 1, 4, 4), Terrain::Floor);
    }

    let hero = sim.spawn(sim.actor(start, HERO_START).with_look(IVec2::X))?;
    sim.spawn(sim.actor(start, IVec2::new(10, 2)).with_look(IVec2::NEG_X))?;
    let bolt = sim.spawn(sim.actor(start, IVec2::new(12, 2)).projectile())?;
    sim.apply_changes();
    sim.send_input(InputEvent {
        actor: bolt,
        move_dir: IVec2::X,
        look: IVec2::ZERO,
    });

    let hall = &sim.dungeons()[start];
    let patrol = match Navigator::new(hall).find_path(hall, HERO_START, EXIT, MAX_EXPANSIONS) {
        Some(path) => {
            info!(steps = path.len() - 1, "hero path planned");
            Some(Patrol::new(hero, start, path))
        }
        None => {
            warn!("no path to the exit; the hero stays put");
            None
        }
    };
    Ok(Demo {
        start,
        vault,
        hero,
        patrol,
    })
}
