//! The frame driver.
//!
//! [`Simulation`] owns the object ids, every dungeon and every subsystem, and
//! wires their event endpoints together once at construction. Each call to
//! [`Simulation::update`] runs the stages of one frame in [`Stage`] order and
//! propagates events between them, so every stage sees what the previous one
//! produced in the same frame.

use std::time::{Duration, Instant};

use rpg_component::{EnumIndex, EnumMap, IdManager, ObjectId, SceneId};
use rpg_dungeon::DungeonSystem;
use rpg_event::{
    AnimationEvent, CollisionEvent, EventListener, EventSender, FocusEvent, InputEvent, MoveEvent,
    TeleportEvent, TriggerEvent,
};
use rpg_math::{IVec2, UVec2, cell_center};
use tracing::{Span, debug, info, trace};

use crate::collision::CollisionSystem;
use crate::components::{CollisionData, FocusData, MovementData};
use crate::config::SimConfig;
use crate::context::FrameContext;
use crate::error::SimError;
use crate::focus::FocusSystem;
use crate::log::LogContext;
use crate::movement::{MAX_COLLISION_RADIUS, MovementSystem};
use crate::trigger::TriggerSystem;

/// The stages of one frame, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Apply queued spawns and dispatch input.
    Input,
    Movement,
    Collision,
    /// The movement system applies collision corrections.
    Resolve,
    Triggers,
    /// The movement system applies teleports and trigger effects.
    Teleport,
    Focus,
    /// Apply despawns queued during the frame.
    Cleanup,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Input,
        Stage::Movement,
        Stage::Collision,
        Stage::Resolve,
        Stage::Triggers,
        Stage::Teleport,
        Stage::Focus,
        Stage::Cleanup,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Movement => "movement",
            Stage::Collision => "collision",
            Stage::Resolve => "resolve",
            Stage::Triggers => "triggers",
            Stage::Teleport => "teleport",
            Stage::Focus => "focus",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl EnumIndex for Stage {
    const COUNT: usize = 8;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Wall-clock time spent in each stage of the last frame.
pub type StageProfile = EnumMap<Stage, Duration, { Stage::COUNT }>;

/// What to spawn and where. Start from [`Simulation::actor`] to pick up the
/// configured defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorSpec {
    pub scene: SceneId,
    pub cell: IVec2,
    pub look: IVec2,
    pub max_speed: f32,
    /// Collision radius, or `None` for actors that never collide.
    pub radius: Option<f32>,
    pub is_projectile: bool,
    /// View distance, or `None` for actors without focus tracking.
    pub sight: Option<f32>,
    pub fov: f32,
}

impl ActorSpec {
    #[must_use]
    pub fn new(scene: SceneId, cell: IVec2, config: &SimConfig) -> Self {
        Self {
            scene,
            cell,
            look: IVec2::new(0, 1),
            max_speed: config.default_speed,
            radius: Some(config.default_radius),
            is_projectile: false,
            sight: Some(config.default_sight),
            fov: config.default_fov,
        }
    }

    #[must_use]
    pub fn with_look(mut self, look: IVec2) -> Self {
        self.look = look;
        self
    }

    #[must_use]
    pub fn with_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    #[must_use]
    pub fn without_collision(mut self) -> Self {
        self.radius = None;
        self
    }

    /// A projectile: despawned on its first collision, never focused on.
    #[must_use]
    pub fn projectile(mut self) -> Self {
        self.is_projectile = true;
        self.sight = None;
        self
    }

    #[must_use]
    pub fn with_sight(mut self, sight: f32) -> Self {
        self.sight = Some(sight);
        self
    }

    #[must_use]
    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    #[must_use]
    pub fn without_focus(mut self) -> Self {
        self.sight = None;
        self
    }
}

/// The dungeons, the subsystems and the wiring between them.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    ids: IdManager,
    dungeons: DungeonSystem,
    movement: MovementSystem,
    collision: CollisionSystem,
    focus: FocusSystem,
    triggers: TriggerSystem,
    input: EventSender<InputEvent>,
    /// Collisions seen by the driver, for removing projectiles.
    impacts: EventListener<CollisionEvent>,
    despawns: Vec<ObjectId>,
    frame: u64,
    profile: StageProfile,
    span: Span,
}

impl Simulation {
    /// An empty world with every subsystem wired up.
    #[must_use]
    pub fn new(config: SimConfig, log: &LogContext) -> Self {
        let mut movement = MovementSystem::new(log);
        let mut collision = CollisionSystem::new(log);
        let focus = FocusSystem::new(log);
        let mut triggers = TriggerSystem::new(log);

        let mut input = EventSender::new();
        input.bind(movement.input_listener());
        collision.bind(movement.collision_listener());
        let mut impacts = EventListener::new();
        collision.bind(&mut impacts);
        movement.bind_moves(triggers.move_listener());
        triggers.bind_teleports(movement.teleport_listener());
        triggers.bind_outcomes(movement.outcome_listener());

        info!(
            frametime_ms = config.frametime_ms,
            save_interval = config.save_interval_frames,
            "simulation created"
        );
        Self {
            config,
            ids: IdManager::new(),
            dungeons: DungeonSystem::new(),
            movement,
            collision,
            focus,
            triggers,
            input,
            impacts,
            despawns: Vec::new(),
            frame: 0,
            profile: StageProfile::new(),
            span: log.child("simulation"),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of frames simulated so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of live actors, including queued spawns.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.ids.has(id)
    }

    #[must_use]
    pub fn dungeons(&self) -> &DungeonSystem {
        &self.dungeons
    }

    pub fn dungeons_mut(&mut self) -> &mut DungeonSystem {
        &mut self.dungeons
    }

    /// Add an empty dungeon with no walkable cells and return its scene id.
    pub fn create_dungeon(&mut self, width: u32, height: u32, tile_size: UVec2) -> SceneId {
        self.dungeons.create(width, height, tile_size)
    }

    #[must_use]
    pub fn movement(&self) -> &MovementSystem {
        &self.movement
    }

    #[must_use]
    pub fn collision(&self) -> &CollisionSystem {
        &self.collision
    }

    #[must_use]
    pub fn focus(&self) -> &FocusSystem {
        &self.focus
    }

    /// Stage timings of the last frame.
    #[must_use]
    pub fn profile(&self) -> &StageProfile {
        &self.profile
    }

    /// A spawn description for `cell` in `scene` with the configured defaults.
    #[must_use]
    pub fn actor(&self, scene: SceneId, cell: IVec2) -> ActorSpec {
        ActorSpec::new(scene, cell, &self.config)
    }

    /// Allocate an id and queue its components. They take part from the
    /// next frame on.
    ///
    /// # Errors
    ///
    /// Fails if the scene does not exist or the cell is outside it or not
    /// walkable.
    pub fn spawn(&mut self, spec: ActorSpec) -> Result<ObjectId, SimError> {
        let dungeon = self
            .dungeons
            .get(spec.scene)
            .ok_or(SimError::UnknownScene(spec.scene))?;
        dungeon.grid().get(spec.cell)?;
        if !dungeon.is_walkable(spec.cell) {
            return Err(SimError::Blocked(spec.cell));
        }

        let id = self.ids.acquire();
        let pos = cell_center(spec.cell);
        self.movement.queue_acquire(
            id,
            MovementData {
                id,
                pos,
                last_pos: pos,
                scene: spec.scene,
                max_speed: spec.max_speed,
                target: spec.cell,
                origin: spec.cell,
                look: spec.look,
                ..MovementData::default()
            },
        );
        if let Some(radius) = spec.radius {
            self.collision.queue_acquire(
                id,
                CollisionData {
                    id,
                    radius: radius.clamp(0.0, MAX_COLLISION_RADIUS),
                    is_projectile: spec.is_projectile,
                },
            );
        }
        if let Some(sight) = spec.sight {
            self.focus.queue_acquire(
                id,
                FocusData {
                    id,
                    sight,
                    fov: spec.fov,
                    is_active: true,
                    ..FocusData::default()
                },
            );
        }
        debug!(actor = %id, scene = %spec.scene, cell = ?spec.cell, "actor spawned");
        Ok(id)
    }

    /// Queue `id` for removal at the end of the current (or next) frame.
    /// Returns `false` if it is not alive or already queued.
    pub fn despawn(&mut self, id: ObjectId) -> bool {
        if !self.ids.has(id) || self.despawns.contains(&id) {
            return false;
        }
        self.despawns.push(id);
        true
    }

    /// Queue an input event for the next frame.
    pub fn send_input(&mut self, event: InputEvent) {
        self.input.send(event);
    }

    /// Receive step start and arrival events.
    pub fn bind_moves(&mut self, listener: &mut EventListener<MoveEvent>) {
        self.movement.bind_moves(listener);
    }

    /// Receive animation changes.
    pub fn bind_animations(&mut self, listener: &mut EventListener<AnimationEvent>) {
        self.movement.bind_animations(listener);
    }

    /// Receive collision events.
    pub fn bind_collisions(&mut self, listener: &mut EventListener<CollisionEvent>) {
        self.collision.bind(listener);
    }

    /// Receive focus changes.
    pub fn bind_focus(&mut self, listener: &mut EventListener<FocusEvent>) {
        self.focus.bind(listener);
    }

    /// Receive teleports.
    pub fn bind_teleports(&mut self, listener: &mut EventListener<TeleportEvent>) {
        self.triggers.bind_teleports(listener);
    }

    /// Receive trigger outcomes.
    pub fn bind_outcomes(&mut self, listener: &mut EventListener<TriggerEvent>) {
        self.triggers.bind_outcomes(listener);
    }

    /// Apply queued spawns and despawns now.
    pub fn apply_changes(&mut self) {
        self.movement.apply_changes(&mut self.dungeons);
        self.collision.apply_changes();
        self.focus.apply_changes();
        if self.despawns.is_empty() {
            return;
        }
        for id in std::mem::take(&mut self.despawns) {
            self.movement.queue_release(id);
            self.collision.queue_release(id);
            self.focus.queue_release(id);
            self.ids.release(id);
            debug!(actor = %id, "actor despawned");
        }
        self.movement.apply_changes(&mut self.dungeons);
        self.collision.apply_changes();
        self.focus.apply_changes();
    }

    /// Simulate one frame of `elapsed_ms` (clamped to the maximum frame
    /// time).
    pub fn update(&mut self, elapsed_ms: u32) -> FrameContext {
        let _span = self.span.clone().entered();
        let ctx = FrameContext::new(self.frame, elapsed_ms);
        let mut clock = Instant::now();
        let mut lap = |profile: &mut StageProfile, stage: Stage| {
            let now = Instant::now();
            profile[stage] = now - clock;
            clock = now;
        };

        self.apply_changes();
        self.input.propagate();
        self.movement.handle_input();
        lap(&mut self.profile, Stage::Input);

        self.movement.update(&ctx, &mut self.dungeons);
        lap(&mut self.profile, Stage::Movement);

        self.collision.update(self.movement.data(), &self.dungeons);
        self.collision.propagate();
        lap(&mut self.profile, Stage::Collision);

        self.movement.handle_collisions(&mut self.dungeons);
        self.reap_projectiles();
        lap(&mut self.profile, Stage::Resolve);

        self.movement.propagate();
        self.triggers.update(&ctx, self.movement.data(), &mut self.dungeons);
        self.triggers.propagate();
        lap(&mut self.profile, Stage::Triggers);

        self.movement.handle_teleports(&mut self.dungeons);
        lap(&mut self.profile, Stage::Teleport);

        self.focus.update(self.movement.data(), self.collision.data(), &self.dungeons);
        self.focus.propagate();
        self.movement.propagate();
        lap(&mut self.profile, Stage::Focus);

        self.apply_changes();
        lap(&mut self.profile, Stage::Cleanup);

        trace!(frame = ctx.frame, elapsed_ms = ctx.elapsed_ms, "frame done");
        self.frame += 1;
        ctx
    }

    fn reap_projectiles(&mut self) {
        for event in self.impacts.drain() {
            let is_projectile = self
                .collision
                .data()
                .get(event.actor)
                .is_some_and(|shape| shape.is_projectile);
            if is_projectile {
                self.despawn(event.actor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpg_dungeon::{Terrain, Trigger};
    use rpg_event::{PowerupEffect, TriggerOutcome};
    use rpg_math::{IntRect, Vec2};

    const TILE: UVec2 = UVec2::new(16, 16);

    fn simulation() -> (Simulation, SceneId) {
        let mut sim = Simulation::new(SimConfig::default(), &LogContext::default());
        let scene = sim.create_dungeon(8, 3, TILE);
        sim.dungeons_mut()[scene].fill(IntRect::new(0, 0, 8, 3), Terrain::Floor);
        (sim, scene)
    }

    fn walk(sim: &mut Simulation, actor: ObjectId, dir: IVec2) {
        sim.send_input(InputEvent {
            actor,
            move_dir: dir,
            look: IVec2::ZERO,
        });
    }

    #[test]
    fn test_stage_profile_covers_every_stage() {
        let (mut sim, _) = simulation();
        sim.update(20);
        let stages: Vec<Stage> = sim.profile().keys().collect();
        assert_eq!(stages, Stage::ALL.to_vec());
        assert_eq!(sim.frame(), 1);
    }

    #[test]
    fn test_spawn_rejects_bad_places() {
        let (mut sim, scene) = simulation();
        sim.dungeons_mut()[scene].set_terrain(IVec2::new(2, 2), Terrain::Wall).unwrap();
        assert_eq!(
            sim.spawn(sim.actor(SceneId(9), IVec2::ZERO)),
            Err(SimError::UnknownScene(SceneId(9)))
        );
        assert!(matches!(
            sim.spawn(sim.actor(scene, IVec2::new(8, 0))),
            Err(SimError::Scene(_))
        ));
        assert_eq!(
            sim.spawn(sim.actor(scene, IVec2::new(2, 2))),
            Err(SimError::Blocked(IVec2::new(2, 2)))
        );
        assert_eq!(sim.actor_count(), 0);
    }

    #[test]
    fn test_spawned_components_appear_next_frame() {
        let (mut sim, scene) = simulation();
        let id = sim.spawn(sim.actor(scene, IVec2::new(1, 1)).without_focus()).unwrap();
        assert!(!sim.movement().data().has(id));
        sim.update(20);
        assert!(sim.movement().data().has(id));
        assert!(sim.collision().data().has(id));
        assert!(!sim.focus().data().has(id));
        assert_eq!(sim.dungeons()[scene].entities_at(IVec2::new(1, 1)).unwrap(), &[id]);
    }

    #[test]
    fn test_despawn_releases_everything() {
        let (mut sim, scene) = simulation();
        let id = sim.spawn(sim.actor(scene, IVec2::new(1, 1))).unwrap();
        sim.update(20);
        assert!(sim.despawn(id));
        assert!(!sim.despawn(id));
        sim.update(20);
        assert!(!sim.is_alive(id));
        assert!(!sim.movement().data().has(id));
        assert!(!sim.focus().data().has(id));
        assert!(sim.dungeons()[scene].entities_at(IVec2::new(1, 1)).unwrap().is_empty());
        assert!(!sim.despawn(id));
    }

    #[test]
    fn test_fast_actor_stops_at_wall() {
        let (mut sim, scene) = simulation();
        sim.dungeons_mut()[scene].set_terrain(IVec2::new(4, 1), Terrain::Wall).unwrap();
        let id = sim
            .spawn(sim.actor(scene, IVec2::new(1, 1)).with_speed(1_000.0))
            .unwrap();
        let mut collisions = EventListener::new();
        sim.bind_collisions(&mut collisions);

        sim.apply_changes();
        walk(&mut sim, id, IVec2::X);
        for _ in 0..10 {
            // far longer than a frame may last
            sim.update(1_000);
            assert!(sim.movement().data()[id].pos.x < 4.0);
        }
        let data = sim.movement().data()[id];
        assert_eq!(data.pos, Vec2::new(3.5, 1.5));
        assert!(!data.is_moving());

        let hits = collisions.drain();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].collider, ObjectId::INVALID);
        assert_eq!(hits[0].pos, IVec2::new(4, 1));
    }

    #[test]
    fn test_head_on_actors_stay_apart() {
        let (mut sim, scene) = simulation();
        let a = sim.spawn(sim.actor(scene, IVec2::new(1, 1))).unwrap();
        let b = sim.spawn(sim.actor(scene, IVec2::new(3, 1))).unwrap();
        sim.apply_changes();
        walk(&mut sim, a, IVec2::X);
        walk(&mut sim, b, IVec2::NEG_X);

        let contact = 2.0 * sim.config().default_radius;
        for _ in 0..40 {
            sim.update(20);
            let (pa, pb) = (sim.movement().data()[a].pos, sim.movement().data()[b].pos);
            assert!(pa.distance(pb) >= contact - 1e-4, "a={pa} b={pb}");
        }
        assert_eq!(sim.movement().data()[a].pos, Vec2::new(1.5, 1.5));
        assert_eq!(sim.movement().data()[b].pos, Vec2::new(3.5, 1.5));
        assert!(!sim.movement().data()[a].is_moving());
        assert!(!sim.movement().data()[b].is_moving());
    }

    #[test]
    fn test_observers_ignore_projectiles() {
        let (mut sim, scene) = simulation();
        let observer = sim
            .spawn(sim.actor(scene, IVec2::new(1, 1)).with_look(IVec2::X))
            .unwrap();
        sim.spawn(sim.actor(scene, IVec2::new(3, 1)).projectile()).unwrap();
        sim.update(20);
        assert_eq!(sim.focus().data()[observer].focus, ObjectId::INVALID);
    }

    #[test]
    fn test_focus_after_spawn() {
        let (mut sim, scene) = simulation();
        let observer = sim
            .spawn(sim.actor(scene, IVec2::new(1, 1)).with_look(IVec2::X))
            .unwrap();
        let target = sim
            .spawn(sim.actor(scene, IVec2::new(4, 1)).without_focus())
            .unwrap();
        let mut focus = EventListener::new();
        sim.bind_focus(&mut focus);

        sim.update(20);
        assert_eq!(
            focus.drain(),
            vec![FocusEvent {
                observer,
                previous: ObjectId::INVALID,
                focus: target
            }]
        );
        sim.update(20);
        assert!(focus.drain().is_empty());
    }

    #[test]
    fn test_region_exit_teleports_actor() {
        let (mut sim, first) = simulation();
        let second = sim.create_dungeon(4, 4, TILE);
        sim.dungeons_mut()[second].fill(IntRect::new(1, 1, 2, 2), Terrain::Floor);
        sim.dungeons_mut()[first]
            .set_trigger(IVec2::new(3, 1), Trigger::region_exit(second, IVec2::new(2, 2)))
            .unwrap();
        let id = sim.spawn(sim.actor(first, IVec2::new(1, 1))).unwrap();
        let mut teleports = EventListener::new();
        sim.bind_teleports(&mut teleports);

        sim.apply_changes();
        walk(&mut sim, id, IVec2::X);
        for _ in 0..60 {
            sim.update(20);
        }

        let data = sim.movement().data()[id];
        assert_eq!(data.scene, second);
        assert_eq!(data.pos, Vec2::new(2.5, 2.5));
        assert!(!data.is_moving());
        assert_eq!(teleports.drain().len(), 1);
        assert_eq!(sim.dungeons()[second].entities_at(IVec2::new(2, 2)).unwrap(), &[id]);
        assert!(sim.dungeons()[first].entities_in(IntRect::new(0, 0, 8, 3)).is_empty());
    }

    #[test]
    fn test_speed_powerup_is_applied_once() {
        let (mut sim, scene) = simulation();
        let cell = IVec2::new(2, 1);
        sim.dungeons_mut()[scene]
            .set_trigger(cell, Trigger::powerup(PowerupEffect::SpeedBonus(1)))
            .unwrap();
        let id = sim.spawn(sim.actor(scene, IVec2::new(1, 1))).unwrap();
        let mut outcomes = EventListener::new();
        sim.bind_outcomes(&mut outcomes);

        sim.apply_changes();
        walk(&mut sim, id, IVec2::X);
        sim.update(20);
        walk(&mut sim, id, IVec2::ZERO);
        for _ in 0..30 {
            sim.update(20);
        }

        let data = sim.movement().data()[id];
        assert_eq!(data.pos, Vec2::new(2.5, 1.5));
        assert_eq!(data.num_speed_boni, 1);
        let events = outcomes.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].outcome,
            TriggerOutcome::Powerup(PowerupEffect::SpeedBonus(1))
        );
        assert!(sim.dungeons()[scene].grid().get(cell).unwrap().trigger.is_none());
    }

    #[test]
    fn test_projectile_despawns_on_impact() {
        let (mut sim, scene) = simulation();
        sim.dungeons_mut()[scene].set_terrain(IVec2::new(3, 1), Terrain::Wall).unwrap();
        let bolt = sim
            .spawn(sim.actor(scene, IVec2::new(1, 1)).projectile())
            .unwrap();
        sim.apply_changes();
        walk(&mut sim, bolt, IVec2::X);
        for _ in 0..40 {
            sim.update(20);
        }
        assert!(!sim.is_alive(bolt));
        assert_eq!(sim.actor_count(), 0);
        assert!(sim.dungeons()[scene].entities_in(IntRect::new(0, 0, 8, 3)).is_empty());
    }
}
