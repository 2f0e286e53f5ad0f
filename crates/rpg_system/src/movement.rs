//! Grid-locked actor movement.
//!
//! Actors walk from cell centre to cell centre along compass vectors. A step
//! starts when an idle actor has a pending move, and ends when the actor
//! reaches the centre of its target cell, where the pending move (if any)
//! starts the next step. Distance left over at the centre is spent on the
//! next step, so an actor covers `speed * dt` every frame it keeps walking.
//!
//! The movement system is the only writer of [`MovementData`] positions.
//! Collision and teleport corrections reach it as events.

use std::collections::HashMap;

use rpg_component::{ChangeBuffer, ComponentManager, ObjectId, SceneId};
use rpg_dungeon::DungeonSystem;
use rpg_event::{
    AnimationAction, AnimationEvent, CollisionEvent, EventHandler, EventListener, EventSender,
    InputEvent, MoveEvent, MoveKind, PowerupEffect, TeleportEvent, TriggerEvent, TriggerOutcome,
};
use rpg_math::{IVec2, cell_center, cell_of, fix_direction};
use tracing::{Span, debug, warn};

use crate::components::MovementData;
use crate::context::FrameContext;
use crate::log::LogContext;

/// Largest collision radius, in cells.
pub const MAX_COLLISION_RADIUS: f32 = 0.5;

/// Longest frame the simulation advances in one update.
pub const MAX_FRAMETIME_MS: u32 = 40;

/// Fastest an actor may move, in cells per second.
pub const MAX_SPEED: f32 = 2.0 * MAX_COLLISION_RADIUS * 1000.0 / MAX_FRAMETIME_MS as f32;

/// Longest distance an actor moves in one frame, in cells.
pub const MAX_STEP: f32 = 2.0 * MAX_COLLISION_RADIUS;

const SPEED_BONUS_FACTOR: f32 = 0.25;

// No actor may pass a whole cell in one frame, or the collision sweep could
// skip a wall.
const _: () = assert!(MAX_SPEED * MAX_FRAMETIME_MS as f32 <= 1000.0 * 2.0 * MAX_COLLISION_RADIUS);

/// Current speed of an actor in cells per second, after speed bonuses and
/// clamping to `[0, MAX_SPEED]`.
#[must_use]
pub fn effective_speed(data: &MovementData) -> f32 {
    let speed = data.max_speed * (1.0 + SPEED_BONUS_FACTOR * data.num_speed_boni as f32);
    if speed.is_nan() {
        return 0.0;
    }
    speed.clamp(0.0, MAX_SPEED)
}

/// Owns the movement records and the cell occupancy of every actor.
#[derive(Debug)]
pub struct MovementSystem {
    data: ComponentManager<MovementData>,
    changes: ChangeBuffer<MovementData>,
    /// Cell each actor is registered in, per scene.
    placed: HashMap<ObjectId, (SceneId, IVec2)>,
    inputs: EventListener<InputEvent>,
    collisions: EventListener<CollisionEvent>,
    teleports: EventListener<TeleportEvent>,
    outcomes: EventListener<TriggerEvent>,
    moves: EventSender<MoveEvent>,
    animations: EventSender<AnimationEvent>,
    span: Span,
}

impl MovementSystem {
    /// An empty system logging under a `movement` span.
    #[must_use]
    pub fn new(log: &LogContext) -> Self {
        Self {
            data: ComponentManager::new(),
            changes: ChangeBuffer::new(),
            placed: HashMap::new(),
            inputs: EventListener::new(),
            collisions: EventListener::new(),
            teleports: EventListener::new(),
            outcomes: EventListener::new(),
            moves: EventSender::new(),
            animations: EventSender::new(),
            span: log.child("movement"),
        }
    }

    /// Movement records by actor.
    #[must_use]
    pub fn data(&self) -> &ComponentManager<MovementData> {
        &self.data
    }

    /// Mutable movement records. Positions changed here are re-registered
    /// at the next update.
    pub fn data_mut(&mut self) -> &mut ComponentManager<MovementData> {
        &mut self.data
    }

    /// Attach a record to `id` at the next [`apply_changes`](Self::apply_changes).
    pub fn queue_acquire(&mut self, id: ObjectId, record: MovementData) {
        self.changes.acquire(id, record);
    }

    /// Detach the record of `id` at the next apply. Ignored if `id` has none.
    pub fn queue_release(&mut self, id: ObjectId) {
        if self.data.has(id) {
            self.changes.release(id);
        }
    }

    /// Apply queued acquires and releases and update cell occupancy.
    pub fn apply_changes(&mut self, dungeons: &mut DungeonSystem) {
        if self.changes.is_empty() {
            return;
        }
        self.changes.apply(&mut self.data);
        let data = &self.data;
        self.placed.retain(|id, (scene, cell)| {
            if data.has(*id) {
                return true;
            }
            if let Some(dungeon) = dungeons.get_mut(*scene) {
                let _ = dungeon.remove(*id, *cell);
            }
            false
        });
        self.sync_occupancy(dungeons);
    }

    /// Inbox for input events.
    pub fn input_listener(&mut self) -> &mut EventListener<InputEvent> {
        &mut self.inputs
    }

    /// Inbox for collision events.
    pub fn collision_listener(&mut self) -> &mut EventListener<CollisionEvent> {
        &mut self.collisions
    }

    /// Inbox for teleport events.
    pub fn teleport_listener(&mut self) -> &mut EventListener<TeleportEvent> {
        &mut self.teleports
    }

    /// Inbox for trigger outcomes.
    pub fn outcome_listener(&mut self) -> &mut EventListener<TriggerEvent> {
        &mut self.outcomes
    }

    /// Deliver step start and arrival events to `listener`.
    pub fn bind_moves(&mut self, listener: &mut EventListener<MoveEvent>) {
        self.moves.bind(listener);
    }

    /// Deliver animation changes to `listener`.
    pub fn bind_animations(&mut self, listener: &mut EventListener<AnimationEvent>) {
        self.animations.bind(listener);
    }

    /// Deliver the move and animation events sent so far.
    pub fn propagate(&mut self) -> usize {
        self.moves.propagate() + self.animations.propagate()
    }

    /// Apply the queued input events.
    pub fn handle_input(&mut self) {
        let _span = self.span.clone().entered();
        for event in self.inputs.drain() {
            EventHandler::<InputEvent>::handle(self, &event);
        }
    }

    /// Move colliding actors back and stop them.
    pub fn handle_collisions(&mut self, dungeons: &mut DungeonSystem) {
        let _span = self.span.clone().entered();
        for event in self.collisions.drain() {
            EventHandler::<CollisionEvent>::handle(self, &event);
        }
        self.sync_occupancy(dungeons);
    }

    /// Apply teleports and trigger effects.
    pub fn handle_teleports(&mut self, dungeons: &mut DungeonSystem) {
        let _span = self.span.clone().entered();
        for event in self.outcomes.drain() {
            EventHandler::<TriggerEvent>::handle(self, &event);
        }
        for event in self.teleports.drain() {
            EventHandler::<TeleportEvent>::handle(self, &event);
        }
        self.sync_occupancy(dungeons);
    }

    /// Advance every moving actor by one frame.
    pub fn update(&mut self, ctx: &FrameContext, dungeons: &mut DungeonSystem) {
        let _span = self.span.clone().entered();
        let dt = ctx.dt();
        for (id, data) in self.data.iter_mut() {
            data.last_pos = data.pos;
            data.has_changed = false;
            data.origin = if data.is_moving() {
                data.target - data.move_dir
            } else {
                cell_of(data.pos)
            };

            if !data.is_moving() {
                if data.next_move == IVec2::ZERO {
                    continue;
                }
                start_step(id, data, &mut self.moves);
                self.animations.send(AnimationEvent {
                    actor: id,
                    action: AnimationAction::Walk,
                });
            }

            let step = (effective_speed(data) * dt).min(MAX_STEP);
            if step <= 0.0 {
                continue;
            }
            let goal = cell_center(data.target);
            let to_goal = goal - data.pos;
            let distance = to_goal.length();
            if distance <= step {
                data.pos = goal;
                self.moves.send(MoveEvent {
                    actor: id,
                    scene: data.scene,
                    source: data.target - data.move_dir,
                    target: data.target,
                    kind: MoveKind::Reached,
                });
                if data.next_move == IVec2::ZERO {
                    data.move_dir = IVec2::ZERO;
                    self.animations.send(AnimationEvent {
                        actor: id,
                        action: AnimationAction::Idle,
                    });
                } else {
                    start_step(id, data, &mut self.moves);
                    let leftover = step - distance;
                    if leftover > 0.0 {
                        let ahead = cell_center(data.target) - data.pos;
                        data.pos += ahead.normalize_or_zero() * leftover.min(ahead.length());
                    }
                }
            } else {
                data.pos += to_goal / distance * step;
            }
            data.has_changed = data.pos != data.last_pos;
        }
        self.sync_occupancy(dungeons);
    }

    /// Re-register every actor whose scene or cell changed.
    fn sync_occupancy(&mut self, dungeons: &mut DungeonSystem) {
        for (id, data) in self.data.iter() {
            let want = (data.scene, cell_of(data.pos));
            let have = self.placed.get(&id).copied();
            if have == Some(want) {
                continue;
            }
            if let Some((scene, cell)) = have
                && let Some(dungeon) = dungeons.get_mut(scene)
            {
                let _ = dungeon.remove(id, cell);
            }
            match dungeons.get_mut(want.0).map(|dungeon| dungeon.place(id, want.1)) {
                Some(Ok(())) => {
                    self.placed.insert(id, want);
                }
                Some(Err(err)) => {
                    warn!(actor = %id, %err, "actor is outside its scene");
                    self.placed.remove(&id);
                }
                None => {
                    warn!(actor = %id, scene = %want.0, "actor is in an unknown scene");
                    self.placed.remove(&id);
                }
            }
        }
    }
}

fn start_step(id: ObjectId, data: &mut MovementData, moves: &mut EventSender<MoveEvent>) {
    let source = cell_of(data.pos);
    data.move_dir = data.next_move;
    data.target = source + data.move_dir;
    moves.send(MoveEvent {
        actor: id,
        scene: data.scene,
        source,
        target: data.target,
        kind: MoveKind::Left,
    });
}

impl EventHandler<InputEvent> for MovementSystem {
    fn handle(&mut self, event: &InputEvent) {
        let Some(data) = self.data.get_mut(event.actor) else {
            return;
        };
        let dir = fix_direction(event.move_dir.as_vec2());
        let look = fix_direction(event.look.as_vec2());
        data.next_move = dir;
        if look != IVec2::ZERO {
            data.look = look;
        } else if dir != IVec2::ZERO {
            data.look = dir;
        }
    }
}

impl EventHandler<CollisionEvent> for MovementSystem {
    fn handle(&mut self, event: &CollisionEvent) {
        let Some(data) = self.data.get_mut(event.actor) else {
            return;
        };
        data.pos = event.reset_to;
        data.has_changed = true;
        if event.interrupt {
            let was_moving = data.is_moving();
            data.move_dir = IVec2::ZERO;
            data.next_move = IVec2::ZERO;
            data.target = cell_of(event.reset_to);
            if was_moving {
                self.animations.send(AnimationEvent {
                    actor: event.actor,
                    action: AnimationAction::Idle,
                });
            }
        }
        debug!(actor = %event.actor, collider = %event.collider, pos = ?event.pos, "collision resolved");
    }
}

impl EventHandler<TeleportEvent> for MovementSystem {
    fn handle(&mut self, event: &TeleportEvent) {
        let Some(data) = self.data.get_mut(event.actor) else {
            return;
        };
        let was_moving = data.is_moving();
        data.scene = event.dst_scene;
        data.pos = cell_center(event.dst_pos);
        data.last_pos = data.pos;
        data.target = event.dst_pos;
        data.move_dir = IVec2::ZERO;
        data.next_move = IVec2::ZERO;
        data.has_changed = true;
        if was_moving {
            self.animations.send(AnimationEvent {
                actor: event.actor,
                action: AnimationAction::Idle,
            });
        }
        debug!(
            actor = %event.actor,
            from = %event.src_scene,
            to = %event.dst_scene,
            pos = ?event.dst_pos,
            "actor teleported"
        );
    }
}

impl EventHandler<TriggerEvent> for MovementSystem {
    fn handle(&mut self, event: &TriggerEvent) {
        if let TriggerOutcome::Powerup(PowerupEffect::SpeedBonus(bonus)) = event.outcome
            && let Some(data) = self.data.get_mut(event.actor)
        {
            data.num_speed_boni += bonus;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpg_dungeon::Terrain;
    use rpg_math::{IntRect, UVec2, Vec2};

    const ACTOR: ObjectId = ObjectId(1);

    fn setup() -> (MovementSystem, DungeonSystem, SceneId) {
        let mut dungeons = DungeonSystem::new();
        let scene = dungeons.create(8, 4, UVec2::new(16, 16));
        dungeons[scene].fill(IntRect::new(0, 0, 8, 4), Terrain::Floor);
        let mut movement = MovementSystem::new(&LogContext::default());
        movement.queue_acquire(
            ACTOR,
            MovementData {
                pos: cell_center(IVec2::new(1, 1)),
                scene,
                max_speed: 5.0,
                target: IVec2::new(1, 1),
                ..MovementData::default()
            },
        );
        movement.apply_changes(&mut dungeons);
        (movement, dungeons, scene)
    }

    fn walk(movement: &mut MovementSystem, dir: IVec2) {
        movement.handle(&InputEvent {
            actor: ACTOR,
            move_dir: dir,
            look: IVec2::ZERO,
        });
    }

    #[test]
    fn test_speed_constants() {
        assert_eq!(MAX_SPEED, 25.0);
        assert_eq!(MAX_STEP, 1.0);
    }

    #[test]
    fn test_effective_speed_bonus_and_clamp() {
        let mut data = MovementData {
            max_speed: 4.0,
            ..MovementData::default()
        };
        assert_eq!(effective_speed(&data), 4.0);
        data.num_speed_boni = 2;
        assert_eq!(effective_speed(&data), 6.0);
        data.num_speed_boni = -8;
        assert_eq!(effective_speed(&data), 0.0);
        data.max_speed = 1000.0;
        data.num_speed_boni = 0;
        assert_eq!(effective_speed(&data), MAX_SPEED);
    }

    #[test]
    fn test_acquire_registers_occupancy() {
        let (_, dungeons, scene) = setup();
        assert_eq!(dungeons[scene].entities_at(IVec2::new(1, 1)).unwrap(), &[ACTOR]);
    }

    #[test]
    fn test_step_to_next_cell() {
        let (mut movement, mut dungeons, scene) = setup();
        let mut moves = EventListener::new();
        let mut animations = EventListener::new();
        movement.bind_moves(&mut moves);
        movement.bind_animations(&mut animations);

        walk(&mut movement, IVec2::new(1, 0));
        walk(&mut movement, IVec2::ZERO);
        // the stop arrives before the step started, so nothing happens
        movement.update(&FrameContext::new(0, 20), &mut dungeons);
        assert!(!movement.data()[ACTOR].is_moving());

        walk(&mut movement, IVec2::new(1, 0));
        movement.update(&FrameContext::new(1, 20), &mut dungeons);
        let data = movement.data()[ACTOR];
        assert!(data.is_moving());
        assert!(data.has_changed);
        assert!((data.pos.x - 1.6).abs() < 1e-5);
        assert_eq!(data.target, IVec2::new(2, 1));

        walk(&mut movement, IVec2::ZERO);
        for frame in 2..20 {
            movement.update(&FrameContext::new(frame, 20), &mut dungeons);
        }
        let data = movement.data()[ACTOR];
        assert_eq!(data.pos, cell_center(IVec2::new(2, 1)));
        assert!(!data.is_moving());
        assert_eq!(dungeons[scene].entities_at(IVec2::new(2, 1)).unwrap(), &[ACTOR]);
        assert!(dungeons[scene].entities_at(IVec2::new(1, 1)).unwrap().is_empty());

        movement.propagate();
        let kinds: Vec<MoveKind> = moves.drain().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![MoveKind::Left, MoveKind::Reached]);
        let actions: Vec<AnimationAction> = animations.drain().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AnimationAction::Walk, AnimationAction::Idle]);
    }

    #[test]
    fn test_held_direction_keeps_walking() {
        let (mut movement, mut dungeons, _) = setup();
        walk(&mut movement, IVec2::new(1, 0));
        for frame in 0..25 {
            movement.update(&FrameContext::new(frame, 40), &mut dungeons);
        }
        let data = movement.data()[ACTOR];
        assert!(data.pos.x > 4.0);
        assert!(data.is_moving());
    }

    #[test]
    fn test_distance_covered_matches_speed() {
        let mut dungeons = DungeonSystem::new();
        let scene = dungeons.create(40, 3, UVec2::new(16, 16));
        dungeons[scene].fill(IntRect::new(0, 0, 40, 3), Terrain::Floor);
        let mut movement = MovementSystem::new(&LogContext::default());
        movement.queue_acquire(
            ACTOR,
            MovementData {
                pos: cell_center(IVec2::new(1, 1)),
                scene,
                // 0.06 cells a frame, so steps end mid-frame
                max_speed: 3.0,
                target: IVec2::new(1, 1),
                ..MovementData::default()
            },
        );
        movement.apply_changes(&mut dungeons);

        walk(&mut movement, IVec2::X);
        for frame in 0..500 {
            movement.update(&FrameContext::new(frame, 20), &mut dungeons);
        }
        let travelled = movement.data()[ACTOR].pos.x - 1.5;
        assert!((travelled - 30.0).abs() < 1e-2, "travelled {travelled}");
    }

    #[test]
    fn test_origin_is_the_step_source() {
        let (mut movement, mut dungeons, _) = setup();
        walk(&mut movement, IVec2::X);
        movement.update(&FrameContext::new(0, 20), &mut dungeons);
        assert_eq!(movement.data()[ACTOR].origin, IVec2::new(1, 1));
        for frame in 1..8 {
            movement.update(&FrameContext::new(frame, 20), &mut dungeons);
        }
        // past the border of (2, 1), still on the step from (1, 1)
        let data = movement.data()[ACTOR];
        assert_eq!(cell_of(data.pos), IVec2::new(2, 1));
        assert_eq!(data.origin, IVec2::new(1, 1));
    }

    #[test]
    fn test_step_never_exceeds_one_cell() {
        let (mut movement, mut dungeons, _) = setup();
        movement.data_mut()[ACTOR].max_speed = 10_000.0;
        walk(&mut movement, IVec2::new(1, 0));
        let mut previous = movement.data()[ACTOR].pos;
        for frame in 0..5 {
            movement.update(&FrameContext::new(frame, 1_000), &mut dungeons);
            let pos = movement.data()[ACTOR].pos;
            assert!(pos.distance(previous) <= MAX_STEP + 1e-5);
            previous = pos;
        }
    }

    #[test]
    fn test_collision_resets_and_stops() {
        let (mut movement, mut dungeons, scene) = setup();
        walk(&mut movement, IVec2::new(1, 0));
        movement.update(&FrameContext::new(0, 40), &mut dungeons);
        let mut collisions = EventSender::new();
        collisions.bind(movement.collision_listener());
        collisions.send(CollisionEvent {
            actor: ACTOR,
            collider: ObjectId::INVALID,
            pos: IVec2::new(2, 1),
            reset_to: cell_center(IVec2::new(1, 1)),
            interrupt: true,
        });
        collisions.propagate();
        movement.handle_collisions(&mut dungeons);

        let data = movement.data()[ACTOR];
        assert_eq!(data.pos, Vec2::new(1.5, 1.5));
        assert!(!data.is_moving());
        assert_eq!(data.next_move, IVec2::ZERO);
        assert_eq!(dungeons[scene].entities_at(IVec2::new(1, 1)).unwrap(), &[ACTOR]);
    }

    #[test]
    fn test_teleport_moves_between_scenes() {
        let (mut movement, mut dungeons, first) = setup();
        let second = dungeons.create(4, 4, UVec2::new(16, 16));
        dungeons[second].fill(IntRect::new(0, 0, 4, 4), Terrain::Floor);

        let mut teleports = EventSender::new();
        teleports.bind(movement.teleport_listener());
        teleports.send(TeleportEvent {
            actor: ACTOR,
            src_scene: first,
            src_pos: IVec2::new(1, 1),
            dst_scene: second,
            dst_pos: IVec2::new(3, 2),
        });
        teleports.propagate();
        movement.handle_teleports(&mut dungeons);

        let data = movement.data()[ACTOR];
        assert_eq!(data.scene, second);
        assert_eq!(data.pos, Vec2::new(3.5, 2.5));
        assert!(dungeons[first].entities_at(IVec2::new(1, 1)).unwrap().is_empty());
        assert_eq!(dungeons[second].entities_at(IVec2::new(3, 2)).unwrap(), &[ACTOR]);
    }

    #[test]
    fn test_speed_bonus_powerup() {
        let (mut movement, _, scene) = setup();
        movement.handle(&TriggerEvent {
            actor: ACTOR,
            scene,
            pos: IVec2::new(1, 1),
            outcome: TriggerOutcome::Powerup(PowerupEffect::SpeedBonus(2)),
        });
        assert_eq!(movement.data()[ACTOR].num_speed_boni, 2);
    }

    #[test]
    fn test_release_clears_occupancy() {
        let (mut movement, mut dungeons, scene) = setup();
        movement.queue_release(ACTOR);
        movement.queue_release(ObjectId(99));
        movement.apply_changes(&mut dungeons);
        assert!(!movement.data().has(ACTOR));
        assert!(dungeons[scene].entities_at(IVec2::new(1, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_input_snaps_direction_and_sets_look() {
        let (mut movement, _, _) = setup();
        walk(&mut movement, IVec2::new(3, -1));
        let data = movement.data()[ACTOR];
        assert_eq!(data.next_move, IVec2::new(1, 0));
        assert_eq!(data.look, IVec2::new(1, 0));
    }
}
