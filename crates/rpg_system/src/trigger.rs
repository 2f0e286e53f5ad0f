//! Runs cell triggers when actors arrive on them.

use rpg_component::ComponentManager;
use rpg_dungeon::DungeonSystem;
use rpg_event::{
    EventListener, EventSender, MoveEvent, MoveKind, TeleportEvent, TriggerEvent, TriggerOutcome,
};
use rpg_math::cell_of;
use tracing::{Span, debug, warn};

use crate::components::MovementData;
use crate::context::FrameContext;
use crate::log::LogContext;

/// Runs cell triggers for arriving actors and ages timed triggers.
#[derive(Debug)]
pub struct TriggerSystem {
    moves: EventListener<MoveEvent>,
    teleports: EventSender<TeleportEvent>,
    outcomes: EventSender<TriggerEvent>,
    span: Span,
}

impl TriggerSystem {
    /// An unbound system logging under a `trigger` span.
    #[must_use]
    pub fn new(log: &LogContext) -> Self {
        Self {
            moves: EventListener::new(),
            teleports: EventSender::new(),
            outcomes: EventSender::new(),
            span: log.child("trigger"),
        }
    }

    /// Inbox for the movement system's move events.
    pub fn move_listener(&mut self) -> &mut EventListener<MoveEvent> {
        &mut self.moves
    }

    /// Deliver teleports requested by region exits to `listener`.
    pub fn bind_teleports(&mut self, listener: &mut EventListener<TeleportEvent>) {
        self.teleports.bind(listener);
    }

    /// Deliver trigger outcomes to `listener`.
    pub fn bind_outcomes(&mut self, listener: &mut EventListener<TriggerEvent>) {
        self.outcomes.bind(listener);
    }

    /// Deliver the teleports and outcomes produced so far.
    pub fn propagate(&mut self) -> usize {
        self.teleports.propagate() + self.outcomes.propagate()
    }

    /// Execute the trigger of every cell an actor arrived on, then age timed
    /// triggers by the frame time.
    pub fn update(&mut self, ctx: &FrameContext, movement: &ComponentManager<MovementData>, dungeons: &mut DungeonSystem) {
        let _span = self.span.clone().entered();
        for event in self.moves.drain() {
            if event.kind != MoveKind::Reached {
                continue;
            }
            // a collision may have pushed the actor back after it arrived
            if !movement.get(event.actor).is_some_and(|data| still_on(data, &event)) {
                continue;
            }
            let Some(dungeon) = dungeons.get_mut(event.scene) else {
                continue;
            };
            let Ok(Some(trigger)) = dungeon.trigger_mut(event.target) else {
                continue;
            };
            let outcome = trigger.execute(event.actor);
            if trigger.is_expired() {
                let _ = dungeon.take_trigger(event.target);
            }
            if outcome == TriggerOutcome::Nothing {
                continue;
            }

            if let TriggerOutcome::Exit { scene, pos } = outcome {
                if dungeons.get(scene).is_some_and(|d| d.is_walkable(pos)) {
                    self.teleports.send(TeleportEvent {
                        actor: event.actor,
                        src_scene: event.scene,
                        src_pos: event.target,
                        dst_scene: scene,
                        dst_pos: pos,
                    });
                } else {
                    warn!(actor = %event.actor, %scene, ?pos, "region exit leads nowhere");
                }
            }
            self.outcomes.send(TriggerEvent {
                actor: event.actor,
                scene: event.scene,
                pos: event.target,
                outcome,
            });
        }

        let expired: usize = dungeons
            .iter_mut()
            .map(|dungeon| dungeon.tick_triggers(ctx.elapsed_ms))
            .sum();
        if expired > 0 {
            debug!(frame = ctx.frame, expired, "timed triggers removed");
        }
    }
}

/// Returns `true` if the actor is on the cell it reached, or has just left
/// it on its next step.
fn still_on(data: &MovementData, event: &MoveEvent) -> bool {
    data.scene == event.scene
        && (cell_of(data.pos) == event.target
            || (data.is_moving() && data.target - data.move_dir == event.target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpg_component::{ObjectId, SceneId};
    use rpg_dungeon::{Terrain, Trigger};
    use rpg_event::PowerupEffect;
    use rpg_math::{IVec2, IntRect, UVec2, Vec2, cell_center};

    const ACTOR: ObjectId = ObjectId(1);

    struct World {
        dungeons: DungeonSystem,
        scene: SceneId,
        movement: ComponentManager<MovementData>,
        triggers: TriggerSystem,
        moves: EventSender<MoveEvent>,
        teleports: EventListener<TeleportEvent>,
        outcomes: EventListener<TriggerEvent>,
    }

    impl World {
        fn new() -> Self {
            let mut dungeons = DungeonSystem::new();
            let scene = dungeons.create(6, 6, UVec2::new(16, 16));
            dungeons[scene].fill(IntRect::new(0, 0, 6, 6), Terrain::Floor);
            let mut movement = ComponentManager::<MovementData>::new();
            movement.acquire(ACTOR).scene = scene;

            let mut triggers = TriggerSystem::new(&LogContext::default());
            let mut moves = EventSender::new();
            moves.bind(triggers.move_listener());
            let mut teleports = EventListener::new();
            let mut outcomes = EventListener::new();
            triggers.bind_teleports(&mut teleports);
            triggers.bind_outcomes(&mut outcomes);
            Self {
                dungeons,
                scene,
                movement,
                triggers,
                moves,
                teleports,
                outcomes,
            }
        }

        fn arrive(&mut self, cell: IVec2) {
            self.movement[ACTOR].pos = cell_center(cell);
            self.moves.send(MoveEvent {
                actor: ACTOR,
                scene: self.scene,
                source: cell - IVec2::X,
                target: cell,
                kind: MoveKind::Reached,
            });
            self.step(20);
        }

        fn step(&mut self, elapsed_ms: u32) {
            self.moves.propagate();
            let ctx = FrameContext::new(0, elapsed_ms);
            self.triggers.update(&ctx, &self.movement, &mut self.dungeons);
            self.triggers.propagate();
        }
    }

    #[test]
    fn test_powerup_is_consumed() {
        let mut world = World::new();
        let cell = IVec2::new(2, 2);
        world.dungeons[world.scene]
            .set_trigger(cell, Trigger::powerup(PowerupEffect::SpeedBonus(1)))
            .unwrap();

        world.arrive(cell);
        let outcomes = world.outcomes.drain();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].outcome,
            TriggerOutcome::Powerup(PowerupEffect::SpeedBonus(1))
        );
        assert!(world.dungeons[world.scene].grid().get(cell).unwrap().trigger.is_none());

        world.arrive(cell);
        assert!(world.outcomes.drain().is_empty());
    }

    #[test]
    fn test_leaving_a_cell_does_not_trigger() {
        let mut world = World::new();
        let cell = IVec2::new(2, 2);
        world.dungeons[world.scene].set_trigger(cell, Trigger::combat_gate(3)).unwrap();
        world.movement[ACTOR].pos = cell_center(cell);
        world.moves.send(MoveEvent {
            actor: ACTOR,
            scene: world.scene,
            source: cell,
            target: cell + IVec2::X,
            kind: MoveKind::Left,
        });
        world.step(20);
        assert!(world.outcomes.drain().is_empty());
    }

    #[test]
    fn test_pushed_back_actor_does_not_trigger() {
        let mut world = World::new();
        let cell = IVec2::new(2, 2);
        world.dungeons[world.scene].set_trigger(cell, Trigger::combat_gate(3)).unwrap();
        world.arrive(cell);
        assert_eq!(world.outcomes.drain()[0].outcome, TriggerOutcome::Encounter(3));

        world.dungeons[world.scene].set_trigger(cell, Trigger::combat_gate(4)).unwrap();
        world.movement[ACTOR].pos = cell_center(IVec2::new(1, 2));
        world.moves.send(MoveEvent {
            actor: ACTOR,
            scene: world.scene,
            source: IVec2::new(1, 2),
            target: cell,
            kind: MoveKind::Reached,
        });
        world.step(20);
        assert!(world.outcomes.drain().is_empty());
    }

    #[test]
    fn test_walking_on_past_the_centre_still_triggers() {
        let mut world = World::new();
        let cell = IVec2::new(2, 2);
        world.dungeons[world.scene].set_trigger(cell, Trigger::combat_gate(2)).unwrap();
        let data = &mut world.movement[ACTOR];
        data.pos = Vec2::new(3.1, 2.5);
        data.move_dir = IVec2::X;
        data.target = cell + IVec2::X;
        world.moves.send(MoveEvent {
            actor: ACTOR,
            scene: world.scene,
            source: IVec2::new(1, 2),
            target: cell,
            kind: MoveKind::Reached,
        });
        world.step(20);
        assert_eq!(world.outcomes.drain()[0].outcome, TriggerOutcome::Encounter(2));
    }

    #[test]
    fn test_region_exit_sends_teleport() {
        let mut world = World::new();
        let other = world.dungeons.create(4, 4, UVec2::new(16, 16));
        world.dungeons[other].set_terrain(IVec2::new(1, 1), Terrain::Floor).unwrap();
        let cell = IVec2::new(5, 5);
        world.dungeons[world.scene]
            .set_trigger(cell, Trigger::region_exit(other, IVec2::new(1, 1)))
            .unwrap();

        world.arrive(cell);
        let teleports = world.teleports.drain();
        assert_eq!(
            teleports,
            vec![TeleportEvent {
                actor: ACTOR,
                src_scene: world.scene,
                src_pos: cell,
                dst_scene: other,
                dst_pos: IVec2::new(1, 1),
            }]
        );
        assert_eq!(world.outcomes.drain().len(), 1);
        // exits stay in place
        assert!(world.dungeons[world.scene].grid().get(cell).unwrap().trigger.is_some());
    }

    #[test]
    fn test_exit_into_wall_is_refused() {
        let mut world = World::new();
        let other = world.dungeons.create(4, 4, UVec2::new(16, 16));
        let cell = IVec2::new(5, 5);
        world.dungeons[world.scene]
            .set_trigger(cell, Trigger::region_exit(other, IVec2::new(1, 1)))
            .unwrap();
        world.arrive(cell);
        assert!(world.teleports.drain().is_empty());
    }

    #[test]
    fn test_timed_trigger_fires_until_it_expires() {
        let mut world = World::new();
        let cell = IVec2::new(3, 3);
        world.dungeons[world.scene].set_trigger(cell, Trigger::timed(8, 50)).unwrap();

        world.arrive(cell);
        assert_eq!(world.outcomes.drain()[0].outcome, TriggerOutcome::Scripted(8));
        world.arrive(cell);
        assert_eq!(world.outcomes.drain().len(), 1);
        // 40 ms aged so far; this frame pushes it past its lifetime
        world.step(20);
        world.arrive(cell);
        assert!(world.outcomes.drain().is_empty());
    }
}
