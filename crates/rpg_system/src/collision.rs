//! Collision detection.
//!
//! For every actor that moved this frame the system sweeps its circle from
//! `last_pos` to `pos` and reports the first obstacle on the way: a cell that
//! is not walkable, or another actor's circle. It never moves anyone itself;
//! the movement system applies the correction carried by the event.

use rpg_component::{ChangeBuffer, ComponentManager, ObjectId};
use rpg_dungeon::{Dungeon, DungeonSystem};
use rpg_event::{CollisionEvent, EventListener, EventSender};
use rpg_math::{IVec2, IntRect, Vec2, cell_center, cell_of, to_int_rect_circle};
use tracing::{Span, trace};

use crate::components::{CollisionData, MovementData};
use crate::log::LogContext;
use crate::movement::MAX_COLLISION_RADIUS;

/// Smallest distance between two sweep samples, in cells.
const MIN_SAMPLE_SPACING: f32 = 0.05;
const EPSILON: f32 = 1e-5;

/// Owns the collision shapes and reports the first obstacle on each moved
/// actor's path.
#[derive(Debug)]
pub struct CollisionSystem {
    data: ComponentManager<CollisionData>,
    changes: ChangeBuffer<CollisionData>,
    events: EventSender<CollisionEvent>,
    span: Span,
}

impl CollisionSystem {
    /// An empty system logging under a `collision` span.
    #[must_use]
    pub fn new(log: &LogContext) -> Self {
        Self {
            data: ComponentManager::new(),
            changes: ChangeBuffer::new(),
            events: EventSender::new(),
            span: log.child("collision"),
        }
    }

    /// Collision shapes by actor.
    #[must_use]
    pub fn data(&self) -> &ComponentManager<CollisionData> {
        &self.data
    }

    /// Attach a shape to `id` at the next [`apply_changes`](Self::apply_changes).
    pub fn queue_acquire(&mut self, id: ObjectId, record: CollisionData) {
        self.changes.acquire(id, record);
    }

    /// Detach the shape of `id` at the next apply. Ignored if `id` has none.
    pub fn queue_release(&mut self, id: ObjectId) {
        if self.data.has(id) {
            self.changes.release(id);
        }
    }

    /// Apply queued acquires and releases.
    pub fn apply_changes(&mut self) {
        self.changes.apply(&mut self.data);
    }

    /// Deliver collision events to `listener`.
    pub fn bind(&mut self, listener: &mut EventListener<CollisionEvent>) {
        self.events.bind(listener);
    }

    /// Deliver the collision events found so far.
    pub fn propagate(&mut self) -> usize {
        self.events.propagate()
    }

    /// Check every actor that moved this frame. Returns the number of
    /// collisions found.
    pub fn update(&mut self, movement: &ComponentManager<MovementData>, dungeons: &DungeonSystem) -> usize {
        let _span = self.span.clone().entered();
        let mut found = 0;
        for (id, shape) in self.data.iter() {
            let Some(mover) = movement.get(id) else {
                continue;
            };
            if !mover.has_changed {
                continue;
            }
            let Some(dungeon) = dungeons.get(mover.scene) else {
                continue;
            };
            if let Some(event) = sweep(id, shape, mover, movement, &self.data, dungeon) {
                trace!(actor = %id, collider = %event.collider, pos = ?event.pos, "collision");
                self.events.send(event);
                found += 1;
            }
        }
        found
    }
}

/// Cells overlapped by the circle, at least the cell containing `center`.
fn query_rect(center: Vec2, radius: f32) -> IntRect {
    let mut rect = to_int_rect_circle(center, radius);
    rect.width = rect.width.max(1);
    rect.height = rect.height.max(1);
    rect
}

/// Returns `true` if the circle reaches into the cell's interior.
fn overlaps_cell(center: Vec2, radius: f32, cell: IVec2) -> bool {
    if cell_of(center) == cell {
        return true;
    }
    let min = cell.as_vec2();
    let closest = center.clamp(min, min + Vec2::ONE);
    center.distance_squared(closest) < radius * radius - EPSILON
}

fn blocked_cell(dungeon: &Dungeon, center: Vec2, radius: f32) -> Option<IVec2> {
    query_rect(center, radius)
        .cells()
        .find(|cell| !dungeon.is_walkable(*cell) && overlaps_cell(center, radius, *cell))
}

fn sweep(
    id: ObjectId,
    shape: &CollisionData,
    mover: &MovementData,
    movement: &ComponentManager<MovementData>,
    shapes: &ComponentManager<CollisionData>,
    dungeon: &Dungeon,
) -> Option<CollisionEvent> {
    let radius = shape.radius.clamp(0.0, MAX_COLLISION_RADIUS);
    // an actor that reached a cell centre this frame and walked on took a
    // bent path: sweep both legs, the second one starting from that centre
    let mut legs = Vec::with_capacity(2);
    let reached = mover.target - mover.move_dir;
    if mover.is_moving() && reached != mover.origin {
        legs.push((mover.origin, mover.last_pos, cell_center(reached)));
        legs.push((reached, cell_center(reached), mover.pos));
    } else {
        legs.push((mover.origin, mover.last_pos, mover.pos));
    }

    for (reset_cell, from, to) in legs {
        if let Some((collider, pos)) = sweep_leg(id, radius, from, to, movement, shapes, dungeon) {
            return Some(CollisionEvent {
                actor: id,
                collider,
                pos,
                reset_to: cell_center(reset_cell),
                interrupt: true,
            });
        }
    }
    None
}

/// First obstacle met moving the circle in a straight line from `from` to
/// `to`: the blocked cell or the other actor and its cell.
fn sweep_leg(
    id: ObjectId,
    radius: f32,
    from: Vec2,
    to: Vec2,
    movement: &ComponentManager<MovementData>,
    shapes: &ComponentManager<CollisionData>,
    dungeon: &Dungeon,
) -> Option<(ObjectId, IVec2)> {
    let travel = to - from;
    let spacing = (radius * 0.5).max(MIN_SAMPLE_SPACING);
    let samples = ((travel.length() / spacing).ceil() as usize).max(1);

    for i in 1..=samples {
        let center = from + travel * (i as f32 / samples as f32);
        if let Some(cell) = blocked_cell(dungeon, center, radius) {
            return Some((ObjectId::INVALID, cell));
        }
        let reach = radius + MAX_COLLISION_RADIUS;
        for other in dungeon.entities_in(query_rect(center, reach)) {
            if other == id {
                continue;
            }
            let (Some(other_shape), Some(other_mover)) = (shapes.get(other), movement.get(other)) else {
                continue;
            };
            if other_shape.is_projectile {
                continue;
            }
            let contact = radius + other_shape.radius.clamp(0.0, MAX_COLLISION_RADIUS);
            let now = center.distance(other_mover.pos);
            let before = from.distance(other_mover.pos);
            // actors already overlapping may still separate
            if now < contact - EPSILON && now < before {
                return Some((other, cell_of(other_mover.pos)));
            }
        }
    }
    None
}
