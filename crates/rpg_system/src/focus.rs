//! Focus tracking: which actor each observer is looking at.

use rpg_component::{ChangeBuffer, ComponentManager, ObjectId};
use rpg_dungeon::DungeonSystem;
use rpg_event::{EventListener, EventSender, FocusEvent};
use rpg_math::{IVec2, Vec2};
use tracing::{Span, debug};

use crate::components::{CollisionData, FocusData, MovementData};
use crate::log::LogContext;

/// Owns the focus records and keeps each observer focused on the nearest
/// actor it can see.
#[derive(Debug)]
pub struct FocusSystem {
    data: ComponentManager<FocusData>,
    changes: ChangeBuffer<FocusData>,
    events: EventSender<FocusEvent>,
    span: Span,
}

impl FocusSystem {
    /// An empty system logging under a `focus` span.
    #[must_use]
    pub fn new(log: &LogContext) -> Self {
        Self {
            data: ComponentManager::new(),
            changes: ChangeBuffer::new(),
            events: EventSender::new(),
            span: log.child("focus"),
        }
    }

    /// Focus records by observer.
    #[must_use]
    pub fn data(&self) -> &ComponentManager<FocusData> {
        &self.data
    }

    /// Mutable focus records, e.g. to toggle `is_active`.
    pub fn data_mut(&mut self) -> &mut ComponentManager<FocusData> {
        &mut self.data
    }

    /// Attach a record to `id` at the next [`apply_changes`](Self::apply_changes).
    pub fn queue_acquire(&mut self, id: ObjectId, record: FocusData) {
        self.changes.acquire(id, record);
    }

    /// Detach the record of `id` at the next apply. Ignored if `id` has none.
    pub fn queue_release(&mut self, id: ObjectId) {
        if self.data.has(id) {
            self.changes.release(id);
        }
    }

    /// Apply queued acquires and releases.
    pub fn apply_changes(&mut self) {
        self.changes.apply(&mut self.data);
    }

    /// Deliver focus changes to `listener`.
    pub fn bind(&mut self, listener: &mut EventListener<FocusEvent>) {
        self.events.bind(listener);
    }

    /// Deliver the focus changes found so far.
    pub fn propagate(&mut self) -> usize {
        self.events.propagate()
    }

    /// Re-evaluate every observer. Inactive observers lose their focus and
    /// projectiles are never focused on.
    pub fn update(
        &mut self,
        movement: &ComponentManager<MovementData>,
        collision: &ComponentManager<CollisionData>,
        dungeons: &DungeonSystem,
    ) {
        let _span = self.span.clone().entered();
        for (id, focus) in self.data.iter_mut() {
            focus.has_changed = false;
            let next = if focus.is_active {
                nearest_visible(id, focus, movement, collision, dungeons)
            } else {
                ObjectId::INVALID
            };
            if next == focus.focus {
                continue;
            }
            debug!(observer = %id, previous = %focus.focus, focus = %next, "focus changed");
            self.events.send(FocusEvent {
                observer: id,
                previous: focus.focus,
                focus: next,
            });
            focus.focus = next;
            focus.has_changed = true;
        }
    }
}

/// Returns `true` if `offset` lies within the cone of `fov` degrees around
/// `look`. Without a look direction the observer sees all around.
fn in_view(look: IVec2, offset: Vec2, fov: f32) -> bool {
    if fov >= 360.0 || look == IVec2::ZERO || offset == Vec2::ZERO {
        return true;
    }
    let cos = look.as_vec2().normalize().dot(offset.normalize());
    cos >= (fov * 0.5).to_radians().cos() - 1e-6
}

fn nearest_visible(
    id: ObjectId,
    focus: &FocusData,
    movement: &ComponentManager<MovementData>,
    collision: &ComponentManager<CollisionData>,
    dungeons: &DungeonSystem,
) -> ObjectId {
    let Some(observer) = movement.get(id) else {
        return ObjectId::INVALID;
    };
    let Some(dungeon) = dungeons.get(observer.scene) else {
        return ObjectId::INVALID;
    };
    let sight = focus.sight.max(0.0);
    let area = dungeon.grid().to_int_rect_circle(observer.pos, sight);

    dungeon
        .entities_in(area)
        .into_iter()
        .filter(|other| *other != id)
        .filter(|other| !collision.get(*other).is_some_and(|shape| shape.is_projectile))
        .filter_map(|other| {
            let target = movement.get(other)?;
            let offset = target.pos - observer.pos;
            let distance = offset.length_squared();
            let visible = distance <= sight * sight
                && in_view(observer.look, offset, focus.fov)
                && dungeon.has_line_of_sight(observer.pos, target.pos);
            visible.then_some((distance, other))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map_or(ObjectId::INVALID, |(_, other)| other)
}
