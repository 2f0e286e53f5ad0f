//! Component records owned by the simulation subsystems.

use rpg_component::{Component, ObjectId, SceneId};
use rpg_math::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Position and walking state of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementData {
    pub id: ObjectId,
    /// World position in cell units.
    pub pos: Vec2,
    /// Position at the start of the current frame.
    pub last_pos: Vec2,
    pub scene: SceneId,
    /// Base speed in cells per second.
    pub max_speed: f32,
    /// Cell currently walked towards.
    pub target: IVec2,
    /// Cell the actor stood on or was leaving at the start of the frame.
    pub origin: IVec2,
    /// Current compass move vector, zero while idle.
    pub move_dir: IVec2,
    pub look: IVec2,
    /// Move applied when the actor next arrives at a cell centre.
    pub next_move: IVec2,
    pub num_speed_boni: i32,
    pub has_changed: bool,
}

impl MovementData {
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.move_dir != IVec2::ZERO
    }
}

impl Component for MovementData {
    fn type_name() -> &'static str {
        "MovementData"
    }

    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn set_object_id(&mut self, id: ObjectId) {
        self.id = id;
    }
}

/// Collision shape of an actor: a circle around its position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CollisionData {
    pub id: ObjectId,
    /// At most [`MAX_COLLISION_RADIUS`](crate::movement::MAX_COLLISION_RADIUS).
    pub radius: f32,
    /// Projectiles are despawned by the simulation when they hit something
    /// and never block other actors.
    pub is_projectile: bool,
}

impl Component for CollisionData {
    fn type_name() -> &'static str {
        "CollisionData"
    }

    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn set_object_id(&mut self, id: ObjectId) {
        self.id = id;
    }
}

/// Perception of an actor: which other actor it currently looks at.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FocusData {
    pub id: ObjectId,
    /// View distance in cells.
    pub sight: f32,
    /// Field of view in degrees, centred on the look direction.
    pub fov: f32,
    pub is_active: bool,
    /// Nearest visible actor, or [`ObjectId::INVALID`].
    pub focus: ObjectId,
    pub has_changed: bool,
}

impl Component for FocusData {
    fn type_name() -> &'static str {
        "FocusData"
    }

    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn set_object_id(&mut self, id: ObjectId) {
        self.id = id;
    }
}
