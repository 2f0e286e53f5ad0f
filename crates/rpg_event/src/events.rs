//! Event records exchanged between subsystems.
//!
//! Events are plain data: they carry no behaviour and own no references into
//! component storage. Grid positions are cell coordinates, world positions
//! are in cell units.

use rpg_component::{ObjectId, SceneId};
use rpg_math::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

// ── Input ───────────────────────────────────────────────────────────────────

/// A controller (player input or AI) wants an actor to move and/or look.
///
/// `move_dir` zero means "stop after the current step".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub actor: ObjectId,
    pub move_dir: IVec2,
    pub look: IVec2,
}

// ── Movement ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveKind {
    /// The actor started walking from `source` towards `target`.
    Left,
    /// The actor arrived at the centre of `target`.
    Reached,
}

/// Published by the movement system when an actor leaves or reaches a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveEvent {
    pub actor: ObjectId,
    pub scene: SceneId,
    pub source: IVec2,
    pub target: IVec2,
    pub kind: MoveKind,
}

/// Published by the collision system. The movement system applies the
/// correction; nobody else moves the actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// The moving actor.
    pub actor: ObjectId,
    /// The actor that was hit, or [`ObjectId::INVALID`] for terrain.
    pub collider: ObjectId,
    /// The cell where the collision was detected.
    pub pos: IVec2,
    /// World position the actor is put back to.
    pub reset_to: Vec2,
    /// Whether the actor's movement stops.
    pub interrupt: bool,
}

/// An actor is moved to another scene (or another place in the same scene).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeleportEvent {
    pub actor: ObjectId,
    pub src_scene: SceneId,
    pub src_pos: IVec2,
    pub dst_scene: SceneId,
    pub dst_pos: IVec2,
}

// ── Perception ──────────────────────────────────────────────────────────────

/// The nearest visible actor of `observer` changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusEvent {
    pub observer: ObjectId,
    pub previous: ObjectId,
    /// [`ObjectId::INVALID`] when nothing is in sight anymore.
    pub focus: ObjectId,
}

// ── Presentation ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationAction {
    Idle,
    Walk,
}

/// Asks the presentation layer to switch an actor's animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationEvent {
    pub actor: ObjectId,
    pub action: AnimationAction,
}

// ── Triggers ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerupEffect {
    /// Restore hit points.
    Heal(u32),
    /// Add to the actor's speed bonus counter (negative slows down).
    SpeedBonus(i32),
}

/// What executing a cell trigger produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerOutcome {
    Powerup(PowerupEffect),
    /// A combat gate closed; the encounter with this id starts.
    Encounter(u32),
    /// A region exit was used.
    Exit { scene: SceneId, pos: IVec2 },
    /// A timed event fired.
    Scripted(u32),
    /// The trigger had nothing left to do.
    Nothing,
}

/// Published by the trigger system after an actor set off a cell trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub actor: ObjectId,
    pub scene: SceneId,
    pub pos: IVec2,
    pub outcome: TriggerOutcome,
}
