//! Simulation-level errors.

use rpg_component::SceneId;
use rpg_dungeon::SceneError;
use rpg_math::IVec2;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("unknown {0}")]
    UnknownScene(SceneId),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("cell {0} is not walkable")]
    Blocked(IVec2),
}
