//! Scene-layer error types.

use rpg_math::IVec2;

/// Errors returned by grid queries.
///
/// Positions come from entity-driven data, so a bad coordinate is reported to
/// the caller instead of aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The coordinate lies outside `[0, width) × [0, height)`.
    #[error("cell {pos} is outside the {width}x{height} grid")]
    OutOfRange { pos: IVec2, width: u32, height: u32 },
}
