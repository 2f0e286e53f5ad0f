//! Per-frame execution context handed to every subsystem.

use crate::movement::MAX_FRAMETIME_MS;

/// Frame number and elapsed time of the frame being simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    /// The current frame number, starting at zero.
    pub frame: u64,
    /// Time covered by this frame in milliseconds, at most
    /// [`MAX_FRAMETIME_MS`].
    pub elapsed_ms: u32,
}

impl FrameContext {
    /// Create a context for a frame. Longer frames are clamped so that no
    /// actor moves more than one cell.
    #[must_use]
    pub fn new(frame: u64, elapsed_ms: u32) -> Self {
        Self {
            frame,
            elapsed_ms: elapsed_ms.min(MAX_FRAMETIME_MS),
        }
    }

    /// Elapsed time in seconds.
    #[must_use]
    pub fn dt(&self) -> f32 {
        self.elapsed_ms as f32 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = FrameContext::new(3, 20);
        assert_eq!(ctx.frame, 3);
        assert_eq!(ctx.elapsed_ms, 20);
        assert!((ctx.dt() - 0.02).abs() < f32::EPSILON);
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let ctx = FrameContext::new(0, 5_000);
        assert_eq!(ctx.elapsed_ms, MAX_FRAMETIME_MS);
    }
}
