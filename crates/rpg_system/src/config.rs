//! Simulation configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::movement::{MAX_COLLISION_RADIUS, MAX_FRAMETIME_MS};

/// Errors raised while loading or validating a [`SimConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("frametime {0} ms must be in 1..={max}", max = MAX_FRAMETIME_MS)]
    FrameTime(u32),

    #[error("default speed {0} must not be negative")]
    Speed(f32),

    #[error("collision radius {0} must be in 0..={max}", max = MAX_COLLISION_RADIUS)]
    Radius(f32),

    #[error("sight {0} must not be negative")]
    Sight(f32),

    #[error("field of view {0} must be in (0, 360] degrees")]
    FieldOfView(f32),
}

/// Tunables of a simulation run. Missing JSON fields take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed frame length in milliseconds.
    pub frametime_ms: u32,
    /// Base speed of spawned actors in cells per second.
    pub default_speed: f32,
    /// Collision radius of spawned actors in cells.
    pub default_radius: f32,
    /// View distance of spawned actors in cells.
    pub default_sight: f32,
    /// Field of view of spawned actors in degrees.
    pub default_fov: f32,
    /// Frames between two background saves. Zero disables saving.
    pub save_interval_frames: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frametime_ms: 20,
            default_speed: 4.0,
            default_radius: 0.4,
            default_sight: 6.0,
            default_fov: 120.0,
            save_interval_frames: 250,
        }
    }
}

impl SimConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_frametime_ms(mut self, frametime_ms: u32) -> Self {
        self.frametime_ms = frametime_ms;
        self
    }

    #[must_use]
    pub fn with_default_speed(mut self, speed: f32) -> Self {
        self.default_speed = speed;
        self
    }

    #[must_use]
    pub fn with_default_radius(mut self, radius: f32) -> Self {
        self.default_radius = radius;
        self
    }

    #[must_use]
    pub fn with_default_sight(mut self, sight: f32) -> Self {
        self.default_sight = sight;
        self
    }

    #[must_use]
    pub fn with_default_fov(mut self, fov: f32) -> Self {
        self.default_fov = fov;
        self
    }

    #[must_use]
    pub fn with_save_interval_frames(mut self, frames: u64) -> Self {
        self.save_interval_frames = frames;
        self
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and a validation
    /// error for out-of-range values.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_json`](Self::from_json).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// # Errors
    ///
    /// Returns the first value that is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frametime_ms == 0 || self.frametime_ms > MAX_FRAMETIME_MS {
            return Err(ConfigError::FrameTime(self.frametime_ms));
        }
        if self.default_speed.is_nan() || self.default_speed < 0.0 {
            return Err(ConfigError::Speed(self.default_speed));
        }
        if !(0.0..=MAX_COLLISION_RADIUS).contains(&self.default_radius) {
            return Err(ConfigError::Radius(self.default_radius));
        }
        if self.default_sight.is_nan() || self.default_sight < 0.0 {
            return Err(ConfigError::Sight(self.default_sight));
        }
        if !(self.default_fov > 0.0 && self.default_fov <= 360.0) {
            return Err(ConfigError::FieldOfView(self.default_fov));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SimConfig::new()
            .with_frametime_ms(40)
            .with_default_speed(2.5)
            .with_save_interval_frames(0);
        assert_eq!(config.frametime_ms, 40);
        assert_eq!(config.default_speed, 2.5);
        assert_eq!(config.save_interval_frames, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json(r#"{ "frametime_ms": 25, "default_fov": 90.0 }"#).unwrap();
        assert_eq!(config.frametime_ms, 25);
        assert_eq!(config.default_fov, 90.0);
        assert_eq!(config.default_sight, SimConfig::default().default_sight);
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let base = SimConfig::default();
        assert!(matches!(
            base.clone().with_frametime_ms(0).validate(),
            Err(ConfigError::FrameTime(0))
        ));
        assert!(matches!(
            base.clone().with_frametime_ms(41).validate(),
            Err(ConfigError::FrameTime(41))
        ));
        assert!(matches!(
            base.clone().with_default_radius(0.6).validate(),
            Err(ConfigError::Radius(_))
        ));
        assert!(matches!(
            base.clone().with_default_sight(-1.0).validate(),
            Err(ConfigError::Sight(_))
        ));
        assert!(matches!(
            base.clone().with_default_fov(0.0).validate(),
            Err(ConfigError::FieldOfView(_))
        ));
        assert!(base.with_default_fov(360.0).validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SimConfig::from_json("{ frametime_ms: }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = SimConfig::load(Path::new("/nonexistent/rpg.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/rpg.json"));
    }
}
