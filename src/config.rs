//! Scene and particle configuration.
//!
//! The simulation reads a small set of values from its host: the grid
//! resolution that determines the particle count, the float format used for
//! the position textures, and a few tuning knobs. Everything has a default,
//! so an empty JSON object is a valid configuration.
//!
//! # Example
//!
//! ```ignore
//! use rtps::config::{Config, FloatType};
//!
//! let config = Config::from_json_str(r#"{ "scene": { "width": 256, "height": 256 } }"#)?
//!     .with_float_type(FloatType::HalfFloat);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Floating-point storage type of the simulation render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatType {
    /// 32-bit float per channel (`Rgba32Float`).
    #[default]
    Float,
    /// 16-bit float per channel (`Rgba16Float`).
    HalfFloat,
}

impl FloatType {
    /// The wgpu format for ping-pong render targets of this type.
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            FloatType::Float => wgpu::TextureFormat::Rgba32Float,
            FloatType::HalfFloat => wgpu::TextureFormat::Rgba16Float,
        }
    }
}

/// Grid resolution of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Grid columns.
    pub width: u32,
    /// Grid rows.
    pub height: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
        }
    }
}

impl SceneConfig {
    /// Total grid points, the `num_points` passed to simulation init.
    pub fn num_points(&self) -> u32 {
        self.width.saturating_mul(self.height)
    }
}

/// Particle tuning values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Grid points per particle.
    pub decimation: u32,
    /// Grid stride between consecutive particle offsets.
    pub step: u32,
    /// Half-size of a particle quad in clip units at unit depth.
    pub size: f32,
    /// Noise mix decay per second of frame time.
    pub noise_decay: f32,
    /// Pointer movement (pixels, L1) that re-excites the noise mix.
    pub noise_threshold: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            decimation: 6,
            step: 6,
            size: 0.02,
            noise_decay: 0.7,
            noise_threshold: 1.0,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Grid resolution.
    pub scene: SceneConfig,
    /// Render target float type.
    pub float_type: FloatType,
    /// Particle tuning.
    pub particles: ParticleConfig,
}

impl Config {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Set the scene grid resolution.
    pub fn with_scene_size(mut self, width: u32, height: u32) -> Self {
        self.scene = SceneConfig { width, height };
        self
    }

    /// Set the render target float type.
    pub fn with_float_type(mut self, float_type: FloatType) -> Self {
        self.float_type = float_type;
        self
    }

    /// Set the decimation factor (grid points per particle).
    pub fn with_decimation(mut self, decimation: u32) -> Self {
        self.particles.decimation = decimation;
        self
    }

    /// Set the particle quad half-size.
    pub fn with_particle_size(mut self, size: f32) -> Self {
        self.particles.size = size;
        self
    }

    /// Fail fast on values the simulation cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scene.width == 0 || self.scene.height == 0 {
            return Err(ConfigError::InvalidScene(format!(
                "scene size must be positive, got {}x{}",
                self.scene.width, self.scene.height
            )));
        }
        if self.particles.decimation == 0 {
            return Err(ConfigError::InvalidScene("decimation must be at least 1".into()));
        }
        if self.particles.step == 0 {
            return Err(ConfigError::InvalidScene("step must be at least 1".into()));
        }
        if !(self.particles.size.is_finite() && self.particles.size > 0.0) {
            return Err(ConfigError::InvalidScene(format!(
                "particle size must be positive, got {}",
                self.particles.size
            )));
        }
        if !(self.particles.noise_decay.is_finite() && self.particles.noise_decay >= 0.0) {
            return Err(ConfigError::InvalidScene(format!(
                "noise decay must be non-negative, got {}",
                self.particles.noise_decay
            )));
        }
        if !(self.particles.noise_threshold.is_finite() && self.particles.noise_threshold >= 0.0) {
            return Err(ConfigError::InvalidScene(format!(
                "noise threshold must be non-negative, got {}",
                self.particles.noise_threshold
            )));
        }
        Ok(())
    }
}
