//! # RTPS - Render-Target Particle Simulation
//!
//! GPU particle simulation where particle state lives in floating-point
//! textures instead of CPU-side arrays.
//!
//! Every particle owns one texel of a square RGBA float texture. Each frame a
//! full-screen shader pass reads the previous state texture and writes the
//! next one into a second texture; the two swap roles every frame
//! ("ping-pong"). An instanced draw then renders one quad per particle,
//! fetching its position from the freshly written texture through a
//! per-instance texel UV.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rtps::prelude::*;
//!
//! let ctx = GpuContext::headless()?;
//! let config = Config::new().with_scene_size(256, 256);
//! let mut sim = ParticleSimulation::new(
//!     &ctx,
//!     &config,
//!     config.scene.num_points(),
//!     wgpu::TextureFormat::Bgra8UnormSrgb,
//! )?;
//!
//! // Once per frame:
//! let mut encoder = ctx.device.create_command_encoder(&Default::default());
//! sim.render_frame(&ctx, &mut encoder, &target_view, &FrameInput { dt, pointer })?;
//! ctx.queue.submit(Some(encoder.finish()));
//! ```
//!
//! ## Frame Data Flow
//!
//! ```text
//!   pointer, dt
//!        |
//!        v
//!   [position pass]  reads target[read], initial, default
//!        |           writes target[write]
//!        v
//!   [particle pass]  reads target[write] per instance
//!        |
//!        v
//!   caller's color target
//! ```
//!
//! Even frames write target A, odd frames write target B. See [`ping_pong`].
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`layout`] | Particle count, texture size, texel addressing, initial textures |
//! | [`ping_pong`] | Frame parity and read/write selection |
//! | [`noise_mix`] | Pointer-driven noise excitation |
//! | [`gpu`] | Device context, render targets, the three shader passes |
//! | [`simulation`] | [`ParticleSimulation`], the owner of everything above |
//! | [`config`] | Scene and tuning configuration |
//! | [`pointer`], [`time`] | Per-frame inputs |

// Lets `#[derive(UniformBlock)]` refer to `rtps::` from inside this crate.
extern crate self as rtps;

pub mod config;
pub mod error;
pub mod gpu;
pub mod layout;
pub mod noise_mix;
pub mod ping_pong;
pub mod pointer;
pub mod shader_utils;
pub mod simulation;
pub mod time;
pub mod window;

pub use bytemuck;
pub use config::{Config, FloatType};
pub use error::{ConfigError, GpuError, InitError, SimulationError};
pub use glam::{Mat4, Vec2, Vec3, Vec4};
pub use gpu::GpuContext;
pub use layout::ParticleLayout;
pub use pointer::PointerState;
pub use rtps_derive::UniformBlock;
pub use simulation::{FrameInput, ParticleSimulation};

/// Trait automatically implemented by `#[derive(UniformBlock)]`.
///
/// Bridges a Rust parameter struct to a WGSL uniform block. The derive macro
/// generates:
/// - A companion `{Name}Gpu` struct with explicit padding fields
/// - The WGSL struct definition with the same fields and padding
/// - Conversion from the Rust struct to the GPU representation
///
/// Because both sides come from one field list, the Rust and WGSL layouts
/// cannot drift apart.
///
/// # Do Not Implement Manually
///
/// Hand-written implementations are not checked against the WGSL text.
///
/// # Example
///
/// ```ignore
/// #[derive(UniformBlock, Clone, Copy)]
/// #[wgsl(name = "SimParams")]
/// struct SimParams {
///     frame: f32,
///     mouse_pos: Vec2,
/// }
///
/// let wgsl = format!("{}\n@group(0) @binding(0) var<uniform> params: {};",
///     SimParams::WGSL_STRUCT, SimParams::WGSL_NAME);
/// ```
pub trait UniformBlock {
    /// GPU-compatible representation, padded to WGSL uniform layout.
    type Gpu: Copy + Clone + bytemuck::Pod + bytemuck::Zeroable;

    /// Name of the generated WGSL struct.
    const WGSL_NAME: &'static str;

    /// WGSL struct definition matching [`UniformBlock::Gpu`] byte for byte.
    const WGSL_STRUCT: &'static str;

    /// Size of the GPU representation in bytes, a multiple of 16.
    const SIZE: u64;

    /// Convert to the GPU representation.
    fn to_gpu(&self) -> Self::Gpu;
}

/// Convenient re-exports for common usage.
///
/// # Usage
///
/// ```ignore
/// use rtps::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, FloatType, ParticleConfig, SceneConfig};
    pub use crate::error::{ConfigError, InitError, SimulationError};
    pub use crate::gpu::GpuContext;
    pub use crate::layout::ParticleLayout;
    pub use crate::pointer::{Pointer, PointerState};
    pub use crate::simulation::{FrameInput, ParticleSimulation};
    pub use crate::time::Time;
    pub use crate::UniformBlock;
    pub use crate::{Mat4, Vec2, Vec3, Vec4};
}
