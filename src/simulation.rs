//! The simulation context.
//!
//! [`ParticleSimulation`] owns every GPU resource of one particle system:
//! the ping-pong targets, the two reference textures and both passes. It is
//! created once for a fixed particle count and torn down with
//! [`ParticleSimulation::destroy`].
//!
//! # Frame order
//!
//! ```text
//! render_frame
//!   ├─ check device loss
//!   ├─ position pass: parity += 1, noise mix, uniforms, draw into write target
//!   ├─ particle pass uniforms (same noise mix and time)
//!   └─ render pass on the caller's view: instanced draw reading the write target
//! ```
//!
//! Both passes are recorded into the caller's encoder, so the write is
//! ordered before the read without any explicit synchronization.

use glam::Mat4;

use crate::config::Config;
use crate::error::SimulationError;
use crate::gpu::position_pass::PassState;
use crate::gpu::textures::DataTexture;
use crate::gpu::{
    GpuContext, ParticlePass, PassThrough, PositionPass, RenderTarget, RenderTargetPair,
};
use crate::layout::ParticleLayout;
use crate::noise_mix::NoiseMix;
use crate::ping_pong::Slot;
use crate::pointer::PointerState;

/// Per-frame input from the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Frame time in seconds.
    pub dt: f32,
    /// Pointer snapshot for this frame.
    pub pointer: PointerState,
}

/// A running render-target particle simulation.
pub struct ParticleSimulation {
    layout: ParticleLayout,
    targets: RenderTargetPair,
    initial: DataTexture,
    default: DataTexture,
    position_pass: PositionPass,
    particle_pass: ParticlePass,
    viewport: (u32, u32),
}

impl ParticleSimulation {
    /// Build a simulation for `num_points` grid points.
    ///
    /// The layout is computed first, so an invalid count fails with
    /// [`SimulationError::Config`] before anything is allocated on the GPU.
    /// `color_format` is the format of the views later passed to
    /// [`render_frame`](Self::render_frame) or [`draw`](Self::draw).
    pub fn new(
        ctx: &GpuContext,
        config: &Config,
        num_points: u32,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, SimulationError> {
        let layout = ParticleLayout::new(num_points, config)?;
        Self::with_layout(ctx, config, layout, color_format)
    }

    /// Build a simulation from a prepared layout, e.g. one with custom seeds.
    pub fn with_layout(
        ctx: &GpuContext,
        config: &Config,
        layout: ParticleLayout,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, SimulationError> {
        ctx.check_lost()?;
        let textures = layout.initial_textures()?;
        let size = layout.texture_size();

        log::info!(
            "Initializing {} particles in a {}x{} {:?} position texture",
            layout.particle_count(),
            size,
            size,
            config.float_type
        );

        let targets = RenderTargetPair::new(ctx, size, config.float_type.texture_format())?;
        // The pair must match what the layout actually produced
        targets.ensure_size(textures.default.size())?;
        targets.ensure_size(textures.initial.size())?;

        let initial = DataTexture::from_position_data(
            &ctx.device,
            &ctx.queue,
            &textures.initial,
            "Initial Position Texture",
        );
        let default = DataTexture::from_position_data(
            &ctx.device,
            &ctx.queue,
            &textures.default,
            "Default Position Texture",
        );

        // Seed both targets so the first read already sees valid texels
        let pass_through = PassThrough::new(ctx, targets.format())?;
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Seed Encoder"),
        });
        pass_through.copy(&ctx.device, &mut encoder, &default.view, targets.get(Slot::A));
        pass_through.copy(&ctx.device, &mut encoder, &default.view, targets.get(Slot::B));
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let noise_mix = NoiseMix::new(config.particles.noise_decay, config.particles.noise_threshold);
        let position_pass = PositionPass::new(ctx, &targets, &initial, &default, noise_mix)?;
        let particle_pass =
            ParticlePass::new(ctx, &layout, &targets, color_format, config.particles.size)?;

        Ok(Self {
            layout,
            targets,
            initial,
            default,
            position_pass,
            particle_pass,
            viewport: (1, 1),
        })
    }

    /// Update the viewport size used for quad aspect correction.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
        self.particle_pass.set_viewport(width, height);
    }

    /// Set the camera matrix of the particle pass.
    pub fn set_view_proj(&mut self, view_proj: Mat4) {
        self.particle_pass.set_view_proj(view_proj);
    }

    /// Use a compositor-provided mouse-position texture, or `None` for the
    /// black fallback.
    pub fn set_mouse_texture(&mut self, ctx: &GpuContext, view: Option<&wgpu::TextureView>) {
        self.particle_pass.set_mouse_texture(&ctx.device, view);
    }

    /// Record one simulation step and upload this frame's render uniforms.
    ///
    /// Returns the new frame number. Fails only if the device was lost.
    pub fn step(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        input: &FrameInput,
    ) -> Result<u64, SimulationError> {
        ctx.check_lost()?;
        let parity =
            self.position_pass
                .step(&ctx.queue, encoder, &self.targets, input.dt, &input.pointer);
        self.particle_pass.update(&ctx.queue, self.position_pass.params());
        Ok(parity.frame())
    }

    /// Record the instanced particle draw into a render pass the host owns.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.particle_pass.draw(pass, self.position_pass.parity());
    }

    /// Step the simulation and draw the particles over `view`.
    ///
    /// The existing contents of `view` are kept; particles are blended on top.
    pub fn render_frame(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        input: &FrameInput,
    ) -> Result<(), SimulationError> {
        self.step(ctx, encoder, input)?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Particle Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.draw(&mut pass);

        Ok(())
    }

    /// Release all GPU resources.
    pub fn destroy(self) {
        log::info!(
            "Destroying particle simulation after {} frames",
            self.position_pass.parity().frame()
        );
        self.position_pass.dispose();
        self.particle_pass.dispose();
        self.targets.destroy();
        self.initial.destroy();
        self.default.destroy();
    }

    /// Frames stepped so far.
    pub fn frame(&self) -> u64 {
        self.position_pass.parity().frame()
    }

    /// Noise mix after the last step.
    pub fn noise_mix(&self) -> f32 {
        self.position_pass.noise_mix()
    }

    /// Lifecycle state of the position pass.
    pub fn pass_state(&self) -> PassState {
        self.position_pass.state()
    }

    /// Particle placement.
    pub fn layout(&self) -> &ParticleLayout {
        &self.layout
    }

    /// Viewport set by the last [`resize`](Self::resize).
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Target holding the latest state (written by the last step).
    pub fn current_target(&self) -> &RenderTarget {
        self.targets.targets(self.position_pass.parity()).1
    }

    /// Target the next step will write.
    pub fn next_target(&self) -> &RenderTarget {
        self.targets.targets(self.position_pass.parity()).0
    }

    /// The immutable initial position texture (`w` = phase).
    pub fn initial_texture(&self) -> &wgpu::Texture {
        &self.initial.texture
    }

    /// The immutable default position texture (`w` = 1).
    pub fn default_texture(&self) -> &wgpu::Texture {
        &self.default.texture
    }
}
