//! The position simulation pass.
//!
//! One full-screen draw per frame. The fragment shader runs once per texel
//! of the write target, reads the same texel from the read target and the
//! two reference textures, and writes the particle's next position.
//!
//! # Lifecycle
//!
//! ```text
//!   PositionPass::new  ->  Ready  --step-->  Stepping  --step--> ...
//!                            |                  |
//!                            +---- dispose -----+
//! ```
//!
//! There is no uninitialized value: a pass exists only once its shader and
//! pipeline compiled. `dispose` consumes it.

use glam::Vec2;

use crate::error::InitError;
use crate::gpu::textures::{state_texture_entry, uniform_entry, DataTexture};
use crate::gpu::{GpuContext, RenderTargetPair};
use crate::noise_mix::NoiseMix;
use crate::ping_pong::{FrameParity, PingPong};
use crate::pointer::PointerState;
use crate::shader_utils::{validate_wgsl, FULLSCREEN_VERTEX_WGSL, NOISE_WGSL, RANDOM_WGSL};
use crate::UniformBlock;

/// Uniforms of the position shader.
#[derive(UniformBlock, Debug, Clone, Copy, PartialEq, Default)]
#[wgsl(name = "SimParams")]
pub struct SimParams {
    /// Frame number after the increment of this step.
    pub frame: f32,
    /// Noise excitation in `[0, 1]`.
    pub noise_mix: f32,
    /// Accumulated frame time in seconds.
    pub time: f32,
    /// Frame time of this step in seconds.
    pub delta_time: f32,
    /// Pointer position, NDC.
    pub mouse_pos: Vec2,
    /// Pointer position at the previous frame, NDC.
    pub prev_mouse_pos: Vec2,
}

/// Where a pass is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// Compiled, never stepped.
    Ready,
    /// Stepped at least once.
    Stepping,
}

/// Full-screen pass advancing the particle state by one frame.
pub struct PositionPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    // Keyed by the slot they read from
    bind_groups: PingPong<wgpu::BindGroup>,
    parity: FrameParity,
    noise_mix: NoiseMix,
    time: f32,
    params: SimParams,
    state: PassState,
}

impl PositionPass {
    /// Compile the shader and prebuild one bind group per pair member.
    pub fn new(
        ctx: &GpuContext,
        targets: &RenderTargetPair,
        initial: &DataTexture,
        default: &DataTexture,
        noise_mix: NoiseMix,
    ) -> Result<Self, InitError> {
        let shader_src = generate_shader();
        validate_wgsl(&shader_src, "Position")?;

        let device = &ctx.device;
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sim Params Buffer"),
            size: SimParams::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Position Bind Group Layout"),
            entries: &[
                state_texture_entry(0, wgpu::ShaderStages::FRAGMENT),
                state_texture_entry(1, wgpu::ShaderStages::FRAGMENT),
                state_texture_entry(2, wgpu::ShaderStages::FRAGMENT),
                uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let pipeline = ctx.validated("Position", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Position Shader"),
                source: wgpu::ShaderSource::Wgsl(shader_src.into()),
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Position Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Position Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_fullscreen"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: targets.format(),
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let bind_groups = PingPong::from_fn(|slot| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Position Bind Group"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&targets.get(slot).view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&initial.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&default.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            })
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_groups,
            parity: FrameParity::new(),
            params: SimParams {
                noise_mix: noise_mix.value(),
                ..Default::default()
            },
            noise_mix,
            time: 0.0,
            state: PassState::Ready,
        })
    }

    /// Record one simulation step.
    ///
    /// Advances the frame parity, updates the noise mix from the pointer
    /// delta, uploads the uniforms and draws into the write target. Returns
    /// the parity of this step. Call at most once per queue submission: the
    /// uniform buffer holds a single frame's values.
    pub fn step(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargetPair,
        dt: f32,
        pointer: &PointerState,
    ) -> FrameParity {
        let frame = self.parity.advance();
        let (_, write) = targets.targets(self.parity);
        let bind_group = self.bind_groups.get(self.parity.read_slot());

        self.time += dt;
        let noise_mix = self.noise_mix.update(pointer.delta, dt);
        self.params = SimParams {
            frame: frame as f32,
            noise_mix,
            time: self.time,
            delta_time: dt,
            mouse_pos: pointer.position,
            prev_mouse_pos: pointer.prev_position,
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.params.to_gpu()));

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Position Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &write.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.state = PassState::Stepping;
        self.parity
    }

    /// Current frame parity.
    pub fn parity(&self) -> FrameParity {
        self.parity
    }

    /// Uniform values of the last step.
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Current noise mix.
    pub fn noise_mix(&self) -> f32 {
        self.noise_mix.value()
    }

    /// Lifecycle state.
    pub fn state(&self) -> PassState {
        self.state
    }

    /// Release the uniform buffer and drop the pipeline and bind groups.
    pub fn dispose(self) {
        self.uniform_buffer.destroy();
    }
}

/// WGSL for the position pass.
pub fn generate_shader() -> String {
    format!(
        r#"{sim_params}

{random}
{noise}
{fullscreen}
@group(0) @binding(0)
var position_texture: texture_2d<f32>;
@group(0) @binding(1)
var initial_texture: texture_2d<f32>;
@group(0) @binding(2)
var default_texture: texture_2d<f32>;
@group(0) @binding(3)
var<uniform> params: SimParams;

const NOISE_SCALE: f32 = 2.5;
const NOISE_AMPLITUDE: f32 = 0.08;
const NOISE_SPEED: f32 = 0.35;
const POINTER_RADIUS: f32 = 0.25;
const POINTER_PUSH: f32 = 0.05;
const POINTER_DRAG: f32 = 0.6;
// Fraction of the remaining distance covered per 1/60 s
const EASING: f32 = 0.1;

@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {{
    let texel = vec2<i32>(in.clip_position.xy);
    let previous = textureLoad(position_texture, texel, 0);
    let rest = textureLoad(default_texture, texel, 0);
    let phase = textureLoad(initial_texture, texel, 0).w;

    // Padding texels hold no particle and stay zero
    if (rest.w == 0.0) {{
        return vec4<f32>(0.0);
    }}

    var current = previous.xyz;
    if (params.frame <= 1.0 || previous.w == 0.0) {{
        current = rest.xyz;
    }}

    let t = params.time * NOISE_SPEED + phase * 6.2831853;
    let p = rest.xyz * NOISE_SCALE;
    let drift = vec3<f32>(
        noise3(p + vec3<f32>(t, 0.0, 0.0)),
        noise3(p + vec3<f32>(0.0, t, 17.0)),
        noise3(p + vec3<f32>(31.0, 0.0, t))
    );
    var goal = rest.xyz + drift * NOISE_AMPLITUDE * params.noise_mix;

    let to_particle = current.xy - params.mouse_pos;
    let dist = length(to_particle);
    if (dist < POINTER_RADIUS) {{
        let falloff = 1.0 - dist / POINTER_RADIUS;
        let motion = params.mouse_pos - params.prev_mouse_pos;
        var away = vec2<f32>(0.0);
        if (dist > 0.00001) {{
            away = to_particle / dist;
        }}
        goal += vec3<f32>((away * POINTER_PUSH + motion * POINTER_DRAG) * falloff, 0.0);
    }}

    let k = 1.0 - pow(1.0 - EASING, params.delta_time * 60.0);
    return vec4<f32>(mix(current, goal, k), 1.0);
}}
"#,
        sim_params = SimParams::WGSL_STRUCT,
        random = RANDOM_WGSL,
        noise = NOISE_WGSL,
        fullscreen = FULLSCREEN_VERTEX_WGSL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_validates() {
        validate_wgsl(&generate_shader(), "Position").unwrap();
    }

    #[test]
    fn test_sim_params_layout() {
        assert_eq!(SimParams::SIZE, 32);
        assert_eq!(std::mem::size_of::<SimParamsGpu>(), 32);
        assert!(SimParams::WGSL_STRUCT.starts_with("struct SimParams {"));
    }

    #[test]
    fn test_sim_params_to_gpu() {
        let params = SimParams {
            frame: 3.0,
            noise_mix: 0.5,
            time: 1.25,
            delta_time: 0.016,
            mouse_pos: Vec2::new(0.1, -0.2),
            prev_mouse_pos: Vec2::new(0.0, 0.3),
        };
        let gpu = params.to_gpu();
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&gpu));
        assert_eq!(floats, &[3.0, 0.5, 1.25, 0.016, 0.1, -0.2, 0.0, 0.3]);
    }

    #[test]
    fn test_shader_starts_from_rest_on_first_frame() {
        let src = generate_shader();
        assert!(src.contains("params.frame <= 1.0 || previous.w == 0.0"));
        assert!(src.contains("return vec4<f32>(mix(current, goal, k), 1.0);"));
    }
}
