//! The particle render pass.
//!
//! Draws one camera-facing quad per particle with a single instanced draw.
//! Nothing about particle positions lives in vertex buffers: each instance
//! carries the UV of its texel, and the vertex shader fetches the simulated
//! position from the texture the position pass just wrote.
//!
//! Vertex inputs:
//!
//! | Slot | Step | Location | Content |
//! |------|------|----------|---------|
//! | 0 | vertex | 0 | quad corner, `Float32x2` |
//! | 1 | instance | 1 | grid offset, `Float32x3` |
//! | 2 | instance | 2 | texel UV, `Float32x2` |

use glam::{Mat4, Vec2, Vec4};
use wgpu::util::DeviceExt;

use crate::error::InitError;
use crate::gpu::textures::{
    linear_sampler, nearest_sampler, state_texture_entry, uniform_entry, DataTexture,
};
use crate::gpu::position_pass::SimParams;
use crate::gpu::{GpuContext, RenderTargetPair};
use crate::layout::ParticleLayout;
use crate::ping_pong::{FrameParity, PingPong};
use crate::shader_utils::validate_wgsl;
use crate::UniformBlock;

const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const OFFSET_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];
const UV_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x2];

/// Uniforms of the particle shader.
#[derive(UniformBlock, Debug, Clone, Copy, PartialEq)]
#[wgsl(name = "RenderParams")]
pub struct RenderParams {
    /// Camera projection times view.
    pub view_proj: Mat4,
    /// Direction towards the light, `w` unused.
    pub light_dir: Vec4,
    /// Pointer position, NDC.
    pub mouse_pos: Vec2,
    /// Pointer position at the previous frame, NDC.
    pub prev_mouse_pos: Vec2,
    /// Scene grid size `(width, height)`.
    pub grid_size: Vec2,
    /// Color target size in pixels.
    pub viewport: Vec2,
    /// Accumulated frame time in seconds.
    pub time: f32,
    /// Noise excitation in `[0, 1]`.
    pub noise_mix: f32,
    /// Quad half-size in clip units at unit depth.
    pub particle_size: f32,
}

impl RenderParams {
    fn new(grid_size: (u32, u32), particle_size: f32) -> Self {
        Self {
            view_proj: Mat4::IDENTITY,
            light_dir: Vec4::new(0.4, 0.6, 1.0, 0.0),
            mouse_pos: Vec2::ZERO,
            prev_mouse_pos: Vec2::ZERO,
            grid_size: Vec2::new(grid_size.0 as f32, grid_size.1 as f32),
            viewport: Vec2::ONE,
            time: 0.0,
            noise_mix: 1.0,
            particle_size,
        }
    }
}

/// Instanced particle renderer.
pub struct ParticlePass {
    pipeline: wgpu::RenderPipeline,
    quad_vertex_buffer: wgpu::Buffer,
    quad_index_buffer: wgpu::Buffer,
    offset_buffer: wgpu::Buffer,
    uv_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    // Keyed by the slot they read from
    state_bind_groups: PingPong<wgpu::BindGroup>,
    mouse_layout: wgpu::BindGroupLayout,
    mouse_sampler: wgpu::Sampler,
    mouse_fallback: DataTexture,
    mouse_bind_group: wgpu::BindGroup,
    instance_count: u32,
    params: RenderParams,
}

impl ParticlePass {
    /// Build the pipeline and the per-instance attribute buffers.
    pub fn new(
        ctx: &GpuContext,
        layout: &ParticleLayout,
        targets: &RenderTargetPair,
        color_format: wgpu::TextureFormat,
        particle_size: f32,
    ) -> Result<Self, InitError> {
        let shader_src = generate_shader();
        validate_wgsl(&shader_src, "Particle")?;

        let device = &ctx.device;

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Quad Vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Quad Indices"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let offset_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Offsets"),
            contents: bytemuck::cast_slice(layout.offsets()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uv_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Texel UVs"),
            contents: bytemuck::cast_slice(layout.texel_uvs()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let params = RenderParams::new(layout.grid_size(), particle_size);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Render Params Buffer"),
            contents: bytemuck::bytes_of(&params.to_gpu()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let state_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle State Bind Group Layout"),
            entries: &[
                state_texture_entry(0, wgpu::ShaderStages::VERTEX),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
                uniform_entry(2, wgpu::ShaderStages::VERTEX_FRAGMENT),
            ],
        });

        let mouse_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Mouse Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline = ctx.validated("Particle", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Particle Shader"),
                source: wgpu::ShaderSource::Wgsl(shader_src.into()),
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Particle Pipeline Layout"),
                bind_group_layouts: &[&state_layout, &mouse_layout],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Particle Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[
                        wgpu::VertexBufferLayout {
                            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &QUAD_ATTRIBUTES,
                        },
                        wgpu::VertexBufferLayout {
                            array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                            step_mode: wgpu::VertexStepMode::Instance,
                            attributes: &OFFSET_ATTRIBUTES,
                        },
                        wgpu::VertexBufferLayout {
                            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                            step_mode: wgpu::VertexStepMode::Instance,
                            attributes: &UV_ATTRIBUTES,
                        },
                    ],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: Some(additive_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let state_sampler = nearest_sampler(device, "Particle State Sampler");
        let state_bind_groups = PingPong::from_fn(|slot| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Particle State Bind Group"),
                layout: &state_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&targets.get(slot).view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&state_sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            })
        });

        let mouse_sampler = linear_sampler(device, "Mouse Sampler");
        let mouse_fallback = DataTexture::mouse_fallback(device, &ctx.queue);
        let mouse_bind_group =
            create_mouse_bind_group(device, &mouse_layout, &mouse_fallback.view, &mouse_sampler);

        Ok(Self {
            pipeline,
            quad_vertex_buffer,
            quad_index_buffer,
            offset_buffer,
            uv_buffer,
            uniform_buffer,
            state_bind_groups,
            mouse_layout,
            mouse_sampler,
            mouse_fallback,
            mouse_bind_group,
            instance_count: layout.particle_count(),
            params,
        })
    }

    /// Use `view` as the mouse-position texture, or the black fallback for
    /// `None`. Call when the compositor's texture changes.
    ///
    /// The view must be a filterable float 2D texture.
    pub fn set_mouse_texture(&mut self, device: &wgpu::Device, view: Option<&wgpu::TextureView>) {
        let view = view.unwrap_or(&self.mouse_fallback.view);
        self.mouse_bind_group =
            create_mouse_bind_group(device, &self.mouse_layout, view, &self.mouse_sampler);
    }

    /// Set the camera matrix.
    pub fn set_view_proj(&mut self, view_proj: Mat4) {
        self.params.view_proj = view_proj;
    }

    /// Set the color target size in pixels.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.params.viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    }

    /// Copy this frame's simulation values and upload the uniforms.
    pub fn update(&mut self, queue: &wgpu::Queue, sim: &SimParams) {
        self.params.mouse_pos = sim.mouse_pos;
        self.params.prev_mouse_pos = sim.prev_mouse_pos;
        self.params.time = sim.time;
        self.params.noise_mix = sim.noise_mix;
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.params.to_gpu()));
    }

    /// Current uniform values.
    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    /// Number of instances drawn.
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Record the instanced draw, reading the target written at `parity`.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, parity: FrameParity) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.state_bind_groups.get(parity.write_slot()), &[]);
        pass.set_bind_group(1, &self.mouse_bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, self.offset_buffer.slice(..));
        pass.set_vertex_buffer(2, self.uv_buffer.slice(..));
        pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..self.instance_count);
    }

    /// Release all buffers.
    pub fn dispose(self) {
        self.quad_vertex_buffer.destroy();
        self.quad_index_buffer.destroy();
        self.offset_buffer.destroy();
        self.uv_buffer.destroy();
        self.uniform_buffer.destroy();
        self.mouse_fallback.destroy();
    }
}

/// Additive blending: overlapping particles brighten each other.
fn additive_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn create_mouse_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Particle Mouse Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// WGSL for the particle pass.
pub fn generate_shader() -> String {
    format!(
        r#"{render_params}

struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) quad_uv: vec2<f32>,
    @location(1) proximity: f32,
    @location(2) world_pos: vec3<f32>,
}};

@group(0) @binding(0)
var position_texture: texture_2d<f32>;
@group(0) @binding(1)
var position_sampler: sampler;
@group(0) @binding(2)
var<uniform> params: RenderParams;

@group(1) @binding(0)
var mouse_texture: texture_2d<f32>;
@group(1) @binding(1)
var mouse_sampler: sampler;

const AMBIENT: f32 = 0.25;
const SHININESS: f32 = 32.0;
const BASE_COLOR: vec3<f32> = vec3<f32>(0.35, 0.6, 1.0);

@vertex
fn vs_main(
    @location(0) corner: vec2<f32>,
    @location(1) offset: vec3<f32>,
    @location(2) texel_uv: vec2<f32>,
) -> VertexOutput {{
    let state = textureSampleLevel(position_texture, position_sampler, texel_uv, 0.0);
    let grid_uv = offset.xy / params.grid_size;
    let proximity = textureSampleLevel(mouse_texture, mouse_sampler, grid_uv, 0.0).r;

    // Slightly in front of the scene plane
    let center = vec3<f32>(state.xy, state.z + 0.1);
    let clip = params.view_proj * vec4<f32>(center, 1.0);

    let aspect = params.viewport.x / params.viewport.y;
    let half_size = params.particle_size * (1.0 + proximity);
    let billboard = corner * half_size * vec2<f32>(1.0 / aspect, 1.0);

    var out: VertexOutput;
    out.clip_position = clip + vec4<f32>(billboard, 0.0, 0.0);
    out.quad_uv = corner;
    out.proximity = proximity;
    out.world_pos = center;
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let r2 = dot(in.quad_uv, in.quad_uv);
    if (r2 > 1.0) {{
        discard;
    }}

    // Sphere impostor
    let normal = vec3<f32>(in.quad_uv, sqrt(1.0 - r2));
    let light = normalize(params.light_dir.xyz);
    let diffuse = max(dot(normal, light), 0.0);
    let half_dir = normalize(light + vec3<f32>(0.0, 0.0, 1.0));
    let specular = pow(max(dot(normal, half_dir), 0.0), SHININESS);

    let pulse = 0.5 + 0.5 * sin(params.time * 2.0 + in.world_pos.x * 4.0);
    let emission = BASE_COLOR * params.noise_mix * pulse * 0.4 + vec3<f32>(in.proximity);

    let color = BASE_COLOR * (AMBIENT + diffuse) + vec3<f32>(specular) + emission;
    return vec4<f32>(color, 1.0 - r2);
}}
"#,
        render_params = RenderParams::WGSL_STRUCT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_validates() {
        validate_wgsl(&generate_shader(), "Particle").unwrap();
    }

    #[test]
    fn test_render_params_layout() {
        assert_eq!(RenderParams::SIZE, 128);
        assert_eq!(std::mem::size_of::<RenderParamsGpu>(), 128);
        assert!(RenderParams::WGSL_STRUCT.contains("view_proj: mat4x4<f32>,"));
        assert!(RenderParams::WGSL_STRUCT.contains("particle_size: f32,"));
    }

    #[test]
    fn test_render_params_field_offsets() {
        let mut params = RenderParams::new((20, 30), 0.02);
        params.time = 7.0;
        let gpu = params.to_gpu();
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&gpu));
        // view_proj 0..16, light_dir 16..20, mouse 20..22, prev 22..24
        assert_eq!(&floats[24..26], &[20.0, 30.0]);
        assert_eq!(floats[28], 7.0);
        assert_eq!(floats[29], 1.0);
        assert_eq!(floats[30], 0.02);
    }

    #[test]
    fn test_quad_is_two_triangles() {
        assert_eq!(QUAD_VERTICES.len(), 4);
        assert_eq!(QUAD_INDICES.len(), 6);
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < QUAD_VERTICES.len()));
    }
}
