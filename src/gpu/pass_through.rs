//! Full-screen texture copy.
//!
//! Draws one triangle over the output target with a fragment shader that
//! reads the input texel at the same integer coordinate. Used to seed both
//! ping-pong targets from the default position texture, which also converts
//! from `Rgba32Float` to the target format when they differ.

use crate::error::InitError;
use crate::gpu::textures::state_texture_entry;
use crate::gpu::{GpuContext, RenderTarget};
use crate::shader_utils::{validate_wgsl, FULLSCREEN_VERTEX_WGSL};

/// Copy pipeline for one output format.
pub struct PassThrough {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
}

impl PassThrough {
    /// Build the copy pipeline writing `format`.
    pub fn new(ctx: &GpuContext, format: wgpu::TextureFormat) -> Result<Self, InitError> {
        let shader_src = generate_shader();
        validate_wgsl(&shader_src, "PassThrough")?;

        let (pipeline, bind_group_layout) = ctx.validated("PassThrough", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Pass-Through Shader"),
                source: wgpu::ShaderSource::Wgsl(shader_src.into()),
            });

            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Pass-Through Bind Group Layout"),
                entries: &[state_texture_entry(0, wgpu::ShaderStages::FRAGMENT)],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Pass-Through Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Pass-Through Pipeline"),
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
                        format,
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
            });

            (pipeline, bind_group_layout)
        })?;

        Ok(Self {
            pipeline,
            bind_group_layout,
            format,
        })
    }

    /// Output format of this pipeline.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Record a copy of `input` into `output`.
    ///
    /// `input` must be at least as large as `output`.
    pub fn copy(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::TextureView,
        output: &RenderTarget,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Pass-Through Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(input),
            }],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Pass-Through Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &output.view,
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
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// WGSL for the copy pass.
pub fn generate_shader() -> String {
    format!(
        r#"{FULLSCREEN_VERTEX_WGSL}
@group(0) @binding(0)
var input_texture: texture_2d<f32>;

@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {{
    return textureLoad(input_texture, vec2<i32>(in.clip_position.xy), 0);
}}
"#
    )
}
