//! Diagnostics read-back of float textures.
//!
//! Blocks until the GPU has finished all submitted work. Intended for tests
//! and debugging; the per-frame path never reads back.

use crate::error::GpuError;
use crate::gpu::GpuContext;
use crate::layout::PositionData;

/// Copy a square `Rgba32Float` texture back to the CPU.
pub fn read_rgba32f(ctx: &GpuContext, texture: &wgpu::Texture) -> Result<PositionData, GpuError> {
    if texture.format() != wgpu::TextureFormat::Rgba32Float {
        return Err(GpuError::UnsupportedReadback(texture.format()));
    }
    let width = texture.width();
    let height = texture.height();
    if width != height {
        return Err(GpuError::BufferMapping(format!(
            "expected a square texture, got {}x{}",
            width, height
        )));
    }

    // Rows of a texture-to-buffer copy must be 256-byte aligned
    let texel_bytes = 16;
    let unpadded_row = width * texel_bytes;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let bytes_per_row = unpadded_row.div_ceil(align) * align;

    let staging_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size: bytes_per_row as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = ctx.device.poll(wgpu::Maintain::Wait);

    rx.recv()
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

    let texels = {
        let data = buffer_slice.get_mapped_range();
        let mut texels = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            let start = (row * bytes_per_row) as usize;
            let end = start + unpadded_row as usize;
            let row_floats: &[f32] = bytemuck::cast_slice(&data[start..end]);
            texels.extend(row_floats.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]));
        }
        texels
    };
    staging_buffer.unmap();
    staging_buffer.destroy();

    PositionData::from_texels(width, texels)
        .map_err(|e| GpuError::BufferMapping(e.to_string()))
}
