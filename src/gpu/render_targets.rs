//! Ping-pong render targets.
//!
//! Two identically sized float textures, each usable as a color attachment
//! and as a sampled texture. Which one is read and which one is written is
//! decided by [`FrameParity`](crate::ping_pong::FrameParity); this module only
//! owns the memory.

use crate::error::{ConfigError, InitError};
use crate::gpu::GpuContext;
use crate::ping_pong::{FrameParity, PingPong, Slot};

/// One offscreen float color buffer.
pub struct RenderTarget {
    /// GPU texture.
    pub texture: wgpu::Texture,
    /// Default view, used both as attachment and as binding.
    pub view: wgpu::TextureView,
    size: u32,
    format: wgpu::TextureFormat,
}

impl RenderTarget {
    /// Allocate a square target.
    pub fn new(
        device: &wgpu::Device,
        size: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
            format,
        }
    }

    /// Side length in texels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Texture format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

/// The two ping-pong targets of a simulation.
pub struct RenderTargetPair {
    targets: PingPong<RenderTarget>,
    size: u32,
    format: wgpu::TextureFormat,
}

impl RenderTargetPair {
    /// Allocate both targets after checking the format and size against the
    /// device.
    pub fn new(ctx: &GpuContext, size: u32, format: wgpu::TextureFormat) -> Result<Self, InitError> {
        ctx.check_render_format(format)?;
        ctx.check_texture_size(size)?;

        let targets = PingPong::from_fn(|slot| {
            let label = match slot {
                Slot::A => "Position Target A",
                Slot::B => "Position Target B",
            };
            RenderTarget::new(&ctx.device, size, format, label)
        });

        Ok(Self {
            targets,
            size,
            format,
        })
    }

    /// Fail unless both allocated textures are `expected x expected`.
    pub fn ensure_size(&self, expected: u32) -> Result<(), ConfigError> {
        for slot in [Slot::A, Slot::B] {
            check_extent(expected, self.get(slot).texture.size())?;
        }
        Ok(())
    }

    /// Side length of both targets.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Format of both targets.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Borrow one target.
    pub fn get(&self, slot: Slot) -> &RenderTarget {
        self.targets.get(slot)
    }

    /// `(read, write)` for a frame parity.
    pub fn targets(&self, parity: FrameParity) -> (&RenderTarget, &RenderTarget) {
        self.targets.targets(parity)
    }

    /// Release both textures.
    pub fn destroy(self) {
        let (a, b) = self.targets.into_inner();
        a.texture.destroy();
        b.texture.destroy();
    }
}

fn check_extent(expected: u32, extent: wgpu::Extent3d) -> Result<(), ConfigError> {
    let actual = if extent.width != expected {
        extent.width
    } else {
        extent.height
    };
    if actual != expected {
        return Err(ConfigError::TextureSizeMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    #[test]
    fn test_check_extent_accepts_matching_square() {
        assert!(check_extent(10, extent(10, 10)).is_ok());
    }

    #[test]
    fn test_check_extent_rejects_wrong_side() {
        let err = check_extent(7, extent(8, 8)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TextureSizeMismatch {
                expected: 7,
                actual: 8
            }
        ));
    }

    #[test]
    fn test_check_extent_rejects_non_square() {
        let err = check_extent(7, extent(7, 9)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TextureSizeMismatch {
                expected: 7,
                actual: 9
            }
        ));
    }
}
