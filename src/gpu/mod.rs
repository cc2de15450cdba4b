//! GPU plumbing: device context, render targets and the shader passes.
//!
//! [`GpuContext`] owns the wgpu device. Everything else borrows it, so a
//! simulation can be built against a window surface or a headless device
//! with the same code.

pub mod camera;
pub mod particle_pass;
pub mod pass_through;
pub mod position_pass;
pub mod readback;
pub mod render_targets;
pub mod textures;

use std::sync::{Arc, OnceLock};

use winit::window::Window;

use crate::error::{GpuError, InitError, SimulationError};

pub use camera::Camera;
pub use particle_pass::ParticlePass;
pub use pass_through::PassThrough;
pub use position_pass::PositionPass;
pub use render_targets::{RenderTarget, RenderTargetPair};

/// Device-lost flag shared with the wgpu callback.
///
/// The first reason recorded wins; later reports are ignored.
#[derive(Debug, Clone, Default)]
pub struct DeviceLoss {
    reason: Arc<OnceLock<String>>,
}

impl DeviceLoss {
    /// A flag that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the device is gone.
    pub fn mark(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
    }

    /// Why the device was lost, if it was.
    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }

    /// `Err(ContextLost)` once the flag has fired.
    pub fn check(&self) -> Result<(), SimulationError> {
        match self.reason() {
            Some(reason) => Err(SimulationError::ContextLost(reason.to_string())),
            None => Ok(()),
        }
    }
}

/// The wgpu device and everything needed to create resources on it.
pub struct GpuContext {
    /// wgpu instance.
    pub instance: wgpu::Instance,
    /// Selected adapter.
    pub adapter: wgpu::Adapter,
    /// Logical device.
    pub device: wgpu::Device,
    /// Submission queue.
    pub queue: wgpu::Queue,
    loss: DeviceLoss,
}

impl GpuContext {
    /// Create a context without a surface, for offscreen use and tests.
    pub fn headless() -> Result<Self, GpuError> {
        pollster::block_on(Self::new_async(None))
    }

    /// Create a context that can present to `window`.
    pub fn with_window(window: Arc<Window>) -> Result<(Self, wgpu::Surface<'static>), GpuError> {
        pollster::block_on(async {
            let instance = Self::create_instance();
            let surface = instance.create_surface(window)?;
            let ctx = Self::from_instance(instance, Some(&surface)).await?;
            Ok::<_, GpuError>((ctx, surface))
        })
    }

    async fn new_async(surface: Option<&wgpu::Surface<'static>>) -> Result<Self, GpuError> {
        Self::from_instance(Self::create_instance(), surface).await
    }

    fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        })
    }

    async fn from_instance(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'static>>,
    ) -> Result<Self, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        log::info!("Using GPU: {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("RTPS Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let loss = DeviceLoss::new();
        let loss_flag = loss.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::error!("GPU device lost ({:?}): {}", reason, message);
            loss_flag.mark(format!("{:?}: {}", reason, message));
        });

        // Per-frame validation failures are reported, not fatal
        device.on_uncaptured_error(Box::new(|err| {
            log::error!("Uncaptured wgpu error: {}", err);
        }));

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            loss,
        })
    }

    /// Device-lost flag of this context.
    pub fn loss(&self) -> &DeviceLoss {
        &self.loss
    }

    /// `Err(ContextLost)` if the device has been lost.
    pub fn check_lost(&self) -> Result<(), SimulationError> {
        self.loss.check()
    }

    /// Fail unless `format` can be both rendered to and sampled.
    pub fn check_render_format(&self, format: wgpu::TextureFormat) -> Result<(), InitError> {
        let required =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let features = self.adapter.get_texture_format_features(format);
        if features.allowed_usages.contains(required) {
            Ok(())
        } else {
            log::error!("Texture format {:?} is not renderable on this adapter", format);
            Err(InitError::UnsupportedFormat(format))
        }
    }

    /// Fail if a square texture of side `size` exceeds the device limit.
    pub fn check_texture_size(&self, size: u32) -> Result<(), InitError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if size > max {
            log::error!("Position texture {}x{} exceeds device limit {}", size, size, max);
            return Err(InitError::TextureTooLarge { size, max });
        }
        Ok(())
    }

    /// Surface configuration for a window of the given size.
    ///
    /// Prefers an sRGB format, like the rest of the pipeline expects.
    pub fn surface_config(
        &self,
        surface: &wgpu::Surface<'_>,
        width: u32,
        height: u32,
    ) -> wgpu::SurfaceConfiguration {
        let surface_caps = surface.get_capabilities(&self.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    /// Run `f` inside a validation error scope.
    ///
    /// Shader module and pipeline creation report errors asynchronously in
    /// wgpu; the scope turns them into an [`InitError`] for `stage`.
    pub fn validated<T>(
        &self,
        stage: &'static str,
        f: impl FnOnce(&wgpu::Device) -> T,
    ) -> Result<T, InitError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => {
                log::error!("{} shader failed: {}", stage, err);
                Err(InitError::ShaderCompilation {
                    stage,
                    message: err.to_string(),
                })
            }
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_loss_starts_clear() {
        let loss = DeviceLoss::new();
        assert!(loss.reason().is_none());
        assert!(loss.check().is_ok());
    }

    #[test]
    fn test_device_loss_is_shared_and_sticky() {
        let loss = DeviceLoss::new();
        let callback_side = loss.clone();
        callback_side.mark("Destroyed: device destroyed");
        callback_side.mark("second report");

        assert_eq!(loss.reason(), Some("Destroyed: device destroyed"));
        match loss.check() {
            Err(SimulationError::ContextLost(reason)) => {
                assert!(reason.contains("Destroyed"));
            }
            other => panic!("expected context loss, got {other:?}"),
        }
    }
}
