//! Demo driver: one window, one simulation, one redraw per frame.
//!
//! The drawable region is the largest centered square that fits the window.
//! Left-drag orbits the camera, the scroll wheel zooms, and plain pointer
//! movement excites the particles.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::Config;
use crate::error::{AppError, SimulationError};
use crate::gpu::{Camera, GpuContext};
use crate::pointer::Pointer;
use crate::simulation::{FrameInput, ParticleSimulation};
use crate::time::Time;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.05,
    a: 1.0,
};

/// Largest centered square inside a `width x height` window.
///
/// Returns `(x, y, side)` in physical pixels.
pub fn square_viewport(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height);
    ((width - side) / 2, (height - side) / 2, side)
}

/// Everything that exists only while a window is open.
struct RenderState {
    window: Arc<Window>,
    ctx: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    simulation: ParticleSimulation,
    region: (u32, u32, u32),
}

impl RenderState {
    fn new(window: Arc<Window>, config: &Config) -> Result<Self, AppError> {
        let size = window.inner_size();
        let (ctx, surface) = GpuContext::with_window(window.clone()).map_err(SimulationError::from)?;
        let surface_config = ctx.surface_config(&surface, size.width, size.height);
        surface.configure(&ctx.device, &surface_config);

        let simulation = ParticleSimulation::new(
            &ctx,
            config,
            config.scene.num_points(),
            surface_config.format,
        )?;

        let mut state = Self {
            window,
            ctx,
            surface,
            surface_config,
            simulation,
            region: (0, 0, 1),
        };
        state.resize(size.width, size.height);
        Ok(state)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.ctx.device, &self.surface_config);

        self.region = square_viewport(width, height);
        let side = self.region.2;
        self.simulation.resize(side, side);
    }

    fn render(&mut self, input: &FrameInput) -> Result<(), RenderError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.simulation.step(&self.ctx, &mut encoder, input)?;

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let (x, y, side) = self.region;
            pass.set_viewport(x as f32, y as f32, side as f32, side as f32, 0.0, 1.0);
            self.simulation.draw(&mut pass);
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

enum RenderError {
    Surface(wgpu::SurfaceError),
    Simulation(SimulationError),
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(e: wgpu::SurfaceError) -> Self {
        RenderError::Surface(e)
    }
}

impl From<SimulationError> for RenderError {
    fn from(e: SimulationError) -> Self {
        RenderError::Simulation(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceRecovery {
    Reconfigure,
    SkipFrame,
    Fatal,
}

fn surface_recovery(err: &wgpu::SurfaceError) -> SurfaceRecovery {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceRecovery::Reconfigure,
        wgpu::SurfaceError::OutOfMemory => SurfaceRecovery::Fatal,
        _ => SurfaceRecovery::SkipFrame,
    }
}

/// winit application running a single simulation.
pub struct App {
    config: Config,
    state: Option<RenderState>,
    pointer: Pointer,
    time: Time,
    camera: Camera,
    dragging: bool,
    last_drag_pos: Option<(f64, f64)>,
    error: Option<AppError>,
}

impl App {
    /// Create an app for `config`. Nothing is opened until the event loop
    /// resumes.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
            pointer: Pointer::default(),
            time: Time::new(),
            camera: Camera::new(),
            dragging: false,
            last_drag_pos: None,
            error: None,
        }
    }

    /// Open a window and run until it is closed.
    pub fn run(config: Config) -> Result<(), AppError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App::new(config);
        event_loop.run_app(&mut app)?;

        match app.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{}", err);
        self.error = Some(err);
        self.teardown();
        event_loop.exit();
    }

    fn teardown(&mut self) {
        if let Some(state) = self.state.take() {
            state.simulation.destroy();
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &mut self.state else {
            return;
        };

        let dt = self.time.update();
        let input = FrameInput {
            dt,
            pointer: self.pointer.frame(),
        };
        state.simulation.set_view_proj(self.camera.view_proj(1.0));

        match state.render(&input) {
            Ok(()) => {}
            Err(RenderError::Surface(e)) => match surface_recovery(&e) {
                SurfaceRecovery::Reconfigure => {
                    let (w, h) = (state.surface_config.width, state.surface_config.height);
                    state.resize(w, h);
                }
                SurfaceRecovery::SkipFrame => log::warn!("Surface error: {:?}", e),
                SurfaceRecovery::Fatal => {
                    self.fail(event_loop, AppError::SurfaceOutOfMemory);
                    return;
                }
            },
            Err(RenderError::Simulation(e)) => {
                self.fail(event_loop, e.into());
                return;
            }
        }

        if self.time.frame() % 120 == 0 {
            state
                .window
                .set_title(&format!("RTPS - {:.0} fps", self.time.fps()));
        }
        state.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("RTPS - Render-Target Particle Simulation")
            .with_inner_size(winit::dpi::LogicalSize::new(900, 900));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match RenderState::new(window, &self.config) {
            Ok(state) => {
                let (x, y, side) = state.region;
                self.pointer.set_region(x as f32, y as f32, side, side);
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.pointer.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                self.teardown();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(state) = &mut self.state {
                    state.resize(physical_size.width, physical_size.height);
                    let (x, y, side) = state.region;
                    self.pointer.set_region(x as f32, y as f32, side, side);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.dragging = state == ElementState::Pressed;
                    if !self.dragging {
                        self.last_drag_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.dragging {
                    if let Some((last_x, last_y)) = self.last_drag_pos {
                        let dx = (position.x - last_x) as f32;
                        let dy = (position.y - last_y) as f32;
                        self.camera.orbit(-dx * 0.005, dy * 0.005);
                    }
                    self.last_drag_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                self.camera.distance = (self.camera.distance - scroll * 0.3).clamp(0.5, 20.0);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_viewport_landscape() {
        assert_eq!(square_viewport(1280, 720), (280, 0, 720));
    }

    #[test]
    fn test_square_viewport_portrait() {
        assert_eq!(square_viewport(600, 1000), (0, 200, 600));
    }

    #[test]
    fn test_square_viewport_square() {
        assert_eq!(square_viewport(512, 512), (0, 0, 512));
    }

    #[test]
    fn test_surface_recovery() {
        use wgpu::SurfaceError;

        assert_eq!(surface_recovery(&SurfaceError::Lost), SurfaceRecovery::Reconfigure);
        assert_eq!(surface_recovery(&SurfaceError::Outdated), SurfaceRecovery::Reconfigure);
        assert_eq!(surface_recovery(&SurfaceError::Timeout), SurfaceRecovery::SkipFrame);
        assert_eq!(surface_recovery(&SurfaceError::OutOfMemory), SurfaceRecovery::Fatal);
    }

    #[test]
    fn test_out_of_memory_is_an_app_error() {
        let err = AppError::SurfaceOutOfMemory;
        assert_eq!(err.to_string(), "Surface out of memory");
        assert!(std::error::Error::source(&err).is_none());
    }
}
