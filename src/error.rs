//! Error types for RTPS.
//!
//! Three families of failure exist, matching the lifecycle of a simulation:
//!
//! - [`ConfigError`] - invalid particle counts or texture dimensions, detected
//!   before any GPU resource is allocated
//! - [`InitError`] - shader compilation, unsupported float formats and other
//!   GPU-side construction failures
//! - [`SimulationError`] - what the per-frame API reports, including context loss
//!
//! None of these are retried anywhere in the crate.

use std::fmt;

/// Errors that can occur while acquiring a GPU device.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to map buffer for reading.
    BufferMapping(String),
    /// Read-back of this texture format is not supported.
    UnsupportedReadback(wgpu::TextureFormat),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
            GpuError::UnsupportedReadback(format) => {
                write!(f, "Cannot read back textures of format {:?}", format)
            }
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Invalid sizes, counts or configuration values.
///
/// Always raised before GPU allocation, never clamped.
#[derive(Debug)]
pub enum ConfigError {
    /// The derived particle count is zero.
    ZeroParticles,
    /// A texture is too small (or the wrong size) for the particle layout.
    TextureSizeMismatch {
        /// Side length the layout requires.
        expected: u32,
        /// Side length that was supplied.
        actual: u32,
    },
    /// Seed positions do not match the particle count.
    SeedCountMismatch {
        /// Particle count.
        expected: usize,
        /// Number of seeds supplied.
        actual: usize,
    },
    /// A particle index does not address a texel of the texture.
    IndexOutOfRange {
        /// Requested index.
        index: u32,
        /// Texture side length.
        size: u32,
    },
    /// The scene grid or a tuning value is invalid.
    InvalidScene(String),
    /// Failed to read a configuration file.
    Io(std::io::Error),
    /// Failed to parse a configuration file.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroParticles => write!(f, "Particle count must be greater than zero"),
            ConfigError::TextureSizeMismatch { expected, actual } => write!(
                f,
                "Texture size mismatch: layout needs {expected}x{expected}, got {actual}x{actual}"
            ),
            ConfigError::SeedCountMismatch { expected, actual } => write!(
                f,
                "Expected {expected} seed positions, got {actual}"
            ),
            ConfigError::IndexOutOfRange { index, size } => write!(
                f,
                "Particle index {index} is outside a {size}x{size} texture"
            ),
            ConfigError::InvalidScene(msg) => write!(f, "Invalid scene configuration: {}", msg),
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Fatal failures while building GPU resources for a simulation.
#[derive(Debug)]
pub enum InitError {
    /// WGSL failed naga validation or wgpu module/pipeline creation.
    ShaderCompilation {
        /// Which program failed (e.g. "Position").
        stage: &'static str,
        /// Compiler output.
        message: String,
    },
    /// The adapter cannot render to or sample from the float format.
    UnsupportedFormat(wgpu::TextureFormat),
    /// The position texture exceeds the device's 2D texture limit.
    TextureTooLarge {
        /// Requested side length.
        size: u32,
        /// Device limit.
        max: u32,
    },
    /// Device acquisition failed.
    Gpu(GpuError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::ShaderCompilation { stage, message } => {
                write!(f, "{} shader failed to compile: {}", stage, message)
            }
            InitError::UnsupportedFormat(format) => write!(
                f,
                "Texture format {:?} cannot be used as a render target on this GPU",
                format
            ),
            InitError::TextureTooLarge { size, max } => write!(
                f,
                "Position texture of {size}x{size} exceeds the device limit of {max}"
            ),
            InitError::Gpu(e) => write!(f, "GPU error: {}", e),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::Gpu(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpuError> for InitError {
    fn from(e: GpuError) -> Self {
        InitError::Gpu(e)
    }
}

/// Errors surfaced by the simulation API.
#[derive(Debug)]
pub enum SimulationError {
    /// Invalid configuration.
    Config(ConfigError),
    /// GPU resources could not be created.
    Init(InitError),
    /// The GPU device was lost; the simulation must be rebuilt from scratch.
    ContextLost(String),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(e) => write!(f, "Configuration error: {}", e),
            SimulationError::Init(e) => write!(f, "Initialization failed: {}", e),
            SimulationError::ContextLost(reason) => write!(f, "GPU context lost: {}", reason),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Config(e) => Some(e),
            SimulationError::Init(e) => Some(e),
            SimulationError::ContextLost(_) => None,
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

impl From<InitError> for SimulationError {
    fn from(e: InitError) -> Self {
        SimulationError::Init(e)
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Init(InitError::Gpu(e))
    }
}

/// Errors that can occur when running the demo window.
#[derive(Debug)]
pub enum AppError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// The simulation failed.
    Simulation(SimulationError),
    /// The window surface ran out of memory.
    SurfaceOutOfMemory,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            AppError::Window(e) => write!(f, "Failed to create window: {}", e),
            AppError::Simulation(e) => write!(f, "{}", e),
            AppError::SurfaceOutOfMemory => write!(f, "Surface out of memory"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::EventLoop(e) => Some(e),
            AppError::Window(e) => Some(e),
            AppError::Simulation(e) => Some(e),
            AppError::SurfaceOutOfMemory => None,
        }
    }
}

impl From<winit::error::EventLoopError> for AppError {
    fn from(e: winit::error::EventLoopError) -> Self {
        AppError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for AppError {
    fn from(e: winit::error::OsError) -> Self {
        AppError::Window(e)
    }
}

impl From<SimulationError> for AppError {
    fn from(e: SimulationError) -> Self {
        AppError::Simulation(e)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Simulation(SimulationError::Config(e))
    }
}
