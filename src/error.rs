// ============================================================================
// error.rs — GpuFlock
// Error type for configuration loading and GPU bring-up.
// ============================================================================

use thiserror::Error;

/// Failures that can stop the program before the simulation starts.
///
/// The simulation core itself never produces these: once running it
/// degrades to "nothing visible happens" instead of failing.
#[derive(Debug, Error)]
pub enum FlockError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid command line: {0}")]
    Usage(String),

    #[error("no compatible GPU adapter found (Vulkan, Metal, DX12 or GL required)")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}
