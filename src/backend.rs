// ============================================================================
// backend.rs — GpuFlock
// GPU buffer backend seam and its wgpu implementation, plus device bring-up.
// ============================================================================

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::error::FlockError;

/// What a buffer is used for; decides the usage flags it is created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferRole {
    /// Per-boid records, written by the kernel and read by the boid material.
    Agents,
    /// Obstacle records, written by the host and read by the kernel.
    Obstacles,
    /// The five-field indirect draw descriptor.
    IndirectArgs,
}

impl BufferRole {
    pub fn usages(self) -> wgpu::BufferUsages {
        match self {
            BufferRole::Agents | BufferRole::Obstacles => {
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST
            }
            BufferRole::IndirectArgs => {
                wgpu::BufferUsages::INDIRECT
                    | wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
            }
        }
    }
}

/// Minimal buffer interface the simulation core needs from a GPU.
///
/// There is deliberately no read-back operation: buffer contents stay on
/// the device for the whole run.
pub trait GpuBackend: Clone {
    type Buffer;

    /// Allocate a buffer sized exactly to `contents` and upload them.
    fn create_buffer(&self, role: BufferRole, label: &str, contents: &[u8]) -> Self::Buffer;

    /// Overwrite the buffer from offset 0. `contents` never exceeds its size.
    fn write_buffer(&self, buffer: &Self::Buffer, contents: &[u8]);

    /// Free the device memory behind `buffer`.
    fn destroy_buffer(&self, buffer: Self::Buffer);

    /// Limits of the device the buffers live on.
    fn limits(&self) -> wgpu::Limits;
}

// ======================== wgpu ========================

/// Shared handles to the wgpu device and queue.
#[derive(Clone)]
pub struct WgpuBackend {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuBackend for WgpuBackend {
    type Buffer = wgpu::Buffer;

    fn create_buffer(&self, role: BufferRole, label: &str, contents: &[u8]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: role.usages(),
            })
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, contents: &[u8]) {
        self.queue.write_buffer(buffer, 0, contents);
    }

    fn destroy_buffer(&self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }
}

impl WgpuBackend {
    /// Pick an adapter (compatible with `surface` when given) and open a device.
    pub async fn request(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<(Self, wgpu::Adapter), FlockError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(FlockError::NoAdapter)?;

        log::info!("GPU: {} ({:?})", adapter.get_info().name, adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("gpu_flock_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let backend = WgpuBackend {
            device: Arc::new(device),
            queue: Arc::new(queue),
        };
        Ok((backend, adapter))
    }
}

pub fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}
