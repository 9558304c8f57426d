// ============================================================================
// kernel.rs — GpuFlock
// The flock kernel seam: an opaque "advance every boid once" callable, and
// its wgpu compute implementation resolved by entry-point name.
// ============================================================================

use crate::backend::{GpuBackend, WgpuBackend};
use crate::dispatch::FlockUniforms;
use crate::pipeline;

pub const FLOCK_SHADER: &str = include_str!("shaders/flock.wgsl");

/// A parallel kernel that mutates the agent buffer in place.
pub trait FlockKernel<B: GpuBackend> {
    /// Invocations per work group along X, as declared by the kernel.
    fn group_width(&self) -> u32;

    /// Bind both buffers and run over `(groups, 1, 1)` work groups.
    /// Fire-and-forget: nothing is read back.
    fn step(
        &mut self,
        backend: &B,
        params: &FlockUniforms,
        agents: &B::Buffer,
        obstacles: &B::Buffer,
        groups: u32,
    );
}

/// Work-group width of the compute entry point `entry_point` in `source`,
/// or `None` if the shader does not parse or has no such compute entry.
pub fn reflect_group_width(source: &str, entry_point: &str) -> Option<u32> {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(err) => {
            log::warn!("Flock shader failed to parse: {}", err.emit_to_string(source));
            return None;
        }
    };
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry_point && ep.stage == naga::ShaderStage::Compute)
        .map(|ep| ep.workgroup_size[0])
}

// ======================== wgpu ========================

pub struct WgpuKernel {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    group_width: u32,
}

impl WgpuKernel {
    /// Compile `source` and resolve `entry_point` once. `None` when the entry
    /// point is missing, which leaves the simulation without a kernel.
    pub fn load(backend: &WgpuBackend, source: &str, entry_point: &str) -> Option<Self> {
        let Some(group_width) = reflect_group_width(source, entry_point) else {
            log::warn!("Compute entry point `{}` not found in flock shader", entry_point);
            return None;
        };

        let device = &backend.device;
        let module = pipeline::load_shader(device, "flock", source);
        let bind_group_layout = pipeline::flock_bind_group_layout(device);
        let pipeline =
            pipeline::create_compute_pipeline(device, "flock", &bind_group_layout, &module, entry_point);

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("flock_params"),
            size: std::mem::size_of::<FlockUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!("Flock kernel `{}` loaded, work group width {}", entry_point, group_width);

        Some(Self {
            pipeline,
            bind_group_layout,
            params_buffer,
            group_width,
        })
    }
}

impl FlockKernel<WgpuBackend> for WgpuKernel {
    fn group_width(&self) -> u32 {
        self.group_width
    }

    fn step(
        &mut self,
        backend: &WgpuBackend,
        params: &FlockUniforms,
        agents: &wgpu::Buffer,
        obstacles: &wgpu::Buffer,
        groups: u32,
    ) {
        backend
            .queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));

        let bind_group = backend.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("flock_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                pipeline::bg_buffer(0, &self.params_buffer),
                pipeline::bg_buffer(1, agents),
                pipeline::bg_buffer(2, obstacles),
            ],
        });

        let mut encoder = backend
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("flock_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("flock_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups, 1, 1);
        }
        backend.queue.submit(std::iter::once(encoder.finish()));
    }
}
