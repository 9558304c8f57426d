// ============================================================================
// renderer.rs — GpuFlock
// Instanced boid drawing: one indirect indexed draw per frame, instances
// sourced directly from the kernel-written agent buffer.
// ============================================================================

use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::backend::{GpuBackend, WgpuBackend};
use crate::camera::CameraUniforms;
use crate::mesh::BoidMesh;
use crate::pipeline;

pub const BOID_SHADER: &str = include_str!("shaders/boid.wgsl");

/// Axis-aligned volume that must enclose every instance of the draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawBounds {
    pub center: [f32; 3],
    /// Full edge lengths.
    pub extent: [f32; 3],
}

impl DrawBounds {
    pub fn corners(&self) -> [Vec3; 8] {
        let c = Vec3::from_array(self.center);
        let h = Vec3::from_array(self.extent) * 0.5;
        std::array::from_fn(|i| {
            let sign = Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            c + h * sign
        })
    }

    /// False only when the whole volume lies outside one frustum plane.
    pub fn visible_from(&self, view_proj: Mat4) -> bool {
        let clip: [Vec4; 8] = self.corners().map(|c| view_proj * c.extend(1.0));
        let outside = |test: fn(&Vec4) -> bool| clip.iter().all(test);
        !(outside(|p| p.x < -p.w)
            || outside(|p| p.x > p.w)
            || outside(|p| p.y < -p.w)
            || outside(|p| p.y > p.w)
            || outside(|p| p.z < 0.0)
            || outside(|p| p.z > p.w))
    }
}

/// Draws the whole flock from GPU-resident buffers.
pub trait InstanceRenderer<B: GpuBackend> {
    /// Bind `agents` to the boid material and issue one indirect draw
    /// described by `args`. Called every frame, paused or not.
    ///
    /// Returns `false` when nothing was submitted (no target this frame).
    /// A draw culled by `bounds` still counts as submitted.
    fn draw(&mut self, backend: &B, agents: &B::Buffer, args: &B::Buffer, bounds: &DrawBounds)
        -> bool;
}

// ======================== wgpu ========================

pub struct WgpuRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    depth_view: wgpu::TextureView,
    view_proj: Mat4,
    target: Option<wgpu::TextureView>,
    drawn: bool,
    pub culled_frames: u64,
}

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.03,
    b: 0.06,
    a: 1.0,
};

impl WgpuRenderer {
    pub fn new(
        backend: &WgpuBackend,
        mesh: &BoidMesh,
        color_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let device = &backend.device;
        let module = pipeline::load_shader(device, "boid", BOID_SHADER);
        let bind_group_layout = pipeline::boid_bind_group_layout(device);
        let render_pipeline =
            pipeline::create_boid_render_pipeline(device, &bind_group_layout, &module, color_format);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_uniforms"),
            contents: bytemuck::bytes_of(&CameraUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("boid_vertices"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("boid_indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            pipeline: render_pipeline,
            bind_group_layout,
            camera_buffer,
            vertex_buffer,
            index_buffer,
            depth_view: pipeline::create_depth_view(device, width, height),
            view_proj: Mat4::IDENTITY,
            target: None,
            drawn: false,
            culled_frames: 0,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = pipeline::create_depth_view(device, width, height);
    }

    pub fn update_camera(&mut self, queue: &wgpu::Queue, uniforms: &CameraUniforms) {
        self.view_proj = Mat4::from_cols_array_2d(&uniforms.view_proj);
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Set the color target for this frame's draw.
    pub fn begin_frame(&mut self, target: wgpu::TextureView) {
        self.target = Some(target);
        self.drawn = false;
    }

    /// Clear the target if nothing drew into it this frame, then let it go.
    pub fn end_frame(&mut self, backend: &WgpuBackend) {
        if !self.drawn {
            if let Some(view) = &self.target {
                self.encode_pass(backend, view, None);
            }
        }
        self.target = None;
    }

    fn encode_pass(
        &self,
        backend: &WgpuBackend,
        view: &wgpu::TextureView,
        instances: Option<(&wgpu::BindGroup, &wgpu::Buffer)>,
    ) {
        let mut encoder = backend
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("boid_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("boid_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some((bind_group, args)) = instances {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed_indirect(args, 0);
            }
        }
        backend.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl InstanceRenderer<WgpuBackend> for WgpuRenderer {
    fn draw(
        &mut self,
        backend: &WgpuBackend,
        agents: &wgpu::Buffer,
        args: &wgpu::Buffer,
        bounds: &DrawBounds,
    ) -> bool {
        if self.target.is_none() {
            return false;
        }

        let visible = bounds.visible_from(self.view_proj);
        if !visible {
            self.culled_frames += 1;
        }
        let bind_group = visible.then(|| {
            backend.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("boid_bg"),
                layout: &self.bind_group_layout,
                entries: &[
                    pipeline::bg_buffer(0, &self.camera_buffer),
                    pipeline::bg_buffer(1, agents),
                ],
            })
        });

        if let Some(view) = &self.target {
            self.encode_pass(backend, view, bind_group.as_ref().map(|bg| (bg, args)));
        }
        self.drawn = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DRAW_BOUNDS;

    fn view_proj(eye: Vec3, target: Vec3) -> Mat4 {
        Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 500.0)
            * Mat4::look_at_rh(eye, target, Vec3::Y)
    }

    #[test]
    fn boid_shader_is_valid() {
        let module = naga::front::wgsl::parse_str(BOID_SHADER)
            .unwrap_or_else(|e| panic!("WGSL parse error: {}", e.emit_to_string(BOID_SHADER)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap();
    }

    #[test]
    fn corners_span_extent() {
        let bounds = DrawBounds {
            center: [1.0, 0.0, 0.0],
            extent: [2.0, 4.0, 6.0],
        };
        let corners = bounds.corners();
        let min = corners.iter().fold(Vec3::splat(f32::MAX), |a, c| a.min(*c));
        let max = corners.iter().fold(Vec3::splat(f32::MIN), |a, c| a.max(*c));
        assert_eq!(min, Vec3::new(0.0, -2.0, -3.0));
        assert_eq!(max, Vec3::new(2.0, 2.0, 3.0));
    }

    #[test]
    fn default_bounds_visible_when_looking_at_flock() {
        assert!(DRAW_BOUNDS.visible_from(view_proj(Vec3::new(0.0, 10.0, 40.0), Vec3::ZERO)));
    }

    #[test]
    fn camera_inside_bounds_sees_them() {
        assert!(DRAW_BOUNDS.visible_from(view_proj(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 10.0))));
    }

    #[test]
    fn bounds_behind_camera_are_culled() {
        let small = DrawBounds {
            center: [0.0, 0.0, 0.0],
            extent: [2.0, 2.0, 2.0],
        };
        let looking_away = view_proj(Vec3::new(0.0, 0.0, 20.0), Vec3::new(0.0, 0.0, 40.0));
        assert!(!small.visible_from(looking_away));
    }

    #[test]
    fn undersized_bounds_cull_visible_boids() {
        // A boid at the origin is in view, but bounds placed off to the side
        // hide the whole batch.
        let camera = view_proj(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO);
        let misplaced = DrawBounds {
            center: [200.0, 0.0, 0.0],
            extent: [1.0, 1.0, 1.0],
        };
        assert!(!misplaced.visible_from(camera));
        assert!(DRAW_BOUNDS.visible_from(camera));
    }
}
