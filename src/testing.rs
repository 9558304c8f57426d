// ============================================================================
// testing.rs — GpuFlock
// In-memory stand-ins for the GPU, the flock kernel and the renderer.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bytemuck::Pod;
use glam::Vec3;

use crate::backend::{BufferRole, GpuBackend};
use crate::dispatch::FlockUniforms;
use crate::kernel::FlockKernel;
use crate::obstacles::ObstacleSource;
use crate::renderer::{DrawBounds, InstanceRenderer};
use crate::world::{AgentRecord, DrawArgs};

#[derive(Default)]
struct Counters {
    created: usize,
    destroyed: usize,
    writes: usize,
}

/// Host-memory backend that counts every buffer operation.
#[derive(Clone, Default)]
pub struct FakeBackend {
    counters: Rc<RefCell<Counters>>,
    limits: wgpu::Limits,
}

impl FakeBackend {
    pub fn with_limits(limits: wgpu::Limits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.counters.borrow().created
    }

    pub fn destroyed(&self) -> usize {
        self.counters.borrow().destroyed
    }

    pub fn writes(&self) -> usize {
        self.counters.borrow().writes
    }

    pub fn buffer(&self, contents: &[u8]) -> FakeBuffer {
        self.create_buffer(BufferRole::Agents, "test", contents)
    }
}

#[derive(Clone)]
pub struct FakeBuffer {
    pub role: BufferRole,
    data: Rc<RefCell<Vec<u8>>>,
    destroyed: Rc<Cell<bool>>,
}

impl FakeBuffer {
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }

    pub fn read<T: Pod>(&self) -> T {
        bytemuck::pod_read_unaligned(&self.data.borrow()[..std::mem::size_of::<T>()])
    }

    pub fn read_all<T: Pod>(&self) -> Vec<T> {
        self.data
            .borrow()
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

impl GpuBackend for FakeBackend {
    type Buffer = FakeBuffer;

    fn create_buffer(&self, role: BufferRole, _label: &str, contents: &[u8]) -> FakeBuffer {
        self.counters.borrow_mut().created += 1;
        FakeBuffer {
            role,
            data: Rc::new(RefCell::new(contents.to_vec())),
            destroyed: Rc::new(Cell::new(false)),
        }
    }

    fn write_buffer(&self, buffer: &FakeBuffer, contents: &[u8]) {
        assert!(!buffer.is_destroyed(), "write to destroyed buffer");
        let mut data = buffer.data.borrow_mut();
        assert!(contents.len() <= data.len(), "write overflows buffer");
        data[..contents.len()].copy_from_slice(contents);
        self.counters.borrow_mut().writes += 1;
    }

    fn destroy_buffer(&self, buffer: FakeBuffer) {
        assert!(!buffer.destroyed.replace(true), "buffer destroyed twice");
        self.counters.borrow_mut().destroyed += 1;
    }

    fn limits(&self) -> wgpu::Limits {
        self.limits.clone()
    }
}

/// Moves every boid straight along its heading, like a kernel with all
/// steering weights at zero.
pub struct FakeKernel {
    width: u32,
    pub steps: usize,
    pub last_groups: Option<u32>,
    pub last_params: Option<FlockUniforms>,
}

impl FakeKernel {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            steps: 0,
            last_groups: None,
            last_params: None,
        }
    }
}

impl FlockKernel<FakeBackend> for FakeKernel {
    fn group_width(&self) -> u32 {
        self.width
    }

    fn step(
        &mut self,
        backend: &FakeBackend,
        params: &FlockUniforms,
        agents: &FakeBuffer,
        _obstacles: &FakeBuffer,
        groups: u32,
    ) {
        let mut boids: Vec<AgentRecord> = agents.read_all();
        let covered = (groups * self.width) as usize;
        for boid in boids.iter_mut().take(params.boid_count as usize).take(covered) {
            let pos = Vec3::from_array(boid.position);
            let heading = Vec3::from_array(boid.heading);
            boid.position = (pos + heading * params.velocity * params.delta_time).to_array();
        }
        backend.write_buffer(agents, bytemuck::cast_slice(&boids));

        self.steps += 1;
        self.last_groups = Some(groups);
        self.last_params = Some(*params);
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    pub draws: usize,
    pub last_args: Option<DrawArgs>,
    pub last_bounds: Option<DrawBounds>,
    /// Behave like a renderer with no color target: submit nothing.
    pub detached: bool,
}

impl InstanceRenderer<FakeBackend> for FakeRenderer {
    fn draw(
        &mut self,
        _backend: &FakeBackend,
        _agents: &FakeBuffer,
        args: &FakeBuffer,
        bounds: &DrawBounds,
    ) -> bool {
        if self.detached {
            return false;
        }
        self.draws += 1;
        self.last_args = Some(args.read());
        self.last_bounds = Some(*bounds);
        true
    }
}

pub struct StaticObstacle {
    pub position: Vec3,
    pub radius: f32,
}

impl StaticObstacle {
    pub fn new(position: [f32; 3], radius: f32) -> Self {
        Self {
            position: Vec3::from_array(position),
            radius,
        }
    }
}

impl ObstacleSource for StaticObstacle {
    fn world_position(&self) -> Vec3 {
        self.position
    }

    fn influence_radius(&self) -> f32 {
        self.radius
    }
}
