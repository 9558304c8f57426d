// ============================================================================
// world.rs — GpuFlock
// GPU record layouts shared with the shaders, initial flock spawning, and
// FlockBuffers: sole owner of the agent, obstacle and indirect-args buffers.
// ============================================================================

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use rand::Rng;

use crate::backend::{BufferRole, GpuBackend};
use crate::mesh::MeshIndexInfo;

// ======================== Records ========================

/// One boid as the kernel and the boid material see it.
/// Two tightly packed `vec3<f32>`: 24 bytes, no padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct AgentRecord {
    pub position: [f32; 3],
    pub heading: [f32; 3],
}

/// One obstacle: position plus avoidance radius, 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ObstacleRecord {
    pub position: [f32; 3],
    pub radius: f32,
}

/// Indexed indirect draw descriptor, in the order the GPU reads it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: u32,
    pub first_instance: u32,
}

const _: () = assert!(std::mem::size_of::<AgentRecord>() == 24);
const _: () = assert!(std::mem::size_of::<ObstacleRecord>() == 16);
const _: () = assert!(std::mem::size_of::<DrawArgs>() == 5 * 4);

impl DrawArgs {
    pub fn for_instances(mesh: MeshIndexInfo, instance_count: u32) -> Self {
        Self {
            index_count: mesh.index_count,
            instance_count,
            first_index: mesh.first_index,
            base_vertex: mesh.base_vertex,
            first_instance: 0,
        }
    }
}

// ======================== Spawning ========================

/// Scatter `count` boids uniformly inside a sphere around `center`.
///
/// Each heading is the horizontal offset from the center turned -90° about
/// the up axis, so the flock starts out swirling around its spawn point.
pub fn spawn_agents<R: Rng>(count: u32, center: Vec3, radius: f32, rng: &mut R) -> Vec<AgentRecord> {
    (0..count)
        .map(|_| {
            let position = center + inside_unit_sphere(rng) * radius;

            let mut offset = position - center;
            offset.y = 0.0;
            let offset = offset.try_normalize().unwrap_or(Vec3::X);
            let heading = Quat::from_axis_angle(Vec3::Y, (-90.0f32).to_radians()) * offset;

            AgentRecord {
                position: position.to_array(),
                heading: heading.to_array(),
            }
        })
        .collect()
}

fn inside_unit_sphere<R: Rng>(rng: &mut R) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}

// ======================== FlockBuffers ========================

/// The three GPU buffers of one simulation run.
///
/// Sizes are fixed at `initialize`; nothing is ever reallocated. A buffer
/// slot is `None` when it was never allocated or has been released.
pub struct FlockBuffers<B: GpuBackend> {
    agents: Option<B::Buffer>,
    obstacles: Option<B::Buffer>,
    draw_args: Option<B::Buffer>,
    agent_count: u32,
    obstacle_count: u32,
}

impl<B: GpuBackend> FlockBuffers<B> {
    /// No buffers at all; what an inert simulation holds.
    pub fn unallocated() -> Self {
        Self {
            agents: None,
            obstacles: None,
            draw_args: None,
            agent_count: 0,
            obstacle_count: 0,
        }
    }

    /// Allocate and fill all three buffers.
    pub fn initialize(
        backend: &B,
        agents: &[AgentRecord],
        obstacles: &[ObstacleRecord],
        mesh: MeshIndexInfo,
    ) -> Self {
        let agent_count = agents.len() as u32;
        let obstacle_count = obstacles.len() as u32;

        let agent_buffer =
            backend.create_buffer(BufferRole::Agents, "agents", bytemuck::cast_slice(agents));

        // A zero-sized storage binding is invalid, so an empty obstacle set
        // still gets one zeroed record. The kernel only reads `obstacle_count`.
        let placeholder = [ObstacleRecord::zeroed()];
        let obstacle_contents = if obstacles.is_empty() { &placeholder[..] } else { obstacles };
        let obstacle_buffer = backend.create_buffer(
            BufferRole::Obstacles,
            "obstacles",
            bytemuck::cast_slice(obstacle_contents),
        );

        let args = DrawArgs::for_instances(mesh, agent_count);
        let args_buffer =
            backend.create_buffer(BufferRole::IndirectArgs, "draw_args", bytemuck::bytes_of(&args));

        log::debug!(
            "Flock buffers: {} agents ({} B), {} obstacles ({} B), draw args {:?}",
            agent_count,
            agents.len() * std::mem::size_of::<AgentRecord>(),
            obstacle_count,
            obstacle_contents.len() * std::mem::size_of::<ObstacleRecord>(),
            args,
        );

        Self {
            agents: Some(agent_buffer),
            obstacles: Some(obstacle_buffer),
            draw_args: Some(args_buffer),
            agent_count,
            obstacle_count,
        }
    }

    /// Overwrite the obstacle buffer with `snapshot` in place.
    ///
    /// Returns `false` (and leaves the buffer untouched) when the buffer is
    /// gone or the snapshot does not have exactly `obstacle_count` records.
    pub fn refresh_obstacles(&self, backend: &B, snapshot: &[ObstacleRecord]) -> bool {
        let Some(buffer) = &self.obstacles else {
            return false;
        };
        if snapshot.len() != self.obstacle_count as usize {
            log::warn!(
                "Obstacle snapshot has {} records, buffer holds {}; skipping refresh",
                snapshot.len(),
                self.obstacle_count
            );
            return false;
        }
        if !snapshot.is_empty() {
            backend.write_buffer(buffer, bytemuck::cast_slice(snapshot));
        }
        true
    }

    /// Free every buffer that is still valid. Safe to call any number of times.
    pub fn release(&mut self, backend: &B) {
        let mut released = 0;
        for slot in [&mut self.draw_args, &mut self.agents, &mut self.obstacles] {
            if let Some(buffer) = slot.take() {
                backend.destroy_buffer(buffer);
                released += 1;
            }
        }
        if released > 0 {
            log::debug!("Released {} flock buffers", released);
        }
    }

    pub fn agents(&self) -> Option<&B::Buffer> {
        self.agents.as_ref()
    }

    pub fn obstacles(&self) -> Option<&B::Buffer> {
        self.obstacles.as_ref()
    }

    pub fn draw_args(&self) -> Option<&B::Buffer> {
        self.draw_args.as_ref()
    }

    pub fn agent_count(&self) -> u32 {
        self.agent_count
    }

    pub fn obstacle_count(&self) -> u32 {
        self.obstacle_count
    }

    /// True while at least one buffer is still allocated.
    pub fn is_allocated(&self) -> bool {
        self.agents.is_some() || self.obstacles.is_some() || self.draw_args.is_some()
    }
}
