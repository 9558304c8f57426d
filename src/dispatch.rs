// ============================================================================
// dispatch.rs — GpuFlock
// Dispatch geometry and the per-frame parameter block handed to the kernel.
// ============================================================================

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::backend::GpuBackend;
use crate::config::FlockConfig;
use crate::kernel::FlockKernel;

/// Work groups needed to cover `agent_count` boids along X.
///
/// Always `agent_count / group_width + 1`: one group more than needed when
/// the count is an exact multiple of the width. The kernel discards the
/// surplus invocations against `boid_count`. A width of 0 counts as 1.
pub fn group_count(agent_count: u32, group_width: u32) -> u32 {
    agent_count / group_width.max(1) + 1
}

/// Everything the kernel needs for one step, in host terms.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationParameters {
    pub delta_time: f32,
    pub target: Vec3,
    pub neighbour_radius: f32,
    pub turn_speed: f32,
    pub velocity: f32,
    pub weight_alignment: f32,
    pub weight_cohesion: f32,
    pub weight_separation: f32,
    pub weight_seek: f32,
    pub boid_count: u32,
    pub obstacle_count: u32,
    pub avoidance_multiplier: f32,
}

impl SimulationParameters {
    pub fn from_config(config: &FlockConfig, delta_time: f32, boid_count: u32, obstacle_count: u32) -> Self {
        Self {
            delta_time,
            target: Vec3::from_array(config.spawn_center),
            neighbour_radius: config.neighbour_radius,
            turn_speed: config.turn_speed,
            velocity: config.velocity,
            weight_alignment: config.weight_alignment,
            weight_cohesion: config.weight_cohesion,
            weight_separation: config.weight_separation,
            weight_seek: config.weight_seek,
            boid_count,
            obstacle_count,
            avoidance_multiplier: config.avoidance_multiplier,
        }
    }
}

/// Uniform block of `flock.wgsl` (`FlockParams`), 64 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FlockUniforms {
    pub target: [f32; 3],
    pub delta_time: f32,
    pub boid_count: u32,
    pub enemy_count: u32,
    pub neighbour_radius: f32,
    pub turn_speed: f32,
    pub velocity: f32,
    pub weight_alignment: f32,
    pub weight_cohesion: f32,
    pub weight_separation: f32,
    pub weight_seek: f32,
    pub avoidance_multiplier: f32,
    pub _pad: [u32; 2],
}

const _: () = assert!(std::mem::size_of::<FlockUniforms>() == 64);
const _: () = assert!(std::mem::offset_of!(FlockUniforms, delta_time) == 12);
const _: () = assert!(std::mem::offset_of!(FlockUniforms, boid_count) == 16);
const _: () = assert!(std::mem::offset_of!(FlockUniforms, avoidance_multiplier) == 52);

impl From<&SimulationParameters> for FlockUniforms {
    fn from(params: &SimulationParameters) -> Self {
        Self {
            target: params.target.to_array(),
            delta_time: params.delta_time,
            boid_count: params.boid_count,
            enemy_count: params.obstacle_count,
            neighbour_radius: params.neighbour_radius,
            turn_speed: params.turn_speed,
            velocity: params.velocity,
            weight_alignment: params.weight_alignment,
            weight_cohesion: params.weight_cohesion,
            weight_separation: params.weight_separation,
            weight_seek: params.weight_seek,
            avoidance_multiplier: params.avoidance_multiplier,
            _pad: [0; 2],
        }
    }
}

/// Stages parameters for the next kernel invocation and launches it.
#[derive(Default)]
pub struct DispatchPlanner {
    staged: Option<FlockUniforms>,
}

impl DispatchPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_parameters(&mut self, params: &SimulationParameters) {
        self.staged = Some(FlockUniforms::from(params));
    }

    /// Run the kernel over `(groups, 1, 1)` work groups.
    ///
    /// Skipped (returns `false`) when either buffer is missing or no
    /// parameters were pushed yet. This is the only place boids move.
    pub fn dispatch<B, K>(
        &self,
        backend: &B,
        kernel: &mut K,
        agents: Option<&B::Buffer>,
        obstacles: Option<&B::Buffer>,
        groups: u32,
    ) -> bool
    where
        B: GpuBackend,
        K: FlockKernel<B>,
    {
        let (Some(agents), Some(obstacles), Some(params)) = (agents, obstacles, &self.staged) else {
            return false;
        };
        kernel.step(backend, params, agents, obstacles, groups);
        true
    }
}
