// ============================================================================
// driver.rs — GpuFlock
// Simulation: the single owner of one flock run. Two entry points per tick:
// physics_step (fixed cadence, obstacles) and frame (kernel + draw).
// ============================================================================

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::backend::{GpuBackend, WgpuBackend};
use crate::config::{FlockConfig, DRAW_BOUNDS, KERNEL_ENTRY_POINT};
use crate::dispatch::{group_count, DispatchPlanner, SimulationParameters};
use crate::kernel::{FlockKernel, WgpuKernel, FLOCK_SHADER};
use crate::mesh::MeshIndexInfo;
use crate::obstacles::{ObstacleMirror, ObstacleSource};
use crate::renderer::InstanceRenderer;
use crate::world::{spawn_agents, AgentRecord, FlockBuffers, ObstacleRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
}

/// What a single `frame` call actually did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub dispatched: bool,
    pub drawn: bool,
}

/// One flock run, from construction to `shutdown`.
///
/// Constructing without a kernel or a mesh (or with zero boids) yields an
/// inert simulation: no buffers, every tick a no-op, shutdown still safe.
///
/// The obstacle buffer has a single writer, `physics_step`; the kernel reads
/// whatever the latest physics step left in it. The agent buffer is only
/// ever written by the kernel.
pub struct Simulation<B: GpuBackend, K: FlockKernel<B>> {
    backend: B,
    kernel: Option<K>,
    config: FlockConfig,
    buffers: FlockBuffers<B>,
    mirror: ObstacleMirror,
    planner: DispatchPlanner,
    state: RunState,
    group_count: u32,
    frame: u64,
}

impl<B: GpuBackend, K: FlockKernel<B>> Simulation<B, K> {
    pub fn new<S: ObstacleSource>(
        backend: B,
        kernel: Option<K>,
        mesh: Option<MeshIndexInfo>,
        config: FlockConfig,
        sources: &[S],
    ) -> Self {
        config.validate();
        let state = if config.paused { RunState::Paused } else { RunState::Running };
        let mirror = ObstacleMirror::new(sources);

        let mut buffers = FlockBuffers::unallocated();
        let mut groups = 0;
        match (&kernel, mesh) {
            (Some(kernel), Some(mesh)) if config.boid_count > 0 => {
                let needed = group_count(config.boid_count, kernel.group_width());
                match exceeded_limit(&backend.limits(), config.boid_count, mirror.len(), needed) {
                    Some(limit) => log::warn!(
                        "{} boids exceed the device's {}; simulation stays inert",
                        config.boid_count,
                        limit
                    ),
                    None => {
                        let mut rng = match config.seed {
                            Some(seed) => StdRng::seed_from_u64(seed),
                            None => StdRng::from_entropy(),
                        };
                        let agents = spawn_agents(
                            config.boid_count,
                            config.spawn_center.into(),
                            config.spawn_radius,
                            &mut rng,
                        );
                        buffers =
                            FlockBuffers::initialize(&backend, &agents, mirror.snapshot(), mesh);
                        groups = needed;

                        log::info!(
                            "Flock initialized: {} boids, {} obstacles, {} work groups of {}",
                            config.boid_count,
                            mirror.len(),
                            groups,
                            kernel.group_width()
                        );
                    }
                }
            }
            (None, _) => log::warn!("No flock kernel; simulation stays inert"),
            (_, None) => log::warn!("No boid mesh; simulation stays inert"),
            _ => log::warn!("Boid count is 0; simulation stays inert"),
        }

        Self {
            backend,
            kernel,
            config,
            buffers,
            mirror,
            planner: DispatchPlanner::new(),
            state,
            group_count: groups,
            frame: 0,
        }
    }

    /// Fixed-cadence tick: mirror the obstacle sources and upload the
    /// snapshot. May run zero or several times between two frames.
    pub fn physics_step<S: ObstacleSource>(&mut self, sources: &[S]) -> bool {
        if self.buffers.obstacles().is_none() {
            return false;
        }
        let snapshot = self.mirror.refresh(sources);
        self.buffers.refresh_obstacles(&self.backend, snapshot)
    }

    /// Per-frame tick. Advances the flock unless paused, then draws it
    /// regardless of the run state.
    pub fn frame<R: InstanceRenderer<B>>(&mut self, delta_time: f32, renderer: &mut R) -> FrameReport {
        let mut report = FrameReport::default();

        if self.state == RunState::Running {
            if let Some(kernel) = self.kernel.as_mut() {
                let params = SimulationParameters::from_config(
                    &self.config,
                    delta_time,
                    self.buffers.agent_count(),
                    self.buffers.obstacle_count(),
                );
                self.planner.push_parameters(&params);
                report.dispatched = self.planner.dispatch(
                    &self.backend,
                    kernel,
                    self.buffers.agents(),
                    self.buffers.obstacles(),
                    self.group_count,
                );
            }
        }

        if let (Some(agents), Some(args)) = (self.buffers.agents(), self.buffers.draw_args()) {
            report.drawn = renderer.draw(&self.backend, agents, args, &DRAW_BOUNDS);
        }

        self.frame += 1;
        report
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn set_state(&mut self, state: RunState) {
        if self.state != state {
            log::info!("Simulation {:?}", state);
            self.state = state;
        }
    }

    pub fn toggle_pause(&mut self) {
        self.set_state(match self.state {
            RunState::Running => RunState::Paused,
            RunState::Paused => RunState::Running,
        });
    }

    pub fn is_inert(&self) -> bool {
        !self.buffers.is_allocated()
    }

    pub fn agent_count(&self) -> u32 {
        self.buffers.agent_count()
    }

    pub fn obstacle_count(&self) -> u32 {
        self.buffers.obstacle_count()
    }

    pub fn group_count(&self) -> u32 {
        self.group_count
    }

    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn buffers(&self) -> &FlockBuffers<B> {
        &self.buffers
    }

    pub fn kernel(&self) -> Option<&K> {
        self.kernel.as_ref()
    }

    /// Release every GPU buffer of this run. Idempotent; also run on drop.
    pub fn shutdown(&mut self) {
        if self.buffers.is_allocated() {
            log::info!("Flock shut down after {} frames", self.frame);
        }
        self.buffers.release(&self.backend);
    }
}

impl<B: GpuBackend, K: FlockKernel<B>> Drop for Simulation<B, K> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Name of the first device limit a flock of this size would break.
fn exceeded_limit(
    limits: &wgpu::Limits,
    boid_count: u32,
    obstacle_count: usize,
    groups: u32,
) -> Option<&'static str> {
    let agent_bytes = boid_count as u64 * std::mem::size_of::<AgentRecord>() as u64;
    let obstacle_bytes = obstacle_count.max(1) as u64 * std::mem::size_of::<ObstacleRecord>() as u64;
    let largest = agent_bytes.max(obstacle_bytes);

    if largest > limits.max_storage_buffer_binding_size as u64 {
        Some("max_storage_buffer_binding_size")
    } else if largest > limits.max_buffer_size {
        Some("max_buffer_size")
    } else if groups > limits.max_compute_workgroups_per_dimension {
        Some("max_compute_workgroups_per_dimension")
    } else {
        None
    }
}

pub type GpuSimulation = Simulation<WgpuBackend, WgpuKernel>;

/// Resolve the flock kernel and start a run on the GPU.
pub fn launch<S: ObstacleSource>(
    backend: &WgpuBackend,
    mesh: MeshIndexInfo,
    config: &FlockConfig,
    sources: &[S],
) -> GpuSimulation {
    let kernel = WgpuKernel::load(backend, FLOCK_SHADER, KERNEL_ENTRY_POINT);
    Simulation::new(backend.clone(), kernel, Some(mesh), config.clone(), sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, FakeKernel, FakeRenderer, StaticObstacle};
    use crate::world::{DrawArgs, ObstacleRecord};
    use glam::Vec3;

    const CUBE: MeshIndexInfo = MeshIndexInfo {
        index_count: 36,
        first_index: 0,
        base_vertex: 0,
    };

    fn config() -> FlockConfig {
        FlockConfig {
            boid_count: 100,
            seed: Some(42),
            ..Default::default()
        }
    }

    fn two_obstacles() -> Vec<StaticObstacle> {
        vec![
            StaticObstacle::new([0.0, 0.0, 0.0], 5.0),
            StaticObstacle::new([10.0, 0.0, 0.0], 3.0),
        ]
    }

    fn simulation(
        config: FlockConfig,
        sources: &[StaticObstacle],
    ) -> (FakeBackend, Simulation<FakeBackend, FakeKernel>) {
        let backend = FakeBackend::default();
        let sim = Simulation::new(backend.clone(), Some(FakeKernel::new(64)), Some(CUBE), config, sources);
        (backend, sim)
    }

    fn agent_bytes(sim: &Simulation<FakeBackend, FakeKernel>) -> Vec<u8> {
        sim.buffers().agents().unwrap().bytes()
    }

    #[test]
    fn running_frames_move_boids_and_draw() {
        let (_backend, mut sim) = simulation(config(), &two_obstacles());
        let mut renderer = FakeRenderer::default();
        let before = agent_bytes(&sim);

        let report = sim.frame(0.02, &mut renderer);

        assert_eq!(report, FrameReport { dispatched: true, drawn: true });
        assert_ne!(agent_bytes(&sim), before);
        assert_eq!(renderer.draws, 1);
        assert_eq!(renderer.last_bounds, Some(DRAW_BOUNDS));
    }

    #[test]
    fn paused_frames_keep_agents_but_still_draw() {
        let (_backend, mut sim) = simulation(config(), &two_obstacles());
        let mut renderer = FakeRenderer::default();

        sim.frame(0.02, &mut renderer);
        sim.toggle_pause();
        assert_eq!(sim.state(), RunState::Paused);
        let paused_at = agent_bytes(&sim);

        for _ in 0..5 {
            let report = sim.frame(0.02, &mut renderer);
            assert_eq!(report, FrameReport { dispatched: false, drawn: true });
        }

        assert_eq!(agent_bytes(&sim), paused_at);
        assert_eq!(renderer.draws, 6);
        assert_eq!(sim.kernel().unwrap().steps, 1);

        sim.toggle_pause();
        sim.frame(0.02, &mut renderer);
        assert_ne!(agent_bytes(&sim), paused_at);
    }

    #[test]
    fn paused_config_starts_paused() {
        let (_backend, mut sim) = simulation(FlockConfig { paused: true, ..config() }, &[]);
        let mut renderer = FakeRenderer::default();
        let before = agent_bytes(&sim);

        sim.frame(0.02, &mut renderer);

        assert_eq!(sim.state(), RunState::Paused);
        assert_eq!(agent_bytes(&sim), before);
        assert_eq!(renderer.draws, 1);
    }

    #[test]
    fn draw_args_never_change() {
        let (_backend, mut sim) = simulation(config(), &two_obstacles());
        let mut renderer = FakeRenderer::default();
        let expected = DrawArgs {
            index_count: 36,
            instance_count: 100,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        };

        for i in 0..10 {
            if i == 4 {
                sim.toggle_pause();
            }
            sim.physics_step(&two_obstacles());
            sim.frame(0.016, &mut renderer);
            assert_eq!(renderer.last_args, Some(expected));
        }
        assert_eq!(sim.buffers().draw_args().unwrap().read::<DrawArgs>(), expected);
    }

    #[test]
    fn agent_buffer_keeps_population_size() {
        let (backend, mut sim) = simulation(config(), &two_obstacles());
        let mut renderer = FakeRenderer::default();

        for _ in 0..20 {
            sim.physics_step(&two_obstacles());
            sim.frame(0.016, &mut renderer);
        }

        assert_eq!(sim.agent_count(), 100);
        assert_eq!(sim.buffers().agents().unwrap().len(), 100 * 24);
        assert_eq!(backend.created(), 3);
    }

    #[test]
    fn kernel_receives_parameters_and_geometry() {
        let (_backend, mut sim) = simulation(config(), &two_obstacles());
        let mut renderer = FakeRenderer::default();

        sim.frame(0.016, &mut renderer);

        let kernel = sim.kernel().unwrap();
        assert_eq!(kernel.last_groups, Some(100 / 64 + 1));
        let params = kernel.last_params.unwrap();
        assert_eq!(params.delta_time, 0.016);
        assert_eq!(params.boid_count, 100);
        assert_eq!(params.enemy_count, 2);
        assert_eq!(params.neighbour_radius, 0.7);
        assert_eq!(params.target, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn obstacle_refresh_tracks_moving_source() {
        let mut sources = two_obstacles();
        let (_backend, mut sim) = simulation(config(), &sources);

        let initial: Vec<ObstacleRecord> = sim.buffers().obstacles().unwrap().read_all();
        assert_eq!(
            initial,
            vec![
                ObstacleRecord { position: [0.0, 0.0, 0.0], radius: 5.0 },
                ObstacleRecord { position: [10.0, 0.0, 0.0], radius: 3.0 },
            ]
        );

        sources[0].position = Vec3::new(1.0, 0.0, 0.0);
        assert!(sim.physics_step(&sources));

        let refreshed: Vec<ObstacleRecord> = sim.buffers().obstacles().unwrap().read_all();
        assert_eq!(refreshed[0], ObstacleRecord { position: [1.0, 0.0, 0.0], radius: 5.0 });
        assert_eq!(refreshed[1], initial[1]);
        assert_eq!(sim.buffers().obstacles().unwrap().len(), 32);
    }

    #[test]
    fn latest_physics_step_wins() {
        let mut sources = two_obstacles();
        let (_backend, mut sim) = simulation(config(), &sources);

        for x in 1..=3 {
            sources[1].position = Vec3::new(10.0 + x as f32, 0.0, 0.0);
            sources[1].radius = x as f32;
            sim.physics_step(&sources);
        }

        let stored: Vec<ObstacleRecord> = sim.buffers().obstacles().unwrap().read_all();
        assert_eq!(stored[1], ObstacleRecord { position: [13.0, 0.0, 0.0], radius: 3.0 });
    }

    #[test]
    fn missing_kernel_leaves_simulation_inert() {
        let backend = FakeBackend::default();
        let mut sim: Simulation<FakeBackend, FakeKernel> =
            Simulation::new(backend.clone(), None, Some(CUBE), config(), &two_obstacles());
        let mut renderer = FakeRenderer::default();

        assert!(sim.is_inert());
        assert_eq!(backend.created(), 0);
        assert!(!sim.physics_step(&two_obstacles()));
        assert_eq!(sim.frame(0.02, &mut renderer), FrameReport::default());
        assert_eq!(renderer.draws, 0);

        sim.shutdown();
        sim.shutdown();
        assert_eq!(backend.destroyed(), 0);
    }

    #[test]
    fn missing_mesh_leaves_simulation_inert() {
        let backend = FakeBackend::default();
        let mut sim = Simulation::new(
            backend.clone(),
            Some(FakeKernel::new(64)),
            None,
            config(),
            &two_obstacles(),
        );
        let mut renderer = FakeRenderer::default();

        assert!(sim.is_inert());
        assert_eq!(sim.frame(0.02, &mut renderer), FrameReport::default());
        assert_eq!(sim.kernel().unwrap().steps, 0);
        assert_eq!(backend.created(), 0);
    }

    #[test]
    fn zero_boids_leaves_simulation_inert() {
        let (backend, sim) = simulation(FlockConfig { boid_count: 0, ..config() }, &[]);
        assert!(sim.is_inert());
        assert_eq!(backend.created(), 0);
    }

    #[test]
    fn no_obstacles_still_runs() {
        let (_backend, mut sim) = simulation(config(), &[]);
        let mut renderer = FakeRenderer::default();

        assert_eq!(sim.obstacle_count(), 0);
        assert!(sim.physics_step::<StaticObstacle>(&[]));
        let report = sim.frame(0.02, &mut renderer);
        assert!(report.dispatched);
        assert_eq!(sim.kernel().unwrap().last_params.unwrap().enemy_count, 0);
    }

    #[test]
    fn shutdown_is_idempotent_and_runs_on_drop() {
        let (backend, mut sim) = simulation(config(), &two_obstacles());
        let mut renderer = FakeRenderer::default();

        sim.shutdown();
        sim.shutdown();
        assert_eq!(backend.destroyed(), 3);
        assert!(sim.is_inert());

        assert_eq!(sim.frame(0.02, &mut renderer), FrameReport::default());
        assert!(!sim.physics_step(&two_obstacles()));

        drop(sim);
        assert_eq!(backend.destroyed(), 3);
    }

    #[test]
    fn drop_releases_buffers() {
        let (backend, sim) = simulation(config(), &two_obstacles());
        drop(sim);
        assert_eq!(backend.destroyed(), 3);
    }

    #[test]
    fn oversized_flock_stays_inert_instead_of_allocating() {
        let backend = FakeBackend::with_limits(wgpu::Limits {
            max_storage_buffer_binding_size: 24 * 1000,
            ..wgpu::Limits::default()
        });
        let mut sim = Simulation::new(
            backend.clone(),
            Some(FakeKernel::new(128)),
            Some(CUBE),
            FlockConfig { boid_count: 1001, ..config() },
            &two_obstacles(),
        );
        let mut renderer = FakeRenderer::default();

        assert!(sim.is_inert());
        assert_eq!(backend.created(), 0);
        assert_eq!(sim.frame(0.02, &mut renderer), FrameReport::default());
        assert_eq!(sim.kernel().unwrap().steps, 0);
    }

    #[test]
    fn flock_at_the_binding_limit_still_runs() {
        let backend = FakeBackend::with_limits(wgpu::Limits {
            max_storage_buffer_binding_size: 24 * 1000,
            ..wgpu::Limits::default()
        });
        let sim = Simulation::new(
            backend.clone(),
            Some(FakeKernel::new(128)),
            Some(CUBE),
            FlockConfig { boid_count: 1000, ..config() },
            &two_obstacles(),
        );
        assert!(!sim.is_inert());
        assert_eq!(sim.agent_count(), 1000);
    }

    #[test]
    fn too_many_work_groups_stays_inert() {
        let backend = FakeBackend::with_limits(wgpu::Limits {
            max_compute_workgroups_per_dimension: 4,
            ..wgpu::Limits::default()
        });
        // 256 / 64 + 1 = 5 groups
        let sim = Simulation::new(
            backend.clone(),
            Some(FakeKernel::new(64)),
            Some(CUBE),
            FlockConfig { boid_count: 256, ..config() },
            &two_obstacles(),
        );
        assert!(sim.is_inert());
        assert_eq!(sim.group_count(), 0);
        assert_eq!(backend.created(), 0);
    }

    #[test]
    fn buffer_size_limit_is_checked() {
        let limits = wgpu::Limits {
            max_buffer_size: 240,
            ..wgpu::Limits::default()
        };
        assert_eq!(exceeded_limit(&limits, 10, 2, 1), None);
        assert_eq!(exceeded_limit(&limits, 11, 2, 1), Some("max_buffer_size"));
        assert_eq!(
            exceeded_limit(&wgpu::Limits::default(), 6_000_000, 2, 6_000_000 / 128 + 1),
            Some("max_storage_buffer_binding_size")
        );
    }

    #[test]
    fn frame_without_render_target_reports_no_draw() {
        let (_backend, mut sim) = simulation(config(), &two_obstacles());
        let mut renderer = FakeRenderer {
            detached: true,
            ..Default::default()
        };

        let report = sim.frame(0.02, &mut renderer);

        assert_eq!(report, FrameReport { dispatched: true, drawn: false });
        assert_eq!(renderer.draws, 0);
    }

    #[test]
    fn seeded_runs_spawn_identically() {
        let (_a_backend, a) = simulation(config(), &[]);
        let (_b_backend, b) = simulation(config(), &[]);
        assert_eq!(agent_bytes(&a), agent_bytes(&b));
    }
}
