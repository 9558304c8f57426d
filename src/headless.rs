// ============================================================================
// headless.rs — GpuFlock
// Windowless runner: same frame loop, rendered into an offscreen texture.
// ============================================================================

use std::time::Instant;

use crate::backend::{create_instance, WgpuBackend};
use crate::camera::CameraState;
use crate::config::{FlockConfig, FIXED_TIMESTEP, MAX_PHYSICS_STEPS_PER_FRAME};
use crate::driver::launch;
use crate::error::FlockError;
use crate::mesh::BoidMesh;
use crate::renderer::WgpuRenderer;
use crate::scene::Scene;
use crate::time::FixedTimestep;

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Clone, Debug)]
pub struct HeadlessConfig {
    pub frames: u32,
    pub progress_interval: u32,
    pub width: u32,
    pub height: u32,
    /// Simulated seconds per frame.
    pub frame_dt: f32,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            progress_interval: 120,
            width: 640,
            height: 480,
            frame_dt: 1.0 / 60.0,
        }
    }
}

pub fn run_headless(flock: &FlockConfig, config: &HeadlessConfig) -> Result<(), FlockError> {
    let instance = create_instance();
    let (backend, _adapter) = pollster::block_on(WgpuBackend::request(&instance, None))?;

    let width = config.width.max(1);
    let height = config.height.max(1);
    let target = backend.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("headless_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let mesh = BoidMesh::dart();
    let mut renderer = WgpuRenderer::new(&backend, &mesh, OFFSCREEN_FORMAT, width, height);
    let camera = CameraState::looking_at(flock.spawn_center.into());
    renderer.update_camera(
        &backend.queue,
        &camera.uniforms(width as f32 / height as f32, flock.boid_scale),
    );

    let mut scene = Scene::from_config(&flock.obstacles);
    let mut sim = launch(&backend, mesh.index_info(), flock, &scene.obstacles);
    let mut physics = FixedTimestep::new(FIXED_TIMESTEP, MAX_PHYSICS_STEPS_PER_FRAME);

    log::info!(
        "Headless run started: {} frames, {} boids, {}x{} target",
        config.frames,
        sim.agent_count(),
        width,
        height
    );

    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut last_report_frame = 0u32;
    let mut dispatched = 0u32;

    for step in 0..config.frames {
        for _ in 0..physics.advance(config.frame_dt) {
            scene.fixed_update(physics.step());
            sim.physics_step(&scene.obstacles);
        }

        renderer.begin_frame(target.create_view(&wgpu::TextureViewDescriptor::default()));
        if sim.frame(config.frame_dt, &mut renderer).dispatched {
            dispatched += 1;
        }
        renderer.end_frame(&backend);

        if config.progress_interval > 0 && (step + 1) % config.progress_interval == 0 {
            let done = step + 1;
            let total_fps = done as f64 / started.elapsed().as_secs_f64().max(1e-6);
            let window_fps =
                (done - last_report_frame) as f64 / last_report.elapsed().as_secs_f64().max(1e-6);

            log::info!(
                "Headless progress: {}/{} | fps={:.0} (window {:.0}) | culled={}",
                done,
                config.frames,
                total_fps,
                window_fps,
                renderer.culled_frames,
            );

            last_report = Instant::now();
            last_report_frame = done;
        }
    }

    backend.device.poll(wgpu::Maintain::Wait);
    sim.shutdown();

    log::info!(
        "Headless run finished: {} frames ({} dispatched) in {:.2}s",
        config.frames,
        dispatched,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
