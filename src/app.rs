// ============================================================================
// app.rs — GpuFlock
// Window, surface and winit event loop around one flock simulation.
// ============================================================================

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{MouseScrollDelta, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes},
};

use crate::backend::{create_instance, WgpuBackend};
use crate::camera::CameraState;
use crate::config::{FlockConfig, FIXED_TIMESTEP, MAX_PHYSICS_STEPS_PER_FRAME};
use crate::driver::{launch, GpuSimulation};
use crate::error::FlockError;
use crate::hud::{HudRenderer, HudStats};
use crate::input::KeysHeld;
use crate::mesh::BoidMesh;
use crate::renderer::WgpuRenderer;
use crate::scene::Scene;
use crate::time::{FixedTimestep, FrameClock};

// ======================== Application ========================

pub struct App {
    state: Option<AppState>,
    config: FlockConfig,
}

struct AppState {
    // GPU
    backend: WgpuBackend,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    // Simulation
    sim: GpuSimulation,
    scene: Scene,
    mesh: BoidMesh,

    // Rendering
    renderer: WgpuRenderer,
    hud: HudRenderer,
    window: Arc<Window>,

    // Camera & Input
    camera: CameraState,
    keys: KeysHeld,

    // Timing
    clock: FrameClock,
    physics: FixedTimestep,
}

impl App {
    pub fn new(config: FlockConfig) -> Self {
        Self { state: None, config }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match init_state(event_loop, &self.config) {
            Ok(state) => {
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(err) => {
                log::error!("Startup failed: {}", err);
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::KeyboardInput { event, .. } => {
                handle_keyboard(state, event_loop, &event, &self.config);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match &delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.01,
                };
                state.camera.apply_scroll(scroll);
            }

            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    state.surface_config.width = new_size.width;
                    state.surface_config.height = new_size.height;
                    state
                        .surface
                        .configure(&state.backend.device, &state.surface_config);
                    state
                        .renderer
                        .resize(&state.backend.device, new_size.width, new_size.height);
                }
            }

            WindowEvent::RedrawRequested => redraw(state),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            state.sim.shutdown();
        }
    }
}

// ======================== GPU Initialization ========================

fn init_state(event_loop: &ActiveEventLoop, config: &FlockConfig) -> Result<AppState, FlockError> {
    let window_attrs = WindowAttributes::default()
        .with_title("GpuFlock")
        .with_inner_size(winit::dpi::LogicalSize::new(1280u32, 900u32));
    let window = Arc::new(event_loop.create_window(window_attrs)?);

    let instance = create_instance();
    let surface = instance.create_surface(window.clone())?;
    let (backend, adapter) = pollster::block_on(WgpuBackend::request(&instance, Some(&surface)))?;

    let size = window.inner_size();
    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .copied()
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or(FlockError::NoAdapter)?;

    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&backend.device, &surface_config);

    let mesh = BoidMesh::dart();
    let renderer = WgpuRenderer::new(
        &backend,
        &mesh,
        surface_format,
        surface_config.width,
        surface_config.height,
    );
    let hud = HudRenderer::new(&backend.device, &backend.queue, surface_format);

    let scene = Scene::from_config(&config.obstacles);
    let sim = launch(&backend, mesh.index_info(), config, &scene.obstacles);

    Ok(AppState {
        backend,
        surface,
        surface_config,
        sim,
        scene,
        mesh,
        renderer,
        hud,
        window,
        camera: CameraState::looking_at(config.spawn_center.into()),
        keys: KeysHeld::default(),
        clock: FrameClock::new(),
        physics: FixedTimestep::new(FIXED_TIMESTEP, MAX_PHYSICS_STEPS_PER_FRAME),
    })
}

// ======================== Keyboard Handling ========================

fn handle_keyboard(
    state: &mut AppState,
    event_loop: &ActiveEventLoop,
    event: &winit::event::KeyEvent,
    config: &FlockConfig,
) {
    let pressed = event.state.is_pressed();

    match &event.logical_key {
        Key::Named(NamedKey::Escape) if pressed => event_loop.exit(),
        Key::Named(NamedKey::Space) if pressed => state.sim.toggle_pause(),

        Key::Character(c) => {
            if state.keys.set(c.as_str(), pressed) || !pressed {
                return;
            }
            match c.as_str() {
                "r" | "R" => restart(state, config),
                "h" | "H" => state.hud.visible = !state.hud.visible,
                "+" | "=" => state.scene.scale_radii(1.1),
                "-" => state.scene.scale_radii(0.9),
                _ => {}
            }
        }

        _ => {}
    }
}

/// Tear the current run down and start a fresh one with a new scene.
fn restart(state: &mut AppState, config: &FlockConfig) {
    let paused = state.sim.state();
    state.sim.shutdown();
    state.scene = Scene::from_config(&config.obstacles);
    state.sim = launch(&state.backend, state.mesh.index_info(), config, &state.scene.obstacles);
    state.sim.set_state(paused);
    state.physics = FixedTimestep::new(FIXED_TIMESTEP, MAX_PHYSICS_STEPS_PER_FRAME);
    log::info!("Simulation restarted");
}

// ======================== Frame Rendering ========================

fn redraw(state: &mut AppState) {
    // Physics follows wall-clock time; the kernel integrates the smoothed delta.
    let raw_dt = state.clock.tick();
    let dt = state.clock.smoothed_delta();

    // ---- Fixed-cadence physics ----
    let steps = state.physics.advance(raw_dt);
    for _ in 0..steps {
        state.scene.fixed_update(state.physics.step());
        state.sim.physics_step(&state.scene.obstacles);
    }

    // ---- Camera ----
    let keys = &state.keys;
    state
        .camera
        .apply_orbit(keys.orbit_up, keys.orbit_down, keys.orbit_left, keys.orbit_right);
    state.camera.apply_zoom_keys(keys.zoom_in, keys.zoom_out);

    let win_w = state.surface_config.width;
    let win_h = state.surface_config.height;
    let aspect = win_w as f32 / win_h.max(1) as f32;
    let uniforms = state.camera.uniforms(aspect, state.sim.config().boid_scale);
    state.renderer.update_camera(&state.backend.queue, &uniforms);

    let output = match state.surface.get_current_texture() {
        Ok(t) => t,
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            state
                .surface
                .configure(&state.backend.device, &state.surface_config);
            return;
        }
        Err(e) => {
            log::error!("Surface error: {:?}", e);
            return;
        }
    };

    // ---- Simulation + boids ----
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    state.renderer.begin_frame(view);
    state.sim.frame(dt, &mut state.renderer);
    state.renderer.end_frame(&state.backend);

    // ---- HUD ----
    if state.hud.visible {
        let stats = HudStats {
            boids: state.sim.agent_count(),
            obstacles: state.sim.obstacle_count(),
            work_groups: state.sim.group_count(),
            frame: state.sim.frame_index(),
            fps: state.clock.fps(),
            state: state.sim.state(),
            inert: state.sim.is_inert(),
        };
        let hud_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        state
            .hud
            .prepare(&state.backend.device, &state.backend.queue, &stats, win_w, win_h);
        state
            .hud
            .render(&state.backend.device, &state.backend.queue, &hud_view);
    }

    output.present();
    state.hud.trim();
}
