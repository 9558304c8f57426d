// ============================================================================
// camera.rs — GpuFlock
// Orbit camera state & GPU uniform for the boid material.
// ============================================================================

use glam::{Mat4, Vec3};

/// GPU-side camera uniforms uploaded every frame (`Camera` in boid.wgsl).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    /// x: boid scale
    pub style: [f32; 4],
}

impl Default for CameraUniforms {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            eye: [0.0, 0.0, 0.0, 1.0],
            style: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

const MIN_DISTANCE: f32 = 2.0;
const MAX_DISTANCE: f32 = 150.0;
const PITCH_LIMIT: f32 = 1.5;

/// CPU-side camera orbiting `focus` between frames.
pub struct CameraState {
    pub focus: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            focus: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.35,
            distance: 45.0,
        }
    }
}

impl CameraState {
    pub fn looking_at(focus: Vec3) -> Self {
        Self {
            focus,
            ..Default::default()
        }
    }

    /// Apply continuous orbit from held keys.
    pub fn apply_orbit(&mut self, up: bool, down: bool, left: bool, right: bool) {
        let speed = 0.02;
        if up {
            self.pitch += speed;
        }
        if down {
            self.pitch -= speed;
        }
        if left {
            self.yaw -= speed;
        }
        if right {
            self.yaw += speed;
        }
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Apply continuous zoom from held keys.
    pub fn apply_zoom_keys(&mut self, zoom_in: bool, zoom_out: bool) {
        if zoom_in {
            self.distance = (self.distance * 0.98).max(MIN_DISTANCE);
        }
        if zoom_out {
            self.distance = (self.distance * 1.02).min(MAX_DISTANCE);
        }
    }

    /// Apply scroll-wheel zoom.
    pub fn apply_scroll(&mut self, scroll_y: f32) {
        self.distance *= 1.0 - scroll_y * 0.1;
        self.distance = self.distance.clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn eye(&self) -> Vec3 {
        let dir = Vec3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.cos(),
        );
        self.focus + dir * self.distance
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let proj = Mat4::perspective_rh(60f32.to_radians(), aspect.max(1e-3), 0.1, 500.0);
        proj * Mat4::look_at_rh(self.eye(), self.focus, Vec3::Y)
    }

    /// Build the GPU uniform from current state.
    pub fn uniforms(&self, aspect: f32, boid_scale: f32) -> CameraUniforms {
        CameraUniforms {
            view_proj: self.view_proj(aspect).to_cols_array_2d(),
            eye: self.eye().extend(1.0).to_array(),
            style: [boid_scale, 0.0, 0.0, 0.0],
        }
    }
}
