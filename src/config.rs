// ============================================================================
// config.rs — GpuFlock
// Flock configuration, obstacle scene description, and fixed constants.
// ============================================================================

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FlockError;
use crate::renderer::DrawBounds;

/// Name of the compute entry point in `shaders/flock.wgsl`.
pub const KERNEL_ENTRY_POINT: &str = "do_flock";

/// Seconds per physics step (obstacle motion + obstacle buffer refresh).
pub const FIXED_TIMESTEP: f32 = 0.02;

/// Upper bound on physics steps run inside a single rendered frame.
pub const MAX_PHYSICS_STEPS_PER_FRAME: u32 = 8;

/// Static volume handed to the instanced draw. It must contain every boid
/// for the whole run: boids outside it are culled together with the batch
/// whenever the volume leaves the view. Never recomputed from boid positions.
pub const DRAW_BOUNDS: DrawBounds = DrawBounds {
    center: [0.0, 0.0, 0.0],
    extent: [100.0, 100.0, 100.0],
};

/// Every option recognized by the simulation, set once before start.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    // Population
    pub boid_count: u32,
    pub spawn_radius: f32,
    /// Spawn point of the flock; also the point boids seek.
    pub spawn_center: [f32; 3],
    pub seed: Option<u64>,

    // Behaviour
    pub neighbour_radius: f32,
    pub turn_speed: f32,
    pub velocity: f32,

    // Weights
    pub weight_alignment: f32,
    pub weight_cohesion: f32,
    pub weight_separation: f32,
    pub weight_seek: f32,

    // Avoidance
    pub avoidance_multiplier: f32,

    pub paused: bool,

    /// Visual size of a single boid mesh.
    pub boid_scale: f32,

    pub obstacles: Vec<ObstacleConfig>,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            boid_count: 100,
            spawn_radius: 3.0,
            spawn_center: [0.0, 0.0, 0.0],
            seed: None,
            neighbour_radius: 0.7,
            turn_speed: 0.5,
            velocity: 5.0,
            weight_alignment: 1.0,
            weight_cohesion: 1.0,
            weight_separation: 1.0,
            weight_seek: 1.0,
            avoidance_multiplier: 5.0,
            paused: false,
            boid_scale: 0.25,
            obstacles: vec![
                ObstacleConfig {
                    orbit_center: [0.0, 0.0, 0.0],
                    orbit_radius: 12.0,
                    angular_speed: 0.4,
                    phase: 0.0,
                    avoidance_radius: 10.0,
                },
                ObstacleConfig {
                    orbit_center: [0.0, 4.0, 0.0],
                    orbit_radius: 20.0,
                    angular_speed: -0.25,
                    phase: std::f32::consts::PI,
                    avoidance_radius: 6.0,
                },
            ],
        }
    }
}

/// One obstacle of the demo scene: circles `orbit_center` in the XZ plane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    pub orbit_center: [f32; 3],
    pub orbit_radius: f32,
    /// Radians per second; negative orbits clockwise.
    pub angular_speed: f32,
    pub phase: f32,
    pub avoidance_radius: f32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            orbit_center: [0.0, 0.0, 0.0],
            orbit_radius: 0.0,
            angular_speed: 0.0,
            phase: 0.0,
            avoidance_radius: 10.0,
        }
    }
}

impl FlockConfig {
    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FlockError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| FlockError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| FlockError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Log a warning for every field that is recommended to be non-negative
    /// but is not. Returns the offending field names; nothing is clamped.
    pub fn validate(&self) -> Vec<&'static str> {
        let fields = [
            ("spawn_radius", self.spawn_radius),
            ("neighbour_radius", self.neighbour_radius),
            ("turn_speed", self.turn_speed),
            ("velocity", self.velocity),
            ("avoidance_multiplier", self.avoidance_multiplier),
        ];
        let negative: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| *value < 0.0)
            .map(|(name, _)| *name)
            .collect();
        for name in &negative {
            log::warn!("Config field `{}` is negative; flocking may misbehave", name);
        }
        negative
    }
}
