// ============================================================================
// scene.rs — GpuFlock
// Demo obstacle objects: each circles its own center at a fixed rate.
// ============================================================================

use glam::Vec3;

use crate::config::ObstacleConfig;
use crate::obstacles::ObstacleSource;

pub struct OrbitingObstacle {
    center: Vec3,
    orbit_radius: f32,
    angular_speed: f32,
    angle: f32,
    pub avoidance_radius: f32,
}

impl OrbitingObstacle {
    pub fn from_config(config: &ObstacleConfig) -> Self {
        Self {
            center: Vec3::from_array(config.orbit_center),
            orbit_radius: config.orbit_radius,
            angular_speed: config.angular_speed,
            angle: config.phase,
            avoidance_radius: config.avoidance_radius,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.angle = (self.angle + self.angular_speed * dt) % std::f32::consts::TAU;
    }
}

impl ObstacleSource for OrbitingObstacle {
    fn world_position(&self) -> Vec3 {
        self.center + Vec3::new(self.angle.cos(), 0.0, self.angle.sin()) * self.orbit_radius
    }

    fn influence_radius(&self) -> f32 {
        self.avoidance_radius
    }
}

/// The obstacle objects living alongside the flock. Advanced once per
/// physics step, before the obstacle mirror reads them.
pub struct Scene {
    pub obstacles: Vec<OrbitingObstacle>,
}

impl Scene {
    pub fn from_config(obstacles: &[ObstacleConfig]) -> Self {
        Self {
            obstacles: obstacles.iter().map(OrbitingObstacle::from_config).collect(),
        }
    }

    pub fn fixed_update(&mut self, dt: f32) {
        for obstacle in &mut self.obstacles {
            obstacle.advance(dt);
        }
    }

    /// Grow or shrink every avoidance radius, never below 0.1.
    pub fn scale_radii(&mut self, factor: f32) {
        for obstacle in &mut self.obstacles {
            obstacle.avoidance_radius = (obstacle.avoidance_radius * factor).max(0.1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orbit(radius: f32, speed: f32) -> ObstacleConfig {
        ObstacleConfig {
            orbit_center: [1.0, 2.0, 3.0],
            orbit_radius: radius,
            angular_speed: speed,
            phase: 0.0,
            avoidance_radius: 4.0,
        }
    }

    #[test]
    fn orbit_keeps_distance_from_center() {
        let mut obstacle = OrbitingObstacle::from_config(&orbit(5.0, 1.3));
        for _ in 0..100 {
            obstacle.advance(0.02);
            let d = obstacle.world_position().distance(Vec3::new(1.0, 2.0, 3.0));
            assert!((d - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn stationary_obstacle_stays_put() {
        let mut scene = Scene::from_config(&[orbit(0.0, 2.0)]);
        scene.fixed_update(1.0);
        assert_eq!(scene.obstacles[0].world_position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn radius_scaling_is_visible_through_source() {
        let mut scene = Scene::from_config(&[orbit(1.0, 0.0)]);
        scene.scale_radii(1.5);
        assert_eq!(scene.obstacles[0].influence_radius(), 6.0);
        scene.scale_radii(0.0);
        assert_eq!(scene.obstacles[0].influence_radius(), 0.1);
    }
}
