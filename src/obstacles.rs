// ============================================================================
// obstacles.rs — GpuFlock
// Obstacle mirror: host-side packed copy of the live obstacle sources.
// ============================================================================

use glam::Vec3;

use crate::world::ObstacleRecord;

/// A live world object boids steer away from.
pub trait ObstacleSource {
    fn world_position(&self) -> Vec3;
    /// Current avoidance radius. May change between physics steps.
    fn influence_radius(&self) -> f32;
}

/// Packed snapshot of a fixed set of obstacle sources.
///
/// The tracked count is taken from the sources seen at construction and
/// never changes; record `i` always mirrors source `i`.
pub struct ObstacleMirror {
    snapshot: Vec<ObstacleRecord>,
}

impl ObstacleMirror {
    pub fn new<S: ObstacleSource>(sources: &[S]) -> Self {
        let mut mirror = Self {
            snapshot: vec![ObstacleRecord::default(); sources.len()],
        };
        mirror.refresh(sources);
        mirror
    }

    /// Re-read position and radius of every tracked source.
    ///
    /// Extra sources beyond the tracked count are ignored; if fewer are
    /// given, the records without a source keep their last value.
    pub fn refresh<S: ObstacleSource>(&mut self, sources: &[S]) -> &[ObstacleRecord] {
        if sources.len() != self.snapshot.len() {
            log::warn!(
                "Obstacle set changed size ({} tracked, {} given); mirroring tracked prefix",
                self.snapshot.len(),
                sources.len()
            );
        }
        for (record, source) in self.snapshot.iter_mut().zip(sources) {
            *record = ObstacleRecord {
                position: source.world_position().to_array(),
                radius: source.influence_radius(),
            };
        }
        &self.snapshot
    }

    pub fn snapshot(&self) -> &[ObstacleRecord] {
        &self.snapshot
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }
}
