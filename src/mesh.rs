// ============================================================================
// mesh.rs — GpuFlock
// The boid mesh asset: a small dart pointing down +Z, flat shaded.
// ============================================================================

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Where the instanced draw finds its indices inside the mesh buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshIndexInfo {
    pub index_count: u32,
    pub first_index: u32,
    pub base_vertex: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

pub struct BoidMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl BoidMesh {
    /// Four-sided pyramid, nose at +Z, unit length.
    pub fn dart() -> Self {
        let nose = Vec3::new(0.0, 0.0, 0.7);
        let tail = [
            Vec3::new(-0.25, 0.0, -0.3),
            Vec3::new(0.0, 0.15, -0.3),
            Vec3::new(0.25, 0.0, -0.3),
            Vec3::new(0.0, -0.15, -0.3),
        ];

        let mut triangles: Vec<[Vec3; 3]> = (0..4)
            .map(|i| [nose, tail[(i + 1) % 4], tail[i]])
            .collect();
        // Tail cap
        triangles.push([tail[0], tail[1], tail[2]]);
        triangles.push([tail[0], tail[2], tail[3]]);

        let mut vertices = Vec::with_capacity(triangles.len() * 3);
        for [a, b, c] in triangles {
            let normal = (b - a).cross(c - a).normalize_or_zero().to_array();
            for p in [a, b, c] {
                vertices.push(MeshVertex {
                    position: p.to_array(),
                    normal,
                });
            }
        }
        let indices = (0..vertices.len() as u32).collect();

        Self { vertices, indices }
    }

    pub fn index_info(&self) -> MeshIndexInfo {
        MeshIndexInfo {
            index_count: self.indices.len() as u32,
            first_index: 0,
            base_vertex: 0,
        }
    }
}
