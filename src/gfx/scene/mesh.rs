use cgmath::{InnerSpace, Vector3};

use super::vertex::Vertex3D;
use crate::gfx::picking::AABB;

/// CPU-side triangle mesh
///
/// Meshes are immutable once built and shared between nodes through `Arc`;
/// the renderer uploads each one lazily.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Build a mesh from flat position/normal arrays
    ///
    /// Missing or mismatched normals are recomputed from the triangles.
    pub fn new(positions: Vec<f32>, normals: Vec<f32>, indices: Vec<u32>) -> Self {
        let normals = if normals.len() == positions.len() {
            normals
        } else {
            Self::calculate_smooth_normals(&positions, &indices)
        };

        let vertices = positions
            .chunks_exact(3)
            .zip(normals.chunks_exact(3))
            .map(|(p, n)| Vertex3D {
                position: [p[0], p[1], p[2]],
                normal: [n[0], n[1], n[2]],
            })
            .collect();

        Self::from_vertices(vertices, indices)
    }

    /// Build a mesh from ready vertices; out-of-range triangles are dropped
    pub fn from_vertices(vertices: Vec<Vertex3D>, indices: Vec<u32>) -> Self {
        let count = vertices.len() as u32;
        let indices = indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| i < count))
            .flatten()
            .copied()
            .collect();
        Self { vertices, indices }
    }

    /// Area-weighted vertex normals, returned flat like `positions`
    pub fn calculate_smooth_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
        let vertex_count = positions.len() / 3;
        let mut accumulated = vec![Vector3::new(0.0f32, 0.0, 0.0); vertex_count];
        let position = |i: usize| {
            Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2])
        };

        for triangle in indices.chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }
            let face = (position(i1) - position(i0)).cross(position(i2) - position(i0));
            for i in [i0, i1, i2] {
                accumulated[i] += face;
            }
        }

        accumulated
            .into_iter()
            .flat_map(|n| {
                let n = if n.magnitude2() > 0.0 {
                    n.normalize()
                } else {
                    Vector3::unit_y()
                };
                [n.x, n.y, n.z]
            })
            .collect()
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Triangles as corner positions in mesh space
    pub fn triangles(&self) -> impl Iterator<Item = [Vector3<f32>; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            [tri[0], tri[1], tri[2]].map(|i| Vector3::from(self.vertices[i as usize].position))
        })
    }

    /// Local-space bounds, `None` for a mesh without vertices
    pub fn bounds(&self) -> Option<AABB> {
        if self.vertices.is_empty() {
            return None;
        }
        let positions: Vec<[f32; 3]> = self.vertices.iter().map(|v| v.position).collect();
        Some(AABB::from_vertices(&positions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        Mesh::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            Vec::new(),
            vec![0, 1, 2, 2, 3, 0],
        )
    }

    #[test]
    fn test_missing_normals_are_generated() {
        let mesh = quad();
        for vertex in mesh.vertices() {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_out_of_range_triangles_are_dropped() {
        let mesh = Mesh::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            Vec::new(),
            vec![0, 1, 2, 0, 1, 7],
        );
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_bounds() {
        let bounds = quad().bounds().unwrap();
        assert_eq!(bounds.min, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vector3::new(1.0, 1.0, 0.0));
        assert!(Mesh::from_vertices(Vec::new(), Vec::new()).bounds().is_none());
    }
}
