//! # Procedural Geometry Generation
//!
//! Primitive shapes for the default scene content and the gizmo handles.
//!
//! ## Usage
//!
//! ```rust
//! use vantage::gfx::geometry::{generate_box, generate_cube};
//!
//! let cube = generate_cube().into_mesh();
//! let shaft = generate_box([0.5, 0.02, 0.02]);
//! assert_eq!(cube.triangle_count(), 12);
//! assert_eq!(shaft.triangle_count(), 12);
//! ```

pub mod primitives;

pub use primitives::*;

use crate::gfx::scene::{Mesh, Vertex3D};

/// Generated geometry data ready for conversion into a [`Mesh`]
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of vertices in this geometry
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles in this geometry
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Shift every vertex by `offset`
    pub fn translated(mut self, offset: [f32; 3]) -> Self {
        for vertex in &mut self.vertices {
            vertex[0] += offset[0];
            vertex[1] += offset[1];
            vertex[2] += offset[2];
        }
        self
    }

    /// Uniformly scale every vertex
    pub fn scaled(mut self, factor: f32) -> Self {
        for vertex in &mut self.vertices {
            vertex.iter_mut().for_each(|c| *c *= factor);
        }
        self
    }

    /// Append another geometry, re-basing its indices
    pub fn merge(mut self, other: GeometryData) -> Self {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.normals.extend(other.normals);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
        self
    }

    pub fn into_mesh(self) -> Mesh {
        let vertices = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex3D {
                position: *position,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            })
            .collect();
        Mesh::from_vertices(vertices, self.indices)
    }
}
