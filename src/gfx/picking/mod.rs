//! # Object Picking System
//!
//! Ray casting against the scene graph, used by the selection tool and the
//! gizmo handles.
//!
//! ## How it works
//!
//! 1. **Pointer to Ray**: Unproject normalized device coordinates through the
//!    inverse view-projection of the active camera
//! 2. **Broad phase**: Test the ray against each node's world-space bounds
//! 3. **Narrow phase**: Test the triangles of nodes whose bounds were hit
//! 4. **Result**: Every hit, sorted nearest first
//!
//! ## Usage
//!
//! ```rust
//! use vantage::gfx::picking::{Ray, Raycaster};
//! use vantage::gfx::scene::SceneGraph;
//! use cgmath::Vector3;
//!
//! let graph = SceneGraph::new();
//! let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
//! assert!(Raycaster::new().intersect_scene(&ray, &graph).is_empty());
//! ```

use cgmath::{
    ElementWise, InnerSpace, Matrix4, SquareMatrix, Vector2, Vector3, Vector4, Zero,
};

use crate::gfx::camera::Camera;
use crate::gfx::scene::{NodeId, SceneGraph, SceneNode};

/// Names the manipulation gizmo gives its handle geometry
pub const RESERVED_HELPER_NAMES: [&str; 11] = [
    "X", "Y", "Z", "E", "XY", "YZ", "XZ", "XYZ", "AXIS", "PLANE", "DELTA",
];

/// Whether a node belongs to the manipulation gizmo
///
/// The helper flag is authoritative; the reserved names catch helpers built
/// without the flag.
pub fn is_tool_helper(node: &SceneNode) -> bool {
    node.tool_helper || RESERVED_HELPER_NAMES.contains(&node.name.as_str())
}

/// A 3D ray for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin point in world space
    pub origin: Vector3<f32>,
    /// Ray direction (normalized)
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Create a new ray
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }

    /// Ray from the camera through a point given in normalized device coordinates
    ///
    /// Returns `None` when the camera matrices are not invertible.
    pub fn from_camera(ndc: Vector2<f32>, camera: &dyn Camera) -> Option<Self> {
        let view_proj = camera.projection_matrix() * camera.view_matrix();
        let inv_view_proj = view_proj.invert()?;

        // Near and far planes in OpenGL clip convention
        let unproject = |z: f32| {
            let world = inv_view_proj * Vector4::new(ndc.x, ndc.y, z, 1.0);
            Vector3::new(world.x / world.w, world.y / world.w, world.z / world.w)
        };
        let near = unproject(-1.0);
        let far = unproject(1.0);

        let direction = far - near;
        if direction.magnitude2() == 0.0 {
            return None;
        }
        Some(Ray::new(near, direction))
    }

    /// Apply a transformation matrix to the ray; direction is not renormalized
    fn transform_unnormalized(&self, matrix: &Matrix4<f32>) -> (Vector3<f32>, Vector3<f32>) {
        let origin = matrix * self.origin.extend(1.0);
        let direction = matrix * self.direction.extend(0.0);
        (origin.truncate() / origin.w, direction.truncate())
    }

    /// Distance to the plane through `point` with `normal`, if ahead of the origin
    pub fn intersect_plane(&self, point: Vector3<f32>, normal: Vector3<f32>) -> Option<f32> {
        let denom = normal.dot(self.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = normal.dot(point - self.origin) / denom;
        (t >= 0.0).then_some(t)
    }
}

/// Axis-aligned bounding box for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl AABB {
    /// Create a new AABB
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Create AABB from a set of vertices
    pub fn from_vertices(vertices: &[[f32; 3]]) -> Self {
        let Some(first) = vertices.first() else {
            return Self::new(Vector3::zero(), Vector3::zero());
        };

        let mut min = Vector3::from(*first);
        let mut max = min;
        for vertex in vertices.iter().skip(1) {
            min.x = min.x.min(vertex[0]);
            min.y = min.y.min(vertex[1]);
            min.z = min.z.min(vertex[2]);
            max.x = max.x.max(vertex[0]);
            max.y = max.y.max(vertex[1]);
            max.z = max.z.max(vertex[2]);
        }

        Self::new(min, max)
    }

    /// Test ray-AABB intersection
    /// Returns the distance to intersection point, or None if no intersection
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv_dir = Vector3::new(
            1.0 / ray.direction.x,
            1.0 / ray.direction.y,
            1.0 / ray.direction.z,
        );

        let t_min = (self.min - ray.origin).mul_element_wise(inv_dir);
        let t_max = (self.max - ray.origin).mul_element_wise(inv_dir);

        let t1 = Vector3::new(
            t_min.x.min(t_max.x),
            t_min.y.min(t_max.y),
            t_min.z.min(t_max.z),
        );
        let t2 = Vector3::new(
            t_min.x.max(t_max.x),
            t_min.y.max(t_max.y),
            t_min.z.max(t_max.z),
        );

        let t_near = t1.x.max(t1.y.max(t1.z));
        let t_far = t2.x.min(t2.y.min(t2.z));

        if t_near <= t_far && t_far >= 0.0 {
            Some(if t_near >= 0.0 { t_near } else { t_far })
        } else {
            None
        }
    }

    /// Apply a transformation matrix to the AABB
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        let corners = [
            [self.min.x, self.min.y, self.min.z],
            [self.max.x, self.min.y, self.min.z],
            [self.min.x, self.max.y, self.min.z],
            [self.min.x, self.min.y, self.max.z],
            [self.max.x, self.max.y, self.min.z],
            [self.max.x, self.min.y, self.max.z],
            [self.min.x, self.max.y, self.max.z],
            [self.max.x, self.max.y, self.max.z],
        ]
        .map(|[x, y, z]| {
            let transformed = matrix * Vector4::new(x, y, z, 1.0);
            [
                transformed.x / transformed.w,
                transformed.y / transformed.w,
                transformed.z / transformed.w,
            ]
        });

        Self::from_vertices(&corners)
    }
}

/// Möller–Trumbore ray/triangle test, returning the ray parameter of the hit
///
/// `direction` need not be unit length; the parameter is then in units of it.
/// Both faces count as hits.
pub fn intersect_triangle(
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    triangle: &[Vector3<f32>; 3],
) -> Option<f32> {
    const EPSILON: f32 = 1e-7;
    let [a, b, c] = *triangle;
    let edge1 = b - a;
    let edge2 = c - a;
    let p = direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

/// A single ray hit against a scene node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub node: NodeId,
    /// Distance from the ray origin in world units
    pub distance: f32,
    /// World space intersection point
    pub point: Vector3<f32>,
}

/// Scene raycaster
///
/// Hidden subtrees are skipped; everything else with a mesh is tested, helpers
/// and non-selectable nodes included. Callers filter the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct Raycaster {
    /// Hits farther than this are ignored
    pub far: Option<f32>,
}

impl Raycaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node the ray hits, nearest first, one entry per node
    pub fn intersect_scene(&self, ray: &Ray, graph: &SceneGraph) -> Vec<Intersection> {
        let mut hits = Vec::new();
        graph.traverse_visible(|id, node, world| {
            if let Some(hit) = self.intersect_node(ray, id, node, world) {
                hits.push(hit);
            }
        });
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Nearest hit against a single node with the given world matrix
    pub fn intersect_node(
        &self,
        ray: &Ray,
        id: NodeId,
        node: &SceneNode,
        world: &Matrix4<f32>,
    ) -> Option<Intersection> {
        let mesh = node.mesh.as_ref()?;
        let bounds = mesh.bounds()?;
        bounds.transform(world).intersect_ray(ray)?;

        let inverse = world.invert()?;
        let (local_origin, local_direction) = ray.transform_unnormalized(&inverse);

        // The local parameter equals world distance along the unit world ray
        let distance = mesh
            .triangles()
            .filter_map(|triangle| intersect_triangle(local_origin, local_direction, &triangle))
            .min_by(f32::total_cmp)?;

        if self.far.is_some_and(|far| distance > far) {
            return None;
        }

        Some(Intersection {
            node: id,
            distance,
            point: ray.point_at(distance),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::PerspectiveCamera;
    use crate::gfx::geometry::generate_cube;
    use crate::gfx::scene::{Mesh, Transform};
    use cgmath::{One, Quaternion};
    use std::sync::Arc;

    fn cube_node(name: &str, position: Vector3<f32>) -> SceneNode {
        let mut node = SceneNode::with_mesh(name, Arc::new(generate_cube().into_mesh()));
        node.transform = Transform::from_position(position);
        node
    }

    #[test]
    fn test_aabb_creation() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [-1.0, -1.0, -1.0]];
        let aabb = AABB::from_vertices(&vertices);

        assert_eq!(aabb.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_ray_aabb_intersection() {
        let aabb = AABB::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));

        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(aabb.intersect_ray(&ray), Some(4.0));

        let ray_miss = Ray::new(Vector3::new(5.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray_miss).is_none());
    }

    #[test]
    fn test_triangle_hit_and_miss() {
        let triangle = [
            Vector3::new(-1.0, -1.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let origin = Vector3::new(0.0, 0.0, 3.0);
        let t = intersect_triangle(origin, Vector3::new(0.0, 0.0, -1.0), &triangle);
        assert!((t.unwrap() - 3.0).abs() < 1e-6);

        let behind = intersect_triangle(origin, Vector3::new(0.0, 0.0, 1.0), &triangle);
        assert!(behind.is_none());
    }

    #[test]
    fn test_scene_hits_sorted_nearest_first() {
        let mut graph = SceneGraph::new();
        let far = graph.add_node(cube_node("far", Vector3::new(0.0, 0.0, -10.0)), None);
        let near = graph.add_node(cube_node("near", Vector3::new(0.0, 0.0, -2.0)), None);
        graph.add_node(cube_node("aside", Vector3::new(5.0, 0.0, -2.0)), None);

        let ray = Ray::new(Vector3::zero(), Vector3::new(0.0, 0.0, -1.0));
        let hits = Raycaster::new().intersect_scene(&ray, &graph);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, near);
        assert!((hits[0].distance - 1.5).abs() < 1e-5);
        assert_eq!(hits[1].node, far);
    }

    #[test]
    fn test_scaled_node_distance_is_in_world_units() {
        let mut graph = SceneGraph::new();
        let mut node = cube_node("big", Vector3::new(0.0, 0.0, -10.0));
        node.transform.scale = Vector3::new(4.0, 4.0, 4.0);
        graph.add_node(node, None);

        let ray = Ray::new(Vector3::zero(), Vector3::new(0.0, 0.0, -1.0));
        let hits = Raycaster::new().intersect_scene(&ray, &graph);
        assert!((hits[0].distance - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_hidden_nodes_are_skipped() {
        let mut graph = SceneGraph::new();
        let mut node = cube_node("hidden", Vector3::new(0.0, 0.0, -3.0));
        node.visible = false;
        graph.add_node(node, None);

        let ray = Ray::new(Vector3::zero(), Vector3::new(0.0, 0.0, -1.0));
        assert!(Raycaster::new().intersect_scene(&ray, &graph).is_empty());
    }

    #[test]
    fn test_camera_center_ray_points_forward() {
        let mut camera = PerspectiveCamera::default();
        camera.set_pose(Vector3::new(0.0, 1.0, 0.0), Quaternion::one());
        let ray = Ray::from_camera(Vector2::new(0.0, 0.0), &camera).unwrap();
        assert!((ray.direction - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-4);
        assert!((ray.origin.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_helper_detection() {
        let mut flagged = SceneNode::new("handle");
        flagged.tool_helper = true;
        assert!(is_tool_helper(&flagged));
        assert!(is_tool_helper(&SceneNode::new("XYZ")));
        assert!(!is_tool_helper(&SceneNode::new("xyz")));
        assert!(!is_tool_helper(&SceneNode::with_mesh(
            "model",
            Arc::new(Mesh::from_vertices(Vec::new(), Vec::new()))
        )));
    }
}
