use std::sync::Arc;

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3, Vector4};
use log::debug;

use super::traits::{GizmoEvent, ManipulationGizmo};
use crate::gfx::camera::Camera;
use crate::gfx::geometry::{generate_box, GeometryData};
use crate::gfx::picking::{Ray, Raycaster};
use crate::gfx::scene::{Mesh, NodeId, SceneGraph, SceneNode};

/// Handle size as a fraction of the camera distance
const SCREEN_SCALE: f32 = 0.15;

/// Degree of freedom a translate handle controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleAxis {
    X,
    Y,
    Z,
    /// Free movement in the camera-facing plane
    Free,
}

impl HandleAxis {
    pub const ALL: [HandleAxis; 4] = [HandleAxis::X, HandleAxis::Y, HandleAxis::Z, HandleAxis::Free];

    /// Node name of the handle; part of the reserved helper names
    pub fn name(&self) -> &'static str {
        match self {
            HandleAxis::X => "X",
            HandleAxis::Y => "Y",
            HandleAxis::Z => "Z",
            HandleAxis::Free => "XYZ",
        }
    }

    pub fn direction(&self) -> Option<Vector3<f32>> {
        match self {
            HandleAxis::X => Some(Vector3::unit_x()),
            HandleAxis::Y => Some(Vector3::unit_y()),
            HandleAxis::Z => Some(Vector3::unit_z()),
            HandleAxis::Free => None,
        }
    }

    fn color(&self) -> [f32; 4] {
        match self {
            HandleAxis::X => [0.9, 0.2, 0.2, 1.0],
            HandleAxis::Y => [0.2, 0.85, 0.2, 1.0],
            HandleAxis::Z => [0.25, 0.4, 0.95, 1.0],
            HandleAxis::Free => [0.95, 0.85, 0.2, 1.0],
        }
    }

    fn geometry(&self) -> GeometryData {
        let arrow = |axis: usize| {
            let mut shaft = [0.04; 3];
            shaft[axis] = 0.5;
            let mut offset = [0.0; 3];
            offset[axis] = 0.5;
            let mut tip = [0.0; 3];
            tip[axis] = 1.0;
            generate_box(shaft)
                .translated(offset)
                .merge(generate_box([0.09; 3]).translated(tip))
        };
        match self {
            HandleAxis::X => arrow(0),
            HandleAxis::Y => arrow(1),
            HandleAxis::Z => arrow(2),
            HandleAxis::Free => generate_box([0.12; 3]),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    node: NodeId,
    axis: HandleAxis,
    plane_point: Vector3<f32>,
    plane_normal: Vector3<f32>,
    start_hit: Vector3<f32>,
    start_position: Vector3<f32>,
    parent_inverse: Matrix4<f32>,
}

/// Translate gizmo with one handle per world axis and a free-move center
#[derive(Debug, Default)]
pub struct TranslateGizmo {
    root: Option<NodeId>,
    handles: Vec<(NodeId, HandleAxis)>,
    attached: Option<NodeId>,
    drag: Option<Drag>,
    events: Vec<GizmoEvent>,
    raycaster: Raycaster,
}

fn world_origin(graph: &SceneGraph, node: NodeId) -> Vector3<f32> {
    let origin = graph.world_matrix(node) * Vector4::new(0.0, 0.0, 0.0, 1.0);
    origin.truncate() / origin.w
}

impl TranslateGizmo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn handle(&self, axis: HandleAxis) -> Option<NodeId> {
        self.handles
            .iter()
            .find(|(_, a)| *a == axis)
            .map(|(id, _)| *id)
    }

    /// Axis of the grabbed handle
    pub fn active_axis(&self) -> Option<HandleAxis> {
        self.drag.map(|d| d.axis)
    }

    fn set_visible(&self, graph: &mut SceneGraph, visible: bool) {
        if let Some(root) = self.root.and_then(|id| graph.get_mut(id)) {
            root.visible = visible;
        }
    }

    /// Move the handles onto the attached node
    fn follow_attached(&self, graph: &mut SceneGraph) {
        let (Some(root), Some(attached)) = (self.root, self.attached) else {
            return;
        };
        let position = world_origin(graph, attached);
        if let Some(root_node) = graph.get_mut(root) {
            root_node.transform.position = position;
        }
    }

    fn nearest_handle(&self, graph: &SceneGraph, ray: &Ray) -> Option<HandleAxis> {
        self.handles
            .iter()
            .filter(|(id, _)| graph.is_visible(*id))
            .filter_map(|(id, axis)| {
                let node = graph.get(*id)?;
                let hit = self
                    .raycaster
                    .intersect_node(ray, *id, node, &graph.world_matrix(*id))?;
                Some((hit.distance, *axis))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, axis)| axis)
    }

    /// Plane the drag happens in: contains the axis and faces the ray as much
    /// as possible; the free handle uses the camera-facing plane
    fn drag_plane_normal(axis: HandleAxis, ray: &Ray) -> Vector3<f32> {
        match axis.direction() {
            Some(direction) => {
                let candidates = [Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z()];
                candidates
                    .into_iter()
                    .filter(|n| n.dot(direction).abs() < 0.5)
                    .max_by(|a, b| {
                        a.dot(ray.direction)
                            .abs()
                            .total_cmp(&b.dot(ray.direction).abs())
                    })
                    .unwrap_or(Vector3::unit_y())
            }
            None => -ray.direction,
        }
    }
}

impl ManipulationGizmo for TranslateGizmo {
    fn install(&mut self, graph: &mut SceneGraph) {
        if self.root.is_some_and(|root| graph.contains(root)) {
            return;
        }

        let mut root = SceneNode::new("TransformGizmo");
        root.tool_helper = true;
        root.overlay = true;
        root.visible = false;
        let root_id = graph.add_node(root, None);

        self.handles = HandleAxis::ALL
            .iter()
            .map(|axis| {
                let mesh: Arc<Mesh> = Arc::new(axis.geometry().into_mesh());
                let mut handle = SceneNode::with_mesh(axis.name(), mesh);
                handle.tool_helper = true;
                handle.overlay = true;
                handle.color = axis.color();
                (graph.add_node(handle, Some(root_id)), *axis)
            })
            .collect();
        self.root = Some(root_id);

        if self.attached.is_some() {
            self.set_visible(graph, true);
            self.follow_attached(graph);
        }
    }

    fn uninstall(&mut self, graph: &mut SceneGraph) {
        if let Some(root) = self.root.take() {
            graph.remove(root);
        }
        self.handles.clear();
        self.drag = None;
    }

    fn attach(&mut self, graph: &mut SceneGraph, node: NodeId) {
        if self.attached != Some(node) {
            self.pointer_up(graph);
        }
        self.attached = Some(node);
        self.set_visible(graph, true);
        self.follow_attached(graph);
    }

    fn detach(&mut self, graph: &mut SceneGraph) {
        self.pointer_up(graph);
        self.attached = None;
        self.set_visible(graph, false);
    }

    fn attached(&self) -> Option<NodeId> {
        self.attached
    }

    fn is_handle(&self, node: NodeId) -> bool {
        self.root == Some(node) || self.handles.iter().any(|(id, _)| *id == node)
    }

    fn pointer_down(&mut self, graph: &mut SceneGraph, ray: &Ray) -> bool {
        let Some(node) = self.attached.filter(|id| graph.contains(*id)) else {
            return false;
        };
        let Some(axis) = self.nearest_handle(graph, ray) else {
            return false;
        };

        let plane_point = world_origin(graph, node);
        let plane_normal = Self::drag_plane_normal(axis, ray);
        let Some(t) = ray.intersect_plane(plane_point, plane_normal) else {
            return false;
        };
        let parent_inverse = graph
            .parent(node)
            .and_then(|parent| graph.world_matrix(parent).invert())
            .unwrap_or_else(Matrix4::identity);
        let Some(start_position) = graph.get(node).map(|n| n.transform.position) else {
            return false;
        };

        debug!("Grabbed {} handle", axis.name());
        self.drag = Some(Drag {
            node,
            axis,
            plane_point,
            plane_normal,
            start_hit: ray.point_at(t),
            start_position,
            parent_inverse,
        });
        self.events.push(GizmoEvent::DragStarted(node));
        true
    }

    fn pointer_move(&mut self, graph: &mut SceneGraph, ray: &Ray) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        let Some(t) = ray.intersect_plane(drag.plane_point, drag.plane_normal) else {
            return false;
        };

        let mut delta = ray.point_at(t) - drag.start_hit;
        if let Some(direction) = drag.axis.direction() {
            delta = direction * delta.dot(direction);
        }
        let local_delta = (drag.parent_inverse * delta.extend(0.0)).truncate();

        let Some(node) = graph.get_mut(drag.node) else {
            self.drag = None;
            return false;
        };
        node.transform.position = drag.start_position + local_delta;
        self.follow_attached(graph);
        self.events.push(GizmoEvent::Changed(drag.node));
        true
    }

    fn pointer_up(&mut self, _graph: &mut SceneGraph) {
        if let Some(drag) = self.drag.take() {
            self.events.push(GizmoEvent::DragEnded(drag.node));
        }
    }

    fn is_active(&self) -> bool {
        self.drag.is_some()
    }

    fn update_camera(&mut self, graph: &mut SceneGraph, camera: &dyn Camera) {
        if self.attached.is_some_and(|id| !graph.contains(id)) {
            self.detach(graph);
        }
        let (Some(root), Some(_)) = (self.root, self.attached) else {
            return;
        };
        self.follow_attached(graph);

        if let Some(root_node) = graph.get_mut(root) {
            let distance = (camera.position() - root_node.transform.position).magnitude();
            let scale = (distance * SCREEN_SCALE).max(0.01);
            root_node.transform.scale = Vector3::new(scale, scale, scale);
        }
    }

    fn take_events(&mut self) -> Vec<GizmoEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::PerspectiveCamera;
    use crate::gfx::scene::Transform;
    use cgmath::{One, Quaternion, Zero};

    fn scene_with_target() -> (SceneGraph, NodeId, TranslateGizmo) {
        let mut graph = SceneGraph::new();
        let mut target = SceneNode::new("target");
        target.transform = Transform::from_position(Vector3::new(0.0, 0.0, -5.0));
        let target = graph.add_node(target, None);
        let mut gizmo = TranslateGizmo::new();
        gizmo.install(&mut graph);
        (graph, target, gizmo)
    }

    #[test]
    fn test_install_creates_flagged_helpers_once() {
        let (mut graph, _, mut gizmo) = scene_with_target();
        let count = graph.len();
        gizmo.install(&mut graph);
        assert_eq!(graph.len(), count);

        for axis in HandleAxis::ALL {
            let id = gizmo.handle(axis).unwrap();
            let node = graph.get(id).unwrap();
            assert!(node.tool_helper);
            assert_eq!(node.name, axis.name());
            assert!(gizmo.is_handle(id));
        }
        assert!(!graph.is_visible(gizmo.handle(HandleAxis::X).unwrap()));
    }

    #[test]
    fn test_attach_shows_handles_on_target() {
        let (mut graph, target, mut gizmo) = scene_with_target();
        gizmo.attach(&mut graph, target);

        let root = gizmo.root().unwrap();
        assert!(graph.get(root).unwrap().visible);
        assert_eq!(
            graph.get(root).unwrap().transform.position,
            Vector3::new(0.0, 0.0, -5.0)
        );

        gizmo.detach(&mut graph);
        assert!(!graph.get(root).unwrap().visible);
        assert_eq!(gizmo.attached(), None);
    }

    #[test]
    fn test_drag_x_handle_translates_along_x_only() {
        let (mut graph, target, mut gizmo) = scene_with_target();
        gizmo.attach(&mut graph, target);

        // Looking down at the X arrow from above
        let grab = Ray::new(Vector3::new(0.6, 5.0, -5.0), Vector3::new(0.0, -1.0, 0.0));
        assert!(gizmo.pointer_down(&mut graph, &grab));
        assert_eq!(gizmo.active_axis(), Some(HandleAxis::X));

        let moved = Ray::new(Vector3::new(2.6, 5.0, -4.0), Vector3::new(0.0, -1.0, 0.0));
        assert!(gizmo.pointer_move(&mut graph, &moved));

        let position = graph.get(target).unwrap().transform.position;
        assert!((position - Vector3::new(2.0, 0.0, -5.0)).magnitude() < 1e-4);

        gizmo.pointer_up(&mut graph);
        assert!(!gizmo.is_active());
        assert_eq!(
            gizmo.take_events(),
            vec![
                GizmoEvent::DragStarted(target),
                GizmoEvent::Changed(target),
                GizmoEvent::DragEnded(target),
            ]
        );
        assert!(gizmo.take_events().is_empty());
    }

    #[test]
    fn test_press_off_handles_does_not_grab() {
        let (mut graph, target, mut gizmo) = scene_with_target();
        gizmo.attach(&mut graph, target);
        let miss = Ray::new(Vector3::new(10.0, 5.0, -5.0), Vector3::new(0.0, -1.0, 0.0));
        assert!(!gizmo.pointer_down(&mut graph, &miss));
        assert!(!gizmo.pointer_move(&mut graph, &miss));
    }

    #[test]
    fn test_camera_update_scales_and_drops_removed_target() {
        let (mut graph, target, mut gizmo) = scene_with_target();
        gizmo.attach(&mut graph, target);

        let mut camera = PerspectiveCamera::default();
        camera.set_pose(Vector3::zero(), Quaternion::one());
        gizmo.update_camera(&mut graph, &camera);
        let scale = graph.get(gizmo.root().unwrap()).unwrap().transform.scale;
        assert!((scale.x - 5.0 * SCREEN_SCALE).abs() < 1e-5);

        graph.remove(target);
        gizmo.update_camera(&mut graph, &camera);
        assert_eq!(gizmo.attached(), None);
    }
}
