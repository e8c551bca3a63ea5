use std::sync::Arc;

use cgmath::{Matrix4, One, Quaternion, Vector3, Zero};

use super::mesh::Mesh;

pub const DEFAULT_NODE_COLOR: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

/// Local translation, rotation and scale of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Local-to-parent matrix, `T * R * S`
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// A node tree not yet attached to a scene graph
///
/// Parsers produce these on worker threads; [`SceneGraph::add_tree`] absorbs
/// them into the arena.
///
/// [`SceneGraph::add_tree`]: super::SceneGraph::add_tree
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Arc<Mesh>>,
    pub color: [f32; 4],
    pub selectable: bool,
    pub tool_helper: bool,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh: None,
            color: DEFAULT_NODE_COLOR,
            selectable: false,
            tool_helper: false,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            mesh: Some(Arc::new(mesh)),
            ..Self::new(name)
        }
    }

    pub fn with_child(mut self, child: ModelNode) -> Self {
        self.children.push(child);
        self
    }

    /// Visit this node and all descendants depth-first
    pub fn visit_mut(&mut self, visitor: &mut impl FnMut(&mut ModelNode)) {
        visitor(self);
        for child in &mut self.children {
            child.visit_mut(visitor);
        }
    }

    pub fn visit(&self, visitor: &mut impl FnMut(&ModelNode)) {
        visitor(self);
        for child in &self.children {
            child.visit(visitor);
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ModelNode::node_count).sum::<usize>()
    }
}

/// A node living inside a [`SceneGraph`](super::SceneGraph)
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Arc<Mesh>>,
    pub color: [f32; 4],
    /// Whether the selection tool may pick this node
    pub selectable: bool,
    /// Geometry belonging to the manipulation gizmo itself
    pub tool_helper: bool,
    pub visible: bool,
    /// Drawn after the scene without depth testing
    pub overlay: bool,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh: None,
            color: DEFAULT_NODE_COLOR,
            selectable: false,
            tool_helper: false,
            visible: true,
            overlay: false,
        }
    }

    pub fn with_mesh(name: impl Into<String>, mesh: Arc<Mesh>) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::new(name)
        }
    }

    pub(crate) fn from_model(model: &ModelNode) -> Self {
        Self {
            name: model.name.clone(),
            transform: model.transform,
            mesh: model.mesh.clone(),
            color: model.color,
            selectable: model.selectable,
            tool_helper: model.tool_helper,
            visible: true,
            overlay: false,
        }
    }
}
