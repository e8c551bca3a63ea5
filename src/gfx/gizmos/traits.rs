//! # Gizmo Traits
//!
//! This module defines the interface a manipulation gizmo implements to
//! integrate with the selection tool.

use crate::gfx::camera::Camera;
use crate::gfx::picking::Ray;
use crate::gfx::scene::{NodeId, SceneGraph};

/// Change notification emitted by a gizmo while it manipulates a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoEvent {
    /// A handle was grabbed on the attached node
    DragStarted(NodeId),
    /// The attached node's transform changed
    Changed(NodeId),
    /// The grabbed handle was released
    DragEnded(NodeId),
}

/// Core trait for manipulation gizmos.
///
/// A gizmo lives in the scene graph as helper geometry and edits the
/// transform of the node it is attached to. The selection tool decides what
/// the gizmo is attached to; the gizmo only reacts to pointer rays on its own
/// handles.
///
/// ## Lifecycle
///
/// 1. **Install** - Create handle nodes in the scene graph
/// 2. **Attach/Detach** - Follow the current selection
/// 3. **Pointer Rays** - Grab, drag and release handles
/// 4. **Camera Update** - Keep handles readable from the active camera
/// 5. **Uninstall** - Remove handle nodes
///
/// Every node a gizmo creates must be flagged as a tool helper so picking
/// never selects it.
pub trait ManipulationGizmo {
    /// Create the gizmo's helper nodes in `graph`.
    ///
    /// Installing twice must not duplicate the helper nodes.
    fn install(&mut self, graph: &mut SceneGraph);

    /// Remove the gizmo's helper nodes from `graph`.
    fn uninstall(&mut self, graph: &mut SceneGraph);

    /// Attach to `node`, showing the handles on it.
    ///
    /// Any grab in progress is cancelled.
    fn attach(&mut self, graph: &mut SceneGraph, node: NodeId);

    /// Hide the handles and forget the attached node.
    fn detach(&mut self, graph: &mut SceneGraph);

    /// The node currently under manipulation
    fn attached(&self) -> Option<NodeId>;

    /// Whether `node` is one of this gizmo's handles
    fn is_handle(&self, node: NodeId) -> bool;

    /// Offer a pointer press to the gizmo.
    ///
    /// # Arguments
    ///
    /// * `graph` - Scene graph holding the handles and the attached node
    /// * `ray` - World-space ray under the pointer
    ///
    /// # Returns
    ///
    /// `true` if the ray grabbed a handle
    fn pointer_down(&mut self, graph: &mut SceneGraph, ray: &Ray) -> bool;

    /// Continue a grab with a new pointer ray.
    ///
    /// # Returns
    ///
    /// `true` if the attached node's transform changed
    fn pointer_move(&mut self, graph: &mut SceneGraph, ray: &Ray) -> bool;

    /// Release the grabbed handle, if any.
    fn pointer_up(&mut self, graph: &mut SceneGraph);

    /// Whether a handle is currently grabbed
    fn is_active(&self) -> bool;

    /// Camera-update hook, called once per frame and whenever the active
    /// camera changes.
    fn update_camera(&mut self, graph: &mut SceneGraph, camera: &dyn Camera);

    /// Drain the notifications emitted since the last call
    fn take_events(&mut self) -> Vec<GizmoEvent>;
}
