//! # Selection and Transform Tool
//!
//! Pointer-driven selection with click-versus-drag disambiguation. A primary
//! press casts a ray into the scene, filters out gizmo helpers and
//! non-selectable nodes, and attaches the gizmo to the nearest remaining hit.
//!
//! ## State Machine
//!
//! ```text
//! Idle --primary down--> PressedMaybeDrag --move > threshold--> Dragging
//!  ^                           |                                   |
//!  +-----------up (Click)------+-----------up (Drag)---------------+
//! ```

use cgmath::{MetricSpace, Vector2};
use log::{debug, info};

use super::traits::{GizmoEvent, ManipulationGizmo};
use crate::config::SelectionConfig;
use crate::gfx::camera::Camera;
use crate::gfx::picking::{is_tool_helper, Intersection, Ray, Raycaster};
use crate::gfx::scene::{NodeId, SceneGraph};
use crate::input::{PointerButton, SurfaceRect};

/// Gesture state of the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Idle,
    PressedMaybeDrag,
    Dragging,
}

/// How a completed press resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    Click,
    Drag,
}

/// What a hit test decided for the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResolution {
    Select(NodeId),
    /// Only gizmo handles were hit; keep the current selection
    Keep,
    Clear,
}

/// Notification delivered to selection observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Selected(NodeId),
    Cleared,
    /// The gizmo moved the selected node
    Transformed(NodeId),
}

/// Handle returned when an observer is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&SelectionChange)>;

/// Decide the selection for a set of raw hits sorted nearest first
pub fn resolve_hits(graph: &SceneGraph, hits: &[Intersection]) -> HitResolution {
    let mut helper_hit = false;
    for hit in hits {
        let Some(node) = graph.get(hit.node) else {
            continue;
        };
        if is_tool_helper(node) {
            helper_hit = true;
            continue;
        }
        if node.selectable {
            return HitResolution::Select(hit.node);
        }
    }
    if helper_hit {
        HitResolution::Keep
    } else {
        HitResolution::Clear
    }
}

/// Selection tool owning the manipulation gizmo
pub struct SelectionTool {
    gizmo: Box<dyn ManipulationGizmo>,
    raycaster: Raycaster,
    state: ToolState,
    press_position: Option<Vector2<f32>>,
    drag_threshold: f32,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl SelectionTool {
    pub fn new(gizmo: Box<dyn ManipulationGizmo>, config: &SelectionConfig) -> Self {
        Self {
            gizmo,
            raycaster: Raycaster::new(),
            state: ToolState::Idle,
            press_position: None,
            drag_threshold: config.drag_threshold,
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// Put the gizmo's helper geometry into the scene
    pub fn install(&mut self, graph: &mut SceneGraph) {
        self.gizmo.install(graph);
    }

    pub fn uninstall(&mut self, graph: &mut SceneGraph) {
        self.gizmo.uninstall(graph);
        self.reset();
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.gizmo.attached()
    }

    /// A press moved past the drag threshold and is still held
    pub fn is_dragging(&self) -> bool {
        self.state == ToolState::Dragging
    }

    /// A gizmo handle is grabbed
    pub fn is_manipulating(&self) -> bool {
        self.gizmo.is_active()
    }

    pub fn gizmo(&self) -> &dyn ManipulationGizmo {
        self.gizmo.as_ref()
    }

    pub fn add_observer<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&SelectionChange) + 'static,
    {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        self.observers.len() != before
    }

    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    fn notify(&mut self, change: SelectionChange) {
        for (_, observer) in self.observers.iter_mut() {
            observer(&change);
        }
    }

    /// Attach the gizmo to `node` directly
    pub fn select(&mut self, graph: &mut SceneGraph, node: NodeId) {
        if self.gizmo.attached() == Some(node) {
            return;
        }
        let name = graph.get(node).map(|n| n.name.clone()).unwrap_or_default();
        self.gizmo.attach(graph, node);
        info!("Selected '{name}'");
        self.notify(SelectionChange::Selected(node));
    }

    pub fn clear_selection(&mut self, graph: &mut SceneGraph) {
        if self.gizmo.attached().is_none() {
            return;
        }
        self.gizmo.detach(graph);
        info!("Selection cleared");
        self.notify(SelectionChange::Cleared);
    }

    /// Handle a button press
    ///
    /// Returns whether the press grabbed a gizmo handle. Buttons other than
    /// primary are ignored.
    pub fn pointer_down(
        &mut self,
        button: PointerButton,
        position: Vector2<f32>,
        surface: &SurfaceRect,
        camera: &dyn Camera,
        graph: &mut SceneGraph,
    ) -> bool {
        if button != PointerButton::Primary {
            return false;
        }
        self.state = ToolState::PressedMaybeDrag;
        self.press_position = Some(position);

        let Some(ray) = surface
            .to_ndc(position)
            .and_then(|ndc| Ray::from_camera(ndc, camera))
        else {
            return false;
        };

        let grabbed = self.gizmo.pointer_down(graph, &ray);
        let hits = self.raycaster.intersect_scene(&ray, graph);
        match resolve_hits(graph, &hits) {
            HitResolution::Select(node) => self.select(graph, node),
            HitResolution::Keep => {}
            HitResolution::Clear => self.clear_selection(graph),
        }
        self.flush_gizmo_events();
        grabbed && self.gizmo.is_active()
    }

    /// Handle pointer motion; returns whether the selected node moved
    pub fn pointer_move(
        &mut self,
        position: Vector2<f32>,
        surface: &SurfaceRect,
        camera: &dyn Camera,
        graph: &mut SceneGraph,
    ) -> bool {
        let Some(press) = self.press_position else {
            return false;
        };
        if self.state == ToolState::PressedMaybeDrag
            && press.distance(position) > self.drag_threshold
        {
            debug!("Drag started");
            self.state = ToolState::Dragging;
        }

        if !self.gizmo.is_active() {
            return false;
        }
        let Some(ray) = surface
            .to_ndc(position)
            .and_then(|ndc| Ray::from_camera(ndc, camera))
        else {
            return false;
        };
        let changed = self.gizmo.pointer_move(graph, &ray);
        self.flush_gizmo_events();
        changed
    }

    /// Handle a button release, resolving the gesture
    pub fn pointer_up(
        &mut self,
        button: PointerButton,
        graph: &mut SceneGraph,
    ) -> Option<GestureOutcome> {
        if button != PointerButton::Primary || self.state == ToolState::Idle {
            return None;
        }
        let outcome = match self.state {
            ToolState::Dragging => GestureOutcome::Drag,
            _ => GestureOutcome::Click,
        };
        self.gizmo.pointer_up(graph);
        self.flush_gizmo_events();
        self.state = ToolState::Idle;
        self.press_position = None;

        if outcome == GestureOutcome::Click {
            debug!("Click completed");
        }
        Some(outcome)
    }

    /// Forward the active camera to the gizmo
    pub fn update_camera(&mut self, graph: &mut SceneGraph, camera: &dyn Camera) {
        let had_selection = self.gizmo.attached().is_some();
        self.gizmo.update_camera(graph, camera);
        if had_selection && self.gizmo.attached().is_none() {
            self.notify(SelectionChange::Cleared);
        }
    }

    /// Relay gizmo change notifications to observers
    fn flush_gizmo_events(&mut self) {
        for event in self.gizmo.take_events() {
            if let GizmoEvent::Changed(node) = event {
                self.notify(SelectionChange::Transformed(node));
            }
        }
    }

    /// Back to idle without touching the selection
    pub fn reset(&mut self) {
        self.state = ToolState::Idle;
        self.press_position = None;
    }
}
