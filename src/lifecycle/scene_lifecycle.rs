//! # Scene Lifecycle
//!
//! Owns the scene graph, the render backend and the active camera, and runs
//! the per-frame tick. Capabilities are composed in rather than baked into
//! separate viewport types:
//!
//! - a first-person binding (avatar, camera rig, movement, input router)
//! - a selection tool binding (picking plus manipulation gizmo)
//!
//! ## Frame Tick
//!
//! ```text
//! movement step -> rig materialize -> gizmo camera update -> render
//!   -> frame callbacks (registration order) -> request next frame
//! ```
//!
//! Everything runs on the host's event-loop thread. Asset loads complete
//! through the lifecycle's [`LoadQueue`], which the host pumps between frames.

use cgmath::{Vector3, Zero};
use log::{debug, info, warn};

use super::backend::RenderBackend;
use super::liveness::LivenessToken;
use crate::avatar::{Avatar, MovementIntegrator};
use crate::config::ViewportConfig;
use crate::gfx::camera::{Camera, CameraRig, PerspectiveCamera};
use crate::gfx::gizmos::{ObserverId, SelectionChange, SelectionTool};
use crate::gfx::scene::SceneGraph;
use crate::input::{
    CaptureRequest, EventDispatcher, InputEvent, InputEventKind, InputRouter, ListenerId,
    SurfaceRect,
};
use crate::loading::{LoadCallbacks, LoadId, LoadQueue, ModelLoader};
use crate::timing::{FrameClock, FrameStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, no render surface attached yet
    Created,
    Running,
    /// Terminal; nothing ticks or dispatches any more
    Stopped,
}

/// Handle returned by [`SceneLifecycle::add_frame_callback`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameCallbackId(u64);

type FrameCallback = Box<dyn FnMut(&mut SceneGraph, &FrameClock)>;

/// First-person capability: the avatar and everything that moves it
pub struct FirstPersonBinding {
    pub avatar: Avatar,
    pub rig: CameraRig,
    pub integrator: MovementIntegrator,
    pub router: InputRouter,
}

impl FirstPersonBinding {
    pub fn new(
        avatar: Avatar,
        rig: CameraRig,
        integrator: MovementIntegrator,
        router: InputRouter,
    ) -> Self {
        Self {
            avatar,
            rig,
            integrator,
            router,
        }
    }

    pub fn from_config(config: &ViewportConfig) -> Self {
        Self::new(
            Avatar::from_config(&config.avatar),
            CameraRig::new(&config.rig),
            MovementIntegrator::from_config(&config.movement),
            InputRouter::new(config.bindings.clone()),
        )
    }
}

/// The viewport session
pub struct SceneLifecycle {
    state: LifecycleState,
    graph: SceneGraph,
    backend: Option<Box<dyn RenderBackend>>,
    camera: Option<Box<dyn Camera>>,
    default_camera: PerspectiveCamera,
    surface: SurfaceRect,
    first_person: Option<FirstPersonBinding>,
    selection: Option<SelectionTool>,
    dispatcher: EventDispatcher,
    frame_callbacks: Vec<(FrameCallbackId, FrameCallback)>,
    next_callback: u64,
    clock: FrameClock,
    loads: LoadQueue,
    liveness: LivenessToken,
    redraw_requested: bool,
}

fn active_camera<'a>(
    camera: &'a mut Option<Box<dyn Camera>>,
    fallback: &'a mut PerspectiveCamera,
) -> &'a mut dyn Camera {
    match camera {
        Some(camera) => &mut **camera,
        None => fallback,
    }
}

impl SceneLifecycle {
    /// Lifecycle for a surface of `width` x `height` device pixels
    pub fn new(width: u32, height: u32) -> Self {
        let liveness = LivenessToken::new();
        let mut default_camera = PerspectiveCamera::default();
        default_camera.resize_projection(width, height);
        Self {
            state: LifecycleState::Created,
            graph: SceneGraph::new(),
            backend: None,
            camera: None,
            default_camera,
            surface: SurfaceRect::from_size(width, height),
            first_person: None,
            selection: None,
            dispatcher: EventDispatcher::new(),
            frame_callbacks: Vec::new(),
            next_callback: 0,
            clock: FrameClock::new(),
            loads: LoadQueue::with_liveness(liveness.clone()),
            liveness,
            redraw_requested: false,
        }
    }

    pub fn from_config(config: &ViewportConfig) -> Self {
        Self::new(config.window.width, config.window.height)
    }

    /// Attach the render backend and begin ticking
    ///
    /// # Panics
    ///
    /// When called more than once; a lifecycle owns exactly one surface.
    pub fn start(&mut self, backend: Box<dyn RenderBackend>) {
        assert!(
            self.state == LifecycleState::Created,
            "SceneLifecycle::start called on a {:?} lifecycle; a render surface may only be attached once",
            self.state
        );
        self.backend = Some(backend);
        self.state = LifecycleState::Running;
        self.redraw_requested = true;
        info!("Viewport started");
    }

    /// Tear everything down; idempotent, and a no-op before `start`
    pub fn stop(&mut self) {
        if self.state != LifecycleState::Running {
            return;
        }

        if let Some(tool) = self.selection.as_mut() {
            tool.clear_observers();
            tool.uninstall(&mut self.graph);
        }
        self.graph.clear();

        if let Some(mut backend) = self.backend.take() {
            backend.release();
        }
        if let Some(mut camera) = self.camera.take() {
            camera.release();
        }

        self.dispatcher.clear();
        self.frame_callbacks.clear();
        self.loads.close();
        self.liveness.kill();
        if let Some(binding) = self.first_person.as_mut() {
            binding.router.release_all();
        }

        self.redraw_requested = false;
        self.state = LifecycleState::Stopped;
        info!("Viewport stopped");
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    /// Token that dies when the lifecycle stops
    pub fn liveness(&self) -> LivenessToken {
        self.liveness.clone()
    }

    /// Replace the active camera
    pub fn set_camera(&mut self, mut camera: Box<dyn Camera>) {
        camera.resize_projection(self.surface.width as u32, self.surface.height as u32);
        if let Some(tool) = self.selection.as_mut() {
            tool.update_camera(&mut self.graph, camera.as_ref());
        }
        if let Some(mut previous) = self.camera.replace(camera) {
            previous.release();
        }
        self.redraw_requested = true;
    }

    pub fn camera(&self) -> Option<&dyn Camera> {
        self.camera.as_deref()
    }

    pub fn bind_first_person(&mut self, binding: FirstPersonBinding) {
        self.first_person = Some(binding);
    }

    pub fn first_person(&self) -> Option<&FirstPersonBinding> {
        self.first_person.as_ref()
    }

    pub fn first_person_mut(&mut self) -> Option<&mut FirstPersonBinding> {
        self.first_person.as_mut()
    }

    /// Bind the selection tool and install its gizmo into the graph
    pub fn bind_selection_tool(&mut self, mut tool: SelectionTool) {
        if let Some(mut previous) = self.selection.take() {
            previous.uninstall(&mut self.graph);
        }
        tool.install(&mut self.graph);
        let camera = active_camera(&mut self.camera, &mut self.default_camera);
        tool.update_camera(&mut self.graph, camera);
        self.selection = Some(tool);
    }

    pub fn selection(&self) -> Option<&SelectionTool> {
        self.selection.as_ref()
    }

    pub fn selection_mut(&mut self) -> Option<&mut SelectionTool> {
        self.selection.as_mut()
    }

    /// Observe selection changes; `None` without a bound selection tool
    pub fn add_selection_observer<F>(&mut self, observer: F) -> Option<ObserverId>
    where
        F: FnMut(&SelectionChange) + 'static,
    {
        self.selection
            .as_mut()
            .map(|tool| tool.add_observer(observer))
    }

    pub fn remove_selection_observer(&mut self, id: ObserverId) -> bool {
        self.selection
            .as_mut()
            .is_some_and(|tool| tool.remove_observer(id))
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn surface(&self) -> SurfaceRect {
        self.surface
    }

    /// Register a callback run after every rendered frame
    pub fn add_frame_callback<F>(&mut self, callback: F) -> FrameCallbackId
    where
        F: FnMut(&mut SceneGraph, &FrameClock) + 'static,
    {
        let id = FrameCallbackId(self.next_callback);
        self.next_callback += 1;
        self.frame_callbacks.push((id, Box::new(callback)));
        id
    }

    pub fn remove_frame_callback(&mut self, id: FrameCallbackId) -> bool {
        let before = self.frame_callbacks.len();
        self.frame_callbacks.retain(|(other, _)| *other != id);
        self.frame_callbacks.len() != before
    }

    pub fn add_listener<F>(&mut self, kind: InputEventKind, listener: F) -> ListenerId
    where
        F: FnMut(&InputEvent) + 'static,
    {
        self.dispatcher.add_listener(kind, listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.dispatcher.remove_listener(id)
    }

    pub fn listener_count(&self) -> usize {
        self.dispatcher.len()
    }

    /// Run one frame; returns whether anything was rendered
    pub fn tick(&mut self) -> bool {
        if self.state != LifecycleState::Running {
            return false;
        }
        self.redraw_requested = false;
        self.clock.tick();

        let camera = active_camera(&mut self.camera, &mut self.default_camera);
        if let Some(binding) = self.first_person.as_mut() {
            let intent = binding.router.intent();
            binding.integrator.step(&mut binding.avatar, &intent);
            binding.rig.materialize(&binding.avatar, camera);
        }
        if let Some(tool) = self.selection.as_mut() {
            tool.update_camera(&mut self.graph, camera);
        }

        let draw_calls = match self.backend.as_mut() {
            Some(backend) => match backend.render(&self.graph, camera) {
                Ok(draw_calls) => draw_calls,
                Err(err) => {
                    warn!("Frame skipped: {err}");
                    0
                }
            },
            None => 0,
        };
        self.clock.record_draw_calls(draw_calls);

        for (_, callback) in self.frame_callbacks.iter_mut() {
            callback(&mut self.graph, &self.clock);
        }

        self.redraw_requested = true;
        true
    }

    /// Whether the host should schedule another tick; clears the flag
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    pub fn request_redraw(&mut self) {
        if self.is_running() {
            self.redraw_requested = true;
        }
    }

    pub fn frame_stats(&self) -> &FrameStats {
        self.clock.stats()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Resize the surface, the backend and every camera aspect
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface = SurfaceRect::from_size(width, height);
        self.default_camera.resize_projection(width, height);
        if let Some(camera) = self.camera.as_mut() {
            camera.resize_projection(width, height);
        }
        if let Some(backend) = self.backend.as_mut() {
            backend.resize(width, height);
        }
        self.request_redraw();
    }

    /// Route one input event through listeners and the bound capabilities
    ///
    /// A primary press first goes to the selection tool; if it grabbed a gizmo
    /// handle no pointer capture is requested. Mouse look is suppressed only
    /// while a gizmo handle is being manipulated.
    pub fn handle_input(&mut self, event: InputEvent) {
        if self.state != LifecycleState::Running {
            return;
        }
        self.dispatcher.dispatch(&event);

        match event {
            InputEvent::KeyDown(code) => {
                if let Some(binding) = self.first_person.as_mut() {
                    binding.router.key_down(code);
                }
            }
            InputEvent::KeyUp(code) => {
                if let Some(binding) = self.first_person.as_mut() {
                    binding.router.key_up(code);
                }
            }
            InputEvent::PointerDown {
                button,
                position,
                over_surface,
            } => {
                let mut grabbed = false;
                if let Some(tool) = self.selection.as_mut() {
                    if over_surface {
                        let camera = active_camera(&mut self.camera, &mut self.default_camera);
                        grabbed =
                            tool.pointer_down(button, position, &self.surface, camera, &mut self.graph);
                        self.redraw_requested = true;
                    }
                }
                if let Some(binding) = self.first_person.as_mut() {
                    if !grabbed {
                        binding.router.pointer_down(button, over_surface);
                    }
                }
            }
            InputEvent::PointerMove { position } => {
                if let Some(tool) = self.selection.as_mut() {
                    let camera = active_camera(&mut self.camera, &mut self.default_camera);
                    if tool.pointer_move(position, &self.surface, camera, &mut self.graph) {
                        self.redraw_requested = true;
                    }
                }
            }
            InputEvent::PointerUp { button, .. } => {
                if let Some(tool) = self.selection.as_mut() {
                    if let Some(outcome) = tool.pointer_up(button, &mut self.graph) {
                        debug!("Gesture resolved as {outcome:?}");
                        self.redraw_requested = true;
                    }
                }
                if let Some(binding) = self.first_person.as_mut() {
                    binding.router.pointer_up(button);
                }
            }
            InputEvent::MouseMotion { dx, dy } => {
                let tool_busy = self
                    .selection
                    .as_ref()
                    .is_some_and(|tool| tool.is_manipulating());
                if tool_busy {
                    return;
                }
                if let Some(binding) = self.first_person.as_mut() {
                    let FirstPersonBinding {
                        avatar,
                        rig,
                        router,
                        ..
                    } = binding;
                    if router.route_motion(dx, dy, rig, avatar) {
                        self.redraw_requested = true;
                    }
                }
            }
        }
    }

    /// Next pointer-capture change for the host; nothing once stopped
    pub fn take_capture_request(&mut self) -> Option<CaptureRequest> {
        if !self.liveness.is_alive() {
            return None;
        }
        self.first_person
            .as_mut()
            .and_then(|binding| binding.router.take_capture_request())
    }

    /// Host report of the capture state; late reports after stop are dropped
    pub fn pointer_capture_changed(&mut self, active: bool) {
        if !self.liveness.is_alive() {
            debug!("Dropping pointer capture report after stop");
            return;
        }
        if let Some(binding) = self.first_person.as_mut() {
            binding.router.pointer_capture_changed(active);
        }
    }

    /// Queue an asynchronous load whose callbacks run from [`pump_loads`](Self::pump_loads)
    pub fn load_model(
        &mut self,
        loader: &ModelLoader,
        url: &str,
        callbacks: LoadCallbacks,
    ) -> LoadId {
        loader.load(&mut self.loads, url, callbacks)
    }

    /// Load `url` and add the result at the root of the graph
    pub fn load_into_scene(&mut self, loader: &ModelLoader, url: &str) -> LoadId {
        let source = url.to_string();
        self.load_model(
            loader,
            url,
            LoadCallbacks::new(move |data, graph: &mut SceneGraph| {
                let root = graph.add_tree(&data.into_node(), None);
                debug!("Added {source} to the scene as {root:?}");
            }),
        )
    }

    /// Deliver finished loads; returns how many completed
    pub fn pump_loads(&mut self) -> usize {
        let completed = self.loads.pump(&mut self.graph);
        if completed > 0 {
            self.request_redraw();
        }
        completed
    }

    pub fn load_queue(&mut self) -> &mut LoadQueue {
        &mut self.loads
    }

    /// Position the avatar back at the origin, facing forward
    pub fn respawn(&mut self) {
        if let Some(binding) = self.first_person.as_mut() {
            binding.avatar.respawn(Vector3::zero());
            binding.rig.reset_pitch();
            self.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectionConfig;
    use crate::gfx::geometry::generate_cube;
    use crate::gfx::gizmos::TranslateGizmo;
    use crate::gfx::scene::{SceneNode, Transform};
    use crate::input::PointerButton;
    use crate::lifecycle::RenderError;
    use crate::loading::{ModelData, ModelFormat, ParseError, ParserRegistry};
    use cgmath::{InnerSpace, Vector2, Vector4};
    use std::cell::{Cell, RefCell};
    use std::path::Path;
    use std::rc::Rc;
    use std::sync::Arc;
    use winit::keyboard::KeyCode;

    type Log = Rc<RefCell<Vec<String>>>;

    struct RecordingBackend {
        log: Log,
    }

    impl RenderBackend for RecordingBackend {
        fn render(&mut self, graph: &SceneGraph, camera: &dyn Camera) -> Result<u32, RenderError> {
            let eye = camera.position();
            self.log.borrow_mut().push(format!(
                "render {} nodes at ({:.2}, {:.2}, {:.2})",
                graph.len(),
                eye.x,
                eye.y,
                eye.z
            ));
            Ok(graph.len() as u32)
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.log.borrow_mut().push(format!("resize {width}x{height}"));
        }

        fn release(&mut self) {
            self.log.borrow_mut().push("release".to_string());
        }
    }

    struct TrackedCamera {
        inner: PerspectiveCamera,
        released: Rc<Cell<u32>>,
    }

    impl Camera for TrackedCamera {
        fn position(&self) -> Vector3<f32> {
            self.inner.position()
        }

        fn orientation(&self) -> cgmath::Quaternion<f32> {
            self.inner.orientation()
        }

        fn set_pose(&mut self, position: Vector3<f32>, orientation: cgmath::Quaternion<f32>) {
            self.inner.set_pose(position, orientation)
        }

        fn view_matrix(&self) -> cgmath::Matrix4<f32> {
            self.inner.view_matrix()
        }

        fn projection_matrix(&self) -> cgmath::Matrix4<f32> {
            self.inner.projection_matrix()
        }

        fn resize_projection(&mut self, width: u32, height: u32) {
            self.inner.resize_projection(width, height)
        }

        fn release(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    fn started() -> (SceneLifecycle, Log) {
        let log: Log = Rc::default();
        let mut lifecycle = SceneLifecycle::new(200, 100);
        lifecycle.start(Box::new(RecordingBackend { log: log.clone() }));
        (lifecycle, log)
    }

    fn first_person() -> FirstPersonBinding {
        FirstPersonBinding::from_config(&ViewportConfig::default())
    }

    fn translate_tool() -> SelectionTool {
        SelectionTool::new(Box::new(TranslateGizmo::new()), &SelectionConfig::default())
    }

    /// Pixel position of a world point on the 200x100 test surface
    fn to_screen(camera: &dyn Camera, point: Vector3<f32>) -> Vector2<f32> {
        let clip = camera.projection_matrix() * camera.view_matrix() * point.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        Vector2::new((ndc.x + 1.0) * 0.5 * 200.0, (1.0 - ndc.y) * 0.5 * 100.0)
    }

    fn press(lifecycle: &mut SceneLifecycle, position: Vector2<f32>) {
        lifecycle.handle_input(InputEvent::PointerDown {
            button: PointerButton::Primary,
            position,
            over_surface: true,
        });
    }

    #[test]
    fn test_tick_renders_then_runs_callbacks_in_order() {
        let (mut lifecycle, log) = started();
        for name in ["first", "second"] {
            let log = log.clone();
            lifecycle.add_frame_callback(move |_, _| log.borrow_mut().push(name.to_string()));
        }

        assert!(lifecycle.take_redraw_request());
        assert!(lifecycle.tick());
        assert!(lifecycle.take_redraw_request());

        let log = log.borrow();
        assert!(log[0].starts_with("render"));
        assert_eq!(&log[1..], ["first".to_string(), "second".to_string()]);
        assert_eq!(lifecycle.clock().frame_count(), 1);
    }

    #[test]
    fn test_remove_frame_callback_removes_only_that_one() {
        let (mut lifecycle, _) = started();
        let counts = Rc::new(RefCell::new([0u32; 2]));
        let (a, b) = (counts.clone(), counts.clone());
        let first = lifecycle.add_frame_callback(move |_, _| a.borrow_mut()[0] += 1);
        lifecycle.add_frame_callback(move |_, _| b.borrow_mut()[1] += 1);

        lifecycle.tick();
        assert!(lifecycle.remove_frame_callback(first));
        assert!(!lifecycle.remove_frame_callback(first));
        lifecycle.tick();

        assert_eq!(*counts.borrow(), [1, 2]);
    }

    #[test]
    #[should_panic(expected = "only be attached once")]
    fn test_second_start_panics() {
        let (mut lifecycle, log) = started();
        lifecycle.start(Box::new(RecordingBackend { log }));
    }

    #[test]
    fn test_stop_before_start_is_a_no_op() {
        let mut lifecycle = SceneLifecycle::new(10, 10);
        lifecycle.stop();
        assert_eq!(lifecycle.state(), LifecycleState::Created);
        assert!(!lifecycle.tick());
    }

    #[test]
    fn test_stop_tears_down_once() {
        let (mut lifecycle, log) = started();
        let released = Rc::new(Cell::new(0));
        lifecycle.set_camera(Box::new(TrackedCamera {
            inner: PerspectiveCamera::default(),
            released: released.clone(),
        }));
        lifecycle.graph_mut().add_node(SceneNode::new("thing"), None);
        lifecycle.add_listener(InputEventKind::KeyDown, |_| {});
        lifecycle.add_frame_callback(|_, _| panic!("callback after stop"));

        lifecycle.stop();
        lifecycle.stop();

        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert!(lifecycle.graph().is_empty());
        assert_eq!(lifecycle.listener_count(), 0);
        assert!(lifecycle.camera().is_none());
        assert_eq!(released.get(), 1);
        assert_eq!(
            log.borrow().iter().filter(|entry| *entry == "release").count(),
            1
        );
        assert!(!lifecycle.tick());
        assert!(!lifecycle.take_redraw_request());
        assert!(!lifecycle.liveness().is_alive());
    }

    #[test]
    fn test_first_person_moves_before_materialize() {
        let (mut lifecycle, log) = started();
        lifecycle.bind_first_person(first_person());
        lifecycle.set_camera(Box::new(PerspectiveCamera::default()));

        lifecycle.handle_input(InputEvent::KeyDown(KeyCode::KeyW));
        lifecycle.tick();

        let binding = lifecycle.first_person().unwrap();
        assert!(binding.avatar.location.z < 0.0);
        let camera = lifecycle.camera().unwrap();
        assert_eq!(camera.position(), binding.rig.eye_position(&binding.avatar));
        assert!(log.borrow()[0].contains("0.90"));

        lifecycle.handle_input(InputEvent::KeyUp(KeyCode::KeyW));
        let before = lifecycle.first_person().unwrap().avatar.velocity.magnitude();
        lifecycle.tick();
        let after = lifecycle.first_person().unwrap().avatar.velocity.magnitude();
        assert!(after < before);
    }

    #[test]
    fn test_capture_flow_and_mouse_look() {
        let (mut lifecycle, _) = started();
        lifecycle.bind_first_person(first_person());

        lifecycle.handle_input(InputEvent::MouseMotion { dx: 10.0, dy: 0.0 });
        assert_eq!(lifecycle.first_person().unwrap().avatar.yaw(), 0.0);

        lifecycle.handle_input(InputEvent::PointerDown {
            button: PointerButton::Primary,
            position: Vector2::new(50.0, 50.0),
            over_surface: true,
        });
        assert_eq!(lifecycle.take_capture_request(), Some(CaptureRequest::Acquire));
        lifecycle.pointer_capture_changed(true);

        lifecycle.handle_input(InputEvent::MouseMotion { dx: 10.0, dy: 0.0 });
        assert!((lifecycle.first_person().unwrap().avatar.yaw() + 0.05).abs() < 1e-6);

        lifecycle.stop();
        assert_eq!(lifecycle.take_capture_request(), None);
    }

    #[test]
    fn test_denied_capture_keeps_look_inert() {
        let (mut lifecycle, _) = started();
        lifecycle.bind_first_person(first_person());
        lifecycle.handle_input(InputEvent::PointerDown {
            button: PointerButton::Primary,
            position: Vector2::new(50.0, 50.0),
            over_surface: true,
        });
        lifecycle.take_capture_request();
        lifecycle.pointer_capture_changed(false);

        lifecycle.handle_input(InputEvent::MouseMotion { dx: 10.0, dy: 4.0 });
        let binding = lifecycle.first_person().unwrap();
        assert_eq!(binding.avatar.yaw(), 0.0);
        assert_eq!(binding.rig.pitch(), 0.0);
    }

    #[test]
    fn test_click_selects_through_default_camera() {
        let (mut lifecycle, _) = started();
        lifecycle.bind_selection_tool(SelectionTool::new(
            Box::new(TranslateGizmo::new()),
            &SelectionConfig::default(),
        ));
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        lifecycle
            .add_selection_observer(move |change| sink.borrow_mut().push(*change))
            .unwrap();

        let mut cube = SceneNode::with_mesh("cube", Arc::new(generate_cube().into_mesh()));
        cube.transform = Transform::from_position(Vector3::new(0.0, 0.0, -5.0));
        cube.selectable = true;
        let cube = lifecycle.graph_mut().add_node(cube, None);

        let center = Vector2::new(100.0, 50.0);
        lifecycle.handle_input(InputEvent::PointerDown {
            button: PointerButton::Primary,
            position: center,
            over_surface: true,
        });
        lifecycle.handle_input(InputEvent::PointerUp {
            button: PointerButton::Primary,
            position: center,
        });

        assert_eq!(lifecycle.selection().unwrap().selected(), Some(cube));
        assert_eq!(changes.borrow()[0], SelectionChange::Selected(cube));

        lifecycle.stop();
        assert!(lifecycle.graph().is_empty());
    }

    #[test]
    fn test_look_survives_drag_over_empty_space() {
        let (mut lifecycle, _) = started();
        lifecycle.bind_first_person(first_person());
        lifecycle.bind_selection_tool(translate_tool());

        press(&mut lifecycle, Vector2::new(100.0, 50.0));
        assert_eq!(lifecycle.take_capture_request(), Some(CaptureRequest::Acquire));
        lifecycle.pointer_capture_changed(true);

        lifecycle.handle_input(InputEvent::PointerMove {
            position: Vector2::new(110.0, 50.0),
        });
        let tool = lifecycle.selection().unwrap();
        assert!(tool.is_dragging());
        assert!(!tool.is_manipulating());

        lifecycle.handle_input(InputEvent::MouseMotion { dx: 10.0, dy: 0.0 });
        assert!((lifecycle.first_person().unwrap().avatar.yaw() + 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_handle_drag_moves_node_without_capture() {
        let (mut lifecycle, _) = started();
        lifecycle.bind_first_person(first_person());
        lifecycle.bind_selection_tool(translate_tool());
        lifecycle.set_camera(Box::new(PerspectiveCamera::default()));
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        lifecycle
            .add_selection_observer(move |change| sink.borrow_mut().push(*change))
            .unwrap();

        let mut cube = SceneNode::with_mesh("cube", Arc::new(generate_cube().into_mesh()));
        cube.transform = Transform::from_position(Vector3::new(0.0, 0.0, -5.0));
        cube.selectable = true;
        let cube = lifecycle.graph_mut().add_node(cube, None);
        lifecycle.tick();

        // Click selects; the capture request is dropped on release
        let center = to_screen(lifecycle.camera().unwrap(), Vector3::new(0.0, 0.0, -5.0));
        press(&mut lifecycle, center);
        lifecycle.handle_input(InputEvent::PointerUp {
            button: PointerButton::Primary,
            position: center,
        });
        assert_eq!(lifecycle.selection().unwrap().selected(), Some(cube));
        assert_eq!(lifecycle.take_capture_request(), None);
        lifecycle.tick();

        let root = lifecycle.graph().find_by_name("TransformGizmo").unwrap();
        let on_x = lifecycle.graph().world_matrix(root) * Vector4::new(0.75, 0.0, 0.0, 1.0);
        let grab = to_screen(lifecycle.camera().unwrap(), on_x.truncate());
        press(&mut lifecycle, grab);
        assert_eq!(lifecycle.take_capture_request(), None);
        assert!(lifecycle.selection().unwrap().is_manipulating());

        lifecycle.take_redraw_request();
        lifecycle.handle_input(InputEvent::PointerMove {
            position: grab + Vector2::new(20.0, 0.0),
        });
        let moved = lifecycle.graph().get(cube).unwrap().transform.position;
        assert!(moved.x > 0.0);
        assert!((moved.z + 5.0).abs() < 1e-4);
        assert!(changes.borrow().contains(&SelectionChange::Transformed(cube)));
        assert!(lifecycle.take_redraw_request());

        assert!(!lifecycle.first_person().unwrap().router.is_capture_active());
        lifecycle.pointer_capture_changed(true);
        lifecycle.handle_input(InputEvent::MouseMotion { dx: 10.0, dy: 0.0 });
        assert_eq!(lifecycle.first_person().unwrap().avatar.yaw(), 0.0);
    }

    #[test]
    fn test_respawn_resets_avatar_and_pitch() {
        let (mut lifecycle, _) = started();
        lifecycle.bind_first_person(first_person());

        lifecycle.handle_input(InputEvent::KeyDown(KeyCode::KeyW));
        lifecycle.tick();
        lifecycle.tick();
        press(&mut lifecycle, Vector2::new(50.0, 50.0));
        lifecycle.take_capture_request();
        lifecycle.pointer_capture_changed(true);
        lifecycle.handle_input(InputEvent::MouseMotion { dx: 10.0, dy: 10.0 });

        let binding = lifecycle.first_person().unwrap();
        assert!(binding.avatar.location.z < 0.0);
        assert_ne!(binding.avatar.yaw(), 0.0);
        assert_ne!(binding.rig.pitch(), 0.0);

        lifecycle.take_redraw_request();
        lifecycle.respawn();
        let binding = lifecycle.first_person().unwrap();
        assert_eq!(binding.avatar.location, Vector3::zero());
        assert_eq!(binding.avatar.velocity, Vector3::zero());
        assert_eq!(binding.avatar.yaw(), 0.0);
        assert_eq!(binding.rig.pitch(), 0.0);
        assert!(lifecycle.take_redraw_request());
    }

    #[test]
    fn test_resize_reaches_backend_and_surface() {
        let (mut lifecycle, log) = started();
        lifecycle.resize(640, 480);
        lifecycle.resize(0, 480);
        assert_eq!(lifecycle.surface(), SurfaceRect::from_size(640, 480));
        assert_eq!(*log.borrow(), vec!["resize 640x480".to_string()]);
    }

    #[test]
    fn test_listeners_see_events_until_stop() {
        let (mut lifecycle, _) = started();
        let seen = Rc::new(Cell::new(0));
        let sink = seen.clone();
        lifecycle.add_listener(InputEventKind::KeyDown, move |_| sink.set(sink.get() + 1));

        lifecycle.handle_input(InputEvent::KeyDown(KeyCode::KeyA));
        lifecycle.handle_input(InputEvent::KeyUp(KeyCode::KeyA));
        lifecycle.stop();
        lifecycle.handle_input(InputEvent::KeyDown(KeyCode::KeyA));

        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_blocking_load_result_joins_graph_and_late_loads_drop() {
        let mut registry = ParserRegistry::empty();
        registry.register(
            ModelFormat::Fbx,
            |_: &[u8], _: &Path| -> Result<ModelData, ParseError> {
                Ok(ModelData::Group(crate::gfx::scene::ModelNode::new("rig")))
            },
        );
        let loader = ModelLoader::with_registry("FBX", &registry).unwrap();
        let (mut lifecycle, _) = started();

        let reporter = lifecycle
            .load_queue()
            .register(LoadCallbacks::new(|data, graph: &mut SceneGraph| {
                graph.add_tree(&data.into_node(), None);
            }));
        reporter.finish(loader.parse_bytes(b"", Path::new("rig.fbx")));
        assert_eq!(lifecycle.pump_loads(), 1);
        assert!(lifecycle.graph().find_by_name("rig").is_some());

        let late = lifecycle
            .load_queue()
            .register(LoadCallbacks::new(|_, _: &mut SceneGraph| panic!("late load")));
        lifecycle.stop();
        late.finish(loader.parse_bytes(b"", Path::new("rig.fbx")));
        assert_eq!(lifecycle.pump_loads(), 0);
    }
}
