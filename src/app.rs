//! Winit host for the viewport
//!
//! [`VantageApp`] owns the event loop, creates the window and the wgpu backend
//! on resume, translates winit events into [`InputEvent`]s and fulfils the
//! pointer-capture requests the lifecycle emits with a cursor grab.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cgmath::{Vector2, Vector3};
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowAttributes, WindowId},
};

use crate::config::ViewportConfig;
use crate::gfx::geometry::generate_box;
use crate::gfx::gizmos::{SelectionTool, TranslateGizmo};
use crate::gfx::rendering::WgpuRenderer;
use crate::gfx::scene::SceneNode;
use crate::input::{CaptureRequest, InputEvent, SurfaceRect};
use crate::lifecycle::{FirstPersonBinding, SceneLifecycle};
use crate::loading::{ModelFormat, ModelLoader, ParserRegistry};

/// Translate a keyboard event; auto-repeats are dropped
fn key_event(state: ElementState, code: KeyCode, repeat: bool) -> Option<InputEvent> {
    match state {
        ElementState::Pressed if repeat => None,
        ElementState::Pressed => Some(InputEvent::KeyDown(code)),
        ElementState::Released => Some(InputEvent::KeyUp(code)),
    }
}

/// Keys the host handles itself instead of routing to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostCommand {
    Exit,
    Respawn,
}

fn host_command(state: ElementState, code: KeyCode, repeat: bool) -> Option<HostCommand> {
    if state != ElementState::Pressed || repeat {
        return None;
    }
    match code {
        KeyCode::Escape => Some(HostCommand::Exit),
        KeyCode::KeyR => Some(HostCommand::Respawn),
        _ => None,
    }
}

fn pointer_event(
    state: ElementState,
    button: MouseButton,
    cursor: Vector2<f32>,
    surface: &SurfaceRect,
) -> InputEvent {
    match state {
        ElementState::Pressed => InputEvent::PointerDown {
            button: button.into(),
            position: cursor,
            over_surface: surface.contains(cursor),
        },
        ElementState::Released => InputEvent::PointerUp {
            button: button.into(),
            position: cursor,
        },
    }
}

/// Non-selectable 3x3x3 reference cube in front of the spawn point
fn reference_cube() -> SceneNode {
    let mut cube = SceneNode::with_mesh(
        "ReferenceCube",
        Arc::new(generate_box([1.5, 1.5, 1.5]).into_mesh()),
    );
    cube.transform.position = Vector3::new(0.0, 0.0, 5.0);
    cube
}

pub struct VantageApp {
    event_loop: Option<EventLoop<()>>,
    state: AppState,
}

struct AppState {
    config: ViewportConfig,
    window: Option<Arc<Window>>,
    lifecycle: SceneLifecycle,
    registry: ParserRegistry,
    pending_models: Vec<PathBuf>,
    cursor: Vector2<f32>,
    failure: Option<anyhow::Error>,
}

impl VantageApp {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(ViewportConfig::default())
    }

    pub fn with_config(config: ViewportConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;

        let mut lifecycle = SceneLifecycle::from_config(&config);
        lifecycle.bind_first_person(FirstPersonBinding::from_config(&config));
        lifecycle.bind_selection_tool(SelectionTool::new(
            Box::new(TranslateGizmo::new()),
            &config.selection,
        ));

        Ok(Self {
            event_loop: Some(event_loop),
            state: AppState {
                config,
                window: None,
                lifecycle,
                registry: ParserRegistry::default(),
                pending_models: Vec::new(),
                cursor: Vector2::new(0.0, 0.0),
                failure: None,
            },
        })
    }

    /// Queue a model file to load once the window is up
    pub fn add_model(&mut self, path: impl Into<PathBuf>) {
        self.state.pending_models.push(path.into());
    }

    /// Parsers used for queued models; register FBX/Collada/Rhino3dm here
    pub fn registry_mut(&mut self) -> &mut ParserRegistry {
        &mut self.state.registry
    }

    /// The viewport, e.g. to add frame callbacks or selection observers
    pub fn lifecycle_mut(&mut self) -> &mut SceneLifecycle {
        &mut self.state.lifecycle
    }

    /// Run until the window closes
    pub fn run(mut self) -> anyhow::Result<()> {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();

        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop
            .run_app(&mut self.state)
            .context("event loop terminated abnormally")?;

        match self.state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn create_viewport(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_config = &self.config.window;
        let attributes = WindowAttributes::default()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("failed to create window")?,
        );

        let PhysicalSize { width, height } = window.inner_size();
        let renderer = pollster::block_on(WgpuRenderer::new(
            Arc::clone(&window),
            width,
            height,
            window_config.clear_color,
        ))
        .context("failed to initialise the renderer")?;

        self.lifecycle.resize(width, height);
        self.lifecycle.start(Box::new(renderer));
        self.lifecycle.graph_mut().add_node(reference_cube(), None);

        for path in std::mem::take(&mut self.pending_models) {
            self.queue_model(path);
        }

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn queue_model(&mut self, path: PathBuf) {
        let Some(format) = ModelFormat::from_path(&path) else {
            warn!("Skipping {}: unrecognised model extension", path.display());
            return;
        };
        match ModelLoader::for_format(format, &self.registry) {
            Ok(loader) => {
                let url = path.to_string_lossy();
                info!("Loading {url} as {}", format.tag());
                self.lifecycle.load_into_scene(&loader, &url);
            }
            Err(err) => error!("Cannot load {}: {err}", path.display()),
        }
    }

    fn apply_capture_requests(&mut self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        while let Some(request) = self.lifecycle.take_capture_request() {
            match request {
                CaptureRequest::Acquire => {
                    let granted = window
                        .set_cursor_grab(CursorGrabMode::Locked)
                        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
                        .is_ok();
                    if granted {
                        window.set_cursor_visible(false);
                    }
                    self.lifecycle.pointer_capture_changed(granted);
                }
                CaptureRequest::Release => {
                    if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                        warn!("Failed to release cursor grab: {err}");
                    }
                    window.set_cursor_visible(true);
                    self.lifecycle.pointer_capture_changed(false);
                }
            }
        }
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        self.lifecycle.stop();
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.create_viewport(event_loop) {
            error!("{err:#}");
            self.failure = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.shut_down(event_loop),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.lifecycle.resize(width, height);
            }
            WindowEvent::Focused(false) => {
                if let Some(binding) = self.lifecycle.first_person_mut() {
                    binding.router.release_all();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                match host_command(state, code, repeat) {
                    Some(HostCommand::Exit) => {
                        self.shut_down(event_loop);
                        return;
                    }
                    Some(HostCommand::Respawn) => {
                        info!("Respawning avatar");
                        self.lifecycle.respawn();
                    }
                    None => {}
                }
                if let Some(input) = key_event(state, code, repeat) {
                    self.lifecycle.handle_input(input);
                }
            }
            WindowEvent::CursorMoved {
                position: PhysicalPosition { x, y },
                ..
            } => {
                self.cursor = Vector2::new(x as f32, y as f32);
                self.lifecycle.handle_input(InputEvent::PointerMove {
                    position: self.cursor,
                });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let surface = self.lifecycle.surface();
                self.lifecycle
                    .handle_input(pointer_event(state, button, self.cursor, &surface));
            }
            WindowEvent::RedrawRequested => {
                self.lifecycle.tick();
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.lifecycle.handle_input(InputEvent::MouseMotion {
                dx: dx as f32,
                dy: dy as f32,
            });
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.lifecycle.pump_loads();
        self.apply_capture_requests();
        if self.lifecycle.take_redraw_request() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointerButton;

    #[test]
    fn test_key_repeat_is_dropped() {
        assert_eq!(
            key_event(ElementState::Pressed, KeyCode::KeyW, false),
            Some(InputEvent::KeyDown(KeyCode::KeyW))
        );
        assert_eq!(key_event(ElementState::Pressed, KeyCode::KeyW, true), None);
        assert_eq!(
            key_event(ElementState::Released, KeyCode::KeyW, false),
            Some(InputEvent::KeyUp(KeyCode::KeyW))
        );
    }

    #[test]
    fn test_host_commands_fire_on_fresh_press_only() {
        assert_eq!(
            host_command(ElementState::Pressed, KeyCode::Escape, false),
            Some(HostCommand::Exit)
        );
        assert_eq!(
            host_command(ElementState::Pressed, KeyCode::KeyR, false),
            Some(HostCommand::Respawn)
        );
        assert_eq!(host_command(ElementState::Pressed, KeyCode::KeyR, true), None);
        assert_eq!(host_command(ElementState::Released, KeyCode::KeyR, false), None);
        assert_eq!(host_command(ElementState::Pressed, KeyCode::KeyW, false), None);
    }

    #[test]
    fn test_pointer_press_reports_surface_hit() {
        let surface = SurfaceRect::from_size(100, 50);
        let inside = pointer_event(
            ElementState::Pressed,
            MouseButton::Left,
            Vector2::new(10.0, 10.0),
            &surface,
        );
        assert_eq!(
            inside,
            InputEvent::PointerDown {
                button: PointerButton::Primary,
                position: Vector2::new(10.0, 10.0),
                over_surface: true,
            }
        );

        let outside = pointer_event(
            ElementState::Pressed,
            MouseButton::Right,
            Vector2::new(150.0, 10.0),
            &surface,
        );
        assert!(matches!(
            outside,
            InputEvent::PointerDown {
                button: PointerButton::Secondary,
                over_surface: false,
                ..
            }
        ));
    }

    #[test]
    fn test_reference_cube_is_not_selectable() {
        let cube = reference_cube();
        assert!(!cube.selectable);
        assert_eq!(cube.transform.position, Vector3::new(0.0, 0.0, 5.0));
        let bounds = cube.mesh.as_ref().and_then(|mesh| mesh.bounds());
        let bounds = bounds.expect("cube has geometry");
        assert_eq!(bounds.max.x - bounds.min.x, 3.0);
    }
}
