//! # Vantage Prelude
//!
//! Commonly used types for hosting a viewport or driving one headlessly.
//!
//! ```no_run
//! use vantage::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut app = vantage::default()?;
//!     app.add_model("teapot.obj");
//!     app.lifecycle_mut().add_selection_observer(|change| {
//!         println!("selection changed: {change:?}");
//!     });
//!     app.run()
//! }
//! ```

// Application and lifecycle
pub use crate::app::VantageApp;
pub use crate::default;
pub use crate::lifecycle::{
    FirstPersonBinding, FrameCallbackId, LifecycleState, RenderBackend, RenderError,
    SceneLifecycle,
};

// Configuration
pub use crate::config::{
    AvatarConfig, KeyBindings, MovementConfig, RigConfig, SelectionConfig, ViewportConfig,
    WindowConfig,
};

// Avatar, camera and input
pub use crate::avatar::{Avatar, MovementIntegrator, MovementIntent};
pub use crate::gfx::camera::{Camera, CameraRig, PerspectiveCamera};
pub use crate::input::{CaptureRequest, InputEvent, InputEventKind, InputRouter, PointerButton};

// Scene and selection
pub use crate::gfx::geometry::{generate_box, generate_cube, generate_sphere, GeometryData};
pub use crate::gfx::gizmos::{SelectionChange, SelectionTool, TranslateGizmo};
pub use crate::gfx::scene::{Mesh, ModelNode, NodeId, SceneGraph, SceneNode, Transform};

// Loading
pub use crate::loading::{
    LoadCallbacks, LoadProgress, LoaderError, ModelData, ModelFormat, ModelLoader, ModelParser,
    ParserRegistry,
};

pub use crate::timing::{FrameClock, FrameStats};

// Common external dependencies
pub use cgmath::{InnerSpace, Vector2, Vector3, Zero};
