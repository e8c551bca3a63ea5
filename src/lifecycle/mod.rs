//! # Lifecycle
//!
//! Session ownership: the scene graph, render backend, active camera and the
//! capabilities bound into a running viewport.

pub mod backend;
pub mod liveness;
pub mod scene_lifecycle;

pub use backend::{RenderBackend, RenderError};
pub use liveness::LivenessToken;
pub use scene_lifecycle::{FirstPersonBinding, FrameCallbackId, LifecycleState, SceneLifecycle};
