//! Vantage 3D Viewport
//!
//! A real-time 3D viewport built on wgpu and winit: a first-person avatar
//! camera driven by keyboard and mouse look, pointer picking with a translate
//! gizmo, and model loading on background threads.

pub mod app;
pub mod avatar;
pub mod config;
pub mod gfx;
pub mod input;
pub mod lifecycle;
pub mod loading;
pub mod prelude;
pub mod timing;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::VantageApp;
pub use config::ViewportConfig;
pub use lifecycle::SceneLifecycle;

/// Creates a viewport application with the default configuration
pub fn default() -> anyhow::Result<VantageApp> {
    VantageApp::new()
}
