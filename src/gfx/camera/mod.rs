pub mod camera_rig;
pub mod camera_utils;
pub mod perspective_camera;

// Re-export main types
pub use camera_rig::CameraRig;
pub use camera_utils::{Camera, CameraUniform, OPENGL_TO_WGPU_MATRIX};
pub use perspective_camera::PerspectiveCamera;
