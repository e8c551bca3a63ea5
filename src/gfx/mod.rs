//! # Graphics Module
//!
//! Everything the viewport draws or hit-tests against.
//!
//! - **Camera** ([`camera`]) - camera trait, perspective camera and the avatar rig
//! - **Scene** ([`scene`]) - arena scene graph, meshes and vertex layout
//! - **Picking** ([`picking`]) - screen rays and ray/mesh intersection
//! - **Gizmos** ([`gizmos`]) - selection tool and the translate gizmo
//! - **Geometry** ([`geometry`]) - procedural primitives
//! - **Rendering** ([`rendering`]) - wgpu pipelines and the render backend
//! - **Resources** ([`resources`]) - uniforms and depth textures

pub mod camera;
pub mod geometry;
pub mod gizmos;
pub mod picking;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::{Camera, CameraRig, PerspectiveCamera};
pub use rendering::WgpuRenderer;
pub use scene::{NodeId, SceneGraph};
