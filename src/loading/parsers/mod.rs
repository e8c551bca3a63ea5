//! Built-in format parsers
pub mod gltf_scene;
pub mod obj;
pub mod ply;
pub mod stl;
