//! GPU resources shared by the renderer

pub mod global_bindings;
pub mod texture_resource;

pub use global_bindings::{FrameUniform, GlobalBindings, LightConfig, NodeBindings, NodeUniform};
pub use texture_resource::TextureResource;
