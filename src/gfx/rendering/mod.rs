//! GPU side of the viewport: pipelines and the wgpu render backend

pub mod pipeline_manager;
pub mod render_engine;

pub use pipeline_manager::{DepthMode, PipelineConfig, PipelineError, PipelineManager};
pub use render_engine::WgpuRenderer;
