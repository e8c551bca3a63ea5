use crate::gfx::camera::Camera;
use crate::gfx::scene::SceneGraph;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("pipeline setup failed: {0}")]
    Pipeline(#[from] crate::gfx::rendering::PipelineError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("render backend was released")]
    Released,
}

/// Something the lifecycle can draw a scene graph into
///
/// The wgpu renderer is the production implementation; tests use a
/// recording backend.
pub trait RenderBackend {
    /// Draw one frame, returning the number of draw calls issued
    fn render(&mut self, graph: &SceneGraph, camera: &dyn Camera) -> Result<u32, RenderError>;

    fn resize(&mut self, width: u32, height: u32);

    /// Free GPU resources; the backend is not used afterwards
    fn release(&mut self);
}
