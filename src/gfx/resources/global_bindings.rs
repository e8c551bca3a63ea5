//! Per-frame and per-node uniform bindings
//!
//! Group 0 carries the camera and the directional light and is bound once per
//! frame. Group 1 carries one node's world transform and color.

use cgmath::{InnerSpace, Matrix, Matrix4, SquareMatrix, Vector3};

use crate::gfx::camera::CameraUniform;
use crate::wgpu_utils::{
    binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc,
    UniformBuffer,
};

/// Must match `FrameUniform` in `shader.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    /// World-space direction the light travels in; `w` is the intensity
    light_direction: [f32; 4],
}

/// Must match `NodeUniform` in `shader.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct NodeUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    color: [f32; 4],
}

impl NodeUniform {
    pub fn new(world: Matrix4<f32>, color: [f32; 4]) -> Self {
        // Inverse transpose keeps normals perpendicular under non-uniform scale
        let normal = world.invert().map(|m| m.transpose()).unwrap_or(world);
        Self {
            model: world.into(),
            normal: normal.into(),
            color,
        }
    }
}

/// Directional light used for the simple shading model
#[derive(Copy, Clone, Debug)]
pub struct LightConfig {
    pub direction: Vector3<f32>,
    pub intensity: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            direction: Vector3::new(-0.4, -1.0, -0.6),
            intensity: 1.0,
        }
    }
}

pub type FrameUBO = UniformBuffer<FrameUniform>;

/// Group 0 layout, buffer and bind group
pub struct GlobalBindings {
    layout: BindGroupLayoutWithDesc,
    ubo: FrameUBO,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Frame Bind Group Layout");
        let ubo = FrameUBO::new(device);
        let bind_group = BindGroupBuilder::new(&layout)
            .resource(ubo.binding_resource())
            .create(device, "Frame Bind Group");

        Self {
            layout,
            ubo,
            bind_group,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, camera: CameraUniform, light: LightConfig) {
        let direction = if light.direction.magnitude2() > 0.0 {
            light.direction.normalize()
        } else {
            -Vector3::unit_y()
        };
        self.ubo.update_content(
            queue,
            FrameUniform {
                view_position: camera.view_position,
                view_proj: camera.view_proj,
                light_direction: [direction.x, direction.y, direction.z, light.intensity],
            },
        );
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Group 1 layout shared by every node's bind group
pub struct NodeBindings {
    layout: BindGroupLayoutWithDesc,
}

impl NodeBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            layout: BindGroupLayoutBuilder::new()
                .next_binding_rendering(binding_types::uniform())
                .create(device, "Node Bind Group Layout"),
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout.layout
    }

    /// Uniform buffer plus bind group for one node
    pub fn create(
        &self,
        device: &wgpu::Device,
    ) -> (UniformBuffer<NodeUniform>, wgpu::BindGroup) {
        let ubo = UniformBuffer::<NodeUniform>::new(device);
        let bind_group = BindGroupBuilder::new(&self.layout)
            .resource(ubo.binding_resource())
            .create(device, "Node Bind Group");
        (ubo, bind_group)
    }
}
