//! wgpu render backend for the viewport
//!
//! Draws every visible node that carries a mesh with a flat-shaded pipeline,
//! then draws overlay nodes (gizmo handles) with depth testing disabled so
//! they stay on top of the scene.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cgmath::Matrix4;
use log::{debug, info, warn};
use wgpu::util::DeviceExt;

use crate::gfx::camera::Camera;
use crate::gfx::resources::{
    GlobalBindings, LightConfig, NodeBindings, NodeUniform, TextureResource,
};
use crate::gfx::scene::{Mesh, NodeId, SceneGraph, SceneNode};
use crate::lifecycle::{RenderBackend, RenderError};
use crate::wgpu_utils::UniformBuffer;

use super::pipeline_manager::{DepthMode, PipelineConfig, PipelineManager};

const SHADER_NAME: &str = "viewport";
const SCENE_PIPELINE: &str = "scene";
const OVERLAY_PIPELINE: &str = "overlay";

/// One node to draw this frame
#[derive(Clone)]
struct DrawItem {
    id: NodeId,
    mesh: Arc<Mesh>,
    uniform: NodeUniform,
}

/// Split the visible, meshed nodes of `graph` into scene and overlay draws
fn collect_draws(graph: &SceneGraph) -> (Vec<DrawItem>, Vec<DrawItem>) {
    let mut scene = Vec::new();
    let mut overlay = Vec::new();
    graph.traverse_visible(|id, node: &SceneNode, world: &Matrix4<f32>| {
        let Some(mesh) = node.mesh.as_ref().filter(|mesh| !mesh.is_empty()) else {
            return;
        };
        let item = DrawItem {
            id,
            mesh: Arc::clone(mesh),
            uniform: NodeUniform::new(*world, node.color),
        };
        if node.overlay {
            overlay.push(item);
        } else {
            scene.push(item);
        }
    });
    (scene, overlay)
}

/// GPU copy of a node's mesh plus its per-node uniform
struct GpuNode {
    mesh: Arc<Mesh>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    ubo: UniformBuffer<NodeUniform>,
    bind_group: wgpu::BindGroup,
}

pub struct WgpuRenderer {
    surface: Option<wgpu::Surface<'static>>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    pipeline_manager: PipelineManager,
    global_bindings: GlobalBindings,
    node_bindings: NodeBindings,
    gpu_nodes: HashMap<NodeId, GpuNode>,
    clear_color: wgpu::Color,
    pub light: LightConfig,
}

impl WgpuRenderer {
    /// Create a renderer presenting to `window`
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        clear_color: [f64; 4],
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Vantage Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;
        let alpha_mode = capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "Depth Texture");
        let global_bindings = GlobalBindings::new(&device);
        let node_bindings = NodeBindings::new(&device);

        let mut pipeline_manager = PipelineManager::new(Arc::clone(&device));
        pipeline_manager.load_shader(SHADER_NAME, include_str!("shader.wgsl"));
        let layouts = [global_bindings.layout(), node_bindings.layout()];
        pipeline_manager.create_pipeline(
            SCENE_PIPELINE,
            &PipelineConfig::new(SHADER_NAME, format)
                .with_label("Scene Pipeline")
                .with_depth(DepthMode::standard(TextureResource::DEPTH_FORMAT)),
            &layouts,
        )?;
        pipeline_manager.create_pipeline(
            OVERLAY_PIPELINE,
            &PipelineConfig::new(SHADER_NAME, format)
                .with_label("Overlay Pipeline")
                .with_fragment_entry("fs_overlay")
                .with_cull_mode(None)
                .with_depth(DepthMode::always_on_top(TextureResource::DEPTH_FORMAT)),
            &layouts,
        )?;

        let [r, g, b, a] = clear_color;
        Ok(Self {
            surface: Some(surface),
            device,
            queue,
            config,
            depth_texture,
            pipeline_manager,
            global_bindings,
            node_bindings,
            gpu_nodes: HashMap::new(),
            clear_color: wgpu::Color { r, g, b, a },
            light: LightConfig::default(),
        })
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Bring the GPU cache in line with this frame's draws
    fn sync_nodes(&mut self, draws: &[&DrawItem]) {
        let live: HashSet<NodeId> = draws.iter().map(|item| item.id).collect();
        self.gpu_nodes.retain(|id, _| live.contains(id));

        for item in draws {
            let stale = self
                .gpu_nodes
                .get(&item.id)
                .is_none_or(|gpu| !Arc::ptr_eq(&gpu.mesh, &item.mesh));
            if stale {
                let gpu = self.upload(item);
                self.gpu_nodes.insert(item.id, gpu);
            }
            if let Some(gpu) = self.gpu_nodes.get_mut(&item.id) {
                gpu.ubo.update_content(&self.queue, item.uniform);
            }
        }
    }

    fn upload(&self, item: &DrawItem) -> GpuNode {
        debug!(
            "Uploading mesh for node {:?} ({} triangles)",
            item.id,
            item.mesh.triangle_count()
        );
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Node Vertex Buffer"),
                contents: bytemuck::cast_slice(item.mesh.vertices()),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Node Index Buffer"),
                contents: bytemuck::cast_slice(item.mesh.indices()),
                usage: wgpu::BufferUsages::INDEX,
            });
        let (ubo, bind_group) = self.node_bindings.create(&self.device);

        GpuNode {
            mesh: Arc::clone(&item.mesh),
            vertex_buffer,
            index_buffer,
            index_count: item.mesh.indices().len() as u32,
            ubo,
            bind_group,
        }
    }

    fn reconfigure(&self) {
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }
}

impl RenderBackend for WgpuRenderer {
    fn render(&mut self, graph: &SceneGraph, camera: &dyn Camera) -> Result<u32, RenderError> {
        if self.surface.is_none() {
            return Err(RenderError::Released);
        }

        let (scene, overlay) = collect_draws(graph);
        let all: Vec<&DrawItem> = scene.iter().chain(overlay.iter()).collect();
        self.sync_nodes(&all);
        self.global_bindings
            .update(&self.queue, camera.uniform(), self.light);

        let Some(surface) = &self.surface else {
            return Err(RenderError::Released);
        };
        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                warn!("Surface {err}; reconfiguring");
                self.reconfigure();
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Viewport Encoder"),
            });

        let mut draw_calls = 0u32;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Viewport Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);

            for (pipeline_name, items) in [(SCENE_PIPELINE, &scene), (OVERLAY_PIPELINE, &overlay)] {
                if items.is_empty() {
                    continue;
                }
                let Some(pipeline) = self.pipeline_manager.get_pipeline(pipeline_name) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                for item in items.iter() {
                    let Some(gpu) = self.gpu_nodes.get(&item.id) else {
                        continue;
                    };
                    pass.set_bind_group(1, &gpu.bind_group, &[]);
                    pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                    pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..gpu.index_count, 0, 0..1);
                    draw_calls += 1;
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(draw_calls)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "Depth Texture");
    }

    fn release(&mut self) {
        self.gpu_nodes.clear();
        if self.surface.take().is_some() {
            info!("Render surface released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::primitives::generate_cube;
    use crate::gfx::scene::DEFAULT_NODE_COLOR;
    use cgmath::Vector3;

    #[test]
    fn test_collect_draws_splits_overlay_and_skips_hidden() {
        let mut graph = SceneGraph::new();
        let cube = Arc::new(generate_cube().into_mesh());

        let mut parent = SceneNode::with_mesh("parent", Arc::clone(&cube));
        parent.transform.position = Vector3::new(0.0, 2.0, 0.0);
        let parent = graph.add_node(parent, None);
        let child = graph.add_node(SceneNode::with_mesh("child", Arc::clone(&cube)), Some(parent));

        let mut handle = SceneNode::with_mesh("handle", Arc::clone(&cube));
        handle.overlay = true;
        graph.add_node(handle, None);

        let mut hidden = SceneNode::with_mesh("hidden", Arc::clone(&cube));
        hidden.visible = false;
        let hidden = graph.add_node(hidden, None);
        graph.add_node(SceneNode::with_mesh("under_hidden", cube), Some(hidden));

        graph.add_node(SceneNode::new("empty_group"), None);

        let (scene, overlay) = collect_draws(&graph);
        let scene_ids: Vec<NodeId> = scene.iter().map(|item| item.id).collect();
        assert_eq!(scene_ids, vec![parent, child]);
        assert_eq!(overlay.len(), 1);

        // children inherit the parent's world transform
        let expected = NodeUniform::new(graph.world_matrix(child), DEFAULT_NODE_COLOR);
        assert_eq!(graph.world_matrix(child)[3][1], 2.0);
        assert_eq!(
            bytemuck::bytes_of(&scene[1].uniform),
            bytemuck::bytes_of(&expected)
        );
    }

    #[test]
    fn test_collect_draws_empty_graph() {
        let (scene, overlay) = collect_draws(&SceneGraph::new());
        assert!(scene.is_empty() && overlay.is_empty());
    }
}
