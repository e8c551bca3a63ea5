//! Render pipeline creation and lookup
//!
//! Shaders are registered by name and pipelines are built eagerly from a
//! [`PipelineConfig`], then looked up by name at draw time.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use wgpu::*;

use crate::gfx::scene::Vertex3D;

/// Depth behaviour of a pipeline
#[derive(Debug, Clone, Copy)]
pub struct DepthMode {
    pub format: TextureFormat,
    pub write: bool,
    pub compare: CompareFunction,
}

impl DepthMode {
    /// Regular depth-tested geometry
    pub fn standard(format: TextureFormat) -> Self {
        Self {
            format,
            write: true,
            compare: CompareFunction::Less,
        }
    }

    /// Drawn on top of everything, e.g. gizmo handles
    pub fn always_on_top(format: TextureFormat) -> Self {
        Self {
            format,
            write: false,
            compare: CompareFunction::Always,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub fragment_entry: String,
    pub cull_mode: Option<Face>,
    pub depth: Option<DepthMode>,
    pub color_format: TextureFormat,
    pub blend: Option<BlendState>,
}

impl PipelineConfig {
    pub fn new(shader: &str, color_format: TextureFormat) -> Self {
        Self {
            label: shader.to_string(),
            shader: shader.to_string(),
            fragment_entry: "fs_main".to_string(),
            cull_mode: Some(Face::Back),
            depth: None,
            color_format,
            blend: Some(BlendState::REPLACE),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_fragment_entry(mut self, entry: &str) -> Self {
        self.fragment_entry = entry.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_depth(mut self, depth: DepthMode) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_blend(mut self, blend: Option<BlendState>) -> Self {
        self.blend = blend;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("shader '{0}' was never loaded")]
    MissingShader(String),
}

pub struct PipelineManager {
    device: Arc<Device>,
    shader_modules: HashMap<String, ShaderModule>,
    pipelines: HashMap<String, RenderPipeline>,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            shader_modules: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    pub fn load_shader(&mut self, name: &str, source: &str) {
        let module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        self.shader_modules.insert(name.to_string(), module);
    }

    /// Build the pipeline described by `config` and store it under `name`
    pub fn create_pipeline(
        &mut self,
        name: &str,
        config: &PipelineConfig,
        bind_group_layouts: &[&BindGroupLayout],
    ) -> Result<(), PipelineError> {
        let shader = self
            .shader_modules
            .get(&config.shader)
            .ok_or_else(|| PipelineError::MissingShader(config.shader.clone()))?;

        let layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(&format!("{} Layout", config.label)),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        let targets = [Some(ColorTargetState {
            format: config.color_format,
            blend: config.blend,
            write_mask: ColorWrites::ALL,
        })];

        let pipeline = self.device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(&config.label),
            layout: Some(&layout),
            vertex: VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex3D::desc()],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: shader,
                entry_point: Some(&config.fragment_entry),
                targets: &targets,
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: config.cull_mode,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: config.depth.map(|depth| DepthStencilState {
                format: depth.format,
                depth_write_enabled: depth.write,
                depth_compare: depth.compare,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        debug!("Created pipeline '{name}'");
        self.pipelines.insert(name.to_string(), pipeline);
        Ok(())
    }

    pub fn get_pipeline(&self, name: &str) -> Option<&RenderPipeline> {
        self.pipelines.get(name)
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }
}
