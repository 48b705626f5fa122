use crate::resources::DEPTH_FORMAT;
use crate::shaders;
use knotlab_scene::{FaceSide, ShaderKind, Vertex};
use std::collections::HashMap;

/// One full-screen stage of the post chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostStage {
    BloomExtract,
    Blur,
    BloomComposite,
    Grain,
}

impl PostStage {
    fn entry_point(self) -> &'static str {
        match self {
            PostStage::BloomExtract => "fs_bloom_extract",
            PostStage::Blur => "fs_blur",
            PostStage::BloomComposite => "fs_bloom_composite",
            PostStage::Grain => "fs_grain",
        }
    }
}

fn fragment_entry(kind: ShaderKind) -> &'static str {
    match kind {
        ShaderKind::Refraction => "fs_refraction",
        ShaderKind::FresnelGlow => "fs_glow",
        ShaderKind::Iridescence => "fs_iridescence",
        ShaderKind::NormalGradient => "fs_normals",
        ShaderKind::Lambert => "fs_lambert",
        ShaderKind::Emissive => "fs_emissive",
    }
}

/// Face side is rasterizer state, so it selects the cull mode of the pipeline.
fn cull_mode(side: FaceSide) -> Option<wgpu::Face> {
    match side {
        FaceSide::Front => Some(wgpu::Face::Back),
        FaceSide::Back => Some(wgpu::Face::Front),
        FaceSide::Double => None,
    }
}

type SceneKey = (ShaderKind, FaceSide, wgpu::TextureFormat);
type PostKey = (PostStage, wgpu::TextureFormat);

/// Bind group layouts, shader modules and lazily built render pipelines.
pub struct Pipelines {
    pub frame_layout: wgpu::BindGroupLayout,
    pub object_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub post_layout: wgpu::BindGroupLayout,
    scene_module: wgpu::ShaderModule,
    post_module: wgpu::ShaderModule,
    scene_pipeline_layout: wgpu::PipelineLayout,
    post_pipeline_layout: wgpu::PipelineLayout,
    scene: HashMap<SceneKey, wgpu::RenderPipeline>,
    post: HashMap<PostKey, wgpu::RenderPipeline>,
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

impl Pipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let stages = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[uniform_entry(0, stages)],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_bind_group_layout"),
            entries: &[uniform_entry(0, stages)],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });
        let post_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_bind_group_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1),
                texture_entry(2),
                sampler_entry(3),
            ],
        });

        let scene_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &object_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let post_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post_pipeline_layout"),
            bind_group_layouts: &[&post_layout],
            push_constant_ranges: &[],
        });

        let scene_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });
        let post_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::POST_SHADER.into()),
        });

        Self {
            frame_layout,
            object_layout,
            texture_layout,
            post_layout,
            scene_module,
            post_module,
            scene_pipeline_layout,
            post_pipeline_layout,
            scene: HashMap::new(),
            post: HashMap::new(),
        }
    }

    pub fn ensure_scene(
        &mut self,
        device: &wgpu::Device,
        kind: ShaderKind,
        side: FaceSide,
        format: wgpu::TextureFormat,
    ) {
        if self.scene.contains_key(&(kind, side, format)) {
            return;
        }
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(&self.scene_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.scene_module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                        2 => Float32x2,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.scene_module,
                entry_point: Some(fragment_entry(kind)),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: cull_mode(side),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });
        tracing::debug!("built {kind:?} pipeline ({side}, {format:?})");
        self.scene.insert((kind, side, format), pipeline);
    }

    pub fn scene(
        &self,
        kind: ShaderKind,
        side: FaceSide,
        format: wgpu::TextureFormat,
    ) -> Option<&wgpu::RenderPipeline> {
        self.scene.get(&(kind, side, format))
    }

    pub fn ensure_post(&mut self, device: &wgpu::Device, stage: PostStage, format: wgpu::TextureFormat) {
        if self.post.contains_key(&(stage, format)) {
            return;
        }
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("post_pipeline"),
            layout: Some(&self.post_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.post_module,
                entry_point: Some("vs_fullscreen"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.post_module,
                entry_point: Some(stage.entry_point()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });
        tracing::debug!("built {stage:?} pipeline ({format:?})");
        self.post.insert((stage, format), pipeline);
    }

    pub fn post(&self, stage: PostStage, format: wgpu::TextureFormat) -> Option<&wgpu::RenderPipeline> {
        self.post.get(&(stage, format))
    }
}
