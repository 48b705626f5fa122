use crate::context::GpuContext;
use crate::mesh::MeshCache;
use crate::pipelines::Pipelines;
use crate::post::{self, StageInput, StageOutput};
use crate::readback;
use crate::resources::{
    ColorTarget, OFFSCREEN_FORMAT, Samplers, create_depth_texture, create_fallback_texture,
};
use crate::uniforms::{FrameUniforms, ObjectUniforms, PostUniforms};
use crate::GpuError;
use bytemuck::Zeroable;
use knotlab_common::{Extent, TargetHandle};
use knotlab_render::{
    Capture, FrameMode, Output, PostPassCall, RenderBackend, ScenePassCall, TargetDesc,
};
use knotlab_scene::material::names;
use std::collections::BTreeMap;
use wgpu::util::DeviceExt;

/// Post stages a single effect may expand into.
const MAX_POST_STAGES: usize = 4;

/// Format used for the canvas when there is no window surface.
const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

struct SurfaceState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    configured: bool,
}

struct ActiveFrame {
    mode: FrameMode,
    /// Set when the frame draws into the window surface.
    surface: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
}

/// Executes frame plans with wgpu, on a window surface or fully offscreen.
///
/// Every scene and post call is encoded and submitted on its own, so uniform
/// writes made for one pass are never observed by another.
pub struct WgpuBackend {
    ctx: GpuContext,
    surface: Option<SurfaceState>,
    screen_format: wgpu::TextureFormat,
    pipelines: Pipelines,
    meshes: MeshCache,
    samplers: Samplers,
    fallback: ColorTarget,
    targets: BTreeMap<TargetHandle, ColorTarget>,
    canvas: Extent,
    depth: wgpu::TextureView,
    /// Offscreen canvas for capture frames and headless presentation.
    offscreen_canvas: Option<ColorTarget>,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    post_buffers: Vec<wgpu::Buffer>,
    frame: Option<ActiveFrame>,
    pending_present: Option<wgpu::SurfaceTexture>,
}

impl WgpuBackend {
    /// Backend presenting to `surface`, or rendering offscreen when there is none.
    pub fn new(ctx: GpuContext, surface: Option<wgpu::Surface<'static>>) -> Self {
        let canvas = Extent::new(1, 1);
        let (surface, screen_format) = match surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&ctx.adapter);
                let format = caps
                    .formats
                    .iter()
                    .find(|f| f.is_srgb())
                    .or(caps.formats.first())
                    .copied()
                    .unwrap_or(HEADLESS_FORMAT);
                let config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width: canvas.width,
                    height: canvas.height,
                    present_mode: wgpu::PresentMode::AutoVsync,
                    alpha_mode: caps
                        .alpha_modes
                        .first()
                        .copied()
                        .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                };
                (
                    Some(SurfaceState {
                        surface,
                        config,
                        configured: false,
                    }),
                    format,
                )
            }
            None => (None, HEADLESS_FORMAT),
        };

        let device = &ctx.device;
        let pipelines = Pipelines::new(device);
        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame_uniform_buffer"),
            contents: bytemuck::bytes_of(&FrameUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &pipelines.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });
        let post_buffers = (0..MAX_POST_STAGES)
            .map(|_| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("post_uniform_buffer"),
                    size: std::mem::size_of::<PostUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        Self {
            samplers: Samplers::new(device),
            fallback: create_fallback_texture(device, &ctx.queue),
            depth: create_depth_texture(device, canvas),
            pipelines,
            meshes: MeshCache::default(),
            targets: BTreeMap::new(),
            canvas,
            offscreen_canvas: None,
            frame_buffer,
            frame_bind_group,
            post_buffers,
            frame: None,
            pending_present: None,
            surface,
            screen_format,
            ctx,
        }
    }

    /// Offscreen backend on a headless device.
    pub fn headless() -> Result<Self, GpuError> {
        Ok(Self::new(GpuContext::headless()?, None))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.ctx.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.ctx.queue
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    pub fn screen_format(&self) -> wgpu::TextureFormat {
        self.screen_format
    }

    pub fn canvas(&self) -> Extent {
        self.canvas
    }

    /// Draw `overlay` onto the last presented-mode frame, then show it.
    ///
    /// Does nothing when the last frame was abandoned or rendered offscreen.
    pub fn present_with<F>(&mut self, overlay: F)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &wgpu::TextureView, Extent),
    {
        if let Some(texture) = self.pending_present.take() {
            let view = texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            overlay(&self.ctx.device, &self.ctx.queue, &view, self.canvas);
            texture.present();
        }
    }

    pub fn present(&mut self) {
        self.present_with(|_, _, _, _| {});
    }

    /// Drop every uploaded mesh, e.g. when switching scenes.
    pub fn clear_meshes(&mut self) {
        self.meshes.clear();
    }

    fn ensure_offscreen_canvas(&mut self) {
        if self
            .offscreen_canvas
            .as_ref()
            .is_some_and(|c| c.extent == self.canvas)
        {
            return;
        }
        self.offscreen_canvas = Some(ColorTarget::new(
            &self.ctx.device,
            "offscreen_canvas",
            self.canvas,
            knotlab_render::Filter::Linear,
            self.screen_format,
        ));
    }

    fn acquire_surface(&mut self) -> Result<Option<(wgpu::SurfaceTexture, wgpu::TextureView)>, GpuError> {
        let Some(state) = self.surface.as_mut() else {
            return Ok(None);
        };
        if !state.configured
            || state.config.width != self.canvas.width
            || state.config.height != self.canvas.height
        {
            state.config.width = self.canvas.width;
            state.config.height = self.canvas.height;
            state.surface.configure(&self.ctx.device, &state.config);
            state.configured = true;
            tracing::debug!("surface configured at {}", self.canvas);
        }
        match state.surface.get_current_texture() {
            Ok(texture) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Some((texture, view)))
            }
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                state.surface.configure(&self.ctx.device, &state.config);
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn canvas_view(&self) -> Result<&wgpu::TextureView, GpuError> {
        let frame = self.frame.as_ref().ok_or(GpuError::NoFrame)?;
        match (&frame.surface, &self.offscreen_canvas) {
            (Some((_, view)), _) => Ok(view),
            (None, Some(canvas)) => Ok(&canvas.view),
            (None, None) => Err(GpuError::NoFrame),
        }
    }

    fn output_view(&self, output: Output) -> Result<(&wgpu::TextureView, wgpu::TextureFormat), GpuError> {
        match output {
            Output::Screen => Ok((self.canvas_view()?, self.screen_format)),
            Output::Target(handle) => {
                let target = self
                    .targets
                    .get(&handle)
                    .ok_or(GpuError::UnknownTarget(handle))?;
                Ok((&target.view, target.format))
            }
        }
    }

    fn output_format(&self, output: Output) -> Result<wgpu::TextureFormat, GpuError> {
        match output {
            Output::Screen => Ok(self.screen_format),
            Output::Target(handle) => self
                .targets
                .get(&handle)
                .map(|t| t.format)
                .ok_or(GpuError::UnknownTarget(handle)),
        }
    }

    fn stage_input(&self, call: &PostPassCall<'_>, input: StageInput) -> Result<&wgpu::TextureView, GpuError> {
        let handle = match input {
            StageInput::Input => call.input,
            StageInput::Scratch(i) => call.scratch[i],
        };
        Ok(&self.target(handle)?.view)
    }

    fn target(&self, handle: TargetHandle) -> Result<&ColorTarget, GpuError> {
        self.targets
            .get(&handle)
            .ok_or(GpuError::UnknownTarget(handle))
    }
}

impl RenderBackend for WgpuBackend {
    type Error = GpuError;

    fn max_canvas_dimension(&self) -> u32 {
        self.ctx.max_texture_dimension()
    }

    fn max_capture_bytes(&self) -> u64 {
        self.ctx.max_buffer_size()
    }

    fn capture_bytes(&self, extent: Extent) -> u64 {
        readback::readback_size(extent)
    }

    fn create_target(&mut self, handle: TargetHandle, desc: &TargetDesc) -> Result<(), GpuError> {
        let target = ColorTarget::new(
            &self.ctx.device,
            "offscreen_target",
            desc.extent,
            desc.filter,
            OFFSCREEN_FORMAT,
        );
        self.targets.insert(handle, target);
        Ok(())
    }

    fn destroy_target(&mut self, handle: TargetHandle) {
        if let Some(target) = self.targets.remove(&handle) {
            target.texture.destroy();
        }
    }

    fn resize_canvas(&mut self, extent: Extent) -> Result<(), GpuError> {
        let max = self.max_canvas_dimension();
        if extent.max_dimension() > max {
            return Err(GpuError::CanvasTooLarge { extent, max });
        }
        if extent == self.canvas {
            return Ok(());
        }
        self.canvas = extent;
        self.depth = create_depth_texture(&self.ctx.device, extent);
        self.offscreen_canvas = None;
        Ok(())
    }

    fn begin_frame(&mut self, mode: FrameMode) -> Result<(), GpuError> {
        if self.frame.is_some() {
            return Err(GpuError::FrameInProgress);
        }
        if let Some(stale) = self.pending_present.take() {
            stale.present();
        }
        let surface = match mode {
            FrameMode::Present => self.acquire_surface()?,
            FrameMode::Capture => None,
        };
        if surface.is_none() {
            self.ensure_offscreen_canvas();
        }
        self.frame = Some(ActiveFrame { mode, surface });
        Ok(())
    }

    fn draw_scene(&mut self, call: &ScenePassCall<'_>) -> Result<(), GpuError> {
        if self.frame.is_none() {
            return Err(GpuError::NoFrame);
        }
        let format = self.output_format(call.output)?;
        let device = &self.ctx.device;
        let queue = &self.ctx.queue;

        queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameUniforms::new(
                call.camera,
                call.scene,
                self.canvas,
                call.time,
            )),
        );

        struct Draw {
            id: knotlab_scene::ObjectId,
            pipeline: (knotlab_scene::ShaderKind, knotlab_scene::FaceSide),
            textures: wgpu::BindGroup,
        }
        let mut draws = Vec::new();
        for (id, object, shape, material) in call.scene.visible_meshes() {
            self.meshes
                .ensure(device, &self.pipelines.object_layout, id, shape);
            self.pipelines
                .ensure_scene(device, material.shader(), material.side(), format);

            let sampled = match material.texture(names::TEXTURE) {
                Some(handle) if material.shader().samples_texture() => {
                    if call.output == Output::Target(handle) {
                        return Err(GpuError::FeedbackLoop(handle));
                    }
                    Some(
                        self.targets
                            .get(&handle)
                            .ok_or(GpuError::UnknownTarget(handle))?,
                    )
                }
                _ => None,
            };
            let (view, sampler) = match sampled {
                Some(target) => (&target.view, self.samplers.get(target.filter)),
                None => (&self.fallback.view, self.samplers.get(self.fallback.filter)),
            };
            let textures = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("texture_bind_group"),
                layout: &self.pipelines.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            });

            if let Some(mesh) = self.meshes.get(id) {
                let uniforms =
                    ObjectUniforms::pack(object.transform.matrix(), material, call.time);
                queue.write_buffer(&mesh.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
            }
            draws.push(Draw {
                id,
                pipeline: (material.shader(), material.side()),
                textures,
            });
        }

        let (view, _) = self.output_view(call.output)?;
        let clear = call.scene.background.as_dvec4();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(call.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.x,
                            g: clear.y,
                            b: clear.z,
                            a: clear.w,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for draw in &draws {
                let (Some(mesh), Some(pipeline)) = (
                    self.meshes.get(draw.id),
                    self.pipelines.scene(draw.pipeline.0, draw.pipeline.1, format),
                ) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(1, &mesh.bind_group, &[]);
                pass.set_bind_group(2, &draw.textures, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
        tracing::trace!("scene pass `{}`: {} draws", call.label, draws.len());
        Ok(())
    }

    fn draw_post(&mut self, call: &PostPassCall<'_>) -> Result<(), GpuError> {
        if self.frame.is_none() {
            return Err(GpuError::NoFrame);
        }
        let needed = call.effect.scratch_targets();
        if call.scratch.len() < needed {
            return Err(GpuError::MissingScratch {
                effect: call.effect.label(),
                needed,
                got: call.scratch.len(),
            });
        }
        if call.output == Output::Target(call.input) {
            return Err(GpuError::FeedbackLoop(call.input));
        }
        let output_format = self.output_format(call.output)?;
        let stages = post::stages(call.effect, self.canvas, call.time);

        let stage_format = |output: StageOutput| match output {
            StageOutput::Scratch(_) => OFFSCREEN_FORMAT,
            StageOutput::Output => output_format,
        };
        for desc in &stages {
            self.pipelines
                .ensure_post(&self.ctx.device, desc.stage, stage_format(desc.output));
        }

        let device = &self.ctx.device;
        let queue = &self.ctx.queue;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("post_encoder"),
        });
        for (i, desc) in stages.iter().enumerate() {
            let buffer = &self.post_buffers[i % self.post_buffers.len()];
            queue.write_buffer(buffer, 0, bytemuck::bytes_of(&desc.uniforms));
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("post_bind_group"),
                layout: &self.pipelines.post_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(self.stage_input(call, desc.primary)?),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(self.stage_input(call, desc.extra)?),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(
                            self.samplers.get(knotlab_render::Filter::Linear),
                        ),
                    },
                ],
            });
            let output = match desc.output {
                StageOutput::Scratch(s) => &self.target(call.scratch[s])?.view,
                StageOutput::Output => self.output_view(call.output)?.0,
            };
            let Some(pipeline) = self.pipelines.post(desc.stage, stage_format(desc.output)) else {
                continue;
            };
            post::fullscreen_pass(&mut encoder, pipeline, &bind_group, output);
        }
        queue.submit(std::iter::once(encoder.finish()));
        tracing::trace!("post `{}`: {} stages", call.label, stages.len());
        Ok(())
    }

    fn end_frame(&mut self) -> Result<Option<Capture>, GpuError> {
        let frame = self.frame.take().ok_or(GpuError::NoFrame)?;
        match frame.mode {
            FrameMode::Present => {
                if let Some((texture, _)) = frame.surface {
                    self.pending_present = Some(texture);
                }
                Ok(None)
            }
            FrameMode::Capture => {
                let canvas = self
                    .offscreen_canvas
                    .as_ref()
                    .ok_or(GpuError::NoFrame)?;
                let pixels = readback::read_texture(
                    &self.ctx.device,
                    &self.ctx.queue,
                    &canvas.texture,
                    canvas.extent,
                    canvas.format,
                )?;
                Ok(Some(Capture {
                    extent: canvas.extent,
                    pixels,
                }))
            }
        }
    }

    fn abandon_frame(&mut self) {
        if self.frame.take().is_some() {
            tracing::debug!("dropped in-flight frame");
        }
    }
}
