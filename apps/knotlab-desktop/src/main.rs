use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use knotlab_common::{Extent, Viewport};
use knotlab_experiments::ExperimentKind;
use knotlab_render::{Experiment, ExperimentConfig, ExperimentSetup, PassOutput, export};
use knotlab_render_wgpu::{GpuContext, WgpuBackend};
use knotlab_scene::material::names;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "knotlab-desktop", about = "Knot shader experiments")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Experiment to run
    #[arg(short, long, default_value = "refraction")]
    experiment: ExperimentKind,

    /// JSON file overriding export settings, uniforms and post effects
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory exported PNGs are written to
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

/// Window-side state that survives GPU setup.
struct UiState {
    kind: ExperimentKind,
    export_dir: PathBuf,
    show_panel: bool,
    export_requested: bool,
    dragging: bool,
    last_frame: Instant,
    last_export: Option<String>,
}

impl UiState {
    fn handle_key(&mut self, key: KeyCode, event_loop: &ActiveEventLoop) {
        match key {
            KeyCode::KeyE | KeyCode::F12 => self.export_requested = true,
            KeyCode::F1 => self.show_panel = !self.show_panel,
            KeyCode::Escape => event_loop.exit(),
            _ => {}
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext, experiment: &mut Experiment) {
        if !self.show_panel {
            return;
        }

        egui::SidePanel::left("experiment")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading(experiment.name());
                ui.label(self.kind.description());
                ui.separator();
                ui.label(format!("Canvas: {}", experiment.canvas()));
                ui.label(format!(
                    "Frame: {}  Time: {:.1}s",
                    experiment.frame_count(),
                    experiment.elapsed()
                ));
                ui.separator();

                ui.heading("Passes");
                for pass in &experiment.plan().passes {
                    let output = match pass.output {
                        PassOutput::Slot(slot) => slot.to_string(),
                        PassOutput::Final => "final".to_string(),
                    };
                    let source = pass
                        .source
                        .map(|slot| format!(" (samples {slot})"))
                        .unwrap_or_default();
                    ui.label(format!("{} -> {output}{source}", pass.label));
                }
                for effect in &experiment.plan().post {
                    ui.label(format!("post: {}", effect.label()));
                }
                ui.separator();

                ui.heading("Uniforms");
                if let Some(material) = experiment.scene_mut().subject_material_mut() {
                    for (name, value) in material.floats_mut() {
                        if name == names::TIME {
                            continue;
                        }
                        ui.horizontal(|ui| {
                            ui.label(name);
                            ui.add(egui::DragValue::new(value).speed(0.01));
                        });
                    }
                }
                ui.separator();

                ui.heading("Export");
                let mut scale = experiment.export_scale();
                if ui
                    .add(egui::Slider::new(&mut scale, 1.0..=8.0).text("scale"))
                    .changed()
                {
                    experiment.set_export_scale(scale);
                }
                if ui.button("Export PNG (E)").clicked() {
                    self.export_requested = true;
                }
                if let Some(path) = &self.last_export {
                    ui.small(path.as_str());
                }

                ui.separator();
                ui.small("F1: Toggle Panel | LMB: Orbit | Wheel: Zoom | Esc: Quit");
            });
    }
}

struct GpuApp {
    ui: UiState,
    setup: Option<ExperimentSetup>,
    window: Option<Arc<Window>>,
    backend: Option<WgpuBackend>,
    experiment: Option<Experiment>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
}

fn viewport_of(window: &Window) -> Viewport {
    let size = window.inner_size();
    Viewport::from_physical(Extent::new(size.width, size.height), window.scale_factor())
}

impl GpuApp {
    fn new(kind: ExperimentKind, setup: ExperimentSetup, export_dir: PathBuf) -> Self {
        Self {
            ui: UiState {
                kind,
                export_dir,
                show_panel: true,
                export_requested: false,
                dragging: false,
                last_frame: Instant::now(),
                last_export: None,
            },
            setup: Some(setup),
            window: None,
            backend: None,
            experiment: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let setup = self.setup.take().context("experiment already started")?;
        let attrs = Window::default_attributes()
            .with_title(format!("knotlab: {}", setup.name))
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = GpuContext::create_instance();
        let surface = instance.create_surface(window.clone())?;
        let ctx = GpuContext::new(instance, Some(&surface))?;
        let mut backend = WgpuBackend::new(ctx, Some(surface));

        let experiment = Experiment::new(setup, viewport_of(&window), &mut backend)?;

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(backend.device(), backend.screen_format(), None, 1, false);

        self.window = Some(window);
        self.backend = Some(backend);
        self.experiment = Some(experiment);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);
        self.ui.last_frame = Instant::now();
        Ok(())
    }

    fn resize(&mut self) {
        let (Some(window), Some(backend), Some(experiment)) =
            (&self.window, &mut self.backend, &mut self.experiment)
        else {
            return;
        };
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Err(e) = experiment.resize(backend, viewport_of(window)) {
            tracing::error!("resize failed: {e}");
        }
    }

    fn export(&mut self) {
        let (Some(backend), Some(experiment)) = (&mut self.backend, &mut self.experiment) else {
            return;
        };
        let capture = match experiment.export(backend) {
            Ok(capture) => capture,
            Err(e) => {
                tracing::error!("export failed: {e}");
                return;
            }
        };
        match export::save_png(&capture, &self.ui.export_dir, experiment.name()) {
            Ok(path) => {
                tracing::info!("exported {} to {}", capture.extent, path.display());
                self.ui.last_export = Some(path.display().to_string());
            }
            Err(e) => tracing::error!("failed to write PNG: {e}"),
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.ui.last_frame).as_secs_f32().min(0.1);
        self.ui.last_frame = now;

        if std::mem::take(&mut self.ui.export_requested) {
            self.export();
        }

        let (Some(window), Some(backend), Some(experiment), Some(egui_winit), Some(egui_renderer)) = (
            &self.window,
            &mut self.backend,
            &mut self.experiment,
            &mut self.egui_winit,
            &mut self.egui_renderer,
        ) else {
            return;
        };

        experiment.advance(dt);
        if let Err(e) = experiment.render_frame(backend) {
            tracing::warn!("frame dropped: {e}");
        }

        let raw_input = egui_winit.take_egui_input(window);
        let ui = &mut self.ui;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui.draw_ui(ctx, experiment);
        });
        egui_winit.handle_platform_output(window, full_output.platform_output);
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let textures_delta = full_output.textures_delta;
        let pixels_per_point = full_output.pixels_per_point;

        backend.present_with(|device, queue, view, extent| {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [extent.width, extent.height],
                pixels_per_point,
            };
            for (id, image_delta) in &textures_delta.set {
                egui_renderer.update_texture(device, queue, *id, image_delta);
            }
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
            egui_renderer.update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);
            {
                let mut pass = encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("egui_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    })
                    .forget_lifetime();
                egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
            }
            queue.submit(std::iter::once(encoder.finish()));
            for id in &textures_delta.free {
                egui_renderer.free_texture(id);
            }
        });

        window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            tracing::error!("failed to start: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
            let response = egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                if let (Some(backend), Some(experiment)) = (&mut self.backend, &mut self.experiment) {
                    experiment.release(backend);
                }
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.resize();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.ui.handle_key(key, event_loop);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: btn_state,
                ..
            } => {
                self.ui.dragging = btn_state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                if let Some(experiment) = &mut self.experiment {
                    experiment.camera_mut().zoom(amount);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.ui.dragging {
                if let Some(experiment) = &mut self.experiment {
                    experiment.camera_mut().rotate(delta.0 as f32, delta.1 as f32);
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("knotlab-desktop starting `{}`", cli.experiment);

    let mut setup = cli.experiment.setup()?;
    let mut export_dir = None;
    if let Some(path) = &cli.config {
        let config = ExperimentConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?;
        config.apply(&mut setup)?;
        export_dir = config.export_dir.clone();
    }
    let export_dir = cli
        .export_dir
        .or(export_dir)
        .unwrap_or_else(|| PathBuf::from("exports"));

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(cli.experiment, setup, export_dir);
    event_loop.run_app(&mut app)?;

    Ok(())
}
