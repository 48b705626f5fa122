//! A running experiment: scene, camera, plan and the targets the plan needs.

use crate::backend::{Capture, Filter, FrameMode, RenderBackend};
use crate::error::{FrameError, RenderError};
use crate::frame::{PlanTargets, run_frame};
use crate::plan::FramePlan;
use crate::targets::TargetRegistry;
use glam::Vec2;
use knotlab_common::{Extent, Viewport};
use knotlab_scene::material::names;
use knotlab_scene::{OrbitCamera, Scene, UniformValue};

/// Drawing-buffer multiplier applied while exporting.
pub const DEFAULT_EXPORT_SCALE: f32 = 4.0;

/// Everything an experiment is built from, before any GPU storage exists.
#[derive(Debug, Clone)]
pub struct ExperimentSetup {
    pub name: &'static str,
    pub scene: Scene,
    pub camera: OrbitCamera,
    pub plan: FramePlan,
    pub export_scale: f32,
    pub target_filter: Filter,
}

impl ExperimentSetup {
    pub fn new(name: &'static str, scene: Scene, camera: OrbitCamera, plan: FramePlan) -> Self {
        Self {
            name,
            scene,
            camera,
            plan,
            export_scale: DEFAULT_EXPORT_SCALE,
            target_filter: Filter::Linear,
        }
    }

    /// Check the plan, the subject requirement and every mesh material.
    pub fn validate(&self) -> Result<(), RenderError> {
        self.plan.validate()?;
        if self.plan.samples_slots() && self.scene.subject().is_none() {
            return Err(RenderError::NoSubject);
        }
        for material in self.scene.objects().filter_map(|(_, object)| object.material()) {
            material.validate()?;
        }
        if !(self.export_scale.is_finite() && self.export_scale >= 1.0) {
            return Err(RenderError::Config(format!(
                "export scale must be at least 1, got {}",
                self.export_scale
            )));
        }
        Ok(())
    }
}

pub struct Experiment {
    name: &'static str,
    scene: Scene,
    camera: OrbitCamera,
    plan: FramePlan,
    registry: TargetRegistry,
    targets: PlanTargets,
    viewport: Viewport,
    canvas: Extent,
    elapsed: f32,
    export_scale: f32,
    frame_count: u64,
}

impl Experiment {
    /// Validate the setup, size the canvas for `viewport` and allocate the plan's targets.
    pub fn new<B: RenderBackend>(
        setup: ExperimentSetup,
        viewport: Viewport,
        backend: &mut B,
    ) -> Result<Self, FrameError<B::Error>> {
        setup.validate()?;
        let canvas = viewport.drawing_buffer();
        backend.resize_canvas(canvas).map_err(FrameError::Backend)?;

        let mut registry = TargetRegistry::new();
        let targets = PlanTargets::allocate(
            &setup.plan,
            &mut registry,
            backend,
            canvas,
            setup.target_filter,
        )
        .map_err(FrameError::Backend)?;

        let mut experiment = Self {
            name: setup.name,
            scene: setup.scene,
            camera: setup.camera,
            plan: setup.plan,
            registry,
            targets,
            viewport,
            canvas,
            elapsed: 0.0,
            export_scale: setup.export_scale,
            frame_count: 0,
        };
        experiment.camera.set_aspect(viewport.aspect());
        experiment.sync_resolution();
        tracing::info!(
            "experiment `{}` ready: {} passes, {} post effects, canvas {canvas}",
            experiment.name,
            experiment.plan.passes.len(),
            experiment.plan.post.len()
        );
        Ok(experiment)
    }

    /// Apply a host resize between frames.
    pub fn resize<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        viewport: Viewport,
    ) -> Result<(), B::Error> {
        let previous = self.canvas;
        if let Err(err) = self.apply_canvas(backend, viewport.drawing_buffer()) {
            if let Err(rollback) = self.apply_canvas(backend, previous) {
                tracing::warn!("could not restore canvas {previous}: {rollback}");
            }
            return Err(err);
        }
        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());
        tracing::debug!(
            "resized `{}` to {}x{} @ {} -> {}",
            self.name,
            viewport.width,
            viewport.height,
            viewport.pixel_ratio(),
            self.canvas
        );
        Ok(())
    }

    /// Step time, camera damping and object spin by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += dt;
        self.camera.update(dt);
        self.scene.animate(dt);
        let time = self.elapsed;
        for material in self.scene.materials_mut() {
            if material.has(names::TIME) {
                material.set(names::TIME, UniformValue::Float(time));
            }
        }
    }

    /// Render and present one frame.
    pub fn render_frame<B: RenderBackend>(
        &mut self,
        backend: &mut B,
    ) -> Result<(), FrameError<B::Error>> {
        self.run(backend, FrameMode::Present).map(|_| ())
    }

    /// Render one frame at the current canvas size and read it back.
    pub fn capture_frame<B: RenderBackend>(
        &mut self,
        backend: &mut B,
    ) -> Result<Capture, FrameError<B::Error>> {
        self.run(backend, FrameMode::Capture)?
            .ok_or(FrameError::Render(RenderError::NoCapture))
    }

    /// Size of an export on `backend`.
    ///
    /// The scaled canvas is shrunk, keeping its aspect, until it fits both the
    /// backend's largest texture and its largest capture readback.
    pub fn export_extent<B: RenderBackend>(&self, backend: &B) -> Extent {
        let scaled = self.canvas.scaled(self.export_scale);
        let max_dimension = backend.max_canvas_dimension();
        let mut extent = scaled;
        let largest = scaled.max_dimension();
        if largest > max_dimension {
            let shrink = max_dimension as f32 / largest as f32;
            extent = Extent::new(
                ((scaled.width as f32 * shrink).floor() as u32).min(max_dimension),
                ((scaled.height as f32 * shrink).floor() as u32).min(max_dimension),
            );
        }

        let max_bytes = backend.max_capture_bytes();
        loop {
            let bytes = backend.capture_bytes(extent);
            if bytes <= max_bytes || extent == Extent::new(1, 1) {
                break;
            }
            let shrink = (max_bytes as f64 / bytes as f64).sqrt();
            let next = Extent::new(
                (extent.width as f64 * shrink).floor() as u32,
                (extent.height as f64 * shrink).floor() as u32,
            );
            // Row padding can keep the estimate above budget; step down a pixel.
            extent = if next == extent {
                Extent::new(extent.width - 1, extent.height - 1)
            } else {
                next
            };
        }

        if extent != scaled {
            tracing::debug!("export {scaled} clamped to {extent}");
        }
        extent
    }

    /// Capture one frame at the export size, then put everything back.
    ///
    /// The canvas, targets, camera aspect and `uResolution` are restored even
    /// when the capture fails.
    pub fn export<B: RenderBackend>(
        &mut self,
        backend: &mut B,
    ) -> Result<Capture, FrameError<B::Error>> {
        let extent = self.export_extent(backend);
        let restore = self.canvas;
        tracing::info!("exporting `{}` at {extent}", self.name);

        let captured = self
            .apply_canvas(backend, extent)
            .map_err(FrameError::Backend)
            .and_then(|()| self.capture_frame(backend));

        let restored = self.apply_canvas(backend, restore);
        self.camera.set_aspect(self.viewport.aspect());
        let capture = captured?;
        restored.map_err(FrameError::Backend)?;
        Ok(capture)
    }

    fn run<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        mode: FrameMode,
    ) -> Result<Option<Capture>, FrameError<B::Error>> {
        let result = run_frame(
            backend,
            &mut self.scene,
            &self.camera,
            &self.plan,
            &self.targets,
            self.elapsed,
            mode,
        );
        match &result {
            Ok(_) => self.frame_count += 1,
            Err(err) => tracing::warn!("frame abandoned: {err}"),
        }
        result
    }

    fn apply_canvas<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        extent: Extent,
    ) -> Result<(), B::Error> {
        backend.resize_canvas(extent)?;
        self.registry.resize_all(backend, extent)?;
        self.canvas = extent;
        self.sync_resolution();
        Ok(())
    }

    fn sync_resolution(&mut self) {
        let size = Vec2::new(self.canvas.width as f32, self.canvas.height as f32);
        for material in self.scene.materials_mut() {
            if material.has(names::RESOLUTION) {
                material.set(names::RESOLUTION, UniformValue::Vec2(size));
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn plan(&self) -> &FramePlan {
        &self.plan
    }

    pub fn targets(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn plan_targets(&self) -> &PlanTargets {
        &self.targets
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn canvas(&self) -> Extent {
        self.canvas
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn export_scale(&self) -> f32 {
        self.export_scale
    }

    pub fn set_export_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale >= 1.0 {
            self.export_scale = scale;
        }
    }

    /// Destroy every offscreen target this experiment owns.
    pub fn release<B: RenderBackend>(&mut self, backend: &mut B) {
        self.registry.release_all(backend);
        self.targets = PlanTargets::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Output;
    use crate::post::{BloomSettings, GrainSettings, PostEffect};
    use crate::recording::RecordingBackend;
    use glam::Vec3;
    use knotlab_scene::{FaceSide, Material, SceneObject, ShaderKind, Shape, TorusKnot};

    fn refraction_material() -> Material {
        Material::new(ShaderKind::Refraction)
            .with(names::TEXTURE, UniformValue::Texture(None))
            .with(names::RESOLUTION, UniformValue::Vec2(Vec2::ONE))
            .with_float(names::IOR_R, 1.15)
            .with_float(names::IOR_G, 1.18)
            .with_float(names::IOR_B, 1.22)
            .with_float(names::REFRACT_POWER, 0.3)
            .with_float(names::CHROMATIC_ABERRATION, 0.5)
            .with_float(names::FRESNEL_POWER, 8.0)
            .with_float(names::SATURATION, 1.0)
            .with_float(names::SHININESS, 40.0)
            .with_vec3(names::LIGHT, Vec3::new(-1.0, 1.0, 1.0))
    }

    fn refraction_setup(post: Vec<PostEffect>) -> ExperimentSetup {
        let mut scene = Scene::new();
        scene.add(SceneObject::mesh(
            "backdrop",
            Shape::cuboid(3.0, 3.0, 3.0),
            Material::new(ShaderKind::Lambert).with_vec3(names::COLOR, Vec3::ONE),
        ));
        scene
            .add_subject(SceneObject::mesh(
                "knot",
                Shape::TorusKnot(TorusKnot::default()),
                refraction_material(),
            ))
            .unwrap();
        ExperimentSetup::new(
            "test-refraction",
            scene,
            OrbitCamera::default(),
            FramePlan::refraction(post),
        )
    }

    #[test]
    fn construction_sizes_everything_to_the_drawing_buffer() {
        let mut backend = RecordingBackend::new();
        let experiment = Experiment::new(
            refraction_setup(vec![]),
            Viewport::new(120.0, 80.0, 1.5),
            &mut backend,
        )
        .unwrap();
        assert_eq!(experiment.canvas(), Extent::new(180, 120));
        assert_eq!(backend.canvas(), Extent::new(180, 120));
        assert_eq!(experiment.targets().len(), 2);
        for desc in backend.live_targets().values() {
            assert_eq!(desc.extent, Extent::new(180, 120));
        }
        assert_eq!(
            experiment.scene().subject_material().unwrap().vec2(names::RESOLUTION),
            Some(Vec2::new(180.0, 120.0))
        );
        assert!((experiment.camera().aspect - 1.5).abs() < 1e-6);
    }

    #[test]
    fn missing_uniform_is_rejected_before_first_render() {
        let mut setup = refraction_setup(vec![]);
        let mut bare = Scene::new();
        bare.add_subject(SceneObject::mesh(
            "knot",
            Shape::TorusKnot(TorusKnot::default()),
            Material::new(ShaderKind::Refraction),
        ))
        .unwrap();
        setup.scene = bare;
        let mut backend = RecordingBackend::new();
        let result = Experiment::new(setup, Viewport::new(10.0, 10.0, 1.0), &mut backend);
        assert!(matches!(
            result,
            Err(FrameError::Render(RenderError::Scene(_)))
        ));
        assert!(backend.live_targets().is_empty());
    }

    #[test]
    fn resize_updates_aspect_targets_and_resolution() {
        let mut backend = RecordingBackend::new();
        let mut experiment = Experiment::new(
            refraction_setup(vec![PostEffect::Bloom(BloomSettings::default())]),
            Viewport::new(192.0, 108.0, 1.0),
            &mut backend,
        )
        .unwrap();
        experiment.render_frame(&mut backend).unwrap();

        experiment
            .resize(&mut backend, Viewport::new(80.0, 60.0, 3.0))
            .unwrap();
        assert!((experiment.camera().aspect - 80.0 / 60.0).abs() < 1e-6);
        let expected = Extent::new(160, 120);
        assert_eq!(experiment.canvas(), expected);
        for desc in backend.live_targets().values() {
            assert_eq!(desc.extent, expected);
        }
        assert_eq!(
            experiment.scene().subject_material().unwrap().vec2(names::RESOLUTION),
            Some(Vec2::new(160.0, 120.0))
        );
    }

    #[test]
    fn mid_session_resize_leaves_no_stale_targets() {
        let mut backend = RecordingBackend::new();
        let mut experiment = Experiment::new(
            refraction_setup(vec![
                PostEffect::Bloom(BloomSettings::default()),
                PostEffect::Grain(GrainSettings::default()),
            ]),
            Viewport::new(1920.0, 1080.0, 1.0),
            &mut backend,
        )
        .unwrap();
        experiment.advance(1.0 / 60.0);
        experiment.render_frame(&mut backend).unwrap();

        experiment
            .resize(&mut backend, Viewport::new(800.0, 600.0, 1.0))
            .unwrap();
        backend.take_commands();
        experiment.advance(1.0 / 60.0);
        experiment.render_frame(&mut backend).unwrap();

        assert_eq!(backend.frames_completed(), 2);
        assert!(
            backend
                .live_targets()
                .values()
                .all(|d| d.extent == Extent::new(800, 600))
        );
        for record in backend.scene_records() {
            assert_eq!(record.output_extent, Extent::new(800, 600));
        }
    }

    #[test]
    fn export_restores_state_and_repeats_identically() {
        let mut backend = RecordingBackend::new();
        let mut experiment = Experiment::new(
            refraction_setup(vec![]),
            Viewport::new(40.0, 30.0, 2.0),
            &mut backend,
        )
        .unwrap();
        let canvas = experiment.canvas();
        let aspect = experiment.camera().aspect;

        let first = experiment.export(&mut backend).unwrap();
        let second = experiment.export(&mut backend).unwrap();
        assert_eq!(first.extent, Extent::new(320, 240));
        assert_eq!(first.extent, second.extent);
        assert_eq!(first.pixels.len(), second.pixels.len());

        assert_eq!(experiment.canvas(), canvas);
        assert_eq!(backend.canvas(), canvas);
        assert_eq!(experiment.camera().aspect, aspect);
        assert!(backend.live_targets().values().all(|d| d.extent == canvas));
        assert_eq!(
            experiment.scene().subject_material().unwrap().vec2(names::RESOLUTION),
            Some(Vec2::new(80.0, 60.0))
        );
        experiment.render_frame(&mut backend).unwrap();
    }

    #[test]
    fn failed_export_still_restores() {
        let mut backend = RecordingBackend::new();
        let mut experiment = Experiment::new(
            refraction_setup(vec![]),
            Viewport::new(40.0, 30.0, 1.0),
            &mut backend,
        )
        .unwrap();
        backend.fail_next_draw();
        assert!(experiment.export(&mut backend).is_err());
        assert_eq!(backend.canvas(), Extent::new(40, 30));
        assert!(
            backend
                .live_targets()
                .values()
                .all(|d| d.extent == Extent::new(40, 30))
        );
        experiment.render_frame(&mut backend).unwrap();
    }

    #[test]
    fn export_is_clamped_to_backend_limit() {
        let mut backend = RecordingBackend::new().with_max_dimension(256);
        let mut experiment = Experiment::new(
            refraction_setup(vec![]),
            Viewport::new(200.0, 100.0, 1.0),
            &mut backend,
        )
        .unwrap();
        assert_eq!(experiment.export_extent(&backend), Extent::new(256, 128));
        let capture = experiment.export(&mut backend).unwrap();
        assert_eq!(capture.extent, Extent::new(256, 128));
        assert_eq!(experiment.canvas(), Extent::new(200, 100));
    }

    #[test]
    fn export_fits_the_capture_budget() {
        // Room for 200x100 at 4 bytes per pixel, a quarter of the 4x export.
        let budget = 200 * 100 * 4;
        let mut backend = RecordingBackend::new().with_max_capture_bytes(budget);
        let mut experiment = Experiment::new(
            refraction_setup(vec![]),
            Viewport::new(100.0, 50.0, 1.0),
            &mut backend,
        )
        .unwrap();

        let extent = experiment.export_extent(&backend);
        assert!(backend.capture_bytes(extent) <= budget);
        assert!(extent.width <= 200 && extent.width >= 190);
        assert!((extent.aspect() - 2.0).abs() < 0.05);

        let capture = experiment.export(&mut backend).unwrap();
        assert_eq!(capture.extent, extent);
        assert_eq!(experiment.canvas(), Extent::new(100, 50));
        assert_eq!(backend.frames_abandoned(), 0);
    }

    #[test]
    fn export_budget_accounts_for_row_padding() {
        struct Padded(RecordingBackend);

        impl RenderBackend for Padded {
            type Error = <RecordingBackend as RenderBackend>::Error;

            fn max_canvas_dimension(&self) -> u32 {
                self.0.max_canvas_dimension()
            }
            fn max_capture_bytes(&self) -> u64 {
                64 * 1024
            }
            fn capture_bytes(&self, extent: Extent) -> u64 {
                (extent.width as u64 * 4).div_ceil(256) * 256 * extent.height as u64
            }
            fn create_target(
                &mut self,
                handle: knotlab_common::TargetHandle,
                desc: &crate::backend::TargetDesc,
            ) -> Result<(), Self::Error> {
                self.0.create_target(handle, desc)
            }
            fn destroy_target(&mut self, handle: knotlab_common::TargetHandle) {
                self.0.destroy_target(handle)
            }
            fn resize_canvas(&mut self, extent: Extent) -> Result<(), Self::Error> {
                self.0.resize_canvas(extent)
            }
            fn begin_frame(&mut self, mode: FrameMode) -> Result<(), Self::Error> {
                self.0.begin_frame(mode)
            }
            fn draw_scene(
                &mut self,
                call: &crate::backend::ScenePassCall<'_>,
            ) -> Result<(), Self::Error> {
                self.0.draw_scene(call)
            }
            fn draw_post(
                &mut self,
                call: &crate::backend::PostPassCall<'_>,
            ) -> Result<(), Self::Error> {
                self.0.draw_post(call)
            }
            fn end_frame(&mut self) -> Result<Option<Capture>, Self::Error> {
                self.0.end_frame()
            }
            fn abandon_frame(&mut self) {
                self.0.abandon_frame()
            }
        }

        let mut backend = Padded(RecordingBackend::new());
        let experiment = Experiment::new(
            refraction_setup(vec![]),
            Viewport::new(97.0, 61.0, 1.0),
            &mut backend,
        )
        .unwrap();
        let extent = experiment.export_extent(&backend);
        assert!(backend.capture_bytes(extent) <= 64 * 1024);
        assert!(extent.width > 1 && extent.height > 1);
    }

    #[test]
    fn capture_over_budget_is_an_error_not_a_panic() {
        let mut backend = RecordingBackend::new().with_max_capture_bytes(16);
        let mut experiment = Experiment::new(
            refraction_setup(vec![]),
            Viewport::new(8.0, 8.0, 1.0),
            &mut backend,
        )
        .unwrap();
        assert!(experiment.capture_frame(&mut backend).is_err());
        assert_eq!(backend.frames_abandoned(), 1);
        experiment.render_frame(&mut backend).unwrap();
    }

    #[test]
    fn rejected_resize_keeps_previous_state() {
        let mut backend = RecordingBackend::new().with_max_dimension(512);
        let mut experiment = Experiment::new(
            refraction_setup(vec![PostEffect::Bloom(BloomSettings::default())]),
            Viewport::new(400.0, 300.0, 1.0),
            &mut backend,
        )
        .unwrap();

        assert!(
            experiment
                .resize(&mut backend, Viewport::new(1000.0, 100.0, 1.0))
                .is_err()
        );
        let canvas = Extent::new(400, 300);
        assert_eq!(experiment.canvas(), canvas);
        assert_eq!(backend.canvas(), canvas);
        assert_eq!(experiment.viewport(), Viewport::new(400.0, 300.0, 1.0));
        assert!((experiment.camera().aspect - canvas.aspect()).abs() < 1e-6);
        assert!(backend.live_targets().values().all(|d| d.extent == canvas));
        assert_eq!(
            experiment.scene().subject_material().unwrap().vec2(names::RESOLUTION),
            Some(Vec2::new(400.0, 300.0))
        );
        experiment.render_frame(&mut backend).unwrap();
    }

    #[test]
    fn hidden_meshes_are_validated_too() {
        let mut setup = refraction_setup(vec![]);
        let id = setup.scene.add(SceneObject::mesh(
            "stand-in",
            Shape::cuboid(1.0, 1.0, 1.0),
            Material::new(ShaderKind::Lambert),
        ));
        setup.scene.set_visible(id, false).unwrap();
        assert!(matches!(
            setup.validate(),
            Err(RenderError::Scene(knotlab_scene::SceneError::MissingUniform { .. }))
        ));
    }

    #[test]
    fn failed_frame_recovers_next_frame() {
        let mut backend = RecordingBackend::new();
        let mut experiment = Experiment::new(
            refraction_setup(vec![]),
            Viewport::new(32.0, 32.0, 1.0),
            &mut backend,
        )
        .unwrap();
        backend.fail_next_draw();
        assert!(experiment.render_frame(&mut backend).is_err());
        assert_eq!(experiment.frame_count(), 0);
        experiment.render_frame(&mut backend).unwrap();
        assert_eq!(experiment.frame_count(), 1);
        assert_eq!(backend.frames_abandoned(), 1);
    }

    #[test]
    fn advance_drives_time_uniforms() {
        let mut scene = Scene::new();
        scene
            .add_subject(SceneObject::mesh(
                "knot",
                Shape::TorusKnot(TorusKnot::default()),
                Material::new(ShaderKind::Iridescence)
                    .with_float(names::TIME, 0.0)
                    .with_float(names::FRESNEL_POWER, 2.0)
                    .with_float(names::BANDS, 3.0)
                    .with_float(names::SPEED, 1.0)
                    .with_side(FaceSide::Double),
            ))
            .unwrap();
        let setup = ExperimentSetup::new(
            "test-time",
            scene,
            OrbitCamera::default(),
            FramePlan::single_pass(vec![]),
        );
        let mut backend = RecordingBackend::new();
        let mut experiment =
            Experiment::new(setup, Viewport::new(16.0, 16.0, 1.0), &mut backend).unwrap();
        experiment.advance(0.5);
        experiment.advance(0.25);
        experiment.advance(f32::NAN);
        assert_eq!(experiment.elapsed(), 0.75);
        assert_eq!(
            experiment.scene().subject_material().unwrap().float(names::TIME),
            Some(0.75)
        );
        experiment.render_frame(&mut backend).unwrap();
        let record = backend.scene_records().next().unwrap();
        assert_eq!(record.output, Output::Screen);
    }

    #[test]
    fn release_destroys_all_targets() {
        let mut backend = RecordingBackend::new();
        let mut experiment = Experiment::new(
            refraction_setup(vec![PostEffect::Bloom(BloomSettings::default())]),
            Viewport::new(16.0, 16.0, 1.0),
            &mut backend,
        )
        .unwrap();
        assert_eq!(backend.live_targets().len(), 6);
        experiment.release(&mut backend);
        assert!(backend.live_targets().is_empty());
    }
}
