//! Execution of one frame plan against a backend.

use crate::backend::{
    Capture, Filter, FrameMode, Output, PostPassCall, RenderBackend, ScenePassCall,
};
use crate::error::{FrameError, RenderError};
use crate::plan::{FramePlan, PassOutput, Slot};
use crate::targets::TargetRegistry;
use knotlab_common::{Extent, TargetHandle};
use knotlab_scene::material::names;
use knotlab_scene::{OrbitCamera, Scene};
use std::collections::BTreeMap;

/// Offscreen targets bound to the buffers a plan reads and writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanTargets {
    pub slots: BTreeMap<Slot, TargetHandle>,
    /// Ping-pong pair feeding the post chain; present iff the chain is non-empty.
    pub composer: Option<[TargetHandle; 2]>,
    /// Scratch targets per post effect, in chain order.
    pub scratch: Vec<Vec<TargetHandle>>,
}

impl PlanTargets {
    pub fn allocate<B: RenderBackend>(
        plan: &FramePlan,
        registry: &mut TargetRegistry,
        backend: &mut B,
        extent: Extent,
        filter: Filter,
    ) -> Result<Self, B::Error> {
        let mut bound = Self::default();
        for slot in plan.slots() {
            bound
                .slots
                .insert(slot, registry.allocate(backend, extent, filter)?);
        }
        if !plan.post.is_empty() {
            bound.composer = Some([
                registry.allocate(backend, extent, filter)?,
                registry.allocate(backend, extent, filter)?,
            ]);
            for effect in &plan.post {
                let scratch = (0..effect.scratch_targets())
                    .map(|_| registry.allocate(backend, extent, filter))
                    .collect::<Result<Vec<_>, _>>()?;
                bound.scratch.push(scratch);
            }
        }
        Ok(bound)
    }

    pub fn slot(&self, slot: Slot) -> Result<TargetHandle, RenderError> {
        self.slots
            .get(&slot)
            .copied()
            .ok_or(RenderError::UnboundSlot(slot))
    }

    /// Where the last scene pass renders: the screen, or the post chain's input.
    pub fn final_output(&self) -> Output {
        match self.composer {
            Some([input, _]) => Output::Target(input),
            None => Output::Screen,
        }
    }

    fn resolve(&self, output: PassOutput) -> Result<Output, RenderError> {
        match output {
            PassOutput::Slot(slot) => Ok(Output::Target(self.slot(slot)?)),
            PassOutput::Final => Ok(self.final_output()),
        }
    }
}

/// Render one frame: every scene pass in order, then the post chain.
///
/// On any failure the backend is told to abandon the frame and the error is
/// returned; whatever scene state the completed passes left behind is kept.
pub fn run_frame<B: RenderBackend>(
    backend: &mut B,
    scene: &mut Scene,
    camera: &OrbitCamera,
    plan: &FramePlan,
    targets: &PlanTargets,
    time: f32,
    mode: FrameMode,
) -> Result<Option<Capture>, FrameError<B::Error>> {
    backend.begin_frame(mode).map_err(FrameError::Backend)?;
    if let Err(err) = execute(backend, scene, camera, plan, targets, time) {
        backend.abandon_frame();
        return Err(err);
    }
    backend.end_frame().map_err(|err| {
        backend.abandon_frame();
        FrameError::Backend(err)
    })
}

fn execute<B: RenderBackend>(
    backend: &mut B,
    scene: &mut Scene,
    camera: &OrbitCamera,
    plan: &FramePlan,
    targets: &PlanTargets,
    time: f32,
) -> Result<(), FrameError<B::Error>> {
    let subject = scene.subject();
    for pass in &plan.passes {
        match subject {
            Some(id) => {
                scene
                    .set_visible(id, pass.subject_visible)
                    .map_err(RenderError::from)?;
                if let Some(material) = scene.subject_material_mut() {
                    if let Some(side) = pass.subject_side {
                        material.set_side(side);
                    }
                    if material.shader().samples_texture() {
                        let source = pass.source.map(|s| targets.slot(s)).transpose()?;
                        material.bind_texture(names::TEXTURE, source);
                    }
                }
            }
            None if pass.source.is_some() => return Err(RenderError::NoSubject.into()),
            None => {}
        }

        let output = targets.resolve(pass.output)?;
        tracing::trace!("pass `{}` -> {output}", pass.label);
        backend
            .draw_scene(&ScenePassCall {
                label: pass.label,
                scene,
                camera,
                output,
                time,
            })
            .map_err(FrameError::Backend)?;
    }

    let Some([first, second]) = targets.composer else {
        return Ok(());
    };
    let (mut input, mut spare) = (first, second);
    for (i, effect) in plan.post.iter().enumerate() {
        let output = if i + 1 == plan.post.len() {
            Output::Screen
        } else {
            Output::Target(spare)
        };
        let scratch = targets.scratch.get(i).map(Vec::as_slice).unwrap_or(&[]);
        backend
            .draw_post(&PostPassCall {
                label: effect.label(),
                effect,
                input,
                scratch,
                output,
                time,
            })
            .map_err(FrameError::Backend)?;
        std::mem::swap(&mut input, &mut spare);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{BloomSettings, GrainSettings, PostEffect};
    use crate::recording::{Command, RecordingBackend};
    use knotlab_scene::{FaceSide, Material, SceneObject, Shape, ShaderKind, TorusKnot};

    fn refraction_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add(SceneObject::mesh(
            "wall",
            Shape::cuboid(4.0, 4.0, 0.1),
            Material::new(ShaderKind::Lambert),
        ));
        scene
            .add_subject(SceneObject::mesh(
                "knot",
                Shape::TorusKnot(TorusKnot::default()),
                Material::new(ShaderKind::Refraction),
            ))
            .unwrap();
        scene
    }

    fn setup(plan: &FramePlan) -> (RecordingBackend, PlanTargets) {
        let mut backend = RecordingBackend::new();
        let extent = Extent::new(64, 48);
        backend.resize_canvas(extent).unwrap();
        let mut registry = TargetRegistry::new();
        let targets =
            PlanTargets::allocate(plan, &mut registry, &mut backend, extent, Filter::Linear)
                .unwrap();
        (backend, targets)
    }

    #[test]
    fn refraction_sequence_order() {
        let plan = FramePlan::refraction(vec![]);
        let (mut backend, targets) = setup(&plan);
        let mut scene = refraction_scene();
        let camera = OrbitCamera::default();
        run_frame(&mut backend, &mut scene, &camera, &plan, &targets, 0.0, FrameMode::Present)
            .unwrap();

        let back = targets.slot(Slot::Back).unwrap();
        let main = targets.slot(Slot::Main).unwrap();
        let records: Vec<_> = backend.scene_records().cloned().collect();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].output, Output::Target(back));
        assert_eq!(records[0].subject_visible, Some(false));
        assert_eq!(records[0].visible_meshes, 1);

        assert_eq!(records[1].output, Output::Target(main));
        assert_eq!(records[1].subject_visible, Some(true));
        assert_eq!(records[1].subject_side, Some(FaceSide::Back));
        assert_eq!(records[1].subject_texture, Some(back));

        assert_eq!(records[2].output, Output::Screen);
        assert_eq!(records[2].subject_side, Some(FaceSide::Front));
        assert_eq!(records[2].subject_texture, Some(main));
        assert_ne!(records[2].subject_texture, Some(back));
        assert_eq!(backend.frames_completed(), 1);
    }

    #[test]
    fn final_texture_is_previous_output_every_frame() {
        let plan = FramePlan::refraction(vec![]);
        let (mut backend, targets) = setup(&plan);
        let mut scene = refraction_scene();
        let camera = OrbitCamera::default();
        for frame in 0..5 {
            run_frame(
                &mut backend,
                &mut scene,
                &camera,
                &plan,
                &targets,
                frame as f32,
                FrameMode::Present,
            )
            .unwrap();
        }
        let records: Vec<_> = backend.scene_records().cloned().collect();
        for window in records.windows(2) {
            if let Some(texture) = window[1].subject_texture {
                assert_eq!(window[0].output, Output::Target(texture));
            }
        }
        for frame in records.chunks(3) {
            assert_eq!(frame[1].subject_side, Some(FaceSide::Back));
            assert_eq!(frame[2].subject_side, Some(FaceSide::Front));
            assert_eq!(frame[0].subject_visible, Some(false));
        }
    }

    #[test]
    fn post_chain_ping_pongs_to_screen() {
        let plan = FramePlan::refraction(vec![
            PostEffect::Bloom(BloomSettings::default()),
            PostEffect::Grain(GrainSettings::default()),
        ]);
        let (mut backend, targets) = setup(&plan);
        let mut scene = refraction_scene();
        run_frame(
            &mut backend,
            &mut scene,
            &OrbitCamera::default(),
            &plan,
            &targets,
            0.0,
            FrameMode::Present,
        )
        .unwrap();

        let [a, b] = targets.composer.unwrap();
        let last_scene = backend.scene_records().last().unwrap().clone();
        assert_eq!(last_scene.output, Output::Target(a));

        let posts: Vec<_> = backend.post_records().cloned().collect();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].input, a);
        assert_eq!(posts[0].output, Output::Target(b));
        assert_eq!(posts[0].scratch.len(), 2);
        assert_eq!(posts[1].input, b);
        assert_eq!(posts[1].output, Output::Screen);
    }

    #[test]
    fn single_pass_goes_straight_to_screen() {
        let plan = FramePlan::single_pass(vec![]);
        let (mut backend, targets) = setup(&plan);
        assert!(targets.slots.is_empty());
        assert!(targets.composer.is_none());
        let mut scene = Scene::new();
        scene
            .add_subject(SceneObject::mesh(
                "knot",
                Shape::TorusKnot(TorusKnot::default()),
                Material::new(ShaderKind::NormalGradient).with_side(FaceSide::Double),
            ))
            .unwrap();
        run_frame(
            &mut backend,
            &mut scene,
            &OrbitCamera::default(),
            &plan,
            &targets,
            0.0,
            FrameMode::Present,
        )
        .unwrap();
        let records: Vec<_> = backend.scene_records().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].output, Output::Screen);
        assert_eq!(records[0].subject_side, Some(FaceSide::Double));
    }

    #[test]
    fn failed_draw_abandons_and_next_frame_restarts() {
        let plan = FramePlan::refraction(vec![]);
        let (mut backend, targets) = setup(&plan);
        let mut scene = refraction_scene();
        let camera = OrbitCamera::default();

        backend.fail_next_draw();
        let err = run_frame(&mut backend, &mut scene, &camera, &plan, &targets, 0.0, FrameMode::Present)
            .unwrap_err();
        assert!(matches!(err, FrameError::Backend(_)));
        assert_eq!(backend.frames_abandoned(), 1);
        assert_eq!(backend.commands().last(), Some(&Command::AbandonFrame));

        backend.take_commands();
        run_frame(&mut backend, &mut scene, &camera, &plan, &targets, 0.0, FrameMode::Present)
            .unwrap();
        let labels: Vec<_> = backend.scene_records().map(|r| r.label.clone()).collect();
        assert_eq!(labels, vec!["background", "back-faces", "front-faces"]);
    }

    #[test]
    fn sampling_without_subject_fails() {
        let plan = FramePlan::refraction(vec![]);
        let (mut backend, targets) = setup(&plan);
        let mut scene = Scene::new();
        let err = run_frame(
            &mut backend,
            &mut scene,
            &OrbitCamera::default(),
            &plan,
            &targets,
            0.0,
            FrameMode::Present,
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::Render(RenderError::NoSubject)));
        assert_eq!(backend.frames_abandoned(), 1);
    }

    #[test]
    fn capture_mode_returns_pixels() {
        let plan = FramePlan::single_pass(vec![]);
        let (mut backend, targets) = setup(&plan);
        let mut scene = refraction_scene();
        let capture = run_frame(
            &mut backend,
            &mut scene,
            &OrbitCamera::default(),
            &plan,
            &targets,
            0.0,
            FrameMode::Capture,
        )
        .unwrap()
        .unwrap();
        assert_eq!(capture.extent, Extent::new(64, 48));
        assert_eq!(capture.pixels.len(), 64 * 48 * 4);
    }
}
