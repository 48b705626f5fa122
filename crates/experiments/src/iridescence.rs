use glam::Vec4;
use knotlab_render::{ExperimentSetup, FramePlan};
use knotlab_scene::material::names;
use knotlab_scene::{Material, Scene, SceneError, SceneObject, ShaderKind};

pub fn setup() -> Result<ExperimentSetup, SceneError> {
    let material = Material::new(ShaderKind::Iridescence)
        .with_float(names::TIME, 0.0)
        .with_float(names::FRESNEL_POWER, 2.0)
        .with_float(names::BANDS, 3.0)
        .with_float(names::SPEED, 0.3);

    let mut scene = Scene::new().with_background(Vec4::new(0.02, 0.02, 0.03, 1.0));
    scene.add_subject(
        SceneObject::mesh("knot", super::knot(), material).spinning(super::KNOT_SPIN),
    )?;
    Ok(ExperimentSetup::new(
        "iridescence",
        scene,
        super::camera(),
        FramePlan::single_pass(vec![]),
    ))
}
