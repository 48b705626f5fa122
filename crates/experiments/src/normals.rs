use glam::{Vec3, Vec4};
use knotlab_render::{ExperimentSetup, FramePlan};
use knotlab_scene::material::names;
use knotlab_scene::{Material, Scene, SceneError, SceneObject, ShaderKind};

pub fn setup() -> Result<ExperimentSetup, SceneError> {
    // uColor tints the gradient; white leaves the raw normals.
    let material = Material::new(ShaderKind::NormalGradient)
        .with_float(names::TIME, 0.0)
        .with_vec3(names::COLOR, Vec3::ONE)
        .with_float(names::SATURATION, 1.2);

    let mut scene = Scene::new().with_background(Vec4::new(0.9, 0.9, 0.92, 1.0));
    scene.add_subject(
        SceneObject::mesh("knot", super::knot(), material).spinning(super::KNOT_SPIN * 2.0),
    )?;
    Ok(ExperimentSetup::new(
        "normals",
        scene,
        super::camera(),
        FramePlan::single_pass(vec![]),
    ))
}
