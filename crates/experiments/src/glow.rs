use glam::{Vec3, Vec4};
use knotlab_render::{BloomSettings, ExperimentSetup, FramePlan, PostEffect};
use knotlab_scene::material::names;
use knotlab_scene::{Material, Scene, SceneError, SceneObject, ShaderKind};

pub fn setup() -> Result<ExperimentSetup, SceneError> {
    let material = Material::new(ShaderKind::FresnelGlow)
        .with_vec3(names::COLOR, Vec3::new(0.05, 0.06, 0.12))
        .with_vec3(names::GLOW_COLOR, Vec3::new(0.2, 0.75, 1.0))
        .with_float(names::GLOW_INTENSITY, 2.5)
        .with_float(names::FRESNEL_POWER, 3.0)
        .with_vec3(names::LIGHT, Vec3::new(-1.0, 1.0, 1.0))
        .with_float(names::DIFFUSENESS, 0.4);

    let mut scene = Scene::new().with_background(Vec4::new(0.01, 0.01, 0.02, 1.0));
    scene.add_subject(
        SceneObject::mesh("knot", super::knot(), material).spinning(super::KNOT_SPIN),
    )?;

    let bloom = BloomSettings {
        threshold: 0.35,
        strength: 1.6,
        radius: 1.5,
    };
    Ok(ExperimentSetup::new(
        "glow",
        scene,
        super::camera(),
        FramePlan::single_pass(vec![PostEffect::Bloom(bloom)]),
    ))
}
