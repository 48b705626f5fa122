//! The two multi-pass experiments. Both refract the same backdrop; dispersion
//! spreads the channels further apart and runs a post chain.

use glam::{Vec2, Vec3, Vec4};
use knotlab_common::Transform;
use knotlab_render::{
    BloomSettings, ExperimentSetup, FramePlan, GrainSettings, PostEffect,
};
use knotlab_scene::material::names;
use knotlab_scene::{
    Material, PointLight, Scene, SceneError, SceneObject, ShaderKind, Shape, UniformValue,
};

/// Per-channel indices of refraction plus how far the channels are pulled apart.
struct Optics {
    ior: Vec3,
    refract_power: f32,
    chromatic_aberration: f32,
    saturation: f32,
}

fn glass(optics: &Optics) -> Material {
    Material::new(ShaderKind::Refraction)
        .with(names::TEXTURE, UniformValue::Texture(None))
        .with(names::RESOLUTION, UniformValue::Vec2(Vec2::ONE))
        .with_float(names::IOR_R, optics.ior.x)
        .with_float(names::IOR_G, optics.ior.y)
        .with_float(names::IOR_B, optics.ior.z)
        .with_float(names::REFRACT_POWER, optics.refract_power)
        .with_float(names::CHROMATIC_ABERRATION, optics.chromatic_aberration)
        .with_float(names::FRESNEL_POWER, 8.0)
        .with_float(names::SATURATION, optics.saturation)
        .with_float(names::SHININESS, 40.0)
        .with_vec3(names::LIGHT, Vec3::new(-1.0, 1.0, 1.0))
}

fn lambert(color: Vec3) -> Material {
    Material::new(ShaderKind::Lambert).with_vec3(names::COLOR, color)
}

/// Coloured shapes behind the knot, lit by two marked point lights.
fn backdrop(scene: &mut Scene) {
    let shapes = [
        (
            "box-left",
            Shape::cuboid(1.2, 1.2, 1.2),
            Vec3::new(-2.2, 0.8, -3.0),
            Vec3::new(0.95, 0.35, 0.2),
        ),
        (
            "box-right",
            Shape::cuboid(0.9, 2.0, 0.9),
            Vec3::new(2.4, -0.6, -3.5),
            Vec3::new(0.2, 0.55, 0.95),
        ),
        (
            "sphere-top",
            Shape::sphere(0.8),
            Vec3::new(0.6, 1.9, -4.0),
            Vec3::new(0.95, 0.85, 0.25),
        ),
        (
            "sphere-bottom",
            Shape::sphere(1.1),
            Vec3::new(-0.8, -1.8, -4.5),
            Vec3::new(0.3, 0.9, 0.45),
        ),
    ];
    for (i, (name, shape, position, color)) in shapes.into_iter().enumerate() {
        let spin = if i % 2 == 0 {
            Vec3::new(0.3, 0.5, 0.0)
        } else {
            Vec3::new(-0.2, 0.0, 0.4)
        };
        scene.add(
            SceneObject::mesh(name, shape, lambert(color))
                .at(Transform::from_position(position))
                .spinning(spin),
        );
    }

    let lights = [
        ("light-warm", Vec3::new(3.0, 3.0, 2.0), Vec3::new(1.0, 0.8, 0.6)),
        ("light-cool", Vec3::new(-3.0, -2.0, 1.0), Vec3::new(0.5, 0.7, 1.0)),
    ];
    for (name, position, color) in lights {
        scene.add(SceneObject::light(
            name,
            PointLight {
                color,
                intensity: 1.5,
            },
            position,
        ));
        let marker = Material::new(ShaderKind::Emissive)
            .with_vec3(names::COLOR, color)
            .with_float(names::GLOW_INTENSITY, 2.0);
        scene.add(
            SceneObject::mesh(format!("{name}-marker"), Shape::sphere(0.08), marker)
                .at(Transform::from_position(position)),
        );
    }
}

fn scene(optics: &Optics) -> Result<Scene, SceneError> {
    let mut scene = Scene::new().with_background(Vec4::new(0.05, 0.05, 0.07, 1.0));
    backdrop(&mut scene);
    scene.add_subject(
        SceneObject::mesh("knot", super::knot(), glass(optics)).spinning(super::KNOT_SPIN),
    )?;
    Ok(scene)
}

pub fn refraction() -> Result<ExperimentSetup, SceneError> {
    let optics = Optics {
        ior: Vec3::new(1.15, 1.18, 1.22),
        refract_power: 0.3,
        chromatic_aberration: 0.2,
        saturation: 1.0,
    };
    Ok(ExperimentSetup::new(
        "refraction",
        scene(&optics)?,
        super::camera(),
        FramePlan::refraction(vec![]),
    ))
}

pub fn dispersion() -> Result<ExperimentSetup, SceneError> {
    let optics = Optics {
        ior: Vec3::new(1.12, 1.2, 1.3),
        refract_power: 0.4,
        chromatic_aberration: 0.8,
        saturation: 1.15,
    };
    let post = vec![
        PostEffect::Bloom(BloomSettings {
            threshold: 0.7,
            strength: 0.9,
            radius: 1.0,
        }),
        PostEffect::Grain(GrainSettings::default()),
    ];
    Ok(ExperimentSetup::new(
        "dispersion",
        scene(&optics)?,
        super::camera(),
        FramePlan::refraction(post),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_light_has_a_marker_at_its_position() {
        let setup = refraction().unwrap();
        let lights: Vec<Vec3> = setup.scene.lights().map(|(p, _)| p).collect();
        assert_eq!(lights.len(), 2);
        for position in lights {
            let marker = setup.scene.visible_meshes().find(|(_, object, _, material)| {
                material.shader() == ShaderKind::Emissive
                    && object.transform.position == position
            });
            assert!(marker.is_some(), "no marker at {position}");
        }
    }

    #[test]
    fn dispersion_spreads_channels_wider_than_refraction() {
        let spread = |setup: ExperimentSetup| {
            let material = setup.scene.subject_material().unwrap().clone();
            material.float(names::IOR_B).unwrap() - material.float(names::IOR_R).unwrap()
        };
        assert!(spread(dispersion().unwrap()) > spread(refraction().unwrap()));
    }

    #[test]
    fn backdrop_sits_behind_the_knot() {
        let setup = refraction().unwrap();
        let subject = setup.scene.subject().unwrap();
        for (id, object, _, material) in setup.scene.visible_meshes() {
            if id == subject || material.shader() == ShaderKind::Emissive {
                continue;
            }
            assert!(object.transform.position.z < -2.0, "{}", object.name);
        }
    }
}
