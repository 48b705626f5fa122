//! Optional JSON overrides applied to an experiment before it starts.

use crate::RenderError;
use crate::experiment::ExperimentSetup;
use crate::post::{BloomSettings, GrainSettings, PostEffect};
use glam::{Vec2, Vec3, Vec4};
use knotlab_scene::UniformValue;
use knotlab_scene::material::names;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A uniform override: a scalar or a 2 to 4 component vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Scalar(f32),
    Vector(Vec<f32>),
}

impl ConfigValue {
    fn to_uniform(&self, name: &str) -> Result<UniformValue, RenderError> {
        Ok(match self {
            ConfigValue::Scalar(v) => UniformValue::Float(*v),
            ConfigValue::Vector(v) => match v.as_slice() {
                [x, y] => UniformValue::Vec2(Vec2::new(*x, *y)),
                [x, y, z] => UniformValue::Vec3(Vec3::new(*x, *y, *z)),
                [x, y, z, w] => UniformValue::Vec4(Vec4::new(*x, *y, *z, *w)),
                _ => {
                    return Err(RenderError::Config(format!(
                        "`{name}` has {} components, expected 2 to 4",
                        v.len()
                    )));
                }
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub export_scale: Option<f32>,
    pub export_dir: Option<PathBuf>,
    /// Overrides for the subject material, keyed by uniform name.
    pub uniforms: BTreeMap<String, ConfigValue>,
    pub bloom: Option<BloomSettings>,
    pub grain: Option<GrainSettings>,
}

impl ExperimentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        tracing::debug!("loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply every override to `setup`, rejecting names the subject does not declare.
    ///
    /// Nothing is changed unless every override is valid.
    pub fn apply(&self, setup: &mut ExperimentSetup) -> Result<(), RenderError> {
        if let Some(scale) = self.export_scale {
            if !(scale.is_finite() && scale >= 1.0) {
                return Err(RenderError::Config(format!(
                    "export_scale must be at least 1, got {scale}"
                )));
            }
        }

        let material = if self.uniforms.is_empty() {
            None
        } else {
            let mut material = setup
                .scene
                .subject_material()
                .ok_or(RenderError::NoSubject)?
                .clone();
            for (name, value) in &self.uniforms {
                if !names::ALL.contains(&name.as_str()) {
                    return Err(RenderError::Config(format!("unknown uniform `{name}`")));
                }
                if name == names::TEXTURE || name == names::RESOLUTION || name == names::TIME {
                    return Err(RenderError::Config(format!(
                        "`{name}` is driven by the renderer"
                    )));
                }
                material.update(name, value.to_uniform(name)?)?;
            }
            Some(material)
        };

        if let Some(scale) = self.export_scale {
            setup.export_scale = scale;
        }
        if let (Some(material), Some(subject)) = (material, setup.scene.subject_material_mut()) {
            *subject = material;
        }

        for effect in &mut setup.plan.post {
            match effect {
                PostEffect::Bloom(settings) => {
                    if let Some(bloom) = self.bloom {
                        *settings = bloom;
                    }
                }
                PostEffect::Grain(settings) => {
                    if let Some(grain) = self.grain {
                        *settings = grain;
                    }
                }
            }
        }
        let has = |label: &str| setup.plan.post.iter().any(|e| e.label() == label);
        if self.bloom.is_some() && !has("bloom") {
            tracing::warn!("`{}` has no bloom pass; bloom settings ignored", setup.name);
        }
        if self.grain.is_some() && !has("grain") {
            tracing::warn!("`{}` has no grain pass; grain settings ignored", setup.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::FramePlan;
    use knotlab_scene::{
        Material, OrbitCamera, Scene, SceneError, SceneObject, ShaderKind, Shape, TorusKnot,
    };
    use std::io::Write;

    fn glow_setup() -> ExperimentSetup {
        let mut scene = Scene::new();
        scene
            .add_subject(SceneObject::mesh(
                "knot",
                Shape::TorusKnot(TorusKnot::default()),
                Material::new(ShaderKind::FresnelGlow)
                    .with_vec3(names::COLOR, Vec3::ZERO)
                    .with_vec3(names::GLOW_COLOR, Vec3::ONE)
                    .with_float(names::GLOW_INTENSITY, 1.0)
                    .with_float(names::FRESNEL_POWER, 3.0)
                    .with_vec3(names::LIGHT, Vec3::ONE)
                    .with_float(names::DIFFUSENESS, 0.5),
            ))
            .unwrap();
        ExperimentSetup::new(
            "glow",
            scene,
            OrbitCamera::default(),
            FramePlan::single_pass(vec![PostEffect::Bloom(BloomSettings::default())]),
        )
    }

    #[test]
    fn overrides_apply_to_subject_and_bloom() {
        let config = ExperimentConfig::from_json(
            r#"{
                "export_scale": 2.0,
                "uniforms": { "uGlowIntensity": 3.5, "uGlowColor": [1.0, 0.5, 0.0] },
                "bloom": { "strength": 0.4 }
            }"#,
        )
        .unwrap();
        let mut setup = glow_setup();
        config.apply(&mut setup).unwrap();

        let material = setup.scene.subject_material().unwrap();
        assert_eq!(material.float(names::GLOW_INTENSITY), Some(3.5));
        assert_eq!(material.vec3(names::GLOW_COLOR), Some(Vec3::new(1.0, 0.5, 0.0)));
        assert_eq!(setup.export_scale, 2.0);
        match setup.plan.post[0] {
            PostEffect::Bloom(b) => {
                assert_eq!(b.strength, 0.4);
                assert_eq!(b.threshold, BloomSettings::default().threshold);
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let config = ExperimentConfig::from_json(r#"{ "uniforms": { "uWobble": 1.0 } }"#).unwrap();
        assert!(matches!(
            config.apply(&mut glow_setup()),
            Err(RenderError::Config(_))
        ));

        let config = ExperimentConfig::from_json(r#"{ "uniforms": { "uIorR": 1.2 } }"#).unwrap();
        assert!(matches!(
            config.apply(&mut glow_setup()),
            Err(RenderError::Scene(SceneError::UnknownUniform(_)))
        ));

        assert!(ExperimentConfig::from_json(r#"{ "exportScale": 2 }"#).is_err());
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let config =
            ExperimentConfig::from_json(r#"{ "uniforms": { "uGlowIntensity": [1.0, 2.0] } }"#)
                .unwrap();
        assert!(matches!(
            config.apply(&mut glow_setup()),
            Err(RenderError::Scene(SceneError::UniformType { .. }))
        ));

        let config =
            ExperimentConfig::from_json(r#"{ "uniforms": { "uColor": [1.0, 2.0, 3.0, 4.0, 5.0] } }"#)
                .unwrap();
        assert!(matches!(
            config.apply(&mut glow_setup()),
            Err(RenderError::Config(_))
        ));
    }

    #[test]
    fn renderer_driven_uniforms_and_bad_scale_are_rejected() {
        let config = ExperimentConfig::from_json(r#"{ "uniforms": { "uTime": 1.0 } }"#).unwrap();
        assert!(config.apply(&mut glow_setup()).is_err());

        let config = ExperimentConfig::from_json(r#"{ "export_scale": 0.5 }"#).unwrap();
        assert!(config.apply(&mut glow_setup()).is_err());
    }

    #[test]
    fn rejected_config_leaves_setup_untouched() {
        let fresh = glow_setup();
        for json in [
            r#"{ "export_scale": 3.0, "uniforms": { "uGlowIntensity": 9.0, "uWobble": 1.0 } }"#,
            r#"{ "bloom": { "strength": 0.1 }, "uniforms": { "uGlowIntensity": 9.0, "uLight": [1.0, 2.0] } }"#,
            r#"{ "uniforms": { "uColor": [1.0, 1.0, 1.0], "uTime": 2.0 } }"#,
        ] {
            let config = ExperimentConfig::from_json(json).unwrap();
            let mut setup = glow_setup();
            assert!(config.apply(&mut setup).is_err(), "{json}");
            assert_eq!(setup.export_scale, fresh.export_scale);
            assert_eq!(setup.scene.subject_material(), fresh.scene.subject_material());
            assert_eq!(setup.plan.post, fresh.plan.post);
        }
    }

    #[test]
    fn load_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, r#"{{ "export_dir": "shots", "grain": {{ "intensity": 0.2 }} }}"#).unwrap();
        let config = ExperimentConfig::load(tmp.path()).unwrap();
        assert_eq!(config.export_dir, Some(PathBuf::from("shots")));
        assert_eq!(config.grain.unwrap().intensity, 0.2);
        assert_eq!(config.grain.unwrap().flicker, GrainSettings::default().flicker);
    }
}
