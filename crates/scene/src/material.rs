//! Shader materials and their named uniform slots.

use crate::SceneError;
use glam::{Vec2, Vec3, Vec4};
use knotlab_common::TargetHandle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known uniform names.
pub mod names {
    pub const TEXTURE: &str = "uTexture";
    pub const RESOLUTION: &str = "uResolution";
    pub const TIME: &str = "uTime";
    pub const COLOR: &str = "uColor";
    pub const GLOW_COLOR: &str = "uGlowColor";
    pub const GLOW_INTENSITY: &str = "uGlowIntensity";
    pub const IOR_R: &str = "uIorR";
    pub const IOR_G: &str = "uIorG";
    pub const IOR_B: &str = "uIorB";
    pub const REFRACT_POWER: &str = "uRefractPower";
    pub const CHROMATIC_ABERRATION: &str = "uChromaticAberration";
    pub const FRESNEL_POWER: &str = "uFresnelPower";
    pub const SATURATION: &str = "uSaturation";
    pub const SHININESS: &str = "uShininess";
    pub const LIGHT: &str = "uLight";
    pub const DIFFUSENESS: &str = "uDiffuseness";
    pub const BANDS: &str = "uBands";
    pub const SPEED: &str = "uSpeed";

    /// Every name a shader kind may declare.
    pub const ALL: &[&str] = &[
        TEXTURE,
        RESOLUTION,
        TIME,
        COLOR,
        GLOW_COLOR,
        GLOW_INTENSITY,
        IOR_R,
        IOR_G,
        IOR_B,
        REFRACT_POWER,
        CHROMATIC_ABERRATION,
        FRESNEL_POWER,
        SATURATION,
        SHININESS,
        LIGHT,
        DIFFUSENESS,
        BANDS,
        SPEED,
    ];
}

/// Which triangle faces a mesh rasterizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceSide {
    Front,
    Back,
    Double,
}

impl std::fmt::Display for FaceSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FaceSide::Front => "front",
            FaceSide::Back => "back",
            FaceSide::Double => "double",
        };
        f.write_str(s)
    }
}

/// The shader programs available to materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShaderKind {
    /// Screen-space refraction of the previous pass, one IOR per colour channel.
    Refraction,
    /// Lit base colour with a fresnel edge glow.
    FresnelGlow,
    /// View-angle driven cosine palette.
    Iridescence,
    /// World normal mapped to colour.
    NormalGradient,
    /// Diffuse shading from the scene's point lights.
    Lambert,
    /// Flat unlit colour, used for light markers.
    Emissive,
}

impl ShaderKind {
    /// Uniforms that must be set before the first render.
    pub fn required_uniforms(&self) -> &'static [&'static str] {
        use names::*;
        match self {
            ShaderKind::Refraction => &[
                TEXTURE,
                RESOLUTION,
                IOR_R,
                IOR_G,
                IOR_B,
                REFRACT_POWER,
                CHROMATIC_ABERRATION,
                FRESNEL_POWER,
                SATURATION,
                SHININESS,
                LIGHT,
            ],
            ShaderKind::FresnelGlow => &[
                COLOR,
                GLOW_COLOR,
                GLOW_INTENSITY,
                FRESNEL_POWER,
                LIGHT,
                DIFFUSENESS,
            ],
            ShaderKind::Iridescence => &[TIME, FRESNEL_POWER, BANDS, SPEED],
            ShaderKind::NormalGradient => &[TIME, COLOR, SATURATION],
            ShaderKind::Lambert => &[COLOR],
            ShaderKind::Emissive => &[COLOR, GLOW_INTENSITY],
        }
    }

    /// Whether the program reads the texture uniform.
    pub fn samples_texture(&self) -> bool {
        matches!(self, ShaderKind::Refraction)
    }
}

/// A uniform value. Texture values point at an offscreen target, or nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Texture(Option<TargetHandle>),
}

impl UniformValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Texture(_) => "texture",
        }
    }
}

impl std::fmt::Display for UniformValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniformValue::Float(v) => write!(f, "{v:.3}"),
            UniformValue::Vec2(v) => write!(f, "({:.3}, {:.3})", v.x, v.y),
            UniformValue::Vec3(v) => write!(f, "({:.3}, {:.3}, {:.3})", v.x, v.y, v.z),
            UniformValue::Vec4(v) => {
                write!(f, "({:.3}, {:.3}, {:.3}, {:.3})", v.x, v.y, v.z, v.w)
            }
            UniformValue::Texture(Some(h)) => write!(f, "{h}"),
            UniformValue::Texture(None) => f.write_str("none"),
        }
    }
}

/// A shader program plus its named uniform slots and rasterization side.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    shader: ShaderKind,
    side: FaceSide,
    uniforms: BTreeMap<String, UniformValue>,
}

impl Material {
    pub fn new(shader: ShaderKind) -> Self {
        Self {
            shader,
            side: FaceSide::Front,
            uniforms: BTreeMap::new(),
        }
    }

    /// Builder-style uniform assignment.
    pub fn with(mut self, name: &str, value: UniformValue) -> Self {
        self.uniforms.insert(name.to_string(), value);
        self
    }

    pub fn with_float(self, name: &str, value: f32) -> Self {
        self.with(name, UniformValue::Float(value))
    }

    pub fn with_vec3(self, name: &str, value: Vec3) -> Self {
        self.with(name, UniformValue::Vec3(value))
    }

    pub fn with_side(mut self, side: FaceSide) -> Self {
        self.side = side;
        self
    }

    pub fn shader(&self) -> ShaderKind {
        self.shader
    }

    pub fn side(&self) -> FaceSide {
        self.side
    }

    pub fn set_side(&mut self, side: FaceSide) {
        self.side = side;
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Set a uniform, returning the previous value.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Option<UniformValue> {
        self.uniforms.insert(name.to_string(), value)
    }

    /// Replace an existing uniform, keeping its type.
    pub fn update(&mut self, name: &str, value: UniformValue) -> Result<(), SceneError> {
        let slot = self
            .uniforms
            .get_mut(name)
            .ok_or_else(|| SceneError::UnknownUniform(name.to_string()))?;
        if std::mem::discriminant(slot) != std::mem::discriminant(&value) {
            return Err(SceneError::UniformType {
                name: name.to_string(),
                expected: slot.type_name(),
                actual: value.type_name(),
            });
        }
        *slot = value;
        Ok(())
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.uniforms.get(name) {
            Some(UniformValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn vec2(&self, name: &str) -> Option<Vec2> {
        match self.uniforms.get(name) {
            Some(UniformValue::Vec2(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.uniforms.get(name) {
            Some(UniformValue::Vec3(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<TargetHandle> {
        match self.uniforms.get(name) {
            Some(UniformValue::Texture(h)) => *h,
            _ => None,
        }
    }

    /// Point the texture uniform at `handle` (or at nothing).
    pub fn bind_texture(&mut self, name: &str, handle: Option<TargetHandle>) {
        self.uniforms
            .insert(name.to_string(), UniformValue::Texture(handle));
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.uniforms.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Mutable access to every float uniform, for tweaking panels.
    pub fn floats_mut(&mut self) -> impl Iterator<Item = (&str, &mut f32)> {
        self.uniforms.iter_mut().filter_map(|(k, v)| match v {
            UniformValue::Float(f) => Some((k.as_str(), f)),
            _ => None,
        })
    }

    /// Check that every uniform the shader requires has been initialized.
    pub fn validate(&self) -> Result<(), SceneError> {
        for name in self.shader.required_uniforms() {
            if !self.uniforms.contains_key(*name) {
                return Err(SceneError::MissingUniform {
                    shader: self.shader,
                    name: *name,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::names::*;
    use super::*;

    fn glow() -> Material {
        Material::new(ShaderKind::FresnelGlow)
            .with_vec3(COLOR, Vec3::new(0.1, 0.1, 0.2))
            .with_vec3(GLOW_COLOR, Vec3::ONE)
            .with_float(GLOW_INTENSITY, 1.0)
            .with_float(FRESNEL_POWER, 3.0)
            .with_vec3(LIGHT, Vec3::new(2.0, 2.0, 2.0))
            .with_float(DIFFUSENESS, 0.5)
    }

    #[test]
    fn complete_material_validates() {
        assert!(glow().validate().is_ok());
    }

    #[test]
    fn missing_uniform_is_reported() {
        let m = Material::new(ShaderKind::Emissive).with_vec3(COLOR, Vec3::ONE);
        match m.validate() {
            Err(SceneError::MissingUniform { name, .. }) => assert_eq!(name, GLOW_INTENSITY),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn update_keeps_type() {
        let mut m = glow();
        m.update(FRESNEL_POWER, UniformValue::Float(5.0)).unwrap();
        assert_eq!(m.float(FRESNEL_POWER), Some(5.0));
        assert!(matches!(
            m.update(FRESNEL_POWER, UniformValue::Vec3(Vec3::ONE)),
            Err(SceneError::UniformType { .. })
        ));
        assert!(matches!(
            m.update("uNope", UniformValue::Float(1.0)),
            Err(SceneError::UnknownUniform(_))
        ));
    }

    #[test]
    fn texture_binding_round_trip() {
        let mut m = Material::new(ShaderKind::Refraction);
        assert_eq!(m.texture(TEXTURE), None);
        m.bind_texture(TEXTURE, Some(TargetHandle(3)));
        assert_eq!(m.texture(TEXTURE), Some(TargetHandle(3)));
        m.bind_texture(TEXTURE, None);
        assert_eq!(m.texture(TEXTURE), None);
        assert!(m.has(TEXTURE));
    }

    #[test]
    fn floats_mut_only_yields_scalars() {
        let mut m = glow();
        let names: Vec<String> = m.floats_mut().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names.len(), 3);
        assert!(!names.iter().any(|n| n == COLOR));
    }

    #[test]
    fn required_names_are_known() {
        for kind in [
            ShaderKind::Refraction,
            ShaderKind::FresnelGlow,
            ShaderKind::Iridescence,
            ShaderKind::NormalGradient,
            ShaderKind::Lambert,
            ShaderKind::Emissive,
        ] {
            for name in kind.required_uniforms() {
                assert!(ALL.contains(name), "{name} not listed");
            }
        }
    }
}
