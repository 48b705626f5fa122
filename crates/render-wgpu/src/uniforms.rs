use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use knotlab_common::Extent;
use knotlab_scene::material::names;
use knotlab_scene::{Material, OrbitCamera, Scene};

/// Lights beyond this count are ignored by the scene shaders.
pub const MAX_LIGHTS: usize = 4;

/// Per-pass uniforms at `@group(0)`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub viewport: [f32; 4],
    pub light_positions: [[f32; 4]; MAX_LIGHTS],
    pub light_colors: [[f32; 4]; MAX_LIGHTS],
}

impl FrameUniforms {
    pub fn new(camera: &OrbitCamera, scene: &Scene, canvas: Extent, time: f32) -> Self {
        let mut uniforms = Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            camera_position: camera.position().extend(1.0).to_array(),
            viewport: [canvas.width as f32, canvas.height as f32, time, 0.0],
            light_positions: [[0.0; 4]; MAX_LIGHTS],
            light_colors: [[0.0; 4]; MAX_LIGHTS],
        };
        let mut count = 0;
        for (slot, (position, light)) in scene.lights().take(MAX_LIGHTS).enumerate() {
            uniforms.light_positions[slot] = position.extend(1.0).to_array();
            uniforms.light_colors[slot] = light.color.extend(light.intensity).to_array();
            count += 1;
        }
        uniforms.viewport[3] = count as f32;
        uniforms
    }
}

/// Per-object uniforms at `@group(1)`, packed from the material's named values.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub glow: [f32; 4],
    pub ior: [f32; 4],
    pub shading: [f32; 4],
    pub light: [f32; 4],
    pub params: [f32; 4],
    pub resolution: [f32; 4],
}

impl ObjectUniforms {
    /// Missing values pack as zero, except `uTime` which falls back to `time`.
    pub fn pack(model: Mat4, material: &Material, time: f32) -> Self {
        let float = |name| material.float(name).unwrap_or(0.0);
        let vec3 = |name| material.vec3(name).unwrap_or(Vec3::ZERO);
        let resolution = material.vec2(names::RESOLUTION).unwrap_or_default();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            color: vec3(names::COLOR).extend(1.0).to_array(),
            glow: vec3(names::GLOW_COLOR)
                .extend(float(names::GLOW_INTENSITY))
                .to_array(),
            ior: [
                float(names::IOR_R),
                float(names::IOR_G),
                float(names::IOR_B),
                float(names::REFRACT_POWER),
            ],
            shading: [
                float(names::FRESNEL_POWER),
                float(names::CHROMATIC_ABERRATION),
                float(names::SATURATION),
                float(names::SHININESS),
            ],
            light: vec3(names::LIGHT)
                .extend(float(names::DIFFUSENESS))
                .to_array(),
            params: Vec4::new(float(names::BANDS), float(names::SPEED), 0.0, 0.0).to_array(),
            resolution: [
                resolution.x,
                resolution.y,
                material.float(names::TIME).unwrap_or(time),
                0.0,
            ],
        }
    }
}

/// Uniforms of one full-screen post pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PostUniforms {
    pub texel: [f32; 4],
    pub params: [f32; 4],
}

impl PostUniforms {
    pub fn new(extent: Extent, direction: [f32; 2], value: f32, time: f32) -> Self {
        Self {
            texel: [
                1.0 / extent.width as f32,
                1.0 / extent.height as f32,
                direction[0],
                direction[1],
            ],
            params: [value, time, 0.0, 0.0],
        }
    }
}
