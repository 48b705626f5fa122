//! Scene assembly for the knot experiments.
//!
//! A scene is built once at startup: a subject knot mesh, optional background
//! shapes and point lights. Only per-frame animation and the render sequence's
//! visibility toggle mutate it afterwards.
//!
//! # Invariants
//! - At most one mesh is the subject of a scene.
//! - Material uniforms are addressed by name; the required set for a shader kind
//!   is checked before the first render.

mod camera;
mod geometry;
pub mod material;
mod scene;

pub use camera::OrbitCamera;
pub use geometry::{MeshData, Shape, TorusKnot, Vertex};
pub use material::{FaceSide, Material, ShaderKind, UniformValue};
pub use scene::{ObjectId, ObjectKind, PointLight, Scene, SceneObject};

/// Errors raised while assembling or validating a scene.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("material for {shader:?} is missing uniform `{name}`")]
    MissingUniform { shader: ShaderKind, name: &'static str },
    #[error("uniform `{name}` expects {expected}, got {actual}")]
    UniformType {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("unknown uniform `{0}`")]
    UnknownUniform(String),
    #[error("object {0:?} is not a mesh")]
    NotAMesh(ObjectId),
    #[error("object {0:?} does not exist")]
    NoSuchObject(ObjectId),
}
