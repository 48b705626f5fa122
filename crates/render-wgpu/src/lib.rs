//! wgpu backend for the knot experiments.
//!
//! Executes the frame plans of `knotlab-render` on a window surface or fully
//! offscreen: scene passes draw meshes with per-shader pipelines, offscreen
//! targets are float textures, and the post chain runs as full-screen passes.
//! Capture frames are read back as tightly packed RGBA8.
//!
//! # Invariants
//! - Each draw call is submitted before the next one writes uniforms.
//! - A pass never samples the target it renders into.
//! - The canvas never exceeds the device's texture limit.
//! - A capture readback never exceeds the device's buffer limit.

mod context;
mod error;
mod gpu;
mod mesh;
mod pipelines;
mod post;
mod readback;
mod resources;
pub mod shaders;
mod uniforms;

pub use context::GpuContext;
pub use error::GpuError;
pub use gpu::WgpuBackend;
pub use resources::{DEPTH_FORMAT, OFFSCREEN_FORMAT};
pub use uniforms::MAX_LIGHTS;
