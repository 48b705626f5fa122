//! Render orchestration: frame plans, offscreen targets, resize and export,
//! independent of any graphics API.
//!
//! # Invariants
//! - A pass that samples an offscreen buffer samples the one written by the pass
//!   immediately before it, never its own output.
//! - Every live offscreen target has the canvas extent.
//! - Resize and export happen between frames; export leaves the experiment as it
//!   found it.
//! - A failed draw abandons the whole frame; the next frame starts from the
//!   first pass.

pub mod backend;
pub mod config;
mod error;
pub mod experiment;
pub mod export;
pub mod frame;
pub mod plan;
pub mod post;
pub mod recording;
pub mod targets;

pub use backend::{
    Capture, Filter, FrameMode, Output, PostPassCall, RenderBackend, ScenePassCall, TargetDesc,
};
pub use config::{ConfigValue, ExperimentConfig};
pub use error::{FrameError, RenderError};
pub use experiment::{DEFAULT_EXPORT_SCALE, Experiment, ExperimentSetup};
pub use frame::{PlanTargets, run_frame};
pub use plan::{FramePlan, PassOutput, ScenePass, Slot};
pub use post::{BloomSettings, GrainSettings, PostEffect};
pub use recording::{Command, RecordingBackend, RecordingError};
pub use targets::TargetRegistry;
