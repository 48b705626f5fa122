use crate::plan::Slot;
use knotlab_common::Extent;
use knotlab_scene::SceneError;

/// Errors from plan validation, experiment setup, config and export.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("frame plan has no passes")]
    EmptyPlan,
    #[error("the last pass must render to the final output")]
    MissingFinalPass,
    #[error("pass `{0}` renders to the final output but is not last")]
    FinalPassNotLast(&'static str),
    #[error("pass `{pass}` samples slot `{slot}` which the previous pass did not write")]
    StaleSource { pass: &'static str, slot: Slot },
    #[error("pass `{pass}` samples and writes slot `{slot}`")]
    FeedbackLoop { pass: &'static str, slot: Slot },
    #[error("pass `{0}` samples a texture while the subject is hidden")]
    HiddenSampler(&'static str),
    #[error("plan samples offscreen buffers but the scene has no subject")]
    NoSubject,
    #[error("slot `{0}` has no target bound")]
    UnboundSlot(Slot),
    #[error("backend returned no pixels for a capture frame")]
    NoCapture,
    #[error("capture of {extent} carries {len} bytes")]
    CaptureSize { extent: Extent, len: usize },
    #[error("invalid config: {0}")]
    Config(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// A frame-level failure: either the orchestration or the graphics backend.
#[derive(Debug, thiserror::Error)]
pub enum FrameError<E>
where
    E: std::error::Error + 'static,
{
    #[error("backend error: {0}")]
    Backend(#[source] E),
    #[error(transparent)]
    Render(#[from] RenderError),
}
