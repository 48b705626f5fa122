use crate::post::PostEffect;
use knotlab_common::{Extent, TargetHandle};
use knotlab_scene::{OrbitCamera, Scene};

/// Where a draw lands: an offscreen target, or the canvas of the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    Target(TargetHandle),
    Screen,
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Target(h) => write!(f, "{h}"),
            Output::Screen => f.write_str("screen"),
        }
    }
}

/// Texture filtering for offscreen targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    #[default]
    Linear,
    Nearest,
}

/// Storage description of an offscreen colour buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDesc {
    pub extent: Extent,
    pub filter: Filter,
}

/// How the canvas of a frame is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// Show the frame on the window surface.
    Present,
    /// Render into an offscreen canvas and read the pixels back.
    Capture,
}

/// RGBA8 pixels read back from a captured frame, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub extent: Extent,
    pub pixels: Vec<u8>,
}

/// One scene render call.
#[derive(Debug)]
pub struct ScenePassCall<'a> {
    pub label: &'a str,
    pub scene: &'a Scene,
    pub camera: &'a OrbitCamera,
    pub output: Output,
    /// Seconds since the experiment started.
    pub time: f32,
}

/// One full-screen post-processing call.
#[derive(Debug)]
pub struct PostPassCall<'a> {
    pub label: &'a str,
    pub effect: &'a PostEffect,
    pub input: TargetHandle,
    /// Intermediate targets reserved for this effect.
    pub scratch: &'a [TargetHandle],
    pub output: Output,
    pub time: f32,
}

/// A graphics API binding able to execute frame plans.
///
/// Calls arrive in a fixed order per frame: `begin_frame`, any number of
/// `draw_scene`/`draw_post`, then `end_frame` or `abandon_frame`. Target and
/// canvas changes only happen between frames.
pub trait RenderBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Largest canvas dimension the backend can allocate.
    fn max_canvas_dimension(&self) -> u32;

    /// Largest readback, in bytes, a capture frame may allocate.
    fn max_capture_bytes(&self) -> u64 {
        u64::MAX
    }

    /// Bytes a capture frame needs to read back a canvas of `extent`.
    fn capture_bytes(&self, extent: Extent) -> u64 {
        extent.pixel_count() * 4
    }

    /// Create (or replace) the storage behind `handle`.
    fn create_target(&mut self, handle: TargetHandle, desc: &TargetDesc) -> Result<(), Self::Error>;

    fn destroy_target(&mut self, handle: TargetHandle);

    /// Resize the canvas (window surface or capture texture) and any depth storage.
    fn resize_canvas(&mut self, extent: Extent) -> Result<(), Self::Error>;

    fn begin_frame(&mut self, mode: FrameMode) -> Result<(), Self::Error>;

    fn draw_scene(&mut self, call: &ScenePassCall<'_>) -> Result<(), Self::Error>;

    fn draw_post(&mut self, call: &PostPassCall<'_>) -> Result<(), Self::Error>;

    /// Finish the frame. Capture frames return their pixels.
    fn end_frame(&mut self) -> Result<Option<Capture>, Self::Error>;

    /// Drop whatever the current frame acquired without presenting it.
    fn abandon_frame(&mut self) {}
}
