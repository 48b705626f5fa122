use crate::backend::{
    Capture, FrameMode, Output, PostPassCall, RenderBackend, ScenePassCall, TargetDesc,
};
use knotlab_common::{Extent, TargetHandle};
use knotlab_scene::FaceSide;
use std::collections::BTreeMap;

/// What the subject looked like when a scene pass was drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRecord {
    pub label: String,
    pub output: Output,
    pub output_extent: Extent,
    pub subject_visible: Option<bool>,
    pub subject_side: Option<FaceSide>,
    pub subject_texture: Option<TargetHandle>,
    pub visible_meshes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub label: String,
    pub input: TargetHandle,
    pub scratch: Vec<TargetHandle>,
    pub output: Output,
}

/// One backend call, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateTarget { handle: TargetHandle, extent: Extent },
    DestroyTarget(TargetHandle),
    ResizeCanvas(Extent),
    BeginFrame(FrameMode),
    Scene(SceneRecord),
    Post(PostRecord),
    EndFrame,
    AbandonFrame,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::CreateTarget { handle, extent } => write!(f, "create {handle} {extent}"),
            Command::DestroyTarget(handle) => write!(f, "destroy {handle}"),
            Command::ResizeCanvas(extent) => write!(f, "canvas {extent}"),
            Command::BeginFrame(mode) => write!(f, "begin frame ({mode:?})"),
            Command::Scene(r) => {
                write!(f, "  scene `{}` -> {} [{} meshes", r.label, r.output, r.visible_meshes)?;
                match (r.subject_visible, r.subject_side) {
                    (Some(true), Some(side)) => write!(f, ", subject {side}")?,
                    (Some(false), _) => write!(f, ", subject hidden")?,
                    _ => {}
                }
                if let Some(texture) = r.subject_texture {
                    write!(f, ", samples {texture}")?;
                }
                write!(f, "]")
            }
            Command::Post(r) => write!(f, "  post `{}` {} -> {}", r.label, r.input, r.output),
            Command::EndFrame => write!(f, "end frame"),
            Command::AbandonFrame => write!(f, "abandon frame"),
        }
    }
}

/// Errors the recording backend raises on protocol violations.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("injected failure in `{0}`")]
    Injected(String),
    #[error("{0} is not a live target")]
    UnknownTarget(TargetHandle),
    #[error("{handle} is {actual}, canvas is {canvas}")]
    ExtentMismatch {
        handle: TargetHandle,
        actual: Extent,
        canvas: Extent,
    },
    #[error("{0} is sampled and written by the same pass")]
    FeedbackLoop(TargetHandle),
    #[error("draw issued outside a frame")]
    NoFrame,
    #[error("frame begun while another is in progress")]
    FrameInProgress,
    #[error("canvas {0} exceeds the maximum dimension")]
    CanvasTooLarge(Extent),
    #[error("capturing {extent} needs {bytes} bytes, limit is {max}")]
    CaptureTooLarge { extent: Extent, bytes: u64, max: u64 },
}

/// Backend that executes nothing and records every call.
///
/// Checks the same preconditions a GPU backend would trip over: drawing into
/// dead or mis-sized targets, sampling the target being written, drawing
/// outside a frame. Used by tests and by the CLI's plan trace.
#[derive(Debug)]
pub struct RecordingBackend {
    live: BTreeMap<TargetHandle, TargetDesc>,
    canvas: Extent,
    max_dimension: u32,
    max_capture_bytes: u64,
    frame: Option<FrameMode>,
    commands: Vec<Command>,
    fail_next_draw: bool,
    frames_completed: usize,
    frames_abandoned: usize,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            live: BTreeMap::new(),
            canvas: Extent::new(1, 1),
            max_dimension: 8192,
            max_capture_bytes: u64::MAX,
            frame: None,
            commands: Vec::new(),
            fail_next_draw: false,
            frames_completed: 0,
            frames_abandoned: 0,
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_max_capture_bytes(mut self, max_capture_bytes: u64) -> Self {
        self.max_capture_bytes = max_capture_bytes;
        self
    }

    /// Make the next scene or post draw fail.
    pub fn fail_next_draw(&mut self) {
        self.fail_next_draw = true;
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn scene_records(&self) -> impl Iterator<Item = &SceneRecord> {
        self.commands.iter().filter_map(|c| match c {
            Command::Scene(r) => Some(r),
            _ => None,
        })
    }

    pub fn post_records(&self) -> impl Iterator<Item = &PostRecord> {
        self.commands.iter().filter_map(|c| match c {
            Command::Post(r) => Some(r),
            _ => None,
        })
    }

    pub fn live_targets(&self) -> &BTreeMap<TargetHandle, TargetDesc> {
        &self.live
    }

    pub fn canvas(&self) -> Extent {
        self.canvas
    }

    pub fn frames_completed(&self) -> usize {
        self.frames_completed
    }

    pub fn frames_abandoned(&self) -> usize {
        self.frames_abandoned
    }

    fn take_injected(&mut self, label: &str) -> Result<(), RecordingError> {
        if std::mem::take(&mut self.fail_next_draw) {
            return Err(RecordingError::Injected(label.to_string()));
        }
        Ok(())
    }

    fn check_target(&self, handle: TargetHandle) -> Result<(), RecordingError> {
        let desc = self
            .live
            .get(&handle)
            .ok_or(RecordingError::UnknownTarget(handle))?;
        if desc.extent != self.canvas {
            return Err(RecordingError::ExtentMismatch {
                handle,
                actual: desc.extent,
                canvas: self.canvas,
            });
        }
        Ok(())
    }

    fn check_output(&self, output: Output) -> Result<(), RecordingError> {
        if self.frame.is_none() {
            return Err(RecordingError::NoFrame);
        }
        match output {
            Output::Target(handle) => self.check_target(handle),
            Output::Screen => Ok(()),
        }
    }
}

impl RenderBackend for RecordingBackend {
    type Error = RecordingError;

    fn max_canvas_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn max_capture_bytes(&self) -> u64 {
        self.max_capture_bytes
    }

    fn create_target(&mut self, handle: TargetHandle, desc: &TargetDesc) -> Result<(), Self::Error> {
        self.live.insert(handle, *desc);
        self.commands.push(Command::CreateTarget {
            handle,
            extent: desc.extent,
        });
        Ok(())
    }

    fn destroy_target(&mut self, handle: TargetHandle) {
        self.live.remove(&handle);
        self.commands.push(Command::DestroyTarget(handle));
    }

    fn resize_canvas(&mut self, extent: Extent) -> Result<(), Self::Error> {
        if extent.max_dimension() > self.max_dimension {
            return Err(RecordingError::CanvasTooLarge(extent));
        }
        self.canvas = extent;
        self.commands.push(Command::ResizeCanvas(extent));
        Ok(())
    }

    fn begin_frame(&mut self, mode: FrameMode) -> Result<(), Self::Error> {
        if self.frame.is_some() {
            return Err(RecordingError::FrameInProgress);
        }
        self.frame = Some(mode);
        self.commands.push(Command::BeginFrame(mode));
        Ok(())
    }

    fn draw_scene(&mut self, call: &ScenePassCall<'_>) -> Result<(), Self::Error> {
        self.check_output(call.output)?;
        self.take_injected(call.label)?;

        let subject = call.scene.subject_object();
        let material = subject.and_then(|o| o.material());
        let visible = subject.map(|o| o.visible);
        let texture = match (visible, material) {
            (Some(true), Some(m)) if m.shader().samples_texture() => {
                m.texture(knotlab_scene::material::names::TEXTURE)
            }
            _ => None,
        };
        if let Some(handle) = texture {
            self.check_target(handle)?;
            if call.output == Output::Target(handle) {
                return Err(RecordingError::FeedbackLoop(handle));
            }
        }

        self.commands.push(Command::Scene(SceneRecord {
            label: call.label.to_string(),
            output: call.output,
            output_extent: self.canvas,
            subject_visible: visible,
            subject_side: material.map(|m| m.side()),
            subject_texture: texture,
            visible_meshes: call.scene.visible_meshes().count(),
        }));
        Ok(())
    }

    fn draw_post(&mut self, call: &PostPassCall<'_>) -> Result<(), Self::Error> {
        self.check_output(call.output)?;
        self.take_injected(call.label)?;
        self.check_target(call.input)?;
        for handle in call.scratch {
            self.check_target(*handle)?;
        }
        if call.output == Output::Target(call.input) {
            return Err(RecordingError::FeedbackLoop(call.input));
        }
        self.commands.push(Command::Post(PostRecord {
            label: call.label.to_string(),
            input: call.input,
            scratch: call.scratch.to_vec(),
            output: call.output,
        }));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<Option<Capture>, Self::Error> {
        let mode = self.frame.take().ok_or(RecordingError::NoFrame)?;
        if mode == FrameMode::Capture {
            let bytes = self.capture_bytes(self.canvas);
            if bytes > self.max_capture_bytes {
                self.frames_abandoned += 1;
                self.commands.push(Command::AbandonFrame);
                return Err(RecordingError::CaptureTooLarge {
                    extent: self.canvas,
                    bytes,
                    max: self.max_capture_bytes,
                });
            }
        }
        self.frames_completed += 1;
        self.commands.push(Command::EndFrame);
        Ok(match mode {
            FrameMode::Present => None,
            FrameMode::Capture => Some(Capture {
                extent: self.canvas,
                pixels: vec![0; self.canvas.pixel_count() as usize * 4],
            }),
        })
    }

    fn abandon_frame(&mut self) {
        if self.frame.take().is_some() {
            self.frames_abandoned += 1;
            self.commands.push(Command::AbandonFrame);
        }
    }
}
