use knotlab_common::{Extent, TargetHandle};

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("buffer mapping failed: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error("readback callback never ran")]
    ReadbackLost,
    #[error("{0} is not a live target")]
    UnknownTarget(TargetHandle),
    #[error("{0} is sampled and written by the same pass")]
    FeedbackLoop(TargetHandle),
    #[error("`{effect}` needs {needed} scratch targets, got {got}")]
    MissingScratch {
        effect: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("canvas {extent} exceeds the device limit of {max}")]
    CanvasTooLarge { extent: Extent, max: u32 },
    #[error("reading back {extent} needs {bytes} bytes, the device allows {max}")]
    CaptureTooLarge { extent: Extent, bytes: u64, max: u64 },
    #[error("draw issued outside a frame")]
    NoFrame,
    #[error("frame begun while another is in progress")]
    FrameInProgress,
}
