//! Shared value types for the knotlab experiments.
//!
//! # Invariants
//! - Drawing buffer sizes are never zero in either dimension.
//! - The device pixel ratio used for drawing buffers never exceeds [`MAX_PIXEL_RATIO`].

mod types;

pub use types::{Extent, MAX_PIXEL_RATIO, TargetHandle, Transform, Viewport};
