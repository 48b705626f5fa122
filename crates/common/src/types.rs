use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Upper bound applied to the host's device pixel ratio when sizing drawing buffers.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

const PIXEL_SNAP: f64 = 1e-3;

/// Stable identifier for an offscreen render target.
///
/// Handles survive resizes: the storage behind a handle is recreated, the
/// handle itself stays valid until the target is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetHandle(pub u32);

impl std::fmt::Display for TargetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Size of a pixel buffer in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    /// Create an extent, bumping zero dimensions to one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Multiply both dimensions by `factor`, rounding to the nearest pixel.
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(
            (self.width as f32 * factor).round() as u32,
            (self.height as f32 * factor).round() as u32,
        )
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Logical window size together with the host's device pixel ratio.
///
/// Mirrors a browser canvas: `width`/`height` are CSS-style logical units and the
/// drawing buffer is `floor(logical * min(dpr, MAX_PIXEL_RATIO))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            device_pixel_ratio,
        }
    }

    /// Build a viewport from a physical window size and the window scale factor.
    pub fn from_physical(size: Extent, scale_factor: f64) -> Self {
        let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor as f32
        } else {
            1.0
        };
        Self::new(
            size.width as f32 / scale,
            size.height as f32 / scale,
            scale,
        )
    }

    /// Pixel ratio actually used for drawing buffers.
    pub fn pixel_ratio(&self) -> f32 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio.min(MAX_PIXEL_RATIO)
        } else {
            1.0
        }
    }

    /// Camera aspect ratio: logical width over logical height.
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Size of the drawing buffer and of every offscreen target.
    pub fn drawing_buffer(&self) -> Extent {
        let ratio = self.pixel_ratio() as f64;
        // Logical sizes from `from_physical` carry f32 division error; snap
        // products within a thousandth of a pixel before flooring.
        let physical = |logical: f32| (logical as f64 * ratio + PIXEL_SNAP).floor() as u32;
        Extent::new(physical(self.width), physical(self.height))
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
