//! PNG export of captured frames.

use crate::RenderError;
use crate::backend::Capture;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// `<experiment>-<unix-millis>.png`
pub fn export_filename(experiment: &str, unix_millis: u128) -> String {
    format!("{experiment}-{unix_millis}.png")
}

pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Encode `capture` as an RGBA8 PNG at `path`.
pub fn write_png(capture: &Capture, path: &Path) -> Result<(), RenderError> {
    let expected = capture.extent.pixel_count() as usize * 4;
    if capture.pixels.len() != expected {
        return Err(RenderError::CaptureSize {
            extent: capture.extent,
            len: capture.pixels.len(),
        });
    }
    image::save_buffer_with_format(
        path,
        &capture.pixels,
        capture.extent.width,
        capture.extent.height,
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )?;
    Ok(())
}

/// Save `capture` into `dir` under a timestamped name and return the path written.
///
/// Never overwrites: a second export within the same millisecond gets a `-1`,
/// `-2`... suffix.
pub fn save_png(capture: &Capture, dir: &Path, experiment: &str) -> Result<PathBuf, RenderError> {
    std::fs::create_dir_all(dir)?;
    let millis = unix_millis();
    let mut path = dir.join(export_filename(experiment, millis));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{experiment}-{millis}-{n}.png"));
        n += 1;
    }
    write_png(capture, &path)?;
    tracing::info!("exported {} ({})", path.display(), capture.extent);
    Ok(path)
}
