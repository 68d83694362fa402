//! Primary display snapshot source (xcap)

use super::frame::{Resolution, VideoFrame};
use super::source::FrameSource;
use crate::error::{RecorderError, RecorderResult};
use image::RgbaImage;
use tracing::info;
use xcap::Monitor;

const DEVICE: &str = "screen";

/// Names of the displays available for capture
pub fn list_displays() -> Vec<String> {
    Monitor::all()
        .map(|monitors| {
            monitors
                .iter()
                .map(|m| format!("{} ({}x{})", m.name(), m.width(), m.height()))
                .collect()
        })
        .unwrap_or_default()
}

/// Snapshots the primary display on every call; never exhausts
pub struct ScreenSource {
    monitor: Monitor,
    resolution: Resolution,
    name: String,
}

impl ScreenSource {
    pub fn open_primary(resolution: Resolution) -> RecorderResult<Self> {
        let monitors = Monitor::all().map_err(|e| RecorderError::device(DEVICE, e))?;
        let monitor = monitors
            .into_iter()
            .find(|m| m.is_primary())
            .ok_or_else(|| RecorderError::device(DEVICE, "no primary display found"))?;

        let name = monitor.name().to_string();
        info!(
            "Screen capture opened: {} ({}x{} -> {})",
            name,
            monitor.width(),
            monitor.height(),
            resolution
        );

        Ok(Self {
            monitor,
            resolution,
            name,
        })
    }
}

impl FrameSource for ScreenSource {
    fn next_frame(&mut self) -> RecorderResult<Option<VideoFrame>> {
        let captured = self
            .monitor
            .capture_image()
            .map_err(|e| RecorderError::device(DEVICE, e))?;

        let (width, height) = (captured.width(), captured.height());
        let image = RgbaImage::from_raw(width, height, captured.into_raw())
            .ok_or_else(|| RecorderError::device(DEVICE, "snapshot has inconsistent size"))?;

        Ok(Some(VideoFrame::from_rgba_image(image, self.resolution)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
