//! Live preview side channel
//!
//! The capture worker renders every written frame here. Nothing about the
//! preview is persisted.

use super::frame::VideoFrame;
use anyhow::{Context, Result};
use base64::Engine;
use image::ImageFormat;
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};

/// Display target for frames as they are recorded
pub trait PreviewSurface: Send + Sync {
    fn render(&self, frame: &VideoFrame);
}

/// Discards every frame
#[derive(Debug, Default)]
pub struct NullPreview;

impl PreviewSurface for NullPreview {
    fn render(&self, _frame: &VideoFrame) {}
}

/// Keeps the most recent frame so a controller can poll it
#[derive(Debug, Default)]
pub struct LatestFramePreview {
    latest: Mutex<Option<VideoFrame>>,
    rendered: AtomicU64,
}

impl LatestFramePreview {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames rendered since creation
    pub fn rendered(&self) -> u64 {
        self.rendered.load(Ordering::SeqCst)
    }

    pub fn latest(&self) -> Option<VideoFrame> {
        self.latest.lock().clone()
    }

    /// Latest frame as a base64-encoded PNG, if any frame was rendered
    pub fn png_base64(&self) -> Result<Option<String>> {
        let Some(frame) = self.latest() else {
            return Ok(None);
        };

        let mut png = Cursor::new(Vec::new());
        frame
            .to_rgb_image()
            .write_to(&mut png, ImageFormat::Png)
            .context("Failed to encode preview frame as PNG")?;

        Ok(Some(
            base64::engine::general_purpose::STANDARD.encode(png.into_inner()),
        ))
    }
}

impl PreviewSurface for LatestFramePreview {
    fn render(&self, frame: &VideoFrame) {
        *self.latest.lock() = Some(frame.clone());
        self.rendered.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::Resolution;

    #[test]
    fn test_latest_frame_replaced() {
        let preview = LatestFramePreview::new();
        assert!(preview.latest().is_none());
        assert_eq!(preview.png_base64().unwrap(), None);

        let res = Resolution::new(4, 4);
        preview.render(&VideoFrame::solid(res, [255, 0, 0]));
        preview.render(&VideoFrame::solid(res, [0, 0, 255]));

        assert_eq!(preview.rendered(), 2);
        let latest = preview.latest().unwrap();
        assert_eq!(&latest.data[..3], &[0, 0, 255]);
    }

    #[test]
    fn test_png_encoding() {
        let preview = LatestFramePreview::new();
        preview.render(&VideoFrame::solid(Resolution::new(8, 6), [10, 20, 30]));

        let encoded = preview.png_base64().unwrap().unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        // PNG signature
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
