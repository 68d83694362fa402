//! Webcam frame source (nokhwa)

use super::frame::{Resolution, VideoFrame};
use super::source::FrameSource;
use crate::error::{RecorderError, RecorderResult};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{info, warn};

/// Human-readable names of the cameras nokhwa can see
pub fn list_cameras() -> Vec<String> {
    nokhwa::query(ApiBackend::Auto)
        .map(|cameras| cameras.iter().map(|c| c.human_name()).collect())
        .unwrap_or_default()
}

/// Pulls frames from a camera and resizes them to the session resolution
pub struct WebcamSource {
    camera: Camera,
    resolution: Resolution,
    name: String,
}

impl WebcamSource {
    /// Open camera `index` (0 = default device)
    pub fn open(index: u32, resolution: Resolution) -> RecorderResult<Self> {
        let device = format!("webcam {}", index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| RecorderError::device(&device, e))?;
        camera
            .open_stream()
            .map_err(|e| RecorderError::device(&device, e))?;

        let name = camera.info().human_name();
        info!(
            "Webcam opened: {} (native {:?}, output {})",
            name,
            camera.camera_format(),
            resolution
        );

        Ok(Self {
            camera,
            resolution,
            name,
        })
    }
}

impl FrameSource for WebcamSource {
    fn next_frame(&mut self) -> RecorderResult<Option<VideoFrame>> {
        let buffer = match self.camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("Webcam stopped producing frames: {}", e);
                return Ok(None);
            }
        };

        let decoded = match buffer.decode_image::<RgbFormat>() {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Webcam frame could not be decoded: {}", e);
                return Ok(None);
            }
        };

        let (width, height) = (decoded.width(), decoded.height());
        let image = RgbImage::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
            RecorderError::device(&self.name, "decoded frame has inconsistent size")
        })?;

        Ok(Some(VideoFrame::from_rgb_image(image, self.resolution)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("Failed to stop webcam stream: {}", e);
        }
    }
}
