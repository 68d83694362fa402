//! Video frame and resolution types
//!
//! Frames are packed 3-channel BGR, top-down, with no row padding. Sources
//! normalize whatever the device produces into this layout at the session
//! resolution before a frame reaches a sink or the preview.

use crate::error::{RecorderError, RecorderResult};
use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bytes per pixel in a [`VideoFrame`]
pub const BYTES_PER_PIXEL: usize = 3;

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const VGA: Resolution = Resolution::new(640, 480);
    pub const HD: Resolution = Resolution::new(1280, 720);
    pub const FULL_HD: Resolution = Resolution::new(1920, 1080);

    /// Largest width or height a session accepts
    pub const MAX_DIMENSION: u32 = 8192;

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size of one packed BGR frame at this resolution
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::VGA
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| RecorderError::config(format!("resolution '{}' is not WxH", s)))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| RecorderError::config(format!("invalid width in '{}'", s)))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| RecorderError::config(format!("invalid height in '{}'", s)))?;
        Ok(Resolution::new(width, height))
    }
}

/// A packed BGR24 frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> RecorderResult<Self> {
        let expected = Resolution::new(width, height).frame_bytes();
        if data.len() != expected {
            return Err(RecorderError::InvalidFrame {
                expected_width: width,
                expected_height: height,
                width,
                height: (data.len() / (width.max(1) as usize * BYTES_PER_PIXEL)) as u32,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with one BGR colour
    pub fn solid(resolution: Resolution, bgr: [u8; 3]) -> Self {
        let pixels = resolution.width as usize * resolution.height as usize;
        let mut data = Vec::with_capacity(resolution.frame_bytes());
        for _ in 0..pixels {
            data.extend_from_slice(&bgr);
        }
        Self {
            width: resolution.width,
            height: resolution.height,
            data,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Row `y` as packed BGR bytes
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * BYTES_PER_PIXEL;
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Resize an RGB camera image to `target` and convert to BGR
    pub fn from_rgb_image(image: RgbImage, target: Resolution) -> Self {
        let image = if image.dimensions() == (target.width, target.height) {
            image
        } else {
            imageops::resize(&image, target.width, target.height, FilterType::Triangle)
        };

        let mut data = image.into_raw();
        for pixel in data.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.swap(0, 2);
        }
        Self {
            width: target.width,
            height: target.height,
            data,
        }
    }

    /// Resize an RGBA screen capture to `target`, dropping alpha
    pub fn from_rgba_image(image: RgbaImage, target: Resolution) -> Self {
        let image = if image.dimensions() == (target.width, target.height) {
            image
        } else {
            imageops::resize(&image, target.width, target.height, FilterType::Triangle)
        };

        let mut data = Vec::with_capacity(target.frame_bytes());
        for pixel in image.pixels() {
            let [r, g, b, _] = pixel.0;
            data.extend_from_slice(&[b, g, r]);
        }
        Self {
            width: target.width,
            height: target.height,
            data,
        }
    }

    /// Convert back to an RGB image (preview encoding)
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut rgb = self.data.clone();
        for pixel in rgb.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.swap(0, 2);
        }
        RgbImage::from_raw(self.width, self.height, rgb).unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}
