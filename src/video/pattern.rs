//! Synthetic colour-bar source for device-free recording.

use super::frame::{Resolution, VideoFrame};
use super::source::FrameSource;
use crate::error::RecorderResult;

const BARS_BGR: [[u8; 3]; 7] = [
    [192, 192, 192],
    [0, 192, 192],
    [192, 192, 0],
    [0, 192, 0],
    [192, 0, 192],
    [0, 0, 192],
    [192, 0, 0],
];

/// Scrolling SMPTE-style colour bars
///
/// With a frame limit it behaves like a webcam that disconnects after N
/// frames; without one it never ends, like a screen source.
pub struct TestPatternSource {
    resolution: Resolution,
    limit: Option<u64>,
    produced: u64,
}

impl TestPatternSource {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            limit: None,
            produced: 0,
        }
    }

    /// Exhaust after `frames` frames
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }

    fn render(&self) -> VideoFrame {
        let Resolution { width, height } = self.resolution;
        let mut data = Vec::with_capacity(self.resolution.frame_bytes());
        let offset = self.produced as usize;

        for _ in 0..height {
            for x in 0..width as usize {
                let bar = ((x + offset) * BARS_BGR.len() / width as usize) % BARS_BGR.len();
                data.extend_from_slice(&BARS_BGR[bar]);
            }
        }

        VideoFrame {
            width,
            height,
            data,
        }
    }
}

impl FrameSource for TestPatternSource {
    fn next_frame(&mut self) -> RecorderResult<Option<VideoFrame>> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return Ok(None);
        }

        let frame = self.render();
        self.produced += 1;
        Ok(Some(frame))
    }

    fn name(&self) -> &str {
        "test-pattern"
    }
}
