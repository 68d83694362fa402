use super::avi::AviWriter;
use super::ffmpeg::FfmpegWriter;
use super::frame::{Resolution, VideoFrame};
use crate::error::{RecorderError, RecorderResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which writer produces the video container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoEncoder {
    /// Uncompressed 24-bit AVI written natively
    #[default]
    Raw,
    /// MPEG-4 (XVID tag) AVI via an ffmpeg child process
    Ffmpeg,
}

impl fmt::Display for VideoEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoEncoder::Raw => write!(f, "raw"),
            VideoEncoder::Ffmpeg => write!(f, "ffmpeg"),
        }
    }
}

impl FromStr for VideoEncoder {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(VideoEncoder::Raw),
            "ffmpeg" | "xvid" => Ok(VideoEncoder::Ffmpeg),
            other => Err(RecorderError::config(format!("unknown video encoder '{}'", other))),
        }
    }
}

/// Summary of a finalized video file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoFileInfo {
    pub path: PathBuf,
    pub resolution: Resolution,
    pub frame_rate: u32,
    pub frame_count: u64,
}

/// Sequential frame writer for one session
///
/// Frames are presented in call order, one frame interval apart.
pub trait FrameSink: Send {
    /// Append one frame. Frames not matching the declared resolution are
    /// rejected with `InvalidFrame`.
    fn write(&mut self, frame: &VideoFrame) -> RecorderResult<()>;

    /// Finalize the container. Calling it again is a no-op.
    fn close(&mut self) -> RecorderResult<VideoFileInfo>;

    fn frames_written(&self) -> u64;
}

/// Open the writer selected by `encoder`
pub fn open_frame_sink(
    encoder: VideoEncoder,
    path: &Path,
    frame_rate: u32,
    resolution: Resolution,
) -> RecorderResult<Box<dyn FrameSink>> {
    match encoder {
        VideoEncoder::Raw => Ok(Box::new(AviWriter::create(path, frame_rate, resolution)?)),
        VideoEncoder::Ffmpeg => Ok(Box::new(FfmpegWriter::spawn(path, frame_rate, resolution)?)),
    }
}

/// Reject frames whose dimensions differ from the sink's
pub(crate) fn check_frame(expected: Resolution, frame: &VideoFrame) -> RecorderResult<()> {
    if frame.resolution() != expected || frame.data.len() != expected.frame_bytes() {
        return Err(RecorderError::InvalidFrame {
            expected_width: expected.width,
            expected_height: expected.height,
            width: frame.width,
            height: frame.height,
        });
    }
    Ok(())
}
