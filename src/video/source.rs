use super::frame::VideoFrame;
use crate::error::{RecorderError, RecorderResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which device the session pulls frames from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoSourceKind {
    /// Default camera; finite, ends when the device stops producing frames
    #[default]
    Webcam,
    /// Primary display snapshot; never ends on its own
    Screen,
    /// Synthetic colour bars, no device needed
    TestPattern,
}

impl fmt::Display for VideoSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoSourceKind::Webcam => write!(f, "webcam"),
            VideoSourceKind::Screen => write!(f, "screen"),
            VideoSourceKind::TestPattern => write!(f, "test-pattern"),
        }
    }
}

impl FromStr for VideoSourceKind {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webcam" | "camera" => Ok(VideoSourceKind::Webcam),
            "screen" | "display" => Ok(VideoSourceKind::Screen),
            "test-pattern" | "pattern" => Ok(VideoSourceKind::TestPattern),
            other => Err(RecorderError::config(format!("unknown video source '{}'", other))),
        }
    }
}

/// Frame acquisition trait
///
/// Sources are opened and driven on the capture worker thread, so they do
/// not need to be `Send` (camera handles usually are not).
pub trait FrameSource {
    /// Acquire the next frame, normalized to the session resolution.
    ///
    /// `Ok(None)` means the source is exhausted (camera disconnected or out of
    /// frames); the session finalizes and does not retry. Errors are fatal.
    fn next_frame(&mut self) -> RecorderResult<Option<VideoFrame>>;

    /// Get source name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_parse() {
        assert_eq!("webcam".parse::<VideoSourceKind>().unwrap(), VideoSourceKind::Webcam);
        assert_eq!("Screen".parse::<VideoSourceKind>().unwrap(), VideoSourceKind::Screen);
        assert_eq!(
            "test-pattern".parse::<VideoSourceKind>().unwrap(),
            VideoSourceKind::TestPattern
        );
        assert!("scanner".parse::<VideoSourceKind>().is_err());
    }

    #[test]
    fn test_source_kind_serde() {
        let json = serde_json::to_string(&VideoSourceKind::TestPattern).unwrap();
        assert_eq!(json, "\"test-pattern\"");
        assert_eq!(VideoSourceKind::Screen.to_string(), "screen");
    }
}
