use crate::error::{RecorderError, RecorderResult};
use crate::video::{Resolution, VideoEncoder, VideoSourceKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a session's two output files land
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory both files are written to
    pub directory: PathBuf,

    /// Video container file name
    pub video_file: String,

    /// WAV file name
    pub audio_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            video_file: "output.avi".to_string(),
            audio_file: "audio.wav".to_string(),
        }
    }
}

/// Configuration for a recording session
///
/// Fixed for the duration of one session; changes are only accepted while
/// the session is idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Video device to pull frames from
    pub source: VideoSourceKind,

    /// Output frame size; sources are resized to it
    pub resolution: Resolution,

    /// Declared frames per second of the video file
    pub frame_rate: u32,

    /// Initial mute state (can be toggled while recording)
    pub mic_enabled: bool,

    pub output: OutputConfig,

    pub encoder: VideoEncoder,

    /// Pace the capture loop to wall-clock frame deadlines
    pub realtime: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source: VideoSourceKind::Webcam,
            resolution: Resolution::VGA,
            frame_rate: 20,
            mic_enabled: true,
            output: OutputConfig::default(),
            encoder: VideoEncoder::Raw,
            realtime: true,
        }
    }
}

impl SessionConfig {
    /// Check the invariants every session relies on
    pub fn validate(&self) -> RecorderResult<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(RecorderError::config(format!(
                "resolution must be non-zero, got {}",
                self.resolution
            )));
        }
        if self.resolution.width > Resolution::MAX_DIMENSION
            || self.resolution.height > Resolution::MAX_DIMENSION
        {
            return Err(RecorderError::config(format!(
                "resolution {} exceeds {}x{}",
                self.resolution,
                Resolution::MAX_DIMENSION,
                Resolution::MAX_DIMENSION
            )));
        }
        if self.frame_rate == 0 {
            return Err(RecorderError::config("frame_rate must be greater than zero"));
        }
        if self.output.video_file.is_empty() || self.output.audio_file.is_empty() {
            return Err(RecorderError::config("output file names must not be empty"));
        }
        if self.output.video_file == self.output.audio_file {
            return Err(RecorderError::config(
                "video and audio outputs must be different files",
            ));
        }
        Ok(())
    }

    pub fn video_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.video_file)
    }

    pub fn audio_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.audio_file)
    }
}

/// Partial changes layered over a base [`SessionConfig`]
///
/// Used by controllers that only want to change a few fields for one run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionOverrides {
    pub source: Option<VideoSourceKind>,
    pub resolution: Option<Resolution>,
    pub frame_rate: Option<u32>,
    pub mic_enabled: Option<bool>,
    pub encoder: Option<VideoEncoder>,
    pub realtime: Option<bool>,
    pub directory: Option<PathBuf>,
    pub video_file: Option<String>,
    pub audio_file: Option<String>,
}

impl SessionOverrides {
    pub fn apply(self, base: &SessionConfig) -> SessionConfig {
        let mut config = base.clone();
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
        if let Some(frame_rate) = self.frame_rate {
            config.frame_rate = frame_rate;
        }
        if let Some(mic_enabled) = self.mic_enabled {
            config.mic_enabled = mic_enabled;
        }
        if let Some(encoder) = self.encoder {
            config.encoder = encoder;
        }
        if let Some(realtime) = self.realtime {
            config.realtime = realtime;
        }
        if let Some(directory) = self.directory {
            config.output.directory = directory;
        }
        if let Some(video_file) = self.video_file {
            config.output.video_file = video_file;
        }
        if let Some(audio_file) = self.audio_file {
            config.output.audio_file = audio_file;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.video_path(), PathBuf::from("./output.avi"));
        assert_eq!(config.audio_path(), PathBuf::from("./audio.wav"));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let config = SessionConfig {
            resolution: Resolution::new(0, 480),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidConfig);

        let config = SessionConfig {
            frame_rate: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_oversized_resolution_rejected() {
        let config = SessionConfig {
            resolution: Resolution::new(Resolution::MAX_DIMENSION + 1, 480),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidConfig);

        let config = SessionConfig {
            resolution: Resolution::new(Resolution::MAX_DIMENSION, Resolution::MAX_DIMENSION),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_apply_on_top_of_base() {
        let base = SessionConfig::default();
        let overrides: SessionOverrides = serde_json::from_str(
            r#"{"source": "screen", "resolution": {"width": 1280, "height": 720}, "mic_enabled": false}"#,
        )
        .unwrap();

        let config = overrides.apply(&base);
        assert_eq!(config.source, VideoSourceKind::Screen);
        assert_eq!(config.resolution, Resolution::HD);
        assert!(!config.mic_enabled);
        assert_eq!(config.frame_rate, base.frame_rate);
        assert_eq!(config.output, base.output);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"frame_rate": 30}"#).unwrap();
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.source, VideoSourceKind::Webcam);
        assert!(config.realtime);
    }
}
