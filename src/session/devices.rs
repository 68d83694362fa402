//! Device selection for recording sessions
//!
//! A [`DeviceFactory`] opens the capture and output components for one
//! session. Frame sources are opened on the capture worker thread, so the
//! factory itself must be shareable across threads.

use crate::audio::{AudioCapture, AudioCaptureConfig, AudioSink, ToneCapture, WavAudioSink};
use crate::error::{RecorderError, RecorderResult};
use crate::video::{
    open_frame_sink, FrameSink, FrameSource, Resolution, TestPatternSource, VideoEncoder,
    VideoSourceKind,
};
use std::path::Path;

pub trait DeviceFactory: Send + Sync {
    /// Open (but do not start) the audio input
    fn audio_capture(&self, config: &AudioCaptureConfig) -> RecorderResult<Box<dyn AudioCapture>>;

    /// Open the video source, normalized to `resolution`
    fn frame_source(
        &self,
        kind: VideoSourceKind,
        resolution: Resolution,
    ) -> RecorderResult<Box<dyn FrameSource>>;

    /// Create the video container writer
    fn frame_sink(
        &self,
        encoder: VideoEncoder,
        path: &Path,
        frame_rate: u32,
        resolution: Resolution,
    ) -> RecorderResult<Box<dyn FrameSink>> {
        open_frame_sink(encoder, path, frame_rate, resolution)
    }

    fn audio_sink(&self) -> Box<dyn AudioSink> {
        Box::new(WavAudioSink)
    }

    fn name(&self) -> &str;
}

/// Real hardware: cpal microphone, nokhwa webcam, xcap screen
///
/// Each backend is behind a cargo feature; a backend that was compiled out
/// reports `DeviceUnavailable`.
#[derive(Debug, Clone, Default)]
pub struct NativeDevices {
    /// Camera index for the webcam source (0 = default)
    pub camera_index: u32,
}

impl DeviceFactory for NativeDevices {
    fn audio_capture(&self, config: &AudioCaptureConfig) -> RecorderResult<Box<dyn AudioCapture>> {
        #[cfg(feature = "mic")]
        {
            use crate::audio::MicrophoneCapture;
            Ok(Box::new(MicrophoneCapture::new(config.clone())))
        }

        #[cfg(not(feature = "mic"))]
        {
            let _ = config;
            Err(RecorderError::device(
                "microphone",
                "built without the `mic` feature",
            ))
        }
    }

    fn frame_source(
        &self,
        kind: VideoSourceKind,
        resolution: Resolution,
    ) -> RecorderResult<Box<dyn FrameSource>> {
        match kind {
            VideoSourceKind::Webcam => {
                #[cfg(feature = "webcam")]
                {
                    use crate::video::WebcamSource;
                    Ok(Box::new(WebcamSource::open(self.camera_index, resolution)?))
                }

                #[cfg(not(feature = "webcam"))]
                {
                    Err(RecorderError::device(
                        format!("webcam {}", self.camera_index),
                        "built without the `webcam` feature",
                    ))
                }
            }

            VideoSourceKind::Screen => {
                #[cfg(feature = "screen")]
                {
                    use crate::video::ScreenSource;
                    Ok(Box::new(ScreenSource::open_primary(resolution)?))
                }

                #[cfg(not(feature = "screen"))]
                {
                    Err(RecorderError::device(
                        "screen",
                        "built without the `screen` feature",
                    ))
                }
            }

            VideoSourceKind::TestPattern => Ok(Box::new(TestPatternSource::new(resolution))),
        }
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// Device-free stand-ins: a sine tone for the microphone and colour bars for
/// every video source
#[derive(Debug, Clone)]
pub struct SyntheticDevices {
    /// Frames the webcam stand-in yields before it is exhausted
    pub webcam_frames: Option<u64>,
    pub tone_frequency: f32,
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self {
            webcam_frames: None,
            tone_frequency: 440.0,
        }
    }
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the webcam stand-in run dry after `frames` frames
    pub fn with_webcam_frames(mut self, frames: u64) -> Self {
        self.webcam_frames = Some(frames);
        self
    }
}

impl DeviceFactory for SyntheticDevices {
    fn audio_capture(&self, config: &AudioCaptureConfig) -> RecorderResult<Box<dyn AudioCapture>> {
        Ok(Box::new(
            ToneCapture::new(config.clone()).with_frequency(self.tone_frequency),
        ))
    }

    fn frame_source(
        &self,
        kind: VideoSourceKind,
        resolution: Resolution,
    ) -> RecorderResult<Box<dyn FrameSource>> {
        let source = TestPatternSource::new(resolution);
        let source = match (kind, self.webcam_frames) {
            (VideoSourceKind::Webcam, Some(frames)) => source.with_limit(frames),
            _ => source,
        };
        Ok(Box::new(source))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
