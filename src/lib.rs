pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod video;

pub use audio::{AudioBuffer, AudioCapture, AudioCaptureConfig, AudioFile, AudioSink, WavAudioSink};
pub use config::Config;
pub use error::{ErrorKind, RecorderError, RecorderResult};
pub use http::{create_router, AppState};
pub use session::{
    DeviceFactory, NativeDevices, RecordingOutput, RecordingSession, SessionConfig,
    SessionEvent, SessionOutcome, SessionState, SessionStats, StopReason, SyntheticDevices,
};
pub use video::{
    AviInfo, FrameSink, FrameSource, LatestFramePreview, PreviewSurface, Resolution,
    VideoEncoder, VideoFrame, VideoSourceKind,
};
