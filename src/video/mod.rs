pub mod avi;
pub mod ffmpeg;
pub mod frame;
pub mod pattern;
pub mod preview;
pub mod sink;
pub mod source;

#[cfg(feature = "screen")]
pub mod screen;
#[cfg(feature = "webcam")]
pub mod webcam;

pub use avi::{AviInfo, AviWriter};
pub use ffmpeg::{ffmpeg_available, FfmpegWriter};
pub use frame::{Resolution, VideoFrame};
pub use pattern::TestPatternSource;
pub use preview::{LatestFramePreview, NullPreview, PreviewSurface};
pub use sink::{open_frame_sink, FrameSink, VideoEncoder, VideoFileInfo};
pub use source::{FrameSource, VideoSourceKind};

#[cfg(feature = "screen")]
pub use screen::{list_displays, ScreenSource};
#[cfg(feature = "webcam")]
pub use webcam::{list_cameras, WebcamSource};
