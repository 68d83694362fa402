// Shared helpers for session integration tests
//
// ScriptedDevices opens a test pattern for video and a microphone whose
// callback the test drives by hand, so block counts are deterministic.

#![allow(dead_code)]

use mini_recorder::audio::{AudioCapture, AudioCaptureConfig, BlockCallback};
use mini_recorder::session::OutputConfig;
use mini_recorder::video::{
    open_frame_sink, FrameSink, FrameSource, TestPatternSource, VideoEncoder, VideoFileInfo,
    VideoFrame,
};
use mini_recorder::{
    DeviceFactory, RecorderError, RecorderResult, RecordingSession, Resolution, SessionConfig,
    SessionState, VideoSourceKind,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const BLOCK_LEN: usize = 882;

/// Test-side handle to the scripted microphone
#[derive(Clone, Default)]
pub struct ScriptedMic {
    callback: Arc<Mutex<Option<BlockCallback>>>,
    invocations: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<String>>>,
}

impl ScriptedMic {
    /// Invoke the registered callback `n` times; returns how many calls
    /// reached a running stream
    pub fn emit(&self, n: usize) -> usize {
        let block = vec![0.25f32; BLOCK_LEN];
        let mut guard = self.callback.lock();
        match guard.as_mut() {
            Some(callback) => {
                for _ in 0..n {
                    callback(&block);
                }
                self.invocations.fetch_add(n, Ordering::SeqCst);
                n
            }
            None => 0,
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.callback.lock().is_some()
    }

    /// Report a stream error, as a device would after being unplugged
    pub fn fail(&self, reason: &str) {
        *self.failure.lock() = Some(reason.to_string());
    }
}

struct ScriptedCapture {
    mic: ScriptedMic,
}

impl AudioCapture for ScriptedCapture {
    fn start(&mut self, on_block: BlockCallback) -> RecorderResult<()> {
        *self.mic.callback.lock() = Some(on_block);
        Ok(())
    }

    fn stop(&mut self) -> RecorderResult<()> {
        self.mic.callback.lock().take();
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.mic.is_open()
    }

    fn failure(&self) -> Option<String> {
        self.mic.failure.lock().clone()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Which component refuses to open
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Failure {
    #[default]
    None,
    Video,
    Audio,
}

#[derive(Clone, Default)]
pub struct ScriptedDevices {
    pub mic: ScriptedMic,
    /// Frames before the source is exhausted; unlimited when `None`
    pub frame_limit: Option<u64>,
    pub failure: Failure,
    /// Frames the video sink accepts before every write fails
    pub sink_capacity: Option<u64>,
    /// Delay before the frame source opens, like a slow camera
    pub open_delay: Option<Duration>,
}

impl ScriptedDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = failure;
        self
    }

    pub fn with_sink_capacity(mut self, frames: u64) -> Self {
        self.sink_capacity = Some(frames);
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }
}

/// Sink that stops accepting frames once `remaining` runs out
struct FullSink {
    inner: Box<dyn FrameSink>,
    path: PathBuf,
    remaining: u64,
}

impl FrameSink for FullSink {
    fn write(&mut self, frame: &VideoFrame) -> RecorderResult<()> {
        if self.remaining == 0 {
            return Err(RecorderError::write(&self.path, "No space left on device"));
        }
        self.remaining -= 1;
        self.inner.write(frame)
    }

    fn close(&mut self) -> RecorderResult<VideoFileInfo> {
        self.inner.close()
    }

    fn frames_written(&self) -> u64 {
        self.inner.frames_written()
    }
}

impl DeviceFactory for ScriptedDevices {
    fn audio_capture(&self, _config: &AudioCaptureConfig) -> RecorderResult<Box<dyn AudioCapture>> {
        if self.failure == Failure::Audio {
            return Err(RecorderError::device("microphone", "no default input device"));
        }
        Ok(Box::new(ScriptedCapture {
            mic: self.mic.clone(),
        }))
    }

    fn frame_source(
        &self,
        kind: VideoSourceKind,
        resolution: Resolution,
    ) -> RecorderResult<Box<dyn FrameSource>> {
        if let Some(delay) = self.open_delay {
            std::thread::sleep(delay);
        }
        if self.failure == Failure::Video {
            return Err(RecorderError::device(kind.to_string(), "device busy"));
        }
        let source = TestPatternSource::new(resolution);
        Ok(Box::new(match self.frame_limit {
            Some(frames) => source.with_limit(frames),
            None => source,
        }))
    }

    fn frame_sink(
        &self,
        encoder: VideoEncoder,
        path: &Path,
        frame_rate: u32,
        resolution: Resolution,
    ) -> RecorderResult<Box<dyn FrameSink>> {
        let sink = open_frame_sink(encoder, path, frame_rate, resolution)?;
        Ok(match self.sink_capacity {
            Some(frames) => Box::new(FullSink {
                inner: sink,
                path: path.to_path_buf(),
                remaining: frames,
            }),
            None => sink,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Small, fast session config writing into `dir`
pub fn test_config(dir: &Path, source: VideoSourceKind) -> SessionConfig {
    SessionConfig {
        source,
        resolution: Resolution::new(32, 24),
        frame_rate: 50,
        mic_enabled: true,
        output: OutputConfig {
            directory: dir.to_path_buf(),
            ..Default::default()
        },
        realtime: true,
        ..Default::default()
    }
}

pub fn new_session(config: &SessionConfig, devices: ScriptedDevices) -> RecordingSession {
    RecordingSession::new(config.clone(), Arc::new(devices))
}

/// Poll until `predicate` holds or the timeout expires
pub async fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    predicate()
}

pub async fn wait_for_frames(session: &RecordingSession, frames: u64) -> bool {
    wait_until(Duration::from_secs(10), || {
        session.stats().frames_written >= frames
    })
    .await
}

pub fn assert_idle(session: &RecordingSession) {
    assert_eq!(session.state(), SessionState::Idle);
}
