//! Capture worker: the video loop and session finalization
//!
//! Everything here runs on one dedicated thread per session. Frame sources
//! are opened on that thread because camera handles are usually not `Send`.

use super::config::SessionConfig;
use super::devices::DeviceFactory;
use super::state::{SessionState, Shared};
use super::stats::{RecordingOutput, SessionEvent, SessionOutcome, StopReason};
use crate::audio::{handoff, AudioCapture, AudioCaptureConfig, BlockConsumer, AUDIO_SAMPLE_RATE};
use crate::error::{RecorderError, RecorderResult};
use crate::video::{FrameSink, FrameSource, PreviewSurface};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Sleeps the loop to the next frame deadline; never sleeps when behind
pub(crate) struct FramePacer {
    interval: Duration,
    next: Instant,
    enabled: bool,
}

impl FramePacer {
    pub fn new(frame_rate: u32, enabled: bool) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64),
            next: Instant::now(),
            enabled,
        }
    }

    pub fn wait(&mut self) {
        if !self.enabled {
            return;
        }

        self.next += self.interval;
        let now = Instant::now();
        if self.next > now {
            std::thread::sleep(self.next - now);
        } else {
            // Behind schedule: restart the cadence from now instead of bursting
            self.next = now;
        }
    }
}

/// Components opened for one session
struct Devices {
    source: Box<dyn FrameSource>,
    sink: Box<dyn FrameSink>,
    audio: Box<dyn AudioCapture>,
    blocks: BlockConsumer,
}

pub(crate) struct CaptureWorker {
    pub session_id: Uuid,
    pub config: SessionConfig,
    pub factory: Arc<dyn DeviceFactory>,
    pub preview: Arc<dyn PreviewSurface>,
    pub shared: Arc<Shared>,
}

impl CaptureWorker {
    /// Open every device, report the result through `ready`, then run the
    /// loop and finalize. On open failure nothing is left running and the
    /// session stays Idle.
    pub fn run(self, ready: oneshot::Sender<RecorderResult<()>>) {
        let devices = match self.open() {
            Ok(devices) => devices,
            Err(e) => {
                error!("Failed to open capture devices: {}", e);
                let _ = ready.send(Err(e));
                return;
            }
        };

        self.shared.reset();
        self.shared.set_state(SessionState::Capturing);
        self.shared.capturing.store(true, Ordering::SeqCst);
        info!(
            "Recording session {} capturing: {} {} @ {} fps (source: {})",
            self.session_id,
            self.config.source,
            self.config.resolution,
            self.config.frame_rate,
            devices.source.name()
        );

        if ready.send(Ok(())).is_err() {
            // Nobody is waiting for us any more; finalize immediately
            self.shared.stop_requested.store(true, Ordering::SeqCst);
        }

        let Devices {
            mut source,
            mut sink,
            audio,
            blocks,
        } = devices;

        let result = self.capture_loop(source.as_mut(), sink.as_mut(), audio.as_ref());
        drop(source);

        let outcome = self.finalize(result, sink, audio, blocks);
        self.publish(outcome);
    }

    fn open(&self) -> RecorderResult<Devices> {
        let config = &self.config;

        let source = self
            .factory
            .frame_source(config.source, config.resolution)?;

        // The stream is opened even when muted so that unmuting mid-session
        // takes effect on the next block.
        let audio_config = AudioCaptureConfig::default();
        let mut audio = self.factory.audio_capture(&audio_config)?;

        let (producer, blocks) = handoff();
        let shared = Arc::clone(&self.shared);
        let mut callbacks: u64 = 0;
        audio.start(Box::new(move |samples: &[f32]| {
            callbacks += 1;
            if callbacks % 500 == 0 {
                debug!("Audio callback #{} ({} samples)", callbacks, samples.len());
            }

            if !shared.capturing.load(Ordering::SeqCst) || !shared.mic_enabled.load(Ordering::SeqCst) {
                return;
            }

            if producer.push(samples) {
                shared.audio_blocks.fetch_add(1, Ordering::SeqCst);
                shared
                    .audio_samples
                    .fetch_add(samples.len() as u64, Ordering::SeqCst);
            }
        }))?;

        if let Some(parent) = config.video_path().parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    let _ = audio.stop();
                    return Err(RecorderError::write(parent, e));
                }
            }
        }

        let sink = match self.factory.frame_sink(
            config.encoder,
            &config.video_path(),
            config.frame_rate,
            config.resolution,
        ) {
            Ok(sink) => sink,
            Err(e) => {
                let _ = audio.stop();
                return Err(e);
            }
        };

        Ok(Devices {
            source,
            sink,
            audio,
            blocks,
        })
    }

    fn capture_loop(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        audio: &dyn AudioCapture,
    ) -> RecorderResult<StopReason> {
        let mut pacer = FramePacer::new(self.config.frame_rate, self.config.realtime);

        loop {
            let frame = match source.next_frame()? {
                Some(frame) => frame,
                None => {
                    info!("Frame source {} exhausted", source.name());
                    return Ok(StopReason::SourceExhausted);
                }
            };

            sink.write(&frame)?;
            self.shared.frames_written.fetch_add(1, Ordering::SeqCst);
            self.preview.render(&frame);

            if let Some(reason) = audio.failure() {
                return Err(RecorderError::device(audio.name(), reason));
            }

            if self.shared.stop_requested.load(Ordering::SeqCst) {
                return Ok(StopReason::Requested);
            }

            pacer.wait();
        }
    }

    fn finalize(
        &self,
        result: RecorderResult<StopReason>,
        mut sink: Box<dyn FrameSink>,
        mut audio: Box<dyn AudioCapture>,
        blocks: BlockConsumer,
    ) -> SessionOutcome {
        self.shared.set_state(SessionState::Finalizing);
        self.shared.capturing.store(false, Ordering::SeqCst);
        info!("Recording session {} finalizing", self.session_id);

        let mut failure: Option<RecorderError> = None;
        let stop_reason = match result {
            Ok(reason) => reason,
            Err(e) => {
                error!("Capture loop failed: {}", e);
                failure = Some(e);
                StopReason::Requested
            }
        };

        let video = sink.close();
        drop(sink);

        // Returns only once the callback can no longer run
        if let Err(e) = audio.stop() {
            error!("Audio capture failed: {}", e);
            failure.get_or_insert(e);
        }
        drop(audio);

        let buffer = blocks.drain();
        let audio_path = if buffer.is_empty() {
            warn!("No audio captured; skipping audio file");
            None
        } else {
            let path = self.config.audio_path();
            match self.factory.audio_sink().write(&path, &buffer, AUDIO_SAMPLE_RATE) {
                Ok(info) => Some(info.path),
                Err(e) => {
                    error!("Failed to write audio: {}", e);
                    failure.get_or_insert(e);
                    None
                }
            }
        };

        let video = match video {
            Ok(video) => video,
            Err(e) => {
                error!("Failed to finalize video: {}", e);
                return self.failed(failure.unwrap_or(e));
            }
        };

        if let Some(e) = failure {
            return self.failed(e);
        }

        let stats = self.shared.stats();
        SessionOutcome::Completed(RecordingOutput {
            session_id: self.session_id,
            video_path: video.path,
            audio_path,
            frames_written: video.frame_count,
            audio_blocks: buffer.len(),
            audio_samples: buffer.total_samples(),
            started_at: stats.started_at.unwrap_or_else(chrono::Utc::now),
            duration_secs: stats.duration_secs,
            stop_reason,
        })
    }

    fn failed(&self, e: RecorderError) -> SessionOutcome {
        SessionOutcome::Failed {
            session_id: self.session_id,
            kind: e.kind(),
            message: e.to_string(),
        }
    }

    fn publish(&self, outcome: SessionOutcome) {
        *self.shared.ended.lock() = Some(Instant::now());

        match &outcome {
            SessionOutcome::Completed(output) => info!(
                "Recording session {} completed: {} frames, {} audio blocks ({:?})",
                self.session_id, output.frames_written, output.audio_blocks, output.stop_reason
            ),
            SessionOutcome::Failed { kind, message, .. } => error!(
                "Recording session {} failed ({}): {}",
                self.session_id, kind, message
            ),
        }

        *self.shared.last_outcome.lock() = Some(outcome.clone());
        self.shared.set_state(SessionState::Idle);

        // No subscribers is fine
        let _ = self.shared.events.send(SessionEvent {
            session_id: self.session_id,
            outcome,
        });
    }
}
