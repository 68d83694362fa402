//! Synthetic audio capture that generates a sine tone at real-time cadence.

use super::backend::{AudioCapture, AudioCaptureConfig, BlockCallback};
use crate::error::{RecorderError, RecorderResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Emits fixed-size sine blocks from its own thread, like a device would
pub struct ToneCapture {
    config: AudioCaptureConfig,
    frequency: f32,
    amplitude: f32,
    is_capturing: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ToneCapture {
    pub fn new(config: AudioCaptureConfig) -> Self {
        Self {
            config,
            frequency: 440.0,
            amplitude: 0.25,
            is_capturing: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }
}

impl AudioCapture for ToneCapture {
    fn start(&mut self, mut on_block: BlockCallback) -> RecorderResult<()> {
        if self.is_capturing.swap(true, Ordering::SeqCst) {
            return Err(RecorderError::InvalidState {
                operation: "start tone".to_string(),
                state: "capturing".to_string(),
            });
        }

        let block_len = self.config.samples_per_block().max(1);
        let block_interval = Duration::from_millis(self.config.block_duration_ms.max(1));
        let step = 2.0 * std::f32::consts::PI * self.frequency / self.config.sample_rate as f32;
        let amplitude = self.amplitude;
        let is_capturing = Arc::clone(&self.is_capturing);

        let handle = std::thread::Builder::new()
            .name("tone-capture".to_string())
            .spawn(move || {
                let mut phase = 0.0f32;
                let mut block = vec![0.0f32; block_len];
                let mut deadline = Instant::now();

                while is_capturing.load(Ordering::SeqCst) {
                    for sample in block.iter_mut() {
                        *sample = phase.sin() * amplitude;
                        phase = (phase + step) % (2.0 * std::f32::consts::PI);
                    }
                    on_block(&block);

                    deadline += block_interval;
                    let now = Instant::now();
                    if deadline > now {
                        std::thread::sleep(deadline - now);
                    }
                }
            })?;

        self.worker = Some(handle);
        info!(
            "Tone capture started ({}Hz, {} samples/block)",
            self.config.sample_rate, block_len
        );
        Ok(())
    }

    fn stop(&mut self) -> RecorderResult<()> {
        self.is_capturing.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Tone capture thread panicked");
            }
            info!("Tone capture stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "tone"
    }
}

impl Drop for ToneCapture {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_tone_capture_delivers_blocks_until_stopped() {
        let config = AudioCaptureConfig {
            block_duration_ms: 5,
            ..Default::default()
        };
        let expected_len = config.samples_per_block();
        let mut capture = ToneCapture::new(config);

        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        capture
            .start(Box::new(move |samples| {
                assert_eq!(samples.len(), expected_len);
                assert!(samples.iter().all(|s| s.abs() <= 0.25 + f32::EPSILON));
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        capture.stop().unwrap();
        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop > 0);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), after_stop, "no callbacks after stop");
        assert!(!capture.is_capturing());
    }

    #[test]
    fn test_tone_capture_double_start_fails() {
        let mut capture = ToneCapture::new(AudioCaptureConfig::default());
        capture.start(Box::new(|_| {})).unwrap();
        assert!(capture.start(Box::new(|_| {})).is_err());
        capture.stop().unwrap();
    }
}
