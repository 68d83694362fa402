use crate::error::RecorderResult;
use std::time::Duration;

/// Sample rate every capture backend delivers to the session
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Audio sample block delivered by one callback invocation (mono, f32)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    /// Raw audio samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration of this block at the given sample rate
    pub fn duration(&self, sample_rate: u32) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / sample_rate as f64)
    }
}

/// Configuration for an audio capture backend
#[derive(Debug, Clone)]
pub struct AudioCaptureConfig {
    /// Target sample rate (backends resample if the device differs)
    pub sample_rate: u32,
    /// Target channel count, always mono for recordings
    pub channels: u16,
    /// Preferred block size in milliseconds (affects callback cadence)
    pub block_duration_ms: u64,
}

impl Default for AudioCaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: AUDIO_SAMPLE_RATE,
            channels: 1,
            block_duration_ms: 20,
        }
    }
}

impl AudioCaptureConfig {
    pub fn samples_per_block(&self) -> usize {
        (self.sample_rate as u64 * self.block_duration_ms / 1000) as usize * self.channels as usize
    }
}

/// Callback invoked from the capture thread with each new block of samples
pub type BlockCallback = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// Audio capture backend trait
///
/// Implementations:
/// - `MicrophoneCapture`: cpal default input device (feature `mic`)
/// - `ToneCapture`: synthetic sine generator for device-free runs and tests
pub trait AudioCapture: Send {
    /// Open the input stream and start invoking `on_block` from the backend's
    /// own thread. Fails with `DeviceUnavailable` if the device cannot open.
    fn start(&mut self, on_block: BlockCallback) -> RecorderResult<()>;

    /// Close the stream. After this returns `on_block` is never invoked again.
    fn stop(&mut self) -> RecorderResult<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Stream error reported by the device while capturing, if any
    fn failure(&self) -> Option<String> {
        None
    }

    /// Get backend name for logging
    fn name(&self) -> &str;
}
