//! Microphone capture using cpal
//!
//! cpal streams are not `Send`, so the stream is built, played and dropped on
//! a dedicated thread. `stop()` joins that thread, which is what guarantees
//! no callback runs after it returns.

use super::backend::{AudioCapture, AudioCaptureConfig, BlockCallback};
use super::convert::{i16_to_f32, normalize_block, u16_to_f32};
use crate::error::{RecorderError, RecorderResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const DEVICE: &str = "microphone";

/// List the names of available audio input devices
pub fn list_input_devices() -> Vec<String> {
    let host = cpal::default_host();
    host.input_devices()
        .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
        .unwrap_or_default()
}

/// Default-input-device capture at 44.1kHz mono
pub struct MicrophoneCapture {
    config: AudioCaptureConfig,
    is_capturing: Arc<AtomicBool>,
    stream_error: Arc<Mutex<Option<String>>>,
    stream_thread: Option<JoinHandle<()>>,
}

impl MicrophoneCapture {
    pub fn new(config: AudioCaptureConfig) -> Self {
        Self {
            config,
            is_capturing: Arc::new(AtomicBool::new(false)),
            stream_error: Arc::new(Mutex::new(None)),
            stream_thread: None,
        }
    }
}

impl AudioCapture for MicrophoneCapture {
    fn start(&mut self, on_block: BlockCallback) -> RecorderResult<()> {
        if self.is_capturing.load(Ordering::SeqCst) {
            return Err(RecorderError::InvalidState {
                operation: "start microphone".to_string(),
                state: "capturing".to_string(),
            });
        }

        self.is_capturing.store(true, Ordering::SeqCst);
        *self.stream_error.lock() = None;

        let (ready_tx, ready_rx) = mpsc::channel::<RecorderResult<String>>();
        let is_capturing = Arc::clone(&self.is_capturing);
        let stream_error = Arc::clone(&self.stream_error);
        let target_rate = self.config.sample_rate;

        let handle = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let stream = match open_stream(target_rate, on_block, stream_error) {
                    Ok((stream, name)) => {
                        let _ = ready_tx.send(Ok(name));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Keep the stream alive while recording
                while is_capturing.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(10));
                }

                drop(stream);
                debug!("Microphone stream dropped");
            })?;

        match ready_rx.recv() {
            Ok(Ok(name)) => {
                info!("Microphone capture started: {}", name);
                self.stream_thread = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.is_capturing.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                self.is_capturing.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(RecorderError::device(DEVICE, "capture thread exited during start"))
            }
        }
    }

    fn stop(&mut self) -> RecorderResult<()> {
        self.is_capturing.store(false, Ordering::SeqCst);

        if let Some(handle) = self.stream_thread.take() {
            if handle.join().is_err() {
                error!("Microphone capture thread panicked");
            }
            info!("Microphone capture stopped");
        }

        match self.stream_error.lock().take() {
            Some(reason) => Err(RecorderError::device(DEVICE, reason)),
            None => Ok(()),
        }
    }

    fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    fn failure(&self) -> Option<String> {
        self.stream_error.lock().clone()
    }

    fn name(&self) -> &str {
        DEVICE
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        if self.stream_thread.is_some() {
            if let Err(e) = self.stop() {
                warn!("Microphone stream error on drop: {}", e);
            }
        }
    }
}

/// Prefer a native mono config at the target rate, else the device default
fn pick_stream_config(device: &Device, target_rate: u32) -> RecorderResult<SupportedStreamConfig> {
    let native = device.supported_input_configs().ok().and_then(|mut ranges| {
        ranges
            .find(|range| {
                range.channels() == 1
                    && range.min_sample_rate().0 <= target_rate
                    && range.max_sample_rate().0 >= target_rate
                    && matches!(
                        range.sample_format(),
                        SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                    )
            })
            .map(|range| range.with_sample_rate(SampleRate(target_rate)))
    });

    match native {
        Some(config) => Ok(config),
        None => device
            .default_input_config()
            .map_err(|e| RecorderError::device(DEVICE, format!("Failed to get audio config: {}", e))),
    }
}

fn open_stream(
    target_rate: u32,
    mut on_block: BlockCallback,
    stream_error: Arc<Mutex<Option<String>>>,
) -> RecorderResult<(Stream, String)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| RecorderError::device(DEVICE, "No default audio input device"))?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let supported = pick_stream_config(&device, target_rate)?;
    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = supported.into();
    let channels = stream_config.channels;
    let device_rate = stream_config.sample_rate.0;

    if channels != 1 || device_rate != target_rate {
        warn!(
            "Microphone does not support {}Hz mono, converting from {}Hz {}ch",
            target_rate, device_rate, channels
        );
    }

    info!(
        "Microphone stream config: format={:?}, sample_rate={}, channels={}",
        sample_format, device_rate, channels
    );

    let callback_count = Arc::new(AtomicU64::new(0));
    let failed = Arc::new(AtomicBool::new(false));

    let mut deliver = {
        let failed = Arc::clone(&failed);
        move |samples: Vec<f32>| {
            if failed.load(Ordering::Relaxed) {
                return;
            }
            let count = callback_count.fetch_add(1, Ordering::Relaxed);
            if count == 0 {
                info!("Microphone: first callback received");
            } else if count % 500 == 0 {
                debug!("Microphone: {} callbacks, {} samples this block", count, samples.len());
            }

            if channels == 1 && device_rate == target_rate {
                on_block(&samples);
            } else {
                on_block(&normalize_block(&samples, channels, device_rate, target_rate));
            }
        }
    };

    let on_error = move |err: cpal::StreamError| {
        error!("Microphone stream error: {}", err);
        failed.store(true, Ordering::Relaxed);
        stream_error.lock().get_or_insert_with(|| err.to_string());
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| deliver(data.to_vec()),
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                deliver(data.iter().map(|&s| i16_to_f32(s)).collect())
            },
            on_error,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                deliver(data.iter().map(|&s| u16_to_f32(s)).collect())
            },
            on_error,
            None,
        ),
        other => {
            return Err(RecorderError::device(
                DEVICE,
                format!("Unsupported microphone sample format: {:?}", other),
            ))
        }
    }
    .map_err(|e| RecorderError::device(DEVICE, format!("Failed to build audio stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| RecorderError::device(DEVICE, format!("Failed to start stream: {}", e)))?;

    Ok((stream, device_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_microphone_start_stop() {
        let mut capture = MicrophoneCapture::new(AudioCaptureConfig::default());
        capture.start(Box::new(|_| {})).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        capture.stop().unwrap();
        assert!(!capture.is_capturing());
    }
}
