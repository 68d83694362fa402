pub mod backend;
pub mod buffer;
pub mod convert;
pub mod file;
pub mod tone;

#[cfg(feature = "mic")]
pub mod microphone;

pub use backend::{AudioBlock, AudioCapture, AudioCaptureConfig, BlockCallback, AUDIO_SAMPLE_RATE};
pub use buffer::{handoff, AudioBuffer, BlockConsumer, BlockProducer};
pub use file::{AudioFile, AudioFileInfo, AudioSink, WavAudioSink};
pub use tone::ToneCapture;

#[cfg(feature = "mic")]
pub use microphone::{list_input_devices, MicrophoneCapture};
