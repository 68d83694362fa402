//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - Frame acquisition, container writing and preview on a capture worker
//! - Microphone blocks handed off from the audio thread, gated by mute state
//! - Finalization of the video and audio files
//! - Session statistics, state and the end-of-session notification

mod config;
mod devices;
mod session;
mod state;
mod stats;
mod worker;

pub use config::{OutputConfig, SessionConfig, SessionOverrides};
pub use devices::{DeviceFactory, NativeDevices, SyntheticDevices};
pub use session::RecordingSession;
pub use state::SessionState;
pub use stats::{RecordingOutput, SessionEvent, SessionOutcome, SessionStats, StopReason};
