use crate::session::{OutputConfig, SessionConfig};
use crate::video::{Resolution, VideoEncoder, VideoSourceKind};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Prefix for environment overrides, e.g. `MINI_RECORDER__RECORDER__FRAME_RATE=30`
pub const ENV_PREFIX: &str = "MINI_RECORDER";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub recorder: RecorderConfig,
    pub output: OutputSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "mini-recorder".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8085,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub source: VideoSourceKind,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub mic_enabled: bool,
    pub encoder: VideoEncoder,
    pub realtime: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            source: session.source,
            width: session.resolution.width,
            height: session.resolution.height,
            frame_rate: session.frame_rate,
            mic_enabled: session.mic_enabled,
            encoder: session.encoder,
            realtime: session.realtime,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Output directory; `~` is expanded
    pub directory: String,
    pub video_file: String,
    pub audio_file: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        let output = OutputConfig::default();
        Self {
            directory: output.directory.to_string_lossy().into_owned(),
            video_file: output.video_file,
            audio_file: output.audio_file,
        }
    }
}

impl Config {
    /// Load a config file (any format the `config` crate detects from the
    /// extension, TOML in practice) plus environment overrides
    pub fn load(path: &str) -> Result<Self> {
        Self::build(Some(path))
    }

    /// Defaults plus environment overrides, with an optional config file
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        Self::build(path)
    }

    fn build(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| match path {
                Some(path) => format!("Failed to load config from {}", path),
                None => "Failed to load config from environment".to_string(),
            })?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Session configuration described by the `[recorder]` and `[output]`
    /// sections
    pub fn session_config(&self) -> Result<SessionConfig> {
        let directory = shellexpand::tilde(&self.output.directory).into_owned();

        let config = SessionConfig {
            source: self.recorder.source,
            resolution: Resolution::new(self.recorder.width, self.recorder.height),
            frame_rate: self.recorder.frame_rate,
            mic_enabled: self.recorder.mic_enabled,
            output: OutputConfig {
                directory: PathBuf::from(directory),
                video_file: self.output.video_file.clone(),
                audio_file: self.output.audio_file.clone(),
            },
            encoder: self.recorder.encoder,
            realtime: self.recorder.realtime,
        };

        config.validate().context("Invalid [recorder] configuration")?;
        Ok(config)
    }
}
