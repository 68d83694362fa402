// Integration tests for configuration loading
//
// These write a TOML file into a temp directory and load it through Config.

use anyhow::Result;
use mini_recorder::{Config, Resolution, VideoEncoder, VideoSourceKind};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> Result<String> {
    let path = dir.path().join("mini-recorder.toml");
    fs::write(&path, contents)?;
    Ok(path.to_string_lossy().into_owned())
}

#[test]
fn test_load_full_config() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        r#"
[service]
name = "studio-recorder"

[service.http]
bind = "0.0.0.0"
port = 9000

[recorder]
source = "screen"
width = 1280
height = 720
frame_rate = 20
mic_enabled = false
encoder = "ffmpeg"
realtime = true

[output]
directory = "/tmp/recordings"
video_file = "take1.avi"
audio_file = "take1.wav"
"#,
    )?;

    let cfg = Config::load(&path)?;
    assert_eq!(cfg.service.name, "studio-recorder");
    assert_eq!(cfg.service.http.bind, "0.0.0.0");
    assert_eq!(cfg.service.http.port, 9000);

    let session = cfg.session_config()?;
    assert_eq!(session.source, VideoSourceKind::Screen);
    assert_eq!(session.resolution, Resolution::HD);
    assert_eq!(session.frame_rate, 20);
    assert!(!session.mic_enabled);
    assert_eq!(session.encoder, VideoEncoder::Ffmpeg);
    assert_eq!(session.video_path(), PathBuf::from("/tmp/recordings/take1.avi"));
    assert_eq!(session.audio_path(), PathBuf::from("/tmp/recordings/take1.wav"));

    Ok(())
}

#[test]
fn test_missing_sections_use_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        r#"
[recorder]
frame_rate = 15
"#,
    )?;

    let cfg = Config::load(&path)?;
    assert_eq!(cfg.service.http.port, 8085);

    let session = cfg.session_config()?;
    assert_eq!(session.frame_rate, 15);
    assert_eq!(session.source, VideoSourceKind::Webcam);
    assert_eq!(session.resolution, Resolution::VGA);
    assert_eq!(session.output.video_file, "output.avi");
    assert_eq!(session.output.audio_file, "audio.wav");
    assert!(session.mic_enabled);

    Ok(())
}

#[test]
fn test_home_directory_is_expanded() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        r#"
[output]
directory = "~/recordings"
"#,
    )?;

    let session = Config::load(&path)?.session_config()?;
    assert!(!session.output.directory.to_string_lossy().starts_with('~'));
    assert!(session.output.directory.ends_with("recordings"));

    Ok(())
}

#[test]
fn test_invalid_recorder_section_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        r#"
[recorder]
width = 0
"#,
    )?;

    let cfg = Config::load(&path)?;
    assert!(cfg.session_config().is_err());

    Ok(())
}

#[test]
fn test_unknown_source_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        r#"
[recorder]
source = "scanner"
"#,
    )?;

    assert!(Config::load(&path).is_err());
    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(Config::load("/nonexistent/mini-recorder.toml").is_err());
}
