use super::buffer::AudioBuffer;
use super::convert::f32_to_i16;
use crate::error::{RecorderError, RecorderResult};
use anyhow::{Context, Result};
use hound::{WavReader, WavWriter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes the session's audio buffer to disk once capture has stopped
pub trait AudioSink: Send {
    fn write(&mut self, path: &Path, buffer: &AudioBuffer, sample_rate: u32)
        -> RecorderResult<AudioFileInfo>;
}

/// Summary of a written audio file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioFileInfo {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub sample_count: usize,
    pub duration_secs: f64,
}

/// Mono 16-bit PCM WAV writer
#[derive(Debug, Default)]
pub struct WavAudioSink;

impl AudioSink for WavAudioSink {
    fn write(
        &mut self,
        path: &Path,
        buffer: &AudioBuffer,
        sample_rate: u32,
    ) -> RecorderResult<AudioFileInfo> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer =
            WavWriter::create(path, spec).map_err(|e| RecorderError::write(path, e))?;

        for block in buffer.blocks() {
            for &sample in &block.samples {
                writer
                    .write_sample(f32_to_i16(sample))
                    .map_err(|e| RecorderError::write(path, e))?;
            }
        }

        writer.finalize().map_err(|e| RecorderError::write(path, e))?;

        let sample_count = buffer.total_samples();
        let duration_secs = sample_count as f64 / sample_rate as f64;
        info!(
            "Audio saved: {} ({} blocks, {:.1}s)",
            path.display(),
            buffer.len(),
            duration_secs
        );

        Ok(AudioFileInfo {
            path: path.to_path_buf(),
            sample_rate,
            sample_count,
            duration_secs,
        })
    }
}

/// A WAV file read back from disk
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioBlock;

    #[test]
    fn test_wav_sink_concatenates_blocks() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("audio.wav");

        let mut buffer = AudioBuffer::new();
        buffer.push(AudioBlock::new(vec![0.5; 441]));
        buffer.push(AudioBlock::new(vec![-0.5; 441]));

        let info = WavAudioSink.write(&path, &buffer, 44_100)?;
        assert_eq!(info.sample_count, 882);
        assert!((info.duration_secs - 0.02).abs() < 1e-9);

        let audio = AudioFile::open(&path)?;
        assert_eq!(audio.sample_rate, 44_100);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.samples.len(), 882);
        assert!(audio.samples[..441].iter().all(|&s| s > 0));
        assert!(audio.samples[441..].iter().all(|&s| s < 0));
        Ok(())
    }

    #[test]
    fn test_wav_sink_unwritable_path() {
        let buffer = AudioBuffer::new();
        let err = WavAudioSink
            .write(Path::new("/nonexistent/dir/audio.wav"), &buffer, 44_100)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::WriteFailure);
    }

    #[test]
    fn test_audio_file_nonexistent() {
        assert!(AudioFile::open("/nonexistent/path/to/audio.wav").is_err());
    }
}
