//! FFmpeg-backed video writer
//!
//! Raw BGR frames are piped to an `ffmpeg` child process on stdin and encoded
//! as MPEG-4 Part 2 tagged `XVID` inside AVI.

use super::frame::{Resolution, VideoFrame};
use super::sink::{check_frame, FrameSink, VideoFileInfo};
use crate::error::{RecorderError, RecorderResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::{info, warn};

/// Check whether an `ffmpeg` binary is reachable on PATH
pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub struct FfmpegWriter {
    path: PathBuf,
    process: Option<Child>,
    stdin: Option<ChildStdin>,
    resolution: Resolution,
    frame_rate: u32,
    frames: u64,
    info: Option<VideoFileInfo>,
}

impl FfmpegWriter {
    pub fn spawn(path: &Path, frame_rate: u32, resolution: Resolution) -> RecorderResult<Self> {
        if frame_rate == 0 || resolution.is_empty() {
            return Err(RecorderError::config(format!(
                "cannot open video writer at {} and {} fps",
                resolution, frame_rate
            )));
        }

        let mut process = Command::new("ffmpeg")
            .args([
                "-y",                              // Overwrite output
                "-loglevel", "error",
                "-f", "rawvideo",                  // Raw frames on stdin
                "-pix_fmt", "bgr24",
                "-s", &resolution.to_string(),
                "-r", &frame_rate.to_string(),
                "-i", "-",
                "-c:v", "mpeg4",                   // MPEG-4 Part 2
                "-vtag", "XVID",
                "-q:v", "5",
                "-an",
            ])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RecorderError::write(path, format!("Failed to start ffmpeg: {}", e)))?;

        let stdin = process.stdin.take();

        info!(
            "Started ffmpeg video encoder: {} @ {} fps, output: {:?}",
            resolution, frame_rate, path
        );

        Ok(Self {
            path: path.to_path_buf(),
            process: Some(process),
            stdin,
            resolution,
            frame_rate,
            frames: 0,
            info: None,
        })
    }
}

impl FrameSink for FfmpegWriter {
    fn write(&mut self, frame: &VideoFrame) -> RecorderResult<()> {
        check_frame(self.resolution, frame)?;

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RecorderError::write(&self.path, "encoder already closed"))?;
        stdin
            .write_all(&frame.data)
            .map_err(|e| RecorderError::write(&self.path, format!("ffmpeg pipe: {}", e)))?;

        self.frames += 1;
        Ok(())
    }

    fn close(&mut self) -> RecorderResult<VideoFileInfo> {
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }

        drop(self.stdin.take());

        if let Some(process) = self.process.take() {
            let output = process
                .wait_with_output()
                .map_err(|e| RecorderError::write(&self.path, e))?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(RecorderError::write(
                    &self.path,
                    format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
                ));
            }
        }

        let info = VideoFileInfo {
            path: self.path.clone(),
            resolution: self.resolution,
            frame_rate: self.frame_rate,
            frame_count: self.frames,
        };
        info!(
            "Video encoding finished: {} frames, output: {:?}",
            self.frames, self.path
        );
        self.info = Some(info.clone());
        Ok(info)
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if self.process.is_some() {
            if let Err(e) = self.close() {
                warn!("Failed to finalize ffmpeg output on drop: {}", e);
            }
        }
    }
}
