//! Uncompressed RIFF AVI writer and header reader
//!
//! Layout written by [`AviWriter`]:
//!
//! ```text
//! RIFF 'AVI '
//!   LIST 'hdrl'
//!     avih            main header (frame period, total frames, size)
//!     LIST 'strl'
//!       strh 'vids'   stream header (rate/scale, length)
//!       strf          BITMAPINFOHEADER, 24-bit BI_RGB, bottom-up
//!   LIST 'movi'
//!     00db ...        one chunk per frame
//!   idx1              keyframe index, offsets relative to 'movi'
//! ```
//!
//! Frame counts and sizes are placeholders until [`FrameSink::close`] seeks
//! back and patches them. Every size field is 32 bits, so a file is capped
//! just under 4 GiB; a frame that would cross the cap is refused and the file
//! written so far stays playable.

use super::frame::{Resolution, VideoFrame, BYTES_PER_PIXEL};
use super::sink::{check_frame, FrameSink, VideoFileInfo};
use crate::error::{RecorderError, RecorderResult};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const AVIF_HASINDEX: u32 = 0x10;
const AVIIF_KEYFRAME: u32 = 0x10;
const FRAME_CHUNK_ID: &[u8; 4] = b"00db";

/// Largest value of the RIFF size field
const RIFF_LIMIT: u64 = u32::MAX as u64;

/// Byte offsets of header fields patched at close
#[derive(Debug, Clone, Copy)]
struct PatchOffsets {
    riff_size: u64,
    total_frames: u64,
    stream_length: u64,
    movi_size: u64,
    /// Position of the 'movi' fourcc (base for idx1 offsets)
    movi_start: u64,
}

/// Little-endian chunk builder
#[derive(Default)]
struct ChunkBuf(Vec<u8>);

impl ChunkBuf {
    fn fourcc(&mut self, id: &[u8; 4]) -> &mut Self {
        self.0.extend_from_slice(id);
        self
    }

    fn u32(&mut self, value: u32) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn u16(&mut self, value: u16) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn i32(&mut self, value: i32) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn pos(&self) -> u64 {
        self.0.len() as u64
    }
}

/// Native writer for uncompressed 24-bit AVI
pub struct AviWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    resolution: Resolution,
    frame_rate: u32,
    offsets: PatchOffsets,
    /// (offset relative to 'movi', chunk length) per frame
    index: Vec<(u32, u32)>,
    position: u64,
    /// Cap on the RIFF size field, checked before each frame
    byte_limit: u64,
    frame_bytes: u32,
    padded_row: Vec<u8>,
    info: Option<VideoFileInfo>,
}

impl AviWriter {
    /// Create `path` and write the AVI headers
    pub fn create(path: &Path, frame_rate: u32, resolution: Resolution) -> RecorderResult<Self> {
        if frame_rate == 0
            || resolution.is_empty()
            || resolution.width > Resolution::MAX_DIMENSION
            || resolution.height > Resolution::MAX_DIMENSION
        {
            return Err(RecorderError::config(format!(
                "cannot open video writer at {} and {} fps",
                resolution, frame_rate
            )));
        }

        let row_stride = (resolution.width as usize * BYTES_PER_PIXEL + 3) & !3;
        let frame_bytes = u32::try_from(row_stride as u64 * resolution.height as u64)
            .map_err(|_| RecorderError::config(format!("frame size {} is too large", resolution)))?;

        let file = File::create(path).map_err(|e| RecorderError::write(path, e))?;
        let mut writer = BufWriter::new(file);

        let (header, offsets) = build_header(resolution, frame_rate, frame_bytes);
        writer
            .write_all(&header)
            .map_err(|e| RecorderError::write(path, e))?;

        info!(
            "Video writer opened: {} ({} @ {} fps, uncompressed)",
            path.display(),
            resolution,
            frame_rate
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            resolution,
            frame_rate,
            offsets,
            index: Vec::new(),
            position: header.len() as u64,
            byte_limit: RIFF_LIMIT,
            frame_bytes,
            padded_row: vec![0u8; row_stride],
            info: None,
        })
    }

    /// RIFF size field once one more frame and its index entry are added
    fn riff_size_with_next_frame(&self) -> u64 {
        let idx1_len = 8 + (self.index.len() as u64 + 1) * 16;
        self.position + 8 + self.frame_bytes as u64 + idx1_len - 8
    }

    fn write_chunk(&mut self, frame: &VideoFrame) -> std::io::Result<()> {
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "writer already closed",
                ))
            }
        };

        let chunk_len = self.frame_bytes;
        let chunk_offset = size_field(self.position - self.offsets.movi_start)?;

        writer.write_all(FRAME_CHUNK_ID)?;
        writer.write_all(&chunk_len.to_le_bytes())?;

        // DIB rows are stored bottom-up
        let row_bytes = self.resolution.width as usize * BYTES_PER_PIXEL;
        for y in (0..self.resolution.height).rev() {
            self.padded_row[..row_bytes].copy_from_slice(frame.row(y));
            writer.write_all(&self.padded_row)?;
        }

        self.index.push((chunk_offset, chunk_len));
        self.position += 8 + chunk_len as u64;
        Ok(())
    }

    fn finish(&mut self) -> std::io::Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };

        let movi_end = self.position;

        let mut idx1 = ChunkBuf::default();
        idx1.fourcc(b"idx1").u32(size_field(self.index.len() as u64 * 16)?);
        for &(offset, len) in &self.index {
            idx1.fourcc(FRAME_CHUNK_ID)
                .u32(AVIIF_KEYFRAME)
                .u32(offset)
                .u32(len);
        }
        writer.write_all(&idx1.0)?;
        let file_end = movi_end + idx1.pos();

        let frames = size_field(self.index.len() as u64)?;
        patch_u32(&mut writer, self.offsets.riff_size, size_field(file_end - 8)?)?;
        patch_u32(&mut writer, self.offsets.total_frames, frames)?;
        patch_u32(&mut writer, self.offsets.stream_length, frames)?;
        patch_u32(
            &mut writer,
            self.offsets.movi_size,
            size_field(movi_end - self.offsets.movi_start)?,
        )?;

        writer.seek(SeekFrom::End(0))?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }
}

impl FrameSink for AviWriter {
    fn write(&mut self, frame: &VideoFrame) -> RecorderResult<()> {
        check_frame(self.resolution, frame)?;

        let riff_size = self.riff_size_with_next_frame();
        if riff_size > self.byte_limit {
            warn!(
                "Video file {} full after {} frames",
                self.path.display(),
                self.index.len()
            );
            return Err(RecorderError::write(
                &self.path,
                format!(
                    "uncompressed AVI would exceed {} bytes; use the ffmpeg encoder for long recordings",
                    self.byte_limit
                ),
            ));
        }

        self.write_chunk(frame)
            .map_err(|e| RecorderError::write(&self.path, e))
    }

    fn close(&mut self) -> RecorderResult<VideoFileInfo> {
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }

        self.finish()
            .map_err(|e| RecorderError::write(&self.path, e))?;

        let info = VideoFileInfo {
            path: self.path.clone(),
            resolution: self.resolution,
            frame_rate: self.frame_rate,
            frame_count: self.index.len() as u64,
        };
        info!(
            "Video saved: {} ({} frames)",
            self.path.display(),
            info.frame_count
        );
        self.info = Some(info.clone());
        Ok(info)
    }

    fn frames_written(&self) -> u64 {
        self.index.len() as u64
    }
}

impl Drop for AviWriter {
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(e) = self.finish() {
                warn!("Failed to finalize AVI on drop: {}", e);
            }
        }
    }
}

fn size_field(value: u64) -> std::io::Result<u32> {
    u32::try_from(value).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{} does not fit a RIFF size field", value),
        )
    })
}

fn patch_u32(writer: &mut BufWriter<File>, offset: u64, value: u32) -> std::io::Result<()> {
    writer.seek(SeekFrom::Start(offset))?;
    writer.write_all(&value.to_le_bytes())
}

fn build_header(resolution: Resolution, frame_rate: u32, frame_bytes: u32) -> (Vec<u8>, PatchOffsets) {
    let mut buf = ChunkBuf::default();

    buf.fourcc(b"RIFF");
    let riff_size = buf.pos();
    buf.u32(0).fourcc(b"AVI ");

    // hdrl: 4 + (8 + 56) + (8 + 4 + (8 + 56) + (8 + 40))
    buf.fourcc(b"LIST").u32(192).fourcc(b"hdrl");

    buf.fourcc(b"avih").u32(56);
    buf.u32(1_000_000 / frame_rate) // dwMicroSecPerFrame
        .u32(frame_bytes.saturating_mul(frame_rate)) // dwMaxBytesPerSec
        .u32(0) // dwPaddingGranularity
        .u32(AVIF_HASINDEX);
    let total_frames = buf.pos();
    buf.u32(0) // dwTotalFrames
        .u32(0) // dwInitialFrames
        .u32(1) // dwStreams
        .u32(frame_bytes) // dwSuggestedBufferSize
        .u32(resolution.width)
        .u32(resolution.height)
        .u32(0)
        .u32(0)
        .u32(0)
        .u32(0);

    buf.fourcc(b"LIST").u32(116).fourcc(b"strl");

    buf.fourcc(b"strh").u32(56);
    buf.fourcc(b"vids")
        .fourcc(b"DIB ")
        .u32(0) // dwFlags
        .u16(0) // wPriority
        .u16(0) // wLanguage
        .u32(0) // dwInitialFrames
        .u32(1) // dwScale
        .u32(frame_rate) // dwRate
        .u32(0); // dwStart
    let stream_length = buf.pos();
    buf.u32(0) // dwLength
        .u32(frame_bytes) // dwSuggestedBufferSize
        .u32(u32::MAX) // dwQuality (-1 = default)
        .u32(0) // dwSampleSize
        .u16(0)
        .u16(0)
        .u16(resolution.width as u16)
        .u16(resolution.height as u16);

    buf.fourcc(b"strf").u32(40);
    buf.u32(40) // biSize
        .i32(resolution.width as i32)
        .i32(resolution.height as i32) // positive = bottom-up
        .u16(1) // biPlanes
        .u16(24) // biBitCount
        .u32(0) // BI_RGB
        .u32(frame_bytes)
        .u32(0)
        .u32(0)
        .u32(0)
        .u32(0);

    buf.fourcc(b"LIST");
    let movi_size = buf.pos();
    buf.u32(0);
    let movi_start = buf.pos();
    buf.fourcc(b"movi");

    let offsets = PatchOffsets {
        riff_size,
        total_frames,
        stream_length,
        movi_size,
        movi_start,
    };
    (buf.0, offsets)
}

/// Header information read back from an AVI file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AviInfo {
    pub width: u32,
    pub height: u32,
    /// dwRate / dwScale of the video stream
    pub frame_rate: f64,
    /// dwTotalFrames from the main header
    pub total_frames: u32,
    /// dwLength from the video stream header
    pub stream_length: u32,
    /// Frame chunks actually present in 'movi'
    pub frame_chunks: u32,
    pub bit_count: u16,
    /// Codec fourcc from the stream header (e.g. "DIB ", "XVID")
    pub handler: String,
}

impl AviInfo {
    /// Parse the headers of `path` and count its frame chunks
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut reader = BufReader::new(file);

        let mut riff = [0u8; 12];
        reader.read_exact(&mut riff).context("File too short for RIFF header")?;
        if &riff[0..4] != b"RIFF" || &riff[8..12] != b"AVI " {
            bail!("{} is not an AVI file", path.display());
        }

        let mut info = AviInfo {
            width: 0,
            height: 0,
            frame_rate: 0.0,
            total_frames: 0,
            stream_length: 0,
            frame_chunks: 0,
            bit_count: 0,
            handler: String::new(),
        };
        let mut saw_header = false;

        while let Some((id, size)) = read_chunk_header(&mut reader)? {
            let padded = size as u64 + (size as u64 & 1);
            if &id == b"LIST" {
                let mut list_type = [0u8; 4];
                reader.read_exact(&mut list_type)?;
                match &list_type {
                    b"hdrl" => {
                        let mut body = vec![0u8; (size as usize).saturating_sub(4)];
                        reader.read_exact(&mut body)?;
                        parse_hdrl(&body, &mut info)?;
                        saw_header = true;
                        reader.seek(SeekFrom::Current((padded - size as u64) as i64))?;
                    }
                    b"movi" => {
                        info.frame_chunks = count_frame_chunks(&mut reader, (size as u64).saturating_sub(4))?;
                        reader.seek(SeekFrom::Current((padded - size as u64) as i64))?;
                    }
                    _ => {
                        reader.seek(SeekFrom::Current(padded as i64 - 4))?;
                    }
                }
            } else {
                reader.seek(SeekFrom::Current(padded as i64))?;
            }
        }

        if !saw_header {
            bail!("{} has no AVI header list", path.display());
        }
        Ok(info)
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

fn read_chunk_header<R: Read>(reader: &mut R) -> Result<Option<([u8; 4], u32)>> {
    let mut header = [0u8; 8];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let id = [header[0], header[1], header[2], header[3]];
    let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    Ok(Some((id, size)))
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

/// Walk the sub-chunks of an in-memory list body
fn sub_chunks(body: &[u8]) -> Vec<([u8; 4], &[u8])> {
    let mut chunks = Vec::new();
    let mut pos = 0usize;
    while pos + 8 <= body.len() {
        let id = [body[pos], body[pos + 1], body[pos + 2], body[pos + 3]];
        let size = le_u32(body, pos + 4) as usize;
        let start = pos + 8;
        let end = (start + size).min(body.len());
        chunks.push((id, &body[start..end]));
        pos = start + size + (size & 1);
    }
    chunks
}

fn parse_hdrl(body: &[u8], info: &mut AviInfo) -> Result<()> {
    for (id, data) in sub_chunks(body) {
        match &id {
            b"avih" if data.len() >= 40 => {
                info.total_frames = le_u32(data, 16);
                info.width = le_u32(data, 32);
                info.height = le_u32(data, 36);
            }
            b"LIST" if data.len() >= 4 && &data[0..4] == b"strl" => {
                parse_strl(&data[4..], info);
            }
            _ => {}
        }
    }
    if info.width == 0 || info.height == 0 {
        bail!("AVI main header has no frame size");
    }
    Ok(())
}

fn parse_strl(body: &[u8], info: &mut AviInfo) {
    let mut is_video = false;
    for (id, data) in sub_chunks(body) {
        match &id {
            b"strh" if data.len() >= 36 && &data[0..4] == b"vids" => {
                is_video = true;
                info.handler = String::from_utf8_lossy(&data[4..8]).to_string();
                let scale = le_u32(data, 20);
                let rate = le_u32(data, 24);
                info.frame_rate = if scale == 0 { 0.0 } else { rate as f64 / scale as f64 };
                info.stream_length = le_u32(data, 32);
            }
            b"strf" if is_video && data.len() >= 16 => {
                info.bit_count = le_u16(data, 14);
            }
            _ => {}
        }
    }
}

fn count_frame_chunks<R: Read + Seek>(reader: &mut R, mut remaining: u64) -> Result<u32> {
    let mut frames = 0u32;
    while remaining >= 8 {
        let Some((id, size)) = read_chunk_header(reader)? else {
            break;
        };
        let padded = size as u64 + (size as u64 & 1);
        if &id[2..4] == b"db" || &id[2..4] == b"dc" {
            frames += 1;
        }
        reader.seek(SeekFrom::Current(padded as i64))?;
        remaining = remaining.saturating_sub(8 + padded);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let (header, offsets) = build_header(Resolution::VGA, 20, 640 * 3 * 480);
        assert_eq!(header.len(), 224);
        assert_eq!(offsets.movi_start, 220);
        assert_eq!(&header[24..28], b"avih");
        assert_eq!(&header[88..92], b"LIST");
        assert_eq!(&header[96..100], b"strl");
        assert_eq!(&header[164..168], b"strf");
        assert_eq!(&header[offsets.movi_start as usize..][..4], b"movi");
        assert_eq!(le_u32(&header, 32), 50_000);
    }

    #[test]
    fn test_write_and_read_back() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.avi");
        let res = Resolution::new(5, 3);

        let mut writer = AviWriter::create(&path, 20, res)?;
        for i in 0..4u8 {
            writer.write(&VideoFrame::solid(res, [i, i, i]))?;
        }
        let file_info = writer.close()?;
        assert_eq!(file_info.frame_count, 4);

        let info = AviInfo::read(&path)?;
        assert_eq!(info.resolution(), res);
        assert_eq!(info.frame_rate, 20.0);
        assert_eq!(info.total_frames, 4);
        assert_eq!(info.stream_length, 4);
        assert_eq!(info.frame_chunks, 4);
        assert_eq!(info.bit_count, 24);
        assert_eq!(info.handler, "DIB ");

        // 5 px * 3 bytes = 15, padded to 16 per row
        let expected_len = 224 + 4 * (8 + 16 * 3) + 8 + 4 * 16;
        assert_eq!(std::fs::metadata(&path)?.len(), expected_len as u64);
        Ok(())
    }

    #[test]
    fn test_rows_are_bottom_up() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rows.avi");
        let res = Resolution::new(4, 2);

        let mut data = vec![0u8; res.frame_bytes()];
        data[..12].fill(255); // top row white
        let frame = VideoFrame::new(4, 2, data)?;

        let mut writer = AviWriter::create(&path, 10, res)?;
        writer.write(&frame)?;
        writer.close()?;

        let bytes = std::fs::read(&path)?;
        let pixels = &bytes[224 + 8..224 + 8 + 24];
        assert!(pixels[..12].iter().all(|&b| b == 0), "bottom row first");
        assert!(pixels[12..].iter().all(|&b| b == 255));
        Ok(())
    }

    #[test]
    fn test_rejects_mismatched_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut writer = AviWriter::create(&dir.path().join("bad.avi"), 20, Resolution::new(4, 4))?;
        let err = writer
            .write(&VideoFrame::solid(Resolution::new(8, 8), [0, 0, 0]))
            .unwrap_err();
        assert!(matches!(err, RecorderError::InvalidFrame { .. }));
        assert_eq!(writer.frames_written(), 0);
        Ok(())
    }

    #[test]
    fn test_close_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("twice.avi");
        let mut writer = AviWriter::create(&path, 30, Resolution::new(2, 2))?;
        writer.write(&VideoFrame::solid(Resolution::new(2, 2), [1, 2, 3]))?;
        let first = writer.close()?;
        let second = writer.close()?;
        assert_eq!(first, second);
        assert!(writer.write(&VideoFrame::solid(Resolution::new(2, 2), [1, 2, 3])).is_err());
        Ok(())
    }

    #[test]
    fn test_frame_past_size_limit_is_refused() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("full.avi");
        let res = Resolution::new(5, 3);
        let frame = VideoFrame::solid(res, [9, 9, 9]);

        // Header 224, then 56 bytes per chunk and 16 per index entry
        let mut writer = AviWriter::create(&path, 20, res)?;
        writer.byte_limit = 224 + 3 * 72;
        for _ in 0..3 {
            writer.write(&frame)?;
        }

        let err = writer.write(&frame).unwrap_err();
        assert!(matches!(err, RecorderError::WriteFailure { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::WriteFailure);
        assert_eq!(writer.frames_written(), 3);

        assert_eq!(writer.close()?.frame_count, 3);
        let bytes = std::fs::read(&path)?;
        assert_eq!(le_u32(&bytes, 4) as usize, bytes.len() - 8);
        assert_eq!(le_u32(&bytes, 4) as u64, writer.byte_limit);

        let info = AviInfo::read(&path)?;
        assert_eq!(info.frame_chunks, 3);
        assert_eq!(info.total_frames, 3);
        Ok(())
    }

    #[test]
    fn test_default_limit_fits_size_field() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let writer = AviWriter::create(&dir.path().join("hd.avi"), 20, Resolution::HD)?;
        assert_eq!(writer.byte_limit, u32::MAX as u64);
        assert_eq!(writer.frame_bytes, 1280 * 3 * 720);
        assert!(writer.riff_size_with_next_frame() < writer.byte_limit);
        Ok(())
    }

    #[test]
    fn test_oversized_resolution_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let res = Resolution::new(70_000, 2);
        let err = AviWriter::create(&dir.path().join("wide.avi"), 20, res).err().unwrap();
        assert!(matches!(err, RecorderError::InvalidConfig { .. }));
    }

    #[test]
    fn test_read_rejects_non_avi() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("not.avi");
        std::fs::write(&path, b"RIFF\x04\x00\x00\x00WAVE")?;
        assert!(AviInfo::read(&path).is_err());
        Ok(())
    }
}
