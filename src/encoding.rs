use std::borrow::Cow;
use std::ffi::OsString;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gif::{Encoder, Frame, Repeat};
use image::ImageFormat;
use serde_json::json;

use crate::canvas::Canvas;
use crate::error_codes::{CodedError, ARTIFACT_WRITE_FAILED, EMPTY_FRAME_SEQUENCE};
use crate::quantize::IndexedCanvas;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Infinite,
    /// Number of extra plays after the first, as stored in the NETSCAPE2.0 block.
    Count(u16),
}

impl LoopMode {
    fn repeat(self) -> Repeat {
        match self {
            Self::Infinite => Repeat::Infinite,
            Self::Count(count) => Repeat::Finite(count),
        }
    }
}

/// GIF delays are centiseconds; `ms` rounds to the nearest one.
pub fn delay_centiseconds(duration_ms: u32) -> u16 {
    ((duration_ms + 5) / 10).min(u32::from(u16::MAX)) as u16
}

/// Assembles quantized frames into an animated GIF, each frame carrying its own
/// palette. Frame order and timing are kept exactly as supplied.
pub fn encode_sequence(
    frames: &[IndexedCanvas],
    duration_ms: u32,
    loop_mode: LoopMode,
) -> Result<Vec<u8>> {
    let Some(first) = frames.first() else {
        return Err(CodedError::run(
            EMPTY_FRAME_SEQUENCE,
            "refusing to encode an animation with zero frames",
        )
        .with_details(json!({ "duration_ms": duration_ms }))
        .into());
    };
    let width = u16::try_from(first.width)
        .with_context(|| format!("frame width {} exceeds the GIF limit", first.width))?;
    let height = u16::try_from(first.height)
        .with_context(|| format!("frame height {} exceeds the GIF limit", first.height))?;
    let delay = delay_centiseconds(duration_ms);

    let mut bytes = Vec::new();
    {
        let mut encoder = Encoder::new(&mut bytes, width, height, &[])
            .context("failed to start GIF stream")?;
        encoder
            .set_repeat(loop_mode.repeat())
            .context("failed to write GIF loop extension")?;

        for (index, indexed) in frames.iter().enumerate() {
            if indexed.width != first.width || indexed.height != first.height {
                anyhow::bail!(
                    "frame {} is {}x{}, expected {}x{}",
                    index,
                    indexed.width,
                    indexed.height,
                    first.width,
                    first.height
                );
            }
            let frame = Frame {
                width,
                height,
                delay,
                palette: Some(indexed.palette_bytes()),
                buffer: Cow::Borrowed(&indexed.indices),
                ..Frame::default()
            };
            encoder
                .write_frame(&frame)
                .with_context(|| format!("failed to encode frame {index}"))?;
        }
    }
    Ok(bytes)
}

/// Full-color PNG of a single canvas.
pub fn encode_single(canvas: &Canvas) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    canvas
        .to_image()
        .write_to(&mut cursor, ImageFormat::Png)
        .context("failed to encode PNG still")?;
    Ok(cursor.into_inner())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes `bytes` next to `path` and renames into place, so a failed write
/// never leaves a partial file at `path`.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp = temp_path(path);
    let failure = |stage: &str, error: std::io::Error| {
        let _ = fs::remove_file(&temp);
        CodedError::run(
            ARTIFACT_WRITE_FAILED,
            format!("failed to {stage} {}: {error}", path.display()),
        )
        .with_details(json!({ "path": path.display().to_string() }))
    };

    fs::write(&temp, bytes).map_err(|error| failure("write", error))?;
    fs::rename(&temp, path).map_err(|error| failure("finalize", error))?;
    Ok(())
}
