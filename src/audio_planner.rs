use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::errors::PlanError;
use crate::media::MediaBackend;

// @module: Fixed-window chunk planning over the source audio

/// One planned time window, before any media has been cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkWindow {
    /// 0-based position in the plan
    pub sequence: usize,
    /// Absolute offset of the window start, in seconds
    pub offset_secs: f64,
    /// Window length in seconds; only the last window may be shorter
    pub duration_secs: f64,
}

/// A planned window with its extracted audio, ready for one recognition call.
///
/// Consumed exactly once by the transcription worker; the temporary media is
/// deleted after a successful merge unless retention is requested.
#[derive(Debug, Clone)]
pub struct ChunkDescriptor {
    pub sequence: usize,
    /// Absolute offset applied later during segment reconciliation
    pub offset_secs: f64,
    pub duration_secs: f64,
    /// Path of the chunk's temporary audio file
    pub media: PathBuf,
}

/// Divide a total duration into fixed-size windows.
///
/// Window `i` covers `[i*m*60, min((i+1)*m*60, total))` for chunk size `m`
/// minutes; the last window may be shorter but never longer, and the window
/// durations always sum to the total.
pub fn plan(total_duration_secs: f64, chunk_minutes: u32) -> Result<Vec<ChunkWindow>, PlanError> {
    if total_duration_secs <= 0.0 {
        return Err(PlanError::EmptyInput {
            duration_secs: total_duration_secs,
        });
    }

    let window_secs = f64::from(chunk_minutes) * 60.0;
    let mut windows = Vec::new();
    let mut offset = 0.0;
    while offset < total_duration_secs {
        let duration = window_secs.min(total_duration_secs - offset);
        windows.push(ChunkWindow {
            sequence: windows.len(),
            offset_secs: offset,
            duration_secs: duration,
        });
        offset += window_secs;
    }

    debug!(
        "Planned {} windows of up to {} minutes over {:.1}s",
        windows.len(),
        chunk_minutes,
        total_duration_secs
    );

    Ok(windows)
}

/// Cut the planned windows out of the extracted audio file.
///
/// Chunk audio lands next to `audio_path` as `<stem>_chunk_NNN.wav`, one
/// file per window, and each window becomes a [`ChunkDescriptor`].
pub async fn materialize(
    backend: &dyn MediaBackend,
    audio_path: &Path,
    windows: &[ChunkWindow],
) -> Result<Vec<ChunkDescriptor>> {
    let stem = audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    let parent = audio_path.parent().unwrap_or_else(|| Path::new("."));

    let mut descriptors = Vec::with_capacity(windows.len());
    for window in windows {
        let chunk_path = parent.join(format!("{}_chunk_{:03}.wav", stem, window.sequence + 1));
        backend
            .extract_window(
                audio_path,
                window.offset_secs,
                window.duration_secs,
                &chunk_path,
            )
            .await
            .with_context(|| format!("Failed to cut chunk {}", window.sequence + 1))?;

        info!(
            "Chunk {}: {:.1}s ~ {:.1}s ({:.1}s)",
            window.sequence + 1,
            window.offset_secs,
            window.offset_secs + window.duration_secs,
            window.duration_secs
        );

        descriptors.push(ChunkDescriptor {
            sequence: window.sequence,
            offset_secs: window.offset_secs,
            duration_secs: window.duration_secs,
            media: chunk_path,
        });
    }

    Ok(descriptors)
}
