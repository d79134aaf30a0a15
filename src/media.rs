use std::path::Path;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, error};
use serde_json::{Value, from_str};
use tokio::process::Command;

// @module: Audio/media backend interface and the ffmpeg implementation

/// Abstract audio/media backend.
///
/// Given a media reference it reports total duration; given a time window it
/// produces a readable audio chunk. The chunked pipeline only talks to this
/// trait so tests can substitute a mock.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Total media duration in fractional seconds.
    async fn probe_duration(&self, media: &Path) -> Result<f64>;

    /// Extract the full audio stream to a WAV file at `output`.
    async fn extract_audio(&self, media: &Path, output: &Path) -> Result<()>;

    /// Extract one time window of audio to a WAV file at `output`.
    async fn extract_window(
        &self,
        media: &Path,
        offset_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> Result<()>;
}

/// Media backend built on the ffmpeg/ffprobe command-line tools.
#[derive(Debug, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        FfmpegBackend
    }

    async fn run_ffmpeg(args: Vec<String>, timeout_secs: u64) -> Result<()> {
        let ffmpeg_future = Command::new("ffmpeg").args(&args).output();

        let timeout_duration = std::time::Duration::from_secs(timeout_secs);
        let result = tokio::select! {
            result = ffmpeg_future => {
                result.map_err(|e| anyhow!("Failed to execute ffmpeg command: {}", e))?
            },
            _ = tokio::time::sleep(timeout_duration) => {
                return Err(anyhow!("ffmpeg command timed out after {} seconds", timeout_secs));
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let filtered = filter_ffmpeg_stderr(&stderr);
            error!("ffmpeg failed: {}", filtered);
            return Err(anyhow!("ffmpeg failed: {}", filtered));
        }

        Ok(())
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn probe_duration(&self, media: &Path) -> Result<f64> {
        if !media.exists() {
            return Err(anyhow!("Media file does not exist: {:?}", media));
        }

        let ffprobe_future = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                media.to_str().unwrap_or(""),
            ])
            .output();

        let timeout_duration = std::time::Duration::from_secs(60);
        let output = tokio::select! {
            result = ffprobe_future => {
                result.map_err(|e| anyhow!("Failed to execute ffprobe command: {}", e))?
            },
            _ = tokio::time::sleep(timeout_duration) => {
                return Err(anyhow!("ffprobe command timed out after 60 seconds"));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("ffprobe command failed: {}", stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let json: Value = from_str(&stdout).context("Failed to parse ffprobe JSON output")?;

        let duration = json
            .get("format")
            .and_then(|f| f.get("duration"))
            .and_then(|d| d.as_str())
            .and_then(|d| d.parse::<f64>().ok())
            .ok_or_else(|| anyhow!("ffprobe reported no duration for {:?}", media))?;

        debug!("Probed duration {:.1}s for {:?}", duration, media);
        Ok(duration)
    }

    async fn extract_audio(&self, media: &Path, output: &Path) -> Result<()> {
        if !media.exists() {
            return Err(anyhow!("Media file does not exist: {:?}", media));
        }

        let args = vec![
            "-i".to_string(),
            media.to_str().unwrap_or_default().to_string(),
            "-ab".to_string(),
            "160k".to_string(),
            "-ac".to_string(),
            "2".to_string(),
            "-ar".to_string(),
            "44100".to_string(),
            "-vn".to_string(),
            output.to_str().unwrap_or_default().to_string(),
            "-y".to_string(),
        ];

        Self::run_ffmpeg(args, 600).await?;
        debug!("Extracted audio to {:?}", output);
        Ok(())
    }

    async fn extract_window(
        &self,
        media: &Path,
        offset_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> Result<()> {
        // -ss before -i seeks on the input and keeps the cut fast
        let args = vec![
            "-ss".to_string(),
            format!("{:.3}", offset_secs),
            "-t".to_string(),
            format!("{:.3}", duration_secs),
            "-i".to_string(),
            media.to_str().unwrap_or_default().to_string(),
            "-ac".to_string(),
            "2".to_string(),
            "-ar".to_string(),
            "44100".to_string(),
            "-vn".to_string(),
            output.to_str().unwrap_or_default().to_string(),
            "-y".to_string(),
        ];

        Self::run_ffmpeg(args, 600).await?;
        debug!(
            "Extracted window [{:.1}s, {:.1}s) to {:?}",
            offset_secs,
            offset_secs + duration_secs,
            output
        );
        Ok(())
    }
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let dominated_prefixes = [
        "ffmpeg version",
        "  built with",
        "  configuration:",
        "  lib",
        "Input #",
        "  Metadata:",
        "  Duration:",
        "  Stream #",
        "      Metadata:",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| {
            let trimmed = line.trim_end();
            if trimmed.trim().is_empty() {
                return false;
            }
            !dominated_prefixes.iter().any(|p| trimmed.starts_with(p))
        })
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
