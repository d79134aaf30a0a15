use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::sleep;

use crate::app_config::ModelSize;
use crate::audio_planner::ChunkDescriptor;
use crate::errors::EngineError;

// @module: Recognition engine interface and the deadline-supervised worker

/// One recognized utterance, relative to the start of the audio it came from.
///
/// Segments are chunk-relative until the orchestrator applies the chunk's
/// time offset, after which they are absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

impl TranscriptionSegment {
    pub fn new(start_secs: f64, end_secs: f64, text: impl Into<String>) -> Self {
        TranscriptionSegment {
            start_secs,
            end_secs,
            text: text.into(),
        }
    }

    /// Shift the segment by an absolute offset in seconds.
    pub fn offset_by(&self, offset_secs: f64) -> Self {
        TranscriptionSegment {
            start_secs: self.start_secs + offset_secs,
            end_secs: self.end_secs + offset_secs,
            text: self.text.clone(),
        }
    }
}

/// Everything one recognition call returns.
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    pub segments: Vec<TranscriptionSegment>,
    /// Language tag the engine detected, when it reports one
    pub detected_language: Option<String>,
}

/// Abstract recognition engine.
///
/// The engine is a heavyweight, non-reentrant shared resource loaded once
/// per job and reused across chunks; it carries no time limit of its own.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Transcribe one audio file. `language` of `None` means auto-detect.
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<EngineOutput, EngineError>;
}

/// Result of one supervised worker run.
///
/// A timeout is a first-class value, not an error: the caller treats it as a
/// skip of that chunk, never as a hard failure of the whole job.
#[derive(Debug)]
pub enum WorkerOutcome {
    /// The engine finished within the deadline
    Completed(EngineOutput),
    /// The deadline elapsed; the worker was abandoned
    TimedOut {
        /// How long the worker was allowed to run
        waited: Duration,
    },
}

/// Deadline for one chunk: `max(5 minutes, 2 * chunk length)`.
pub fn deadline_for(chunk_minutes: u32) -> Duration {
    let minutes = u64::from(chunk_minutes).saturating_mul(2).max(5);
    Duration::from_secs(minutes * 60)
}

/// Supervision settings for one worker run.
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    /// Hard deadline for the recognition call
    pub deadline: Duration,
    /// How often the supervisor polls for completion
    pub poll_interval: Duration,
}

impl WorkerOptions {
    pub fn for_chunk_minutes(chunk_minutes: u32) -> Self {
        WorkerOptions {
            deadline: deadline_for(chunk_minutes),
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Run the recognition engine on one chunk under a deadline.
///
/// The engine call runs in its own task so the blocking wait is cancellable:
/// the supervisor polls at `poll_interval` and, if the deadline elapses
/// first, aborts the task and reports [`WorkerOutcome::TimedOut`]. An
/// abandoned worker's result is discarded and never touches shared state;
/// the worker itself applies no time offset.
pub async fn run_worker(
    engine: Arc<dyn TranscriptionEngine>,
    chunk: &ChunkDescriptor,
    language: Option<String>,
    options: WorkerOptions,
) -> Result<WorkerOutcome, EngineError> {
    let audio = chunk.media.clone();
    let sequence = chunk.sequence;

    let mut handle =
        tokio::spawn(async move { engine.transcribe(&audio, language.as_deref()).await });

    let started = Instant::now();
    loop {
        tokio::select! {
            joined = &mut handle => {
                return match joined {
                    Ok(result) => result.map(WorkerOutcome::Completed),
                    Err(e) => Err(EngineError::Failed(format!(
                        "recognition task for chunk {} panicked: {}", sequence + 1, e
                    ))),
                };
            }
            _ = sleep(options.poll_interval) => {
                let elapsed = started.elapsed();
                if elapsed >= options.deadline {
                    handle.abort();
                    warn!(
                        "Chunk {} timed out after {}s, skipping",
                        sequence + 1,
                        elapsed.as_secs()
                    );
                    return Ok(WorkerOutcome::TimedOut { waited: elapsed });
                }
                debug!(
                    "Chunk {} still transcribing ({}m {}s elapsed)",
                    sequence + 1,
                    elapsed.as_secs() / 60,
                    elapsed.as_secs() % 60
                );
            }
        }
    }
}

// Whisper CLI JSON output shape, only the fields we read
#[derive(Debug, Deserialize)]
struct WhisperJson {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Recognition engine backed by the `whisper` command-line tool.
///
/// Invokes the CLI with JSON output into a scratch directory and parses the
/// result. The model is loaded by the tool itself; this type just shells out.
pub struct WhisperCliEngine {
    command: String,
    model_size: ModelSize,
}

impl WhisperCliEngine {
    pub fn new(command: impl Into<String>, model_size: ModelSize) -> Self {
        WhisperCliEngine {
            command: command.into(),
            model_size,
        }
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperCliEngine {
    async fn transcribe(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<EngineOutput, EngineError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| EngineError::Launch(format!("scratch dir: {}", e)))?;

        let mut command = Command::new(&self.command);
        command
            .arg(audio)
            .args(["--model", self.model_size.as_str()])
            .args(["--output_format", "json"])
            .arg("--output_dir")
            .arg(scratch.path())
            .args(["--verbose", "False"]);
        if let Some(language) = language {
            command.args(["--language", language]);
        }

        info!(
            "Transcribing {:?} (model: {}, language: {})",
            audio.file_name().unwrap_or_default(),
            self.model_size,
            language.unwrap_or("auto")
        );

        let output = command
            .output()
            .await
            .map_err(|e| EngineError::Launch(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Failed(stderr.trim().to_string()));
        }

        let json_path = scratch
            .path()
            .join(audio.file_stem().unwrap_or_default())
            .with_extension("json");
        let raw = std::fs::read_to_string(&json_path)
            .map_err(|e| EngineError::Parse(format!("{}: {}", json_path.display(), e)))?;
        let parsed: WhisperJson =
            serde_json::from_str(&raw).map_err(|e| EngineError::Parse(e.to_string()))?;

        Ok(EngineOutput {
            segments: parsed
                .segments
                .into_iter()
                .map(|s| TranscriptionSegment::new(s.start, s.end, s.text.trim()))
                .collect(),
            detected_language: parsed.language,
        })
    }
}
