use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::audio_planner::{self, ChunkDescriptor};
use crate::errors::{JobError, PlanError};
use crate::media::MediaBackend;
use crate::subtitle_processor::{SubtitleEntry, SubtitleTrack};
use crate::timecode::TimeCode;
use crate::transcription::{
    self, EngineOutput, TranscriptionEngine, TranscriptionSegment, WorkerOptions, WorkerOutcome,
};

// @module: Sequential chunk scheduling, checkpointing and merge

/// One-way, fire-and-forget progress notifications.
///
/// Implementations must never block the orchestrator; there is no
/// backpressure. The orchestrator thread is the only caller.
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: &str, fraction: f64);
}

/// Sink that drops every notification.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _stage: &str, _fraction: f64) {}
}

/// Everything one transcription job needs, passed explicitly instead of
/// living in ambient mutable state.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Source media file
    pub media: PathBuf,
    /// Where the extracted full-audio WAV goes
    pub audio_path: PathBuf,
    /// Directory for per-chunk and running-total checkpoint files
    pub checkpoint_dir: PathBuf,
    /// Language hint, `None` for auto-detection
    pub language: Option<String>,
    /// Window size in minutes
    pub chunk_minutes: u32,
    /// Keep chunk audio and intermediate files after the merge
    pub keep_partial_files: bool,
    /// Worker supervision settings
    pub worker_options: WorkerOptions,
}

/// Orchestrator state, only ever advanced by the single driving task.
#[derive(Debug, Clone, Copy, PartialEq)]
enum JobState {
    Planning,
    PerChunk(usize),
    Merging,
    Finalized,
    FallbackSinglePass,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::PerChunk(i) => write!(f, "chunk {}", i + 1),
            Self::Merging => write!(f, "merging"),
            Self::Finalized => write!(f, "finalized"),
            Self::FallbackSinglePass => write!(f, "fallback single-pass"),
        }
    }
}

/// How the job ended, short of a terminal error.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Every chunk contributed segments
    Completed,
    /// One or more chunks were skipped on timeout or engine error;
    /// the coverage gap is accepted lossy degradation, not a failure
    CompletedWithSkips {
        /// 1-based sequence numbers of the skipped chunks
        skipped: Vec<usize>,
    },
    /// Chunk planning was impossible; the whole audio went through one
    /// non-chunked recognition call instead
    FallbackSinglePass,
}

impl JobStatus {
    pub fn describe(&self) -> String {
        match self {
            Self::Completed => "completed fully".to_string(),
            Self::CompletedWithSkips { skipped } => {
                format!(
                    "completed with {} chunk{} skipped",
                    skipped.len(),
                    if skipped.len() == 1 { "" } else { "s" }
                )
            }
            Self::FallbackSinglePass => "completed in single-pass fallback mode".to_string(),
        }
    }
}

/// Final result of one transcription job.
#[derive(Debug)]
pub struct JobReport {
    /// The finalized, validated subtitle track
    pub track: SubtitleTrack,
    /// Completed / completed-with-skips / fallback
    pub status: JobStatus,
    /// First language tag the engine reported, if any
    pub detected_language: Option<String>,
    /// How many chunks were planned (zero in fallback mode)
    pub chunk_count: usize,
    /// True when the round-trip block count disagreed with the entry count.
    /// This indicates a writer/parser inconsistency, not bad input.
    pub validation_mismatch: bool,
}

/// Drives chunked transcription of one media file.
///
/// Chunks are processed strictly sequentially: one chunk's recognition call
/// must finish, time out, or error before the next begins, because the
/// engine is a non-reentrant shared resource. The running track is owned
/// exclusively here and only appended to after a worker has fully returned.
pub struct ChunkOrchestrator {
    backend: Arc<dyn MediaBackend>,
    engine: Arc<dyn TranscriptionEngine>,
    progress: Arc<dyn ProgressSink>,
}

impl ChunkOrchestrator {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        engine: Arc<dyn TranscriptionEngine>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        ChunkOrchestrator {
            backend,
            engine,
            progress,
        }
    }

    /// Run the full chunked pipeline for one job.
    ///
    /// Per-chunk failures (timeout, engine error) skip that chunk and
    /// continue; only planning-level failures escape to the single-pass
    /// fallback, and only an empty result set fails the job outright.
    pub async fn run(&self, ctx: &JobContext) -> Result<JobReport, JobError> {
        let mut state = JobState::Planning;
        debug!("Job state: {}", state);
        self.progress.report("planning", 0.05);

        // Total duration first: an unreadable backend means chunking cannot
        // proceed at all, which is the fallback transition, while an empty
        // input is a terminal input error.
        let total_duration = match self.backend.probe_duration(&ctx.media).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!("Audio backend unusable for chunking ({}), falling back", e);
                return self.run_single_pass(ctx).await;
            }
        };

        if total_duration <= 0.0 {
            return Err(JobError::EmptyInput(format!(
                "{} has zero audio duration",
                ctx.media.display()
            )));
        }

        if let Err(e) = self.backend.extract_audio(&ctx.media, &ctx.audio_path).await {
            warn!("Audio extraction failed ({}), falling back", e);
            return self.run_single_pass(ctx).await;
        }

        self.progress.report("splitting", 0.1);
        let windows = match audio_planner::plan(total_duration, ctx.chunk_minutes) {
            Ok(windows) => windows,
            Err(PlanError::EmptyInput { duration_secs }) => {
                return Err(JobError::EmptyInput(format!(
                    "planned duration was {} seconds",
                    duration_secs
                )));
            }
            Err(e) => {
                warn!("Chunk planning failed ({}), falling back", e);
                return self.run_single_pass(ctx).await;
            }
        };

        let chunks =
            match audio_planner::materialize(self.backend.as_ref(), &ctx.audio_path, &windows)
                .await
            {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!("Chunk extraction failed ({}), falling back", e);
                    return self.run_single_pass(ctx).await;
                }
            };

        self.progress.report("loading model", 0.15);
        info!(
            "Transcribing {} chunks of up to {} minutes",
            chunks.len(),
            ctx.chunk_minutes
        );

        let mut track = SubtitleTrack::new();
        track.source_file = Some(ctx.media.clone());
        let mut skipped: Vec<usize> = Vec::new();
        let mut detected_language: Option<String> = None;

        for (i, chunk) in chunks.iter().enumerate() {
            state = JobState::PerChunk(i);
            debug!("Job state: {}", state);
            let fraction = 0.15 + 0.75 * (i as f64) / (chunks.len() as f64);
            self.progress.report("transcribing", fraction);

            match transcription::run_worker(
                Arc::clone(&self.engine),
                chunk,
                ctx.language.clone(),
                ctx.worker_options,
            )
            .await
            {
                Ok(WorkerOutcome::Completed(output)) => {
                    if detected_language.is_none() {
                        detected_language = output.detected_language.clone();
                        if let Some(lang) = &detected_language {
                            info!("Detected language: {}", lang);
                        }
                    }
                    let added = self.merge_chunk(&mut track, chunk, &output);
                    info!(
                        "Chunk {}/{} done: {} segments",
                        i + 1,
                        chunks.len(),
                        added
                    );
                    self.write_checkpoints(ctx, &track, chunk, added);
                }
                Ok(WorkerOutcome::TimedOut { waited }) => {
                    warn!(
                        "Chunk {}/{} abandoned after {}s, continuing with the next chunk",
                        i + 1,
                        chunks.len(),
                        waited.as_secs()
                    );
                    skipped.push(chunk.sequence + 1);
                }
                Err(e) => {
                    error!(
                        "Chunk {}/{} failed ({}), continuing with the next chunk",
                        i + 1,
                        chunks.len(),
                        e
                    );
                    skipped.push(chunk.sequence + 1);
                }
            }
        }

        if !ctx.keep_partial_files {
            self.cleanup_chunk_media(ctx, &chunks);
        }

        state = JobState::Merging;
        debug!("Job state: {}", state);
        self.progress.report("merging", 0.95);

        if track.is_empty() {
            return Err(JobError::NoSegments);
        }

        track.finalize();
        let validation_mismatch = self.roundtrip_check(&track);

        state = JobState::Finalized;
        debug!("Job state: {}", state);
        self.progress.report("done", 1.0);

        let status = if skipped.is_empty() {
            JobStatus::Completed
        } else {
            JobStatus::CompletedWithSkips { skipped }
        };
        info!("Job {}", status.describe());

        Ok(JobReport {
            track,
            status,
            detected_language,
            chunk_count: chunks.len(),
            validation_mismatch,
        })
    }

    /// Single non-chunked recognition call over the whole audio.
    ///
    /// Entered when chunk planning cannot proceed, or directly when the
    /// caller disables chunking; the external contract is unchanged, only
    /// the status reports the fallback.
    pub async fn run_single_pass(&self, ctx: &JobContext) -> Result<JobReport, JobError> {
        let state = JobState::FallbackSinglePass;
        debug!("Job state: {}", state);
        info!("Falling back to single-pass transcription");
        self.progress.report("single-pass", 0.3);

        // Prefer the extracted audio when it exists; otherwise hand the
        // engine the original media reference directly.
        let audio: &Path = if ctx.audio_path.exists() {
            &ctx.audio_path
        } else {
            &ctx.media
        };

        let output = self
            .engine
            .transcribe(audio, ctx.language.as_deref())
            .await
            .map_err(|e| JobError::FallbackFailed(e.to_string()))?;

        self.progress.report("merging", 0.9);
        if output.segments.is_empty() {
            return Err(JobError::NoSegments);
        }

        let mut track = SubtitleTrack::new();
        track.source_file = Some(ctx.media.clone());
        for segment in &output.segments {
            Self::append_segment(&mut track, segment);
        }
        track.finalize();
        let validation_mismatch = self.roundtrip_check(&track);

        self.progress.report("done", 1.0);
        info!("Job {}", JobStatus::FallbackSinglePass.describe());

        Ok(JobReport {
            track,
            status: JobStatus::FallbackSinglePass,
            detected_language: output.detected_language,
            chunk_count: 0,
            validation_mismatch,
        })
    }

    /// Offset one chunk's segments by the chunk's absolute start and append
    /// them to the running track. Returns how many entries were added.
    fn merge_chunk(
        &self,
        track: &mut SubtitleTrack,
        chunk: &ChunkDescriptor,
        output: &EngineOutput,
    ) -> usize {
        for segment in &output.segments {
            let absolute = segment.offset_by(chunk.offset_secs);
            Self::append_segment(track, &absolute);
        }
        output.segments.len()
    }

    fn append_segment(track: &mut SubtitleTrack, segment: &TranscriptionSegment) {
        let start = TimeCode::from_seconds(segment.start_secs);
        let end = TimeCode::from_seconds(segment.end_secs);
        if end <= start {
            warn!(
                "Segment at {} has non-positive duration, keeping it",
                start
            );
        }
        let index = track.len() + 1;
        track
            .entries
            .push(SubtitleEntry::new(index, start, end, segment.text.clone()));
    }

    /// Write the two checkpoint artifacts for a finished chunk: the chunk's
    /// own segments, and the full track accumulated so far. A crash after
    /// chunk k loses at most chunk k+1's work. Checkpoints are operator
    /// artifacts; failures to write them never fail the job.
    fn write_checkpoints(
        &self,
        ctx: &JobContext,
        track: &SubtitleTrack,
        chunk: &ChunkDescriptor,
        added: usize,
    ) {
        let chunk_entries: Vec<SubtitleEntry> = track
            .entries
            .iter()
            .skip(track.len().saturating_sub(added))
            .cloned()
            .enumerate()
            .map(|(i, mut entry)| {
                entry.index = i + 1;
                entry
            })
            .collect();
        let chunk_track = SubtitleTrack::from_entries(chunk_entries);

        let chunk_path = ctx
            .checkpoint_dir
            .join(format!("chunk_{:03}.srt", chunk.sequence + 1));
        if let Err(e) = chunk_track.write_to_srt(&chunk_path) {
            warn!("Failed to write chunk checkpoint {:?}: {}", chunk_path, e);
        }

        let running_path = ctx
            .checkpoint_dir
            .join(format!("running_{:03}.srt", chunk.sequence + 1));
        if let Err(e) = track.write_to_srt(&running_path) {
            warn!(
                "Failed to write running checkpoint {:?}: {}",
                running_path, e
            );
        } else {
            debug!("Checkpointed {} entries to {:?}", track.len(), running_path);
        }
    }

    /// Round-trip the finalized track through write + strict validate.
    ///
    /// A block-count mismatch is a correctness bug in this component, not a
    /// user error, so it is surfaced as its own signal.
    fn roundtrip_check(&self, track: &SubtitleTrack) -> bool {
        let report = SubtitleTrack::validate(&track.write_to_string());
        if report.block_count != track.len() {
            error!(
                "Round-trip validation mismatch: wrote {} entries but re-parsed {} blocks",
                track.len(),
                report.block_count
            );
            return true;
        }
        if report.empty_text_blocks > 0 {
            warn!(
                "{} finalized entries have empty text",
                report.empty_text_blocks
            );
        }
        false
    }

    fn cleanup_chunk_media(&self, ctx: &JobContext, chunks: &[ChunkDescriptor]) {
        for chunk in chunks {
            if chunk.media.exists() {
                if let Err(e) = std::fs::remove_file(&chunk.media) {
                    warn!("Failed to remove chunk audio {:?}: {}", chunk.media, e);
                }
            }
        }
        if ctx.audio_path.exists() {
            if let Err(e) = std::fs::remove_file(&ctx.audio_path) {
                warn!("Failed to remove temp audio {:?}: {}", ctx.audio_path, e);
            }
        }
    }
}
