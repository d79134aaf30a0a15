use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::chunk_orchestrator::{ChunkOrchestrator, JobContext, JobReport, ProgressSink};
use crate::file_utils::{FileManager, FileType};
use crate::media::FfmpegBackend;
use crate::subtitle_processor::{ParseOutcome, SubtitleTrack, TextEncoding};
use crate::transcription::{WhisperCliEngine, WorkerOptions};

// @module: Application controller for transcription and conversion

/// Suffix appended to the media stem for the finished subtitle file
const TRANSCRIBE_SUFFIX: &str = "_whisper_subtitles";

/// Suffix appended to the subtitle stem for the normalized output
pub const CONVERT_SUFFIX: &str = "_normalized";

/// Per-invocation switches, separate from the persisted config.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Overwrite the output even when it already exists
    pub force_overwrite: bool,
    /// Skip chunking and run one recognition call over the whole audio
    pub single_pass: bool,
    /// Write a conversion report next to normalized subtitle output
    pub write_report: bool,
}

/// Progress bar adapter for the orchestrator's notifications.
struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    fn new(multi_progress: &MultiProgress) -> Self {
        let bar = multi_progress.add(ProgressBar::new(1000));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{bar:40}] {percent}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        IndicatifProgress { bar }
    }

    fn finish(&self) {
        self.bar.finish_with_message("Done");
    }
}

impl ProgressSink for IndicatifProgress {
    fn report(&self, stage: &str, fraction: f64) {
        self.bar.set_position((fraction.clamp(0.0, 1.0) * 1000.0) as u64);
        self.bar.set_message(stage.to_string());
    }
}

/// Main application controller, routing inputs to transcription or
/// subtitle normalization based on file type.
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the main workflow for one input file.
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, options: RunOptions) -> Result<()> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(input_file, output_dir, &multi_progress, options)
            .await
    }

    async fn run_with_progress(
        &self,
        input_file: PathBuf,
        output_dir: PathBuf,
        multi_progress: &MultiProgress,
        options: RunOptions,
    ) -> Result<()> {
        let start_time = std::time::Instant::now();

        if !input_file.exists() {
            return Err(anyhow::anyhow!("Input file does not exist: {:?}", input_file));
        }

        FileManager::ensure_dir(&output_dir)?;

        let file_type = FileManager::detect_file_type(&input_file)?;
        let suffix = match file_type {
            FileType::Subtitle => CONVERT_SUFFIX,
            FileType::Media => TRANSCRIBE_SUFFIX,
            FileType::Unknown => {
                return Err(anyhow::anyhow!(
                    "Could not determine file type of {:?}; expected an SRT or a media file",
                    input_file
                ));
            }
        };

        let output_path = FileManager::generate_output_path(&input_file, &output_dir, suffix);
        if output_path.exists() && !options.force_overwrite {
            warn!("Skipping file, output already exists (use -f to force overwrite)");
            return Ok(());
        }

        match file_type {
            FileType::Subtitle => {
                info!("Detected subtitle file, normalizing without transcription");
                self.convert(&input_file, &output_path, options.write_report, false)?;
            }
            FileType::Media => {
                self.transcribe_media(&input_file, &output_path, &output_dir, multi_progress, options)
                    .await?;
            }
            FileType::Unknown => unreachable!(),
        }

        info!(
            "Finished {:?} in {}",
            input_file.file_name().unwrap_or_default(),
            Self::format_duration(start_time.elapsed())
        );
        Ok(())
    }

    /// Transcribe one media file into an SRT track at `output_path`.
    async fn transcribe_media(
        &self,
        input_file: &Path,
        output_path: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        options: RunOptions,
    ) -> Result<()> {
        let stem = input_file
            .file_stem()
            .map(|s| FileManager::sanitize_file_stem(&s.to_string_lossy()))
            .unwrap_or_else(|| "output".to_string());

        let checkpoint_dir = output_dir.join(format!("{}_partial_chunks", stem));
        FileManager::ensure_dir(&checkpoint_dir)?;

        let ctx = JobContext {
            media: input_file.to_path_buf(),
            audio_path: output_dir.join(format!("{}_temp_audio.wav", stem)),
            checkpoint_dir: checkpoint_dir.clone(),
            language: self.config.language_hint(),
            chunk_minutes: self.config.chunking.chunk_minutes,
            keep_partial_files: self.config.chunking.keep_partial_files,
            worker_options: WorkerOptions {
                deadline: crate::transcription::deadline_for(self.config.chunking.chunk_minutes),
                poll_interval: std::time::Duration::from_secs(self.config.chunking.poll_interval_secs),
            },
        };

        let backend = Arc::new(FfmpegBackend::new());
        let engine = Arc::new(WhisperCliEngine::new(
            self.config.engine.command.clone(),
            self.config.model_size,
        ));
        let progress = Arc::new(IndicatifProgress::new(multi_progress));
        let orchestrator = ChunkOrchestrator::new(backend, engine.clone(), progress.clone());

        info!(
            "Transcribing {:?} with model '{}'",
            input_file.file_name().unwrap_or_default(),
            self.config.model_size
        );

        let report = if options.single_pass || !self.config.chunking.enabled {
            orchestrator.run_single_pass(&ctx).await?
        } else {
            orchestrator.run(&ctx).await?
        };
        progress.finish();

        self.write_job_output(&report, output_path)?;

        if !self.config.chunking.keep_partial_files {
            if let Err(e) = std::fs::remove_dir_all(&checkpoint_dir) {
                warn!("Failed to remove checkpoint directory {:?}: {}", checkpoint_dir, e);
            }
        } else {
            info!("Checkpoint files kept under {:?}", checkpoint_dir);
        }

        Ok(())
    }

    fn write_job_output(&self, report: &JobReport, output_path: &Path) -> Result<()> {
        report
            .track
            .write_to_srt(output_path)
            .with_context(|| format!("Failed to write subtitles to {:?}", output_path))?;

        if let Some(lang) = &report.detected_language {
            info!("Engine detected language: {}", lang);
        }
        if report.validation_mismatch {
            error!("Output written, but round-trip validation found a block-count mismatch");
        }
        info!(
            "Wrote {} entries to {:?} ({})",
            report.track.len(),
            output_path,
            report.status.describe()
        );
        Ok(())
    }

    /// Normalize one SRT file: decode, parse leniently, renumber, and write
    /// the canonical form. Optionally writes a conversion report alongside.
    pub fn convert(
        &self,
        input_file: &Path,
        output_path: &Path,
        write_report: bool,
        write_plain_text: bool,
    ) -> Result<()> {
        let bytes = FileManager::read_bytes(input_file)?;
        let (outcome, encoding) = SubtitleTrack::parse_bytes(&bytes)
            .with_context(|| format!("Failed to parse subtitle file: {:?}", input_file))?;
        info!(
            "Decoded {:?} as {} ({} entries parsed, {} lines failed)",
            input_file.file_name().unwrap_or_default(),
            encoding.name(),
            outcome.stats.parsed,
            outcome.stats.failed
        );

        if outcome.entries.is_empty() {
            return Err(anyhow::anyhow!(
                "No subtitle entries could be parsed from {:?}",
                input_file
            ));
        }

        let report_text = if write_report {
            Some(Self::build_conversion_report(input_file, &outcome, encoding))
        } else {
            None
        };

        let mut track = outcome.into_track(Some(input_file.to_path_buf()));
        track.finalize();
        track
            .write_to_srt(output_path)
            .with_context(|| format!("Failed to write subtitles to {:?}", output_path))?;

        let validation = SubtitleTrack::validate(&track.write_to_string());
        if validation.block_count != track.len() {
            error!(
                "Round-trip validation mismatch: wrote {} entries but re-parsed {} blocks",
                track.len(),
                validation.block_count
            );
        }
        if validation.empty_text_blocks > 0 {
            warn!("{} entries have empty text", validation.empty_text_blocks);
        }

        if let Some(report_text) = report_text {
            let report_path = output_path.with_extension("report.txt");
            FileManager::write_to_file(&report_path, &report_text)?;
            info!("Conversion report written to {:?}", report_path);
        }

        if write_plain_text {
            let text_path = output_path.with_extension("txt");
            FileManager::write_to_file(&text_path, &track.plain_text())?;
            info!("Plain text written to {:?}", text_path);
        }

        info!("Wrote {} normalized entries to {:?}", track.len(), output_path);
        Ok(())
    }

    fn build_conversion_report(
        input_file: &Path,
        outcome: &ParseOutcome,
        encoding: TextEncoding,
    ) -> String {
        let stats = &outcome.stats;
        let mut report = String::new();
        report.push_str(&format!("Conversion report for {:?}\n", input_file));
        report.push_str(&format!("Encoding: {}\n", encoding.name()));
        report.push_str(&format!("Entries parsed: {}\n", stats.parsed));
        report.push_str(&format!("Lines failed: {}\n", stats.failed));
        report.push_str(&format!(
            "Total duration: {:.1}s, average entry: {:.2}s\n",
            stats.total_duration_secs,
            stats.average_duration_secs()
        ));
        report.push_str("Pattern usage:\n");
        for (slot, count) in stats.pattern_counts.iter().enumerate() {
            report.push_str(&format!("  pattern {}: {}\n", slot + 1, count));
        }
        if !outcome.failures.is_empty() {
            report.push_str("First failed lines:\n");
            for failure in outcome.failures.iter().take(10) {
                report.push_str(&format!(
                    "  line {}: {} ({})\n",
                    failure.line_number, failure.raw_text, failure.reason
                ));
            }
        }
        report
    }

    /// Process every media file under a directory, writing outputs next to
    /// their sources.
    pub async fn run_folder(&self, input_dir: PathBuf, options: RunOptions) -> Result<()> {
        let start_time = std::time::Instant::now();

        if !input_dir.exists() {
            return Err(anyhow::anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let mut media_files = Vec::new();
        for ext in &["mp4", "mkv", "avi", "mov", "webm", "mp3", "wav", "flac", "m4a"] {
            let mut files = FileManager::find_files(&input_dir, ext)?;
            media_files.append(&mut files);
        }

        if media_files.is_empty() {
            return Err(anyhow::anyhow!("No media files found in directory: {:?}", input_dir));
        }
        media_files.sort();

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(media_files.len() as u64));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(style.progress_chars("█▓▒░"));
        folder_pb.set_message("Processing files");

        let mut success_count = 0;
        let mut error_count = 0;
        let mut skip_count = 0;

        for media_file in media_files.iter() {
            let file_name = media_file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let output_dir = match media_file.parent() {
                Some(parent) => parent.to_path_buf(),
                None => input_dir.clone(),
            };

            let output_path =
                FileManager::generate_output_path(media_file, &output_dir, TRANSCRIBE_SUFFIX);
            if output_path.exists() && !options.force_overwrite {
                warn!("Skipping {}, output already exists (use -f to force overwrite)", file_name);
                skip_count += 1;
                folder_pb.inc(1);
                continue;
            }

            match self
                .run_with_progress(media_file.clone(), output_dir, &multi_progress, options)
                .await
            {
                Ok(_) => {
                    success_count += 1;
                }
                Err(e) => {
                    error!("Error processing file {}: {}", file_name, e);
                    error_count += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        info!(
            "Folder processing completed: {} processed, {} skipped, {} errors - Duration: {}",
            success_count,
            skip_count,
            error_count,
            Self::format_duration(start_time.elapsed())
        );

        Ok(())
    }

    fn format_duration(duration: std::time::Duration) -> String {
        let total_secs = duration.as_secs();
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
