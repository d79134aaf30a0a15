/*!
 * # whispersub - Chunked Whisper Transcription & SRT Toolkit
 *
 * A Rust library for turning long media files into SubRip subtitles via a
 * chunked speech-recognition pipeline, and for repairing non-conformant
 * SRT files into their canonical form.
 *
 * ## Features
 *
 * - Transcribe media files with a local Whisper CLI engine
 * - Split long audio into fixed-size chunks so one stuck recognition call
 *   never loses the whole job
 * - Per-chunk deadlines with skip-and-continue degradation
 * - Checkpoint files after every chunk, so a crash loses at most one chunk
 * - Automatic fallback to single-pass transcription when chunking is
 *   impossible
 * - Lenient SRT reading (multiple dialect patterns, multiple encodings)
 *   paired with a strict canonical writer and round-trip validation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `timecode`: SRT time-code parsing, normalization and formatting
 * - `subtitle_processor`: Lenient parsing, canonical writing, validation
 * - `audio_planner`: Chunk window planning and audio extraction
 * - `media`: ffmpeg/ffprobe backend behind the `MediaBackend` trait
 * - `transcription`: Recognition engine trait, worker deadlines, Whisper CLI
 * - `chunk_orchestrator`: Sequential per-chunk pipeline with checkpoints
 * - `file_utils`: File system operations and file-type detection
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod audio_planner;
pub mod chunk_orchestrator;
pub mod errors;
pub mod file_utils;
pub mod media;
pub mod subtitle_processor;
pub mod timecode;
pub mod transcription;

// Re-export main types for easier usage
pub use app_config::{Config, ModelSize};
pub use chunk_orchestrator::{ChunkOrchestrator, JobContext, JobReport, JobStatus};
pub use errors::{AppError, EngineError, JobError, PlanError, SubtitleError, TimeCodeError};
pub use subtitle_processor::{SubtitleEntry, SubtitleTrack};
pub use timecode::TimeCode;
pub use transcription::{TranscriptionEngine, TranscriptionSegment, WorkerOutcome};
