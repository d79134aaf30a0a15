/*!
 * Error types for the whispersub application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur when parsing or formatting time-codes
#[derive(Error, Debug)]
pub enum TimeCodeError {
    /// Input does not have the HH:MM:SS,mmm shape
    #[error("Invalid time-code format: {0}")]
    Format(String),

    /// A component is out of range (strict mode only)
    #[error("Out-of-range time component in '{text}': {component}")]
    OutOfRange {
        /// The offending time-code text
        text: String,
        /// Which component overflowed
        component: &'static str,
    },
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// None of the candidate encodings could decode the input bytes
    #[error("Failed to decode subtitle file: tried {tried} encodings without success")]
    Encoding {
        /// How many candidate encodings were attempted
        tried: usize,
    },

    /// Input parsed but produced no usable entries
    #[error("No subtitle entries could be parsed from the input")]
    NoEntries,

    /// Error from time-code handling
    #[error("Time-code error: {0}")]
    TimeCode(#[from] TimeCodeError),
}

/// Errors that can occur while planning audio chunks
#[derive(Error, Debug)]
pub enum PlanError {
    /// Audio duration is zero or the backend reported nothing to split
    #[error("Empty input: audio duration is {duration_secs} seconds")]
    EmptyInput {
        /// Duration reported by the media backend
        duration_secs: f64,
    },

    /// The media backend could not be read at all
    #[error("Media backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Errors raised by the external recognition engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine process could not be launched
    #[error("Failed to launch recognition engine: {0}")]
    Launch(String),

    /// The engine ran but exited with a failure
    #[error("Recognition engine failed: {0}")]
    Failed(String),

    /// The engine output could not be parsed
    #[error("Failed to parse recognition engine output: {0}")]
    Parse(String),
}

/// Terminal errors for a whole transcription job
#[derive(Error, Debug)]
pub enum JobError {
    /// The input media has no audio to transcribe
    #[error("Empty input media: {0}")]
    EmptyInput(String),

    /// All chunks were processed but nothing was recognized
    #[error("No segments were collected from any chunk")]
    NoSegments,

    /// Chunked mode fell back to single-pass and that also failed
    #[error("Single-pass fallback failed: {0}")]
    FallbackFailed(String),

    /// Error from the recognition engine in single-pass mode
    #[error("Recognition engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from time-code handling
    #[error("Time-code error: {0}")]
    TimeCode(#[from] TimeCodeError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from chunk planning
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Error from the recognition engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Terminal job error
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
