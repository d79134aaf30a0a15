use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Recognition model size
    #[serde(default)]
    pub model_size: ModelSize,

    /// Language hint, "auto" for engine-side detection
    #[serde(default = "default_language")]
    pub language: String,

    /// Chunked-processing settings
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Recognition engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Recognition model size
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    #[default]
    Medium,
    Large,
}

impl ModelSize {
    // @returns: Lowercase model identifier as the engine CLI expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Base => "base",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(Self::Tiny),
            "base" => Ok(Self::Base),
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            _ => Err(anyhow!("Invalid model size: {}", s)),
        }
    }
}

/// Chunked-processing configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Whether long audio is split into windows (single-pass when false)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Window size in minutes
    #[serde(default = "default_chunk_minutes")]
    pub chunk_minutes: u32,

    /// Keep per-chunk audio and checkpoint files after the merge
    #[serde(default)]
    pub keep_partial_files: bool,

    /// Worker supervision poll interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_minutes: default_chunk_minutes(),
            keep_partial_files: false,
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Recognition engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Command used to invoke the recognition engine CLI
    #[serde(default = "default_engine_command")]
    pub command: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Corresponding filter for the `log` facade.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_chunk_minutes() -> u32 {
    10
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_engine_command() -> String {
    "whisper".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_minutes == 0 {
            return Err(anyhow!("chunk_minutes must be greater than zero"));
        }

        if self.chunking.poll_interval_secs == 0 {
            return Err(anyhow!("poll_interval_secs must be greater than zero"));
        }

        if self.engine.command.trim().is_empty() {
            return Err(anyhow!("engine command must not be empty"));
        }

        // Language is "auto" or a short ISO-style code
        if self.language != "auto"
            && !(2..=3).contains(&self.language.len())
        {
            return Err(anyhow!(
                "language must be \"auto\" or a 2-3 letter code, got '{}'",
                self.language
            ));
        }

        Ok(())
    }

    /// Language hint for the engine, `None` when auto-detecting.
    pub fn language_hint(&self) -> Option<String> {
        if self.language == "auto" {
            None
        } else {
            Some(self.language.clone())
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            model_size: ModelSize::default(),
            language: default_language(),
            chunking: ChunkingConfig::default(),
            engine: EngineConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
