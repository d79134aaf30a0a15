// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]

use anyhow::{Result, anyhow, Context};
use log::{warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use std::fs::File;
use std::io::BufReader;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::app_config::{Config, ModelSize};
use app_controller::{Controller, RunOptions};
use file_utils::FileManager;

mod app_config;
mod app_controller;
mod audio_planner;
mod chunk_orchestrator;
mod errors;
mod file_utils;
mod media;
mod subtitle_processor;
mod timecode;
mod transcription;

/// CLI Wrapper for ModelSize to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl From<CliModelSize> for ModelSize {
    fn from(cli_model: CliModelSize) -> Self {
        match cli_model {
            CliModelSize::Tiny => ModelSize::Tiny,
            CliModelSize::Base => ModelSize::Base,
            CliModelSize::Small => ModelSize::Small,
            CliModelSize::Medium => ModelSize::Medium,
            CliModelSize::Large => ModelSize::Large,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcribe media into SRT subtitles, or normalize an SRT file (default command)
    #[command(alias = "run")]
    Transcribe(TranscribeArgs),

    /// Normalize a non-conformant SRT file into canonical form
    Convert(ConvertArgs),

    /// Generate shell completions for whispersub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// SRT file to normalize
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Output path (defaults to `<stem>_normalized.srt` next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip writing the conversion report
    #[arg(long)]
    no_report: bool,

    /// Also write the dialogue text without indices or time lines
    #[arg(long)]
    plain_text: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct TranscribeArgs {
    /// Input media file, SRT file, or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Whisper model size to use
    #[arg(short, long, value_enum)]
    model: Option<CliModelSize>,

    /// Language code hint (e.g. 'en', 'ja'), or 'auto' for detection
    #[arg(short = 's', long)]
    language: Option<String>,

    /// Chunk length in minutes
    #[arg(long)]
    chunk_minutes: Option<u32>,

    /// Keep intermediate audio chunks and checkpoint files
    #[arg(short, long)]
    keep_partial: bool,

    /// Run one recognition call over the whole audio, without chunking
    #[arg(long)]
    single_pass: bool,

    /// Skip writing a conversion report for SRT inputs
    #[arg(long)]
    no_report: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// whispersub - Chunked Whisper Transcription & SRT Toolkit
///
/// Transcribes long media files into SubRip subtitles with per-chunk
/// deadlines and checkpoints, and repairs non-conformant SRT files.
#[derive(Parser, Debug)]
#[command(name = "whispersub")]
#[command(version = "1.0.0")]
#[command(about = "Chunked Whisper transcription and SRT normalization tool")]
#[command(long_about = "whispersub transcribes media files into SRT subtitles using a local
Whisper CLI, splitting long audio into chunks so one stuck recognition call
never loses the whole job. SRT inputs are normalized to canonical form instead.

EXAMPLES:
    whispersub movie.mkv                      # Transcribe using default config
    whispersub -f movie.mkv                   # Force overwrite existing files
    whispersub -m large -s ja movie.mkv       # Use a specific model and language
    whispersub --chunk-minutes 5 lecture.mp3  # Shorter chunks for flaky audio
    whispersub --single-pass clip.wav         # Skip chunking entirely
    whispersub broken.srt                     # Normalize a non-conformant SRT
    whispersub convert broken.srt --plain-text # Normalize and dump dialogue text
    whispersub --log-level debug /media/      # Process a directory with debug logging
    whispersub completions bash > ws.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a
    different config file with --config-path. If the config file doesn't
    exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input media file, SRT file, or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Whisper model size to use
    #[arg(short, long, value_enum)]
    model: Option<CliModelSize>,

    /// Language code hint (e.g. 'en', 'ja'), or 'auto' for detection
    #[arg(short = 's', long)]
    language: Option<String>,

    /// Chunk length in minutes
    #[arg(long)]
    chunk_minutes: Option<u32>,

    /// Keep intermediate audio chunks and checkpoint files
    #[arg(short, long)]
    keep_partial: bool,

    /// Run one recognition call over the whole audio, without chunking
    #[arg(long)]
    single_pass: bool,

    /// Skip writing a conversion report for SRT inputs
    #[arg(long)]
    no_report: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");

            let mut stderr = std::io::stderr();
            let emoji = Self::get_emoji_for_level(record.level());
            let color = match record.level() {
                Level::Error => "\x1B[1;31m",
                Level::Warn => "\x1B[1;33m",
                Level::Info => "\x1B[1;32m",
                Level::Debug => "\x1B[1;36m",
                Level::Trace => "\x1B[1;35m",
            };
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    // Handle subcommands
    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "whispersub", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Transcribe(args)) => run_transcribe(args).await,
        Some(Commands::Convert(args)) => run_convert(args),
        None => {
            // Default behavior - use top-level args for backwards compatibility
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("INPUT_PATH is required when no subcommand is specified")
            })?;

            let transcribe_args = TranscribeArgs {
                input_path,
                force_overwrite: cli.force_overwrite,
                model: cli.model,
                language: cli.language,
                chunk_minutes: cli.chunk_minutes,
                keep_partial: cli.keep_partial,
                single_pass: cli.single_pass,
                no_report: cli.no_report,
                config_path: cli.config_path,
                log_level: cli.log_level,
            };
            run_transcribe(transcribe_args).await
        }
    }
}

async fn run_transcribe(options: TranscribeArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(config_log_level.to_level_filter());
    }

    // Load or create configuration
    let config_path = &options.config_path;
    let config = if Path::new(config_path).exists() {
        // Load existing configuration
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        let mut config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;

        // Override config with CLI options if provided
        if let Some(model) = &options.model {
            config.model_size = model.clone().into();
        }

        if let Some(language) = &options.language {
            config.language = language.clone();
        }

        if let Some(chunk_minutes) = options.chunk_minutes {
            config.chunking.chunk_minutes = chunk_minutes;
        }

        if options.keep_partial {
            config.chunking.keep_partial_files = true;
        }

        // Update log level in config if specified via command line
        if let Some(log_level) = &options.log_level {
            config.log_level = log_level.clone().into();
        }

        config
    } else {
        // Create default configuration if not exists
        warn!("Config file not found at '{}', creating default config.", config_path);

        let mut config = Config::default();

        if let Some(model) = &options.model {
            config.model_size = model.clone().into();
        }
        if let Some(language) = &options.language {
            config.language = language.clone();
        }
        if let Some(chunk_minutes) = options.chunk_minutes {
            config.chunking.chunk_minutes = chunk_minutes;
        }
        if options.keep_partial {
            config.chunking.keep_partial_files = true;
        }
        if let Some(log_level) = &options.log_level {
            config.log_level = log_level.clone().into();
        }

        // Save default config
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    // Validate the configuration after loading and overriding
    config.validate()
        .context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    // Create controller
    let controller = Controller::with_config(config)?;

    let run_options = RunOptions {
        force_overwrite: options.force_overwrite,
        single_pass: options.single_pass,
        write_report: !options.no_report,
    };

    // Run the controller with the input file(s) and output directory
    if options.input_path.is_file() {
        // Process a single file
        controller.run(
            options.input_path.clone(),
            options.input_path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            run_options,
        ).await?;
    } else if options.input_path.is_dir() {
        // Process a directory
        controller.run_folder(options.input_path.clone(), run_options).await?;
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    Ok(())
}

fn run_convert(options: ConvertArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(config_log_level.to_level_filter());
    }

    if !options.input_file.is_file() {
        return Err(anyhow!("Input file does not exist: {:?}", options.input_file));
    }

    let output_path = match options.output {
        Some(path) => path,
        None => {
            let output_dir = options
                .input_file
                .parent()
                .unwrap_or(Path::new("."))
                .to_path_buf();
            FileManager::generate_output_path(
                &options.input_file,
                &output_dir,
                app_controller::CONVERT_SUFFIX,
            )
        }
    };

    let controller = Controller::with_config(Config::default())?;
    controller.convert(
        &options.input_file,
        &output_path,
        !options.no_report,
        options.plain_text,
    )
}
