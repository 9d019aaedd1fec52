//! Command-line interface for litlisten
//!
//! Provides argument parsing using clap derive macros.

use crate::processing::request::ProcessingType;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Region-bounded audio auditioning with backend processing
#[derive(Parser, Debug)]
#[command(name = "litlisten", version, about = "Loop a section of audio, process it, keep listening")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress event output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: info logs, -vv: debug logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Processing backend base URL (overrides config)
    #[arg(long, global = true, value_name = "URL")]
    pub backend: Option<String>,
}

/// Region and transport options shared by `play` and `session`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PlaybackArgs {
    /// Region start. Examples: 12, 12.5, 1m30s
    #[arg(long, value_name = "TIME", value_parser = parse_seconds)]
    pub start: Option<f64>,

    /// Region end. Examples: 45, 2m, 1m30s500ms
    #[arg(long, value_name = "TIME", value_parser = parse_seconds)]
    pub end: Option<f64>,

    /// Playback rate (0.5 - 2.0)
    #[arg(long, value_name = "RATE")]
    pub rate: Option<f64>,

    /// Volume (0.0 - 1.0)
    #[arg(long, value_name = "LEVEL")]
    pub volume: Option<f64>,

    /// Loop the region
    #[arg(long = "loop")]
    pub looping: bool,
}

/// Parse a time offset into seconds.
///
/// Supports bare numbers (seconds, fractional allowed) and any duration
/// format accepted by `humantime`: `30s`, `1m30s`, `250ms`.
pub fn parse_seconds(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            return Ok(secs);
        }
        return Err(format!("'{}' is not a valid time", s));
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs_f64())
        .map_err(|e| e.to_string())
}

fn parse_processing_type(s: &str) -> Result<ProcessingType, String> {
    s.parse()
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a region of a WAV file and exit when it finishes
    Play {
        /// Audio file to play
        file: PathBuf,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Send a file through the processing backend and print the result
    Process {
        /// Audio file to process (as the backend sees it)
        file: String,

        /// Transformation to apply (pitch, amplification, compression, filter, denoise)
        #[arg(long = "type", short = 't', value_name = "TYPE", value_parser = parse_processing_type)]
        processing_type: Option<ProcessingType>,

        /// Parameter override as NAME=VALUE (e.g., pitch=1.2, ratio=4)
        #[arg(long = "set", short = 's', value_name = "NAME=VALUE")]
        params: Vec<String>,
    },

    /// Interactive audition session reading commands from stdin
    Session {
        /// Audio file to open at start
        file: Option<String>,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
