//! Command-line interface for s2ts
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Speech to translated speech by driving GUI-hosted engines
#[derive(Parser, Debug)]
#[command(name = "s2ts", version, about = "Speech to translated speech by driving GUI-hosted engines")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output (-v: stage events, -vv: per-poll diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline on an audio file or manual text
    Run {
        /// Input audio file (transcribed by the ASR stage)
        #[arg(long, value_name = "FILE")]
        audio: Option<PathBuf>,

        /// Manual text input (skips the ASR stage)
        #[arg(long, value_name = "TEXT")]
        text: Option<String>,

        /// Engine name from the config (default: first configured)
        #[arg(long, value_name = "NAME")]
        engine: Option<String>,

        /// Target language (repeatable). Examples: Hindi, Kannada, Telugu
        #[arg(long = "lang", value_name = "LANG")]
        langs: Vec<String>,

        /// Skip the transcription stage
        #[arg(long)]
        no_asr: bool,

        /// Skip the text-cleanup stage
        #[arg(long)]
        no_clean: bool,

        /// Skip the translation stage
        #[arg(long)]
        no_translate: bool,

        /// Skip the synthesis stage
        #[arg(long)]
        no_tts: bool,

        /// Reference audio for voice-matched synthesis
        #[arg(long, value_name = "FILE")]
        ref_audio: Option<PathBuf>,

        /// Transcript of the reference audio
        #[arg(long, value_name = "TEXT", default_value = "")]
        ref_text: String,

        /// Per-response deadline override. Examples: 90s, 5m
        #[arg(long, value_name = "DURATION", value_parser = parse_duration_secs)]
        timeout: Option<u64>,
    },

    /// List configured engines
    Engines,

    /// Read raw page text from stdin and print the extracted reply
    Extract {
        /// The exact outbound message to anchor extraction against
        #[arg(long, value_name = "TEXT", default_value = "")]
        sent: String,
    },

    /// Check that required external tools are available
    Check,
}

/// Parse a duration string into seconds.
///
/// Supports any format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`, `2m30s`).
fn parse_duration_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}
