//! TOML configuration for s2ts.
//!
//! One file holds everything: directory layout, automation timing, the ASR
//! surface, synthesis settings and the engine table. Reloading is a pure
//! re-read of the file — no migration logic, no caching.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::defaults;
use crate::engine::session::{EngineTarget, SessionTiming};
use crate::engine::stabilize::StabilizeConfig;
use crate::error::{Result, S2tsError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub timing: TimingConfig,
    pub asr: AsrConfig,
    pub tts: TtsConfig,
    /// Engine name → target descriptor. Ordered for stable listing.
    pub engines: BTreeMap<String, EngineTarget>,
}

/// Directory layout configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub projects_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub screenshot_dir: PathBuf,
}

/// Automation timing configuration. All values feed deliberate sleeps; the
/// system has no event-driven waits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub page_ready_secs: u64,
    pub warmup_secs: u64,
    pub sample_interval_ms: u64,
    pub min_stream_secs: u64,
    pub stable_rounds: u32,
    pub stale_after_secs: u64,
    pub response_timeout_secs: u64,
    pub clipboard_settle_ms: u64,
    pub paste_settle_ms: u64,
    pub copy_settle_ms: u64,
}

/// Desktop transcription surface configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AsrConfig {
    /// Path to the transcription application executable.
    pub exe: Option<PathBuf>,
    /// Directory the application writes transcripts into (fallback source).
    pub output_dir: Option<PathBuf>,
    /// Screen coordinates of the application's queue button.
    pub queue_button: Option<(i32, i32)>,
    /// Screen coordinates of the application's copy-to-clipboard button.
    pub copy_button: Option<(i32, i32)>,
    pub completion_timeout_secs: u64,
    pub poll_interval_secs: u64,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    /// External synthesis command. When unset, only placeholder output is
    /// produced.
    pub command: Option<String>,
    pub sample_rate: u32,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            projects_dir: PathBuf::from("data/projects"),
            prompts_dir: PathBuf::from("prompts"),
            screenshot_dir: PathBuf::from(defaults::SCREENSHOT_DIR),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            page_ready_secs: defaults::PAGE_READY_DELAY.as_secs(),
            warmup_secs: defaults::WARMUP_DELAY.as_secs(),
            sample_interval_ms: defaults::SAMPLE_INTERVAL.as_millis() as u64,
            min_stream_secs: defaults::MIN_STREAM_TIME.as_secs(),
            stable_rounds: defaults::STABLE_ROUNDS,
            stale_after_secs: defaults::STALE_AFTER.as_secs(),
            response_timeout_secs: defaults::RESPONSE_TIMEOUT.as_secs(),
            clipboard_settle_ms: defaults::CLIPBOARD_SETTLE.as_millis() as u64,
            paste_settle_ms: defaults::PASTE_SETTLE.as_millis() as u64,
            copy_settle_ms: defaults::COPY_SETTLE.as_millis() as u64,
        }
    }
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            exe: None,
            output_dir: None,
            queue_button: None,
            copy_button: None,
            completion_timeout_secs: defaults::ASR_COMPLETION_TIMEOUT.as_secs(),
            poll_interval_secs: defaults::ASR_POLL_INTERVAL.as_secs(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            command: None,
            sample_rate: defaults::TTS_SAMPLE_RATE,
        }
    }
}

impl TimingConfig {
    /// Stabilization knobs derived from this timing section.
    pub fn stabilize_config(&self) -> StabilizeConfig {
        StabilizeConfig {
            warmup: Duration::from_secs(self.warmup_secs),
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            min_stream_time: Duration::from_secs(self.min_stream_secs),
            stable_rounds: self.stable_rounds,
            stale_after: Duration::from_secs(self.stale_after_secs),
            response_timeout: Duration::from_secs(self.response_timeout_secs),
        }
    }

    /// Session settle delays derived from this timing section.
    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            page_ready: Duration::from_secs(self.page_ready_secs),
            clipboard_settle: Duration::from_millis(self.clipboard_settle_ms),
            paste_settle: Duration::from_millis(self.paste_settle_ms),
            copy_settle: Duration::from_millis(self.copy_settle_ms),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                S2tsError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                S2tsError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults only when the file does
    /// not exist. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(S2tsError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - S2TS_DATA_DIR → paths.data_dir
    /// - S2TS_ASR_EXE → asr.exe
    /// - S2TS_RESPONSE_TIMEOUT → timing.response_timeout_secs (humantime)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("S2TS_DATA_DIR")
            && !dir.is_empty()
        {
            self.paths.data_dir = PathBuf::from(dir);
        }
        if let Ok(exe) = std::env::var("S2TS_ASR_EXE")
            && !exe.is_empty()
        {
            self.asr.exe = Some(PathBuf::from(exe));
        }
        if let Ok(timeout) = std::env::var("S2TS_RESPONSE_TIMEOUT")
            && let Ok(duration) = humantime::parse_duration(&timeout)
        {
            self.timing.response_timeout_secs = duration.as_secs();
        }
        self
    }

    /// Look up an engine by name, or fall back to the first configured one
    /// when no name is given.
    pub fn engine(&self, name: Option<&str>) -> Result<(&str, &EngineTarget)> {
        match name {
            Some(n) => self
                .engines
                .get_key_value(n)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| S2tsError::UnknownEngine { name: n.to_string() }),
            None => self
                .engines
                .iter()
                .next()
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| S2tsError::ConfigInvalidValue {
                    key: "engines".to_string(),
                    message: "no engines configured".to_string(),
                }),
        }
    }
}

/// Default configuration file location: `$XDG_CONFIG_HOME/s2ts/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("s2ts")
        .join("config.toml")
}
