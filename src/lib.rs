//! s2ts - Speech to translated speech by driving GUI-hosted engines.
//!
//! Four stages — transcription, text cleanup, translation, synthesis —
//! where the middle two run through browser-hosted chat engines with no
//! API: interaction is simulated input and clipboard exchange, and
//! completion is inferred by the response-stabilization engine.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod asr;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod prompts;
pub mod state;
pub mod tts;

// Core traits (bridge → engine → pipeline)
pub use bridge::{CommandExecutor, InputBridge, KeyCombo, SystemCommandExecutor};
pub use engine::{
    CancelToken, EngineTarget, Outcome, Session, StabilizationResult, StabilizeConfig, Surface,
    extract_reply, stabilize,
};

// Pipeline
pub use pipeline::progress::{ChannelSink, EventSink, LogSink, NullSink, Stage, StageEvent};
pub use pipeline::{Pipeline, PipelineJob, PipelineReport, StageSet};

// Error handling
pub use error::{Result, S2tsError};

// Config
pub use config::{Config, default_config_path};

// Collaborator seams
pub use tts::{SilenceSynthesizer, SynthesisRequest, Synthesizer};

/// Build version string from the crate metadata.
pub fn version_string() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
