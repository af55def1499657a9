//! Error types for s2ts.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum S2tsError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Unknown engine: {name}")]
    UnknownEngine { name: String },

    // Session errors
    #[error("Failed to launch target surface {address}: {message}")]
    Launch { address: String, message: String },

    #[error("Session used in state {state}: {message}")]
    SessionState { state: String, message: String },

    // Bridge errors
    #[error("Automation tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("Automation tool permission denied: {message}")]
    ToolPermissionDenied { message: String },

    #[error("Clipboard write failed: {message}")]
    ClipboardWrite { message: String },

    // Stage errors
    #[error("Transcription surface failed: {message}")]
    Asr { message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, S2tsError>;
