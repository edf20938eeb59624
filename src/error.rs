//! Error types for Gaze Trainer

use thiserror::Error;

/// Errors that can occur while configuring or running a session
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid boundary box: {0}")]
    InvalidGeometry(String),

    #[error("Failed to connect to device: {0}")]
    Connection(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}
