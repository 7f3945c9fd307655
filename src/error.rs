//! Error types for the voice command core

use thiserror::Error;

/// Result type alias for voice command operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice command core
///
/// Per-utterance conditions (no match, blocked by context, failed transcription)
/// are not errors; they are reported through
/// [`RecognitionOutcome`](crate::command::RecognitionOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// No capture device is available
    #[error("no microphone available")]
    NoMicrophone,

    /// Transcription service error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Skill catalog error
    #[error("skill catalog error: {0}")]
    Catalog(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
