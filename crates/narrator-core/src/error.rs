use thiserror::Error;

/// Top-level error type for the narrator.
///
/// Nothing here is fatal to the host process. The service hooks convert every
/// variant into silence plus a log line; the variants exist so the internal
/// stages can report *why* nothing was spoken.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NarratorError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host has no active window root to read.
    #[error("Host unavailable: no active root node")]
    HostUnavailable,

    /// The speech device could not be constructed.
    #[error("Speech device initialization failed: {0}")]
    DeviceInitFailure(String),

    /// The active window exposed no visible text.
    #[error("No visible text extracted")]
    EmptyExtraction,

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Coordinator error: {0}")]
    Coordinator(String),

    #[error("Trace error: {0}")]
    Trace(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for NarratorError {
    fn from(err: toml::de::Error) -> Self {
        NarratorError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for NarratorError {
    fn from(err: toml::ser::Error) -> Self {
        NarratorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for NarratorError {
    fn from(err: serde_json::Error) -> Self {
        NarratorError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for narrator operations.
pub type Result<T> = std::result::Result<T, NarratorError>;
