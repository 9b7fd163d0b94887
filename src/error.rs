//! Centralized error types for the channel registry
//!
//! All crate errors are represented by the `LogError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, LogError>`.

use std::fmt;
use std::path::PathBuf;

/// All registry and sink errors
#[derive(Debug)]
pub enum LogError {
    // === Output ===
    /// Writing a record to its destination failed
    Write { source: std::io::Error },
    /// Encoding a record failed
    Encode {
        format: &'static str,
        source: serde_json::Error,
    },
    /// Decoding an encoded record back into fields failed
    Decode {
        format: &'static str,
        source: serde_json::Error,
    },
    /// A wrapped destination does not support an optional capability
    Unimplemented { capability: &'static str },

    // === Iteration ===
    /// Error raised by an `iterate` visitor
    Visitor { message: String },

    // === Config ===
    /// Failed to read a config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Subscriber ===
    /// Installing the global tracing subscriber failed
    SubscriberInit { reason: String },
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Write { source } | Self::ConfigRead { source, .. } => Some(source),
            Self::Encode { source, .. } | Self::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write { source } => write!(f, "Cannot write log record: {}", source),
            Self::Encode { format, source } => {
                write!(f, "Cannot encode record as {}: {}", format, source)
            }
            Self::Decode { format, source } => {
                write!(f, "Cannot decode {} record: {}", format, source)
            }
            Self::Unimplemented { capability } => {
                write!(f, "Unimplemented method: {}", capability)
            }
            Self::Visitor { message } => write!(f, "Visitor failed: {}", message),
            Self::ConfigRead { path, .. } => write!(f, "Cannot read config: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::SubscriberInit { reason } => {
                write!(f, "Cannot install tracing subscriber: {}", reason)
            }
        }
    }
}

impl From<std::io::Error> for LogError {
    fn from(source: std::io::Error) -> Self {
        Self::Write { source }
    }
}

/// Alias for Result with LogError
pub type Result<T> = std::result::Result<T, LogError>;
