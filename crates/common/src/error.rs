//! Error types shared across Reelforge crates.

use std::path::PathBuf;

/// Top-level error type for Reelforge operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelforgeError {
    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Scheduling error: {message}")]
    Scheduling { message: String },

    #[error("Caption track error: {message}")]
    Captions { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ReelforgeError.
pub type ReelforgeResult<T> = Result<T, ReelforgeError>;

impl ReelforgeError {
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn scheduling(msg: impl Into<String>) -> Self {
        Self::Scheduling {
            message: msg.into(),
        }
    }

    pub fn captions(msg: impl Into<String>) -> Self {
        Self::Captions {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
