//! Render error types.

use std::path::PathBuf;

use reelforge_common::error::ReelforgeError;
use reelforge_job_model::TrackError;

/// Everything that can go wrong while producing one output file.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to load {path}: {message}")]
    AssetLoad { path: PathBuf, message: String },

    #[error("Failed to read caption track: {0}")]
    CaptionParse(#[from] TrackError),

    #[error("{encoder} write failed: {message}")]
    Write { encoder: String, message: String },

    #[error("Primary encoder failed ({primary}); fallback encoder failed ({fallback})")]
    EncoderFallback {
        primary: Box<RenderError>,
        fallback: Box<RenderError>,
    },

    #[error("Composition failed ({composition}); simplified render failed ({simplified})")]
    Unrecoverable {
        composition: Box<RenderError>,
        simplified: Box<RenderError>,
    },

    #[error("Render backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;

impl RenderError {
    pub fn asset(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::AssetLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn write(encoder: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            encoder: encoder.into(),
            message: message.into(),
        }
    }
}

impl From<RenderError> for ReelforgeError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::AssetLoad { path, .. } if !path.exists() => {
                ReelforgeError::FileNotFound { path }
            }
            RenderError::CaptionParse(err) => ReelforgeError::captions(err.to_string()),
            RenderError::BackendUnavailable(binary) => {
                ReelforgeError::unsupported(format!("{binary} is not installed"))
            }
            RenderError::Io(err) => ReelforgeError::Io(err),
            other => ReelforgeError::render(other.to_string()),
        }
    }
}
