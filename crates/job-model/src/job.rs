//! Render jobs and their outcome records.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::theme::DEFAULT_THEME;

/// One independent render request.
///
/// Jobs are immutable once built. `job_id` is only unique within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "JobSpec")]
pub struct Job {
    pub job_id: String,
    pub background_video: PathBuf,
    pub audio_file: PathBuf,
    pub captions_file: PathBuf,
    pub output_file: PathBuf,
    pub theme: String,
    pub add_music: bool,
    pub add_intro: bool,
    pub add_outro: bool,
}

/// Job descriptor as written by callers; `job_id` may be omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub job_id: Option<String>,
    pub background_video: PathBuf,
    pub audio_file: PathBuf,
    pub captions_file: PathBuf,
    pub output_file: PathBuf,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub add_music: bool,
    #[serde(default)]
    pub add_intro: bool,
    #[serde(default = "default_true")]
    pub add_outro: bool,
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

fn default_true() -> bool {
    true
}

impl From<JobSpec> for Job {
    fn from(spec: JobSpec) -> Self {
        let job_id = spec
            .job_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| derive_job_id(&spec.output_file));
        Self {
            job_id,
            background_video: spec.background_video,
            audio_file: spec.audio_file,
            captions_file: spec.captions_file,
            output_file: spec.output_file,
            theme: spec.theme,
            add_music: spec.add_music,
            add_intro: spec.add_intro,
            add_outro: spec.add_outro,
        }
    }
}

impl Job {
    /// Create a job with default options (default theme, outro on, no music or intro).
    /// The job id is derived from the output file name.
    pub fn new(
        background_video: impl Into<PathBuf>,
        audio_file: impl Into<PathBuf>,
        captions_file: impl Into<PathBuf>,
        output_file: impl Into<PathBuf>,
    ) -> Self {
        let output_file = output_file.into();
        Self {
            job_id: derive_job_id(&output_file),
            background_video: background_video.into(),
            audio_file: audio_file.into(),
            captions_file: captions_file.into(),
            output_file,
            theme: default_theme(),
            add_music: false,
            add_intro: false,
            add_outro: true,
        }
    }

    pub fn with_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = job_id.into();
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn with_music(mut self, add_music: bool) -> Self {
        self.add_music = add_music;
        self
    }

    pub fn with_intro(mut self, add_intro: bool) -> Self {
        self.add_intro = add_intro;
        self
    }

    pub fn with_outro(mut self, add_outro: bool) -> Self {
        self.add_outro = add_outro;
        self
    }
}

/// Derive a job id from the output file name (text before the first dot).
pub fn derive_job_id(output_file: &Path) -> String {
    output_file
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Errors that can occur when reading a job file.
#[derive(Debug, thiserror::Error)]
pub enum JobFileError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load a JSON array of job descriptors.
pub fn load_jobs(path: impl AsRef<Path>) -> Result<Vec<Job>, JobFileError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| JobFileError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| JobFileError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Final status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Error,
}

/// Outcome record produced once per submitted job.
///
/// `result_file` is present iff the status is success, `error` iff it is error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOutcome {
    pub job_id: String,
    pub status: JobStatus,
    pub result_file: Option<PathBuf>,
    /// Wall-clock seconds.
    pub elapsed_time: f64,
    pub error: Option<String>,
}

impl RenderOutcome {
    pub fn success(job_id: impl Into<String>, result_file: PathBuf, elapsed_time: f64) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Success,
            result_file: Some(result_file),
            elapsed_time,
            error: None,
        }
    }

    pub fn failure(job_id: impl Into<String>, error: impl Into<String>, elapsed_time: f64) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Error,
            result_file: None,
            elapsed_time,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}
