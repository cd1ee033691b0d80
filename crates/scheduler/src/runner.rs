//! Job runners: how a single job is executed by a worker.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

use reelforge_capability::CapabilityProfile;
use reelforge_common::error::{ReelforgeError, ReelforgeResult};
use reelforge_job_model::Job;
use reelforge_render_engine::{CompositionEngine, FfmpegBackend, MediaBackend};

/// Executes one job to completion on the calling thread.
///
/// Runners are shared by every worker in a batch and must not keep per-job
/// state.
pub trait JobRunner: Send + Sync {
    /// Render the job and return the output path.
    fn run(&self, job: &Job) -> ReelforgeResult<PathBuf>;

    /// Runner name for logs.
    fn name(&self) -> &str;
}

/// Renders in-process through a shared composition engine.
pub struct EngineRunner<B = FfmpegBackend> {
    engine: Arc<CompositionEngine<B>>,
}

impl<B> EngineRunner<B> {
    pub fn new(engine: Arc<CompositionEngine<B>>) -> Self {
        Self { engine }
    }
}

impl<B: MediaBackend> JobRunner for EngineRunner<B> {
    fn run(&self, job: &Job) -> ReelforgeResult<PathBuf> {
        Ok(self.engine.render(job)?)
    }

    fn name(&self) -> &str {
        "engine"
    }
}

/// Renders each job in a separate `reelforge worker` process.
///
/// A crash inside the media stack then takes down only that worker process.
///
/// The parent's capability profile is handed to every worker so detection
/// still runs once per batch.
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    program: PathBuf,
    config_path: Option<PathBuf>,
    profile_json: Option<String>,
}

impl SubprocessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            config_path: None,
            profile_json: None,
        }
    }

    /// Re-run the current executable as the worker.
    pub fn current_exe() -> ReelforgeResult<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Forward a config file to every worker.
    pub fn with_config(mut self, config_path: Option<PathBuf>) -> Self {
        self.config_path = config_path;
        self
    }

    /// Reuse an already detected profile in every worker.
    pub fn with_profile(mut self, profile: &CapabilityProfile) -> ReelforgeResult<Self> {
        self.profile_json = Some(serde_json::to_string(profile)?);
        Ok(self)
    }

    fn command(&self, job_json: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(config) = &self.config_path {
            cmd.arg("--config").arg(config);
        }
        cmd.arg("worker").arg("--job").arg(job_json);
        if let Some(profile) = &self.profile_json {
            cmd.arg("--profile").arg(profile);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl JobRunner for SubprocessRunner {
    fn run(&self, job: &Job) -> ReelforgeResult<PathBuf> {
        let job_json = serde_json::to_string(job)?;
        let output = self
            .command(&job_json)
            .output()
            .map_err(|e| ReelforgeError::scheduling(format!("failed to start worker: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelforgeError::render(format!(
                "worker exited with {}: {}",
                output.status,
                last_line(&stderr).unwrap_or("no error output")
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(last_line(&stdout)
            .map(PathBuf::from)
            .unwrap_or_else(|| job.output_file.clone()))
    }

    fn name(&self) -> &str {
        "subprocess"
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rfind(|line| !line.is_empty())
}
