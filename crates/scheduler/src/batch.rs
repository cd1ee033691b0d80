//! Bounded parallel batch processing.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use reelforge_capability::CapabilityProfile;
use reelforge_common::config::SchedulerConfig;
use reelforge_job_model::{derive_job_id, Job, RenderOutcome, DEFAULT_THEME};

use crate::runner::JobRunner;

/// Error message recorded for jobs that never started because the batch was cancelled.
pub const CANCELLED: &str = "cancelled";

/// Worker count derived from the capability profile.
///
/// The CPU thread budget, capped at `gpu_worker_cap` whenever renders go
/// through a GPU path. The cap is a fixed policy ceiling for concurrent
/// hardware encoder sessions; device memory is never queried.
pub fn default_worker_count(profile: &CapabilityProfile, gpu_worker_cap: usize) -> usize {
    let budget = profile.cpu_thread_budget;
    let workers = if profile.gpu_in_use() {
        budget.min(gpu_worker_cap)
    } else {
        budget
    };
    workers.max(1)
}

/// Options for [`create_job`].
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Explicit id; derived from the output file name when `None`.
    pub job_id: Option<String>,
    pub theme: String,
    pub add_music: bool,
    pub add_intro: bool,
    pub add_outro: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            job_id: None,
            theme: DEFAULT_THEME.to_string(),
            add_music: false,
            add_intro: false,
            add_outro: true,
        }
    }
}

/// Build a job descriptor from asset paths and options.
pub fn create_job(
    background_video: impl Into<PathBuf>,
    audio_file: impl Into<PathBuf>,
    captions_file: impl Into<PathBuf>,
    output_file: impl Into<PathBuf>,
    options: JobOptions,
) -> Job {
    let output_file = output_file.into();
    let job_id = options
        .job_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| derive_job_id(&output_file));
    Job::new(background_video, audio_file, captions_file, output_file)
        .with_id(job_id)
        .with_theme(options.theme)
        .with_music(options.add_music)
        .with_intro(options.add_intro)
        .with_outro(options.add_outro)
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[RenderOutcome], elapsed_secs: f64) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            elapsed_secs,
        }
    }
}

/// Runs jobs on a fixed-size worker pool.
pub struct BatchProcessor {
    runner: Arc<dyn JobRunner>,
    max_workers: usize,
}

impl BatchProcessor {
    /// Size the pool from configuration, falling back to the capability profile.
    pub fn new(
        runner: Arc<dyn JobRunner>,
        profile: &CapabilityProfile,
        config: &SchedulerConfig,
    ) -> Self {
        let max_workers = config
            .max_workers
            .unwrap_or_else(|| default_worker_count(profile, config.gpu_worker_cap));
        Self::with_max_workers(runner, max_workers)
    }

    pub fn with_max_workers(runner: Arc<dyn JobRunner>, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        tracing::info!(
            max_workers,
            runner = runner.name(),
            "Batch processor initialized"
        );
        Self {
            runner,
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run every job and return one outcome per job, in completion order.
    ///
    /// Never fails as a whole: a job that errors or panics yields an `error`
    /// outcome and its siblings keep running.
    pub async fn process_batch(&self, jobs: Vec<Job>, show_progress: bool) -> Vec<RenderOutcome> {
        self.process_batch_with_cancel(jobs, show_progress, CancellationToken::new())
            .await
    }

    /// Like [`process_batch`](Self::process_batch), but jobs that have not
    /// started when `cancel` fires are reported as `error` outcomes with the
    /// message [`CANCELLED`]. Jobs already running are never interrupted.
    pub async fn process_batch_with_cancel(
        &self,
        jobs: Vec<Job>,
        show_progress: bool,
        cancel: CancellationToken,
    ) -> Vec<RenderOutcome> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let total = jobs.len();
        let started = Instant::now();
        tracing::info!(jobs = total, max_workers = self.max_workers, "Batch started");

        let mut outstanding: HashMap<String, usize> = HashMap::new();
        for job in &jobs {
            *outstanding.entry(job.job_id.clone()).or_default() += 1;
        }

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut workers = JoinSet::new();
        for job in jobs {
            let semaphore = Arc::clone(&semaphore);
            let runner = Arc::clone(&self.runner);
            let cancel = cancel.clone();
            workers.spawn(run_job(job, runner, semaphore, cancel));
        }

        let mut progress = BatchProgress::new(total, show_progress);
        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => {
                    if let Some(remaining) = outstanding.get_mut(&outcome.job_id) {
                        *remaining = remaining.saturating_sub(1);
                    }
                    progress.record(&outcome);
                    outcomes.push(outcome);
                }
                Err(err) => {
                    tracing::error!(error = %err, "Worker task failed outside the render call");
                }
            }
        }

        // Worker tasks that died before reporting still owe a result.
        for (job_id, remaining) in outstanding {
            for _ in 0..remaining {
                let outcome = RenderOutcome::failure(
                    job_id.clone(),
                    "worker terminated without a result",
                    0.0,
                );
                progress.record(&outcome);
                outcomes.push(outcome);
            }
        }
        progress.finish();

        let summary = BatchSummary::from_outcomes(&outcomes, started.elapsed().as_secs_f64());
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_secs = summary.elapsed_secs,
            "Batch finished"
        );
        outcomes
    }
}

async fn run_job(
    job: Job,
    runner: Arc<dyn JobRunner>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> RenderOutcome {
    let job_id = job.job_id.clone();

    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::info!(job_id = %job_id, "Job cancelled before start");
            return RenderOutcome::failure(job_id, CANCELLED, 0.0);
        }
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return RenderOutcome::failure(job_id, "worker pool closed", 0.0),
        },
    };
    if cancel.is_cancelled() {
        return RenderOutcome::failure(job_id, CANCELLED, 0.0);
    }

    tracing::info!(job_id = %job_id, "Job running");
    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || runner.run(&job)).await;
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(Ok(output)) => {
            tracing::info!(
                job_id = %job_id,
                output = %output.display(),
                elapsed_secs = elapsed,
                "Job succeeded"
            );
            RenderOutcome::success(job_id, output, elapsed)
        }
        Ok(Err(err)) => {
            tracing::error!(job_id = %job_id, error = %err, elapsed_secs = elapsed, "Job failed");
            RenderOutcome::failure(job_id, err.to_string(), elapsed)
        }
        Err(join_err) => {
            let message = panic_message(join_err);
            tracing::error!(job_id = %job_id, error = %message, "Job panicked");
            RenderOutcome::failure(job_id, message, elapsed)
        }
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {message}")
    } else {
        "worker panicked".to_string()
    }
}

/// Single-line progress counter on stderr.
struct BatchProgress {
    total: usize,
    done: usize,
    failed: usize,
    enabled: bool,
}

impl BatchProgress {
    fn new(total: usize, enabled: bool) -> Self {
        Self {
            total,
            done: 0,
            failed: 0,
            enabled,
        }
    }

    fn record(&mut self, outcome: &RenderOutcome) {
        self.done += 1;
        if !outcome.is_success() {
            self.failed += 1;
        }
        if self.enabled {
            let mut stderr = std::io::stderr().lock();
            let _ = write!(
                stderr,
                "\r  Rendered {}/{} ({} failed)  ",
                self.done, self.total, self.failed
            );
            let _ = stderr.flush();
        }
    }

    fn finish(&self) {
        if self.enabled {
            eprintln!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelforge_capability::{EncoderInventory, Gpu, HostOs};

    fn nvidia(cores: usize) -> CapabilityProfile {
        CapabilityProfile::from_parts(
            HostOs::Linux,
            cores,
            Gpu::Nvidia { model: None },
            &EncoderInventory::from_names(["h264_nvenc"]),
        )
    }

    #[test]
    fn test_worker_count_without_gpu_uses_thread_budget() {
        assert_eq!(
            default_worker_count(&CapabilityProfile::software_only(16), 4),
            15
        );
        assert_eq!(default_worker_count(&CapabilityProfile::software_only(2), 4), 4);
    }

    #[test]
    fn test_worker_count_with_gpu_is_capped() {
        assert_eq!(default_worker_count(&nvidia(64), 4), 4);
        assert_eq!(default_worker_count(&nvidia(64), 2), 2);
        assert_eq!(default_worker_count(&nvidia(64), 0), 1);
    }

    #[test]
    fn test_forced_software_lifts_gpu_cap() {
        let profile = nvidia(16).with_overrides(&reelforge_common::config::EncodingConfig {
            force_software: true,
            ..Default::default()
        });
        assert_eq!(default_worker_count(&profile, 4), 15);
    }

    #[test]
    fn test_create_job_derives_id() {
        let job = create_job(
            "bg.mp4",
            "a.mp3",
            "c.json",
            "out/story.final.mp4",
            JobOptions::default(),
        );
        assert_eq!(job.job_id, "story");
        assert!(job.add_outro);
        assert_eq!(job.theme, "default");

        let job = create_job(
            "bg.mp4",
            "a.mp3",
            "c.json",
            "out.mp4",
            JobOptions {
                job_id: Some("custom".into()),
                theme: "retro".into(),
                add_music: true,
                ..JobOptions::default()
            },
        );
        assert_eq!(job.job_id, "custom");
        assert_eq!(job.theme, "retro");
        assert!(job.add_music);
    }

    #[test]
    fn test_summary_counts() {
        let outcomes = vec![
            RenderOutcome::success("a", "a.mp4".into(), 1.0),
            RenderOutcome::failure("b", "boom", 0.5),
        ];
        let summary = BatchSummary::from_outcomes(&outcomes, 2.0);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
    }
}
