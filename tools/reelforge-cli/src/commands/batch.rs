//! Render many shorts with a bounded worker pool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use reelforge_common::config::AppConfig;
use reelforge_job_model::{load_jobs, RenderOutcome};
use reelforge_scheduler::{
    jobs_from_directory, BatchProcessor, BatchSummary, EngineRunner, JobOptions, JobRunner,
    SubprocessRunner,
};

use super::{build_engine, detect_profile};

/// Where the batch gets its jobs from.
pub enum JobSource {
    /// JSON array of job descriptors.
    File(PathBuf),
    /// Assets grouped by file stem.
    Directory {
        input: PathBuf,
        output: PathBuf,
        options: JobOptions,
    },
}

#[derive(Serialize)]
struct BatchReport<'a> {
    summary: &'a BatchSummary,
    results: &'a [RenderOutcome],
}

pub async fn run(
    mut config: AppConfig,
    config_path: Option<PathBuf>,
    source: JobSource,
    workers: Option<usize>,
    isolate: bool,
    show_progress: bool,
    results: Option<PathBuf>,
) -> anyhow::Result<()> {
    let jobs = match &source {
        JobSource::File(path) => {
            println!("Loading jobs from {}", path.display());
            load_jobs(path)?
        }
        JobSource::Directory {
            input,
            output,
            options,
        } => {
            println!("Scanning {} for asset groups", input.display());
            jobs_from_directory(input, output, options)?
        }
    };

    if jobs.is_empty() {
        println!("No jobs to render.");
        return Ok(());
    }

    if workers.is_some() {
        config.scheduler.max_workers = workers;
    }

    let profile = detect_profile(&config);
    let runner: Arc<dyn JobRunner> = if isolate {
        Arc::new(
            SubprocessRunner::current_exe()?
                .with_config(config_path)
                .with_profile(&profile)?,
        )
    } else {
        Arc::new(EngineRunner::new(Arc::new(build_engine(
            &config,
            Arc::clone(&profile),
        ))))
    };
    let processor = BatchProcessor::new(runner, &profile, &config.scheduler);

    println!(
        "Rendering {} job(s) with {} worker(s) using {}",
        jobs.len(),
        processor.max_workers(),
        profile.encoder
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, pending jobs will be cancelled");
            signal_token.cancel();
        }
    });

    let started = Instant::now();
    let outcomes = processor
        .process_batch_with_cancel(jobs, show_progress, cancel)
        .await;
    let summary = BatchSummary::from_outcomes(&outcomes, started.elapsed().as_secs_f64());

    println!();
    for outcome in &outcomes {
        match (&outcome.result_file, &outcome.error) {
            (Some(file), _) => println!(
                "  [OK]   {} -> {} ({:.1}s)",
                outcome.job_id,
                file.display(),
                outcome.elapsed_time
            ),
            (None, error) => println!(
                "  [FAIL] {}: {}",
                outcome.job_id,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    println!();
    println!(
        "Batch complete: {}/{} succeeded, {} failed in {:.1}s",
        summary.succeeded, summary.total, summary.failed, summary.elapsed_secs
    );

    if let Some(path) = results {
        let report = BatchReport {
            summary: &summary,
            results: &outcomes,
        };
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        println!("Results written to {}", path.display());
    }

    if summary.failed > 0 {
        anyhow::bail!("{} of {} jobs failed", summary.failed, summary.total);
    }
    Ok(())
}
