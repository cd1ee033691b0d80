use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reelforge_capability::{CapabilityProfile, EncoderInventory, Gpu, HostOs};
use reelforge_common::config::SchedulerConfig;
use reelforge_common::error::{ReelforgeError, ReelforgeResult};
use reelforge_job_model::{Job, JobStatus};
use reelforge_scheduler::{BatchProcessor, JobRunner, CANCELLED};
use tokio_util::sync::CancellationToken;

/// Writes the output file unless the background is missing; records peak concurrency.
#[derive(Default)]
struct FakeRunner {
    active: AtomicUsize,
    peak: AtomicUsize,
    delay_ms: u64,
}

impl JobRunner for FakeRunner {
    fn run(&self, job: &Job) -> ReelforgeResult<PathBuf> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(self.delay_ms));
        self.active.fetch_sub(1, Ordering::SeqCst);

        if job.job_id == "panics" {
            panic!("renderer exploded");
        }
        if !job.background_video.exists() {
            return Err(ReelforgeError::render(format!(
                "missing background {}",
                job.background_video.display()
            )));
        }
        std::fs::write(&job.output_file, b"video")?;
        Ok(job.output_file.clone())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

fn jobs(dir: &std::path::Path, ids: &[&str]) -> Vec<Job> {
    let background = dir.join("bg.mp4");
    std::fs::write(&background, b"x").unwrap();
    ids.iter()
        .map(|id| {
            Job::new(
                &background,
                dir.join("voice.mp3"),
                dir.join("captions.json"),
                dir.join(format!("{id}_final.mp4")),
            )
            .with_id(*id)
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_empty_batch_returns_empty() {
    let processor = BatchProcessor::with_max_workers(Arc::new(FakeRunner::default()), 2);
    assert!(processor.process_batch(Vec::new(), false).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_result_per_job_with_duplicate_ids() {
    let dir = tempfile::tempdir().unwrap();
    let mut submitted = jobs(dir.path(), &["a", "b", "c", "d", "e"]);
    submitted.push(submitted[0].clone());

    let processor = BatchProcessor::with_max_workers(Arc::new(FakeRunner::default()), 3);
    let outcomes = processor.process_batch(submitted.clone(), false).await;

    assert_eq!(outcomes.len(), submitted.len());
    let mut expected: HashMap<&str, usize> = HashMap::new();
    for job in &submitted {
        *expected.entry(job.job_id.as_str()).or_default() += 1;
    }
    let mut actual: HashMap<&str, usize> = HashMap::new();
    for outcome in &outcomes {
        *actual.entry(outcome.job_id.as_str()).or_default() += 1;
    }
    assert_eq!(actual, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_missing_background_fails_only_that_job() {
    let dir = tempfile::tempdir().unwrap();
    let mut submitted = jobs(dir.path(), &["first", "broken", "third"]);
    submitted[1].background_video = dir.path().join("missing.mp4");

    let processor = BatchProcessor::with_max_workers(Arc::new(FakeRunner::default()), 2);
    let outcomes = processor.process_batch(submitted, true).await;

    assert_eq!(outcomes.len(), 3);
    let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].job_id, "broken");
    assert_eq!(failed[0].status, JobStatus::Error);
    assert!(failed[0].error.as_deref().unwrap().contains("missing background"));
    assert!(failed[0].result_file.is_none());

    let files: Vec<_> = outcomes
        .iter()
        .filter(|o| o.is_success())
        .map(|o| o.result_file.clone().unwrap())
        .collect();
    assert_eq!(files.len(), 2);
    assert_ne!(files[0], files[1]);
    assert!(files.iter().all(|f| f.exists()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_job_becomes_error_result() {
    let dir = tempfile::tempdir().unwrap();
    let submitted = jobs(dir.path(), &["ok-1", "panics", "ok-2"]);

    let processor = BatchProcessor::with_max_workers(Arc::new(FakeRunner::default()), 3);
    let outcomes = processor.process_batch(submitted, false).await;

    assert_eq!(outcomes.len(), 3);
    let panicked = outcomes.iter().find(|o| o.job_id == "panics").unwrap();
    assert!(!panicked.is_success());
    assert!(panicked.error.as_deref().unwrap().contains("renderer exploded"));
    assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_gpu_profile_caps_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let ids: Vec<String> = (0..12).map(|i| format!("job-{i}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let submitted = jobs(dir.path(), &id_refs);

    let profile = CapabilityProfile::from_parts(
        HostOs::Linux,
        64,
        Gpu::Nvidia { model: None },
        &EncoderInventory::from_names(["h264_nvenc"]),
    );
    let runner = Arc::new(FakeRunner {
        delay_ms: 30,
        ..FakeRunner::default()
    });
    let processor = BatchProcessor::new(runner.clone(), &profile, &SchedulerConfig::default());
    assert_eq!(processor.max_workers(), 4);

    let outcomes = processor.process_batch(submitted, false).await;
    assert_eq!(outcomes.len(), 12);
    let peak = runner.peak.load(Ordering::SeqCst);
    assert!(peak <= 4, "peak concurrency {peak} exceeded the cap");
    assert!(peak >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_explicit_worker_count_wins() {
    let profile = CapabilityProfile::software_only(32);
    let config = SchedulerConfig {
        max_workers: Some(2),
        ..SchedulerConfig::default()
    };
    let processor = BatchProcessor::new(Arc::new(FakeRunner::default()), &profile, &config);
    assert_eq!(processor.max_workers(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancelled_batch_reports_every_job() {
    let dir = tempfile::tempdir().unwrap();
    let submitted = jobs(dir.path(), &["a", "b", "c", "d"]);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let processor = BatchProcessor::with_max_workers(Arc::new(FakeRunner::default()), 1);
    let outcomes = processor
        .process_batch_with_cancel(submitted, false, cancel)
        .await;

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes
        .iter()
        .all(|o| !o.is_success() && o.error.as_deref() == Some(CANCELLED)));
}
