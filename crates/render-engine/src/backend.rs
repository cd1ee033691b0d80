//! Media backends: duration probing and encoding.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use reelforge_capability::EncoderParameters;

use crate::error::{RenderError, RenderResult};
use crate::filter::build_ffmpeg_args;
use crate::timeline::TimelinePlan;

/// Progress callback for a single write.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send + Sync>;

/// Write progress report.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Output time written so far.
    pub out_time_secs: f64,

    /// Expected output length.
    pub total_secs: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: RenderStage,
}

/// Stages of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Preparing,
    Encoding,
    Finalizing,
    Complete,
}

/// Trait for media backends.
///
/// The engine only needs two things from a media library: the duration of an
/// input and the ability to write a planned timeline with given encoder
/// parameters.
pub trait MediaBackend: Send + Sync {
    /// Duration of a media file in seconds.
    fn probe_duration(&self, path: &Path) -> RenderResult<f64>;

    /// Write the plan to `plan.output`.
    fn write(
        &self,
        plan: &TimelinePlan,
        params: &EncoderParameters,
        progress: Option<&ProgressCallback>,
    ) -> RenderResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Backend driving the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegBackend {
    /// Use `ffmpeg` and `ffprobe` from `PATH`.
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    fn run_ffmpeg(
        &self,
        args: &[String],
        encoder: &str,
        total_secs: f64,
        progress: Option<&ProgressCallback>,
    ) -> RenderResult<()> {
        tracing::debug!(?args, "Running ffmpeg");
        let mut child = Command::new(&self.ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    RenderError::BackendUnavailable(self.ffmpeg.display().to_string())
                }
                _ => RenderError::write(encoder, format!("failed to start ffmpeg: {e}")),
            })?;

        let start = Instant::now();
        tracing::info!(
            pid = child.id(),
            encoder,
            total_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RenderError::write(encoder, "failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RenderError::write(encoder, "failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut state = ProgressState::default();
        loop {
            line.clear();
            let bytes = match reader.read_line(&mut line) {
                Ok(bytes) => bytes,
                Err(e) => {
                    // Reap ffmpeg so neither it nor the stderr reader outlives the write.
                    if let Err(kill_err) = child.kill() {
                        tracing::debug!(error = %kill_err, "ffmpeg already exited");
                    }
                    let _ = child.wait();
                    let _ = stderr_task.join();
                    return Err(RenderError::write(
                        encoder,
                        format!("failed reading ffmpeg progress: {e}"),
                    ));
                }
            };
            if bytes == 0 {
                break;
            }

            if let Some((key, value)) = line.trim().split_once('=') {
                state.update(key, value);
                if key == "progress" {
                    if let Some(cb) = progress {
                        cb(progress_report(
                            &state,
                            total_secs,
                            start.elapsed().as_secs_f64(),
                        ));
                    }
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| RenderError::write(encoder, format!("failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(RenderError::write(
                encoder,
                format!("ffmpeg exited with {status}: {}", stderr_tail(&stderr_output)),
            ));
        }

        tracing::info!(
            encoder,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "ffmpeg write finished"
        );
        Ok(())
    }
}

impl MediaBackend for FfmpegBackend {
    fn probe_duration(&self, path: &Path) -> RenderResult<f64> {
        if !path.exists() {
            return Err(RenderError::asset(path, "file not found"));
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    RenderError::BackendUnavailable(self.ffprobe.display().to_string())
                }
                _ => RenderError::asset(path, format!("failed to run ffprobe: {e}")),
            })?;

        if !output.status.success() {
            return Err(RenderError::asset(
                path,
                format!(
                    "ffprobe exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| RenderError::asset(path, "media has no readable duration"))
    }

    fn write(
        &self,
        plan: &TimelinePlan,
        params: &EncoderParameters,
        progress: Option<&ProgressCallback>,
    ) -> RenderResult<()> {
        if let Some(parent) = plan.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let total_secs = plan.total_duration_secs();
        if let Some(cb) = progress {
            cb(RenderProgress {
                progress: 0.0,
                out_time_secs: 0.0,
                total_secs,
                eta_secs: 0.0,
                stage: RenderStage::Preparing,
            });
        }

        let args = build_ffmpeg_args(plan, params);
        let result = self.run_ffmpeg(&args, &params.codec, total_secs, progress);
        if result.is_err() && plan.output.exists() {
            if let Err(err) = std::fs::remove_file(&plan.output) {
                tracing::debug!(
                    error = %err,
                    path = %plan.output.display(),
                    "Could not remove partial output"
                );
            }
        }
        result?;

        if let Some(cb) = progress {
            cb(RenderProgress {
                progress: 1.0,
                out_time_secs: total_secs,
                total_secs,
                eta_secs: 0.0,
                stage: RenderStage::Complete,
            });
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        [&self.ffmpeg, &self.ffprobe].iter().all(|binary| {
            Command::new(binary)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Parse the single `format=duration` value printed by ffprobe.
fn parse_probe_duration(stdout: &str) -> Option<f64> {
    let secs = stdout.lines().next()?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

/// Last few stderr lines; ffmpeg prints the actual failure at the end.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let from = lines.len().saturating_sub(8);
    lines[from..].join("\n")
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(state: &ProgressState, total_secs: f64, elapsed_secs: f64) -> RenderProgress {
    let progress = if total_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / total_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    RenderProgress {
        progress: if state.complete { 1.0 } else { progress },
        out_time_secs: state.out_time_secs,
        total_secs,
        eta_secs,
        stage: if state.complete {
            RenderStage::Finalizing
        } else {
            RenderStage::Encoding
        },
    }
}
