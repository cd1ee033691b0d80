//! Platform GPU probes.
//!
//! Each probe shells out to a platform tool and maps its output to a [`Gpu`].
//! Probes are tried in order; the first one that identifies a vendor wins.
//! Every failure (missing tool, non-zero exit, unrecognized output) is
//! absorbed and the host is reported as having no usable GPU.

use std::process::Command;

use crate::gpu::{Gpu, HostOs};

pub mod linux;
pub mod macos;
pub mod windows;

pub use linux::{LspciProbe, NvidiaSmiProbe};
pub use macos::{AppleSiliconProbe, SystemProfilerProbe};
pub use windows::WmiProbe;

/// Why a probe could not identify a GPU. Never surfaced past [`detect_gpu`].
#[derive(Debug, thiserror::Error)]
pub(crate) enum ProbeError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}")]
    Status { tool: String, status: String },

    #[error("no recognized GPU in {tool} output")]
    NotFound { tool: String },
}

/// A platform-specific GPU detection step.
pub trait GpuProbe: Send + Sync {
    /// Probe name used in logs.
    fn name(&self) -> &str;

    /// Identify the GPU vendor and model.
    fn probe(&self) -> Result<Gpu, ProbeError>;
}

/// The probes applicable to an OS, in the order they should be tried.
pub fn platform_probes(os: HostOs) -> Vec<Box<dyn GpuProbe>> {
    match os {
        HostOs::Linux => vec![Box::new(NvidiaSmiProbe), Box::new(LspciProbe)],
        HostOs::Windows => vec![Box::new(WmiProbe)],
        HostOs::MacOS => vec![Box::new(AppleSiliconProbe), Box::new(SystemProfilerProbe)],
        HostOs::Other => vec![],
    }
}

/// Run probes in order and return the first detected GPU.
pub fn detect_gpu(probes: &[Box<dyn GpuProbe>]) -> Gpu {
    for probe in probes {
        match probe.probe() {
            Ok(gpu) if gpu.is_available() => {
                tracing::debug!(probe = probe.name(), gpu = %gpu, "GPU detected");
                return gpu;
            }
            Ok(_) => {
                tracing::debug!(probe = probe.name(), "Probe found no GPU");
            }
            Err(err) => {
                tracing::debug!(probe = probe.name(), error = %err, "GPU probe failed");
            }
        }
    }
    Gpu::Unavailable
}

/// Run a tool and return its stdout as text.
pub(crate) fn command_stdout(program: &str, args: &[&str]) -> Result<String, ProbeError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ProbeError::Spawn {
            tool: program.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(ProbeError::Status {
            tool: program.to_string(),
            status: output.status.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
