//! Linux GPU probes: `nvidia-smi`, then `lspci`.

use super::{command_stdout, GpuProbe, ProbeError};
use crate::gpu::Gpu;

/// Queries the NVIDIA driver for the installed board name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NvidiaSmiProbe;

impl GpuProbe for NvidiaSmiProbe {
    fn name(&self) -> &str {
        "nvidia-smi"
    }

    fn probe(&self) -> Result<Gpu, ProbeError> {
        let output = command_stdout("nvidia-smi", &["--query-gpu=name", "--format=csv,noheader"])?;
        parse_nvidia_smi(&output).ok_or_else(|| ProbeError::NotFound {
            tool: self.name().to_string(),
        })
    }
}

/// Scans PCI display controllers for an AMD/Radeon adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LspciProbe;

impl GpuProbe for LspciProbe {
    fn name(&self) -> &str {
        "lspci"
    }

    fn probe(&self) -> Result<Gpu, ProbeError> {
        let output = command_stdout("lspci", &[])?;
        parse_lspci(&output).ok_or_else(|| ProbeError::NotFound {
            tool: self.name().to_string(),
        })
    }
}

/// First non-empty line of `nvidia-smi --query-gpu=name` is the model.
pub fn parse_nvidia_smi(output: &str) -> Option<Gpu> {
    let model = output.lines().map(str::trim).find(|line| !line.is_empty())?;
    Some(Gpu::Nvidia {
        model: Some(model.to_string()),
    })
}

/// Find an AMD display controller in `lspci` output.
pub fn parse_lspci(output: &str) -> Option<Gpu> {
    output
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains("vga") || lower.contains("3d controller") || lower.contains("display")
        })
        .find(|line| {
            let lower = line.to_lowercase();
            lower.contains("amd") || lower.contains("radeon") || lower.contains("ati technologies")
        })
        .map(|line| Gpu::Amd {
            model: line
                .rsplit(": ")
                .next()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        })
}
