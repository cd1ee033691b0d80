//! macOS GPU probes.

use super::{command_stdout, GpuProbe, ProbeError};
use crate::gpu::Gpu;

/// Apple Silicon hosts always carry an integrated Apple GPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppleSiliconProbe;

impl GpuProbe for AppleSiliconProbe {
    fn name(&self) -> &str {
        "apple-silicon"
    }

    fn probe(&self) -> Result<Gpu, ProbeError> {
        if std::env::consts::ARCH == "aarch64" {
            Ok(Gpu::Apple {
                model: Some("Apple Silicon".to_string()),
            })
        } else {
            Err(ProbeError::NotFound {
                tool: self.name().to_string(),
            })
        }
    }
}

/// Reads the chipset model from `system_profiler` on Intel Macs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProfilerProbe;

impl GpuProbe for SystemProfilerProbe {
    fn name(&self) -> &str {
        "system_profiler"
    }

    fn probe(&self) -> Result<Gpu, ProbeError> {
        let output = command_stdout("system_profiler", &["SPDisplaysDataType"])?;
        parse_system_profiler(&output).ok_or_else(|| ProbeError::NotFound {
            tool: self.name().to_string(),
        })
    }
}

/// Map `Chipset Model:` lines to a vendor; discrete GPUs win over Intel graphics.
pub fn parse_system_profiler(output: &str) -> Option<Gpu> {
    let models: Vec<String> = output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Chipset Model:"))
        .map(|model| model.trim().to_string())
        .collect();

    models.iter().find_map(|model| {
        let lower = model.to_lowercase();
        if lower.contains("nvidia") {
            Some(Gpu::Nvidia {
                model: Some(model.clone()),
            })
        } else if lower.contains("amd") || lower.contains("radeon") {
            Some(Gpu::Amd {
                model: Some(model.clone()),
            })
        } else if lower.starts_with("apple") {
            Some(Gpu::Apple {
                model: Some(model.clone()),
            })
        } else {
            None
        }
    })
}
