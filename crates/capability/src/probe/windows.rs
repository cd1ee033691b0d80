//! Windows GPU probe via WMI `Win32_VideoController`.

use super::{command_stdout, GpuProbe, ProbeError};
use crate::gpu::Gpu;

const WMI_QUERY: &str =
    "Get-WmiObject Win32_VideoController | Format-List Name, AdapterCompatibility";

/// Lists video controllers through PowerShell.
#[derive(Debug, Clone, Copy, Default)]
pub struct WmiProbe;

impl GpuProbe for WmiProbe {
    fn name(&self) -> &str {
        "powershell-wmi"
    }

    fn probe(&self) -> Result<Gpu, ProbeError> {
        let output = command_stdout("powershell", &["-NoProfile", "-Command", WMI_QUERY])?;
        tracing::debug!(output = %output.trim(), "WMI video controller listing");
        parse_wmi_video_controllers(&output).ok_or_else(|| ProbeError::NotFound {
            tool: self.name().to_string(),
        })
    }
}

/// Parse `Format-List Name, AdapterCompatibility` records.
///
/// NVIDIA adapters are preferred over AMD ones when both are present, since
/// hybrid laptops list the integrated adapter first.
pub fn parse_wmi_video_controllers(output: &str) -> Option<Gpu> {
    let mut adapters: Vec<(Option<String>, String)> = Vec::new();
    let mut name: Option<String> = None;
    let mut haystack = String::new();

    let mut flush = |name: &mut Option<String>, haystack: &mut String| {
        if name.is_some() || !haystack.is_empty() {
            adapters.push((name.take(), std::mem::take(haystack)));
        }
    };

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(&mut name, &mut haystack);
            continue;
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if key == "name" {
                name = Some(value.to_string());
            }
            haystack.push_str(&value.to_lowercase());
            haystack.push(' ');
        }
    }
    flush(&mut name, &mut haystack);

    if let Some((model, _)) = adapters.iter().find(|(_, text)| text.contains("nvidia")) {
        return Some(Gpu::Nvidia {
            model: model.clone(),
        });
    }

    adapters
        .iter()
        .find(|(_, text)| {
            ["amd", "radeon", "ati ", "advanced micro devices"]
                .iter()
                .any(|needle| text.contains(needle))
        })
        .map(|(model, _)| Gpu::Amd {
            model: model.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nvidia_adapter() {
        let output = "\r\n\
Name                 : Intel(R) UHD Graphics 630\r\n\
AdapterCompatibility : Intel Corporation\r\n\
\r\n\
Name                 : NVIDIA GeForce GTX 1660\r\n\
AdapterCompatibility : NVIDIA\r\n";
        let gpu = parse_wmi_video_controllers(output).unwrap();
        assert_eq!(gpu.vendor(), Some("nvidia"));
        assert_eq!(gpu.model(), Some("NVIDIA GeForce GTX 1660"));
    }

    #[test]
    fn test_parse_amd_adapter() {
        let output = "\n\
Name                 : AMD Radeon RX 580 Series\n\
AdapterCompatibility : Advanced Micro Devices, Inc.\n";
        let gpu = parse_wmi_video_controllers(output).unwrap();
        assert_eq!(gpu.vendor(), Some("amd"));
        assert_eq!(gpu.model(), Some("AMD Radeon RX 580 Series"));
    }

    #[test]
    fn test_parse_unknown_adapter() {
        let output = "Name : Microsoft Basic Display Adapter\nAdapterCompatibility : (Standard display types)\n";
        assert!(parse_wmi_video_controllers(output).is_none());
    }
}
