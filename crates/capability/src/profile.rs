//! The hardware capability profile and the encoder parameters derived from it.

use serde::{Deserialize, Serialize};

use reelforge_common::config::EncodingConfig;

use crate::encoders::{EncoderInventory, SOFTWARE_ENCODER};
use crate::gpu::{Gpu, HostOs};
use crate::probe::{detect_gpu, platform_probes, GpuProbe};

/// Minimum CPU thread budget regardless of core count.
pub const MIN_THREAD_BUDGET: usize = 4;

/// Preset used when a GPU is available.
pub const GPU_PRESET: &str = "fast";

/// Preset used without a GPU, trading quality for speed.
pub const CPU_PRESET: &str = "veryfast";

/// Render device used for VAAPI decode on Linux AMD hosts.
pub const VAAPI_DEVICE: &str = "/dev/dri/renderD128";

/// Read-only description of this machine's encoding capability.
///
/// Computed once at startup and shared by reference; nothing mutates it
/// after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    pub os: HostOs,
    pub logical_cores: usize,
    /// Logical cores minus one, never below [`MIN_THREAD_BUDGET`].
    pub cpu_thread_budget: usize,
    pub gpu: Gpu,
    /// Video encoder handed to the writer. Always usable.
    pub encoder: String,
    pub encoding_preset: String,
    /// Input-side acceleration directives (e.g. `-hwaccel cuda`).
    pub accel_flags: Vec<String>,
    /// Encoder-specific output flags (AMF tuning on Windows).
    pub extra_output_flags: Vec<String>,
    /// Whether GPU acceleration was disabled by configuration.
    pub software_forced: bool,
}

/// Parameter set handed to the video writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderParameters {
    pub codec: String,
    pub audio_codec: String,
    pub threads: usize,
    /// `None` for encoders that do not take `-preset`.
    pub preset: Option<String>,
    /// Placed before each `-i`.
    pub input_flags: Vec<String>,
    /// Placed after the codec selection.
    pub output_flags: Vec<String>,
}

/// Encoder choice for an OS/GPU/inventory combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSelection {
    pub encoder: String,
    pub preset: String,
    pub accel_flags: Vec<String>,
    pub extra_output_flags: Vec<String>,
}

impl CapabilityProfile {
    /// Inspect the host: core count, GPU probes, and the ffmpeg encoder list.
    ///
    /// Never fails; anything that cannot be determined degrades to software
    /// encoding.
    pub fn detect() -> Self {
        let os = HostOs::current();
        let probes = platform_probes(os);
        let inventory = EncoderInventory::query("ffmpeg");
        Self::detect_with(os, num_cpus::get(), &probes, &inventory)
    }

    /// Detect using explicit probes and inventory.
    pub(crate) fn detect_with(
        os: HostOs,
        logical_cores: usize,
        probes: &[Box<dyn GpuProbe>],
        inventory: &EncoderInventory,
    ) -> Self {
        let gpu = detect_gpu(probes);
        let profile = Self::from_parts(os, logical_cores, gpu, inventory);
        tracing::info!(
            os = os.as_str(),
            cores = logical_cores,
            threads = profile.cpu_thread_budget,
            gpu = %profile.gpu,
            encoder = %profile.encoder,
            preset = %profile.encoding_preset,
            "Capability profile detected"
        );
        profile
    }

    /// Build a profile from already-known facts.
    pub fn from_parts(
        os: HostOs,
        logical_cores: usize,
        gpu: Gpu,
        inventory: &EncoderInventory,
    ) -> Self {
        let selection = select_encoder(os, &gpu, inventory);
        Self {
            os,
            logical_cores,
            cpu_thread_budget: thread_budget(logical_cores),
            gpu,
            encoder: selection.encoder,
            encoding_preset: selection.preset,
            accel_flags: selection.accel_flags,
            extra_output_flags: selection.extra_output_flags,
            software_forced: false,
        }
    }

    /// A profile that never touches a GPU.
    pub fn software_only(logical_cores: usize) -> Self {
        Self::from_parts(
            HostOs::current(),
            logical_cores,
            Gpu::Unavailable,
            &EncoderInventory::default(),
        )
    }

    /// Apply encoding overrides from configuration.
    pub fn with_overrides(mut self, config: &EncodingConfig) -> Self {
        if config.force_software {
            self.encoder = SOFTWARE_ENCODER.to_string();
            self.encoding_preset = CPU_PRESET.to_string();
            self.accel_flags.clear();
            self.extra_output_flags.clear();
            self.software_forced = true;
        }
        self
    }

    /// Whether renders will go through a GPU path.
    pub fn gpu_in_use(&self) -> bool {
        self.gpu.is_available() && !self.software_forced
    }

    /// Whether the primary encoder is a vendor hardware encoder.
    pub fn uses_hardware_encoder(&self) -> bool {
        self.encoder != SOFTWARE_ENCODER
    }

    /// Parameters for the primary write.
    pub fn encoder_parameters(&self) -> EncoderParameters {
        EncoderParameters {
            codec: self.encoder.clone(),
            audio_codec: "aac".to_string(),
            threads: self.cpu_thread_budget,
            preset: takes_preset(&self.encoder).then(|| self.encoding_preset.clone()),
            input_flags: self.accel_flags.clone(),
            output_flags: self.extra_output_flags.clone(),
        }
    }

    /// Human-readable report for `reelforge check`.
    pub fn summary(&self) -> String {
        let params = self.encoder_parameters();
        format!(
            "OS: {}\nCPU cores: {}\nThread budget: {}\nGPU: {}\nGPU path in use: {}\nVideo codec: {}\nHardware encoder: {}\nEncoding preset: {}\nInput flags: {}\nOutput flags: {}\n",
            self.os.as_str(),
            self.logical_cores,
            self.cpu_thread_budget,
            self.gpu,
            self.gpu_in_use(),
            params.codec,
            if self.uses_hardware_encoder() { "yes" } else { "no" },
            params.preset.as_deref().unwrap_or("(encoder default)"),
            display_flags(&params.input_flags),
            display_flags(&params.output_flags),
        )
    }
}

impl EncoderParameters {
    /// Conservative software parameters used for the single retry.
    pub fn software_fallback(codec: &str, preset: &str, threads: usize) -> Self {
        Self {
            codec: codec.to_string(),
            audio_codec: "aac".to_string(),
            threads: threads.max(1),
            preset: takes_preset(codec).then(|| preset.to_string()),
            input_flags: Vec::new(),
            output_flags: Vec::new(),
        }
    }

    /// Arguments placed before every input.
    pub fn input_args(&self) -> Vec<String> {
        self.input_flags.clone()
    }

    /// Codec arguments placed before the output path.
    pub fn output_args(&self) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.codec.clone()];
        if let Some(preset) = &self.preset {
            args.push("-preset".to_string());
            args.push(preset.clone());
        }
        args.push("-threads".to_string());
        args.push(self.threads.to_string());
        args.extend(self.output_flags.iter().cloned());
        args.push("-pix_fmt".to_string());
        args.push("yuv420p".to_string());
        args.push("-c:a".to_string());
        args.push(self.audio_codec.clone());
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
        args
    }
}

/// `max(MIN_THREAD_BUDGET, cores - 1)`.
pub fn thread_budget(logical_cores: usize) -> usize {
    logical_cores.saturating_sub(1).max(MIN_THREAD_BUDGET)
}

fn takes_preset(codec: &str) -> bool {
    matches!(codec, "libx264" | "libx265" | "h264_nvenc" | "hevc_nvenc")
}

fn display_flags(flags: &[String]) -> String {
    if flags.is_empty() {
        "(none)".to_string()
    } else {
        flags.join(" ")
    }
}

fn flags(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Pick the encoder, preset, and acceleration flags.
///
/// A vendor's hardware encoder is only chosen when the inventory confirms it;
/// otherwise the software encoder is used.
pub fn select_encoder(os: HostOs, gpu: &Gpu, inventory: &EncoderInventory) -> EncoderSelection {
    let preset = if gpu.is_available() {
        GPU_PRESET
    } else {
        CPU_PRESET
    };

    let software = |accel_flags: Vec<String>| EncoderSelection {
        encoder: SOFTWARE_ENCODER.to_string(),
        preset: preset.to_string(),
        accel_flags,
        extra_output_flags: Vec::new(),
    };

    let hardware = |encoder: &str, accel_flags: Vec<String>, extra: Vec<String>| {
        if inventory.contains(encoder) {
            EncoderSelection {
                encoder: encoder.to_string(),
                preset: preset.to_string(),
                accel_flags,
                extra_output_flags: extra,
            }
        } else {
            tracing::info!(encoder, "Hardware encoder not available, using {SOFTWARE_ENCODER}");
            software(Vec::new())
        }
    };

    match (os, gpu) {
        (_, Gpu::Unavailable) => software(Vec::new()),
        (HostOs::Linux | HostOs::Windows, Gpu::Nvidia { .. }) => {
            hardware("h264_nvenc", flags(&["-hwaccel", "cuda"]), Vec::new())
        }
        (HostOs::Windows, Gpu::Amd { .. }) => hardware(
            "h264_amf",
            flags(&["-hwaccel", "dxva2"]),
            flags(&[
                "-quality",
                "speed",
                "-rc",
                "vbr_latency",
                "-usage",
                "ultralowlatency",
            ]),
        ),
        (HostOs::Linux, Gpu::Amd { .. }) => software(flags(&[
            "-hwaccel",
            "vaapi",
            "-vaapi_device",
            VAAPI_DEVICE,
        ])),
        (HostOs::MacOS, _) => hardware(
            "h264_videotoolbox",
            flags(&["-hwaccel", "videotoolbox"]),
            Vec::new(),
        ),
        _ => software(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;

    fn nvidia() -> Gpu {
        Gpu::Nvidia {
            model: Some("RTX".to_string()),
        }
    }

    fn amd() -> Gpu {
        Gpu::Amd { model: None }
    }

    #[test]
    fn test_thread_budget_floor() {
        assert_eq!(thread_budget(1), 4);
        assert_eq!(thread_budget(4), 4);
        assert_eq!(thread_budget(5), 4);
        assert_eq!(thread_budget(16), 15);
        assert_eq!(thread_budget(0), 4);
    }

    #[test]
    fn test_no_gpu_uses_software_and_faster_preset() {
        let selection = select_encoder(
            HostOs::Linux,
            &Gpu::Unavailable,
            &EncoderInventory::from_names(["libx264", "h264_nvenc"]),
        );
        assert_eq!(selection.encoder, "libx264");
        assert_eq!(selection.preset, CPU_PRESET);
        assert!(selection.accel_flags.is_empty());
    }

    #[test]
    fn test_nvidia_with_confirmed_nvenc() {
        let selection = select_encoder(
            HostOs::Linux,
            &nvidia(),
            &EncoderInventory::from_names(["libx264", "h264_nvenc"]),
        );
        assert_eq!(selection.encoder, "h264_nvenc");
        assert_eq!(selection.preset, GPU_PRESET);
        assert_eq!(selection.accel_flags, vec!["-hwaccel", "cuda"]);
    }

    #[test]
    fn test_gpu_without_encoder_falls_back_to_software() {
        let selection = select_encoder(
            HostOs::Windows,
            &nvidia(),
            &EncoderInventory::from_names(["libx264"]),
        );
        assert_eq!(selection.encoder, "libx264");
        assert!(selection.accel_flags.is_empty());

        let selection = select_encoder(HostOs::Windows, &amd(), &EncoderInventory::default());
        assert_eq!(selection.encoder, "libx264");
        assert!(selection.extra_output_flags.is_empty());
    }

    #[test]
    fn test_amd_windows_gets_amf_extras() {
        let profile = CapabilityProfile::from_parts(
            HostOs::Windows,
            8,
            amd(),
            &EncoderInventory::from_names(["libx264", "h264_amf"]),
        );
        let params = profile.encoder_parameters();
        assert_eq!(params.codec, "h264_amf");
        assert!(params.preset.is_none());
        assert_eq!(params.input_flags, vec!["-hwaccel", "dxva2"]);
        assert!(params.output_flags.contains(&"ultralowlatency".to_string()));
    }

    #[test]
    fn test_amd_linux_uses_vaapi_decode_with_software_encode() {
        let selection = select_encoder(HostOs::Linux, &amd(), &EncoderInventory::default());
        assert_eq!(selection.encoder, "libx264");
        assert_eq!(selection.preset, GPU_PRESET);
        assert!(selection.accel_flags.contains(&VAAPI_DEVICE.to_string()));
    }

    #[test]
    fn test_apple_videotoolbox() {
        let gpu = Gpu::Apple {
            model: Some("Apple Silicon".to_string()),
        };
        let selection = select_encoder(
            HostOs::MacOS,
            &gpu,
            &EncoderInventory::from_names(["h264_videotoolbox"]),
        );
        assert_eq!(selection.encoder, "h264_videotoolbox");
        assert_eq!(selection.accel_flags, vec!["-hwaccel", "videotoolbox"]);
    }

    #[test]
    fn test_failed_probes_still_produce_usable_encoder() {
        struct Broken;
        impl GpuProbe for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn probe(&self) -> Result<Gpu, ProbeError> {
                Err(ProbeError::NotFound {
                    tool: "broken".to_string(),
                })
            }
        }

        let probes: Vec<Box<dyn GpuProbe>> = vec![Box::new(Broken)];
        let profile = CapabilityProfile::detect_with(
            HostOs::Linux,
            2,
            &probes,
            &EncoderInventory::default(),
        );
        assert_eq!(profile.gpu, Gpu::Unavailable);
        assert_eq!(profile.encoder, SOFTWARE_ENCODER);
        assert!(!profile.gpu_in_use());
        assert_eq!(profile.cpu_thread_budget, 4);
    }

    #[test]
    fn test_force_software_override() {
        let profile = CapabilityProfile::from_parts(
            HostOs::Linux,
            8,
            nvidia(),
            &EncoderInventory::from_names(["h264_nvenc"]),
        )
        .with_overrides(&EncodingConfig {
            force_software: true,
            ..EncodingConfig::default()
        });
        assert_eq!(profile.encoder, "libx264");
        assert!(profile.accel_flags.is_empty());
        assert!(!profile.gpu_in_use());
        assert!(profile.gpu.is_available());
    }

    #[test]
    fn test_summary_reports_hardware_encoder() {
        let nvenc = CapabilityProfile::from_parts(
            HostOs::Linux,
            8,
            nvidia(),
            &EncoderInventory::from_names(["h264_nvenc"]),
        );
        assert!(nvenc.uses_hardware_encoder());
        assert!(nvenc.summary().contains("Hardware encoder: yes"));

        let software = CapabilityProfile::software_only(8);
        assert!(!software.uses_hardware_encoder());
        assert!(software.summary().contains("Hardware encoder: no"));
    }

    #[test]
    fn test_output_args_order() {
        let params = EncoderParameters::software_fallback("libx264", "veryfast", 6);
        let args = params.output_args();
        assert_eq!(&args[..6], &["-c:v", "libx264", "-preset", "veryfast", "-threads", "6"]);
        assert!(params.input_args().is_empty());
    }

    #[test]
    fn test_acceleration_travels_in_parameters() {
        let profile = CapabilityProfile::from_parts(
            HostOs::Linux,
            8,
            amd(),
            &EncoderInventory::default(),
        );
        let params = profile.encoder_parameters();
        assert_eq!(params, profile.encoder_parameters());
        assert_eq!(params.input_args(), profile.accel_flags);
    }
}
