//! Host and GPU descriptors.

use serde::{Deserialize, Serialize};

/// Operating system family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    Linux,
    Windows,
    MacOS,
    #[default]
    Other,
}

impl HostOs {
    /// The OS this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            HostOs::Linux
        } else if cfg!(target_os = "windows") {
            HostOs::Windows
        } else if cfg!(target_os = "macos") {
            HostOs::MacOS
        } else {
            HostOs::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HostOs::Linux => "linux",
            HostOs::Windows => "windows",
            HostOs::MacOS => "macos",
            HostOs::Other => "other",
        }
    }
}

/// Detected GPU, tagged by vendor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "vendor", rename_all = "lowercase")]
pub enum Gpu {
    #[default]
    Unavailable,
    Nvidia {
        model: Option<String>,
    },
    Amd {
        model: Option<String>,
    },
    Apple {
        model: Option<String>,
    },
}

impl Gpu {
    pub fn is_available(&self) -> bool {
        !matches!(self, Gpu::Unavailable)
    }

    /// Vendor label, `None` when no GPU was detected.
    pub fn vendor(&self) -> Option<&'static str> {
        match self {
            Gpu::Unavailable => None,
            Gpu::Nvidia { .. } => Some("nvidia"),
            Gpu::Amd { .. } => Some("amd"),
            Gpu::Apple { .. } => Some("apple"),
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            Gpu::Unavailable => None,
            Gpu::Nvidia { model } | Gpu::Amd { model } | Gpu::Apple { model } => model.as_deref(),
        }
    }
}

impl std::fmt::Display for Gpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.vendor(), self.model()) {
            (None, _) => write!(f, "none"),
            (Some(vendor), Some(model)) => write!(f, "{} ({model})", vendor.to_uppercase()),
            (Some(vendor), None) => write!(f, "{}", vendor.to_uppercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_display() {
        assert_eq!(Gpu::Unavailable.to_string(), "none");
        let gpu = Gpu::Nvidia {
            model: Some("GeForce RTX 3080".to_string()),
        };
        assert_eq!(gpu.to_string(), "NVIDIA (GeForce RTX 3080)");
        assert_eq!(Gpu::Amd { model: None }.to_string(), "AMD");
    }

    #[test]
    fn test_gpu_serializes_with_vendor_tag() {
        let json = serde_json::to_value(Gpu::Apple {
            model: Some("Apple Silicon".to_string()),
        })
        .unwrap();
        assert_eq!(json["vendor"], "apple");
        assert_eq!(json["model"], "Apple Silicon");
    }
}
