//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReelforgeError, ReelforgeResult};

/// Global application configuration.
///
/// Built once at startup and passed by reference to the capability profile,
/// the composition engine, and the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Locations of shared assets and scratch space.
    pub resources: ResourceConfig,

    /// Output frame geometry and codecs.
    pub output: OutputConfig,

    /// Timeline composition defaults (intro, outro, music mix).
    pub composition: CompositionConfig,

    /// Encoder selection overrides.
    pub encoding: EncodingConfig,

    /// Batch scheduling limits.
    pub scheduler: SchedulerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Shared asset locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Directory scanned for background music (`.mp3` / `.wav`).
    pub music_dir: PathBuf,

    /// Parent directory for per-render scratch directories.
    pub temp_dir: PathBuf,
}

/// Output frame and codec defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,

    /// Audio codec handed to the writer.
    pub audio_codec: String,
}

/// Timeline composition defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Length of the optional intro clip.
    pub intro_secs: f64,

    /// Title shown on the intro clip.
    pub intro_text: String,

    /// Upper bound for the call-to-action overlay.
    pub outro_max_secs: f64,

    /// Fraction of the main timeline the call-to-action may cover.
    pub outro_fraction: f64,

    /// Call-to-action text.
    pub outro_text: String,

    /// Relative volume of background music under the narration.
    pub music_volume: f64,
}

/// Encoder selection overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Ignore detected GPUs and always encode in software.
    pub force_software: bool,

    /// Encoder used for the single retry after a failed primary write.
    pub fallback_encoder: String,

    /// Preset used with the fallback encoder.
    pub fallback_preset: String,
}

/// Batch scheduling limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Explicit worker count. When unset it is derived from the capability profile.
    pub max_workers: Option<usize>,

    /// Ceiling on concurrent workers whenever a GPU encode path is in use.
    pub gpu_worker_cap: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelforge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            music_dir: PathBuf::from("resources").join("music"),
            temp_dir: std::env::temp_dir().join("reelforge"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            audio_codec: "aac".to_string(),
        }
    }
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            intro_secs: 3.0,
            intro_text: "YouTube Short".to_string(),
            outro_max_secs: 5.0,
            outro_fraction: 0.25,
            outro_text: "Like & Subscribe!".to_string(),
            music_volume: 0.2,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            force_software: false,
            fallback_encoder: "libx264".to_string(),
            fallback_preset: "veryfast".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            gpu_worker_cap: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults when the
    /// file is missing or malformed.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Reject settings ffmpeg cannot render with.
    ///
    /// yuv420p output needs even frame dimensions.
    pub fn validate(&self) -> ReelforgeResult<()> {
        let out = &self.output;
        if out.width == 0 || out.height == 0 || out.width % 2 != 0 || out.height % 2 != 0 {
            return Err(ReelforgeError::config(format!(
                "output size must be non-zero and even, got {}x{}",
                out.width, out.height
            )));
        }
        if out.fps == 0 {
            return Err(ReelforgeError::config("output fps must be positive"));
        }
        let comp = &self.composition;
        if comp.intro_secs < 0.0 || comp.outro_max_secs < 0.0 {
            return Err(ReelforgeError::config("intro and outro durations must not be negative"));
        }
        if !(0.0..=1.0).contains(&comp.outro_fraction) {
            return Err(ReelforgeError::config(format!(
                "outro_fraction must be within 0..=1, got {}",
                comp.outro_fraction
            )));
        }
        if comp.music_volume < 0.0 {
            return Err(ReelforgeError::config("music_volume must not be negative"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelforge").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json"));
        assert_eq!(config.output.width, 1080);
        assert_eq!(config.output.height, 1920);
        assert_eq!(config.scheduler.gpu_worker_cap, 4);
        assert!(config.scheduler.max_workers.is_none());
    }

    #[test]
    fn test_partial_file_fills_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"scheduler":{"gpu_worker_cap":2},"encoding":{"force_software":true}}"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.scheduler.gpu_worker_cap, 2);
        assert!(config.encoding.force_software);
        assert_eq!(config.encoding.fallback_encoder, "libx264");
        assert_eq!(config.output.fps, 30);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.composition.music_volume, 0.2);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.composition.intro_secs = 2.0;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.composition.intro_secs, 2.0);
    }

    #[test]
    fn test_validate_rejects_odd_frame_and_bad_fraction() {
        assert!(AppConfig::default().validate().is_ok());

        let mut config = AppConfig::default();
        config.output.width = 1081;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("1081x1920"));

        let mut config = AppConfig::default();
        config.composition.outro_fraction = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ReelforgeError::Config { .. })
        ));
    }
}
