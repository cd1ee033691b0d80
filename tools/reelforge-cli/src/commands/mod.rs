pub mod batch;
pub mod check;
pub mod config;
pub mod render;
pub mod themes;
pub mod worker;

use std::sync::Arc;

use reelforge_capability::CapabilityProfile;
use reelforge_common::config::AppConfig;
use reelforge_render_engine::{CompositionEngine, EngineSettings};

/// Detect the capability profile once and apply configured overrides.
pub fn detect_profile(config: &AppConfig) -> Arc<CapabilityProfile> {
    Arc::new(CapabilityProfile::detect().with_overrides(&config.encoding))
}

/// Engine over the shared profile.
pub fn build_engine(config: &AppConfig, profile: Arc<CapabilityProfile>) -> CompositionEngine {
    CompositionEngine::new(profile, EngineSettings::from_config(config))
}
