//! Hidden worker entry point used by isolated batches.
//!
//! Prints the output path on stdout; any failure exits non-zero with the
//! error on stderr.

use std::sync::Arc;

use reelforge_capability::CapabilityProfile;
use reelforge_common::config::AppConfig;
use reelforge_job_model::Job;

use super::{build_engine, detect_profile};

pub fn run(config: &AppConfig, job_json: &str, profile_json: Option<&str>) -> anyhow::Result<()> {
    let job: Job = serde_json::from_str(job_json)
        .map_err(|e| anyhow::anyhow!("Invalid job descriptor: {e}"))?;

    // Isolated batches pass the parent's profile; detect only when run by hand.
    let profile = match profile_json {
        Some(json) => Arc::new(
            serde_json::from_str::<CapabilityProfile>(json)
                .map_err(|e| anyhow::anyhow!("Invalid capability profile: {e}"))?,
        ),
        None => detect_profile(config),
    };

    let engine = build_engine(config, profile);
    let output = engine.render(&job)?;
    println!("{}", output.display());
    Ok(())
}
