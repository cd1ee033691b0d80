//! Render a single short.

use std::io::Write;

use reelforge_common::config::AppConfig;
use reelforge_job_model::{Job, Theme};
use reelforge_render_engine::{ProgressCallback, RenderProgress};

use super::{build_engine, detect_profile};

pub fn run(config: &AppConfig, job: &Job) -> anyhow::Result<()> {
    println!("Rendering short: {}", job.job_id);
    println!("  Background: {}", job.background_video.display());
    println!("  Narration:  {}", job.audio_file.display());
    println!("  Captions:   {}", job.captions_file.display());
    println!("  Output:     {}", job.output_file.display());
    if Theme::find(&job.theme).is_none() {
        println!("  Theme '{}' is unknown, using default", job.theme);
    } else {
        println!("  Theme:      {}", job.theme);
    }

    let engine = build_engine(config, detect_profile(config));
    println!(
        "  Encoder:    {} ({} threads)",
        engine.profile().encoder,
        engine.profile().cpu_thread_budget
    );
    let progress_cb: ProgressCallback = Box::new(|p: RenderProgress| {
        print!(
            "\r  Progress: {:.1}% ({:.1}/{:.1}s, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.out_time_secs,
            p.total_secs,
            p.eta_secs,
        );
        let _ = std::io::stdout().flush();
    });

    match engine.render_with_progress(job, Some(&progress_cb)) {
        Ok(path) => {
            println!("\nRender complete: {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!("\nRender failed");
            Err(anyhow::anyhow!("Render failed: {e}"))
        }
    }
}
