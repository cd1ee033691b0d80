//! Check hardware capability and tooling.

use reelforge_common::config::{config_file_path, AppConfig};
use reelforge_render_engine::music::list_music_files;
use reelforge_render_engine::{FfmpegBackend, MediaBackend};
use reelforge_scheduler::default_worker_count;

use super::detect_profile;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Reelforge System Check");
    println!("{}", "=".repeat(50));

    let backend = FfmpegBackend::new();
    let ffmpeg_ok = backend.is_available();
    if ffmpeg_ok {
        println!("[OK] ffmpeg and ffprobe found");
    } else {
        println!("[FAIL] ffmpeg/ffprobe not found on PATH");
    }

    let profile = detect_profile(config);
    println!();
    for line in profile.summary().lines() {
        println!("     {line}");
    }

    let workers = config
        .scheduler
        .max_workers
        .unwrap_or_else(|| default_worker_count(&profile, config.scheduler.gpu_worker_cap));
    println!("[OK] Batch workers: {workers}");

    let music = list_music_files(&config.resources.music_dir);
    if music.is_empty() {
        println!(
            "[WARN] No background music in {} (music will be skipped)",
            config.resources.music_dir.display()
        );
    } else {
        println!(
            "[OK] Background music tracks: {} in {}",
            music.len(),
            config.resources.music_dir.display()
        );
    }

    println!("     Config file: {}", config_file_path().display());

    println!();
    if ffmpeg_ok {
        println!("Reelforge is ready.");
    } else {
        println!("Install ffmpeg to render videos.");
    }

    Ok(())
}
