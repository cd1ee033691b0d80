//! Job discovery from a directory of assets grouped by file stem.
//!
//! `story.mp4`, `story.mp3`, and `story.json` become one job that writes
//! `<output_dir>/story_final.mp4`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use reelforge_common::error::ReelforgeResult;
use reelforge_job_model::Job;

use crate::batch::{create_job, JobOptions};

const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "avi"];
const AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "wav"];
const CAPTION_EXTENSION: &str = "json";

#[derive(Debug, Default)]
struct AssetGroup {
    background: Option<PathBuf>,
    audio: Option<PathBuf>,
    captions: Option<PathBuf>,
}

/// Build one job per complete asset group in `input_dir`, sorted by stem.
///
/// Groups missing any of the three assets are skipped with a warning. The
/// output directory is created. `options.job_id` is ignored; each job is
/// named after its stem.
pub fn jobs_from_directory(
    input_dir: &Path,
    output_dir: &Path,
    options: &JobOptions,
) -> ReelforgeResult<Vec<Job>> {
    std::fs::create_dir_all(output_dir)?;

    let mut groups: BTreeMap<String, AssetGroup> = BTreeMap::new();
    for entry in std::fs::read_dir(input_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let (Some(stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|e| e.to_str()),
        ) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        let group = groups.entry(stem.to_string()).or_default();

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            group.background = Some(path);
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            group.audio = Some(path);
        } else if ext == CAPTION_EXTENSION {
            group.captions = Some(path);
        }
    }

    let mut jobs = Vec::new();
    for (stem, group) in groups {
        match group {
            AssetGroup {
                background: Some(background),
                audio: Some(audio),
                captions: Some(captions),
            } => {
                let output = output_dir.join(format!("{stem}_final.mp4"));
                jobs.push(create_job(
                    background,
                    audio,
                    captions,
                    output,
                    JobOptions {
                        job_id: Some(stem),
                        ..options.clone()
                    },
                ));
            }
            AssetGroup {
                background: None,
                audio: None,
                captions: None,
            } => {}
            _ => tracing::warn!(stem = %stem, "Skipping asset group with missing files"),
        }
    }

    tracing::info!(
        input = %input_dir.display(),
        jobs = jobs.len(),
        "Jobs discovered from directory"
    );
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_groups_by_stem() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for name in [
            "alpha.mp4",
            "alpha.mp3",
            "alpha.json",
            "beta.MOV",
            "beta.wav",
            "beta.json",
            "gamma.mp4",
            "gamma.json",
            "readme.txt",
        ] {
            touch(input.path(), name);
        }

        let options = JobOptions {
            theme: "dramatic".into(),
            ..JobOptions::default()
        };
        let jobs = jobs_from_directory(input.path(), &output.path().join("renders"), &options)
            .unwrap();

        let ids: Vec<_> = jobs.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
        assert_eq!(
            jobs[0].output_file,
            output.path().join("renders").join("alpha_final.mp4")
        );
        assert_eq!(jobs[1].background_video, input.path().join("beta.MOV"));
        assert!(jobs.iter().all(|j| j.theme == "dramatic"));
        assert!(output.path().join("renders").is_dir());
    }

    #[test]
    fn test_missing_input_dir_is_error() {
        let output = tempfile::tempdir().unwrap();
        let missing = output.path().join("nope");
        assert!(jobs_from_directory(&missing, output.path(), &JobOptions::default()).is_err());
    }
}
