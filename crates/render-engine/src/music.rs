//! Background music library.

use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;

const MUSIC_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Music files in `dir`, sorted by path. A missing or unreadable directory
/// yields an empty list.
pub fn list_music_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(dir = %dir.display(), error = %err, "Music directory not readable");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_music_file(path))
        .collect();
    files.sort();
    files
}

/// Pick one music file at random, or `None` when the library is empty.
pub fn choose_background_music(dir: &Path) -> Option<PathBuf> {
    let files = list_music_files(dir);
    let chosen = files.choose(&mut rand::rng()).cloned();
    match &chosen {
        Some(path) => tracing::debug!(track = %path.display(), "Background music selected"),
        None => tracing::debug!(dir = %dir.display(), "No background music available, skipping"),
    }
    chosen
}

fn is_music_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            MUSIC_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_only_music() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp3", "a.WAV", "notes.txt", "clip.mp4"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.mp3")).unwrap();

        let files = list_music_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.WAV", "b.mp3"]);
    }

    #[test]
    fn test_empty_or_missing_library() {
        let dir = tempfile::tempdir().unwrap();
        assert!(choose_background_music(dir.path()).is_none());
        assert!(choose_background_music(&dir.path().join("absent")).is_none());
    }

    #[test]
    fn test_choice_comes_from_library() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("only.mp3"), b"x").unwrap();
        assert_eq!(
            choose_background_music(dir.path()),
            Some(dir.path().join("only.mp3"))
        );
    }
}
