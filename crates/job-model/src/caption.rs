//! Caption track types.
//!
//! A caption track is a JSON array of entries produced by the caption
//! generator. Timestamps are milliseconds relative to the start of the
//! narration audio:
//!
//! ```json
//! [{"text": ["First line", "second"], "start_time": 0, "end_time": 2500,
//!   "style": {"font": "Arial", "size": 60, "color": "#FFFFFF",
//!             "bg_color": "#00000080", "alignment": "center", "position": "center"}}]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::theme::Theme;

/// Font size used when neither the entry nor the theme sets one.
pub const DEFAULT_CAPTION_SIZE: u32 = 60;

/// Caption text as either a single string or pre-broken display lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptionText {
    Single(String),
    Lines(Vec<String>),
}

/// One timed caption overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEntry {
    pub text: CaptionText,

    /// Start in milliseconds from narration start.
    pub start_time: f64,

    /// End in milliseconds from narration start.
    pub end_time: f64,

    /// Per-entry overrides of the theme styling.
    #[serde(default)]
    pub style: Option<CaptionStyle>,
}

/// Optional per-entry style overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptionStyle {
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub bg_color: Option<String>,
    #[serde(default)]
    pub alignment: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

/// Vertical placement of a caption on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptionPosition {
    #[default]
    Center,
    Bottom,
    Top,
}

impl CaptionPosition {
    /// Anything other than `center` or `bottom` is placed at the top.
    pub fn parse(value: &str) -> Self {
        match value {
            "center" => CaptionPosition::Center,
            "bottom" => CaptionPosition::Bottom,
            _ => CaptionPosition::Top,
        }
    }
}

/// Fully resolved caption styling (entry override, else theme default).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub font: String,
    pub size: u32,
    pub color: String,
    pub bg_color: Option<String>,
    pub alignment: String,
    pub position: CaptionPosition,
}

impl CaptionEntry {
    /// Build a plain entry without style overrides.
    pub fn new(text: impl Into<String>, start_ms: f64, end_ms: f64) -> Self {
        Self {
            text: CaptionText::Single(text.into()),
            start_time: start_ms,
            end_time: end_ms,
            style: None,
        }
    }

    /// Non-blank display lines, trimmed.
    pub fn lines(&self) -> Vec<&str> {
        let raw: Vec<&str> = match &self.text {
            CaptionText::Single(text) => text.lines().collect(),
            CaptionText::Lines(lines) => lines.iter().flat_map(|l| l.lines()).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Text as it should be drawn, or `None` when nothing is renderable.
    pub fn display_text(&self) -> Option<String> {
        let lines = self.lines();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    pub fn start_secs(&self) -> f64 {
        self.start_time / 1000.0
    }

    pub fn end_secs(&self) -> f64 {
        self.end_time / 1000.0
    }

    /// Clip the entry to `[start, min(end, duration)]` in seconds.
    ///
    /// Returns `None` when the clipped interval is empty or inverted, which
    /// includes entries starting at or beyond `duration_secs`.
    pub fn clipped_interval(&self, duration_secs: f64) -> Option<(f64, f64)> {
        let start = self.start_secs().max(0.0);
        let end = self.end_secs().min(duration_secs);
        if !start.is_finite() || !end.is_finite() || start >= end {
            return None;
        }
        Some((start, end))
    }

    /// Resolve styling against a theme.
    pub fn resolve_style(&self, theme: &Theme) -> ResolvedStyle {
        let style = self.style.clone().unwrap_or_default();
        ResolvedStyle {
            font: style
                .font
                .unwrap_or_else(|| theme.caption_font.to_string()),
            size: style.size.unwrap_or(DEFAULT_CAPTION_SIZE),
            color: style
                .color
                .unwrap_or_else(|| theme.caption_color.to_string()),
            bg_color: style
                .bg_color
                .or_else(|| theme.caption_bg.map(str::to_string)),
            alignment: style
                .alignment
                .unwrap_or_else(|| theme.caption_alignment.to_string()),
            position: style
                .position
                .as_deref()
                .map(CaptionPosition::parse)
                .unwrap_or_default(),
        }
    }
}

/// Errors that can occur when reading a caption track.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Parse a caption track from JSON text.
pub fn parse_caption_track(json: &str) -> Result<Vec<CaptionEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Read and parse a caption track file.
pub fn load_caption_track(path: impl AsRef<Path>) -> Result<Vec<CaptionEntry>, TrackError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| TrackError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_caption_track(&content).map_err(|e| TrackError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a caption track as pretty JSON.
pub fn save_caption_track(
    entries: &[CaptionEntry],
    path: impl AsRef<Path>,
) -> Result<(), TrackError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(entries).map_err(|e| TrackError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| TrackError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_generator_output() {
        let json = r##"[
            {"text": ["Did you know", "this fact?"], "start_time": 0, "end_time": 2500.5,
             "style": {"font": "Arial", "size": 70, "color": "#FFD700",
                       "bg_color": "#00000080", "alignment": "center", "position": "center"}},
            {"text": "Plain text", "start_time": 2500.5, "end_time": 4000}
        ]"##;

        let entries = parse_caption_track(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].lines(), vec!["Did you know", "this fact?"]);
        assert_eq!(entries[0].style.as_ref().unwrap().size, Some(70));
        assert!((entries[0].end_secs() - 2.5005).abs() < 1e-9);
        assert!(entries[1].style.is_none());
    }

    #[test]
    fn test_empty_track_is_valid() {
        assert!(parse_caption_track("[]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_track_is_error() {
        assert!(parse_caption_track(r#"[{"text": "x"}]"#).is_err());
        assert!(parse_caption_track("{}").is_err());
    }

    #[test]
    fn test_blank_lines_are_not_renderable() {
        let entry = CaptionEntry {
            text: CaptionText::Lines(vec!["  ".to_string(), String::new()]),
            start_time: 0.0,
            end_time: 1000.0,
            style: None,
        };
        assert!(entry.display_text().is_none());
    }

    #[test]
    fn test_clip_end_beyond_duration() {
        let entry = CaptionEntry::new("tail", 9_000.0, 12_000.0);
        assert_eq!(entry.clipped_interval(10.0), Some((9.0, 10.0)));
    }

    #[test]
    fn test_entry_entirely_beyond_duration_is_dropped() {
        let entry = CaptionEntry::new("late", 11_000.0, 12_000.0);
        assert_eq!(entry.clipped_interval(10.0), None);
        let inverted = CaptionEntry::new("inverted", 3_000.0, 2_000.0);
        assert_eq!(inverted.clipped_interval(10.0), None);
    }

    #[test]
    fn test_style_resolution_prefers_entry_override() {
        let mut entry = CaptionEntry::new("hello", 0.0, 1000.0);
        entry.style = Some(CaptionStyle {
            color: Some("#FF0000".to_string()),
            position: Some("bottom".to_string()),
            ..CaptionStyle::default()
        });

        let resolved = entry.resolve_style(&Theme::named("dramatic"));
        assert_eq!(resolved.color, "#FF0000");
        assert_eq!(resolved.font, "Impact");
        assert_eq!(resolved.bg_color.as_deref(), Some("#00000090"));
        assert_eq!(resolved.size, DEFAULT_CAPTION_SIZE);
        assert_eq!(resolved.position, CaptionPosition::Bottom);
    }

    #[test]
    fn test_minimalist_theme_has_no_box() {
        let entry = CaptionEntry::new("hello", 0.0, 1000.0);
        assert!(entry
            .resolve_style(&Theme::named("minimalist"))
            .bg_color
            .is_none());
    }

    #[test]
    fn test_load_track_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.json");
        let entries = vec![CaptionEntry::new("one", 0.0, 1500.0)];
        save_caption_track(&entries, &path).unwrap();

        assert_eq!(load_caption_track(&path).unwrap(), entries);
        assert!(matches!(
            load_caption_track(dir.path().join("missing.json")),
            Err(TrackError::IoError { .. })
        ));
    }

    proptest! {
        #[test]
        fn clipped_interval_stays_inside_timeline(
            start in 0.0f64..60_000.0,
            len in 1.0f64..30_000.0,
            duration in 0.5f64..60.0,
        ) {
            let entry = CaptionEntry::new("x", start, start + len);
            match entry.clipped_interval(duration) {
                Some((s, e)) => {
                    prop_assert!(s < e);
                    prop_assert!(e <= duration);
                    prop_assert!((s - start / 1000.0).abs() < 1e-9);
                }
                None => prop_assert!(start / 1000.0 >= duration),
            }
        }
    }
}
