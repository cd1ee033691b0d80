//! Timeline planning.
//!
//! A [`TimelinePlan`] describes one render without touching a media library:
//! which inputs are read, how the background is fitted to the narration,
//! which overlays are drawn and when, and what is prepended. All times are
//! seconds on the main timeline, where `t = 0` is the start of the narration.
//! The intro, when present, sits before `t = 0` and is concatenated in front.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use reelforge_job_model::{CaptionEntry, CaptionPosition, Effect, ResolvedStyle, Theme};

/// Durations closer than this are treated as equal.
const DURATION_EPSILON: f64 = 1e-3;

/// Caption fade-in used when the theme's effect is a fade-in.
pub const CAPTION_FADE_SECS: f64 = 0.5;

/// Call-to-action fade-in.
pub const CTA_FADE_SECS: f64 = 0.5;

/// Font size of the call-to-action text.
pub const CTA_FONT_SIZE: u32 = 60;

/// Font size of the intro title.
pub const INTRO_FONT_SIZE: u32 = 80;

/// Horizontal room kept free around wrapped caption text, in pixels.
pub const CAPTION_MARGIN_PX: u32 = 100;

/// Average glyph advance as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f64 = 0.55;

/// Output frame geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Frame {
    /// Length of a single frame in seconds.
    pub fn duration_secs(&self) -> f64 {
        1.0 / self.fps.max(1) as f64
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
        }
    }
}

/// How a background track is fitted to the narration length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFit {
    /// Lengths already match.
    Exact,
    /// Source is longer; cut at the target.
    Trim,
    /// Source is shorter; repeat `copies` times, then cut at the target.
    Loop { copies: u32 },
}

impl TrackFit {
    /// Decide how a source of `source_secs` covers `target_secs`.
    ///
    /// `source_secs` must be positive. A looping source is repeated
    /// `floor(target / source) + 1` times so that it always covers the target.
    pub fn reconcile(source_secs: f64, target_secs: f64) -> Self {
        if (source_secs - target_secs).abs() <= DURATION_EPSILON {
            TrackFit::Exact
        } else if source_secs > target_secs {
            TrackFit::Trim
        } else {
            let copies = (target_secs / source_secs).floor() as u32 + 1;
            TrackFit::Loop { copies }
        }
    }

    /// Extra plays requested from the demuxer (`-stream_loop`).
    pub fn extra_loops(self) -> u32 {
        match self {
            TrackFit::Loop { copies } => copies.saturating_sub(1),
            TrackFit::Exact | TrackFit::Trim => 0,
        }
    }
}

/// Background video input.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundTrack {
    pub path: PathBuf,
    pub source_secs: f64,
    pub fit: TrackFit,
}

/// Narration input. Its duration is the main timeline length.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationTrack {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Background music, looped and cut to the main timeline, mixed under the narration.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicBed {
    pub path: PathBuf,
    pub volume: f64,
}

/// One caption drawn over the main timeline.
///
/// The text lives in a scratch file so it never has to be escaped into the
/// filter graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionOverlay {
    pub text_file: PathBuf,
    pub start_secs: f64,
    pub end_secs: f64,
    pub style: ResolvedStyle,
    pub fade_in_secs: Option<f64>,
}

/// Title card shown before the main timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct IntroCard {
    pub duration_secs: f64,
    pub title_file: PathBuf,
    pub font: String,
    pub color: String,
}

/// Call-to-action overlay over the tail of the main timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CallToAction {
    pub text_file: PathBuf,
    pub start_secs: f64,
    pub end_secs: f64,
    pub style: ResolvedStyle,
}

/// Everything needed to render one output file.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePlan {
    pub frame: Frame,
    pub background: BackgroundTrack,
    pub narration: NarrationTrack,
    pub effect: Option<Effect>,
    pub captions: Vec<CaptionOverlay>,
    pub intro: Option<IntroCard>,
    pub call_to_action: Option<CallToAction>,
    pub music: Option<MusicBed>,
    pub output: PathBuf,
}

impl TimelinePlan {
    /// Background fitted to narration, nothing else.
    pub fn simplified(
        frame: Frame,
        background: BackgroundTrack,
        narration: NarrationTrack,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            frame,
            background,
            narration,
            effect: None,
            captions: Vec::new(),
            intro: None,
            call_to_action: None,
            music: None,
            output: output.into(),
        }
    }

    /// Length of the main timeline, equal to the narration duration.
    pub fn main_duration_secs(&self) -> f64 {
        self.narration.duration_secs
    }

    /// Length of the written file: intro plus main timeline.
    pub fn total_duration_secs(&self) -> f64 {
        self.intro.as_ref().map_or(0.0, |intro| intro.duration_secs) + self.main_duration_secs()
    }

    pub fn is_simplified(&self) -> bool {
        self.effect.is_none()
            && self.captions.is_empty()
            && self.intro.is_none()
            && self.call_to_action.is_none()
            && self.music.is_none()
    }
}

/// Window covered by the call-to-action: the final `min(max_secs, main * fraction)`
/// seconds of the main timeline.
pub fn call_to_action_window(main_secs: f64, max_secs: f64, fraction: f64) -> Option<(f64, f64)> {
    let length = max_secs.min(main_secs * fraction).min(main_secs);
    if !length.is_finite() || length <= 0.0 {
        return None;
    }
    Some((main_secs - length, main_secs))
}

/// Resolve caption entries into overlays clipped to the main timeline.
///
/// Entries whose clipped interval is empty, or that have no visible text,
/// are dropped. Text files are written into `scratch` in parallel.
pub fn plan_captions(
    entries: &[CaptionEntry],
    theme: &Theme,
    frame: Frame,
    main_secs: f64,
    scratch: &Path,
) -> std::io::Result<Vec<CaptionOverlay>> {
    let fade_in_secs = (theme.effect == Some(Effect::FadeIn)).then_some(CAPTION_FADE_SECS);

    let overlays: Vec<Option<CaptionOverlay>> = entries
        .par_iter()
        .enumerate()
        .map(|(index, entry)| -> std::io::Result<Option<CaptionOverlay>> {
            let Some((start_secs, end_secs)) = entry.clipped_interval(main_secs) else {
                return Ok(None);
            };
            let Some(text) = entry.display_text() else {
                return Ok(None);
            };
            let style = entry.resolve_style(theme);
            let text = wrap_caption(&text, caption_wrap_columns(frame.width, style.size));

            let text_file = scratch.join(format!("caption_{index:04}.txt"));
            std::fs::write(&text_file, text)?;

            Ok(Some(CaptionOverlay {
                text_file,
                start_secs,
                end_secs,
                style,
                fade_in_secs,
            }))
        })
        .collect::<std::io::Result<_>>()?;

    let overlays: Vec<CaptionOverlay> = overlays.into_iter().flatten().collect();
    tracing::debug!(
        entries = entries.len(),
        overlays = overlays.len(),
        "Caption overlays planned"
    );
    Ok(overlays)
}

/// Characters per caption line that fit the frame at `font_size`.
pub fn caption_wrap_columns(frame_width: u32, font_size: u32) -> usize {
    let room = frame_width.saturating_sub(CAPTION_MARGIN_PX) as f64;
    let glyph = font_size.max(1) as f64 * GLYPH_WIDTH_RATIO;
    ((room / glyph).floor() as usize).max(1)
}

/// Re-wrap every caption line to `columns`. Explicit line breaks are kept;
/// words longer than a line are split.
pub fn wrap_caption(text: &str, columns: usize) -> String {
    text.lines()
        .flat_map(|line| textwrap::wrap(line, columns))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Intro title card styled after the theme.
pub fn plan_intro(
    theme: &Theme,
    duration_secs: f64,
    title: &str,
    scratch: &Path,
) -> std::io::Result<Option<IntroCard>> {
    if duration_secs <= 0.0 {
        return Ok(None);
    }
    let title_file = scratch.join("intro_title.txt");
    std::fs::write(&title_file, title)?;
    Ok(Some(IntroCard {
        duration_secs,
        title_file,
        font: theme.caption_font.to_string(),
        color: theme.caption_color.to_string(),
    }))
}

/// Call-to-action over the tail of the main timeline, styled after the theme.
pub fn plan_call_to_action(
    theme: &Theme,
    main_secs: f64,
    max_secs: f64,
    fraction: f64,
    text: &str,
    scratch: &Path,
) -> std::io::Result<Option<CallToAction>> {
    let Some((start_secs, end_secs)) = call_to_action_window(main_secs, max_secs, fraction) else {
        return Ok(None);
    };
    let text_file = scratch.join("call_to_action.txt");
    std::fs::write(&text_file, text)?;
    Ok(Some(CallToAction {
        text_file,
        start_secs,
        end_secs,
        style: ResolvedStyle {
            font: theme.caption_font.to_string(),
            size: CTA_FONT_SIZE,
            color: theme.caption_color.to_string(),
            bg_color: theme.caption_bg.map(str::to_string),
            alignment: theme.caption_alignment.to_string(),
            position: CaptionPosition::Bottom,
        },
    }))
}
