//! Visual theme catalogue.
//!
//! A theme bundles the default caption styling with an optional effect that
//! is applied to the background track only.

use serde::{Deserialize, Serialize};

/// Name of the theme used when a requested theme is unknown.
pub const DEFAULT_THEME: &str = "default";

/// Effect applied to the background track before overlays are composited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// One second fade in from black.
    FadeIn,
    /// One second fade out to black at the end of the track.
    FadeOut,
    /// Static 3% zoom-in, cropped back to the frame.
    Zoom,
    /// Horizontal mirror.
    MirrorX,
    /// Color intensity boost.
    ColorX,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::FadeIn => "fadein",
            Effect::FadeOut => "fadeout",
            Effect::Zoom => "zoom",
            Effect::MirrorX => "mirror_x",
            Effect::ColorX => "colorx",
        }
    }
}

/// A named visual style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub caption_font: &'static str,
    pub caption_color: &'static str,
    /// Caption box color; `None` renders captions without a box.
    pub caption_bg: Option<&'static str>,
    pub caption_alignment: &'static str,
    pub effect: Option<Effect>,
}

const THEMES: [Theme; 5] = [
    Theme {
        name: "default",
        caption_font: "Arial",
        caption_color: "#FFFFFF",
        caption_bg: Some("#00000080"),
        caption_alignment: "center",
        effect: None,
    },
    Theme {
        name: "modern",
        caption_font: "Helvetica",
        caption_color: "#FFFFFF",
        caption_bg: Some("#0066CC80"),
        caption_alignment: "center",
        effect: Some(Effect::FadeIn),
    },
    Theme {
        name: "minimalist",
        caption_font: "Verdana",
        caption_color: "#FFFFFF",
        caption_bg: None,
        caption_alignment: "center",
        effect: None,
    },
    Theme {
        name: "dramatic",
        caption_font: "Impact",
        caption_color: "#FFD700",
        caption_bg: Some("#00000090"),
        caption_alignment: "center",
        effect: Some(Effect::Zoom),
    },
    Theme {
        name: "retro",
        caption_font: "Courier",
        caption_color: "#F5F5DC",
        caption_bg: Some("#8B4513A0"),
        caption_alignment: "center",
        effect: Some(Effect::FadeIn),
    },
];

impl Theme {
    /// Look up a theme by name, falling back to the default theme.
    pub fn named(name: &str) -> Theme {
        Self::find(name).unwrap_or(THEMES[0])
    }

    /// Look up a theme by exact name.
    pub fn find(name: &str) -> Option<Theme> {
        THEMES.iter().copied().find(|theme| theme.name == name)
    }

    /// All known themes.
    pub fn catalogue() -> &'static [Theme] {
        &THEMES
    }
}

impl Default for Theme {
    fn default() -> Self {
        THEMES[0]
    }
}
