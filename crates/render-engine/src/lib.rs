//! Reelforge Render Engine
//!
//! Turns one render job (background video, narration, caption track, theme)
//! into a finished vertical short.
//!
//! # Pipeline Architecture
//!
//! ```text
//! narration.mp3 ──┐ duration is authoritative
//!                 ├── Fit background (trim / loop) ── Theme effect
//! background.mp4 ─┘                                        │
//!                                                          ├── Caption overlays
//! captions.json ───────────────────────────────────────────┘         │
//!                                                                    ├── Call-to-action
//!                                     music/*.mp3 ── volume ── mix ──┤
//!                                                                    ├── Intro clip (prepended)
//!                                                                    ▼
//!                                               Encode (profile encoder, one software retry)
//!                                                                    │
//!                                                                    ▼
//!                                                                output.mp4
//! ```
//!
//! Any failure while composing falls back to a simplified render of the
//! background and narration only.

pub mod backend;
pub mod engine;
pub mod error;
pub mod filter;
pub mod music;
pub mod timeline;

pub use backend::{FfmpegBackend, MediaBackend, ProgressCallback, RenderProgress, RenderStage};
pub use engine::{CompositionEngine, EngineSettings};
pub use error::{RenderError, RenderResult};
pub use timeline::{Frame, TimelinePlan, TrackFit};
