//! Reelforge Capability Profile
//!
//! Best-effort description of the host's video encoding capability:
//! - **Probes:** Per-platform GPU vendor detection that never fails loudly
//! - **Encoders:** The hardware encoders ffmpeg actually reports
//! - **Profile:** Thread budget, chosen encoder/preset, and acceleration flags
//!
//! The profile is computed once per process and passed by reference to the
//! render engine and scheduler.

pub mod encoders;
pub mod gpu;
pub(crate) mod probe;
pub mod profile;

pub use encoders::*;
pub use gpu::*;
pub use profile::*;
