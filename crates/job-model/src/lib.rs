//! Reelforge Job Model
//!
//! Defines the core data contracts shared by the render engine and scheduler:
//! - **Jobs:** One independent render request and its outcome record
//! - **Captions:** Timed caption entries (milliseconds relative to narration start)
//! - **Themes:** Named caption styling plus an optional background effect
//!
//! Caption timestamps are kept in milliseconds as produced by the caption
//! generator; conversion to seconds happens at the timeline boundary.

pub mod caption;
pub mod job;
pub mod theme;

pub use caption::*;
pub use job::*;
pub use theme::*;
