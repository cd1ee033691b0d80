//! Inventory of encoders compiled into the local ffmpeg.

use std::collections::BTreeSet;
use std::process::Command;

use serde::{Deserialize, Serialize};

/// Software H.264 encoder present in every ffmpeg build we support.
pub const SOFTWARE_ENCODER: &str = "libx264";

/// Names of the video encoders ffmpeg reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderInventory {
    encoders: BTreeSet<String>,
}

impl EncoderInventory {
    /// Query `ffmpeg -encoders`. An unreadable inventory is empty, which
    /// restricts encoder selection to the software path.
    pub fn query(ffmpeg: &str) -> Self {
        let output = match Command::new(ffmpeg)
            .args(["-hide_banner", "-encoders"])
            .output()
        {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                tracing::warn!(status = %output.status, "ffmpeg -encoders failed");
                return Self::default();
            }
            Err(err) => {
                tracing::warn!(error = %err, "Could not run ffmpeg to list encoders");
                return Self::default();
            }
        };

        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parse the listing printed by `ffmpeg -encoders`.
    ///
    /// Entries follow the `------` separator as `<flags> <name> <description>`;
    /// only video encoders (flags starting with `V`) are kept.
    pub fn parse(listing: &str) -> Self {
        let encoders = listing
            .lines()
            .skip_while(|line| !line.trim_start().starts_with("------"))
            .skip(1)
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let flags = parts.next()?;
                let name = parts.next()?;
                flags.starts_with('V').then(|| name.to_string())
            })
            .collect();
        Self { encoders }
    }

    /// Build an inventory from explicit names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            encoders: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, encoder: &str) -> bool {
        self.encoders.contains(encoder)
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}
