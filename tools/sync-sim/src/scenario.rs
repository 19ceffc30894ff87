//! Scenario files
//!
//! ```toml
//! playing = true
//! muted = false
//!
//! [[streams]]
//! id = "front-door"
//! latency_ms = 2000
//!
//! [[streams]]
//! id = "garage"
//! latency_ms = 6000
//! start_behind_ms = 3000
//! fail_after_ms = 1500
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// A set of simulated streams plus the viewer's intent
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Whether the viewer wants playback running
    #[serde(default = "default_playing")]
    pub playing: bool,

    #[serde(default)]
    pub muted: bool,

    /// Offset from now the session was asked to start at, in ms
    #[serde(default)]
    pub requested_start_offset_ms: Option<i64>,

    pub streams: Vec<StreamSpec>,
}

fn default_playing() -> bool {
    true
}

/// One simulated live stream
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSpec {
    pub id: String,

    /// How far the stream's buffered live edge trails real time
    #[serde(default = "default_latency_ms")]
    pub latency_ms: i64,

    /// How far behind its own live edge the playhead starts
    #[serde(default)]
    pub start_behind_ms: i64,

    /// Fragment length in seconds
    #[serde(default = "default_fragment_secs")]
    pub fragment_secs: f64,

    /// Number of fragments kept in the sliding live window
    #[serde(default = "default_window_fragments")]
    pub window_fragments: usize,

    /// Start paused instead of playing
    #[serde(default)]
    pub paused: bool,

    /// Report a playback error this long after start
    #[serde(default)]
    pub fail_after_ms: Option<u64>,
}

fn default_latency_ms() -> i64 {
    3_000
}

fn default_fragment_secs() -> f64 {
    2.0
}

fn default_window_fragments() -> usize {
    30
}

impl Scenario {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(s).context("Failed to parse scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> Result<()> {
        if self.streams.is_empty() {
            bail!("Scenario has no streams");
        }

        let mut seen = HashSet::new();
        for stream in &self.streams {
            if !seen.insert(stream.id.as_str()) {
                bail!("Duplicate stream id '{}'", stream.id);
            }
            if !stream.fragment_secs.is_finite() || stream.fragment_secs <= 0.0 {
                bail!("Stream '{}' needs a positive fragment_secs", stream.id);
            }
            if stream.window_fragments == 0 {
                bail!("Stream '{}' needs a non-empty window", stream.id);
            }
            if stream.latency_ms < 0 || stream.start_behind_ms < 0 {
                bail!("Stream '{}' has a negative latency or start offset", stream.id);
            }
        }
        Ok(())
    }
}
