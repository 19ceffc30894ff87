//! Configuration for the sync loop

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Tuning knobs for the sync controller and its driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Period between ticks in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Drift beyond which a stream is re-seeked, in seconds
    #[serde(default = "default_drift_tolerance_secs")]
    pub drift_tolerance_secs: f64,

    /// Distance from now under which playback counts as live
    ///
    /// The reference is live while `now - reference < threshold * 1.5`.
    #[serde(default = "default_live_edge_threshold_ms")]
    pub live_edge_threshold_ms: u64,

    /// Capacity of the sync event broadcast channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_drift_tolerance_secs() -> f64 {
    0.5
}

fn default_live_edge_threshold_ms() -> u64 {
    10_000
}

fn default_event_channel_capacity() -> usize {
    256
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            drift_tolerance_secs: default_drift_tolerance_secs(),
            live_edge_threshold_ms: default_live_edge_threshold_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::ConfigError(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !self.drift_tolerance_secs.is_finite() || self.drift_tolerance_secs < 0.0 {
            return Err(Error::ConfigError(format!(
                "drift_tolerance_secs must be a non-negative number, got {}",
                self.drift_tolerance_secs
            )));
        }
        if self.live_edge_threshold_ms == 0 {
            return Err(Error::ConfigError(
                "live_edge_threshold_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::ConfigError(
                "event_channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Live-edge window in milliseconds (threshold * 1.5)
    pub fn live_window_ms(&self) -> f64 {
        self.live_edge_threshold_ms as f64 * 1.5
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn with_drift_tolerance_secs(mut self, secs: f64) -> Self {
        self.drift_tolerance_secs = secs;
        self
    }

    pub fn with_live_edge_threshold_ms(mut self, ms: u64) -> Self {
        self.live_edge_threshold_ms = ms;
        self
    }
}
