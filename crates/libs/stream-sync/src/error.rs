//! Error types for stream synchronization

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::WallClockMs;

/// Result type alias for stream sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level errors (configuration and delivery, never the tick path)
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration parsed but holds invalid values
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Event delivery error
    #[error("Event sink error: {0}")]
    Sink(#[from] crate::events::EventSinkError),
}

/// Why a safe seek could not be planned
///
/// Planner failures are values, never panics. The drift corrector records
/// them on the affected stream as [`StreamError::TimespanMissing`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeekError {
    /// Stream exposes no active quality level, or the level has no segment index
    #[error("No level data available")]
    NoLevelData,

    /// The segment index is empty
    #[error("No fragments buffered")]
    NoFragments,

    /// No tagged fragment covers the requested wall-clock instant
    #[error("No fragment covers timestamp {target_ms}")]
    FragmentNotFound {
        /// Requested wall-clock instant
        target_ms: WallClockMs,
    },

    /// The stream reports no seekable ranges
    #[error("No seekable range available")]
    NoSeekableRange,

    /// The computed target lies outside every seekable range
    #[error("Seek target {target_secs:.3}s is outside the seekable ranges")]
    TargetOutsideSeekable {
        /// Local media time the planner computed
        target_secs: f64,
    },
}

/// User-facing error annotation rendered on a single stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum StreamError {
    /// The timespan needed to sync this stream is not buffered
    #[error("Required timespan is not buffered")]
    TimespanMissing,
}

impl From<&SeekError> for StreamError {
    fn from(_: &SeekError) -> Self {
        StreamError::TimespanMissing
    }
}

impl From<SeekError> for StreamError {
    fn from(err: SeekError) -> Self {
        StreamError::from(&err)
    }
}

/// A resume request the playback engine did not honor
///
/// Transient by nature (autoplay policy, interrupted by a newer request).
/// Resume errors are logged and dropped; the next tick retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResumeError {
    /// The engine refused to start playback
    #[error("Resume rejected: {0}")]
    Rejected(String),

    /// A newer request (pause, seek) interrupted the resume
    #[error("Resume interrupted: {0}")]
    Interrupted(String),
}

/// Kind of playback error reported by the engine for one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PlaybackErrorKind {
    /// Media failed to decode
    Media(String),
    /// Network failure while buffering
    Network(String),
    /// Anything else the engine surfaces
    Other(String),
}

impl std::fmt::Display for PlaybackErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackErrorKind::Media(detail) => write!(f, "media error: {}", detail),
            PlaybackErrorKind::Network(detail) => write!(f, "network error: {}", detail),
            PlaybackErrorKind::Other(detail) => write!(f, "playback error: {}", detail),
        }
    }
}
