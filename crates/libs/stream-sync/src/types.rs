//! Core data types shared by the sync components
//!
//! Wall-clock instants are milliseconds since the Unix epoch (`WallClockMs`).
//! Local media time (fragment offsets, seekable ranges, seek targets) is in
//! seconds, matching what playback engines expose.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock timestamp in milliseconds since the Unix epoch
pub type WallClockMs = i64;

/// Opaque identity of a tracked stream
///
/// The registry owns the stream itself; the sync core only ever holds ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Create a new stream id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A contiguous buffered chunk of media
///
/// Immutable once appended to a stream's segment index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Local seek-time offset of the fragment start, in seconds
    pub media_start: f64,

    /// Fragment duration in seconds
    pub duration: f64,

    /// Wall-clock instant the fragment start corresponds to
    ///
    /// `None` for fragments that have not been tagged yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_date_time: Option<WallClockMs>,
}

impl Fragment {
    /// Create a tagged fragment
    pub fn tagged(media_start: f64, duration: f64, program_date_time: WallClockMs) -> Self {
        Self {
            media_start,
            duration,
            program_date_time: Some(program_date_time),
        }
    }

    /// Create a fragment without a program date time
    pub fn untagged(media_start: f64, duration: f64) -> Self {
        Self {
            media_start,
            duration,
            program_date_time: None,
        }
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.duration * 1000.0
    }

    /// Local media time at which the fragment ends
    pub fn media_end(&self) -> f64 {
        self.media_start + self.duration
    }

    /// Whether the media-time span is finite and non-negative
    pub fn is_well_formed(&self) -> bool {
        self.media_start.is_finite() && self.duration.is_finite() && self.duration >= 0.0
    }

    /// Whether the wall-clock interval `[pdt, pdt + duration)` contains `t`
    ///
    /// Always false for untagged or malformed fragments.
    pub fn covers(&self, t: WallClockMs) -> bool {
        match self.program_date_time {
            Some(pdt) if self.is_well_formed() => {
                let offset = (t - pdt) as f64;
                offset >= 0.0 && offset < self.duration_ms()
            }
            _ => false,
        }
    }
}

/// Closed interval of local media time reachable by a seek, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekableRange {
    pub start: f64,
    pub end: f64,
}

impl SeekableRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

/// UI-level playback intent, owned outside the sync core
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackIntent {
    /// Timestamp the session was originally asked to start from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_start: Option<WallClockMs>,

    /// Whether the user wants playback running
    #[serde(default)]
    pub playing: bool,

    /// Whether the user wants every stream muted
    #[serde(default)]
    pub muted: bool,
}

impl PlaybackIntent {
    /// Intent for a session that is playing from `start`
    pub fn playing_from(start: Option<WallClockMs>) -> Self {
        Self {
            requested_start: start,
            playing: true,
            muted: false,
        }
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }
}
