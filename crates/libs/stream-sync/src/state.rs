//! Session-wide sync state

use serde::{Deserialize, Serialize};

use crate::types::{StreamId, WallClockMs};

/// Sync state for one viewing session
///
/// `last_known_timestamp` is sticky: losing the reference leaves it in place
/// and only a newly selected reference overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Stream every other stream is corrected against this tick
    pub reference: Option<StreamId>,

    /// Last position reported by a reference stream
    pub last_known_timestamp: Option<WallClockMs>,

    /// Whether the reference is close enough to now to count as live
    pub is_live: bool,

    /// Whether a playing reference exists
    pub is_playing: bool,
}

/// Read-only view published to observers after every tick
pub type SyncSnapshot = SyncState;
