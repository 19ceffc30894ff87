//! Reference stream selection
//!
//! Each tick the latest playing stream becomes the reference. Paused streams
//! are never candidates, so isolated or stalled streams cannot drag the
//! timeline backwards.

use crate::state::SyncState;
use crate::types::{StreamId, WallClockMs};

/// A stream observed at the start of a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamObservation {
    pub id: StreamId,
    pub position: WallClockMs,
    pub paused: bool,
}

/// The stream selected as reference and its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: StreamId,
    pub position: WallClockMs,
}

/// Pick the playing stream with the latest position
///
/// Returns `None` when playback is not wanted or nothing is playing. Ties
/// keep the earlier observation.
pub fn select_reference(observations: &[StreamObservation], play_intent: bool) -> Option<Reference> {
    if !play_intent {
        return None;
    }

    observations
        .iter()
        .filter(|obs| !obs.paused)
        .fold(None::<&StreamObservation>, |best, obs| match best {
            Some(current) if current.position >= obs.position => Some(current),
            _ => Some(obs),
        })
        .map(|obs| Reference {
            id: obs.id.clone(),
            position: obs.position,
        })
}

/// Apply a selection result to the session state
///
/// With a reference: live-ness is derived from `now`, playing is forced on
/// and the last known timestamp advances to the reference position if that
/// is newer. Without one: the reference and playing flag are cleared but the
/// last known timestamp is kept.
pub fn apply_reference(
    state: &mut SyncState,
    reference: Option<&Reference>,
    now: WallClockMs,
    live_window_ms: f64,
) {
    match reference {
        Some(reference) => {
            state.reference = Some(reference.id.clone());
            state.is_live = ((now - reference.position) as f64) < live_window_ms;
            state.is_playing = true;
            state.last_known_timestamp = Some(
                state
                    .last_known_timestamp
                    .map_or(reference.position, |last| last.max(reference.position)),
            );
        }
        None => {
            state.reference = None;
            state.is_playing = false;
        }
    }
}
