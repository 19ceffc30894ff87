//! Resume coordination when every stream is paused
//!
//! Exactly one stream is nudged per tick: the one whose buffered data sits
//! closest to the timeline anchor. Once it plays it becomes the reference and
//! drift correction pulls the others along.

use crate::control::{dispatch_resume, StreamRegistry};
use crate::fragment::find_closest_fragment;
use crate::reference::StreamObservation;
use crate::types::{StreamId, WallClockMs};

/// The stream chosen for resume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeCandidate {
    pub id: StreamId,
    /// Distance between the anchor and the closest tagged fragment, in ms
    pub distance_ms: u64,
}

/// Timeline anchor: last known reference position, else the requested start
pub fn resume_anchor(
    last_known_timestamp: Option<WallClockMs>,
    requested_start: Option<WallClockMs>,
) -> Option<WallClockMs> {
    last_known_timestamp.or(requested_start)
}

/// Choose the paused stream whose buffer is closest to `anchor`
///
/// Returns `None` unless every observed stream is paused. Streams without
/// tagged fragments are skipped. Ties keep the earlier observation.
pub fn select_resume_candidate(
    observations: &[StreamObservation],
    registry: &dyn StreamRegistry,
    anchor: WallClockMs,
) -> Option<ResumeCandidate> {
    if observations.iter().any(|obs| !obs.paused) {
        return None;
    }

    observations
        .iter()
        .filter_map(|obs| {
            let stream = registry.get(&obs.id)?;
            let fragments = stream.fragments()?;
            let pdt = find_closest_fragment(&fragments, anchor)?.program_date_time?;
            Some(ResumeCandidate {
                id: obs.id.clone(),
                distance_ms: pdt.abs_diff(anchor),
            })
        })
        .fold(None::<ResumeCandidate>, |best, candidate| match best {
            Some(current) if current.distance_ms <= candidate.distance_ms => Some(current),
            _ => Some(candidate),
        })
}

/// Resume the best candidate, if any
pub fn coordinate_resume(
    observations: &[StreamObservation],
    registry: &dyn StreamRegistry,
    anchor: Option<WallClockMs>,
) -> Option<ResumeCandidate> {
    let anchor = anchor?;
    let candidate = select_resume_candidate(observations, registry, anchor)?;
    let stream = registry.get(&candidate.id)?;

    tracing::debug!(
        stream_id = %candidate.id,
        distance_ms = candidate.distance_ms,
        "All streams paused, resuming closest"
    );
    dispatch_resume(&candidate.id, stream.as_ref());
    Some(candidate)
}
