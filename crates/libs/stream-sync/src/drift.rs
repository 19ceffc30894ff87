//! Drift correction against the reference stream
//!
//! Streams within tolerance are left alone, which keeps streams near the
//! boundary from seeking every tick. Streams outside it are seeked to the
//! reference's wall-clock position through a validated [`SeekPlan`] and then
//! resumed, paused ones included.

use crate::control::{dispatch_resume, PlaybackControl, StreamRegistry};
use crate::error::{SeekError, StreamError};
use crate::reference::{Reference, StreamObservation};
use crate::seek::{plan_seek_for, SeekPlan};
use crate::types::{StreamId, WallClockMs};

/// What happened to one stream during drift correction
#[derive(Debug, Clone, PartialEq)]
pub enum DriftOutcome {
    /// Drift within tolerance, nothing issued
    WithinTolerance { drift_secs: f64 },

    /// Pause state changed since the stream was observed, nothing issued
    SkippedPaused,

    /// Seek applied and resume requested
    Corrected {
        drift_secs: f64,
        plan: SeekPlan,
        /// Whether a previous error annotation was cleared
        error_cleared: bool,
    },

    /// No safe seek target, error annotation set
    SeekFailed {
        drift_secs: f64,
        error: SeekError,
        /// Whether the annotation is new this tick
        newly_set: bool,
    },
}

/// Signed drift of a stream behind the reference, in seconds
pub fn drift_secs(reference_position: WallClockMs, stream_position: WallClockMs) -> f64 {
    (reference_position - stream_position) as f64 / 1000.0
}

/// Correct every non-reference stream
///
/// One stream failing to plan never stops the others from being corrected.
pub fn correct_drift(
    reference: &Reference,
    observations: &[StreamObservation],
    registry: &dyn StreamRegistry,
    tolerance_secs: f64,
) -> Vec<(StreamId, DriftOutcome)> {
    observations
        .iter()
        .filter(|obs| obs.id != reference.id)
        .filter_map(|obs| {
            let stream = registry.get(&obs.id)?;
            let outcome = correct_stream(obs, stream.as_ref(), reference, tolerance_secs);
            Some((obs.id.clone(), outcome))
        })
        .collect()
}

/// Correct a single observed stream
pub fn correct_stream(
    obs: &StreamObservation,
    stream: &dyn PlaybackControl,
    reference: &Reference,
    tolerance_secs: f64,
) -> DriftOutcome {
    let id = &obs.id;
    let drift_secs = drift_secs(reference.position, obs.position);
    if drift_secs.abs() <= tolerance_secs {
        return DriftOutcome::WithinTolerance { drift_secs };
    }

    // An error report may have paused the stream since it was observed
    if stream.is_paused() != obs.paused {
        return DriftOutcome::SkippedPaused;
    }

    match plan_seek_for(stream, reference.position) {
        Ok(plan) => {
            tracing::debug!(
                stream_id = %id,
                drift_secs,
                target_secs = plan.target_secs,
                "Seeking drifting stream onto reference"
            );
            stream.set_position(plan.target_secs);
            dispatch_resume(id, stream);

            let error_cleared = stream.error().is_some();
            if error_cleared {
                stream.set_error(None);
            }
            DriftOutcome::Corrected {
                drift_secs,
                plan,
                error_cleared,
            }
        }
        Err(error) => {
            let annotation = StreamError::from(&error);
            let newly_set = stream.error() != Some(annotation);
            if newly_set {
                tracing::warn!(stream_id = %id, drift_secs, error = %error, "Cannot sync stream");
            }
            stream.set_error(Some(annotation));
            DriftOutcome::SeekFailed {
                drift_secs,
                error,
                newly_set,
            }
        }
    }
}
