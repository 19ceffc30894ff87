//! Safe seek planning
//!
//! Maps a wall-clock instant to a local media time on one stream and checks
//! that the result is actually reachable. Planning never mutates the stream;
//! callers apply a successful [`SeekPlan`] themselves, so a failed plan leaves
//! the stream untouched.

use crate::control::PlaybackControl;
use crate::error::SeekError;
use crate::fragment::find_fragment_by_timestamp;
use crate::types::{Fragment, SeekableRange, WallClockMs};

/// A validated seek target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekPlan {
    /// Local media time to seek to, in seconds
    pub target_secs: f64,

    /// Fragment covering the requested wall-clock instant
    pub fragment: Fragment,

    /// Seekable range the target was validated against
    pub range: SeekableRange,
}

/// Plan a seek to `target` given a stream's segment index and seekable ranges
///
/// `fragments` is `None` when the stream has no active level or the level has
/// no segment index yet.
pub fn plan_seek(
    fragments: Option<&[Fragment]>,
    seekable: &[SeekableRange],
    target: WallClockMs,
) -> Result<SeekPlan, SeekError> {
    let fragments = fragments.ok_or(SeekError::NoLevelData)?;
    if fragments.is_empty() {
        return Err(SeekError::NoFragments);
    }

    let fragment = *find_fragment_by_timestamp(fragments, target)
        .ok_or(SeekError::FragmentNotFound { target_ms: target })?;
    let target_secs = local_time(&fragment, target);

    if seekable.is_empty() {
        return Err(SeekError::NoSeekableRange);
    }

    seekable
        .iter()
        .find(|range| range.contains(target_secs))
        .map(|range| SeekPlan {
            target_secs,
            fragment,
            range: *range,
        })
        .ok_or(SeekError::TargetOutsideSeekable { target_secs })
}

/// Plan a seek against the live state of `stream`
pub fn plan_seek_for(
    stream: &dyn PlaybackControl,
    target: WallClockMs,
) -> Result<SeekPlan, SeekError> {
    let fragments = stream.fragments();
    let seekable = stream.seekable_ranges();
    plan_seek(fragments.as_deref(), &seekable, target)
}

fn local_time(fragment: &Fragment, target: WallClockMs) -> f64 {
    let pdt = fragment.program_date_time.unwrap_or(target);
    let offset_secs = (target - pdt) as f64 / 1000.0;
    (fragment.media_start + offset_secs)
        .max(fragment.media_start)
        .min(fragment.media_end())
}
