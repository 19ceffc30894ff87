//! Fragment lookup over a stream's buffered segment index
//!
//! Both lookups are pure and total. Untagged fragments are skipped: they
//! never match and never stop a neighbor from matching.

use crate::types::{Fragment, WallClockMs};

/// Find the tagged fragment whose `[pdt, pdt + duration)` interval contains `t`
///
/// Returns `None` when `t` falls before the first or after the last tagged
/// fragment, inside a gap, or when no fragment carries a program date time.
pub fn find_fragment_by_timestamp(fragments: &[Fragment], t: WallClockMs) -> Option<&Fragment> {
    fragments.iter().find(|fragment| fragment.covers(t))
}

/// Find the tagged fragment whose program date time is closest to `t`
///
/// Ties resolve to the earlier fragment in index order.
pub fn find_closest_fragment(fragments: &[Fragment], t: WallClockMs) -> Option<&Fragment> {
    fragments
        .iter()
        .filter_map(|fragment| {
            fragment
                .program_date_time
                .map(|pdt| (fragment, pdt.abs_diff(t)))
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(fragment, _)| fragment)
}
