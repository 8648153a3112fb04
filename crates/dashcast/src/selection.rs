//! Track selection.
//!
//! Tracks are assumed to be sorted by ascending `avg_bandwidth` and to share one
//! segment duration; [`Manifest::validate`](crate::Manifest::validate) checks both.
//! The functions here do not re-check and give meaningless answers otherwise.

use crate::manifest::Track;

/// Outcome of [`select_track`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub track: usize,
    /// The throughput choice was lowered one step because the queue was nearly empty.
    pub headroom_downshift: bool,
}

/// Highest track whose rating does not exceed `bandwidth` (track 0 if none does).
///
/// The walk starts at `current` and moves one step at a time, first down while
/// the current rating is above the bandwidth, then up while the next rating is
/// within it.
pub fn best_track(tracks: &[Track], current: usize, bandwidth: u64) -> usize {
    if tracks.is_empty() {
        return 0;
    }
    let last = tracks.len() - 1;
    let mut index = current.min(last);

    while index > 0 && bandwidth < tracks[index].avg_bandwidth {
        index -= 1;
    }
    while index < last && bandwidth >= tracks[index + 1].avg_bandwidth {
        index += 1;
    }
    index
}

/// Whether the queue holds at most one segment's worth of playback.
pub fn queue_nearly_empty(occupancy: usize, tracks: &[Track], current: usize) -> bool {
    let Some(track) = tracks.get(current).or_else(|| tracks.last()) else {
        return true;
    };
    let duration = track.segment_duration;
    let occupancy = u32::try_from(occupancy).unwrap_or(u32::MAX);
    duration.saturating_mul(occupancy) <= duration
}

/// [`best_track`] followed by the queue headroom guard: a non-zero choice is
/// lowered by one step when the queue is nearly empty.
pub fn select_track(
    tracks: &[Track],
    current: usize,
    bandwidth: u64,
    occupancy: usize,
) -> Selection {
    let track = best_track(tracks, current, bandwidth);
    if track == 0 || !queue_nearly_empty(occupancy, tracks, current) {
        return Selection {
            track,
            headroom_downshift: false,
        };
    }
    Selection {
        track: track - 1,
        headroom_downshift: true,
    }
}

pub fn best_track_within_queue_time(
    tracks: &[Track],
    current: usize,
    bandwidth: u64,
    occupancy: usize,
) -> usize {
    select_track(tracks, current, bandwidth, occupancy).track
}
