//! Temporal window lookup of scrobbles around a playback event's start.
//!
//! A scrobble is a candidate when its timestamp lies strictly within the
//! tolerance of the event start. Candidates are always returned in scrobble
//! input order so that ranking ties resolve the same way whichever lookup
//! strategy is used.

use chrono::{DateTime, Duration, Utc};

use crate::models::{CanonicalPlaybackEvent, CanonicalScrobble};

/// Clock skew absorbed between the two sources, in seconds.
pub const MERGEABLE_TIME_DIFF_SECS: i64 = 15;

pub fn default_tolerance() -> Duration {
    Duration::seconds(MERGEABLE_TIME_DIFF_SECS)
}

/// True when `a` and `b` are less than `tolerance` apart (strict).
pub fn within_window(a: DateTime<Utc>, b: DateTime<Utc>, tolerance: Duration) -> bool {
    let diff = a.signed_duration_since(b);
    diff < tolerance && -diff < tolerance
}

/// Linear scan over all scrobbles using the default tolerance.
pub fn candidates_for<'a>(
    target: &CanonicalPlaybackEvent,
    scrobbles: &'a [CanonicalScrobble],
) -> Vec<&'a CanonicalScrobble> {
    candidates_within(target, scrobbles, default_tolerance())
}

/// Linear scan over all scrobbles.
pub fn candidates_within<'a>(
    target: &CanonicalPlaybackEvent,
    scrobbles: &'a [CanonicalScrobble],
    tolerance: Duration,
) -> Vec<&'a CanonicalScrobble> {
    scrobbles
        .iter()
        .filter(|s| within_window(s.timestamp, target.event_start, tolerance))
        .collect()
}

/// Timestamp-sorted view over a scrobble slice for O(log n) window lookups.
///
/// Selects exactly the same scrobbles as [`candidates_within`], in the same
/// order.
pub struct ScrobbleIndex<'a> {
    scrobbles: &'a [CanonicalScrobble],
    by_time: Vec<usize>, // Positions into `scrobbles`, ordered by timestamp
}

impl<'a> ScrobbleIndex<'a> {
    pub fn new(scrobbles: &'a [CanonicalScrobble]) -> Self {
        let mut by_time: Vec<usize> = (0..scrobbles.len()).collect();
        by_time.sort_by_key(|&i| scrobbles[i].timestamp);
        Self { scrobbles, by_time }
    }

    pub fn len(&self) -> usize {
        self.scrobbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrobbles.is_empty()
    }

    pub fn candidates_for(&self, target: &CanonicalPlaybackEvent, tolerance: Duration) -> Vec<&'a CanonicalScrobble> {
        let start = target.event_start;
        let lower = start.checked_sub_signed(tolerance).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let upper = start.checked_add_signed(tolerance).unwrap_or(DateTime::<Utc>::MAX_UTC);

        // Open interval (lower, upper)
        let lo = self.by_time.partition_point(|&i| self.scrobbles[i].timestamp <= lower);
        let hi = self.by_time.partition_point(|&i| self.scrobbles[i].timestamp < upper);
        if lo >= hi {
            return Vec::new();
        }

        let mut hits: Vec<usize> = self.by_time[lo..hi].to_vec();
        hits.sort_unstable();
        hits.into_iter().map(|i| &self.scrobbles[i]).collect()
    }
}
