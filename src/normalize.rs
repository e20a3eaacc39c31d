//! Eligibility filtering and canonicalization of raw history records.
//!
//! Ineligible records are dropped silently; this is filtering, not
//! validation. Decoding errors never reach this module.

use chrono::Duration;

use crate::models::{CanonicalPlaybackEvent, CanonicalScrobble, PlaybackEvent, Scrobble};

/// Plays shorter than this are not counted as a listen.
pub const SCROBBLE_MIN_PLAYED_MS: i64 = 30_000;

/// Why a playback event was left out of matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackRejection {
    /// Title, album or artist missing (podcast episodes, local files)
    Incomplete,
    /// Played for less than the minimum duration
    TooShort,
}

/// Returns the reason an event is ineligible, or None when it can be matched.
pub fn playback_rejection(event: &PlaybackEvent, min_played_ms: i64) -> Option<PlaybackRejection> {
    if event.track_name.is_none() || event.album_name.is_none() || event.artist_name.is_none() {
        Some(PlaybackRejection::Incomplete)
    } else if event.played_ms < min_played_ms {
        Some(PlaybackRejection::TooShort)
    } else {
        None
    }
}

/// Canonicalize a single playback event.
///
/// The event start is approximated as stop time minus played duration, since
/// the export reports completion while scrobblers report near the start.
pub fn to_canonical_playback(event: &PlaybackEvent, min_played_ms: i64) -> Option<CanonicalPlaybackEvent> {
    if playback_rejection(event, min_played_ms).is_some() {
        return None;
    }

    let event_start = event
        .stopped_at
        .checked_sub_signed(Duration::milliseconds(event.played_ms))?;

    Some(CanonicalPlaybackEvent {
        album: event.album_name.clone()?,
        artist: event.artist_name.clone()?,
        name: event.track_name.clone()?,
        played_ms: event.played_ms,
        external_track_id: event.track_uri.clone(),
        event_start,
    })
}

/// Canonicalize and chronologically sort playback events using the default
/// minimum play duration.
pub fn normalize_playback(events: &[PlaybackEvent]) -> Vec<CanonicalPlaybackEvent> {
    normalize_playback_with(events, SCROBBLE_MIN_PLAYED_MS)
}

/// Canonicalize and sort playback events by event start.
/// Events with equal start keep their input order.
pub fn normalize_playback_with(events: &[PlaybackEvent], min_played_ms: i64) -> Vec<CanonicalPlaybackEvent> {
    let mut canonical: Vec<CanonicalPlaybackEvent> = events
        .iter()
        .filter_map(|e| to_canonical_playback(e, min_played_ms))
        .collect();
    canonical.sort_by_key(|e| e.event_start);
    canonical
}

/// Canonicalize a single scrobble. "Now playing" placeholders have no
/// completed-play timestamp and yield None.
pub fn to_canonical_scrobble(scrobble: &Scrobble) -> Option<CanonicalScrobble> {
    Some(CanonicalScrobble {
        album: scrobble.album.clone(),
        artist: scrobble.artist.clone(),
        distance: None,
        external_id: scrobble.mbid.clone(),
        name: scrobble.name.clone(),
        timestamp: scrobble.timestamp?,
        url: scrobble.url.clone(),
    })
}

/// Canonicalize scrobbles, keeping input order.
pub fn normalize_scrobbles(scrobbles: &[Scrobble]) -> Vec<CanonicalScrobble> {
    scrobbles.iter().filter_map(to_canonical_scrobble).collect()
}
