//! Core data models for scrobble reconciliation.
//!
//! This module contains the raw input records handed over by the input feed,
//! the canonical records the matcher works on, and the match results and
//! statistics emitted at the end of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::{playback_rejection, PlaybackRejection};

// ============================================================================
// Raw Input Models
// ============================================================================

/// One completed listen from the streaming history export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackEvent {
    pub stopped_at: DateTime<Utc>, // When playback ended
    pub played_ms: i64,
    pub track_name: Option<String>,
    pub album_name: Option<String>,
    pub artist_name: Option<String>,
    pub track_uri: Option<String>, // Opaque streaming-service track id
}

/// One listen as recorded by the scrobbling service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scrobble {
    /// None for "now playing" placeholders
    pub timestamp: Option<DateTime<Utc>>,
    pub name: String,
    pub album: String,
    pub artist: String,
    pub mbid: String,
    pub url: String,
}

// ============================================================================
// Canonical Models
// ============================================================================

/// Playback event that passed eligibility checks, anchored at its start time.
///
/// Field names on the wire follow the matching-file format (`playedMs`,
/// `spotifyTrackUri`, `ts`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPlaybackEvent {
    pub album: String,
    pub artist: String,
    pub name: String,
    #[serde(rename = "playedMs")]
    pub played_ms: i64,
    #[serde(rename = "spotifyTrackUri")]
    pub external_track_id: Option<String>,
    /// Stop time minus played duration
    #[serde(rename = "ts")]
    pub event_start: DateTime<Utc>,
}

/// Scrobble with a completed-play timestamp.
///
/// `distance` is unset until the scrobble is compared against a specific
/// playback event; ranked copies carry it, the shared originals never do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalScrobble {
    pub album: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<usize>,
    #[serde(rename = "mbid")]
    pub external_id: String,
    pub name: String,
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

impl CanonicalScrobble {
    /// Copy of this scrobble carrying the distance to one playback event.
    pub fn with_distance(&self, distance: usize) -> Self {
        Self {
            distance: Some(distance),
            ..self.clone()
        }
    }
}

// ============================================================================
// Match Results
// ============================================================================

/// How a playback event was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Single candidate with identical (case-insensitive) title
    Exact,
    /// One or more candidates, none with an identical title
    Fuzzy,
    /// No scrobble inside the time window
    Unmatched,
}

/// A playback event together with its ranked candidate scrobbles.
///
/// Empty `candidates` means the event is unmatched. Otherwise candidates are
/// ordered by ascending distance, collapsed to one when the best is exact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "endsong")]
    pub playback_event: CanonicalPlaybackEvent,
    #[serde(rename = "tracks")]
    pub candidates: Vec<CanonicalScrobble>,
}

impl MatchResult {
    pub fn is_matched(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Best ranked candidate, if any
    pub fn best(&self) -> Option<&CanonicalScrobble> {
        self.candidates.first()
    }

    pub fn kind(&self) -> MatchKind {
        match self.best().and_then(|c| c.distance) {
            None => MatchKind::Unmatched,
            Some(0) => MatchKind::Exact,
            Some(_) => MatchKind::Fuzzy,
        }
    }
}

/// The two partitions produced by one matching run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Matches {
    pub matched: Vec<MatchResult>,
    pub unmatched: Vec<MatchResult>,
}

impl Matches {
    /// Total number of playback events covered by both partitions
    pub fn len(&self) -> usize {
        self.matched.len() + self.unmatched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty() && self.unmatched.is_empty()
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-run matching statistics.
#[derive(Default, Debug, Clone, Serialize)]
pub struct MatchStats {
    // Playback input
    pub playback_total: usize,
    pub playback_incomplete: usize, // Missing title, album or artist
    pub playback_too_short: usize,
    pub playback_eligible: usize,

    // Scrobble input
    pub scrobbles_total: usize,
    pub scrobbles_without_timestamp: usize,
    pub scrobbles_eligible: usize,

    // Results
    pub matched: usize,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    pub ambiguous_matches: usize, // Fuzzy with more than one candidate
    pub unmatched: usize,

    // Timing
    pub elapsed_seconds: f64,
}

impl MatchStats {
    /// Count input eligibility the same way the normalizer filters.
    pub fn from_inputs(events: &[PlaybackEvent], scrobbles: &[Scrobble], min_played_ms: i64) -> Self {
        let mut stats = Self {
            playback_total: events.len(),
            scrobbles_total: scrobbles.len(),
            ..Self::default()
        };

        for event in events {
            match playback_rejection(event, min_played_ms) {
                Some(PlaybackRejection::Incomplete) => stats.playback_incomplete += 1,
                Some(PlaybackRejection::TooShort) => stats.playback_too_short += 1,
                None => stats.playback_eligible += 1,
            }
        }

        stats.scrobbles_without_timestamp = scrobbles.iter().filter(|s| s.timestamp.is_none()).count();
        stats.scrobbles_eligible = stats.scrobbles_total - stats.scrobbles_without_timestamp;
        stats
    }

    /// Tally both partitions of a finished run
    pub fn record_matches(&mut self, matches: &Matches) {
        for result in matches.matched.iter().chain(&matches.unmatched) {
            match result.kind() {
                MatchKind::Exact => self.exact_matches += 1,
                MatchKind::Fuzzy => {
                    self.fuzzy_matches += 1;
                    if result.candidates.len() > 1 {
                        self.ambiguous_matches += 1;
                    }
                }
                MatchKind::Unmatched => {}
            }
        }
        self.matched = matches.matched.len();
        self.unmatched = matches.unmatched.len();
    }

    /// Calculate match rate as a percentage
    pub fn match_rate(&self) -> f64 {
        let total = self.matched + self.unmatched;
        if total == 0 {
            0.0
        } else {
            100.0 * self.matched as f64 / total as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
