//! Matching of playback events against scrobbles.
//!
//! For every eligible playback event, in chronological order, the scrobbles
//! within the time window are ranked by title distance. Events with at least
//! one candidate go to `matched`, the rest to `unmatched`.
//!
//! The run is a pure batch computation. Events are processed in parallel,
//! but each iteration only reads the shared scrobbles and ranks into its own
//! copies, and results are collected in event order.

use chrono::Duration;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::{CanonicalPlaybackEvent, CanonicalScrobble, MatchResult, Matches, PlaybackEvent, Scrobble};
use crate::normalize::{normalize_playback_with, normalize_scrobbles, SCROBBLE_MIN_PLAYED_MS};
use crate::progress::ProgressSink;
use crate::scoring::rank;
use crate::window::{default_tolerance, ScrobbleIndex};

/// Report progress every this many playback events
pub const PROGRESS_INTERVAL: u64 = 500;

/// Tunables for a matching run. Defaults are the production constants.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub min_played_ms: i64,
    pub tolerance: Duration,
    pub progress_interval: u64, // 0 disables progress reports
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_played_ms: SCROBBLE_MIN_PLAYED_MS,
            tolerance: default_tolerance(),
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

/// Match raw histories with the default configuration and no progress output.
pub fn match_histories(events: &[PlaybackEvent], scrobbles: &[Scrobble]) -> Matches {
    match_histories_with(events, scrobbles, &MatchConfig::default(), &())
}

/// Normalize both histories and match them.
pub fn match_histories_with<P: ProgressSink>(
    events: &[PlaybackEvent],
    scrobbles: &[Scrobble],
    config: &MatchConfig,
    progress: &P,
) -> Matches {
    let playback = normalize_playback_with(events, config.min_played_ms);
    let scrobbles = normalize_scrobbles(scrobbles);
    match_canonical(&playback, &scrobbles, config, progress)
}

/// Match already canonical records. `playback` is processed in the order
/// given, which the normalizer makes chronological.
pub fn match_canonical<P: ProgressSink>(
    playback: &[CanonicalPlaybackEvent],
    scrobbles: &[CanonicalScrobble],
    config: &MatchConfig,
    progress: &P,
) -> Matches {
    let index = ScrobbleIndex::new(scrobbles);
    let total = playback.len() as u64;
    let processed = AtomicU64::new(0);

    let results: Vec<MatchResult> = playback
        .par_iter()
        .map(|event| {
            let candidates = rank(event, index.candidates_for(event, config.tolerance));

            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if config.progress_interval > 0 && (done % config.progress_interval == 0 || done == total) {
                progress.report(done, total);
            }

            MatchResult {
                playback_event: event.clone(),
                candidates,
            }
        })
        .collect();

    let (matched, unmatched): (Vec<MatchResult>, Vec<MatchResult>) = results.into_iter().partition(MatchResult::is_matched);
    Matches { matched, unmatched }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Mutex;

    /// 2024-01-01T00:00:00Z plus an offset
    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_704_067_200_000 + ms).unwrap()
    }

    fn playback(name: &str, stop_ms: i64, played_ms: i64) -> PlaybackEvent {
        PlaybackEvent {
            stopped_at: at_ms(stop_ms),
            played_ms,
            track_name: Some(name.to_string()),
            album_name: Some("X".to_string()),
            artist_name: Some("Y".to_string()),
            track_uri: None,
        }
    }

    fn scrobble(name: &str, ts_ms: i64) -> Scrobble {
        Scrobble {
            timestamp: Some(at_ms(ts_ms)),
            name: name.to_string(),
            album: "X".to_string(),
            artist: "Y".to_string(),
            mbid: String::new(),
            url: format!("https://www.last.fm/music/Y/_/{}", name),
        }
    }

    /// "Aurora", stop 00:05:00Z, 180 s played, so it starts at 00:02:00Z
    fn aurora() -> PlaybackEvent {
        playback("Aurora", 300_000, 180_000)
    }

    #[test]
    fn test_exact_match_collapses_to_single_candidate() {
        let scrobbles = vec![scrobble("aurora", 125_000), scrobble("Aurore", 130_000)];
        let matches = match_histories(&[aurora()], &scrobbles);

        assert!(matches.unmatched.is_empty());
        assert_eq!(matches.matched.len(), 1);
        let result = &matches.matched[0];
        assert_eq!(result.playback_event.event_start, at_ms(120_000));
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].name, "aurora");
        assert_eq!(result.candidates[0].distance, Some(0));
    }

    #[test]
    fn test_nothing_in_window_is_unmatched() {
        let scrobbles = vec![scrobble("Aurora", 135_000), scrobble("Aurora", 60_000)];
        let matches = match_histories(&[aurora()], &scrobbles);

        assert!(matches.matched.is_empty());
        assert_eq!(matches.unmatched.len(), 1);
        assert!(matches.unmatched[0].candidates.is_empty());
    }

    #[test]
    fn test_fuzzy_candidates_ordered_by_distance() {
        let scrobbles = vec![scrobble("Aur", 125_000), scrobble("Auora", 123_000)];
        let matches = match_histories(&[aurora()], &scrobbles);

        let distances: Vec<Option<usize>> = matches.matched[0].candidates.iter().map(|c| c.distance).collect();
        assert_eq!(distances, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_window_boundary() {
        let inside = match_histories(&[aurora()], &[scrobble("Aurora", 134_999)]);
        assert_eq!(inside.matched.len(), 1);

        let edge = match_histories(&[aurora()], &[scrobble("Aurora", 135_000)]);
        assert_eq!(edge.unmatched.len(), 1);
    }

    #[test]
    fn test_short_plays_never_appear() {
        let events = vec![playback("Short", 300_000, 29_999), playback("Long", 300_000, 30_000)];
        let matches = match_histories(&events, &[]);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches.unmatched[0].playback_event.name, "Long");
    }

    #[test]
    fn test_partition_is_complete() {
        let mut events = Vec::new();
        let mut scrobbles = Vec::new();
        for i in 0..50 {
            let stop = i * 600_000 + 240_000;
            events.push(playback(&format!("Song {}", i), stop, 200_000));
            if i % 3 != 0 {
                scrobbles.push(scrobble(&format!("song {}", i), stop - 200_000 + 2_000));
            }
        }
        events.push(playback("Skipped", 10_000_000, 1_000));
        let mut incomplete = playback("Episode", 20_000_000, 600_000);
        incomplete.artist_name = None;
        events.push(incomplete);

        let matches = match_histories(&events, &scrobbles);
        let eligible = normalize_playback_with(&events, SCROBBLE_MIN_PLAYED_MS).len();

        assert_eq!(eligible, 50);
        assert_eq!(matches.matched.len() + matches.unmatched.len(), eligible);
        assert_eq!(matches.matched.len(), 33);
        assert!(matches.matched.iter().all(|r| r.is_matched()));
        assert!(matches.unmatched.iter().all(|r| r.candidates.is_empty()));
    }

    #[test]
    fn test_partitions_keep_chronological_order() {
        let events = vec![
            playback("Third", 900_000, 60_000),
            playback("First", 100_000, 60_000),
            playback("Second", 500_000, 60_000),
        ];
        let scrobbles = vec![scrobble("First", 40_000), scrobble("Third", 840_000)];
        let matches = match_histories(&events, &scrobbles);

        let matched: Vec<&str> = matches.matched.iter().map(|r| r.playback_event.name.as_str()).collect();
        assert_eq!(matched, vec!["First", "Third"]);
        assert_eq!(matches.unmatched[0].playback_event.name, "Second");
    }

    #[test]
    fn test_idempotent() {
        let events = vec![aurora(), playback("Other", 900_000, 120_000)];
        let scrobbles = vec![
            scrobble("Auora", 123_000),
            scrobble("Aur", 125_000),
            scrobble("other", 781_000),
        ];
        assert_eq!(match_histories(&events, &scrobbles), match_histories(&events, &scrobbles));
    }

    #[test]
    fn test_shared_scrobble_can_match_several_events() {
        // Two events starting close together both see the same scrobble
        let events = vec![playback("Aurora", 300_000, 180_000), playback("Aurora", 305_000, 180_000)];
        let matches = match_histories(&events, &[scrobble("Aurora", 122_000)]);
        assert_eq!(matches.matched.len(), 2);
    }

    #[test]
    fn test_now_playing_scrobble_ignored() {
        let mut placeholder = scrobble("Aurora", 120_000);
        placeholder.timestamp = None;
        let matches = match_histories(&[aurora()], &[placeholder]);
        assert_eq!(matches.unmatched.len(), 1);
    }

    #[test]
    fn test_custom_config() {
        let config = MatchConfig {
            min_played_ms: 1_000,
            tolerance: Duration::seconds(60),
            progress_interval: 0,
        };
        let events = vec![playback("Aurora", 300_000, 5_000)]; // starts 295 s
        let matches = match_histories_with(&events, &[scrobble("Aurora", 340_000)], &config, &());
        assert_eq!(matches.matched.len(), 1);
    }

    struct Recorder(Mutex<Vec<(u64, u64)>>);

    impl ProgressSink for Recorder {
        fn report(&self, processed: u64, total: u64) {
            self.0.lock().unwrap().push((processed, total));
        }
    }

    #[test]
    fn test_progress_reported_at_interval_and_end() {
        let events: Vec<PlaybackEvent> = (0..25).map(|i| playback("Song", i * 600_000 + 100_000, 60_000)).collect();
        let config = MatchConfig {
            progress_interval: 10,
            ..MatchConfig::default()
        };
        let recorder = Recorder(Mutex::new(Vec::new()));

        let with_progress = match_histories_with(&events, &[], &config, &recorder);

        let mut reports = recorder.0.into_inner().unwrap();
        reports.sort();
        assert_eq!(reports, vec![(10, 25), (20, 25), (25, 25)]);
        assert_eq!(with_progress, match_histories(&events, &[]));
    }
}
