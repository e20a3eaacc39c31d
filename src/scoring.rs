//! Title similarity ranking of candidate scrobbles.
//!
//! Candidates are scored by Levenshtein distance between lowercased titles.
//! No other normalization is applied: punctuation, diacritics and
//! whitespace compare literally.

use crate::models::{CanonicalPlaybackEvent, CanonicalScrobble};

/// Case-insensitive edit distance between two track titles.
pub fn title_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// Score, sort and collapse candidates for one playback event.
///
/// Returns fresh copies carrying their distance, ordered ascending with ties
/// kept in candidate order. A leading exact match discards everything else.
pub fn rank<'a, I>(target: &CanonicalPlaybackEvent, candidates: I) -> Vec<CanonicalScrobble>
where
    I: IntoIterator<Item = &'a CanonicalScrobble>,
{
    let target_name = target.name.to_lowercase();

    let mut ranked: Vec<CanonicalScrobble> = candidates
        .into_iter()
        .map(|c| c.with_distance(strsim::levenshtein(&target_name, &c.name.to_lowercase())))
        .collect();

    // Stable: equal distances stay in scan order
    ranked.sort_by_key(|c| c.distance);

    collapse_exact_match(&mut ranked);
    ranked
}

/// Keep only the first candidate when it is an exact title match.
pub fn collapse_exact_match(ranked: &mut Vec<CanonicalScrobble>) {
    if ranked.first().and_then(|c| c.distance) == Some(0) {
        ranked.truncate(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_704_067_200 + secs, 0).unwrap()
    }

    fn target(name: &str) -> CanonicalPlaybackEvent {
        CanonicalPlaybackEvent {
            album: "X".to_string(),
            artist: "Y".to_string(),
            name: name.to_string(),
            played_ms: 180_000,
            external_track_id: None,
            event_start: at(120),
        }
    }

    fn scrobble(name: &str, url: &str) -> CanonicalScrobble {
        CanonicalScrobble {
            album: "X".to_string(),
            artist: "Y".to_string(),
            distance: None,
            external_id: String::new(),
            name: name.to_string(),
            timestamp: at(125),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_title_distance_case_insensitive() {
        assert_eq!(title_distance("Song", "song"), 0);
        assert_eq!(title_distance("Aurora", "Auora"), 1);
        assert_eq!(title_distance("Aurora", "Aur"), 3);
    }

    #[test]
    fn test_title_distance_is_literal_otherwise() {
        assert_eq!(title_distance("Déjà Vu", "Deja Vu"), 2);
        assert_eq!(title_distance("Don't", "Dont"), 1);
        assert_eq!(title_distance("A  B", "A B"), 1);
    }

    #[test]
    fn test_rank_orders_by_distance() {
        let candidates = vec![scrobble("Aur", "3"), scrobble("Auora", "1")];
        let ranked = rank(&target("Aurora"), &candidates);
        let distances: Vec<Option<usize>> = ranked.iter().map(|c| c.distance).collect();
        assert_eq!(distances, vec![Some(1), Some(3)]);
        assert_eq!(ranked[0].name, "Auora");
    }

    #[test]
    fn test_ties_keep_scan_order() {
        let candidates = vec![scrobble("Auroxa", "first"), scrobble("Aurorx", "second")];
        let ranked = rank(&target("Aurora"), &candidates);
        assert_eq!(ranked[0].url, "first");
        assert_eq!(ranked[1].url, "second");
    }

    #[test]
    fn test_exact_match_collapse_keeps_first_zero() {
        // Distances [0, 0, 3] in scan order
        let candidates = vec![
            scrobble("aurora", "first"),
            scrobble("AURORA", "second"),
            scrobble("Aur", "third"),
        ];
        let ranked = rank(&target("Aurora"), &candidates);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].url, "first");
        assert_eq!(ranked[0].distance, Some(0));
    }

    #[test]
    fn test_exact_match_after_sort_collapses() {
        let candidates = vec![scrobble("Aurore", "fuzzy"), scrobble("aurora", "exact")];
        let ranked = rank(&target("Aurora"), &candidates);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].url, "exact");
    }

    #[test]
    fn test_rank_does_not_touch_shared_candidates() {
        let candidates = vec![scrobble("aurora", "a")];
        let _ = rank(&target("Aurora"), &candidates);
        assert_eq!(candidates[0].distance, None);
    }

    #[test]
    fn test_rank_empty() {
        let candidates: Vec<CanonicalScrobble> = Vec::new();
        assert!(rank(&target("Aurora"), &candidates).is_empty());
    }
}
