//! Matching files: the persisted form of the MATCHED and UNMATCHED partitions.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::feed::read_json;
use crate::models::MatchResult;

/// Serialize any value as compact JSON into `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

pub fn write_matchings(path: &Path, matchings: &[MatchResult]) -> Result<()> {
    write_json(path, matchings)
}

pub fn load_matchings_from_file(path: &Path) -> Result<Vec<MatchResult>> {
    let matchings: Vec<MatchResult> = read_json(path)?;
    eprintln!("Successfully loaded {} matchings", matchings.len());
    Ok(matchings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CanonicalPlaybackEvent, CanonicalScrobble};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_matchings_reload() {
        let result = MatchResult {
            playback_event: CanonicalPlaybackEvent {
                album: "X".to_string(),
                artist: "Y".to_string(),
                name: "Aurora".to_string(),
                played_ms: 180_000,
                external_track_id: Some("spotify:track:abc".to_string()),
                event_start: Utc.timestamp_opt(1_704_067_320, 0).unwrap(),
            },
            candidates: vec![CanonicalScrobble {
                album: "X".to_string(),
                artist: "Y".to_string(),
                distance: Some(0),
                external_id: String::new(),
                name: "aurora".to_string(),
                timestamp: Utc.timestamp_opt(1_704_067_325, 0).unwrap(),
                url: "https://www.last.fm/music/Y/_/aurora".to_string(),
            }],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matched.json");
        write_matchings(&path, std::slice::from_ref(&result)).unwrap();

        assert_eq!(load_matchings_from_file(&path).unwrap(), vec![result]);
    }

    #[test]
    fn test_loads_millisecond_timestamps() {
        // Files written by other tools use fractional seconds
        let text = r#"[{
            "endsong": {"album": "X", "artist": "Y", "name": "Aurora", "playedMs": 180000,
                        "spotifyTrackUri": null, "ts": "2024-01-01T00:02:00.000Z"},
            "tracks": []
        }]"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unmatched.json");
        std::fs::write(&path, text).unwrap();

        let loaded = load_matchings_from_file(&path).unwrap();
        assert_eq!(loaded[0].playback_event.event_start.timestamp(), 1_704_067_320);
        assert!(!loaded[0].is_matched());
    }
}
