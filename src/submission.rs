//! Planning of scrobble submissions for unmatched playback events.
//!
//! Entries are grouped into batches no larger than the submission endpoint
//! accepts and rendered into its indexed form parameters. Sending and
//! request signing happen elsewhere.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CanonicalPlaybackEvent, MatchResult};

/// Maximum scrobbles accepted in one submission call
pub const MAX_BATCH_SIZE: usize = 50;

/// One scrobble to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrobbleSubmission {
    pub artist: String,
    pub track: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>, // Seconds
}

impl From<&CanonicalPlaybackEvent> for ScrobbleSubmission {
    fn from(e: &CanonicalPlaybackEvent) -> Self {
        ScrobbleSubmission {
            artist: e.artist.clone(),
            track: e.name.clone(),
            timestamp: e.event_start,
            album: Some(e.album.clone()),
            duration: Some((e.played_ms + 500) / 1000),
        }
    }
}

impl ScrobbleSubmission {
    /// Form fields for this entry at position `index` in its batch
    fn params(&self, index: usize) -> Vec<(String, String)> {
        let mut params = vec![
            (format!("artist[{}]", index), self.artist.clone()),
            (format!("track[{}]", index), self.track.clone()),
            (format!("timestamp[{}]", index), self.timestamp.timestamp().to_string()),
        ];
        if let Some(album) = &self.album {
            params.push((format!("album[{}]", index), album.clone()));
        }
        if let Some(duration) = self.duration {
            params.push((format!("duration[{}]", index), duration.to_string()));
        }
        params
    }
}

/// Up to [`MAX_BATCH_SIZE`] submissions sent in one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubmissionBatch {
    entries: Vec<ScrobbleSubmission>,
}

impl SubmissionBatch {
    pub fn new(entries: Vec<ScrobbleSubmission>) -> Result<Self> {
        if entries.len() > MAX_BATCH_SIZE {
            bail!(
                "Cannot submit {} scrobbles in one batch (max {})",
                entries.len(),
                MAX_BATCH_SIZE
            );
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ScrobbleSubmission] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed form parameters for all entries, sorted by key then value.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .entries
            .iter()
            .enumerate()
            .flat_map(|(i, entry)| entry.params(i))
            .collect();
        params.sort();
        params
    }
}

/// Turn unmatched results into submission batches of at most `batch_size`.
/// Results that have candidates are skipped.
pub fn plan_batches(results: &[MatchResult], batch_size: usize) -> Result<Vec<SubmissionBatch>> {
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        bail!("Batch size must be between 1 and {}, got {}", MAX_BATCH_SIZE, batch_size);
    }

    let entries: Vec<ScrobbleSubmission> = results
        .iter()
        .filter(|r| !r.is_matched())
        .map(|r| ScrobbleSubmission::from(&r.playback_event))
        .collect();

    entries
        .chunks(batch_size)
        .map(|chunk| SubmissionBatch::new(chunk.to_vec()))
        .collect()
}
