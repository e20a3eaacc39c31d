//! Decoding of streaming-history exports and scrobble history files.
//!
//! Both formats are JSON arrays. The scrobble format carries the usual API
//! coercions (numeric strings, "1"/"0" booleans), which are resolved here so
//! the matcher only sees typed records.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::models::{PlaybackEvent, Scrobble};

// ============================================================================
// Streaming History (endsong)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonStart {
    #[serde(rename = "")]
    Empty,
    #[serde(rename = "appload")]
    AppLoad,
    #[serde(rename = "backbtn")]
    BackButton,
    #[serde(rename = "clickrow")]
    ClickRow,
    #[serde(rename = "fwdbtn")]
    ForwardButton,
    #[serde(rename = "playbtn")]
    PlayButton,
    #[serde(rename = "remote")]
    Remote,
    #[serde(rename = "trackdone")]
    TrackDone,
    #[serde(rename = "trackerror")]
    TrackError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonEnd {
    #[serde(rename = "")]
    Empty,
    #[serde(rename = "backbtn")]
    BackButton,
    #[serde(rename = "endplay")]
    EndPlay,
    #[serde(rename = "fwdbtn")]
    ForwardButton,
    #[serde(rename = "logout")]
    Logout,
    #[serde(rename = "remote")]
    Remote,
    #[serde(rename = "trackdone")]
    TrackDone,
    #[serde(rename = "trackerror")]
    TrackError,
    #[serde(rename = "unexpected-exit-while-paused")]
    UnexpectedExitWhilePaused,
    #[serde(rename = "unexpected-exit")]
    UnexpectedExit,
    #[serde(rename = "unknown")]
    Unknown,
}

/// One record of the extended streaming history export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endsong {
    pub ts: DateTime<Utc>, // Playback stop time
    pub username: String,
    pub platform: String,
    pub ms_played: i64,
    pub conn_country: String,
    pub ip_addr_decrypted: String,
    pub user_agent_decrypted: Option<String>,
    pub master_metadata_track_name: Option<String>,
    pub master_metadata_album_artist_name: Option<String>,
    pub master_metadata_album_album_name: Option<String>,
    pub spotify_track_uri: Option<String>,
    pub episode_name: Option<String>,
    pub episode_show_name: Option<String>,
    pub spotify_episode_uri: Option<String>,
    pub reason_start: ReasonStart,
    pub reason_end: ReasonEnd,
    pub shuffle: bool,
    pub skipped: Option<bool>,
    pub offline: bool,
    #[serde(default, deserialize_with = "de_offline_timestamp")]
    pub offline_timestamp: Option<DateTime<Utc>>,
    pub incognito_mode: bool,
}

impl From<&Endsong> for PlaybackEvent {
    fn from(e: &Endsong) -> Self {
        PlaybackEvent {
            stopped_at: e.ts,
            played_ms: e.ms_played,
            track_name: e.master_metadata_track_name.clone(),
            album_name: e.master_metadata_album_album_name.clone(),
            artist_name: e.master_metadata_album_artist_name.clone(),
            track_uri: e.spotify_track_uri.clone(),
        }
    }
}

/// Epoch milliseconds or a date string.
fn de_offline_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Millis(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", ms))),
        Some(Raw::Text(s)) => parse_date(&s).map(Some).map_err(de::Error::custom),
    }
}

// ============================================================================
// Scrobble History (recent tracks)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Small,
    Medium,
    Large,
    Extralarge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub size: ImageSize,
    #[serde(rename = "#text")]
    pub url: String,
}

/// Artist or album reference: MusicBrainz id plus display text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedRef {
    pub mbid: String,
    #[serde(rename = "#text")]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackAttr {
    #[serde(deserialize_with = "de_loose_bool")]
    pub nowplaying: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackDate {
    #[serde(deserialize_with = "de_uts", serialize_with = "ser_uts")]
    pub uts: DateTime<Utc>,
    #[serde(rename = "#text")]
    pub text: String,
}

/// One entry of a recent-tracks history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentTrack {
    pub artist: NamedRef,
    #[serde(deserialize_with = "de_loose_bool")]
    pub streamable: bool,
    pub image: Vec<Image>,
    pub mbid: String,
    pub album: NamedRef,
    pub name: String,
    #[serde(rename = "@attr", default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<TrackAttr>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<TrackDate>,
}

impl RecentTrack {
    pub fn is_now_playing(&self) -> bool {
        self.attr.as_ref().is_some_and(|a| a.nowplaying)
    }
}

impl From<&RecentTrack> for Scrobble {
    fn from(t: &RecentTrack) -> Self {
        let timestamp = if t.is_now_playing() {
            None
        } else {
            t.date.as_ref().map(|d| d.uts)
        };
        Scrobble {
            timestamp,
            name: t.name.clone(),
            album: t.album.text.clone(),
            artist: t.artist.text.clone(),
            mbid: t.mbid.clone(),
            url: t.url.clone(),
        }
    }
}

/// Accepts `true`/`false` or the API's "1"/"0"/"true"/"false" strings.
fn de_loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Number(n) => Ok(n != 0),
        Raw::Text(s) => match s.trim() {
            "1" | "true" => Ok(true),
            "0" | "false" | "" => Ok(false),
            other => Err(de::Error::custom(format!("invalid boolean: {:?}", other))),
        },
    }
}

/// Accepts a date string, or Unix seconds as number or numeric string.
fn de_uts<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        Text(String),
    }

    let seconds = match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => secs,
        Raw::Text(s) => match parse_date(&s) {
            Ok(date) => return Ok(date),
            Err(_) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| de::Error::custom(format!("invalid uts: {:?}", s)))?,
        },
    };

    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| de::Error::custom(format!("uts out of range: {}", seconds)))
}

/// Written back in the API's own shape: Unix seconds as a string.
fn ser_uts<S>(uts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&uts.timestamp().to_string())
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc))
}

// ============================================================================
// Loading
// ============================================================================

/// Read one JSON document from a file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_endsongs_from_files(paths: &[PathBuf]) -> Result<Vec<Endsong>> {
    let mut endsongs = Vec::new();

    eprintln!("Load {} files...", paths.len());
    for (i, path) in paths.iter().enumerate() {
        eprintln!("Processing file {} / {}", i + 1, paths.len());
        let batch: Vec<Endsong> = read_json(path)?;
        eprintln!("Loaded {} songs", batch.len());
        endsongs.extend(batch);
    }

    eprintln!("Successfully loaded {} songs", endsongs.len());
    Ok(endsongs)
}

pub fn load_recent_tracks_from_files(paths: &[PathBuf]) -> Result<Vec<RecentTrack>> {
    let mut tracks = Vec::new();

    eprintln!("Load {} files...", paths.len());
    for (i, path) in paths.iter().enumerate() {
        eprintln!("Processing file {} / {}", i + 1, paths.len());
        let batch: Vec<RecentTrack> = read_json(path)?;
        eprintln!("Loaded {} tracks", batch.len());
        tracks.extend(batch);
    }

    eprintln!("Successfully loaded {} tracks", tracks.len());
    Ok(tracks)
}

pub fn load_recent_tracks_from_file(path: &Path) -> Result<Vec<RecentTrack>> {
    let tracks: Vec<RecentTrack> = read_json(path)?;
    eprintln!("Successfully loaded {} tracks", tracks.len());
    Ok(tracks)
}
