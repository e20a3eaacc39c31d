//! Scrobble reconciliation library - shared modules for all binaries.
//!
//! Pairs streaming-history playback events with scrobbles recorded for the
//! same listens, so that plays missing from the scrobble history can be
//! submitted afterwards.

pub mod feed;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod report;
pub mod safety;
pub mod scoring;
pub mod submission;
pub mod window;

pub use matcher::{match_histories, match_histories_with, MatchConfig};
pub use models::{MatchResult, Matches, PlaybackEvent, Scrobble};
