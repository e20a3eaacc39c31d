use anyhow::{Context, Result};
use chrono::Duration;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;

use scrobble_reconcile::feed::{load_endsongs_from_files, load_recent_tracks_from_file};
use scrobble_reconcile::matcher::{match_canonical, MatchConfig, PROGRESS_INTERVAL};
use scrobble_reconcile::models::{MatchStats, PlaybackEvent, Scrobble};
use scrobble_reconcile::normalize::{normalize_playback_with, normalize_scrobbles, SCROBBLE_MIN_PLAYED_MS};
use scrobble_reconcile::progress::{create_spinner, format_duration, set_log_only, PhaseProgress};
use scrobble_reconcile::report::write_matchings;
use scrobble_reconcile::safety::validate_output_path;
use scrobble_reconcile::window::MERGEABLE_TIME_DIFF_SECS;

#[derive(Parser)]
#[command(name = "scrobble-match")]
#[command(about = "Match streaming history endsongs against scrobbled recent tracks")]
struct Args {
    /// Endsong JSON files from the streaming history export
    #[arg(required = true)]
    endsongs: Vec<PathBuf>,

    /// Recent tracks JSON file (see merge-recenttracks)
    #[arg(long)]
    recenttracks: PathBuf,

    #[arg(long, default_value = "matched.json")]
    matched: PathBuf,

    #[arg(long, default_value = "unmatched.json")]
    unmatched: PathBuf,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Plays shorter than this are ignored
    #[arg(long, default_value_t = SCROBBLE_MIN_PLAYED_MS)]
    min_played_ms: i64,

    /// Maximum distance between play start and scrobble, exclusive
    #[arg(long, default_value_t = MERGEABLE_TIME_DIFF_SECS)]
    window_secs: i64,

    /// Write matching statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Hide progress bars and print periodic progress lines instead
    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let mut sources: Vec<&Path> = args.endsongs.iter().map(PathBuf::as_path).collect();
    sources.push(&args.recenttracks);
    validate_output_path(&args.matched, "json", &sources)?;
    validate_output_path(&args.unmatched, "json", &sources)?;
    if let Some(ref stats_path) = args.stats {
        validate_output_path(stats_path, "json", &sources)?;
    }

    let config = MatchConfig {
        min_played_ms: args.min_played_ms,
        tolerance: Duration::seconds(args.window_secs),
        progress_interval: PROGRESS_INTERVAL,
    };

    let start = Instant::now();

    let endsongs = load_endsongs_from_files(&args.endsongs)?;
    let tracks = load_recent_tracks_from_file(&args.recenttracks)?;

    let events: Vec<PlaybackEvent> = endsongs.iter().map(PlaybackEvent::from).collect();
    let scrobbles: Vec<Scrobble> = tracks.iter().map(Scrobble::from).collect();
    drop(endsongs);
    drop(tracks);

    let mut stats = MatchStats::from_inputs(&events, &scrobbles, config.min_played_ms);

    let playback = normalize_playback_with(&events, config.min_played_ms);
    let canonical_scrobbles = normalize_scrobbles(&scrobbles);
    eprintln!(
        "Matching {} songs and {} tracks",
        playback.len(),
        canonical_scrobbles.len()
    );

    let progress = PhaseProgress::new("match", playback.len() as u64, "Matching playback events");
    let matches = match_canonical(&playback, &canonical_scrobbles, &config, &progress);
    progress.bar.finish_with_message(format!(
        "Matched {} / {} playback events",
        matches.matched.len(),
        matches.len()
    ));

    let spinner = create_spinner("Writing results");
    write_matchings(&args.matched, &matches.matched)?;
    write_matchings(&args.unmatched, &matches.unmatched)?;
    spinner.finish_with_message("Results written");

    stats.record_matches(&matches);
    stats.elapsed_seconds = start.elapsed().as_secs_f64();
    stats.log_phase("final");
    if let Some(ref stats_path) = args.stats {
        stats.write_to_file(stats_path)?;
    }

    println!("\n{:=<60}", "");
    println!("Matching complete!");
    println!("  Matched:   {} ({} exact, {} fuzzy)", stats.matched, stats.exact_matches, stats.fuzzy_matches);
    println!("  Unmatched: {}", stats.unmatched);
    println!("  Match rate: {:.1}%", stats.match_rate());
    println!("  Output: {:?}, {:?}", args.matched, args.unmatched);
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
