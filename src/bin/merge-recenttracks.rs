//! Concatenate several recent-tracks history files into one.
//!
//! Usage: merge-recenttracks <recenttracks.json>... [--output merged.json]
//!
//! Without --output the merged array is written to stdout.

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};

use scrobble_reconcile::feed::load_recent_tracks_from_files;
use scrobble_reconcile::report::write_json;
use scrobble_reconcile::safety::validate_output_path;

#[derive(Parser)]
#[command(name = "merge-recenttracks")]
#[command(about = "Merge recent tracks history files into a single JSON array")]
struct Args {
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(ref output) = args.output {
        let sources: Vec<&Path> = args.files.iter().map(PathBuf::as_path).collect();
        validate_output_path(output, "json", &sources)?;
    }

    let tracks = load_recent_tracks_from_files(&args.files)?;

    match args.output {
        Some(output) => {
            write_json(&output, &tracks)?;
            eprintln!("Wrote {} tracks to {:?}", tracks.len(), output);
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer(&mut lock, &tracks)?;
            lock.flush()?;
        }
    }

    Ok(())
}
