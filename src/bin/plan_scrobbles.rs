//! Plan scrobble submissions for unmatched playback events.
//!
//! Usage: plan-scrobbles --unmatched unmatched.json [--output scrobble-batches.json]

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use scrobble_reconcile::report::{load_matchings_from_file, write_json};
use scrobble_reconcile::safety::validate_output_path;
use scrobble_reconcile::submission::{plan_batches, MAX_BATCH_SIZE};

#[derive(Parser)]
#[command(name = "plan-scrobbles")]
#[command(about = "Group unmatched playback events into scrobble submission batches")]
struct Args {
    /// Unmatched file written by scrobble-match
    #[arg(long)]
    unmatched: PathBuf,

    #[arg(long, default_value = "scrobble-batches.json")]
    output: PathBuf,

    #[arg(long, default_value_t = MAX_BATCH_SIZE)]
    batch_size: usize,

    /// Print the form parameters of the first batch
    #[arg(long)]
    preview: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    validate_output_path(&args.output, "json", &[args.unmatched.as_path()])?;

    let unmatched = load_matchings_from_file(&args.unmatched)?;
    let batches = plan_batches(&unmatched, args.batch_size)?;
    let total: usize = batches.iter().map(|b| b.len()).sum();

    write_json(&args.output, &batches)?;
    println!("Planned {} scrobbles in {} batches -> {:?}", total, batches.len(), args.output);

    if args.preview {
        if let Some(first) = batches.first() {
            for (key, value) in first.to_params() {
                println!("{}={}", key, value);
            }
        }
    }

    Ok(())
}
