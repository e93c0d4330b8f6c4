//! Repair synthetic HES APC episode extracts and collapse them into an
//! IMD-linked spell-level parquet file.
//!
//! Pipeline: load yearly CSVs restricted to the needed column set, repair
//! implausible dates, join the deprivation quintile by LSOA code, collapse
//! episodes sharing (patient, admission, discharge) into spells, drop
//! spells with a non-physical length of stay, write parquet.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use hes_spells::{
    Episode, ImdLookup, Spell, attach_imd, collapse_episodes, load_episode_batches, write_parquet,
};
use log::info;

#[derive(Parser)]
#[command(about = "Repair synthetic HES APC episodes and collapse to spell-level parquet")]
struct Args {
    /// Single CSV file or folder of yearly CSVs
    #[arg(long = "in")]
    input: PathBuf,

    /// IMD parquet lookup (LSOA11 + imd_quintile)
    #[arg(long)]
    imd: PathBuf,

    /// Output parquet path (spell-level)
    #[arg(long)]
    out: PathBuf,

    /// If --in is a folder, include only the last N CSV files
    #[arg(long = "n_years", default_value_t = 3)]
    n_years: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let start = Instant::now();

    let batches = load_episode_batches(&args.input, Some(args.n_years))
        .with_context(|| format!("Failed to load episodes from {}", args.input.display()))?;
    let mut episodes = Episode::from_batches(&batches);

    let lookup = ImdLookup::from_parquet(&args.imd)
        .with_context(|| format!("Failed to load IMD lookup from {}", args.imd.display()))?;
    attach_imd(&mut episodes, &lookup);

    let spells = collapse_episodes(&episodes);

    let batch = Spell::to_record_batch(&spells)?;
    write_parquet(&args.out, Arc::new(Spell::schema()), &[batch])
        .with_context(|| format!("Failed to write spells to {}", args.out.display()))?;

    info!(
        "Wrote {} spells to {} in {:?}",
        spells.len(),
        args.out.display(),
        start.elapsed()
    );
    Ok(())
}
