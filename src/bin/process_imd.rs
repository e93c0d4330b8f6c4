//! Reshape the English IMD reference spreadsheet into a compact parquet
//! lookup: LSOA code, decile, quintile.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use hes_spells::reshape_imd;

#[derive(Parser)]
#[command(about = "Reshape the IMD2019 spreadsheet into an LSOA -> quintile parquet lookup")]
struct Args {
    /// IMD spreadsheet (xlsx with an IMD2019 sheet)
    #[arg(long = "in")]
    input: PathBuf,

    /// Output parquet path
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    reshape_imd(&args.input, &args.out)
        .with_context(|| format!("Failed to reshape IMD table from {}", args.input.display()))?;

    Ok(())
}
