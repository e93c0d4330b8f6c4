//! A Rust library for repairing synthetic HES APC episode extracts and
//! collapsing them into IMD-linked hospital spells.
//!
//! Two pipelines are provided, each exposed as a binary:
//!
//! - `process_imd` reshapes the English Index of Multiple Deprivation
//!   spreadsheet into a compact LSOA -> decile/quintile parquet lookup.
//! - `repair_hes` loads yearly episode-level CSV extracts, repairs
//!   implausible dates, joins the deprivation quintile by LSOA code,
//!   collapses episodes into spells and writes a spell-level parquet file.

pub mod algorithm;
pub mod error;
pub mod imd;
pub mod loader;
pub mod models;
pub mod utils;

// Re-export the most common types for easier use
pub use error::{EtlError, Result};
pub use imd::ImdLookup;
pub use loader::load_episode_batches;
pub use models::{Episode, Spell};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Core operations
pub use algorithm::collapse::collapse_episodes;
pub use imd::{attach_imd, reshape_imd};
pub use utils::io::parquet::{read_parquet, write_parquet};
