//! Episode CSV loading utilities
//!
//! Materializes one combined episode table from either a single CSV file or
//! a directory of yearly extracts. Files are projected down to the needed
//! column set at read time; every needed column is read as raw text so that
//! malformed values reach the repair step instead of failing the parser.

use std::fs::{self, File};
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use rayon::prelude::*;

use crate::error::{EtlError, Result};
use crate::models::NEEDED_COLUMNS;
use crate::utils::validate_directory;

/// Rows sampled per file when inferring the CSV schema. Only non-needed
/// columns keep their inferred types, so a small sample is enough.
const INFER_MAX_RECORDS: usize = 100;

/// List the yearly CSV files under a directory, lexicographically sorted.
///
/// Filenames are assumed to sort in chronological order (`2019.csv`,
/// `2020.csv`, ...), so a configured `n_years` keeps only the last N.
/// An empty result is fatal before any parsing happens.
fn list_year_csvs(dir: &Path, n_years: Option<usize>) -> Result<Vec<PathBuf>> {
    validate_directory(dir)?;

    let mut files = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect_vec();
    files.sort();

    if let Some(n) = n_years {
        if files.len() > n {
            files = files.split_off(files.len() - n);
        }
    }

    if files.is_empty() {
        return Err(EtlError::NoInputFiles {
            path: dir.to_path_buf(),
        });
    }
    Ok(files)
}

/// Read one episode CSV, restricted to the needed column set.
///
/// Needed columns absent from the file are skipped with a warning;
/// unrecognized columns are silently dropped by the projection. A file
/// containing none of the needed columns contributes zero rows.
fn read_episode_csv(path: &Path) -> Result<Vec<RecordBatch>> {
    let mut file = File::open(path)?;
    let format = Format::default().with_header(true);
    let (file_schema, _) = format.infer_schema(&mut file, Some(INFER_MAX_RECORDS))?;
    file.rewind()?;

    for name in NEEDED_COLUMNS {
        if file_schema.index_of(name).is_err() {
            log::warn!("Column {name} not found in {}, skipping", path.display());
        }
    }

    // Force needed columns to Utf8; repair happens in Rust, not the parser.
    let mut projection = Vec::new();
    let fields = file_schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            if NEEDED_COLUMNS.contains(&field.name().as_str()) {
                projection.push(idx);
                Field::new(field.name(), DataType::Utf8, true)
            } else {
                field.as_ref().clone()
            }
        })
        .collect_vec();

    if projection.is_empty() {
        log::warn!(
            "No needed columns found in {}, contributing no rows",
            path.display()
        );
        return Ok(Vec::new());
    }

    let reader = ReaderBuilder::new(Arc::new(Schema::new(fields)))
        .with_header(true)
        .with_projection(projection)
        .build(file)?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(batches)
}

/// Load the combined episode table from a single CSV file or a directory
/// of yearly CSVs.
///
/// `n_years` applies only in directory mode and selects the
/// lexicographically-last N files. Fatal conditions: no CSV files under a
/// directory, or a combined table with zero rows after column restriction.
pub fn load_episode_batches(input: &Path, n_years: Option<usize>) -> Result<Vec<RecordBatch>> {
    let start = Instant::now();

    let batches = if input.is_dir() {
        let files = list_year_csvs(input, n_years)?;
        log::info!("Reading {} file(s) from {}", files.len(), input.display());
        for file in &files {
            log::info!("  - {}", file.display());
        }

        let per_file: Vec<Result<Vec<RecordBatch>>> =
            files.par_iter().map(|path| read_episode_csv(path)).collect();

        let mut combined = Vec::new();
        for result in per_file {
            combined.extend(result?);
        }
        combined
    } else {
        log::info!("Reading file: {}", input.display());
        read_episode_csv(input)?
    };

    let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    if rows == 0 {
        return Err(EtlError::EmptyInput(input.display().to_string()));
    }

    log::info!("Loaded {rows} episode rows in {:?}", start.elapsed());
    Ok(batches)
}
