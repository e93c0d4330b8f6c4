//! Index of Multiple Deprivation (IMD) reshaping and lookup.
//!
//! The published IMD reference table arrives as a spreadsheet with verbose
//! column headings. [`reshape_imd`] normalizes it into a compact three
//! column parquet lookup (LSOA code, decile, quintile); [`ImdLookup`] loads
//! that lookup back and [`attach_imd`] left-joins the quintile onto
//! episodes by LSOA code.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int8Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use calamine::{DataType as CellValue, Reader, Xlsx, open_workbook};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rustc_hash::FxHashMap;

use crate::error::{EtlError, Result};
use crate::models::Episode;
use crate::utils::arrow_utils::{value_as_i32, value_as_string};
use crate::utils::io::parquet::write_parquet;

/// Sheet carrying the 2019 deprivation ranks.
const IMD_SHEET: &str = "IMD2019";

/// Derive the quintile (1-5) from the decile (1-10).
///
/// Integer division pairs adjacent deciles: 1,2 -> 1 ... 9,10 -> 5, a
/// strictly monotonic coarsening.
#[must_use]
pub fn quintile_from_decile(decile: i8) -> i8 {
    (decile - 1) / 2 + 1
}

/// Normalize a spreadsheet heading: trim, lowercase, spaces to
/// underscores, then rename the known verbose headings to canonical names.
#[must_use]
pub fn canonical_column_name(raw: &str) -> String {
    let normalized = raw.trim().to_lowercase().replace(' ', "_");
    match normalized.as_str() {
        "lsoa_code_(2011)" => "lsoa11_code".to_string(),
        "index_of_multiple_deprivation_(imd)_decile" => "imd_decile".to_string(),
        _ => normalized,
    }
}

/// Arrow schema of the reshaped lookup file.
#[must_use]
pub fn imd_schema() -> Schema {
    Schema::new(vec![
        Field::new("lsoa11_code", DataType::Utf8, true),
        Field::new("imd_decile", DataType::Int8, true),
        Field::new("imd_quintile", DataType::Int8, true),
    ])
}

fn cell_as_string(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        CellValue::Int(i) => Some(i.to_string()),
        CellValue::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn cell_as_i8(cell: &CellValue) -> Option<i8> {
    match cell {
        CellValue::Int(i) => i8::try_from(*i).ok(),
        CellValue::Float(f) if f.fract() == 0.0 => i8::try_from(*f as i64).ok(),
        CellValue::String(s) => s.trim().parse::<i8>().ok(),
        _ => None,
    }
}

/// Reshape the IMD spreadsheet into the three-column parquet lookup.
///
/// Fails if the `IMD2019` sheet or either required column is missing.
/// No deduplication happens here; duplicates are handled at join time.
pub fn reshape_imd(input: &Path, output: &Path) -> Result<()> {
    let mut workbook: Xlsx<_> = open_workbook(input)?;
    let range = workbook
        .worksheet_range(IMD_SHEET)
        .ok_or_else(|| EtlError::Schema(format!("Worksheet {IMD_SHEET} not found in workbook")))??;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| EtlError::Schema(format!("Worksheet {IMD_SHEET} is empty")))?;
    let names: Vec<String> = header
        .iter()
        .map(|cell| cell.get_string().map(canonical_column_name).unwrap_or_default())
        .collect();

    let require = |name: &str| -> Result<usize> {
        names.iter().position(|n| n == name).ok_or_else(|| {
            EtlError::Schema(format!("IMD spreadsheet is missing the {name} column"))
        })
    };
    let lsoa_idx = require("lsoa11_code")?;
    let decile_idx = require("imd_decile")?;

    let mut lsoa_codes = Vec::new();
    let mut deciles = Vec::new();
    let mut quintiles = Vec::new();
    for row in rows {
        let lsoa = row.get(lsoa_idx).and_then(cell_as_string);
        let decile = row.get(decile_idx).and_then(cell_as_i8);
        lsoa_codes.push(lsoa);
        deciles.push(decile);
        quintiles.push(decile.map(quintile_from_decile));
    }

    let schema = Arc::new(imd_schema());
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(lsoa_codes)),
        Arc::new(Int8Array::from(deciles)),
        Arc::new(Int8Array::from(quintiles)),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    let rows = batch.num_rows();

    write_parquet(output, schema, &[batch])?;
    log::info!("Wrote {rows} LSOA rows to {}", output.display());
    Ok(())
}

/// Deprivation lookup: LSOA code to quintile, deduplicated.
#[derive(Debug, Clone, Default)]
pub struct ImdLookup {
    quintile_by_lsoa: FxHashMap<String, i8>,
}

impl ImdLookup {
    /// Load the lookup from a parquet file.
    ///
    /// The geography column must be present under either `LSOA11` or
    /// `lsoa11_code`, together with `imd_quintile`; any other shape fails
    /// before the join is attempted. Duplicate codes are deduplicated
    /// (first occurrence wins) so the join can never multiply rows.
    pub fn from_parquet(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();

        let lsoa_idx = schema
            .index_of("LSOA11")
            .or_else(|_| schema.index_of("lsoa11_code"))
            .map_err(|_| schema_mismatch())?;
        let quintile_idx = schema.index_of("imd_quintile").map_err(|_| schema_mismatch())?;

        let mut quintile_by_lsoa = FxHashMap::default();
        for batch in builder.build()? {
            let batch = batch?;
            let lsoa_col = batch.column(lsoa_idx);
            let quintile_col = batch.column(quintile_idx);
            for i in 0..batch.num_rows() {
                let Some(lsoa) = value_as_string(lsoa_col, i) else {
                    continue;
                };
                let Some(quintile) = value_as_i32(quintile_col, i) else {
                    continue;
                };
                let Ok(quintile) = i8::try_from(quintile) else {
                    continue;
                };
                quintile_by_lsoa.entry(lsoa).or_insert(quintile);
            }
        }

        log::info!("Loaded IMD lookup with {} LSOA codes", quintile_by_lsoa.len());
        Ok(Self { quintile_by_lsoa })
    }

    /// Quintile for an LSOA code, if the code is known.
    #[must_use]
    pub fn get(&self, lsoa: &str) -> Option<i8> {
        self.quintile_by_lsoa.get(lsoa).copied()
    }

    /// Number of distinct LSOA codes in the lookup.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quintile_by_lsoa.len()
    }

    /// True if the lookup holds no codes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quintile_by_lsoa.is_empty()
    }
}

fn schema_mismatch() -> EtlError {
    EtlError::Schema(
        "IMD parquet must have columns: LSOA11 (or lsoa11_code) and imd_quintile".to_string(),
    )
}

/// Left-join the deprivation quintile onto episodes by LSOA code.
///
/// Episodes whose code is absent from the lookup (or null) keep a null
/// quintile; the missing-match percentage is reported as an informational
/// statistic only.
pub fn attach_imd(episodes: &mut [Episode], lookup: &ImdLookup) {
    for episode in episodes.iter_mut() {
        episode.imd_quintile = episode
            .lsoa11
            .as_deref()
            .and_then(|code| lookup.get(code));
    }

    if !episodes.is_empty() {
        let missing = episodes
            .iter()
            .filter(|e| e.imd_quintile.is_none())
            .count();
        log::info!(
            "IMD missing after join: {:.1}%",
            missing as f64 * 100.0 / episodes.len() as f64
        );
    }
}
