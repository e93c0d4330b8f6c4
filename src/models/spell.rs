//! Spell entity model
//!
//! A `Spell` is one continuous inpatient stay, produced by collapsing all
//! episodes that share a (patient, admission date, discharge date) triple.
//! Spells are the sole persisted artifact of the pipeline.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Int8Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::Result;
use crate::utils::arrow_utils::date_to_epoch_days;

/// One spell-level output row.
#[derive(Debug, Clone)]
pub struct Spell {
    /// Patient pseudo-identifier
    pub pseudo_hesid: Option<String>,
    /// Admission date of the stay
    pub admidate: Option<NaiveDate>,
    /// Discharge date of the stay
    pub disdate: Option<NaiveDate>,
    /// Number of distinct episode keys collapsed into this spell
    pub n_episodes: i64,
    /// Length of stay in days (discharge - admission + 1), null when
    /// either date is missing
    pub los_days: Option<i64>,
    /// True if any constituent episode was an emergency admission
    pub any_emerg: bool,
    /// Deprivation quintile (1-5), first non-null over the group
    pub imd_quintile: Option<i8>,
    /// Modal primary diagnosis code
    pub primary_diag: Option<String>,
    /// Modal ethnicity code
    pub ethnicity: Option<String>,
    /// Modal sex code
    pub sex: Option<String>,
    /// Composite identifier: patient id, admission and discharge dates
    /// joined with `|`
    pub spell_id: String,
}

/// Build the composite spell identifier.
///
/// Dates render as ISO `YYYY-MM-DD`; a missing component leaves its
/// segment empty. Uniqueness follows from the grouping key.
#[must_use]
pub fn compose_spell_id(
    pseudo_hesid: Option<&str>,
    admidate: Option<NaiveDate>,
    disdate: Option<NaiveDate>,
) -> String {
    let fmt = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    format!(
        "{}|{}|{}",
        pseudo_hesid.unwrap_or_default(),
        fmt(admidate),
        fmt(disdate)
    )
}

impl Spell {
    /// Get the Arrow schema for spell-level output files.
    #[must_use]
    pub fn schema() -> Schema {
        Schema::new(vec![
            Field::new("PSEUDO_HESID", DataType::Utf8, true),
            Field::new("adm", DataType::Date32, true),
            Field::new("dis", DataType::Date32, true),
            Field::new("n_episodes", DataType::Int64, false),
            Field::new("los_days", DataType::Int64, true),
            Field::new("any_emerg", DataType::Boolean, false),
            Field::new("imd_quintile", DataType::Int8, true),
            Field::new("primary_diag", DataType::Utf8, true),
            Field::new("ethnicity", DataType::Utf8, true),
            Field::new("sex", DataType::Utf8, true),
            Field::new("spell_id", DataType::Utf8, false),
        ])
    }

    /// Convert spells to a `RecordBatch` matching [`Spell::schema`].
    pub fn to_record_batch(spells: &[Self]) -> Result<RecordBatch> {
        let pseudo_hesid: ArrayRef = Arc::new(StringArray::from(
            spells
                .iter()
                .map(|s| s.pseudo_hesid.as_deref())
                .collect::<Vec<_>>(),
        ));
        let adm: ArrayRef = Arc::new(Date32Array::from(
            spells
                .iter()
                .map(|s| s.admidate.map(date_to_epoch_days))
                .collect::<Vec<_>>(),
        ));
        let dis: ArrayRef = Arc::new(Date32Array::from(
            spells
                .iter()
                .map(|s| s.disdate.map(date_to_epoch_days))
                .collect::<Vec<_>>(),
        ));
        let n_episodes: ArrayRef = Arc::new(Int64Array::from(
            spells.iter().map(|s| s.n_episodes).collect::<Vec<_>>(),
        ));
        let los_days: ArrayRef = Arc::new(Int64Array::from(
            spells.iter().map(|s| s.los_days).collect::<Vec<_>>(),
        ));
        let any_emerg: ArrayRef = Arc::new(BooleanArray::from(
            spells.iter().map(|s| s.any_emerg).collect::<Vec<_>>(),
        ));
        let imd_quintile: ArrayRef = Arc::new(Int8Array::from(
            spells.iter().map(|s| s.imd_quintile).collect::<Vec<_>>(),
        ));
        let primary_diag: ArrayRef = Arc::new(StringArray::from(
            spells
                .iter()
                .map(|s| s.primary_diag.as_deref())
                .collect::<Vec<_>>(),
        ));
        let ethnicity: ArrayRef = Arc::new(StringArray::from(
            spells
                .iter()
                .map(|s| s.ethnicity.as_deref())
                .collect::<Vec<_>>(),
        ));
        let sex: ArrayRef = Arc::new(StringArray::from(
            spells.iter().map(|s| s.sex.as_deref()).collect::<Vec<_>>(),
        ));
        let spell_id: ArrayRef = Arc::new(StringArray::from(
            spells
                .iter()
                .map(|s| s.spell_id.as_str())
                .collect::<Vec<_>>(),
        ));

        let batch = RecordBatch::try_new(
            Arc::new(Self::schema()),
            vec![
                pseudo_hesid,
                adm,
                dis,
                n_episodes,
                los_days,
                any_emerg,
                imd_quintile,
                primary_diag,
                ethnicity,
                sex,
                spell_id,
            ],
        )?;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    #[test]
    fn spell_id_formats_iso_dates() {
        let adm = NaiveDate::from_ymd_opt(2021, 1, 1);
        let dis = NaiveDate::from_ymd_opt(2021, 1, 5);
        assert_eq!(
            compose_spell_id(Some("P1"), adm, dis),
            "P1|2021-01-01|2021-01-05"
        );
    }

    #[test]
    fn spell_id_leaves_missing_segments_empty() {
        let adm = NaiveDate::from_ymd_opt(2021, 1, 1);
        assert_eq!(compose_spell_id(Some("P1"), adm, None), "P1|2021-01-01|");
        assert_eq!(compose_spell_id(None, None, None), "||");
    }

    #[test]
    fn record_batch_carries_all_columns() {
        let spell = Spell {
            pseudo_hesid: Some("P1".to_string()),
            admidate: NaiveDate::from_ymd_opt(2021, 1, 1),
            disdate: NaiveDate::from_ymd_opt(2021, 1, 5),
            n_episodes: 2,
            los_days: Some(5),
            any_emerg: true,
            imd_quintile: Some(3),
            primary_diag: Some("I219".to_string()),
            ethnicity: Some("A".to_string()),
            sex: Some("1".to_string()),
            spell_id: "P1|2021-01-01|2021-01-05".to_string(),
        };
        let batch = Spell::to_record_batch(&[spell]).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 11);
        assert_eq!(batch.schema().field(0).name(), "PSEUDO_HESID");
        assert_eq!(batch.schema().field(10).name(), "spell_id");
    }

    #[test]
    fn record_batch_preserves_nulls() {
        let spell = Spell {
            pseudo_hesid: None,
            admidate: None,
            disdate: None,
            n_episodes: 0,
            los_days: None,
            any_emerg: false,
            imd_quintile: None,
            primary_diag: None,
            ethnicity: None,
            sex: None,
            spell_id: "||".to_string(),
        };
        let batch = Spell::to_record_batch(&[spell]).unwrap();
        assert!(batch.column(1).is_null(0));
        assert!(batch.column(4).is_null(0));
        assert!(batch.column(6).is_null(0));
    }
}
