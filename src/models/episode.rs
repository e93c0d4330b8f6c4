//! Episode entity model
//!
//! One `Episode` is a single clinical record within a hospital stay (a ward
//! transfer or specialty change). Episodes are not unique per admission:
//! several episodes can share the same patient and admission/discharge date
//! pair, representing transfers within one continuous stay.

use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::algorithm::dates::scrub_sentinel;
use crate::utils::arrow_utils::{value_as_date, value_as_i32, value_as_string};

/// The fixed column set read from HES APC extracts.
///
/// This list is the schema contract between the loader and the cleaning
/// and collapse stages: the loader projects input files down to exactly
/// these columns, and everything downstream addresses fields through the
/// `Episode` struct rather than by column name.
pub const NEEDED_COLUMNS: [&str; 15] = [
    "PSEUDO_HESID",
    "EPIKEY",
    "ADMIDATE",
    "DISDATE",
    "ADMIMETH",
    "ADMISORC",
    "DIAG_4_01",
    "ETHNOS",
    "SEX",
    "STARTAGE",
    "LSOA11",
    "SPELBGIN",
    "SPELEND",
    "FYEAR",
    "PARTYEAR",
];

/// Representation of one episode-level row of the combined extract.
///
/// Every field is optional: absent columns, unparseable dates and dummy
/// sentinel dates all become `None` and flow through to the output rather
/// than aborting the run.
#[derive(Debug, Clone, Default)]
pub struct Episode {
    /// Patient pseudo-identifier
    pub pseudo_hesid: Option<String>,
    /// Episode key, unique per episode record
    pub epikey: Option<String>,
    /// Admission date (repaired)
    pub admidate: Option<NaiveDate>,
    /// Discharge date (repaired)
    pub disdate: Option<NaiveDate>,
    /// Admission method code; a leading '2' marks an emergency admission
    pub admimeth: Option<String>,
    /// Admission source code
    pub admisorc: Option<String>,
    /// Primary diagnosis code (4-character ICD-10)
    pub diag: Option<String>,
    /// Ethnicity code
    pub ethnos: Option<String>,
    /// Sex code
    pub sex: Option<String>,
    /// Age at start of episode
    pub startage: Option<i32>,
    /// LSOA 2011 geography code, the deprivation join key
    pub lsoa11: Option<String>,
    /// Spell-begin flag
    pub spelbgin: Option<String>,
    /// Spell-end flag
    pub spelend: Option<String>,
    /// Fiscal year identifier
    pub fyear: Option<i32>,
    /// Partial-year identifier
    pub partyear: Option<i32>,
    /// Deprivation quintile, null until the IMD join runs
    pub imd_quintile: Option<i8>,
}

/// Column handles for one record batch, resolved once per batch.
struct EpisodeColumns {
    pseudo_hesid: Option<ArrayRef>,
    epikey: Option<ArrayRef>,
    admidate: Option<ArrayRef>,
    disdate: Option<ArrayRef>,
    admimeth: Option<ArrayRef>,
    admisorc: Option<ArrayRef>,
    diag: Option<ArrayRef>,
    ethnos: Option<ArrayRef>,
    sex: Option<ArrayRef>,
    startage: Option<ArrayRef>,
    lsoa11: Option<ArrayRef>,
    spelbgin: Option<ArrayRef>,
    spelend: Option<ArrayRef>,
    fyear: Option<ArrayRef>,
    partyear: Option<ArrayRef>,
}

impl EpisodeColumns {
    fn resolve(batch: &RecordBatch) -> Self {
        let col = |name: &str| -> Option<ArrayRef> {
            batch
                .schema()
                .index_of(name)
                .ok()
                .map(|idx| batch.column(idx).clone())
        };
        Self {
            pseudo_hesid: col("PSEUDO_HESID"),
            epikey: col("EPIKEY"),
            admidate: col("ADMIDATE"),
            disdate: col("DISDATE"),
            admimeth: col("ADMIMETH"),
            admisorc: col("ADMISORC"),
            diag: col("DIAG_4_01"),
            ethnos: col("ETHNOS"),
            sex: col("SEX"),
            startage: col("STARTAGE"),
            lsoa11: col("LSOA11"),
            spelbgin: col("SPELBGIN"),
            spelend: col("SPELEND"),
            fyear: col("FYEAR"),
            partyear: col("PARTYEAR"),
        }
    }
}

impl Episode {
    /// Extract episodes from record batches produced by the loader.
    ///
    /// Date fields are repaired on the way in: unparseable values and
    /// pre-1900 sentinel dates both become `None`.
    #[must_use]
    pub fn from_batches(batches: &[RecordBatch]) -> Vec<Self> {
        let mut episodes = Vec::new();

        for batch in batches {
            let cols = EpisodeColumns::resolve(batch);
            let text = |col: &Option<ArrayRef>, i: usize| -> Option<String> {
                col.as_ref().and_then(|a| value_as_string(a, i))
            };
            let date = |col: &Option<ArrayRef>, i: usize| -> Option<NaiveDate> {
                scrub_sentinel(col.as_ref().and_then(|a| value_as_date(a, i)))
            };
            let int = |col: &Option<ArrayRef>, i: usize| -> Option<i32> {
                col.as_ref().and_then(|a| value_as_i32(a, i))
            };

            for i in 0..batch.num_rows() {
                episodes.push(Self {
                    pseudo_hesid: text(&cols.pseudo_hesid, i),
                    epikey: text(&cols.epikey, i),
                    admidate: date(&cols.admidate, i),
                    disdate: date(&cols.disdate, i),
                    admimeth: text(&cols.admimeth, i),
                    admisorc: text(&cols.admisorc, i),
                    diag: text(&cols.diag, i),
                    ethnos: text(&cols.ethnos, i),
                    sex: text(&cols.sex, i),
                    startage: int(&cols.startage, i),
                    lsoa11: text(&cols.lsoa11, i),
                    spelbgin: text(&cols.spelbgin, i),
                    spelend: text(&cols.spelend, i),
                    fyear: int(&cols.fyear, i),
                    partyear: int(&cols.partyear, i),
                    imd_quintile: None,
                });
            }
        }

        episodes
    }

    /// True if the admission method code marks an emergency admission.
    #[must_use]
    pub fn is_emergency(&self) -> bool {
        self.admimeth
            .as_deref()
            .is_some_and(|m| m.starts_with('2'))
    }
}
