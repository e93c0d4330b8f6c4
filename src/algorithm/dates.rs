//! Date repair and length-of-stay arithmetic.
//!
//! Source systems record unknown admission or discharge dates as far-past
//! dummy values. Anything strictly before 1900-01-01 is treated as such a
//! sentinel and nulled, so duration arithmetic never sees an interval of
//! over a century.

use chrono::{Datelike, NaiveDate};

/// Upper plausibility bound for a spell's length of stay, in days.
pub const MAX_LOS_DAYS: i64 = 730;

/// Null out far-past sentinel dates.
///
/// Dates strictly before 1900-01-01 become `None`; 1900-01-01 itself and
/// anything later is preserved.
#[must_use]
pub fn scrub_sentinel(date: Option<NaiveDate>) -> Option<NaiveDate> {
    date.filter(|d| d.year() >= 1900)
}

/// Length of stay in days: discharge - admission + 1.
///
/// `None` when either date is missing. The result may be zero or negative
/// for inconsistent records; [`plausible_los`] decides what survives.
#[must_use]
pub fn spell_los(admidate: Option<NaiveDate>, disdate: Option<NaiveDate>) -> Option<i64> {
    match (admidate, disdate) {
        (Some(adm), Some(dis)) => Some(dis.signed_duration_since(adm).num_days() + 1),
        _ => None,
    }
}

/// Whether a recomputed length of stay is physically plausible.
///
/// A missing LOS (incomplete spell, one or both dates absent) is kept;
/// a present LOS must fall in `[1, MAX_LOS_DAYS]`.
#[must_use]
pub fn plausible_los(los: Option<i64>) -> bool {
    match los {
        Some(days) => (1..=MAX_LOS_DAYS).contains(&days),
        None => true,
    }
}
