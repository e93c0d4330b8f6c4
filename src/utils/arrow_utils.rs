//! Arrow utility functions for extracting individual values from arrays.
//!
//! The loader reads every needed CSV column as raw text, but the IMD lookup
//! parquet (and any externally produced file) may carry proper typed
//! columns, so these helpers accept the handful of physical types that can
//! plausibly back each logical value and convert per index, handling nulls.

use arrow::array::{
    Array, ArrayRef, Date32Array, Date64Array, Float32Array, Float64Array, Int8Array, Int16Array,
    Int32Array, Int64Array, LargeStringArray, StringArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::NaiveDate;

/// Date formats accepted when a date column arrives as text.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%d/%m/%Y", "%Y/%m/%d"];

/// Extract a string value from an Arrow array at the specified index,
/// handling nulls.
///
/// Numeric values are rendered as text so that code-like columns
/// (`EPIKEY`, `SEX`) survive CSV type inference in external files.
#[must_use]
pub fn value_as_string(array: &ArrayRef, index: usize) -> Option<String> {
    if array.is_null(index) {
        return None;
    }

    match array.data_type() {
        DataType::Utf8 => {
            let arr = array.as_any().downcast_ref::<StringArray>()?;
            Some(arr.value(index).to_string())
        }
        DataType::LargeUtf8 => {
            let arr = array.as_any().downcast_ref::<LargeStringArray>()?;
            Some(arr.value(index).to_string())
        }
        DataType::Int32 => {
            let arr = array.as_any().downcast_ref::<Int32Array>()?;
            Some(arr.value(index).to_string())
        }
        DataType::Int64 => {
            let arr = array.as_any().downcast_ref::<Int64Array>()?;
            Some(arr.value(index).to_string())
        }
        DataType::Float64 => {
            let arr = array.as_any().downcast_ref::<Float64Array>()?;
            Some(arr.value(index).to_string())
        }
        _ => None,
    }
}

/// Extract a date value from an Arrow array at the specified index,
/// handling nulls.
///
/// Text dates are tried against a small set of known formats; anything
/// unparseable is `None`, never an error.
#[must_use]
pub fn value_as_date(array: &ArrayRef, index: usize) -> Option<NaiveDate> {
    if array.is_null(index) {
        return None;
    }

    match array.data_type() {
        DataType::Date32 => {
            let arr = array.as_any().downcast_ref::<Date32Array>()?;
            arr.value_as_date(index)
        }
        DataType::Date64 => {
            let arr = array.as_any().downcast_ref::<Date64Array>()?;
            arr.value_as_date(index)
        }
        DataType::Timestamp(TimeUnit::Second, _) => {
            let arr = array.as_any().downcast_ref::<TimestampSecondArray>()?;
            arr.value_as_datetime(index).map(|dt| dt.date())
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            let arr = array.as_any().downcast_ref::<TimestampMillisecondArray>()?;
            arr.value_as_datetime(index).map(|dt| dt.date())
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            let arr = array.as_any().downcast_ref::<TimestampMicrosecondArray>()?;
            arr.value_as_datetime(index).map(|dt| dt.date())
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            let arr = array.as_any().downcast_ref::<TimestampNanosecondArray>()?;
            arr.value_as_datetime(index).map(|dt| dt.date())
        }
        DataType::Utf8 => {
            let arr = array.as_any().downcast_ref::<StringArray>()?;
            let raw = arr.value(index).trim();
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        }
        _ => None,
    }
}

/// Extract an i32 value from an Arrow array at the specified index,
/// handling nulls and narrowing/widening from the common integer widths.
#[must_use]
pub fn value_as_i32(array: &ArrayRef, index: usize) -> Option<i32> {
    if array.is_null(index) {
        return None;
    }

    match array.data_type() {
        DataType::Int8 => {
            let arr = array.as_any().downcast_ref::<Int8Array>()?;
            Some(i32::from(arr.value(index)))
        }
        DataType::Int16 => {
            let arr = array.as_any().downcast_ref::<Int16Array>()?;
            Some(i32::from(arr.value(index)))
        }
        DataType::Int32 => {
            let arr = array.as_any().downcast_ref::<Int32Array>()?;
            Some(arr.value(index))
        }
        DataType::Int64 => {
            let arr = array.as_any().downcast_ref::<Int64Array>()?;
            i32::try_from(arr.value(index)).ok()
        }
        DataType::Float32 => {
            let arr = array.as_any().downcast_ref::<Float32Array>()?;
            let v = arr.value(index);
            if v.fract() == 0.0 { Some(v as i32) } else { None }
        }
        DataType::Float64 => {
            let arr = array.as_any().downcast_ref::<Float64Array>()?;
            let v = arr.value(index);
            if v.fract() == 0.0 { Some(v as i32) } else { None }
        }
        DataType::Utf8 => {
            let arr = array.as_any().downcast_ref::<StringArray>()?;
            arr.value(index).trim().parse::<i32>().ok()
        }
        _ => None,
    }
}

/// Days since the Unix epoch, the physical representation of `Date32`.
#[must_use]
pub fn date_to_epoch_days(date: NaiveDate) -> i32 {
    date.signed_duration_since(NaiveDate::default()).num_days() as i32
}
