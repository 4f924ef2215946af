//! Shared primitive types used across the pipeline.

use chrono::NaiveDate;

/// Opaque account identifier. This is the dataset's stable row index.
pub type AccountId = String;

/// A subscription amount. NaN marks a missing value.
pub type Amount = f64;

/// Calendar month-end date keying a panel row.
pub type MonthEnd = NaiveDate;

/// Opaque identifier of a persisted pipeline run.
pub type RunId = String;
