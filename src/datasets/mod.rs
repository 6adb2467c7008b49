//! Dataset presets for the two dashboards.
//!
//! Each preset names its sources, declares which columns are typed, and
//! builds the metrics and chart series its dashboard shows out of the
//! generic pipeline in [`crate::normalize`], [`crate::filter`] and
//! [`crate::analysis`].

pub mod lass;
pub mod lep;
pub mod sosi;

use std::collections::BTreeSet;

use tracing::warn;

use crate::table::{MissingColumn, Table, UNKNOWN, Value};

/// Turns a missing-column failure into "skip this visualization".
pub(crate) fn visual<T>(name: &str, result: Result<T, MissingColumn>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(visualization = name, error = %e, "Skipping visualization");
            None
        }
    }
}

/// Maps a user-picked option back to the cell value it was rendered from.
/// `"Unknown"` selects the sentinel group.
pub fn choice(option: &str) -> Value {
    if option == UNKNOWN {
        Value::Unknown
    } else {
        Value::Text(option.to_string())
    }
}

pub(crate) fn choices(options: &[String]) -> Vec<Value> {
    options.iter().map(|o| choice(o)).collect()
}

/// Sorted distinct values of `column` for a selection widget, including
/// `Unknown`. Missing markers are left out.
pub fn options(table: &Table, column: &str) -> Result<Vec<String>, MissingColumn> {
    Ok(table
        .column(column)?
        .filter(|v| !v.is_missing())
        .map(|v| v.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect())
}
