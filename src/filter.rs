//! Record selection: per-column membership, date windows and text matching.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::table::{MissingColumn, Table, Value};

/// Accepted values per column.
///
/// A column that is not a key imposes no constraint. A column whose accepted
/// set is empty matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    accepted: BTreeMap<String, HashSet<Value>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts `column` to `values`. Repeated calls for one column replace
    /// the previous set.
    pub fn with<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.accepted
            .insert(column.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Like [`FilterSpec::with`], but an empty selection leaves the column
    /// unrestricted. Matches multiselect widgets where "nothing picked"
    /// means "show everything".
    pub fn with_selection<V: Into<Value> + Clone>(self, column: &str, values: &[V]) -> Self {
        if values.is_empty() {
            self
        } else {
            self.with(column, values.iter().cloned())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.accepted.keys().map(String::as_str)
    }
}

/// Keeps the records that satisfy every constraint in `spec` whose column the
/// table carries. Constraints on unknown columns are ignored. Row order is
/// preserved and the input is left untouched.
pub fn filter(table: &Table, spec: &FilterSpec) -> Table {
    let active: Vec<(&str, &HashSet<Value>)> = spec
        .accepted
        .iter()
        .filter(|(col, _)| table.has_column(col))
        .map(|(col, set)| (col.as_str(), set))
        .collect();

    if active.is_empty() {
        return table.clone();
    }

    let records = table
        .records()
        .iter()
        .filter(|r| {
            active
                .iter()
                .all(|(col, set)| r.get(col).is_ok_and(|v| set.contains(v)))
        })
        .cloned()
        .collect::<Vec<_>>();

    debug!(before = table.len(), after = records.len(), "Filter applied");
    table.with_records(records)
}

/// Keeps records whose date in `column` falls within `[start, end]`,
/// comparing calendar days. Missing or non-date cells are dropped.
pub fn filter_date_range(
    table: &Table,
    column: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Table, MissingColumn> {
    table.require(&[column])?;

    let records = table
        .records()
        .iter()
        .filter(|r| {
            r.get(column)
                .ok()
                .and_then(Value::as_date)
                .is_some_and(|d| (start..=end).contains(&d.date()))
        })
        .cloned()
        .collect();

    Ok(table.with_records(records))
}

/// Counts records whose text in `column` contains any of `tokens`,
/// ignoring case.
pub fn count_containing(table: &Table, column: &str, tokens: &[&str]) -> Result<usize, MissingColumn> {
    let tokens: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
    Ok(table
        .column(column)?
        .filter_map(Value::as_text)
        .filter(|text| {
            let lower = text.to_lowercase();
            tokens.iter().any(|t| lower.contains(t.as_str()))
        })
        .count())
}

/// Bounds of the dates held in `column`, ignoring missing cells.
pub fn date_bounds(table: &Table, column: &str) -> Result<Option<(NaiveDate, NaiveDate)>, MissingColumn> {
    let mut dates = table.column(column)?.filter_map(Value::as_date).map(|d| d.date());
    let Some(first) = dates.next() else {
        return Ok(None);
    };
    Ok(Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)))))
}
