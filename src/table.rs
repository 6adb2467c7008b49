//! In-memory tabular model shared by every pipeline stage.
//!
//! A [`Table`] is an ordered list of column names plus an ordered list of
//! [`Record`]s. Every record carries a value for every column; ragged source
//! rows are padded with [`Value::Empty`] when the table is built.

use chrono::{NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Sentinel written in place of absent categorical cells.
pub const UNKNOWN: &str = "Unknown";

/// A single cell.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
    /// Cell absent in the raw source (empty field, empty sheet cell, short row).
    Empty,
    /// Categorical placeholder written by the normalizer.
    Unknown,
    /// A numeric column held a value that could not be coerced.
    MissingNumber,
    /// A date column held a value that could not be coerced.
    MissingDate,
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// `true` for raw empties and coercion-failure markers. The `Unknown`
    /// sentinel is a real categorical value and is not missing.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Empty | Value::MissingNumber | Value::MissingDate)
    }

    fn number_bits(n: f64) -> u64 {
        if n == 0.0 {
            0
        } else if n.is_nan() {
            f64::NAN.to_bits()
        } else {
            n.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => Self::number_bits(*a) == Self::number_bits(*b),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Empty, Value::Empty)
            | (Value::Unknown, Value::Unknown)
            | (Value::MissingNumber, Value::MissingNumber)
            | (Value::MissingDate, Value::MissingDate) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Number(n) => Self::number_bits(*n).hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Empty | Value::Unknown | Value::MissingNumber | Value::MissingDate => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Date(d) => {
                if d.num_seconds_from_midnight() == 0 {
                    write!(f, "{}", d.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            Value::Unknown => f.write_str(UNKNOWN),
            Value::Empty | Value::MissingNumber | Value::MissingDate => Ok(()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Date(_) | Value::Unknown => serializer.collect_str(self),
            Value::Empty | Value::MissingNumber | Value::MissingDate => serializer.serialize_none(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// Raised when a consumer asks for a column the table does not carry.
///
/// Presentation code treats this as "skip this visualization".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column '{0}' is not present")]
pub struct MissingColumn(pub String);

/// One row of a table, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn get(&self, column: &str) -> Result<&Value, MissingColumn> {
        self.values
            .get(column)
            .ok_or_else(|| MissingColumn(column.to_string()))
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Creates an empty table with the given header. Duplicate names are
    /// disambiguated with a numeric suffix.
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: unique_headers(columns.iter().map(|c| c.as_ref().to_string())),
            records: Vec::new(),
        }
    }

    /// Builds a table from positional rows. Short rows are padded with
    /// [`Value::Empty`]; cells beyond the header are dropped.
    pub fn from_rows<S: AsRef<str>>(columns: &[S], rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        let mut cells = row.into_iter();
        let record = self
            .columns
            .iter()
            .map(|col| (col.clone(), cells.next().unwrap_or(Value::Empty)))
            .collect();
        self.records.push(record);
    }

    /// Returns a table with the same header and the given records.
    pub fn with_records(&self, records: Vec<Record>) -> Self {
        Self {
            columns: self.columns.clone(),
            records,
        }
    }

    pub(crate) fn from_parts(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fails with the first column in `columns` the table does not carry.
    pub fn require(&self, columns: &[&str]) -> Result<(), MissingColumn> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Iterates the values of one column in row order.
    pub fn column(&self, column: &str) -> Result<impl Iterator<Item = &Value>, MissingColumn> {
        self.require(&[column])?;
        Ok(self
            .records
            .iter()
            .filter_map(move |r| r.get(column).ok()))
    }

    /// Returns a copy of the table restricted to `columns` (those present),
    /// in the order given.
    pub fn select(&self, columns: &[&str]) -> Table {
        let kept: Vec<String> = columns
            .iter()
            .filter(|c| self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        let records = self
            .records
            .iter()
            .map(|r| {
                kept.iter()
                    .filter_map(|c| r.get(c).ok().map(|v| (c.clone(), v.clone())))
                    .collect()
            })
            .collect();
        Table::from_parts(kept, records)
    }

    /// Returns a copy of the table with `column` set on every record from
    /// `values`, appending the column to the header if it is new.
    pub fn with_column(&self, column: &str, values: impl IntoIterator<Item = Value>) -> Table {
        let mut columns = self.columns.clone();
        if !self.has_column(column) {
            columns.push(column.to_string());
        }
        let mut values = values.into_iter();
        let records = self
            .records
            .iter()
            .map(|r| {
                let mut r = r.clone();
                r.set(column, values.next().unwrap_or(Value::Empty));
                r
            })
            .collect();
        Table::from_parts(columns, records)
    }
}

/// Disambiguates repeated header names as `name`, `name.1`, `name.2`, ...
/// and names blank headers `Unnamed: <index>`.
pub fn unique_headers(headers: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (i, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            header
        };
        let mut name = base.clone();
        let mut n = 1;
        while !seen.insert(name.clone()) {
            name = format!("{base}.{n}");
            n += 1;
        }
        out.push(name);
    }
    out
}
