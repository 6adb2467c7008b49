//! Column-label cleanup, sentinel filling and typed coercion.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::table::{Record, Table, UNKNOWN, Value, unique_headers};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y", "%B %d, %Y"];

/// Columns that are coerced to a type by convention rather than by schema.
#[derive(Debug, Clone, Default)]
pub struct ColumnTypes {
    pub numeric: Vec<String>,
    pub date: Vec<String>,
}

impl ColumnTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn numeric(mut self, column: &str) -> Self {
        self.numeric.push(column.to_string());
        self
    }

    pub fn date(mut self, column: &str) -> Self {
        self.date.push(column.to_string());
        self
    }

    fn kind(&self, column: &str) -> ColumnKind {
        if self.numeric.iter().any(|c| c == column) {
            ColumnKind::Numeric
        } else if self.date.iter().any(|c| c == column) {
            ColumnKind::Date
        } else {
            ColumnKind::Categorical
        }
    }
}

#[derive(Clone, Copy)]
enum ColumnKind {
    Categorical,
    Numeric,
    Date,
}

/// Returns a cleaned copy of `table`.
///
/// Column labels are trimmed, absent cells and literal `Unknown` text in
/// categorical columns become [`Value::Unknown`], and the columns named in
/// `types` are coerced. Running it twice gives the same table as running it
/// once.
pub fn normalize(table: &Table, types: &ColumnTypes) -> Table {
    let columns = unique_headers(table.columns().iter().map(|c| c.trim().to_string()));
    let kinds: Vec<ColumnKind> = columns.iter().map(|c| types.kind(c)).collect();

    let mut coerced_failures = 0usize;
    let records = table
        .records()
        .iter()
        .map(|record| {
            table
                .columns()
                .iter()
                .zip(columns.iter().zip(&kinds))
                .map(|(old, (new, kind))| {
                    let raw = record.get(old).cloned().unwrap_or(Value::Empty);
                    let value = coerce(raw, *kind);
                    if matches!(value, Value::MissingNumber | Value::MissingDate) {
                        coerced_failures += 1;
                    }
                    (new.clone(), value)
                })
                .collect::<Record>()
        })
        .collect();

    debug!(
        rows = table.len(),
        columns = columns.len(),
        coerced_failures,
        "Table normalized"
    );

    Table::from_parts(columns, records)
}

fn coerce(value: Value, kind: ColumnKind) -> Value {
    match kind {
        ColumnKind::Categorical => match value {
            Value::Empty => Value::Unknown,
            Value::Text(s) if s == UNKNOWN => Value::Unknown,
            other => other,
        },
        ColumnKind::Numeric => match value {
            Value::Number(n) if n.is_finite() => Value::Number(n),
            Value::Text(s) => parse_number(&s).map_or(Value::MissingNumber, Value::Number),
            _ => Value::MissingNumber,
        },
        ColumnKind::Date => match value {
            Value::Date(d) => Value::Date(d),
            Value::Text(s) => parse_date(&s).map_or(Value::MissingDate, Value::Date),
            _ => Value::MissingDate,
        },
    }
}

/// Parses a numeric cell. Surrounding whitespace and thousands separators
/// are accepted; non-finite results are rejected.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parses a date or datetime cell against the supported formats. Offset
/// timestamps keep their wall-clock time.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
