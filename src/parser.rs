//! Raw CSV and spreadsheet parsing into [`Table`]s.
//!
//! Parsing does no cleaning: CSV fields stay text, spreadsheet cells keep the
//! type the workbook stored, and blank cells become [`Value::Empty`].

use std::path::Path;

use calamine::{Data, DataType, Range, Reader, open_workbook_auto};
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::LoadError;
use crate::table::{Table, Value};

/// Decodes a CSV body whose first row is the header.
///
/// Rows may be ragged. Invalid UTF-8 is replaced rather than rejected.
///
/// # Errors
///
/// Returns [`LoadError::Csv`] on malformed quoting and [`LoadError::Empty`]
/// when there is no header or no data row.
pub fn parse_csv(bytes: &[u8], origin: &str) -> Result<Table, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let csv_err = |source| LoadError::Csv {
        origin: origin.to_string(),
        source,
    };

    let headers: Vec<String> = rdr
        .byte_headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .to_string()
        })
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::Empty {
            origin: origin.to_string(),
        });
    }

    let mut table = Table::new(&headers);
    for result in rdr.byte_records() {
        let record = result.map_err(csv_err)?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Empty
                } else {
                    Value::Text(String::from_utf8_lossy(field).into_owned())
                }
            })
            .collect();
        table.push_row(row);
    }

    debug!(origin, rows = table.len(), columns = table.columns().len(), "CSV parsed");

    if table.is_empty() {
        return Err(LoadError::Empty {
            origin: origin.to_string(),
        });
    }
    Ok(table)
}

/// Reads one sheet of a workbook; the first sheet when `sheet` is `None`.
///
/// # Errors
///
/// Fails if the workbook cannot be opened, the named sheet does not exist, or
/// the sheet holds no data rows.
pub fn parse_sheet(path: &Path, sheet: Option<&str>) -> Result<Table, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| LoadError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    let names = workbook.sheet_names();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| LoadError::SheetNotFound {
                path: path.to_path_buf(),
                sheet: wanted.to_string(),
            })?,
        None => names.first().cloned().ok_or_else(|| LoadError::Empty {
            origin: path.display().to_string(),
        })?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| LoadError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;

    let table = range_to_table(&range);
    debug!(path = %path.display(), sheet = %name, rows = table.len(), "Sheet parsed");

    if table.is_empty() {
        return Err(LoadError::Empty {
            origin: format!("{} [{}]", path.display(), name),
        });
    }
    Ok(table)
}

/// Reads every sheet of a workbook, in workbook order.
///
/// Sheets without data rows are skipped; a workbook with no usable sheet is
/// [`LoadError::Empty`].
pub fn parse_workbook(path: &Path) -> Result<Vec<(String, Table)>, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| LoadError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|source| LoadError::Workbook {
                path: path.to_path_buf(),
                source,
            })?;
        let table = range_to_table(&range);
        if table.is_empty() {
            debug!(sheet = %name, "Skipping sheet without data rows");
            continue;
        }
        sheets.push((name, table));
    }

    if sheets.is_empty() {
        return Err(LoadError::Empty {
            origin: path.display().to_string(),
        });
    }
    Ok(sheets)
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Table::default();
    };

    let headers: Vec<String> = header.iter().map(|c| c.to_string()).collect();
    let mut table = Table::new(&headers);
    for row in rows {
        let values: Vec<Value> = row.iter().map(cell_value).collect();
        if values.iter().all(|v| matches!(v, Value::Empty)) {
            continue;
        }
        table.push_row(values);
    }
    table
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Empty,
        Data::String(s) if s.is_empty() => Value::Empty,
        Data::String(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => {
            cell.as_datetime().map(Value::Date).unwrap_or(Value::Empty)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_keeps_fields_as_text() {
        let body = b"Agency,Borough,Count\nDOE,Queens,10\nHRA,,3\n";
        let table = parse_csv(body, "inline").unwrap();

        assert_eq!(table.columns(), &["Agency", "Borough", "Count"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].get("Count").unwrap(), &Value::from("10"));
        assert_eq!(table.records()[1].get("Borough").unwrap(), &Value::Empty);
    }

    #[test]
    fn test_parse_csv_quoted_newlines_in_header() {
        let body = "\u{feff}\"Did the Secret Shopper receive the informat\nion or service asked for?\",Agency\nYes,DOE\n";
        let table = parse_csv(body.as_bytes(), "inline").unwrap();

        assert_eq!(
            table.columns()[0],
            "Did the Secret Shopper receive the informat\nion or service asked for?"
        );
    }

    #[test]
    fn test_parse_csv_ragged_rows() {
        let body = b"a,b,c\n1\n1,2,3\n";
        let table = parse_csv(body, "inline").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].get("b").unwrap(), &Value::Empty);
    }

    #[test]
    fn test_parse_csv_header_only_is_empty() {
        let result = parse_csv(b"a,b\n", "inline");
        assert!(matches!(result, Err(LoadError::Empty { .. })));
    }

    #[test]
    fn test_parse_csv_no_input_is_empty() {
        let result = parse_csv(b"", "inline");
        assert!(matches!(result, Err(LoadError::Empty { .. })));
    }

    #[test]
    fn test_cell_value_mapping() {
        assert_eq!(cell_value(&Data::Int(4)), Value::Number(4.0));
        assert_eq!(cell_value(&Data::String(String::new())), Value::Empty);
        assert_eq!(cell_value(&Data::Bool(true)), Value::Bool(true));
        assert_eq!(cell_value(&Data::Empty), Value::Empty);
    }
}
