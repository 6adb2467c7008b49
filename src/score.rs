//! Heuristic 1–5 service rating derived from free-text survey answers.
//!
//! This is a lookup-table heuristic, not a validated metric. Each signal
//! column nudges a neutral 3.0 up or down depending on the words its answer
//! contains.

use crate::table::{Record, Table, Value};

pub const NEUTRAL_SCORE: f64 = 3.0;
pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;

/// Token lists and the weight applied when any token of the list matches.
///
/// Matching is a case-insensitive substring test. A cell that matches both
/// lists receives both adjustments.
static SIGNAL_WEIGHTS: &[(&[&str], f64)] = &[
    (&["yes", "good", "excellent"], 0.5),
    (&["no", "poor", "bad"], -0.5),
];

/// Scores one record over `signal_columns`.
///
/// Only text cells contribute; the `Unknown` sentinel and columns the record
/// does not carry leave the score unchanged. The result is clamped to
/// `[1.0, 5.0]`.
pub fn score<S: AsRef<str>>(record: &Record, signal_columns: &[S]) -> f64 {
    let adjustment: f64 = signal_columns
        .iter()
        .filter_map(|col| record.get(col.as_ref()).ok())
        .filter_map(Value::as_text)
        .map(cell_adjustment)
        .sum();

    (NEUTRAL_SCORE + adjustment).clamp(MIN_SCORE, MAX_SCORE)
}

fn cell_adjustment(text: &str) -> f64 {
    let lower = text.to_lowercase();
    SIGNAL_WEIGHTS
        .iter()
        .filter(|(tokens, _)| tokens.iter().any(|t| lower.contains(t)))
        .map(|(_, weight)| weight)
        .sum()
}

/// Returns a copy of `table` with `column` holding each record's score.
pub fn with_scores<S: AsRef<str>>(table: &Table, signal_columns: &[S], column: &str) -> Table {
    let scores: Vec<Value> = table
        .records()
        .iter()
        .map(|r| Value::Number(score(r, signal_columns)))
        .collect();
    table.with_column(column, scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUARDS: &str = "Interaction with Security Guards";

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_yes_no_unknown_scenario() {
        let table = Table::from_rows(
            &[GUARDS],
            vec![vec!["Yes".into()], vec!["No".into()], vec![Value::Unknown]],
        );
        let scores: Vec<f64> = table.records().iter().map(|r| score(r, &[GUARDS])).collect();
        assert_eq!(scores, vec![3.5, 2.5, 3.0]);
    }

    #[test]
    fn test_no_signal_columns_is_neutral() {
        let r = record(&[(GUARDS, "Excellent".into())]);
        assert_eq!(score::<&str>(&r, &[]), NEUTRAL_SCORE);
        assert_eq!(score(&r, &["Not a column"]), NEUTRAL_SCORE);
    }

    #[test]
    fn test_case_insensitive_substring() {
        let r = record(&[(GUARDS, "very GOOD service".into())]);
        assert_eq!(score(&r, &[GUARDS]), 3.5);
    }

    #[test]
    fn test_overlapping_tokens_apply_both() {
        let r = record(&[(GUARDS, "Yes and No".into())]);
        assert_eq!(score(&r, &[GUARDS]), 3.0);
    }

    #[test]
    fn test_clamped_to_range() {
        let cols: Vec<String> = (0..6).map(|i| format!("q{i}")).collect();
        let positive: Record = cols.iter().map(|c| (c.clone(), Value::from("Yes"))).collect();
        let negative: Record = cols.iter().map(|c| (c.clone(), Value::from("Poor"))).collect();

        assert_eq!(score(&positive, &cols), MAX_SCORE);
        assert_eq!(score(&negative, &cols), MIN_SCORE);
    }

    #[test]
    fn test_non_text_cells_do_not_contribute() {
        let r = record(&[("a", Value::Number(1.0)), ("b", Value::Empty), ("c", Value::Unknown)]);
        assert_eq!(score(&r, &["a", "b", "c"]), NEUTRAL_SCORE);
    }

    #[test]
    fn test_with_scores_adds_column() {
        let table = Table::from_rows(&[GUARDS], vec![vec!["Yes".into()], vec!["Bad".into()]]);
        let scored = with_scores(&table, &[GUARDS], "rating_score");

        assert!(scored.has_column("rating_score"));
        assert_eq!(
            scored.records()[1].get("rating_score").unwrap(),
            &Value::Number(2.5)
        );
    }
}
