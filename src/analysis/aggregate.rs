use crate::analysis::types::{
    AggregationResult, GroupKey, GroupValue, HistogramBin, MonthlyCount, Op, ShareRow,
};
use crate::analysis::utility::{mean, pct, round1};
use crate::table::{MissingColumn, Table, Value};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Default)]
struct GroupAcc {
    count: usize,
    values: Vec<f64>,
}

/// Groups `table` by the tuple of `group_by` values and reduces each group
/// with `op`.
///
/// Groups are returned in first-appearance order. `Unknown` forms its own
/// group. Sum and mean only see numeric cells of the metric column; a group
/// with no numeric cells sums to 0 and is left out of a mean.
///
/// # Errors
///
/// Returns [`MissingColumn`] if a group-by or metric column is absent.
pub fn aggregate(table: &Table, group_by: &[&str], op: &Op) -> Result<AggregationResult, MissingColumn> {
    table.require(group_by)?;
    if let Some(metric) = op.metric() {
        table.require(&[metric])?;
    }

    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(GroupKey, GroupAcc)> = Vec::new();

    for record in table.records() {
        let key = GroupKey(
            group_by
                .iter()
                .map(|c| record.get(c).cloned())
                .collect::<Result<Vec<_>, _>>()?,
        );
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, GroupAcc::default()));
            groups.len() - 1
        });

        let acc = &mut groups[slot].1;
        acc.count += 1;
        if let Some(metric) = op.metric() {
            if let Some(n) = record.get(metric)?.as_number() {
                acc.values.push(n);
            }
        }
    }

    let groups = groups
        .into_iter()
        .filter_map(|(key, acc)| {
            let value = match op {
                Op::Count => Some(acc.count as f64),
                Op::Sum(_) => Some(acc.values.iter().sum()),
                Op::Mean(_) => mean(&acc.values),
            }?;
            Some(GroupValue { key, value })
        })
        .collect();

    Ok(AggregationResult { groups })
}

/// Count per distinct value of `column`, largest first.
pub fn value_counts(table: &Table, column: &str) -> Result<AggregationResult, MissingColumn> {
    Ok(aggregate(table, &[column], &Op::Count)?.sorted_desc())
}

/// Number of distinct values in `column`. Missing markers are not counted;
/// the `Unknown` sentinel is.
pub fn distinct_count(table: &Table, column: &str) -> Result<usize, MissingColumn> {
    Ok(table
        .column(column)?
        .filter(|v| !v.is_missing())
        .collect::<HashSet<_>>()
        .len())
}

/// Mean of the numeric cells of `column`, `None` if it has none.
pub fn numeric_mean(table: &Table, column: &str) -> Result<Option<f64>, MissingColumn> {
    let values: Vec<f64> = table.column(column)?.filter_map(Value::as_number).collect();
    Ok(mean(&values))
}

/// Records per calendar month of the dates in `column`, oldest first.
/// Cells without a valid date are skipped.
pub fn monthly_counts(table: &Table, column: &str) -> Result<Vec<MonthlyCount>, MissingColumn> {
    let mut months: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in table.column(column)?.filter_map(Value::as_date) {
        if let Some(month) = NaiveDate::from_ymd_opt(date.year(), date.month(), 1) {
            *months.entry(month).or_default() += 1;
        }
    }
    Ok(months
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect())
}

/// Splits the numeric cells of `column` into `bins` equal-width buckets
/// spanning their minimum and maximum. Missing and non-numeric cells are
/// skipped. No values (or zero bins) gives no buckets; identical values
/// share a single bucket.
pub fn histogram(table: &Table, column: &str, bins: usize) -> Result<Vec<HistogramBin>, MissingColumn> {
    let values: Vec<f64> = table.column(column)?.filter_map(Value::as_number).collect();
    if values.is_empty() || bins == 0 {
        return Ok(Vec::new());
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return Ok(vec![HistogramBin {
            start: min,
            end: max,
            count: values.len(),
        }]);
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &values {
        let slot = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[slot] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count,
        })
        .collect())
}

/// Per value of `group_column`, how many records have a "Yes" in
/// `flag_column`. Rows come back in first-appearance order.
pub fn yes_share(table: &Table, group_column: &str, flag_column: &str) -> Result<Vec<ShareRow>, MissingColumn> {
    table.require(&[group_column, flag_column])?;

    let mut index: HashMap<Value, usize> = HashMap::new();
    let mut rows: Vec<(Value, usize, usize)> = Vec::new();

    for record in table.records() {
        let key = record.get(group_column)?.clone();
        let positive = record
            .get(flag_column)?
            .as_text()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("yes"));

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            rows.push((key, 0, 0));
            rows.len() - 1
        });
        rows[slot].1 += 1;
        if positive {
            rows[slot].2 += 1;
        }
    }

    Ok(rows
        .into_iter()
        .map(|(key, total, positive)| ShareRow {
            key,
            total,
            positive,
            percent: round1(pct(positive, total)),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{ColumnTypes, normalize};

    fn lep() -> Table {
        let raw = Table::from_rows(
            &["Borough", "Language", "LEP Population (Estimate)"],
            vec![
                vec!["Queens".into(), "Spanish".into(), "10".into()],
                vec!["Queens".into(), "Chinese".into(), "n/a".into()],
                vec!["Bronx".into(), "Spanish".into(), "5".into()],
                vec!["Queens".into(), "Bengali".into(), "20".into()],
                vec![Value::Empty, "Russian".into(), Value::Empty],
            ],
        );
        normalize(&raw, &ColumnTypes::new().numeric("LEP Population (Estimate)"))
    }

    const POP: &str = "LEP Population (Estimate)";

    #[test]
    fn test_count_totals_table_length() {
        let table = lep();
        let result = aggregate(&table, &["Borough"], &Op::Count).unwrap();
        assert_eq!(result.total() as usize, table.len());
    }

    #[test]
    fn test_unknown_is_its_own_group() {
        let result = aggregate(&lep(), &["Borough"], &Op::Count).unwrap();
        assert_eq!(result.get(&GroupKey(vec![Value::Unknown])), Some(1.0));
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_mean_excludes_missing_numbers() {
        let result = aggregate(&lep(), &["Borough"], &Op::mean(POP)).unwrap();
        assert_eq!(result.get(&GroupKey::single("Queens")), Some(15.0));
    }

    #[test]
    fn test_mean_without_contributors_is_omitted() {
        let result = aggregate(&lep(), &["Borough"], &Op::mean(POP)).unwrap();
        assert_eq!(result.get(&GroupKey(vec![Value::Unknown])), None);
    }

    #[test]
    fn test_sum_without_contributors_is_zero() {
        let result = aggregate(&lep(), &["Borough"], &Op::sum(POP)).unwrap();
        assert_eq!(result.get(&GroupKey(vec![Value::Unknown])), Some(0.0));
        assert_eq!(result.get(&GroupKey::single("Queens")), Some(30.0));
    }

    #[test]
    fn test_groups_in_first_appearance_order() {
        let result = aggregate(&lep(), &["Borough"], &Op::Count).unwrap();
        let keys: Vec<String> = result.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(keys, vec!["Queens", "Bronx", "Unknown"]);
    }

    #[test]
    fn test_multi_column_keys() {
        let result = aggregate(&lep(), &["Borough", "Language"], &Op::Count).unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(
            result.get(&GroupKey(vec!["Bronx".into(), "Spanish".into()])),
            Some(1.0)
        );
    }

    #[test]
    fn test_top_n_stable_on_ties() {
        let table = Table::from_rows(
            &["Language"],
            ["Haitian", "Arabic", "Arabic", "Korean", "Haitian", "Polish"]
                .iter()
                .map(|l| vec![(*l).into()])
                .collect(),
        );
        let top = aggregate(&table, &["Language"], &Op::Count).unwrap().top_n(3);
        let keys: Vec<String> = top.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(keys, vec!["Haitian", "Arabic", "Korean"]);
    }

    #[test]
    fn test_missing_columns_are_reported() {
        assert!(aggregate(&lep(), &["Agency"], &Op::Count).is_err());
        assert!(aggregate(&lep(), &["Borough"], &Op::sum("Rate")).is_err());
    }

    #[test]
    fn test_empty_table_gives_empty_result() {
        let table = Table::new(&["Borough"]);
        assert!(aggregate(&table, &["Borough"], &Op::Count).unwrap().is_empty());
    }

    #[test]
    fn test_distinct_count_and_numeric_mean() {
        let table = lep();
        assert_eq!(distinct_count(&table, "Borough").unwrap(), 3);
        assert_eq!(distinct_count(&table, POP).unwrap(), 3);
        assert_eq!(numeric_mean(&table, POP).unwrap(), Some(35.0 / 3.0));
    }

    #[test]
    fn test_monthly_counts() {
        let raw = Table::from_rows(
            &["Request Date"],
            vec![
                vec!["2024-01-03".into()],
                vec!["2024-01-28".into()],
                vec!["bad".into()],
                vec!["2023-12-31".into()],
            ],
        );
        let table = normalize(&raw, &ColumnTypes::new().date("Request Date"));
        let months = monthly_counts(&table, "Request Date").unwrap();

        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(months[1].count, 2);
    }

    #[test]
    fn test_yes_share() {
        let table = Table::from_rows(
            &["Language", "Has Linguist?"],
            vec![
                vec!["Spanish".into(), "Yes".into()],
                vec!["Spanish".into(), "No".into()],
                vec!["Spanish".into(), "Yes".into()],
                vec!["Mixtec".into(), "No".into()],
            ],
        );
        let rows = yes_share(&table, "Language", "Has Linguist?").unwrap();

        assert_eq!(rows[0].key, Value::from("Spanish"));
        assert_eq!(rows[0].total, 3);
        assert_eq!(rows[0].positive, 2);
        assert_eq!(rows[0].percent, 66.7);
        assert_eq!(rows[1].percent, 0.0);
    }

    #[test]
    fn test_histogram_skips_missing_values() {
        let raw = Table::from_rows(
            &["Billable time"],
            vec![
                vec!["30".into()],
                vec!["90".into()],
                vec![Value::Empty],
                vec!["45".into()],
                vec!["n/a".into()],
            ],
        );
        let table = normalize(&raw, &ColumnTypes::new().numeric("Billable time"));
        let bins = histogram(&table, "Billable time", 3).unwrap();

        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 0, 1]);
        assert_eq!((bins[0].start, bins[0].end), (30.0, 50.0));
        assert_eq!(bins[2].end, 90.0);
    }

    #[test]
    fn test_histogram_edge_cases() {
        let same = Table::from_rows(&["x"], vec![vec![Value::Number(5.0)], vec![Value::Number(5.0)]]);
        let bins = histogram(&same, "x", 30).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 2);

        let empty = Table::from_rows(&["x"], vec![vec![Value::MissingNumber]]);
        assert!(histogram(&empty, "x", 30).unwrap().is_empty());
        assert!(histogram(&same, "y", 30).is_err());
    }
}
