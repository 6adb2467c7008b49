//! Data types produced by the aggregation pipeline.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::table::Value;

/// Reduction applied to each group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Number of records in the group.
    Count,
    /// Sum of the numeric cells of the named column.
    Sum(String),
    /// Mean of the numeric cells of the named column.
    Mean(String),
}

impl Op {
    pub fn sum(column: &str) -> Self {
        Op::Sum(column.to_string())
    }

    pub fn mean(column: &str) -> Self {
        Op::Mean(column.to_string())
    }

    pub(crate) fn metric(&self) -> Option<&str> {
        match self {
            Op::Count => None,
            Op::Sum(c) | Op::Mean(c) => Some(c),
        }
    }
}

/// Values of the group-by columns for one group, in group-by order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupKey(pub Vec<Value>);

impl GroupKey {
    pub fn single(value: impl Into<Value>) -> Self {
        GroupKey(vec![value.into()])
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue {
    pub key: GroupKey,
    pub value: f64,
}

/// Scalar per group, in first-appearance order unless re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    pub groups: Vec<GroupValue>,
}

impl AggregationResult {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupValue> {
        self.groups.iter()
    }

    pub fn get(&self, key: &GroupKey) -> Option<f64> {
        self.groups.iter().find(|g| &g.key == key).map(|g| g.value)
    }

    /// Sum of all group scalars.
    pub fn total(&self) -> f64 {
        self.groups.iter().map(|g| g.value).sum()
    }

    /// Sorts by descending scalar. Ties keep first-appearance order.
    pub fn sorted_desc(mut self) -> Self {
        self.groups.sort_by(|a, b| b.value.total_cmp(&a.value));
        self
    }

    /// The `n` largest groups, ties broken by first appearance.
    pub fn top_n(self, n: usize) -> Self {
        let mut sorted = self.sorted_desc();
        sorted.groups.truncate(n);
        sorted
    }
}

/// Record count for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    /// First day of the month.
    pub month: NaiveDate,
    pub count: usize,
}

/// One equal-width bucket of a histogram. `end` is exclusive except on the
/// last bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Share of records in a group whose flag column reads "Yes".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    pub key: Value,
    pub total: usize,
    pub positive: usize,
    /// `positive / total * 100`, rounded to one decimal.
    pub percent: f64,
}
