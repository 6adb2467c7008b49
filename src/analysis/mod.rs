//! Grouping and reduction of cleaned tables.
//!
//! [`aggregate`] is the generic group-by used by every chart; the remaining
//! helpers cover the dashboard metrics that are not plain group-bys
//! (distinct counts, monthly buckets, histograms, "Yes" shares).

pub mod aggregate;
pub mod types;
pub mod utility;

pub use aggregate::{
    aggregate, distinct_count, histogram, monthly_counts, numeric_mean, value_counts, yes_share,
};
pub use types::{AggregationResult, GroupKey, GroupValue, HistogramBin, MonthlyCount, Op, ShareRow};
