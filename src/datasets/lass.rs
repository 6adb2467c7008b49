//! Language Access Services (LASS) secret-shopper ratings.

use serde::Serialize;

use crate::analysis::{AggregationResult, Op, aggregate, distinct_count, numeric_mean, value_counts};
use crate::datasets::{choices, visual};
use crate::filter::{FilterSpec, filter};
use crate::normalize::{ColumnTypes, normalize};
use crate::score::with_scores;
use crate::table::Table;

pub const DEFAULT_URL: &str =
    "https://data.cityofnewyork.us/api/views/3m3d-zzwn/rows.csv?accessType=DOWNLOAD";

pub const AGENCY: &str = "Agency";
pub const BOROUGH: &str = "Borough";
pub const LANGUAGE: &str = "Secret Shopper Language";
pub const RATING: &str = "rating_score";

/// Survey questions whose answers feed the rating heuristic. Two of the
/// published column labels contain line breaks.
pub const SIGNAL_COLUMNS: &[&str] = &[
    "Interaction with Security Guards",
    "Interaction with Reception Staff",
    "Interaction with Frontline Staff",
    "Does Facility have signs posted notifying clients \nto the right of interpretation services?",
    "Did the Secret Shopper receive the informat\nion or service asked for?",
];

/// Normalizes a raw LASS table and attaches the `rating_score` column.
pub fn clean(raw: &Table) -> Table {
    let table = normalize(raw, &ColumnTypes::new());
    with_scores(&table, SIGNAL_COLUMNS, RATING)
}

/// Sidebar selections. An empty list leaves that column unrestricted.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub agencies: Vec<String>,
    pub boroughs: Vec<String>,
    pub languages: Vec<String>,
}

impl Selection {
    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .with_selection(AGENCY, &choices(&self.agencies))
            .with_selection(BOROUGH, &choices(&self.boroughs))
            .with_selection(LANGUAGE, &choices(&self.languages))
    }

    pub fn apply(&self, table: &Table) -> Table {
        filter(table, &self.filter_spec())
    }
}

/// Key performance indicators. `None` renders as "N/A".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_agencies: Option<usize>,
    pub languages_supported: Option<usize>,
    pub average_rating: Option<f64>,
    pub total_services: usize,
}

pub fn summarize(table: &Table) -> Summary {
    if table.is_empty() {
        return Summary {
            total_agencies: None,
            languages_supported: None,
            average_rating: None,
            total_services: 0,
        };
    }
    Summary {
        total_agencies: distinct_count(table, AGENCY).ok(),
        languages_supported: distinct_count(table, LANGUAGE).ok(),
        average_rating: numeric_mean(table, RATING).ok().flatten(),
        total_services: table.len(),
    }
}

/// Chart series. A `None` series is skipped by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charts {
    pub top_agencies: Option<AggregationResult>,
    pub top_languages: Option<AggregationResult>,
    pub boroughs: Option<AggregationResult>,
    /// Record count per rating value, lowest rating first.
    pub rating_distribution: Option<AggregationResult>,
}

pub fn charts(table: &Table, top: usize) -> Charts {
    Charts {
        top_agencies: visual("top_agencies", value_counts(table, AGENCY).map(|r| r.top_n(top))),
        top_languages: visual("top_languages", value_counts(table, LANGUAGE).map(|r| r.top_n(top))),
        boroughs: visual("boroughs", value_counts(table, BOROUGH)),
        rating_distribution: visual(
            "rating_distribution",
            aggregate(table, &[RATING], &Op::Count).map(|mut r| {
                r.groups.sort_by(|a, b| {
                    let ka = a.key.0.first().and_then(|v| v.as_number()).unwrap_or(f64::MIN);
                    let kb = b.key.0.first().and_then(|v| v.as_number()).unwrap_or(f64::MIN);
                    ka.total_cmp(&kb)
                });
                r
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::GroupKey;
    use crate::datasets::options;
    use crate::parser::parse_csv;
    use crate::table::Value;

    fn raw() -> Table {
        Table::from_rows(
            &[
                " Agency ",
                "Borough",
                "Secret Shopper Language",
                "Interaction with Security Guards",
                "Did the Secret Shopper receive the informat\nion or service asked for?",
            ],
            vec![
                vec!["DOE".into(), "Queens".into(), "Spanish".into(), "Yes".into(), "Yes".into()],
                vec!["HRA".into(), "Bronx".into(), "Spanish".into(), "No".into(), Value::Empty],
                vec!["DOE".into(), Value::Empty, "Korean".into(), Value::Empty, "Good".into()],
            ],
        )
    }

    #[test]
    fn test_clean_scores_every_row() {
        let table = clean(&raw());
        let scores: Vec<f64> = table
            .column(RATING)
            .unwrap()
            .filter_map(Value::as_number)
            .collect();
        assert_eq!(scores, vec![4.0, 2.5, 3.5]);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean(&raw());
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn test_selection_empty_lists_keep_everything() {
        let table = clean(&raw());
        assert_eq!(Selection::default().apply(&table).len(), 3);

        let selection = Selection {
            agencies: vec!["DOE".to_string()],
            ..Default::default()
        };
        assert_eq!(selection.apply(&table).len(), 2);
    }

    #[test]
    fn test_unknown_borough_is_offered_and_selectable() {
        let raw = parse_csv(b"Agency,Borough\nDOE,Queens\nHRA,\n", "inline").unwrap();
        let table = clean(&raw);
        assert_eq!(options(&table, BOROUGH).unwrap(), vec!["Queens", "Unknown"]);

        let selection = Selection {
            boroughs: vec!["Unknown".to_string()],
            ..Default::default()
        };
        let selected = selection.apply(&table);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected.records()[0].get(AGENCY).unwrap(), &Value::from("HRA"));
    }

    #[test]
    fn test_summary() {
        let summary = summarize(&clean(&raw()));
        assert_eq!(summary.total_agencies, Some(2));
        assert_eq!(summary.languages_supported, Some(2));
        assert_eq!(summary.average_rating, Some(10.0 / 3.0));
        assert_eq!(summary.total_services, 3);
    }

    #[test]
    fn test_summary_of_empty_selection_is_not_available() {
        let table = clean(&raw());
        let nothing = Selection {
            boroughs: vec!["Manhattan".to_string()],
            ..Default::default()
        }
        .apply(&table);
        let summary = summarize(&nothing);
        assert_eq!(summary.total_agencies, None);
        assert_eq!(summary.total_services, 0);
    }

    #[test]
    fn test_charts() {
        let charts = charts(&clean(&raw()), 10);
        let agencies = charts.top_agencies.unwrap();
        assert_eq!(agencies.get(&GroupKey::single("DOE")), Some(2.0));
        assert_eq!(charts.boroughs.unwrap().get(&GroupKey(vec![Value::Unknown])), Some(1.0));

        let ratings: Vec<String> = charts
            .rating_distribution
            .unwrap()
            .iter()
            .map(|g| g.key.to_string())
            .collect();
        assert_eq!(ratings, vec!["2.5", "3.5", "4"]);
    }

    #[test]
    fn test_charts_skip_missing_columns() {
        let table = Table::from_rows(&["Agency"], vec![vec!["DOE".into()]]);
        let charts = charts(&table, 10);
        assert!(charts.top_agencies.is_some());
        assert!(charts.top_languages.is_none());
        assert!(charts.rating_distribution.is_none());
    }
}
