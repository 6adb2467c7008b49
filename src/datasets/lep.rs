//! Limited English Proficiency (LEP) population estimates.

use serde::Serialize;

use crate::analysis::{AggregationResult, Op, aggregate};
use crate::datasets::visual;
use crate::normalize::{ColumnTypes, normalize};
use crate::table::Table;

pub const DEFAULT_URL: &str =
    "https://data.cityofnewyork.us/api/views/ajin-gkbp/rows.csv?accessType=DOWNLOAD";

pub const BOROUGH: &str = "Borough";
pub const LANGUAGE: &str = "Language";
pub const POPULATION: &str = "LEP Population (Estimate)";

pub fn column_types() -> ColumnTypes {
    ColumnTypes::new().numeric(POPULATION)
}

/// Normalizes a raw LEP table; the population estimate becomes numeric.
pub fn clean(raw: &Table) -> Table {
    normalize(raw, &column_types())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charts {
    /// Population sum per borough, boroughs in alphabetical order.
    pub population_by_borough: Option<AggregationResult>,
    /// Largest language populations.
    pub top_languages: Option<AggregationResult>,
}

pub fn charts(table: &Table, top: usize) -> Charts {
    Charts {
        population_by_borough: visual(
            "population_by_borough",
            aggregate(table, &[BOROUGH], &Op::sum(POPULATION)).map(|mut r| {
                r.groups.sort_by_key(|g| g.key.to_string());
                r
            }),
        ),
        top_languages: visual(
            "top_languages_by_population",
            aggregate(table, &[LANGUAGE], &Op::sum(POPULATION)).map(|r| r.top_n(top)),
        ),
    }
}
