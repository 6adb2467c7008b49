//! SOSI interpreter-services spreadsheets: request history, the approved
//! linguist directory, and the raw staging extract.
//!
//! All three live as local workbooks in one data directory. A workbook that
//! is missing or unreadable is reported and left out; the remaining sections
//! still render.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{
    AggregationResult, HistogramBin, MonthlyCount, Op, ShareRow, aggregate, distinct_count,
    histogram, monthly_counts, numeric_mean, value_counts, yes_share,
};
use crate::datasets::{choice, visual};
use crate::filter::{FilterSpec, count_containing, date_bounds, filter, filter_date_range};
use crate::loader::{load_file, load_workbook};
use crate::normalize::{ColumnTypes, normalize};
use crate::output::write_csv;
use crate::table::{MissingColumn, Table, Value};

pub const HISTORICAL_FILE: &str = "AllDataAnalysis_20250908_194306.xlsx";
pub const LINGUISTS_FILE: &str = "SOSiApprovedLinguists (1).xlsx";
pub const STAGING_FILE: &str = "tblStaging_Raw.xlsx";

/// Sheet of the historical workbook that holds the request log.
pub const MAIN_SHEET: &str = "All Historical Data";

pub const REQUEST_DATE: &str = "Request Date";
pub const LANGUAGE: &str = "Language";
pub const HAS_LINGUIST: &str = "Has Linguist?";

pub const LINGUIST_LANGUAGES: &str = "Languages";
pub const STATE: &str = "State";
pub const PROFICIENCY: &str = "Proficiency";
pub const RATE: &str = "Rate";

pub const STATUS: &str = "Status";
pub const MEDIUM: &str = "Medium";
pub const BILLABLE_TIME: &str = "Billable time";
pub const BILLABLE_TIME_BINS: usize = 30;

/// Columns shown in the linguist directory table, when present.
pub const DIRECTORY_COLUMNS: &[&str] = &[
    LINGUIST_LANGUAGES,
    "first_name",
    "last_name",
    STATE,
    PROFICIENCY,
    RATE,
];

/// Status fragments that count a staging row as delivered.
pub const COMPLETED_TOKENS: &[&str] = &["completed", "done"];

pub fn historical_types() -> ColumnTypes {
    ColumnTypes::new()
        .date(REQUEST_DATE)
        .date("Hearing Date")
        .date("Row Added")
}

pub fn linguist_types() -> ColumnTypes {
    ColumnTypes::new().numeric(RATE)
}

pub fn staging_types() -> ColumnTypes {
    ColumnTypes::new()
        .date("Date of request")
        .date("Hearing Date")
        .date("Timestamp")
        .numeric(BILLABLE_TIME)
}

/// The three cleaned workbooks; `None` where a file could not be loaded.
#[derive(Debug, Clone, Default)]
pub struct SosiData {
    pub historical: Option<Vec<(String, Table)>>,
    pub linguists: Option<Table>,
    pub staging: Option<Table>,
}

/// What was found in the data directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadStatus {
    pub historical_sheets: Option<Vec<String>>,
    pub linguist_records: Option<usize>,
    pub staging_records: Option<usize>,
}

impl SosiData {
    /// Loads and cleans every workbook found in `dir`.
    #[tracing::instrument(skip(dir), fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Self {
        let historical = match load_workbook(&dir.join(HISTORICAL_FILE)) {
            Ok(sheets) => Some(
                sheets
                    .into_iter()
                    .map(|(name, table)| (name, normalize(&table, &historical_types())))
                    .collect(),
            ),
            Err(e) => {
                warn!(file = HISTORICAL_FILE, error = %e, "Historical data not loaded");
                None
            }
        };

        let linguists = load_one(dir, LINGUISTS_FILE, &linguist_types());
        let staging = load_one(dir, STAGING_FILE, &staging_types());

        let data = Self {
            historical,
            linguists,
            staging,
        };
        info!(status = ?data.status(), "SOSI data loaded");
        data
    }

    /// The request log sheet of the historical workbook.
    pub fn history(&self) -> Option<&Table> {
        self.historical
            .as_ref()?
            .iter()
            .find(|(name, _)| name == MAIN_SHEET)
            .map(|(_, table)| table)
    }

    pub fn status(&self) -> LoadStatus {
        LoadStatus {
            historical_sheets: self
                .historical
                .as_ref()
                .map(|sheets| sheets.iter().map(|(name, _)| name.clone()).collect()),
            linguist_records: self.linguists.as_ref().map(Table::len),
            staging_records: self.staging.as_ref().map(Table::len),
        }
    }
}

fn load_one(dir: &Path, file: &str, types: &ColumnTypes) -> Option<Table> {
    match load_file(&dir.join(file), None) {
        Ok(table) => Some(normalize(&table, types)),
        Err(e) => {
            warn!(file, error = %e, "Workbook not loaded");
            None
        }
    }
}

/// Headline numbers for the overview tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_requests: Option<usize>,
    pub available_linguists: Option<usize>,
    pub languages_supported: Option<usize>,
    pub completed_services: Option<usize>,
}

pub fn overview(data: &SosiData) -> Overview {
    let history = data.history();
    Overview {
        total_requests: history.map(Table::len),
        available_linguists: data.linguists.as_ref().map(Table::len),
        languages_supported: history.and_then(|h| distinct_count(h, LANGUAGE).ok()),
        completed_services: data
            .staging
            .as_ref()
            .and_then(|s| count_containing(s, STATUS, COMPLETED_TOKENS).ok()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageTrend {
    pub language: String,
    pub months: Vec<MonthlyCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trends {
    /// Inclusive request-date window the series were computed over.
    pub window: Option<(NaiveDate, NaiveDate)>,
    pub monthly_requests: Option<Vec<MonthlyCount>>,
    /// Monthly requests for the five most requested languages.
    pub language_trends: Option<Vec<LanguageTrend>>,
    pub availability: Option<AggregationResult>,
    /// "Yes" share of `Has Linguist?` for the ten busiest languages.
    pub availability_by_language: Option<Vec<ShareRow>>,
}

/// The last year of requests, clipped to the earliest recorded request.
pub fn default_window(history: &Table) -> Option<(NaiveDate, NaiveDate)> {
    let (first, last) = date_bounds(history, REQUEST_DATE).ok()??;
    let start = (last - Duration::days(365)).max(first);
    Some((start, last))
}

/// Applies `--from`/`--to` style overrides to [`default_window`]. When the
/// history holds no valid request date the missing end is left open.
pub fn resolve_window(
    history: &Table,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Option<(NaiveDate, NaiveDate)> {
    match (from, to) {
        (Some(start), Some(end)) => Some((start, end)),
        (None, None) => default_window(history),
        (from, to) => match default_window(history) {
            Some((start, end)) => Some((from.unwrap_or(start), to.unwrap_or(end))),
            None => {
                warn!(column = REQUEST_DATE, "No valid request dates, trend window left open-ended");
                Some((from.unwrap_or(NaiveDate::MIN), to.unwrap_or(NaiveDate::MAX)))
            }
        },
    }
}

/// Trend series over `window`, or over [`default_window`] when `None`.
pub fn trends(history: &Table, window: Option<(NaiveDate, NaiveDate)>) -> Trends {
    let window = window.or_else(|| default_window(history));
    let filtered = match window {
        Some((start, end)) => {
            filter_date_range(history, REQUEST_DATE, start, end).unwrap_or_else(|_| history.clone())
        }
        None => history.clone(),
    };

    let language_trends = visual(
        "language_trends",
        filtered.require(&[LANGUAGE, REQUEST_DATE]).and_then(|_| {
            value_counts(&filtered, LANGUAGE)?
                .top_n(5)
                .iter()
                .map(|g| -> Result<LanguageTrend, MissingColumn> {
                    let language = g.key.0.first().cloned().unwrap_or(Value::Unknown);
                    let subset = filter(&filtered, &FilterSpec::new().with(LANGUAGE, [language.clone()]));
                    Ok(LanguageTrend {
                        language: language.to_string(),
                        months: monthly_counts(&subset, REQUEST_DATE)?,
                    })
                })
                .collect()
        }),
    );

    Trends {
        window,
        monthly_requests: visual("monthly_requests", monthly_counts(&filtered, REQUEST_DATE)),
        language_trends,
        availability: visual("availability", value_counts(&filtered, HAS_LINGUIST)),
        availability_by_language: visual(
            "availability_by_language",
            yes_share(&filtered, LANGUAGE, HAS_LINGUIST).map(|mut rows| {
                rows.sort_by(|a, b| b.total.cmp(&a.total));
                rows.truncate(10);
                rows
            }),
        ),
    }
}

/// Single-choice directory filters; `None` means "All".
#[derive(Debug, Clone, Default)]
pub struct LinguistFilter {
    pub language: Option<String>,
    pub state: Option<String>,
    pub proficiency: Option<String>,
}

impl LinguistFilter {
    pub fn filter_spec(&self) -> FilterSpec {
        [
            (LINGUIST_LANGUAGES, &self.language),
            (STATE, &self.state),
            (PROFICIENCY, &self.proficiency),
        ]
        .into_iter()
        .fold(FilterSpec::new(), |spec, (column, picked)| match picked {
            Some(option) => spec.with(column, [choice(option)]),
            None => spec,
        })
    }

    pub fn apply(&self, linguists: &Table) -> Table {
        filter(linguists, &self.filter_spec())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directory {
    pub total_linguists: usize,
    pub languages_covered: Option<usize>,
    pub states_represented: Option<usize>,
    pub average_rate: Option<f64>,
    pub top_languages: Option<AggregationResult>,
    pub by_state: Option<AggregationResult>,
}

pub fn directory(linguists: &Table) -> Directory {
    Directory {
        total_linguists: linguists.len(),
        languages_covered: distinct_count(linguists, LINGUIST_LANGUAGES).ok(),
        states_represented: distinct_count(linguists, STATE).ok(),
        average_rate: numeric_mean(linguists, RATE).ok().flatten(),
        top_languages: visual(
            "linguist_languages",
            value_counts(linguists, LINGUIST_LANGUAGES).map(|r| r.top_n(15)),
        ),
        by_state: visual("linguists_by_state", value_counts(linguists, STATE)),
    }
}

/// The directory table shown on screen: [`DIRECTORY_COLUMNS`] that the
/// workbook carries. Downloads use the full table.
pub fn directory_table(linguists: &Table) -> Table {
    linguists.select(DIRECTORY_COLUMNS)
}

/// Writes the cleaned workbooks into `dir` with every column:
/// `historical_<sheet>.csv` per historical sheet (spaces become `_`),
/// `linguist_data.csv` and `staging_data.csv`. Workbooks that were not loaded
/// are skipped. Returns the files written.
pub fn export_raw(data: &SosiData, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let sheets = data.historical.iter().flatten().map(|(name, table)| {
        (format!("historical_{}.csv", name.replace(' ', "_")), table)
    });
    let singles = [
        ("linguist_data.csv", data.linguists.as_ref()),
        ("staging_data.csv", data.staging.as_ref()),
    ]
    .into_iter()
    .filter_map(|(file, table)| table.map(|t| (file.to_string(), t)));

    let mut written = Vec::new();
    for (file, table) in sheets.chain(singles) {
        let path = dir.join(file);
        write_csv(&path, table)?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "SOSI raw data exported");
    Ok(written)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagingAnalysis {
    pub total_records: usize,
    pub unique_languages: Option<usize>,
    pub unique_statuses: Option<usize>,
    pub service_mediums: Option<usize>,
    pub status_counts: Option<AggregationResult>,
    pub medium_counts: Option<AggregationResult>,
    /// Requests per (medium, language) for the five most requested languages.
    pub top_languages_by_medium: Option<AggregationResult>,
    pub average_billable_time: Option<f64>,
    /// Billable minutes in [`BILLABLE_TIME_BINS`] equal-width buckets.
    pub billable_time_distribution: Option<Vec<HistogramBin>>,
    /// Mean billable minutes for the ten languages with the longest sessions.
    pub billable_time_by_language: Option<AggregationResult>,
}

pub fn staging_analysis(staging: &Table) -> StagingAnalysis {
    let top_languages_by_medium = visual(
        "top_languages_by_medium",
        value_counts(staging, LANGUAGE).and_then(|counts| {
            let top: Vec<Value> = counts
                .top_n(5)
                .iter()
                .filter_map(|g| g.key.0.first().cloned())
                .collect();
            let mut pairs = aggregate(staging, &[MEDIUM, LANGUAGE], &Op::Count)?;
            pairs
                .groups
                .retain(|g| g.key.0.get(1).is_some_and(|lang| top.contains(lang)));
            Ok(pairs)
        }),
    );

    StagingAnalysis {
        total_records: staging.len(),
        unique_languages: distinct_count(staging, LANGUAGE).ok(),
        unique_statuses: distinct_count(staging, STATUS).ok(),
        service_mediums: distinct_count(staging, MEDIUM).ok(),
        status_counts: visual("status_counts", value_counts(staging, STATUS)),
        medium_counts: visual("medium_counts", value_counts(staging, MEDIUM)),
        top_languages_by_medium,
        average_billable_time: numeric_mean(staging, BILLABLE_TIME).ok().flatten(),
        billable_time_distribution: visual(
            "billable_time_distribution",
            histogram(staging, BILLABLE_TIME, BILLABLE_TIME_BINS),
        ),
        billable_time_by_language: visual(
            "billable_time_by_language",
            aggregate(staging, &[LANGUAGE], &Op::mean(BILLABLE_TIME)).map(|r| r.top_n(10)),
        ),
    }
}
