use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use language_access::datasets::sosi::{self, LinguistFilter, SosiData};
use language_access::error::LoadError;
use language_access::loader::load_file;
use language_access::output::write_csv;
use language_access::table::Value;

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sosi")
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_load_reports_every_workbook() {
    let data = SosiData::load(&data_dir());
    let status = data.status();

    // The empty "Notes" sheet is skipped.
    assert_eq!(
        status.historical_sheets,
        Some(vec!["All Historical Data".to_string(), "Summary".to_string()])
    );
    assert_eq!(status.linguist_records, Some(5));
    assert_eq!(status.staging_records, Some(5));
}

#[test]
fn test_missing_directory_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let data = SosiData::load(dir.path());

    assert!(data.history().is_none());
    assert!(data.linguists.is_none());

    let overview = sosi::overview(&data);
    assert_eq!(overview.total_requests, None);
    assert_eq!(overview.completed_services, None);
}

#[test]
fn test_overview() {
    let overview = sosi::overview(&SosiData::load(&data_dir()));

    assert_eq!(overview.total_requests, Some(8));
    assert_eq!(overview.available_linguists, Some(5));
    assert_eq!(overview.languages_supported, Some(4));
    assert_eq!(overview.completed_services, Some(3));
}

#[test]
fn test_history_trends() {
    let data = SosiData::load(&data_dir());
    let history = data.history().unwrap();

    assert_eq!(
        sosi::default_window(history),
        Some((day(2024, 11, 4), day(2025, 1, 21)))
    );

    let trends = sosi::trends(history, None);
    let counts: Vec<usize> = trends
        .monthly_requests
        .unwrap()
        .iter()
        .map(|m| m.count)
        .collect();
    assert_eq!(counts, vec![3, 2, 2]);

    let languages = trends.language_trends.unwrap();
    assert_eq!(languages.len(), 4);
    assert_eq!(languages[0].language, "Spanish");
    assert_eq!(languages[0].months.len(), 3);

    let share = trends.availability_by_language.unwrap();
    assert_eq!(share[0].key, Value::from("Spanish"));
    assert_eq!(share[0].percent, 75.0);
}

#[test]
fn test_linguist_directory() {
    let data = SosiData::load(&data_dir());
    let linguists = data.linguists.as_ref().unwrap();

    let all = sosi::directory(linguists);
    assert_eq!(all.total_linguists, 5);
    assert_eq!(all.languages_covered, Some(4));
    assert_eq!(all.states_represented, Some(3));
    assert_eq!(all.average_rate, Some(42.5));

    let ny = LinguistFilter {
        state: Some("NY".to_string()),
        ..Default::default()
    }
    .apply(linguists);
    assert_eq!(ny.len(), 3);

    let table = sosi::directory_table(&ny);
    assert_eq!(
        table.columns(),
        &["Languages", "first_name", "last_name", "State", "Proficiency", "Rate"]
    );
}

#[test]
fn test_staging_analysis() {
    let data = SosiData::load(&data_dir());
    let analysis = sosi::staging_analysis(data.staging.as_ref().unwrap());

    assert_eq!(analysis.total_records, 5);
    assert_eq!(analysis.unique_statuses, Some(4));
    assert_eq!(analysis.service_mediums, Some(3));
    assert_eq!(analysis.average_billable_time, Some(55.0));
    assert!(analysis.top_languages_by_medium.is_some());

    let distribution = analysis.billable_time_distribution.unwrap();
    assert_eq!(distribution.len(), sosi::BILLABLE_TIME_BINS);
    assert_eq!(distribution.iter().map(|b| b.count).sum::<usize>(), 3);
    assert_eq!((distribution[0].start, distribution[0].count), (30.0, 1));
    assert_eq!(distribution[7].count, 1);
    assert_eq!((distribution[29].end, distribution[29].count), (90.0, 1));
}

#[test]
fn test_named_sheet_selection() {
    let path = data_dir().join(sosi::HISTORICAL_FILE);

    let first = load_file(&path, None).unwrap();
    assert!(first.has_column("Request Date"));

    let err = language_access::parser::parse_sheet(&path, Some("Nope")).unwrap_err();
    assert!(matches!(err, LoadError::SheetNotFound { .. }));

    let sheet = language_access::parser::parse_sheet(&path, Some("Summary")).unwrap();
    assert_eq!(sheet.records()[0].get("Value").unwrap(), &Value::Number(8.0));
}

#[test]
fn test_filtered_linguist_download_keeps_every_column() {
    let data = SosiData::load(&data_dir());
    let selected = LinguistFilter {
        state: Some("NY".to_string()),
        ..Default::default()
    }
    .apply(data.linguists.as_ref().unwrap());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filtered_linguists.csv");
    write_csv(&path, &selected).unwrap();

    let reloaded = load_file(&path, None).unwrap();
    assert_eq!(
        reloaded.columns(),
        &["Languages", "first_name", "last_name", "State", "Proficiency", "Rate", "Phone"]
    );
    assert_eq!(reloaded.len(), 3);
}

#[test]
fn test_export_raw_writes_every_workbook() {
    let data = SosiData::load(&data_dir());
    let dir = tempfile::tempdir().unwrap();

    let written = sosi::export_raw(&data, dir.path()).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "historical_All_Historical_Data.csv",
            "historical_Summary.csv",
            "linguist_data.csv",
            "staging_data.csv",
        ]
    );

    let linguists = load_file(&dir.path().join("linguist_data.csv"), None).unwrap();
    assert!(linguists.has_column("Phone"));
    assert_eq!(linguists.len(), 5);

    let history = load_file(&dir.path().join("historical_All_Historical_Data.csv"), None).unwrap();
    assert_eq!(history.len(), 8);
}
