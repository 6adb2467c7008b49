//! CLI entry point for the language access dashboards.
//!
//! Provides subcommands for the LASS ratings and LEP population feeds, the
//! SOSI interpreter-services workbooks, and a generic clean-and-export of any
//! CSV or spreadsheet source.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use language_access::{
    cache::TtlCache,
    config::Settings,
    datasets::{lass, lep, options, sosi},
    loader::{Loader, Source},
    normalize::{ColumnTypes, normalize},
    output::{print_json, write_csv, write_csv_gz},
    table::Table,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "language_access")]
#[command(about = "Clean and summarize language access datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize LASS secret-shopper ratings
    Lass {
        /// Keep only these agencies (repeatable)
        #[arg(long)]
        agency: Vec<String>,

        /// Keep only these boroughs (repeatable)
        #[arg(long)]
        borough: Vec<String>,

        /// Keep only these secret-shopper languages (repeatable)
        #[arg(long)]
        language: Vec<String>,

        /// Number of bars in the top-N charts
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Write the filtered table as CSV
        #[arg(long)]
        export: Option<PathBuf>,

        /// Gzip compress the export
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Summarize LEP population estimates
    Lep {
        /// Number of languages in the population chart
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Write the cleaned table as CSV
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Summarize the SOSI interpreter-services workbooks
    Sosi {
        /// Directory holding the workbooks (defaults to SOSI_DATA_DIR)
        #[arg(short = 'd', long)]
        data_dir: Option<PathBuf>,

        /// First request date of the trend window (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last request date of the trend window (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Directory filter: linguist language
        #[arg(long)]
        language: Option<String>,

        /// Directory filter: state
        #[arg(long)]
        state: Option<String>,

        /// Directory filter: proficiency
        #[arg(long)]
        proficiency: Option<String>,

        /// Write the filtered linguist table, all columns, as CSV
        #[arg(long)]
        export_linguists: Option<PathBuf>,

        /// Write every loaded workbook as CSV into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
    /// Clean any CSV or spreadsheet source and write it as CSV
    Export {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// CSV file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Worksheet to read from a spreadsheet (first sheet otherwise)
        #[arg(long)]
        sheet: Option<String>,

        /// Columns to coerce to numbers (repeatable)
        #[arg(long)]
        numeric: Vec<String>,

        /// Columns to coerce to dates (repeatable)
        #[arg(long)]
        date: Vec<String>,

        /// Gzip compress the output
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/language_access.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("language_access.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let cache = Arc::new(TtlCache::new());
    let loader = Loader::new(settings.http_client()?).with_cache(cache, settings.cache_ttl);

    match cli.command {
        Commands::Lass {
            agency,
            borough,
            language,
            top,
            export,
            gzip,
        } => {
            let raw = loader.load(&Source::parse(&settings.lass_url)).await?;
            let table = lass::clean(&raw);

            print_json(
                "lass_options",
                &[
                    (lass::AGENCY, options(&table, lass::AGENCY).unwrap_or_default()),
                    (lass::BOROUGH, options(&table, lass::BOROUGH).unwrap_or_default()),
                    (lass::LANGUAGE, options(&table, lass::LANGUAGE).unwrap_or_default()),
                ],
            )?;

            let selection = lass::Selection {
                agencies: agency,
                boroughs: borough,
                languages: language,
            };
            let filtered = selection.apply(&table);
            info!(total = table.len(), selected = filtered.len(), "LASS selection applied");

            print_json("lass_summary", &lass::summarize(&filtered))?;
            print_json("lass_charts", &lass::charts(&filtered, top))?;

            if let Some(path) = export {
                export_table(&path, &filtered, gzip)?;
            }
        }
        Commands::Lep { top, export } => {
            let raw = loader.load(&Source::parse(&settings.lep_url)).await?;
            let table = lep::clean(&raw);

            print_json("lep_charts", &lep::charts(&table, top))?;

            if let Some(path) = export {
                export_table(&path, &table, false)?;
            }
        }
        Commands::Sosi {
            data_dir,
            from,
            to,
            language,
            state,
            proficiency,
            export_linguists,
            export_dir,
        } => {
            let dir = data_dir.unwrap_or_else(|| settings.sosi_data_dir.clone());
            let data = sosi::SosiData::load(&dir);

            print_json("sosi_status", &data.status())?;
            print_json("sosi_overview", &sosi::overview(&data))?;

            match data.history() {
                Some(history) => {
                    let window = sosi::resolve_window(history, from, to);
                    print_json("sosi_trends", &sosi::trends(history, window))?;
                }
                None => warn!(sheet = sosi::MAIN_SHEET, "No request history, trends skipped"),
            }

            if let Some(linguists) = &data.linguists {
                let selected = sosi::LinguistFilter {
                    language,
                    state,
                    proficiency,
                }
                .apply(linguists);
                print_json("sosi_directory", &sosi::directory(&selected))?;

                if let Some(path) = export_linguists {
                    export_table(&path, &selected, false)?;
                }
            }

            if let Some(staging) = &data.staging {
                print_json("sosi_staging", &sosi::staging_analysis(staging))?;
            }

            if let Some(out) = export_dir {
                sosi::export_raw(&data, &out)?;
            }
        }
        Commands::Export {
            source,
            output,
            sheet,
            numeric,
            date,
            gzip,
        } => {
            let source = match (Source::parse(&source), sheet) {
                (Source::File { path, .. }, Some(sheet)) => Source::sheet(path, &sheet),
                (source, _) => source,
            };
            let raw = loader.load(&source).await?;
            let cleaned = normalize(&raw, &ColumnTypes { numeric, date });
            export_table(&output, &cleaned, gzip)?;
        }
    }

    Ok(())
}

fn export_table(path: &Path, table: &Table, gzip: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if gzip {
        write_csv_gz(path, table)?;
    } else {
        write_csv(path, table)?;
    }
    info!(path = %path.display(), rows = table.len(), gzip, "Table exported");
    Ok(())
}

