//! Source resolution and loading.
//!
//! A [`Loader`] turns a [`Source`] into a raw [`Table`], going through an
//! injected [`TtlCache`] so repeated loads within the TTL window reuse the
//! first result.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::{DEFAULT_TTL, TtlCache};
use crate::error::LoadError;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::parser::{parse_csv, parse_sheet, parse_workbook};
use crate::table::Table;

/// Where a table comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// Remote CSV fetched with HTTP GET.
    Url(String),
    /// Local CSV or spreadsheet. `sheet` selects a worksheet by name; the
    /// first sheet is used when it is `None`.
    File { path: PathBuf, sheet: Option<String> },
}

impl Source {
    /// Strings starting with `http` are URLs, anything else is a file path.
    pub fn parse(descriptor: &str) -> Self {
        if descriptor.starts_with("http") {
            Source::Url(descriptor.to_string())
        } else {
            Source::file(descriptor)
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Source::File {
            path: path.into(),
            sheet: None,
        }
    }

    pub fn sheet(path: impl Into<PathBuf>, sheet: &str) -> Self {
        Source::File {
            path: path.into(),
            sheet: Some(sheet.to_string()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::File { path, sheet: None } => write!(f, "{}", path.display()),
            Source::File {
                path,
                sheet: Some(sheet),
            } => write!(f, "{} [{}]", path.display(), sheet),
        }
    }
}

pub struct Loader<C = BasicClient> {
    client: C,
    cache: Arc<TtlCache<Source, Table>>,
    ttl: Duration,
}

impl<C: HttpClient> Loader<C> {
    /// Creates a loader with a private cache and the default one-hour TTL.
    pub fn new(client: C) -> Self {
        Self {
            client,
            cache: Arc::new(TtlCache::new()),
            ttl: DEFAULT_TTL,
        }
    }

    /// Uses a shared cache and validity window instead of the defaults.
    pub fn with_cache(mut self, cache: Arc<TtlCache<Source, Table>>, ttl: Duration) -> Self {
        self.cache = cache;
        self.ttl = ttl;
        self
    }

    /// Loads `source`, serving it from the cache while the entry is fresh.
    ///
    /// The returned table is exactly what was parsed; no cleaning is applied.
    ///
    /// # Errors
    ///
    /// Any fetch, read or parse failure, or a source without data rows.
    #[tracing::instrument(skip(self, source), fields(source = %source))]
    pub async fn load(&self, source: &Source) -> Result<Arc<Table>, LoadError> {
        let result = self
            .cache
            .get_or_fetch(source, self.ttl, || load_uncached(&self.client, source))
            .await;

        match &result {
            Ok(table) => info!(rows = table.len(), columns = table.columns().len(), "Source loaded"),
            Err(e) => warn!(error = %e, "Source failed to load"),
        }
        result
    }
}

/// Loads `source` without consulting any cache.
pub async fn load_uncached<C: HttpClient + ?Sized>(client: &C, source: &Source) -> Result<Table, LoadError> {
    match source {
        Source::Url(url) => {
            let body = fetch_bytes(client, url).await?;
            parse_csv(&body, url)
        }
        Source::File { path, sheet } => load_file(path, sheet.as_deref()),
    }
}

/// Reads a local CSV or spreadsheet. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`, `.txt` – comma separated, header row first
/// * `.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods` – one worksheet
pub fn load_file(path: &Path, sheet: Option<&str>) -> Result<Table, LoadError> {
    match extension(path).as_str() {
        "csv" | "txt" => {
            let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_csv(&bytes, &path.display().to_string())
        }
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
            ensure_readable(path)?;
            parse_sheet(path, sheet)
        }
        _ => Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Reads every non-empty sheet of a workbook as `(sheet name, table)`.
pub fn load_workbook(path: &Path) -> Result<Vec<(String, Table)>, LoadError> {
    match extension(path).as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
            ensure_readable(path)?;
            parse_workbook(path)
        }
        _ => Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn ensure_readable(path: &Path) -> Result<(), LoadError> {
    std::fs::metadata(path)
        .map(|_| ())
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}
