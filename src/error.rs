//! Failures that cross the loader boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Why a source could not be turned into a table.
///
/// This is the only failure the pipeline propagates; cell-level coercion
/// problems are absorbed into marker values by the normalizer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("cannot open workbook {}: {source}", path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("sheet '{sheet}' not found in {}", path.display())]
    SheetNotFound { path: PathBuf, sheet: String },

    #[error("unsupported file type: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("{origin} contains no data rows")]
    Empty { origin: String },
}
