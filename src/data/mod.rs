//! Data layer: core types, acquisition, parsing, and caching.
//!
//! Architecture:
//! ```text
//!  Kaggle ZIP archive (HTTPS, bearer auth)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  fetch    │  download bytes → extract CSV entry (in memory)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse CSV → LoanDataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  cache    │  TTL slot, single-flight refresh
//!   └──────────┘
//! ```
//!
//! Nothing touches the filesystem: the archive is held in memory for the
//! lifetime of one refresh, so concurrent requests never contend on shared
//! scratch files.

pub mod cache;
pub mod fetch;
pub mod loader;
pub mod model;

use thiserror::Error;

/// Everything that can go wrong between "refresh requested" and "dataset in
/// memory".  Each variant maps to one short plain-text message at the HTTP
/// boundary.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("dataset download failed: {0}")]
    Download(#[source] reqwest::Error),

    #[error("dataset download failed: HTTP {0}")]
    DownloadStatus(reqwest::StatusCode),

    #[error("archive extraction failed: {0}")]
    Extract(#[source] zip::result::ZipError),

    #[error("archive contains no CSV entry")]
    NoCsvEntry,

    #[error("reading archive entry failed: {0}")]
    EntryRead(#[source] std::io::Error),

    #[error("CSV parse failed: {0}")]
    Parse(#[source] csv::Error),

    #[error("CSV parse failed at row {row}: {source}")]
    ParseRow {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("dataset is missing expected column '{0}'")]
    MissingColumn(String),

    #[error("reading local dataset file failed: {0}")]
    LocalFile(#[source] std::io::Error),

    #[error("no Kaggle credentials configured")]
    MissingCredentials,
}
