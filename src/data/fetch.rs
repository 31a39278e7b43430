use std::io::{Cursor, Read};

use log::{debug, info};
use zip::ZipArchive;

use crate::config::KaggleCredentials;

use super::DataError;

/// Kaggle's dataset download endpoint; the slug is appended verbatim.
pub const DOWNLOAD_URL_BASE: &str = "https://www.kaggle.com/api/v1/datasets/download";

// ---------------------------------------------------------------------------
// Archive download
// ---------------------------------------------------------------------------

/// Download the dataset archive into memory.
///
/// Non-success statuses are reported as their own error so an expired
/// credential (403) reads differently from a network failure.  No retries.
pub async fn download_archive(
    client: &reqwest::Client,
    slug: &str,
    credentials: &KaggleCredentials,
) -> Result<Vec<u8>, DataError> {
    let url = format!("{DOWNLOAD_URL_BASE}/{slug}");
    info!("downloading dataset archive from {url}");
    debug!("authenticating to Kaggle as {}", credentials.username);

    let response = client
        .get(&url)
        .header(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", credentials.key),
        )
        .send()
        .await
        .map_err(DataError::Download)?;

    let status = response.status();
    if !status.is_success() {
        return Err(DataError::DownloadStatus(status));
    }

    let body = response.bytes().await.map_err(DataError::Download)?;
    info!("downloaded {} archive bytes", body.len());
    Ok(body.to_vec())
}

// ---------------------------------------------------------------------------
// Archive extraction
// ---------------------------------------------------------------------------

/// Extract the tabular file from the downloaded archive.
///
/// The archive is read from an in-memory cursor; the first entry whose name
/// ends in `.csv` is the dataset.  Nothing is written to disk.
pub fn extract_csv(archive: &[u8]) -> Result<Vec<u8>, DataError> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(DataError::Extract)?;

    let name = zip
        .file_names()
        .find(|n| n.to_ascii_lowercase().ends_with(".csv"))
        .map(str::to_owned)
        .ok_or(DataError::NoCsvEntry)?;
    debug!("extracting archive entry '{name}'");

    let mut entry = zip.by_name(&name).map_err(DataError::Extract)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(DataError::EntryRead)?;

    info!("extracted '{name}' ({} bytes)", bytes.len());
    Ok(bytes)
}
