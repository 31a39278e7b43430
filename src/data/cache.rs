use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::sync::Mutex;

use super::model::LoanDataset;
use super::DataError;

// ---------------------------------------------------------------------------
// TTL cache for the parsed dataset
// ---------------------------------------------------------------------------

struct CacheEntry {
    stored_at: Instant,
    dataset: Arc<LoanDataset>,
}

/// Single-slot cache for the parsed dataset.
///
/// The mutex is held across the refresh, so concurrent cold requests
/// single-flight: the first caller downloads and parses, the rest wait and
/// reuse the result.  A TTL of zero disables caching (every caller
/// refreshes).
pub struct DatasetCache {
    ttl: Duration,
    slot: Mutex<Option<CacheEntry>>,
}

impl DatasetCache {
    pub fn new(ttl: Duration) -> Self {
        DatasetCache {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached dataset if it is still fresh, otherwise run
    /// `refresh` and cache its result.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Arc<LoanDataset>, DataError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<LoanDataset, DataError>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(entry) = slot.as_ref() {
            if entry.stored_at.elapsed() < self.ttl {
                debug!(
                    "serving cached dataset ({} rows, age {:?})",
                    entry.dataset.len(),
                    entry.stored_at.elapsed()
                );
                return Ok(Arc::clone(&entry.dataset));
            }
            debug!("cached dataset expired, refreshing");
        }

        let dataset = Arc::new(refresh().await?);
        info!("dataset refreshed: {} rows", dataset.len());
        *slot = Some(CacheEntry {
            stored_at: Instant::now(),
            dataset: Arc::clone(&dataset),
        });
        Ok(dataset)
    }
}
