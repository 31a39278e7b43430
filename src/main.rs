mod charts;
mod config;
mod data;
mod server;
mod stats;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use log::info;

use config::{Config, KaggleCredentials};
use data::cache::DatasetCache;
use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::from_env();

    // Local-file mode needs no Kaggle account; otherwise credentials are
    // required up front so a missing file fails at startup, not per request.
    let credentials = if config.dataset_file.is_some() {
        None
    } else {
        Some(
            KaggleCredentials::load(&config.credentials_path)
                .context("Kaggle credentials are required to download the dataset")?,
        )
    };

    let client = reqwest::Client::builder()
        .timeout(config.download_timeout)
        .build()
        .context("building HTTP client")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(AppState {
        cache: DatasetCache::new(config.cache_ttl),
        credentials,
        client,
        config,
    });

    let app = server::router(Arc::clone(&state));
    info!(
        "serving {} on http://{addr}",
        state.config.dataset_slug
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await.context("serving HTTP")?;

    Ok(())
}
