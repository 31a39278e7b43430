use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::charts::{self, ChartError, ChartImages, ChartKind};
use crate::config::{Config, KaggleCredentials};
use crate::data::cache::DatasetCache;
use crate::data::model::{LoanDataset, Record};
use crate::data::{fetch, loader, DataError};
use crate::stats::{StatsError, StatsReport, SummaryStats};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub config: Config,
    /// Absent only in local-file mode (`DATASET_FILE`).
    pub credentials: Option<KaggleCredentials>,
    pub client: reqwest::Client,
    pub cache: DatasetCache,
}

/// Build the service router: the three JSON endpoints plus the static
/// presentation client.
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    Router::new()
        .route("/api/dataset", get(dataset_handler))
        .route("/api/statistics", get(statistics_handler))
        .route("/api/chart-images", get(chart_images_handler))
        .route("/api/chart-images/:kind", get(single_chart_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error boundary
// ---------------------------------------------------------------------------

/// Request-handler boundary error: every failure from the pipeline becomes
/// an HTTP 500 with a short plain-text message.
#[derive(Debug)]
pub enum AppError {
    Data(DataError),
    Stats(StatsError),
    Chart(ChartError),
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        AppError::Data(err)
    }
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        AppError::Stats(err)
    }
}

impl From<ChartError> for AppError {
    fn from(err: ChartError) -> Self {
        AppError::Chart(err)
    }
}

impl AppError {
    fn message(&self) -> String {
        match self {
            AppError::Data(err) => err.to_string(),
            AppError::Stats(err) => err.to_string(),
            AppError::Chart(err) => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.message();
        error!("request failed: {message}");
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

// ---------------------------------------------------------------------------
// Dataset acquisition (behind the cache)
// ---------------------------------------------------------------------------

async fn load_dataset(state: &AppState) -> Result<Arc<LoanDataset>, DataError> {
    state
        .cache
        .get_or_refresh(|| refresh_dataset(state))
        .await
}

/// One full refresh: download → extract → parse, all in memory.  With
/// `DATASET_FILE` set, the local CSV replaces the download.
async fn refresh_dataset(state: &AppState) -> Result<LoanDataset, DataError> {
    if let Some(path) = &state.config.dataset_file {
        info!("loading dataset from local file {}", path.display());
        let bytes = std::fs::read(path).map_err(DataError::LocalFile)?;
        return loader::parse_csv(&bytes);
    }

    let credentials = state
        .credentials
        .as_ref()
        .ok_or(DataError::MissingCredentials)?;
    let archive =
        fetch::download_archive(&state.client, &state.config.dataset_slug, credentials).await?;
    let csv_bytes = fetch::extract_csv(&archive)?;
    loader::parse_csv(&csv_bytes)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /api/dataset` — the full decoded table as a JSON array of rows.
async fn dataset_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Record>>, AppError> {
    let dataset = load_dataset(&state).await?;
    Ok(Json(dataset.records.clone()))
}

/// `GET /api/statistics` — the summary bundle, formatted for display.
async fn statistics_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsReport>, AppError> {
    let dataset = load_dataset(&state).await?;
    let stats = SummaryStats::compute(&dataset)?;
    Ok(Json(stats.report()))
}

/// `GET /api/chart-images` — the three fixed charts as base64 PNGs.
async fn chart_images_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChartImages>, AppError> {
    let dataset = load_dataset(&state).await?;
    let images = charts::render_all(&dataset)?;
    Ok(Json(images))
}

#[derive(Debug, Serialize)]
struct SingleChart {
    chart: String,
}

/// `GET /api/chart-images/{kind}` — one chart by selector; an unknown
/// selector fails with the distinct unknown-chart-type error.
async fn single_chart_handler(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<SingleChart>, AppError> {
    let kind: ChartKind = kind.parse().map_err(AppError::Chart)?;
    let dataset = load_dataset(&state).await?;
    let png = charts::render_chart(&dataset, kind)?;
    Ok(Json(SingleChart {
        chart: charts::encode_base64(&png),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_internal_server_error() {
        let cases: Vec<AppError> = vec![
            AppError::Data(DataError::NoCsvEntry),
            AppError::Stats(StatsError::EmptyDataset),
            AppError::Chart(ChartError::UnknownKind("nope".into())),
        ];
        for err in cases {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn error_messages_name_the_failure() {
        assert_eq!(
            AppError::Data(DataError::NoCsvEntry).message(),
            "archive contains no CSV entry"
        );
        assert_eq!(
            AppError::Chart(ChartError::UnknownKind("pie3d".into())).message(),
            "unknown chart type: pie3d"
        );
        assert_eq!(
            AppError::Stats(StatsError::EmptyDataset).message(),
            "cannot compute statistics over an empty dataset"
        );
    }
}
