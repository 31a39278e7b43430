use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use log::warn;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Kaggle credentials
// ---------------------------------------------------------------------------

/// The standard `kaggle.json` credential file.  Only the API key is sent
/// upstream; the username is logged for traceability.
#[derive(Debug, Clone, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl KaggleCredentials {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading credentials file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing credentials file {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Service configuration
// ---------------------------------------------------------------------------

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to serve on (`PORT`).
    pub port: u16,
    /// Directory of the presentation client's static assets (`STATIC_DIR`).
    pub static_dir: PathBuf,
    /// Path of the Kaggle credentials file (`KAGGLE_CREDENTIALS`).
    pub credentials_path: PathBuf,
    /// Kaggle dataset slug to download (`DATASET_SLUG`).
    pub dataset_slug: String,
    /// How long a downloaded dataset stays cached (`CACHE_TTL_SECS`,
    /// 0 disables caching).
    pub cache_ttl: Duration,
    /// Upstream download timeout (`DOWNLOAD_TIMEOUT_SECS`).
    pub download_timeout: Duration,
    /// Optional local CSV to serve instead of downloading (`DATASET_FILE`),
    /// for offline development against a generated sample.
    pub dataset_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            static_dir: PathBuf::from("public"),
            credentials_path: PathBuf::from("kaggle.json"),
            dataset_slug: "taweilo/loan-approval-classification-data".to_string(),
            cache_ttl: Duration::from_secs(300),
            download_timeout: Duration::from_secs(60),
            dataset_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            port: env_or("PORT", defaults.port),
            static_dir: std::env::var_os("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            credentials_path: std::env::var_os("KAGGLE_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_path),
            dataset_slug: std::env::var("DATASET_SLUG").unwrap_or(defaults.dataset_slug),
            cache_ttl: Duration::from_secs(env_or(
                "CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )),
            download_timeout: Duration::from_secs(env_or(
                "DOWNLOAD_TIMEOUT_SECS",
                defaults.download_timeout.as_secs(),
            )),
            dataset_file: std::env::var_os("DATASET_FILE").map(PathBuf::from),
        }
    }
}

/// Parse an environment variable, falling back to the default (with a
/// warning) when it is set but unparsable.
fn env_or<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("ignoring unparsable {name}={raw}, using {default}");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_parse_the_kaggle_json_shape() {
        let parsed: KaggleCredentials =
            serde_json::from_str(r#"{"username":"demo","key":"abc123"}"#).unwrap();
        assert_eq!(parsed.username, "demo");
        assert_eq!(parsed.key, "abc123");
    }

    #[test]
    fn defaults_point_at_the_loan_dataset() {
        let config = Config::default();
        assert_eq!(
            config.dataset_slug,
            "taweilo/loan-approval-classification-data"
        );
        assert_eq!(config.port, 3000);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert!(config.dataset_file.is_none());
    }
}
