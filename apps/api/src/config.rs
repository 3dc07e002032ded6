use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; `DATABASE_URL` switches storage to Postgres.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    pub llm_timeout: Duration,
    /// Request body limit for uploads.
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            data_dir: optional_env("DATA_DIR")
                .unwrap_or_else(|| "./data".to_string())
                .into(),
            llm_timeout: Duration::from_secs(
                optional_env("LLM_TIMEOUT_SECS")
                    .unwrap_or_else(|| "120".to_string())
                    .parse::<u64>()
                    .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            max_upload_bytes: upload_limit_bytes(optional_env("MAX_UPLOAD_MB"))?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Megabytes to bytes. Uploaded PDFs routinely exceed axum's 2 MB default, so
/// the limit defaults to 10 MB.
fn upload_limit_bytes(megabytes: Option<String>) -> Result<usize> {
    let mb = match megabytes {
        Some(v) => v
            .parse::<usize>()
            .ok()
            .filter(|mb| *mb > 0)
            .context("MAX_UPLOAD_MB must be a positive whole number")?,
        None => 10,
    };
    Ok(mb * 1024 * 1024)
}

/// Unset and blank variables both read as `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_limit_defaults_to_ten_megabytes() {
        assert_eq!(upload_limit_bytes(None).unwrap(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_upload_limit_from_megabytes() {
        assert_eq!(upload_limit_bytes(Some("25".to_string())).unwrap(), 25 * 1024 * 1024);
    }

    #[test]
    fn test_upload_limit_rejects_zero_and_garbage() {
        assert!(upload_limit_bytes(Some("0".to_string())).is_err());
        assert!(upload_limit_bytes(Some("ten".to_string())).is_err());
    }
}
