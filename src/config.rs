use anyhow::{bail, Context, Result};
use std::env;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_SESSION_DB: &str = "rustoria.db";
pub const DEFAULT_LOG_FILE: &str = "rustoria.log";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TICK_RATE: f64 = 30.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub session_db: String,
    pub log_file: String,
    pub request_timeout_secs: u64,
    pub tick_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_db: DEFAULT_SESSION_DB.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

impl Config {
    /// Reads `RUSTORIA_*` variables, after loading a `.env` file if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("RUSTORIA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = normalize_url(&api_url)?;

        let session_db = lookup("RUSTORIA_SESSION_DB").unwrap_or_else(|| DEFAULT_SESSION_DB.to_string());
        let log_file = lookup("RUSTORIA_LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
        let request_timeout_secs = lookup("RUSTORIA_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let tick_rate = lookup("RUSTORIA_TICK_RATE")
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|rate| *rate > 0.0)
            .unwrap_or(DEFAULT_TICK_RATE);

        Ok(Self {
            api_url,
            session_db,
            log_file,
            request_timeout_secs,
            tick_rate,
        })
    }
}

fn normalize_url(raw: &str) -> Result<String> {
    let url = reqwest::Url::parse(raw.trim()).with_context(|| format!("Invalid RUSTORIA_API_URL: {raw}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("RUSTORIA_API_URL must be http or https, got {}", url.scheme());
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
