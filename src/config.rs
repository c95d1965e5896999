use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub session_store_dir: PathBuf,
    pub report_output_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub http_get_retries: u32,
    pub upgrade_poll_interval_ms: u64,
    pub upgrade_poll_max_attempts: u32,
    pub admin_token: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let api_base_url = get_env("API_BASE_URL")?;
        Url::parse(&api_base_url)
            .map_err(|e| Error::Config(format!("Invalid value for API_BASE_URL: {}", e)))?;

        Ok(Self {
            api_base_url,
            session_store_dir: PathBuf::from(get_env_or("SESSION_STORE_DIR", ".quiz-session")),
            report_output_dir: PathBuf::from(get_env_or("REPORT_OUTPUT_DIR", "reports")),
            http_timeout_secs: get_env_parse_or("HTTP_TIMEOUT_SECS", 30)?,
            http_get_retries: get_env_parse_or("HTTP_GET_RETRIES", 2)?,
            upgrade_poll_interval_ms: get_env_parse_or("UPGRADE_POLL_INTERVAL_MS", 2000)?,
            upgrade_poll_max_attempts: get_env_parse_or("UPGRADE_POLL_MAX_ATTEMPTS", 10)?,
            admin_token: env::var("ADMIN_TOKEN").ok().filter(|t| !t.trim().is_empty()),
        })
    }

    /// Defaults for everything except the backend address.
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            session_store_dir: PathBuf::from(".quiz-session"),
            report_output_dir: PathBuf::from("reports"),
            http_timeout_secs: 30,
            http_get_retries: 2,
            upgrade_poll_interval_ms: 2000,
            upgrade_poll_max_attempts: 10,
            admin_token: None,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn upgrade_poll_interval(&self) -> Duration {
        Duration::from_millis(self.upgrade_poll_interval_ms)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
