use std::time::Duration;

use chrono::NaiveDate;
use url::Url;

use crate::{Error, Result};

pub const DEFAULT_SOURCE_URL: &str = "https://www.investorgain.com/report/live-ipo-gmp/331/all/";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://gmpwatch.db?mode=rwc";

/// All configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram. Absent only in dry-run mode.
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    // Data source
    pub source_url: Url,
    pub fetch_timeout: Duration,
    pub notify_timeout: Duration,

    // Database
    pub database_url: String,

    // Decision policy
    pub policy_preset: String,
    pub policy_config_path: Option<String>,
    pub gmp_threshold: Option<f64>,

    /// Overrides the calendar date the run treats as "today".
    pub run_date: Option<NaiveDate>,
    /// Log alerts instead of sending them.
    pub dry_run: bool,
}

impl Config {
    /// Load configuration from the process environment.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let dry_run = match get("DRY_RUN") {
            Some(v) => parse_bool("DRY_RUN", &v)?,
            None => false,
        };

        let telegram_token = get("TG_BOT_TOKEN");
        let telegram_chat_id = get("TG_CHAT_ID");
        if !dry_run {
            if telegram_token.is_none() {
                return Err(missing("TG_BOT_TOKEN"));
            }
            if telegram_chat_id.is_none() {
                return Err(missing("TG_CHAT_ID"));
            }
        }

        let source_raw = get("GMP_SOURCE_URL").unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());
        let source_url = Url::parse(&source_raw)
            .map_err(|e| Error::Config(format!("GMP_SOURCE_URL '{source_raw}' is not a valid URL: {e}")))?;

        let gmp_threshold = get("GMP_THRESHOLD")
            .map(|v| {
                v.parse::<f64>()
                    .ok()
                    .filter(|t| t.is_finite())
                    .ok_or_else(|| Error::Config(format!("GMP_THRESHOLD must be a number, got '{v}'")))
            })
            .transpose()?;

        let run_date = get("RUN_DATE")
            .map(|v| {
                NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                    .map_err(|_| Error::Config(format!("RUN_DATE must be YYYY-MM-DD, got '{v}'")))
            })
            .transpose()?;

        Ok(Config {
            telegram_token,
            telegram_chat_id,
            source_url,
            fetch_timeout: secs(get("FETCH_TIMEOUT_SECS"), "FETCH_TIMEOUT_SECS", 30)?,
            notify_timeout: secs(get("NOTIFY_TIMEOUT_SECS"), "NOTIFY_TIMEOUT_SECS", 10)?,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            policy_preset: get("POLICY_PRESET").unwrap_or_else(|| "closing-tomorrow".to_string()),
            policy_config_path: get("POLICY_CONFIG_PATH"),
            gmp_threshold,
            run_date,
            dry_run,
        })
    }
}

fn missing(key: &str) -> Error {
    Error::Config(format!(
        "Required environment variable '{key}' is not set. Check your .env file or set DRY_RUN=true."
    ))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{key} must be true or false, got '{other}'"))),
    }
}

fn secs(value: Option<String>, key: &str, default: u64) -> Result<Duration> {
    match value {
        None => Ok(Duration::from_secs(default)),
        Some(v) => v
            .parse::<u64>()
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| Error::Config(format!("{key} must be a positive integer, got '{v}'"))),
    }
}
