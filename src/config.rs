use std::env;
use std::net::SocketAddr;

use chrono::{Datelike, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub seed_script: Option<String>,
    /// First calendar year of the academic year uploads are filed under.
    pub academic_year: i64,
    pub default_password: String,
    pub daily_summary: bool,
    pub smtp: SmtpConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://pulsebs.db?mode=rwc".to_string());
        let bind_addr = parse_var("BIND_ADDR", "127.0.0.1:3001".parse().ok())?
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3001)));
        let seed_script = env::var("SEED_SCRIPT").ok().filter(|s| !s.is_empty());
        let academic_year =
            parse_var("ACADEMIC_YEAR", None)?.unwrap_or_else(current_academic_year);
        let default_password =
            env::var("DEFAULT_PASSWORD").unwrap_or_else(|_| "changeme".to_string());
        let daily_summary = flag("DAILY_SUMMARY", true);

        Ok(Self {
            database_url,
            bind_addr,
            seed_script,
            academic_year,
            default_password,
            daily_summary,
            smtp: SmtpConfig::from_env()?,
        })
    }
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: flag("SMTP_ENABLED", false),
            host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: parse_var("SMTP_PORT", None)?.unwrap_or(1025),
            username: env::var("SMTP_USERNAME").unwrap_or_default(),
            password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@pulsebs.local".to_string()),
            from_name: env::var("FROM_NAME").unwrap_or_else(|_| "PULSeBS".to_string()),
        })
    }
}

/// Academic years start in September.
pub fn current_academic_year() -> i64 {
    let today = Utc::now().date_naive();
    let year = i64::from(today.year());
    if today.month() >= 9 { year } else { year - 1 }
}

fn flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    fallback: Option<T>,
) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(fallback),
    }
}
