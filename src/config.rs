//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default location of the vacancy catalog file.
pub const DEFAULT_VACANCIES_PATH: &str = "./data/vacancies.json";

/// Bot configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token. `None` runs the local CLI transport instead.
    pub telegram_token: Option<SecretString>,
    /// Usernames or numeric ids allowed to talk to the bot (`*` = everyone).
    pub allowed_users: Vec<String>,
    /// CRM webhook endpoint. `None` logs leads instead of posting them.
    pub crm_webhook_url: Option<SecretString>,
    /// Timeout for a single CRM request.
    pub crm_timeout: Duration,
    /// Path of the vacancy catalog JSON file.
    pub vacancies_path: PathBuf,
    /// Port for the health/catalog HTTP server (0 disables it).
    pub http_port: u16,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            allowed_users: vec!["*".to_string()],
            crm_webhook_url: None,
            crm_timeout: Duration::from_secs(10),
            vacancies_path: PathBuf::from(DEFAULT_VACANCIES_PATH),
            http_port: 8080,
        }
    }
}

impl BotConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram_token = non_empty("TELEGRAM_BOT_TOKEN").map(SecretString::from);

        let allowed_users = match lookup("TELEGRAM_ALLOWED_USERS") {
            Some(raw) => parse_list(&raw),
            None => defaults.allowed_users,
        };

        let crm_webhook_url = non_empty("CRM_WEBHOOK_URL").map(SecretString::from);

        let crm_timeout = match non_empty("CRM_TIMEOUT_SECS") {
            Some(raw) => match parse_number("CRM_TIMEOUT_SECS", &raw)? {
                0 => {
                    return Err(ConfigError::InvalidValue {
                        key: "CRM_TIMEOUT_SECS".to_string(),
                        message: "must be at least 1 second".to_string(),
                    });
                }
                secs => Duration::from_secs(secs),
            },
            None => defaults.crm_timeout,
        };

        let vacancies_path = non_empty("INTAKE_VACANCIES_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.vacancies_path);

        let http_port = match non_empty("INTAKE_HTTP_PORT") {
            Some(raw) => parse_number("INTAKE_HTTP_PORT", &raw)?,
            None => defaults.http_port,
        };

        Ok(Self {
            telegram_token,
            allowed_users,
            crm_webhook_url,
            crm_timeout,
            vacancies_path,
            http_port,
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        })
}
