use crate::modules::attendance_sync::adapters::outbound::monday::MondayClientConfig;
use crate::modules::attendance_sync::adapters::outbound::personio::PersonioClientConfig;
use crate::modules::attendance_sync::core::board_columns::BoardColumns;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PERSONIO_BASE_URL: &str = "https://api.personio.de/v1";
const DEFAULT_MONDAY_API_URL: &str = "https://api.monday.com/v2";
const DEFAULT_IDENTITY_STORE_PATH: &str = "identity_store.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub personio: PersonioClientConfig,
    pub monday: MondayClientConfig,
    pub columns: BoardColumns,
    pub port: u16,
    pub sync_interval: Duration,
    pub lookback_days: u32,
    pub concurrency: usize,
    pub identity_store_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let board_id = env.required("MONDAY_BOARD_ID")?;
        if board_id.parse::<u64>().is_err() {
            return Err(ConfigError::Invalid {
                var: "MONDAY_BOARD_ID",
                reason: format!("expected a numeric board id, got {board_id:?}"),
            });
        }

        let timeout = Duration::from_secs(env.positive("HTTP_TIMEOUT_SECS", 30)?);

        let defaults = BoardColumns::default();
        let columns = BoardColumns {
            start: env.optional("MONDAY_COLUMN_START").unwrap_or(defaults.start),
            end: env.optional("MONDAY_COLUMN_END").unwrap_or(defaults.end),
            duration: env
                .optional("MONDAY_COLUMN_DURATION")
                .unwrap_or(defaults.duration),
            external_reference: env
                .optional("MONDAY_COLUMN_REFERENCE")
                .unwrap_or(defaults.external_reference),
            employee: env.optional("MONDAY_COLUMN_EMPLOYEE"),
            email: env.optional("MONDAY_COLUMN_EMAIL"),
        };
        if let Some(duplicate) = columns.duplicate() {
            return Err(ConfigError::Invalid {
                var: "MONDAY_COLUMN_*",
                reason: format!("column {duplicate} is mapped more than once"),
            });
        }

        Ok(Self {
            personio: PersonioClientConfig {
                base_url: env
                    .optional("PERSONIO_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_PERSONIO_BASE_URL.into()),
                client_id: env.required("PERSONIO_CLIENT_ID")?,
                client_secret: env.required("PERSONIO_CLIENT_SECRET")?,
                timeout,
            },
            monday: MondayClientConfig {
                api_url: env
                    .optional("MONDAY_API_URL")
                    .unwrap_or_else(|| DEFAULT_MONDAY_API_URL.into()),
                api_token: env.required("MONDAY_API_TOKEN")?,
                board_id,
                timeout,
            },
            columns,
            port: env.parsed("PORT", 3000)?,
            sync_interval: Duration::from_secs(env.positive("SYNC_INTERVAL_SECS", 60)?),
            lookback_days: env.parsed("SYNC_LOOKBACK_DAYS", 0)?,
            concurrency: env.positive("SYNC_CONCURRENCY", 1)?,
            identity_store_path: env
                .optional("IDENTITY_STORE_PATH")
                .unwrap_or_else(|| DEFAULT_IDENTITY_STORE_PATH.into())
                .into(),
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.optional(var).ok_or(ConfigError::Missing(var))
    }

    fn parsed<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(var) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: format!("{raw:?}: {e}"),
            }),
        }
    }

    fn positive<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + Default + PartialOrd,
        T::Err: std::fmt::Display,
    {
        let value = self.parsed(var, default)?;
        if value <= T::default() {
            return Err(ConfigError::Invalid {
                var,
                reason: "must be greater than zero".into(),
            });
        }
        Ok(value)
    }
}
