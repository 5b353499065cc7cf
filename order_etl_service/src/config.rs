//! Environment configuration.
//!
//! Every setting has a default. Missing values fall back to it silently (or with an `info` record); values that are
//! present but unusable fall back with a warning, so a typo never stops the service from starting.
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use etl_common::{
    helpers::{parse_boolean_flag, parse_positive},
    Secret,
};
use log::*;
use order_etl_engine::{ClickHouseConfig, PipelineConfig, RetryPolicy};

use crate::errors::ServiceError;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_FILE_PATTERN: &str = "*.json";
const DEFAULT_BATCH_SIZE: usize = 1000;
const DEFAULT_QUEUE_CAPACITY: usize = 1000;
const DEFAULT_QUEUE_POLL_MS: u64 = 1000;
const DEFAULT_WATCH_RETRIES: u32 = 3;
const DEFAULT_WATCH_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_CLICKHOUSE_HOST: &str = "127.0.0.1";
const DEFAULT_CLICKHOUSE_PORT: u16 = 8123;
const DEFAULT_CLICKHOUSE_USER: &str = "default";
const DEFAULT_CLICKHOUSE_DATABASE: &str = "default";

#[derive(Clone, Debug)]
pub struct EtlConfig {
    /// The directory holding export files. It is scanned once at start-up and then watched.
    pub data_dir: PathBuf,
    pub file_pattern: String,
    /// The number of rows sent in a single insert.
    pub batch_size: usize,
    pub queue_capacity: usize,
    pub queue_poll_interval: Duration,
    /// The number of attempts made to read a new file before giving up on it. Files are often noticed before they
    /// have been completely written.
    pub watch_retries: u32,
    pub watch_retry_delay: Duration,
    /// When false, the service loads the files that are already present and exits.
    pub watch: bool,
    pub store: StoreConfig,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            queue_poll_interval: Duration::from_millis(DEFAULT_QUEUE_POLL_MS),
            watch_retries: DEFAULT_WATCH_RETRIES,
            watch_retry_delay: Duration::from_millis(DEFAULT_WATCH_RETRY_DELAY_MS),
            watch: true,
            store: StoreConfig::default(),
        }
    }
}

impl EtlConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any source of variables. `lookup` returns `None` for unset variables.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let data_dir = lookup("ETL_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| {
            info!("🪛️ ETL_DATA_DIR is not set. Using '{DEFAULT_DATA_DIR}'.");
            PathBuf::from(DEFAULT_DATA_DIR)
        });
        let file_pattern = lookup("ETL_FILE_PATTERN").unwrap_or_else(|| DEFAULT_FILE_PATTERN.to_string());
        let batch_size = positive_or_default(&lookup, "ETL_BATCH_SIZE", DEFAULT_BATCH_SIZE);
        let queue_capacity = positive_or_default(&lookup, "ETL_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY);
        let queue_poll_interval =
            Duration::from_millis(positive_or_default(&lookup, "ETL_QUEUE_POLL_MS", DEFAULT_QUEUE_POLL_MS));
        let watch_retries = positive_or_default(&lookup, "ETL_WATCH_RETRIES", DEFAULT_WATCH_RETRIES);
        let watch_retry_delay = lookup("ETL_WATCH_RETRY_DELAY_MS")
            .and_then(|s| {
                s.trim()
                    .parse::<u64>()
                    .map_err(|e| {
                        warn!(
                            "🪛️ Invalid value for ETL_WATCH_RETRY_DELAY_MS ({s}). {e}. Using the default, \
                             {DEFAULT_WATCH_RETRY_DELAY_MS}ms, instead."
                        )
                    })
                    .ok()
            })
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_WATCH_RETRY_DELAY_MS));
        let watch = flag_or_default(&lookup, "ETL_WATCH", true);
        if !watch {
            info!("🪛️ ETL_WATCH is off. Existing files will be loaded and then the service will exit.");
        }
        let store = StoreConfig::from_lookup(&lookup);
        Self {
            data_dir,
            file_pattern,
            batch_size,
            queue_capacity,
            queue_poll_interval,
            watch_retries,
            watch_retry_delay,
            watch,
            store,
        }
    }

    /// Reject settings that have no usable fallback, such as a blank file pattern or store host.
    pub fn validate(&self) -> Result<(), ServiceError> {
        let blank = [
            ("ETL_DATA_DIR", self.data_dir.as_os_str().is_empty()),
            ("ETL_FILE_PATTERN", self.file_pattern.trim().is_empty()),
            ("CLICKHOUSE_HOST", self.store.host.trim().is_empty()),
            ("CLICKHOUSE_DATABASE", self.store.database.trim().is_empty()),
        ];
        match blank.iter().find(|(_, is_blank)| *is_blank) {
            Some((name, _)) => Err(ServiceError::ConfigurationError(format!("{name} must not be empty"))),
            None => Ok(()),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            data_dir: self.data_dir.clone(),
            file_pattern: self.file_pattern.clone(),
            batch_size: self.batch_size,
            queue_capacity: self.queue_capacity,
            poll_interval: self.queue_poll_interval,
            retry: RetryPolicy { max_attempts: self.watch_retries, delay: self.watch_retry_delay },
        }
    }
}

fn positive_or_default<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default + Display + Copy,
    T::Err: Display,
{
    match lookup(name) {
        None => default,
        Some(s) => parse_positive::<T>(&s).unwrap_or_else(|e| {
            warn!("🪛️ Invalid value for {name}. {e}. Using the default, {default}, instead.");
            default
        }),
    }
}

fn flag_or_default<F>(lookup: &F, name: &str, default: bool) -> bool
where F: Fn(&str) -> Option<String> {
    match lookup(name) {
        None => default,
        Some(s) => parse_boolean_flag(&s).unwrap_or_else(|e| {
            warn!("🪛️ Invalid value for {name}. {e}. Using the default, {default}, instead.");
            default
        }),
    }
}

//-------------------------------------------------  StoreConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CLICKHOUSE_HOST.to_string(),
            port: DEFAULT_CLICKHOUSE_PORT,
            user: DEFAULT_CLICKHOUSE_USER.to_string(),
            password: Secret::default(),
            database: DEFAULT_CLICKHOUSE_DATABASE.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_lookup<F>(lookup: &F) -> Self
    where F: Fn(&str) -> Option<String> {
        let host = lookup("CLICKHOUSE_HOST").unwrap_or_else(|| DEFAULT_CLICKHOUSE_HOST.into());
        let port = positive_or_default(lookup, "CLICKHOUSE_PORT", DEFAULT_CLICKHOUSE_PORT);
        let user = lookup("CLICKHOUSE_USER").unwrap_or_else(|| DEFAULT_CLICKHOUSE_USER.into());
        let password = lookup("CLICKHOUSE_PASSWORD").map(Secret::new).unwrap_or_else(|| {
            info!("🪛️ CLICKHOUSE_PASSWORD is not set. Connecting without a password.");
            Secret::default()
        });
        let database = lookup("CLICKHOUSE_DATABASE").unwrap_or_else(|| DEFAULT_CLICKHOUSE_DATABASE.into());
        Self { host, port, user, password, database }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn clickhouse_config(&self) -> ClickHouseConfig {
        ClickHouseConfig {
            url: self.url(),
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> EtlConfig {
        let vars = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>();
        EtlConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.file_pattern, "*.json");
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.queue_poll_interval, Duration::from_secs(1));
        assert_eq!(config.watch_retries, 3);
        assert_eq!(config.watch_retry_delay, Duration::from_secs(1));
        assert!(config.watch);
        assert_eq!(config.store.url(), "http://127.0.0.1:8123");
        assert_eq!(config.store.user, "default");
        assert_eq!(config.store.password.reveal(), "");
    }

    #[test]
    fn values_from_the_environment() {
        let config = config_from(&[
            ("ETL_DATA_DIR", "/srv/exports"),
            ("ETL_FILE_PATTERN", "orders_*.json"),
            ("ETL_BATCH_SIZE", "250"),
            ("ETL_WATCH", "false"),
            ("ETL_WATCH_RETRY_DELAY_MS", "0"),
            ("CLICKHOUSE_HOST", "clickhouse"),
            ("CLICKHOUSE_PORT", "18123"),
            ("CLICKHOUSE_PASSWORD", "hunter2"),
        ]);
        assert_eq!(config.data_dir, PathBuf::from("/srv/exports"));
        assert_eq!(config.batch_size, 250);
        assert!(!config.watch);
        assert_eq!(config.watch_retry_delay, Duration::ZERO);
        assert_eq!(config.store.url(), "http://clickhouse:18123");
        assert_eq!(format!("{:?}", config.store.password), "****");
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.file_pattern, "orders_*.json");
        assert_eq!(pipeline.batch_size, 250);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("ETL_BATCH_SIZE", "0"),
            ("ETL_QUEUE_CAPACITY", "lots"),
            ("ETL_WATCH_RETRIES", "-1"),
            ("ETL_WATCH_RETRY_DELAY_MS", "soon"),
            ("CLICKHOUSE_PORT", "99999"),
        ]);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.watch_retries, 3);
        assert_eq!(config.watch_retry_delay, Duration::from_secs(1));
        assert_eq!(config.store.port, 8123);
    }

    #[test]
    fn boolean_flags() {
        assert!(!config_from(&[("ETL_WATCH", "0")]).watch);
        assert!(config_from(&[("ETL_WATCH", "yes")]).watch);
        assert!(config_from(&[("ETL_WATCH", "flase")]).watch);
    }

    #[test]
    fn blank_settings_are_rejected() {
        assert!(config_from(&[]).validate().is_ok());
        let blanks =
            [("ETL_FILE_PATTERN", " "), ("CLICKHOUSE_HOST", " "), ("CLICKHOUSE_DATABASE", ""), ("ETL_DATA_DIR", "")];
        for (name, value) in blanks {
            match config_from(&[(name, value)]).validate() {
                Err(ServiceError::ConfigurationError(msg)) => assert!(msg.contains(name), "{msg}"),
                other => panic!("Expected a configuration error for {name}, got {other:?}"),
            }
        }
    }
}
