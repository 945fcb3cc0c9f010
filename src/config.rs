use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::models::enums::DeliveryChannel;

/// Application-level constants
pub const APP_NAME: &str = "medreminder";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_WORKER_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_WORKER_BATCH_SIZE: usize = 50;
pub const DEFAULT_WORKER_LEASE_SECS: u32 = 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

pub fn default_log_filter() -> &'static str {
    "medreminder=info,tower_http=info"
}

/// Local data directory for the default database file.
/// Falls back to the working directory when the platform has none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn default_database_path() -> PathBuf {
    app_data_dir().join("medreminder.db")
}

// ═══════════════════════════════════════════════════════════
// Worker configuration
// ═══════════════════════════════════════════════════════════

/// Tuning knobs for one delivery worker instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Identity written into `claimed_by` for every lease this worker holds.
    pub worker_id: String,
    /// Fixed delay between the start of consecutive ticks.
    pub interval: Duration,
    /// Upper bound on reminders claimed per tick.
    pub batch_size: usize,
    /// How long a claim stays exclusive before another worker may take it over.
    pub lease_secs: u32,
    /// Channel reported by the default logging sender.
    pub channel: DeliveryChannel,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", uuid::Uuid::new_v4()),
            interval: Duration::from_millis(DEFAULT_WORKER_INTERVAL_MS),
            batch_size: DEFAULT_WORKER_BATCH_SIZE,
            lease_secs: DEFAULT_WORKER_LEASE_SECS,
            channel: DeliveryChannel::Whatsapp,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let interval_ms: u64 =
            parse_or("WORKER_INTERVAL_MS", &lookup, DEFAULT_WORKER_INTERVAL_MS)?;
        let batch_size: usize =
            parse_or("WORKER_BATCH_SIZE", &lookup, DEFAULT_WORKER_BATCH_SIZE)?;
        let lease_secs: u32 = parse_or("WORKER_LEASE_SECS", &lookup, DEFAULT_WORKER_LEASE_SECS)?;

        if interval_ms == 0 {
            return Err(invalid("WORKER_INTERVAL_MS", "0"));
        }
        if batch_size == 0 {
            return Err(invalid("WORKER_BATCH_SIZE", "0"));
        }
        if lease_secs == 0 {
            return Err(invalid("WORKER_LEASE_SECS", "0"));
        }

        let channel = match lookup("WORKER_CHANNEL") {
            Some(raw) => DeliveryChannel::from_str(raw.trim())
                .map_err(|_| invalid("WORKER_CHANNEL", &raw))?,
            None => defaults.channel,
        };

        Ok(Self {
            worker_id: lookup("WORKER_ID")
                .filter(|id| !id.trim().is_empty())
                .unwrap_or(defaults.worker_id),
            interval: Duration::from_millis(interval_ms),
            batch_size,
            lease_secs,
            channel,
        })
    }

    pub fn lease_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.lease_secs))
    }
}

// ═══════════════════════════════════════════════════════════
// Server configuration
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_path: PathBuf,
    /// Run one delivery worker thread inside the server process.
    pub embedded_worker: bool,
    pub log_pretty: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            host: parse_or("HOST", &lookup, IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or("PORT", &lookup, DEFAULT_PORT)?,
            database_path: database_path_from(&lookup),
            embedded_worker: parse_flag("EMBEDDED_WORKER", &lookup)?,
            log_pretty: parse_flag("LOG_PRETTY", &lookup)?,
        })
    }
}

/// Database location: `MEDREMINDER_DB` or the per-user default.
pub fn database_path_from(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("MEDREMINDER_DB")
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_database_path)
}

pub fn parse_flag(
    key: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<bool, ConfigError> {
    match lookup(key) {
        None => Ok(false),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(invalid(key, &raw)),
        },
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, &raw)),
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn worker_defaults_match_polling_contract() {
        let config = WorkerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.lease_secs, 60);
        assert_eq!(config.channel, DeliveryChannel::Whatsapp);
        assert!(config.worker_id.starts_with("worker-"));
    }

    #[test]
    fn worker_reads_overrides() {
        let config = WorkerConfig::from_lookup(lookup_from(&[
            ("WORKER_INTERVAL_MS", "250"),
            ("WORKER_BATCH_SIZE", "10"),
            ("WORKER_LEASE_SECS", "30"),
            ("WORKER_ID", "node-a"),
            ("WORKER_CHANNEL", "gsm"),
        ]))
        .unwrap();
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.lease_duration(), chrono::Duration::seconds(30));
        assert_eq!(config.worker_id, "node-a");
        assert_eq!(config.channel, DeliveryChannel::Gsm);
    }

    #[test]
    fn worker_rejects_malformed_values() {
        let err = WorkerConfig::from_lookup(lookup_from(&[("WORKER_BATCH_SIZE", "lots")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "WORKER_BATCH_SIZE",
                value: "lots".into()
            }
        );
        assert!(WorkerConfig::from_lookup(lookup_from(&[("WORKER_INTERVAL_MS", "0")])).is_err());
        assert!(WorkerConfig::from_lookup(lookup_from(&[("WORKER_CHANNEL", "pigeon")])).is_err());
    }

    #[test]
    fn server_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.embedded_worker);
        assert!(!config.log_pretty);
        assert!(config.database_path.ends_with("medreminder.db"));
    }

    #[test]
    fn server_reads_database_path_and_flags() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("MEDREMINDER_DB", "/tmp/reminders.db"),
            ("PORT", "8080"),
            ("EMBEDDED_WORKER", "true"),
            ("LOG_PRETTY", "1"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/reminders.db"));
        assert_eq!(config.port, 8080);
        assert!(config.embedded_worker);
        assert!(config.log_pretty);
    }

    #[test]
    fn server_rejects_bad_flag() {
        assert!(ServerConfig::from_lookup(lookup_from(&[("EMBEDDED_WORKER", "maybe")])).is_err());
    }

    #[test]
    fn data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }
}
