use anyhow::{anyhow, bail, Context};
use std::{env, fmt::Display, str::FromStr, time::Duration};
use tracing::{info, warn};

use crate::actors::OutboxRelayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{other}', expected postgres or memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_host: String,
    pub http_port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub outbox_poll_interval_ms: u64,
    pub outbox_batch_size: i64,
    pub outbox_max_attempts: i32,
    pub bootstrap_admin_email: Option<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config = Self {
            http_host: try_load("HTTP_HOST", "0.0.0.0")?,
            http_port: try_load("HTTP_PORT", "8080")?,
            storage: try_load("STORAGE_BACKEND", "postgres")?,
            database_url: optional("DATABASE_URL"),
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "10")?,
            outbox_poll_interval_ms: try_load("OUTBOX_POLL_INTERVAL_MS", "2000")?,
            outbox_batch_size: try_load("OUTBOX_BATCH_SIZE", "100")?,
            outbox_max_attempts: try_load("OUTBOX_MAX_ATTEMPTS", "5")?,
            bootstrap_admin_email: optional("BOOTSTRAP_ADMIN_EMAIL"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.storage == StorageBackend::Postgres && self.database_url.is_none() {
            bail!("DATABASE_URL is required when STORAGE_BACKEND=postgres");
        }
        if self.db_max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.outbox_poll_interval_ms == 0 || self.outbox_batch_size <= 0 || self.outbox_max_attempts <= 0 {
            bail!("OUTBOX_POLL_INTERVAL_MS, OUTBOX_BATCH_SIZE and OUTBOX_MAX_ATTEMPTS must be positive");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.http_host.clone(), self.http_port)
    }

    pub fn relay(&self) -> OutboxRelayConfig {
        OutboxRelayConfig {
            poll_interval: Duration::from_millis(self.outbox_poll_interval_ms),
            batch_size: self.outbox_batch_size,
            max_attempts: self.outbox_max_attempts,
        }
    }
}

fn optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => {
            info!("{key} not set");
            None
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow!("{e}")
        })
        .with_context(|| format!("Environment misconfigured: {key}={raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("Postgres".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_default_and_invalid_values() {
        let port: u16 = try_load("TEDARIK_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);

        let invalid: anyhow::Result<u16> = try_load("TEDARIK_TEST_UNSET_PORT", "eighty");
        assert!(invalid.is_err());
    }

    fn config() -> Config {
        Config {
            http_host: "127.0.0.1".into(),
            http_port: 8080,
            storage: StorageBackend::Memory,
            database_url: None,
            db_max_connections: 10,
            outbox_poll_interval_ms: 2000,
            outbox_batch_size: 100,
            outbox_max_attempts: 5,
            bootstrap_admin_email: None,
        }
    }

    #[test]
    fn test_validation() {
        assert!(config().validate().is_ok());

        let postgres_without_url = Config { storage: StorageBackend::Postgres, ..config() };
        assert!(postgres_without_url.validate().is_err());

        let zero_batch = Config { outbox_batch_size: 0, ..config() };
        assert!(zero_batch.validate().is_err());

        let relay = config().relay();
        assert_eq!(relay.poll_interval, Duration::from_millis(2000));
        assert_eq!(relay.max_attempts, 5);
    }
}
