use std::collections::HashSet;
use std::time::Duration;
use std::{fs, path::Path};

use anyhow::Context;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::core::connect::{ConnectionParams, CredentialParams};
use crate::core::error::QueueError;

pub const DEFAULT_CONFIG_PATH: &str = "memq.toml";

/// What `peek_batch` does when more messages are requested than are pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeekBatchPolicy {
    /// Return every pending message.
    #[default]
    Clamp,
    /// Return nothing.
    Strict,
}

/// Which duration `renew_lock` extends a live lock by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewPolicy {
    /// The duration passed to `renew_lock`, which also becomes the lock's duration.
    #[default]
    Requested,
    /// The duration the lock was granted with; the argument is ignored.
    Original,
}

/// Tuning for a single queue.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct QueueConfig {
    pub poll_interval_ms: u64,
    pub listen_interval_ms: u64,
    pub peek_batch_policy: PeekBatchPolicy,
    pub renew_policy: RenewPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            listen_interval_ms: 1000,
            peek_batch_policy: PeekBatchPolicy::default(),
            renew_policy: RenewPolicy::default(),
        }
    }
}

impl QueueConfig {
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[inline]
    pub fn listen_interval(&self) -> Duration {
        Duration::from_millis(self.listen_interval_ms)
    }

    fn validate(&self, scope: &str) -> Result<(), QueueError> {
        if self.poll_interval_ms == 0 {
            return Err(QueueError::config(
                "",
                "INVALID_POLL_INTERVAL",
                format!("{scope}: poll_interval_ms must be greater than zero"),
            ));
        }
        if self.listen_interval_ms == 0 {
            return Err(QueueError::config(
                "",
                "INVALID_LISTEN_INTERVAL",
                format!("{scope}: listen_interval_ms must be greater than zero"),
            ));
        }
        Ok(())
    }
}

/// A `[[queues]]` entry: a named queue with optional overrides of `[defaults]`.
#[derive(Debug, Deserialize, Clone)]
pub struct QueueEntry {
    pub name: String,
    pub poll_interval_ms: Option<u64>,
    pub listen_interval_ms: Option<u64>,
    pub peek_batch_policy: Option<PeekBatchPolicy>,
    pub renew_policy: Option<RenewPolicy>,
    /// Refuse to create the queue unless at least one connection is configured.
    #[serde(default)]
    pub require_connection: bool,
    #[serde(default)]
    pub connections: Vec<ConnectionParams>,
    #[serde(default)]
    pub credential: Option<CredentialParams>,
}

impl QueueEntry {
    pub fn resolve(&self, defaults: &QueueConfig) -> QueueConfig {
        QueueConfig {
            poll_interval_ms: self.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
            listen_interval_ms: self
                .listen_interval_ms
                .unwrap_or(defaults.listen_interval_ms),
            peek_batch_policy: self.peek_batch_policy.unwrap_or(defaults.peek_batch_policy),
            renew_policy: self.renew_policy.unwrap_or(defaults.renew_policy),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub defaults: QueueConfig,
    pub logging: LoggingConfig,
    pub queues: Vec<QueueEntry>,
}

impl Config {
    pub fn from_toml(raw: &str) -> Result<Self, anyhow::Error> {
        let config: Config = toml::from_str(raw)?;
        Ok(config)
    }

    pub fn queue_entry(&self, name: &str) -> Option<&QueueEntry> {
        self.queues.iter().find(|q| q.name == name)
    }

    /// Effective settings for `name`: its entry's overrides on top of `[defaults]`.
    pub fn queue_config(&self, name: &str) -> QueueConfig {
        self.queue_entry(name)
            .map(|entry| entry.resolve(&self.defaults))
            .unwrap_or_else(|| self.defaults.clone())
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        self.defaults.validate("defaults")?;

        let mut seen = HashSet::new();
        for entry in &self.queues {
            if entry.name.trim().is_empty() {
                return Err(QueueError::config(
                    "",
                    "INVALID_QUEUE_NAME",
                    "queue name must not be empty",
                ));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(QueueError::config(
                    "",
                    "DUPLICATE_QUEUE",
                    format!("queue {} is configured more than once", entry.name),
                ));
            }
            entry
                .resolve(&self.defaults)
                .validate(&format!("queue {}", entry.name))?;
        }
        Ok(())
    }

    /// Applies `MEMQ_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MEMQ_POLL_INTERVAL_MS") {
            self.defaults.poll_interval_ms =
                v.parse().context("MEMQ_POLL_INTERVAL_MS")?;
        }
        if let Some(v) = lookup("MEMQ_LISTEN_INTERVAL_MS") {
            self.defaults.listen_interval_ms =
                v.parse().context("MEMQ_LISTEN_INTERVAL_MS")?;
        }
        if let Some(v) = lookup("MEMQ_LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), anyhow::Error> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }
}

/// Reads a TOML config file, applies environment overrides and validates it.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, anyhow::Error> {
    let path = path.as_ref();
    let raw: String = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let mut config = Config::from_toml(&raw)?;
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

/// Process-wide configuration: `MEMQ_CONFIG` or `memq.toml` when present,
/// built-in defaults otherwise.
pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    let path = std::env::var("MEMQ_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        return Config::default();
    }
    match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "falling back to default config");
            Config::default()
        }
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [defaults]
        poll_interval_ms = 50
        peek_batch_policy = "strict"

        [logging]
        level = "debug"

        [[queues]]
        name = "orders"
        listen_interval_ms = 250
        renew_policy = "original"

        [[queues]]
        name = "remote"
        require_connection = true

        [[queues.connections]]
        protocol = "amqp"
        host = "broker"
        port = 5672
    "#;

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.defaults, QueueConfig::default());
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.queues.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn queue_entries_override_defaults() {
        let cfg = Config::from_toml(SAMPLE).unwrap();
        cfg.validate().unwrap();

        let orders = cfg.queue_config("orders");
        assert_eq!(orders.poll_interval_ms, 50);
        assert_eq!(orders.listen_interval_ms, 250);
        assert_eq!(orders.peek_batch_policy, PeekBatchPolicy::Strict);
        assert_eq!(orders.renew_policy, RenewPolicy::Original);

        let unknown = cfg.queue_config("nope");
        assert_eq!(unknown, cfg.defaults);

        let remote = cfg.queue_entry("remote").unwrap();
        assert!(remote.require_connection);
        assert_eq!(
            remote.connections[0].endpoint().as_deref(),
            Some("amqp://broker:5672")
        );
    }

    #[test]
    fn validate_rejects_zero_intervals_and_duplicates() {
        let cfg = Config::from_toml("[defaults]\npoll_interval_ms = 0\n").unwrap();
        assert_eq!(cfg.validate().unwrap_err().code(), "INVALID_POLL_INTERVAL");

        let cfg = Config::from_toml(
            "[[queues]]\nname = \"a\"\nlisten_interval_ms = 0\n",
        )
        .unwrap();
        assert_eq!(cfg.validate().unwrap_err().code(), "INVALID_LISTEN_INTERVAL");

        let cfg = Config::from_toml("[[queues]]\nname = \"a\"\n[[queues]]\nname = \"a\"\n").unwrap();
        assert_eq!(cfg.validate().unwrap_err().code(), "DUPLICATE_QUEUE");
    }

    #[test]
    fn overrides_take_precedence() {
        let mut cfg = Config::default();
        cfg.apply_overrides(|key| match key {
            "MEMQ_POLL_INTERVAL_MS" => Some("25".to_string()),
            "MEMQ_LOG_LEVEL" => Some("trace".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.defaults.poll_interval_ms, 25);
        assert_eq!(cfg.defaults.listen_interval_ms, 1000);
        assert_eq!(cfg.logging.level, "trace");

        let err = cfg
            .apply_overrides(|key| (key == "MEMQ_LISTEN_INTERVAL_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("MEMQ_LISTEN_INTERVAL_MS"));
    }
}
