use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::domains::watchdog::{ShutdownPolicy, WatchdogConfig};

/// Default deadline for a transaction between its start and completion signals.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub broker_url: String,
    pub control_topic: String,
    /// Consumer group for the watchdog. `None` means every instance sees every message.
    pub watchdog_group: Option<String>,
    /// Consumer group shared by the validator workers.
    pub validator_group: Option<String>,
    pub transaction_timeout: Duration,
    pub shutdown_policy: ShutdownPolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let group = |name: &str| lookup(name).filter(|value| !value.is_empty());

        Ok(Self {
            broker_url: lookup("BROKER_URL")
                .unwrap_or_else(|| "nats://localhost:4222".to_string()),
            control_topic: lookup("CONTROL_TOPIC").unwrap_or_else(|| "control".to_string()),
            watchdog_group: group("WATCHDOG_GROUP"),
            validator_group: group("VALIDATOR_GROUP"),
            transaction_timeout: match lookup("TRANSACTION_TIMEOUT_SECS") {
                Some(secs) => Duration::from_secs(
                    secs.parse()
                        .context("TRANSACTION_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                None => DEFAULT_TRANSACTION_TIMEOUT,
            },
            shutdown_policy: match lookup("WATCHDOG_SHUTDOWN_POLICY").as_deref() {
                None | Some("drop") => ShutdownPolicy::DropPending,
                Some("fire") => ShutdownPolicy::FirePending,
                Some(other) => bail!(
                    "WATCHDOG_SHUTDOWN_POLICY must be 'drop' or 'fire', got '{}'",
                    other
                ),
            },
        })
    }

    /// Watchdog settings derived from this configuration.
    pub fn watchdog(&self) -> WatchdogConfig {
        WatchdogConfig {
            control_topic: self.control_topic.clone(),
            group: self.watchdog_group.clone(),
            timeout: self.transaction_timeout,
            shutdown_policy: self.shutdown_policy,
            ..WatchdogConfig::default()
        }
    }
}
