use crate::ledger::ConfirmPolicy;
use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration loaded from environment variables (and `.env` when present)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub port: u16,
    pub confirm_policy: ConfirmPolicy,
    pub busy_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("donors.db"),
            port: 3000,
            confirm_policy: ConfirmPolicy::RequireSelected,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Self {
            database_path: lookup("DONOR_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            port: match lookup("DONOR_SERVER_PORT") {
                Some(raw) => raw.parse().context("DONOR_SERVER_PORT must be a valid port")?,
                None => defaults.port,
            },
            confirm_policy: match lookup("DONOR_CONFIRM_POLICY") {
                Some(raw) => raw.parse().map_err(|e: String| anyhow!(e))?,
                None => defaults.confirm_policy,
            },
            busy_timeout: match lookup("DONOR_BUSY_TIMEOUT_MS") {
                Some(raw) => Duration::from_millis(
                    raw.parse()
                        .context("DONOR_BUSY_TIMEOUT_MS must be a number of milliseconds")?,
                ),
                None => defaults.busy_timeout,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.database_path, PathBuf::from("donors.db"));
        assert_eq!(config.port, 3000);
        assert_eq!(config.confirm_policy, ConfirmPolicy::RequireSelected);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DONOR_DB_PATH", "/var/lib/donors/prod.db"),
            ("DONOR_SERVER_PORT", "8080"),
            ("DONOR_CONFIRM_POLICY", "lenient"),
            ("DONOR_BUSY_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/donors/prod.db"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.confirm_policy, ConfirmPolicy::Lenient);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_bad_values_are_errors() {
        assert!(Config::from_lookup(lookup_from(&[("DONOR_SERVER_PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("DONOR_CONFIRM_POLICY", "yolo")])).is_err());
    }
}
