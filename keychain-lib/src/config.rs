//! Store configuration.
//!
//! # Environment Variables
//!
//! [`StoreConfig::apply_env`] overrides individual fields:
//!
//! - `KEYCHAIN_SERVICE` - namespace for entries in the desktop keychain
//! - `KEYCHAIN_RETRY_MAX_ATTEMPTS` - total attempts per write (and per
//!   authentication-failed read)
//! - `KEYCHAIN_RETRY_DELAY_MS` - pause between attempts in milliseconds
//! - `KEYCHAIN_DEV_BUILD` - `true`/`false`, whether emulator checks apply
//!
//! # Example
//!
//! ```rust,ignore
//! use keychain_lib::config::StoreConfig;
//!
//! let config = StoreConfig::from_json_file("keychain.json")?.apply_env()?;
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::KeychainError;
use crate::retry::RetryPolicy;
use crate::Result;

/// Environment variable naming the keychain service.
pub const ENV_SERVICE: &str = "KEYCHAIN_SERVICE";
/// Environment variable overriding the attempt count.
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "KEYCHAIN_RETRY_MAX_ATTEMPTS";
/// Environment variable overriding the retry delay.
pub const ENV_RETRY_DELAY_MS: &str = "KEYCHAIN_RETRY_DELAY_MS";
/// Environment variable overriding the development-build flag.
pub const ENV_DEV_BUILD: &str = "KEYCHAIN_DEV_BUILD";

/// Configuration for [`SecureStringStore`](crate::SecureStringStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Namespace for entries in the desktop keychain.
    #[serde(default = "default_service")]
    pub service: String,

    /// Retry policy for writes and authentication-failed reads.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Whether this is a development build. Emulator detection only
    /// downgrades access control on development builds.
    #[serde(default = "default_development_build")]
    pub development_build: bool,
}

fn default_service() -> String {
    "keychain".to_string()
}

fn default_development_build() -> bool {
    cfg!(debug_assertions)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            retry: RetryPolicy::default(),
            development_build: default_development_build(),
        }
    }
}

impl StoreConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env()
    }

    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            KeychainError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            KeychainError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_vars<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(service) = lookup(ENV_SERVICE) {
            self.service = service;
        }
        if let Some(raw) = lookup(ENV_RETRY_MAX_ATTEMPTS) {
            self.retry.max_attempts = raw.trim().parse().map_err(|_| {
                KeychainError::Config(format!(
                    "{} must be an integer, got {:?}",
                    ENV_RETRY_MAX_ATTEMPTS, raw
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_RETRY_DELAY_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                KeychainError::Config(format!(
                    "{} must be an integer, got {:?}",
                    ENV_RETRY_DELAY_MS, raw
                ))
            })?;
            self.retry.delay = std::time::Duration::from_millis(ms);
        }
        if let Some(raw) = lookup(ENV_DEV_BUILD) {
            self.development_build = parse_bool(&raw).ok_or_else(|| {
                KeychainError::Config(format!(
                    "{} must be true or false, got {:?}",
                    ENV_DEV_BUILD, raw
                ))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Set the keychain service.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the development-build flag.
    pub fn with_development_build(mut self, development_build: bool) -> Self {
        self.development_build = development_build;
        self
    }

    /// Reject configurations the store cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(KeychainError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.service.trim().is_empty() {
            return Err(KeychainError::Config("service must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
