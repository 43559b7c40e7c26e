//! # Settings
//!
//! Engine-wide knobs. Defaults match what most applications want; a JSON
//! document or environment variables can override them:
//!
//! | Setting | Default | Environment |
//! |---------|---------|-------------|
//! | `cache_timeout_ms` | `900000` (15 min) | `WITH_RESOURCES_CACHE_TIMEOUT_MS` (`none`/`off` disables expiry) |
//! | `mailbox_size` | `32` | `WITH_RESOURCES_MAILBOX_SIZE` |
//! | `key_path` | `[]` (whole call) | - |

use crate::error::SettingsError;
use crate::memoize::MemoizeOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 900_000;
pub const DEFAULT_MAILBOX_SIZE: usize = 32;

pub const CACHE_TIMEOUT_ENV: &str = "WITH_RESOURCES_CACHE_TIMEOUT_MS";
pub const MAILBOX_SIZE_ENV: &str = "WITH_RESOURCES_MAILBOX_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Freshness window of memoized fetches. `None` never expires.
    pub cache_timeout_ms: Option<u64>,
    /// Store mailbox capacity.
    pub mailbox_size: usize,
    /// Projection of `{"method", "input"}` used as the memoizer key.
    pub key_path: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_timeout_ms: Some(DEFAULT_CACHE_TIMEOUT_MS),
            mailbox_size: DEFAULT_MAILBOX_SIZE,
            key_path: Vec::new(),
        }
    }
}

impl Settings {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(document: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(document)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the store cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.mailbox_size == 0 {
            return Err(SettingsError::NotPositive {
                field: "mailbox_size",
            });
        }
        Ok(())
    }

    /// Applies the `WITH_RESOURCES_*` environment variables that are set.
    pub fn with_env_overrides(self) -> Result<Self, SettingsError> {
        [CACHE_TIMEOUT_ENV, MAILBOX_SIZE_ENV]
            .into_iter()
            .try_fold(self, |settings, var| match std::env::var(var) {
                Ok(value) => settings.apply_override(var, &value),
                Err(_) => Ok(settings),
            })
    }

    /// Applies a single override as if `var` were set to `value`.
    pub fn apply_override(mut self, var: &'static str, value: &str) -> Result<Self, SettingsError> {
        let invalid = || SettingsError::InvalidEnv {
            var,
            value: value.to_string(),
        };
        let value = value.trim();
        match var {
            CACHE_TIMEOUT_ENV => {
                self.cache_timeout_ms = match value.to_ascii_lowercase().as_str() {
                    "none" | "off" => None,
                    ms => Some(ms.parse().map_err(|_| invalid())?),
                };
            }
            MAILBOX_SIZE_ENV => {
                let size: usize = value.parse().map_err(|_| invalid())?;
                if size == 0 {
                    return Err(invalid());
                }
                self.mailbox_size = size;
            }
            _ => return Err(invalid()),
        }
        Ok(self)
    }

    pub fn cache_timeout(&self) -> Option<Duration> {
        self.cache_timeout_ms.map(Duration::from_millis)
    }

    pub fn memoize_options(&self) -> MemoizeOptions {
        MemoizeOptions {
            key_path: self.key_path.clone(),
            timeout: self.cache_timeout(),
        }
    }
}
