//! Long-poll listen settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// How long a listen request may stay open, in seconds.
const fn default_poll_timeout_secs() -> u64 {
    300
}

/// Pause before re-polling after a failed poll, in seconds.
const fn default_retry_delay_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    /// Chains to follow. Empty means all site activity.
    #[serde(default)]
    pub chains: Vec<String>,

    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            chains: Vec::new(),
            poll_timeout_secs: default_poll_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl ListenConfig {
    pub const fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        if self.poll_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "listen.poll_timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if let Some(blank) = self.chains.iter().find(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "listen.chains".into(),
                reason: format!("chain names must not be blank, got '{blank}'"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ListenConfig::default();
        assert!(config.chains.is_empty());
        assert_eq!(config.poll_timeout(), Duration::from_secs(300));
        assert_eq!(config.retry_delay(), Duration::from_secs(5));
        assert!(config.check().is_ok());
    }

    #[test]
    fn zero_poll_timeout_is_invalid() {
        let config = ListenConfig {
            poll_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.check().is_err());
    }
}
