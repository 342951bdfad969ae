//! Decoding and contract-check settings.

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use sbs_core::contract::{DEFAULT_CLOCK_SKEW_SECS, ValidationContext};

/// Largest accepted skew: one week.
pub const MAX_CLOCK_SKEW_SECS: i64 = 7 * 24 * 60 * 60;

const fn default_clock_skew_secs() -> i64 {
    DEFAULT_CLOCK_SKEW_SECS
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecodeConfig {
    /// How far in the future a `createDate` may be before it is flagged.
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: i64,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            clock_skew_secs: default_clock_skew_secs(),
        }
    }
}

impl DecodeConfig {
    /// A validation context anchored at the current time.
    pub fn validation_context(&self) -> ValidationContext {
        ValidationContext::with_skew_secs(self.clock_skew_secs.clamp(0, MAX_CLOCK_SKEW_SECS))
    }

    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_CLOCK_SKEW_SECS).contains(&self.clock_skew_secs) {
            return Err(ConfigError::InvalidValue {
                field: "decode.clock_skew_secs".into(),
                reason: format!("must be between 0 and {MAX_CLOCK_SKEW_SECS}"),
            });
        }
        Ok(())
    }
}
