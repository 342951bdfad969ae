//! Errors raised while loading `sbs` configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be parsed or a value has the wrong type.
    #[error("failed to read sbs configuration: {0}")]
    Figment(#[from] figment::Error),

    /// A section the client needs (`api`, `listen`, `decode`) is empty.
    #[error("[{section}] is not configured; set it in config.toml or via SBS_{env}__*", env = .section.to_uppercase())]
    NotConfigured { section: String },

    /// A value is out of range, or the `--config` file does not exist
    /// (`field` is `config`).
    #[error("bad value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_configured_names_the_env_prefix() {
        let err = ConfigError::NotConfigured {
            section: "api".into(),
        };
        assert_eq!(
            err.to_string(),
            "[api] is not configured; set it in config.toml or via SBS_API__*"
        );
    }

    #[test]
    fn invalid_value_names_the_field() {
        let err = ConfigError::InvalidValue {
            field: "listen.poll_timeout_secs".into(),
            reason: "must be greater than 0".into(),
        };
        assert_eq!(
            err.to_string(),
            "bad value for listen.poll_timeout_secs: must be greater than 0"
        );
    }
}
