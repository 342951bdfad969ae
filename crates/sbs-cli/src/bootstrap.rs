use anyhow::Context;
use sbs_config::SbsConfig;

use crate::cli::GlobalFlags;

/// Load `.env`, then the layered configuration.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<SbsConfig> {
    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            tracing::warn!(%error, "failed to read .env; continuing without it");
        }
    }

    SbsConfig::load_from(flags.config.as_deref()).context("failed to load configuration")
}
