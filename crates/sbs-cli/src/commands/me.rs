use anyhow::Context;
use sbs_client::ApiClient;
use sbs_config::SbsConfig;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Handle `sbs me`.
pub async fn handle(config: &SbsConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    if !config.api.has_token() {
        tracing::warn!("no api.token configured; the server will reject this request");
    }
    let client = ApiClient::new(config)?;
    let me = client
        .me()
        .await
        .with_context(|| format!("failed to fetch the current user from {}", client.base_url()))?;
    output(&me, flags.format)
}
