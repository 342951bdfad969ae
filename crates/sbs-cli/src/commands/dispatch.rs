use sbs_config::SbsConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    config: &SbsConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Listen(args) => commands::listen::handle(&args, config, flags).await,
        Commands::Me => commands::me::handle(config, flags).await,
        Commands::Check(args) => commands::check::handle(&args, config, flags),
        Commands::Perms(args) => commands::perms::handle(&args, config, flags),
    }
}
