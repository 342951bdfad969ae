use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Follow live activity and print new events as JSON lines.
    Listen(ListenArgs),
    /// Show the authenticated user.
    Me,
    /// Decode a bundle file and report what is wrong with it.
    Check(CheckArgs),
    /// Compute the permissions a requester has on an entity.
    Perms(PermsArgs),
}

#[derive(Clone, Debug, Args)]
pub struct ListenArgs {
    /// Chain to follow (repeatable; defaults to `listen.chains`).
    #[arg(long = "chain", value_name = "CHAIN")]
    pub chains: Vec<String>,

    /// Resume after this activity id instead of starting fresh.
    #[arg(long, value_name = "ID")]
    pub last_id: Option<i64>,

    /// Stop after this many polls.
    #[arg(long, value_name = "N")]
    pub polls: Option<u32>,

    /// Status to announce on every followed chain.
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct CheckArgs {
    /// Bundle JSON file (`-` for stdin).
    pub path: PathBuf,

    /// Exit with an error when anything is reported.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Clone, Debug, Args)]
pub struct PermsArgs {
    /// Entity JSON file with a `permissions` map.
    pub path: PathBuf,

    /// Requesting user id (anonymous when omitted).
    #[arg(long, value_name = "ID")]
    pub user: Option<i64>,

    /// Treat the requester as a site superuser.
    #[arg(long = "super", requires = "user")]
    pub super_user: bool,

    /// Bundle JSON file whose categories supply local supers.
    #[arg(long, value_name = "BUNDLE")]
    pub categories: Option<PathBuf>,
}
