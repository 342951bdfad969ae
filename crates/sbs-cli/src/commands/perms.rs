use anyhow::Context;
use sbs_config::SbsConfig;
use sbs_core::bundle::Bundle;
use sbs_core::entities::{Controlled, ControlRecord, Identified};
use sbs_core::ids::Id;
use sbs_core::permissions::{CategoryTree, PermissionSet, Requester};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::PermsArgs;
use crate::output::{output, read_input};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PermsReport {
    id: Id,
    parent_id: Id,
    user: Option<Id>,
    super_user: bool,
    local_super: bool,
    permissions: PermissionSet,
    /// What the server computed for the token that fetched the record.
    my_perms: String,
}

fn requester(args: &PermsArgs) -> Requester {
    match args.user {
        None => Requester::Anonymous,
        Some(id) if args.super_user => Requester::super_user(id),
        Some(id) => Requester::user(id),
    }
}

fn evaluate(entity: &ControlRecord, tree: &CategoryTree, requester: Requester) -> PermsReport {
    let local_super = match requester {
        Requester::User { id, .. } => tree.is_local_super(entity, id),
        Requester::Anonymous => false,
    };
    PermsReport {
        id: entity.id(),
        parent_id: entity.parent_id(),
        user: requester.id(),
        super_user: requester.is_super(),
        local_super,
        permissions: tree.effective_permissions(entity, requester),
        my_perms: entity.my_perms.clone(),
    }
}

fn category_tree(text: &str, config: &SbsConfig) -> anyhow::Result<CategoryTree> {
    let bundle = Bundle::from_json(text, &config.decode.validation_context())
        .context("categories file is not a bundle")?;
    Ok(bundle
        .categories()
        .map(|batch| CategoryTree::new(batch.iter()))
        .unwrap_or_default())
}

/// Handle `sbs perms`.
pub fn handle(args: &PermsArgs, config: &SbsConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let text = read_input(&args.path)?;
    let entity: ControlRecord = serde_json::from_str(&text)
        .with_context(|| format!("{} is not an entity with permissions", args.path.display()))?;

    let tree = match &args.categories {
        Some(path) => category_tree(&read_input(path)?, config)?,
        None => CategoryTree::default(),
    };

    output(&evaluate(&entity, &tree, requester(args)), flags.format)
}
