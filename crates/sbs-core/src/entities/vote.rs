use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::{ContractViolation, Validate, ValidationContext};
use crate::entities::{ViewRecord, delegate_hierarchy};
use crate::enums::VoteType;
use crate::ids::Id;

/// One user's vote on one content item. `vote: None` means the vote was
/// withdrawn.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    #[serde(flatten)]
    pub view: ViewRecord,
    pub user_id: Id,
    pub content_id: Id,
    #[serde(default)]
    pub vote: Option<VoteType>,
}

delegate_hierarchy!(Vote, view, view);

impl Validate for Vote {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.view.validate(ctx, out);
    }
}
