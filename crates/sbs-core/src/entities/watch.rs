use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::{ContractViolation, Validate, ValidationContext};
use crate::entities::{ViewRecord, delegate_hierarchy};
use crate::ids::Id;

/// A user's subscription to a content item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Watch {
    #[serde(flatten)]
    pub view: ViewRecord,
    pub user_id: Id,
    pub content_id: Id,
    /// Activity id the user has been notified up to.
    #[serde(default)]
    pub last_notification_id: Id,
}

delegate_hierarchy!(Watch, view, view);

impl Validate for Watch {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.view.validate(ctx, out);
    }
}
