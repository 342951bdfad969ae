use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::{ContractViolation, Validate, ValidationContext};
use crate::entities::{ControlRecord, delegate_hierarchy};

/// An uploaded file. Its bytes are served separately; this is metadata only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(flatten)]
    pub controlled: ControlRecord,
    #[serde(default)]
    pub name: String,
    /// MIME type, e.g. `image/png`.
    #[serde(default)]
    pub file_type: String,
}

delegate_hierarchy!(File, controlled, control);

impl Validate for File {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.controlled.validate(ctx, out);
    }
}
