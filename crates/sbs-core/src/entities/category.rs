use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::{
    ContractViolation, DESCRIPTION_MAX, Validate, ValidationContext, check_length,
};
use crate::entities::{NamedRecord, delegate_hierarchy};
use crate::ids::Id;

/// A node in the category tree. Contents and child categories point at it
/// through `parentId`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(flatten)]
    pub named: NamedRecord,
    #[serde(default)]
    pub description: String,
    /// Users with full control over this category and everything below it.
    #[serde(default, deserialize_with = "crate::wire_serde::null_default::deserialize")]
    pub local_supers: Vec<Id>,
}

delegate_hierarchy!(Category, named, named);

impl Validate for Category {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.named.validate(ctx, out);
        check_length("description", &self.description, 0, DESCRIPTION_MAX, out);
    }
}
