use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::{ContractViolation, Validate, ValidationContext, check_created};
use crate::entities::Identified;
use crate::enums::{CrudAction, EntityType};
use crate::ids::{Id, SYSTEM_USER};
use crate::wire_serde;

/// One entry of the activity log.
///
/// Ids increase monotonically, which is what makes them usable as a resume
/// token. `contentId` is an id of the kind named by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Id,
    #[serde(with = "wire_serde::timestamp")]
    #[schemars(with = "DateTime<Utc>")]
    pub date: DateTime<Utc>,
    pub user_id: Id,
    pub content_id: Id,
    #[serde(rename = "type")]
    pub kind: EntityType,
    /// Subtype of the target when it is content (`program`, ...).
    #[serde(default, deserialize_with = "wire_serde::null_default::deserialize")]
    pub content_type: String,
    pub action: CrudAction,
    #[serde(default, deserialize_with = "wire_serde::null_default::deserialize")]
    pub extra: String,
}

impl Event {
    /// True for events generated by the site itself rather than a user.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.user_id == SYSTEM_USER
    }
}

impl Identified for Event {
    fn id(&self) -> Id {
        self.id
    }
}

impl Validate for Event {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        check_created(self.date, ctx, out);
    }
}
