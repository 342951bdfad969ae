//! The four record levels every entity is composed from.
//!
//! ```text
//! ViewRecord     id, createDate
//!  └ EditRecord    + editDate, createUserId, editUserId
//!     └ ControlRecord  + parentId, permissions, myPerms
//!        └ NamedRecord    + name, values
//! ```
//!
//! Each level embeds the one above it with `#[serde(flatten)]`, so the wire
//! shape stays a single flat object. The capability traits expose the
//! levels to generic code; concrete entities implement them by delegating
//! to the record they embed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::{
    ContractViolation, NAME_MAX, NAME_MIN, Validate, ValidationContext, check_created,
    check_edited, check_length, check_permission_string,
};
use crate::ids::Id;
use crate::wire_serde;

/// Implement the capability traits for `$ty` by delegating to its
/// embedded record field, down to the given level.
macro_rules! delegate_hierarchy {
    ($ty:ty, $field:ident, view) => {
        impl $crate::entities::Identified for $ty {
            fn id(&self) -> $crate::ids::Id {
                $crate::entities::Identified::id(&self.$field)
            }
        }

        impl $crate::entities::Viewed for $ty {
            fn view_record(&self) -> &$crate::entities::ViewRecord {
                $crate::entities::Viewed::view_record(&self.$field)
            }
        }
    };
    ($ty:ty, $field:ident, edit) => {
        $crate::entities::delegate_hierarchy!($ty, $field, view);

        impl $crate::entities::Edited for $ty {
            fn edit_record(&self) -> &$crate::entities::EditRecord {
                $crate::entities::Edited::edit_record(&self.$field)
            }
        }
    };
    ($ty:ty, $field:ident, control) => {
        $crate::entities::delegate_hierarchy!($ty, $field, edit);

        impl $crate::entities::Controlled for $ty {
            fn control_record(&self) -> &$crate::entities::ControlRecord {
                $crate::entities::Controlled::control_record(&self.$field)
            }
        }
    };
    ($ty:ty, $field:ident, named) => {
        $crate::entities::delegate_hierarchy!($ty, $field, control);

        impl $crate::entities::Named for $ty {
            fn named_record(&self) -> &$crate::entities::NamedRecord {
                $crate::entities::Named::named_record(&self.$field)
            }
        }
    };
}

pub(crate) use delegate_hierarchy;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    pub id: Id,
    #[serde(with = "wire_serde::timestamp")]
    #[schemars(with = "DateTime<Utc>")]
    pub create_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    #[serde(flatten)]
    pub view: ViewRecord,
    #[serde(with = "wire_serde::timestamp")]
    #[schemars(with = "DateTime<Utc>")]
    pub edit_date: DateTime<Utc>,
    #[serde(default)]
    pub create_user_id: Id,
    #[serde(default)]
    pub edit_user_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ControlRecord {
    #[serde(flatten)]
    pub entity: EditRecord,
    #[serde(default)]
    pub parent_id: Id,
    /// User id to permission string. Key `0` is the default for everyone.
    #[serde(default, with = "wire_serde::id_keyed")]
    #[schemars(with = "BTreeMap<String, String>")]
    pub permissions: BTreeMap<Id, String>,
    /// The requesting user's effective permissions, computed server-side.
    #[serde(default, deserialize_with = "wire_serde::null_default::deserialize")]
    pub my_perms: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NamedRecord {
    #[serde(flatten)]
    pub controlled: ControlRecord,
    pub name: String,
    #[serde(default, deserialize_with = "wire_serde::null_default::deserialize")]
    pub values: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

pub trait Identified {
    fn id(&self) -> Id;
}

pub trait Viewed: Identified {
    fn view_record(&self) -> &ViewRecord;

    fn create_date(&self) -> DateTime<Utc> {
        self.view_record().create_date
    }
}

pub trait Edited: Viewed {
    fn edit_record(&self) -> &EditRecord;

    fn edit_date(&self) -> DateTime<Utc> {
        self.edit_record().edit_date
    }

    fn create_user_id(&self) -> Id {
        self.edit_record().create_user_id
    }

    fn edit_user_id(&self) -> Id {
        self.edit_record().edit_user_id
    }
}

pub trait Controlled: Edited {
    fn control_record(&self) -> &ControlRecord;

    fn parent_id(&self) -> Id {
        self.control_record().parent_id
    }

    fn permissions(&self) -> &BTreeMap<Id, String> {
        &self.control_record().permissions
    }

    fn my_perms(&self) -> &str {
        &self.control_record().my_perms
    }
}

pub trait Named: Controlled {
    fn named_record(&self) -> &NamedRecord;

    fn name(&self) -> &str {
        &self.named_record().name
    }

    fn values(&self) -> &BTreeMap<String, String> {
        &self.named_record().values
    }
}

// ---------------------------------------------------------------------------
// Record impls
// ---------------------------------------------------------------------------

impl Identified for ViewRecord {
    fn id(&self) -> Id {
        self.id
    }
}

impl Viewed for ViewRecord {
    fn view_record(&self) -> &ViewRecord {
        self
    }
}

impl Validate for ViewRecord {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        check_created(self.create_date, ctx, out);
    }
}

impl Identified for EditRecord {
    fn id(&self) -> Id {
        self.view.id
    }
}

impl Viewed for EditRecord {
    fn view_record(&self) -> &ViewRecord {
        &self.view
    }
}

impl Edited for EditRecord {
    fn edit_record(&self) -> &EditRecord {
        self
    }
}

impl Validate for EditRecord {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.view.validate(ctx, out);
        check_edited(self.view.create_date, self.edit_date, out);
    }
}

delegate_hierarchy!(ControlRecord, entity, edit);

impl Controlled for ControlRecord {
    fn control_record(&self) -> &ControlRecord {
        self
    }
}

impl Validate for ControlRecord {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.entity.validate(ctx, out);
        for (user, perms) in &self.permissions {
            check_permission_string(&format!("permissions[{user}]"), perms, out);
        }
        check_permission_string("myPerms", &self.my_perms, out);
    }
}

delegate_hierarchy!(NamedRecord, controlled, control);

impl Named for NamedRecord {
    fn named_record(&self) -> &NamedRecord {
        self
    }
}

impl Validate for NamedRecord {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.controlled.validate(ctx, out);
        check_length("name", &self.name, NAME_MIN, NAME_MAX, out);
    }
}
