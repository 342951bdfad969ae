use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::{ContractViolation, Validate, ValidationContext};
use crate::entities::{ViewRecord, delegate_hierarchy};
use crate::ids::Id;

/// A site user as seen by anyone.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub view: ViewRecord,
    pub username: String,
    /// File id of the avatar image, `0` for none.
    #[serde(default)]
    pub avatar: Id,
}

delegate_hierarchy!(User, view, view);

impl Validate for User {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.view.validate(ctx, out);
    }
}

/// The authenticated user's own record, with private fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSelf {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "super", default)]
    pub super_user: bool,
}

delegate_hierarchy!(UserSelf, user, view);

impl Validate for UserSelf {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.user.validate(ctx, out);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::entities::Identified;

    #[test]
    fn user_self_reads_super_flag() {
        let me: UserSelf = serde_json::from_value(json!({
            "id": 5,
            "createDate": "2019-05-05T10:00:00",
            "username": "randomouscrap98",
            "avatar": 101,
            "email": "r@example.com",
            "super": true
        }))
        .unwrap();
        assert_eq!(me.id(), 5);
        assert!(me.super_user);
        assert_eq!(me.user.avatar, 101);

        let back = serde_json::to_value(&me).unwrap();
        assert_eq!(back["super"], true);
        assert_eq!(back["createDate"], "2019-05-05T10:00:00Z");
    }

    #[test]
    fn missing_username_is_an_error() {
        let result = serde_json::from_value::<User>(json!({
            "id": 5,
            "createDate": "2019-05-05T10:00:00Z"
        }));
        assert!(result.is_err());
    }
}
