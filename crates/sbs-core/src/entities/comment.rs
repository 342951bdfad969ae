use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::{
    COMMENT_BODY_MAX, COMMENT_BODY_MIN, ContractViolation, Validate, ValidationContext,
    check_length,
};
use crate::entities::{EditRecord, delegate_hierarchy};
use crate::ids::{Id, is_unset};

/// A comment on a content item.
///
/// Deleted comments stay in the stream so aggregates and listeners can see
/// the deletion; their body must be treated as cleared.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(flatten)]
    pub entity: EditRecord,
    /// Content this comment belongs to. Required.
    pub parent_id: Id,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub deleted: bool,
}

impl Comment {
    /// The body, or `None` for a deleted comment.
    #[must_use]
    pub fn visible_content(&self) -> Option<&str> {
        if self.deleted {
            None
        } else {
            Some(&self.content)
        }
    }
}

delegate_hierarchy!(Comment, entity, edit);

impl Validate for Comment {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.entity.validate(ctx, out);
        if is_unset(self.parent_id) {
            out.push(ContractViolation::MissingReference {
                field: "parentId",
                id: self.parent_id,
            });
        }
        if !self.deleted {
            check_length(
                "content",
                &self.content,
                COMMENT_BODY_MIN,
                COMMENT_BODY_MAX,
                out,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn comment(content: &str, deleted: bool) -> Comment {
        serde_json::from_value(json!({
            "id": 9001,
            "createDate": "2021-07-07T07:07:07Z",
            "editDate": "2021-07-07T07:07:07Z",
            "createUserId": 5,
            "editUserId": 5,
            "parentId": 300,
            "content": content,
            "deleted": deleted
        }))
        .unwrap()
    }

    #[test]
    fn deleted_comment_hides_body() {
        let c = comment("stale text", true);
        assert_eq!(c.visible_content(), None);
        assert_eq!(comment("hello", false).visible_content(), Some("hello"));
    }

    #[test]
    fn one_char_comment_is_a_violation() {
        let c = comment("k", false);
        let violations = c.violations(&ValidationContext::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(c.visible_content(), Some("k"));
    }

    #[test]
    fn deleted_comment_skips_length_check() {
        let c = comment("", true);
        assert!(c.violations(&ValidationContext::default()).is_empty());
    }

    #[test]
    fn parent_is_required() {
        let missing = serde_json::from_value::<Comment>(json!({
            "id": 1,
            "createDate": "2021-07-07T07:07:07Z",
            "editDate": "2021-07-07T07:07:07Z",
            "content": "hi there"
        }));
        assert!(missing.is_err());

        let mut zero = comment("hi there", false);
        zero.parent_id = 0;
        assert!(matches!(
            zero.violations(&ValidationContext::default()).as_slice(),
            [ContractViolation::MissingReference { field: "parentId", id: 0 }]
        ));
    }
}
