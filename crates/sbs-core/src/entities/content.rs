use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::contract::{
    CONTENT_BODY_MAX, CONTENT_BODY_MIN, ContractViolation, Validate, ValidationContext,
    check_length,
};
use crate::entities::{NamedRecord, delegate_hierarchy};
use crate::enums::VoteType;

/// A page, program, or other piece of user-authored content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(flatten)]
    pub named: NamedRecord,
    pub content: String,
    /// Free-form subtype tag (`program`, `resource`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "crate::wire_serde::null_default::deserialize")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "crate::wire_serde::null_default::deserialize")]
    pub about: ContentAbout,
}

/// Rollups the server attaches to a content item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentAbout {
    #[serde(default)]
    pub comments: Aggregate,
    #[serde(default)]
    pub watches: Aggregate,
    #[serde(default)]
    pub votes: BTreeMap<VoteType, Aggregate>,
    #[serde(default)]
    pub watching: bool,
    #[serde(default)]
    pub my_vote: Option<VoteType>,
}

impl ContentAbout {
    /// Count for one vote value, `0` when the server sent no bucket.
    #[must_use]
    pub fn vote_count(&self, vote: VoteType) -> i64 {
        self.votes.get(&vote).map_or(0, |agg| agg.count)
    }
}

delegate_hierarchy!(Content, named, named);

impl Validate for Content {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.named.validate(ctx, out);
        check_length(
            "content",
            &self.content,
            CONTENT_BODY_MIN,
            CONTENT_BODY_MAX,
            out,
        );
        self.about.comments.validate(ctx, out);
        self.about.watches.validate(ctx, out);
        for agg in self.about.votes.values() {
            agg.validate(ctx, out);
        }
    }
}
