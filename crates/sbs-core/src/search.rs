//! Search filters and chain read requests.
//!
//! A chain read asks for several kinds in one round trip. Each request names
//! a kind and a filter; empty filter fields are left off the wire so the
//! server applies its defaults.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::EntityType;
use crate::ids::Id;
use crate::wire_serde;

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Filter fields shared by every kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntitySearch {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    /// Field to sort by, e.g. `id` or `editDate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reverse: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "wire_serde::timestamp_option"
    )]
    #[schemars(with = "Option<DateTime<Utc>>")]
    pub create_start: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "wire_serde::timestamp_option"
    )]
    #[schemars(with = "Option<DateTime<Utc>>")]
    pub create_end: Option<DateTime<Utc>>,
}

impl EntitySearch {
    #[must_use]
    pub fn by_ids(ids: impl IntoIterator<Item = Id>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, reverse: bool) -> Self {
        self.sort = Some(field.into());
        self.reverse = reverse;
        self
    }

    #[must_use]
    pub const fn created_between(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.create_start = start;
        self.create_end = end;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentSearch {
    #[serde(flatten)]
    pub base: EntitySearch,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_ids: Vec<Id>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// SQL-style `LIKE` pattern on the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_like: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentSearch {
    #[serde(flatten)]
    pub base: EntitySearch,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_ids: Vec<Id>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<Id>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_deleted: bool,
}

/// Any kind's filter. Serialized as the bare filter object.
#[derive(Debug, Clone, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum SearchFilter {
    Content(ContentSearch),
    Comment(CommentSearch),
    Entity(EntitySearch),
}

impl From<EntitySearch> for SearchFilter {
    fn from(search: EntitySearch) -> Self {
        Self::Entity(search)
    }
}

impl From<ContentSearch> for SearchFilter {
    fn from(search: ContentSearch) -> Self {
        Self::Content(search)
    }
}

impl From<CommentSearch> for SearchFilter {
    fn from(search: CommentSearch) -> Self {
        Self::Comment(search)
    }
}

/// One kind within a chain read.
#[derive(Debug, Clone, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ChainRequest {
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub search: SearchFilter,
}

impl ChainRequest {
    #[must_use]
    pub fn new(kind: EntityType, search: impl Into<SearchFilter>) -> Self {
        Self {
            kind,
            search: search.into(),
        }
    }
}

/// A heterogeneous read: the response is a bundle keyed by kind.
#[derive(Debug, Clone, Default, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ChainQuery {
    pub requests: Vec<ChainRequest>,
}

impl ChainQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, kind: EntityType, search: impl Into<SearchFilter>) -> Self {
        self.requests.push(ChainRequest::new(kind, search));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
