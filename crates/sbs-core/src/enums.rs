//! Entity kind tags, CRUD actions, and vote values.
//!
//! All enums serialize as lowercase strings. Decoding is case-insensitive and
//! also accepts the single-letter forms the API uses in compact payloads
//! (`c`/`u`/`d`, `b`/`o`/`g`).

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::fmt;
use std::str::FromStr;

/// Implement `Deserialize` through the type's `FromStr`.
macro_rules! deserialize_via_from_str {
    ($ty:ty) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(d)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

/// Unrecognized enum literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} '{value}'")]
pub struct UnknownLiteral {
    pub what: &'static str,
    pub value: String,
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Closed set of record kinds a bundle can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    User,
    Content,
    Category,
    Comment,
    File,
    CommentAggregate,
    Activity,
    ActivityAggregate,
    Vote,
    Watch,
}

impl EntityType {
    pub const ALL: [Self; 10] = [
        Self::User,
        Self::Content,
        Self::Category,
        Self::Comment,
        Self::File,
        Self::CommentAggregate,
        Self::Activity,
        Self::ActivityAggregate,
        Self::Vote,
        Self::Watch,
    ];

    /// Wire tag for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Content => "content",
            Self::Category => "category",
            Self::Comment => "comment",
            Self::File => "file",
            Self::CommentAggregate => "commentaggregate",
            Self::Activity => "activity",
            Self::ActivityAggregate => "activityaggregate",
            Self::Vote => "vote",
            Self::Watch => "watch",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = UnknownLiteral;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownLiteral {
                what: "entity type",
                value: s.to_string(),
            })
    }
}

deserialize_via_from_str!(EntityType);

// ---------------------------------------------------------------------------
// CrudAction
// ---------------------------------------------------------------------------

/// What an activity event did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CrudAction {
    Create,
    Update,
    Delete,
}

impl CrudAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for CrudAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrudAction {
    type Err = UnknownLiteral;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" | "c" => Ok(Self::Create),
            "update" | "u" => Ok(Self::Update),
            "delete" | "d" => Ok(Self::Delete),
            _ => Err(UnknownLiteral {
                what: "action",
                value: s.to_string(),
            }),
        }
    }
}

deserialize_via_from_str!(CrudAction);

// ---------------------------------------------------------------------------
// VoteType
// ---------------------------------------------------------------------------

/// A user's rating of a content item. "No vote" is `None`, never a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Bad,
    Okay,
    Great,
}

impl VoteType {
    pub const ALL: [Self; 3] = [Self::Bad, Self::Okay, Self::Great];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bad => "bad",
            Self::Okay => "okay",
            Self::Great => "great",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = UnknownLiteral;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bad" | "b" => Ok(Self::Bad),
            "okay" | "o" => Ok(Self::Okay),
            "great" | "g" => Ok(Self::Great),
            _ => Err(UnknownLiteral {
                what: "vote",
                value: s.to_string(),
            }),
        }
    }
}

deserialize_via_from_str!(VoteType);
