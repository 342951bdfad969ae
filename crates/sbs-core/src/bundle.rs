//! Heterogeneous record bundles: kind tag to list of records.
//!
//! The API answers chain reads and listen polls with one JSON object whose
//! keys are entity-kind tags and whose values are record lists. A bundle may
//! carry any subset of kinds. Each kind decodes on its own, each record on
//! its own; an unknown tag is kept as raw JSON and logged.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::aggregate::{ActivityAggregate, CommentAggregate};
use crate::contract::{ContractViolation, ValidationContext};
use crate::decode::{DecodeError, DecodeFailure, KindBatch};
use crate::entities::{Category, Comment, Content, Event, File, Identified, User, Vote, Watch};
use crate::enums::EntityType;
use crate::ids::Id;

/// A bundle as it arrives: tag to raw value.
pub type RawBundle = serde_json::Map<String, Value>;

/// One kind's decoded records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindRecords {
    User(KindBatch<User>),
    Content(KindBatch<Content>),
    Category(KindBatch<Category>),
    Comment(KindBatch<Comment>),
    File(KindBatch<File>),
    CommentAggregate(KindBatch<CommentAggregate>),
    Activity(KindBatch<Event>),
    ActivityAggregate(KindBatch<ActivityAggregate>),
    Vote(KindBatch<Vote>),
    Watch(KindBatch<Watch>),
}

/// Run `$body` with `$batch` bound to whichever batch `$records` holds.
macro_rules! with_batch {
    ($records:expr, $batch:ident => $body:expr) => {
        match $records {
            KindRecords::User($batch) => $body,
            KindRecords::Content($batch) => $body,
            KindRecords::Category($batch) => $body,
            KindRecords::Comment($batch) => $body,
            KindRecords::File($batch) => $body,
            KindRecords::CommentAggregate($batch) => $body,
            KindRecords::Activity($batch) => $body,
            KindRecords::ActivityAggregate($batch) => $body,
            KindRecords::Vote($batch) => $body,
            KindRecords::Watch($batch) => $body,
        }
    };
}

impl KindRecords {
    /// Decode `value` as a list of `kind` records.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NotAList`] when `value` is not an array.
    pub fn decode(kind: EntityType, value: Value, ctx: &ValidationContext) -> Result<Self, DecodeError> {
        let tag = kind.as_str();
        Ok(match kind {
            EntityType::User => Self::User(KindBatch::from_value(tag, value, ctx)?),
            EntityType::Content => Self::Content(KindBatch::from_value(tag, value, ctx)?),
            EntityType::Category => Self::Category(KindBatch::from_value(tag, value, ctx)?),
            EntityType::Comment => Self::Comment(KindBatch::from_value(tag, value, ctx)?),
            EntityType::File => Self::File(KindBatch::from_value(tag, value, ctx)?),
            EntityType::CommentAggregate => {
                Self::CommentAggregate(KindBatch::from_value(tag, value, ctx)?)
            }
            EntityType::Activity => Self::Activity(KindBatch::from_value(tag, value, ctx)?),
            EntityType::ActivityAggregate => {
                Self::ActivityAggregate(KindBatch::from_value(tag, value, ctx)?)
            }
            EntityType::Vote => Self::Vote(KindBatch::from_value(tag, value, ctx)?),
            EntityType::Watch => Self::Watch(KindBatch::from_value(tag, value, ctx)?),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> EntityType {
        match self {
            Self::User(_) => EntityType::User,
            Self::Content(_) => EntityType::Content,
            Self::Category(_) => EntityType::Category,
            Self::Comment(_) => EntityType::Comment,
            Self::File(_) => EntityType::File,
            Self::CommentAggregate(_) => EntityType::CommentAggregate,
            Self::Activity(_) => EntityType::Activity,
            Self::ActivityAggregate(_) => EntityType::ActivityAggregate,
            Self::Vote(_) => EntityType::Vote,
            Self::Watch(_) => EntityType::Watch,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        with_batch!(self, batch => batch.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn failures(&self) -> &[DecodeFailure] {
        with_batch!(self, batch => &batch.failures)
    }

    /// Ids of the decoded records, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<Id> {
        with_batch!(self, batch => batch.iter().map(Identified::id).collect())
    }

    /// `(id, violations)` for every record that broke its contract.
    #[must_use]
    pub fn violations(&self) -> Vec<(Id, &[ContractViolation])> {
        with_batch!(self, batch => batch
            .records
            .iter()
            .filter(|decoded| !decoded.is_clean())
            .map(|decoded| (decoded.record.id(), decoded.violations.as_slice()))
            .collect())
    }
}

/// A decode failure located within a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    /// The tag as received.
    pub kind: String,
    /// Record position, absent when the whole kind failed.
    pub index: Option<usize>,
    pub id: Option<Id>,
    pub error: DecodeError,
}

/// A contract violation located within a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationEntry {
    pub kind: EntityType,
    pub id: Id,
    pub violation: ContractViolation,
}

/// A decoded bundle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bundle {
    kinds: BTreeMap<EntityType, KindRecords>,
    unknown_kinds: BTreeMap<String, Value>,
    kind_failures: BTreeMap<String, DecodeError>,
}

macro_rules! typed_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[must_use]
        pub fn $name(&self) -> Option<&KindBatch<$ty>> {
            match self.kinds.get(&EntityType::$variant) {
                Some(KindRecords::$variant(batch)) => Some(batch),
                _ => None,
            }
        }
    };
}

impl Bundle {
    /// Decode every kind in `raw`. Never fails as a whole.
    #[must_use]
    pub fn decode(raw: RawBundle, ctx: &ValidationContext) -> Self {
        let mut bundle = Self::default();
        for (tag, value) in raw {
            let Ok(kind) = tag.parse::<EntityType>() else {
                tracing::warn!(kind = %tag, "unknown entity kind in bundle, keeping raw records");
                bundle.unknown_kinds.insert(tag, value);
                continue;
            };
            if bundle.kinds.contains_key(&kind) {
                tracing::warn!(kind = %tag, "duplicate entity kind in bundle, ignoring");
                bundle.kind_failures.insert(
                    tag,
                    DecodeError::Malformed {
                        detail: format!("duplicate kind tag for '{kind}'"),
                    },
                );
                continue;
            }
            match KindRecords::decode(kind, value, ctx) {
                Ok(records) => {
                    log_problems(&tag, &records);
                    bundle.kinds.insert(kind, records);
                }
                Err(error) => {
                    tracing::warn!(kind = %tag, %error, "entity kind failed to decode");
                    bundle.kind_failures.insert(tag, error);
                }
            }
        }
        bundle
    }

    /// Decode a bundle from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the text is not a JSON object.
    pub fn from_json(text: &str, ctx: &ValidationContext) -> Result<Self, DecodeError> {
        Self::from_value(serde_json::from_str(text)?, ctx)
    }

    /// Decode a bundle from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] when `value` is not an object.
    pub fn from_value(value: Value, ctx: &ValidationContext) -> Result<Self, DecodeError> {
        match value {
            Value::Object(raw) => Ok(Self::decode(raw, ctx)),
            Value::Null => Ok(Self::default()),
            other => Err(DecodeError::Malformed {
                detail: format!("bundle must be an object, got {}", json_type(&other)),
            }),
        }
    }

    #[must_use]
    pub fn get(&self, kind: EntityType) -> Option<&KindRecords> {
        self.kinds.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &KindRecords> {
        self.kinds.values()
    }

    #[must_use]
    pub fn contains(&self, kind: EntityType) -> bool {
        self.kinds.contains_key(&kind)
    }

    #[must_use]
    pub const fn unknown_kinds(&self) -> &BTreeMap<String, Value> {
        &self.unknown_kinds
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.values().all(KindRecords::is_empty)
    }

    /// Decoded records across all kinds.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.kinds.values().map(KindRecords::len).sum()
    }

    typed_accessor!(users, User, User);
    typed_accessor!(contents, Content, Content);
    typed_accessor!(categories, Category, Category);
    typed_accessor!(comments, Comment, Comment);
    typed_accessor!(files, File, File);
    typed_accessor!(comment_aggregates, CommentAggregate, CommentAggregate);
    typed_accessor!(events, Activity, Event);
    typed_accessor!(activity_aggregates, ActivityAggregate, ActivityAggregate);
    typed_accessor!(votes, Vote, Vote);
    typed_accessor!(watches, Watch, Watch);

    /// Every decode problem: failed records, failed kinds, unknown kinds.
    #[must_use]
    pub fn failures(&self) -> Vec<FailureEntry> {
        let records = self.kinds.values().flat_map(|records| {
            records.failures().iter().map(|failure| FailureEntry {
                kind: records.kind().to_string(),
                index: Some(failure.index),
                id: failure.id,
                error: failure.error.clone(),
            })
        });
        let kinds = self.kind_failures.iter().map(|(tag, error)| FailureEntry {
            kind: tag.clone(),
            index: None,
            id: None,
            error: error.clone(),
        });
        let unknown = self.unknown_kinds.keys().map(|tag| FailureEntry {
            kind: tag.clone(),
            index: None,
            id: None,
            error: DecodeError::UnknownKind { kind: tag.clone() },
        });
        records.chain(kinds).chain(unknown).collect()
    }

    /// Every contract violation, tagged with kind and record id.
    #[must_use]
    pub fn violations(&self) -> Vec<ViolationEntry> {
        self.kinds
            .values()
            .flat_map(|records| {
                let kind = records.kind();
                records
                    .violations()
                    .into_iter()
                    .flat_map(move |(id, violations)| {
                        violations.iter().map(move |violation| ViolationEntry {
                            kind,
                            id,
                            violation: violation.clone(),
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

fn log_problems(tag: &str, records: &KindRecords) {
    for failure in records.failures() {
        tracing::warn!(
            kind = %tag,
            index = failure.index,
            id = ?failure.id,
            error = %failure.error,
            "record failed to decode"
        );
    }
    for (id, violations) in records.violations() {
        for violation in violations {
            tracing::warn!(kind = %tag, id, %violation, "contract violation");
        }
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn raw(value: Value) -> RawBundle {
        match value {
            Value::Object(map) => map,
            _ => panic!("test bundle must be an object"),
        }
    }

    fn user(id: Id) -> Value {
        json!({"id": id, "createDate": "2020-01-01T00:00:00Z", "username": format!("u{id}")})
    }

    #[test]
    fn decodes_kinds_independently() {
        let bundle = Bundle::decode(
            raw(json!({
                "user": [user(1), user(2)],
                "comment": "not a list",
                "vote": []
            })),
            &ValidationContext::default(),
        );
        assert_eq!(bundle.users().map(KindBatch::len), Some(2));
        assert!(bundle.comments().is_none());
        assert!(bundle.votes().is_some_and(KindBatch::is_empty));
        let failures = bundle.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, "comment");
        assert_eq!(failures[0].index, None);
    }

    #[test]
    fn unknown_kind_is_kept_and_reported() {
        let bundle = Bundle::decode(
            raw(json!({"User": [user(1)], "badge": [{"id": 1}]})),
            &ValidationContext::default(),
        );
        assert_eq!(bundle.record_count(), 1);
        assert!(bundle.unknown_kinds().contains_key("badge"));
        assert_eq!(
            bundle.failures()[0].error,
            DecodeError::UnknownKind { kind: "badge".into() }
        );
    }

    #[test]
    fn duplicate_tag_is_a_kind_failure() {
        let bundle = Bundle::decode(
            raw(json!({"USER": [user(1)], "user": [user(2)]})),
            &ValidationContext::default(),
        );
        assert_eq!(bundle.users().map(KindBatch::len), Some(1));
        let failures = bundle.failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0].error, DecodeError::Malformed { .. }));
    }

    #[test]
    fn top_level_must_be_object() {
        let err = Bundle::from_json("[1,2]", &ValidationContext::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
        assert!(Bundle::from_json("null", &ValidationContext::default()).unwrap().is_empty());
    }

    #[test]
    fn violations_are_flattened_with_ids() {
        let bundle = Bundle::decode(
            raw(json!({"comment": [{
                "id": 44,
                "createDate": "2020-01-01T00:00:00Z",
                "editDate": "2019-01-01T00:00:00Z",
                "parentId": 3,
                "content": "x"
            }]})),
            &ValidationContext::default(),
        );
        let violations = bundle.violations();
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.kind == EntityType::Comment && v.id == 44));
    }
}
