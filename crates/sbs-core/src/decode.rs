//! Untyped JSON to typed records, one record at a time.
//!
//! A record that fails to decode is reported as a [`DecodeFailure`] and
//! skipped; its siblings still decode. A record that decodes but breaks its
//! contract is kept, with the violations attached in [`Decoded`].

use std::ops::Deref;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::contract::{ContractViolation, Validate, ValidationContext};
use crate::errors::CoreError;
use crate::ids::Id;

/// Why a record (or a whole kind) could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum DecodeError {
    #[error("missing field `{field}`")]
    MissingField { field: String },

    #[error("wrong type: {detail}")]
    WrongType { detail: String },

    #[error("malformed record: {detail}")]
    Malformed { detail: String },

    #[error("records for kind '{kind}' are not a list")]
    NotAList { kind: String },

    #[error("unknown entity kind '{kind}'")]
    UnknownKind { kind: String },
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        let detail = err.to_string();
        if let Some(rest) = detail.strip_prefix("missing field `") {
            let field = rest.split('`').next().unwrap_or(rest).to_string();
            return Self::MissingField { field };
        }
        if detail.starts_with("invalid type") || detail.starts_with("invalid value") {
            return Self::WrongType { detail };
        }
        Self::Malformed { detail }
    }
}

/// A decoded record with whatever contract violations it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoded<T> {
    pub record: T,
    pub violations: Vec<ContractViolation>,
}

impl<T> Decoded<T> {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_inner(self) -> T {
        self.record
    }

    /// The record, or an error if it broke any constraint.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Contract`] listing every violation.
    pub fn into_strict(self) -> Result<T, CoreError> {
        if self.violations.is_empty() {
            Ok(self.record)
        } else {
            Err(CoreError::Contract(self.violations))
        }
    }
}

impl<T> Deref for Decoded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

/// Decode and validate one record.
///
/// # Errors
///
/// Returns the [`DecodeError`] when `value` does not match `T`'s shape.
pub fn decode_record<T>(value: Value, ctx: &ValidationContext) -> Result<Decoded<T>, DecodeError>
where
    T: DeserializeOwned + Validate,
{
    let record: T = serde_json::from_value(value)?;
    let violations = record.violations(ctx);
    Ok(Decoded { record, violations })
}

/// One record that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeFailure {
    /// Position within its kind's list.
    pub index: usize,
    /// The record's `id`, if it had a readable one.
    pub id: Option<Id>,
    pub error: DecodeError,
}

/// Every record of one kind, decoded independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindBatch<T> {
    pub records: Vec<Decoded<T>>,
    pub failures: Vec<DecodeFailure>,
}

impl<T> Default for KindBatch<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> KindBatch<T>
where
    T: DeserializeOwned + Validate,
{
    pub fn decode(values: impl IntoIterator<Item = Value>, ctx: &ValidationContext) -> Self {
        let mut batch = Self::default();
        for (index, value) in values.into_iter().enumerate() {
            let id = value.get("id").and_then(Value::as_i64);
            match decode_record(value, ctx) {
                Ok(decoded) => batch.records.push(decoded),
                Err(error) => batch.failures.push(DecodeFailure { index, id, error }),
            }
        }
        batch
    }

    /// Decode a kind's value, which must be a JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NotAList`] when `value` is not an array.
    pub fn from_value(
        kind: &str,
        value: Value,
        ctx: &ValidationContext,
    ) -> Result<Self, DecodeError> {
        match value {
            Value::Array(items) => Ok(Self::decode(items, ctx)),
            Value::Null => Ok(Self::default()),
            _ => Err(DecodeError::NotAList {
                kind: kind.to_string(),
            }),
        }
    }
}

impl<T> KindBatch<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The decoded records, violations or not.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter().map(|decoded| &decoded.record)
    }

    /// Only the records with no contract violations.
    pub fn clean(&self) -> impl Iterator<Item = &T> {
        self.records
            .iter()
            .filter(|decoded| decoded.is_clean())
            .map(|decoded| &decoded.record)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::entities::{Comment, User};

    fn user(id: i64) -> Value {
        json!({"id": id, "createDate": "2020-01-01T00:00:00Z", "username": format!("user{id}")})
    }

    #[test]
    fn classifies_serde_errors() {
        let missing = serde_json::from_value::<User>(json!({"id": 1, "createDate": "2020-01-01T00:00:00Z"}))
            .unwrap_err();
        assert_eq!(
            DecodeError::from(missing),
            DecodeError::MissingField {
                field: "username".into()
            }
        );

        let wrong = serde_json::from_value::<User>(json!({"id": "one", "createDate": "2020-01-01T00:00:00Z", "username": "x"}))
            .unwrap_err();
        assert!(matches!(DecodeError::from(wrong), DecodeError::WrongType { .. }));
    }

    #[test]
    fn bad_record_does_not_fail_siblings() {
        let values = vec![user(1), json!({"id": 2, "username": 7}), user(3)];
        let batch = KindBatch::<User>::decode(values, &ValidationContext::default());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].index, 1);
        assert_eq!(batch.failures[0].id, Some(2));
    }

    #[test]
    fn non_list_kind_is_an_error() {
        let err = KindBatch::<User>::from_value("user", json!({"id": 1}), &ValidationContext::default())
            .unwrap_err();
        assert_eq!(err, DecodeError::NotAList { kind: "user".into() });
    }

    #[test]
    fn violations_travel_with_the_record() {
        let value = json!({
            "id": 5,
            "createDate": "2020-01-01T00:00:00Z",
            "editDate": "2020-01-01T00:00:00Z",
            "parentId": 1,
            "content": "k"
        });
        let decoded: Decoded<Comment> = decode_record(value, &ValidationContext::default()).unwrap();
        assert!(!decoded.is_clean());
        assert_eq!(decoded.content, "k");
        assert!(matches!(decoded.into_strict(), Err(CoreError::Contract(v)) if v.len() == 1));
    }
}
