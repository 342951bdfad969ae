//! Serde helpers for the remote API's wire conventions.
//!
//! Use with `#[serde(with = "crate::wire_serde::...")]` on struct fields.
//! Fields using these helpers also need a `#[schemars(with = "...")]`
//! attribute naming the wire type, since schemars reads `with` as a type.
//!
//! # Example
//! ```ignore
//! #[derive(Serialize, Deserialize, JsonSchema)]
//! struct Record {
//!     #[serde(with = "wire_serde::timestamp")]
//!     #[schemars(with = "DateTime<Utc>")]
//!     pub create_date: DateTime<Utc>,
//!
//!     #[serde(default, with = "wire_serde::id_keyed")]
//!     #[schemars(with = "BTreeMap<String, String>")]
//!     pub permissions: BTreeMap<Id, String>,
//! }
//! ```

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer, de};

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (any offset) and offset-less date-times, which are read
/// as UTC.
///
/// # Errors
///
/// Returns a description of the input when it matches neither form.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// `DateTime<Utc>` as an ISO-8601 string.
pub mod timestamp {
    use super::{DateTime, Deserialize, Deserializer, Serializer, Utc, de};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(de::Error::custom)
    }
}

/// `Option<DateTime<Utc>>` as an ISO-8601 string or `null`.
pub mod timestamp_option {
    use super::{DateTime, Deserialize, Deserializer, Serializer, Utc, de};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => s.serialize_some(&super::format_timestamp(dt)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => super::parse_timestamp(&raw).map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Maps keyed by entity id.
///
/// JSON object keys are always strings; this parses them into ids on the way
/// in and writes them back as decimal strings. Parsing happens here rather
/// than through serde's integer-key support so it also works beneath
/// `#[serde(flatten)]`.
pub mod id_keyed {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

    use crate::ids::Id;

    pub fn serialize<S, V>(map: &BTreeMap<Id, V>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        s.collect_map(map.iter().map(|(id, value)| (id.to_string(), value)))
    }

    pub fn deserialize<'de, D, V>(d: D) -> Result<BTreeMap<Id, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        let raw = Option::<BTreeMap<String, V>>::deserialize(d)?.unwrap_or_default();
        raw.into_iter()
            .map(|(key, value)| {
                key.trim()
                    .parse::<Id>()
                    .map(|id| (id, value))
                    .map_err(|_| de::Error::custom(format!("invalid id key '{key}'")))
            })
            .collect()
    }
}

/// Treat an explicit `null` like an absent field.
pub mod null_default {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }
}
