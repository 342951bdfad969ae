//! Record contracts: documented field constraints checked after decode.
//!
//! A violation never rejects a record. Decoding attaches the violations to
//! the record (see [`crate::decode::Decoded`]) and consumers decide what to
//! do with them.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::ids::Id;

pub const NAME_MIN: usize = 1;
pub const NAME_MAX: usize = 128;
pub const DESCRIPTION_MAX: usize = 2048;
pub const CONTENT_BODY_MIN: usize = 2;
pub const CONTENT_BODY_MAX: usize = 65_536;
pub const COMMENT_BODY_MIN: usize = 2;
pub const COMMENT_BODY_MAX: usize = 4096;

/// Default allowance for server clocks running ahead of ours.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 300;

/// Letters allowed in a permission string.
pub const PERMISSION_ALPHABET: &str = "CRUD";

/// One broken constraint on a decoded record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum ContractViolation {
    #[error("{field} length {len} outside {min}..={max}")]
    Length {
        field: &'static str,
        len: usize,
        min: usize,
        max: usize,
    },

    #[error("{field} has letters outside {{C,R,U,D}}: '{value}'")]
    PermissionAlphabet { field: String, value: String },

    #[error("createDate {create_date} is in the future")]
    CreatedInFuture { create_date: DateTime<Utc> },

    #[error("editDate {edit_date} precedes createDate {create_date}")]
    EditBeforeCreate {
        create_date: DateTime<Utc>,
        edit_date: DateTime<Utc>,
    },

    #[error("count must be non-negative, got {count}")]
    NegativeCount { count: i64 },

    #[error("aggregate has timestamps but count is 0")]
    TimestampsWithoutPosts,

    #[error("aggregate count is {count} but timestamps are missing")]
    MissingTimestamps { count: i64 },

    #[error("firstPost {first_post} is after lastPost {last_post}")]
    PostsOutOfOrder {
        first_post: DateTime<Utc>,
        last_post: DateTime<Utc>,
    },

    #[error("{field} is required but unset ({id})")]
    MissingReference { field: &'static str, id: Id },
}

/// Inputs for time-dependent checks.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext {
    pub now: DateTime<Utc>,
    pub clock_skew: Duration,
}

impl ValidationContext {
    #[must_use]
    pub const fn new(now: DateTime<Utc>, clock_skew: Duration) -> Self {
        Self { now, clock_skew }
    }

    /// Context anchored at the current time with the given skew allowance.
    #[must_use]
    pub fn with_skew_secs(secs: i64) -> Self {
        Self::new(
            Utc::now(),
            Duration::try_seconds(secs).unwrap_or(Duration::MAX),
        )
    }

    /// Latest `createDate` that is still acceptable. Unbounded when the skew
    /// reaches past the representable range.
    #[must_use]
    pub fn latest_acceptable(&self) -> DateTime<Utc> {
        self.now
            .checked_add_signed(self.clock_skew)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::with_skew_secs(DEFAULT_CLOCK_SKEW_SECS)
    }
}

/// Implemented by every decodable record.
pub trait Validate {
    /// Push every broken constraint onto `out`.
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>);

    fn violations(&self, ctx: &ValidationContext) -> Vec<ContractViolation> {
        let mut out = Vec::new();
        self.validate(ctx, &mut out);
        out
    }
}

/// Check a text field's length in characters.
pub fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
    out: &mut Vec<ContractViolation>,
) {
    let len = value.chars().count();
    if len < min || len > max {
        out.push(ContractViolation::Length {
            field,
            len,
            min,
            max,
        });
    }
}

/// Check that a permission string only uses `C`, `R`, `U`, `D`.
pub fn check_permission_string(field: &str, value: &str, out: &mut Vec<ContractViolation>) {
    if value
        .chars()
        .any(|c| !PERMISSION_ALPHABET.contains(c.to_ascii_uppercase()))
    {
        out.push(ContractViolation::PermissionAlphabet {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

pub fn check_created(
    create_date: DateTime<Utc>,
    ctx: &ValidationContext,
    out: &mut Vec<ContractViolation>,
) {
    if create_date > ctx.latest_acceptable() {
        out.push(ContractViolation::CreatedInFuture { create_date });
    }
}

pub fn check_edited(
    create_date: DateTime<Utc>,
    edit_date: DateTime<Utc>,
    out: &mut Vec<ContractViolation>,
) {
    if edit_date < create_date {
        out.push(ContractViolation::EditBeforeCreate {
            create_date,
            edit_date,
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ctx() -> ValidationContext {
        ValidationContext::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
        )
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        let mut out = Vec::new();
        check_length("name", "ééé", 1, 3, &mut out);
        assert!(out.is_empty());
        check_length("name", "éééé", 1, 3, &mut out);
        assert_eq!(
            out,
            vec![ContractViolation::Length {
                field: "name",
                len: 4,
                min: 1,
                max: 3
            }]
        );
    }

    #[test]
    fn huge_skew_means_no_future_limit() {
        let unbounded = ValidationContext::with_skew_secs(10_000_000_000_000);
        assert_eq!(unbounded.latest_acceptable(), DateTime::<Utc>::MAX_UTC);

        let far = ValidationContext::new(ctx().now, Duration::days(365 * 500_000));
        assert_eq!(far.latest_acceptable(), DateTime::<Utc>::MAX_UTC);

        let mut out = Vec::new();
        check_created(far.now + Duration::days(3650), &far, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn permission_alphabet() {
        let mut out = Vec::new();
        check_permission_string("permissions[0]", "crud", &mut out);
        check_permission_string("permissions[0]", "", &mut out);
        assert!(out.is_empty());
        check_permission_string("permissions[5]", "RX", &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn future_create_within_skew_is_fine() {
        let ctx = ctx();
        let mut out = Vec::new();
        check_created(ctx.now + Duration::seconds(60), &ctx, &mut out);
        assert!(out.is_empty());
        check_created(ctx.now + Duration::hours(1), &ctx, &mut out);
        assert!(matches!(
            out.as_slice(),
            [ContractViolation::CreatedInFuture { .. }]
        ));
    }

    #[test]
    fn edit_before_create() {
        let ctx = ctx();
        let mut out = Vec::new();
        check_edited(ctx.now, ctx.now, &mut out);
        assert!(out.is_empty());
        check_edited(ctx.now, ctx.now - Duration::seconds(1), &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn violation_serializes_with_tag() {
        let json = serde_json::to_value(ContractViolation::NegativeCount { count: -2 }).unwrap();
        assert_eq!(json["violation"], "negative_count");
        assert_eq!(json["count"], -2);
    }
}
