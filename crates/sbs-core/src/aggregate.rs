//! Rollups attached to entities, and client-side tallies that rebuild them.
//!
//! The server sends [`Aggregate`]s precomputed. A listening client that
//! wants to keep them current folds new events into an [`ActivityTally`] or
//! new comments into a [`CommentTally`]. Both folds are idempotent: applying
//! the same record twice leaves the result unchanged.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::{ContractViolation, Validate, ValidationContext};
use crate::entities::{Comment, Edited, Event, Identified, Viewed};
use crate::ids::Id;
use crate::wire_serde;

// ---------------------------------------------------------------------------
// Wire aggregates
// ---------------------------------------------------------------------------

/// Count plus first/last timestamps. Timestamps are null exactly when
/// `count` is 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    #[serde(default, with = "wire_serde::timestamp_option")]
    #[schemars(with = "Option<DateTime<Utc>>")]
    pub first_post: Option<DateTime<Utc>>,
    #[serde(default, with = "wire_serde::timestamp_option")]
    #[schemars(with = "Option<DateTime<Utc>>")]
    pub last_post: Option<DateTime<Utc>>,
    #[serde(default)]
    pub count: i64,
}

impl Aggregate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fold one more post at `date` into the rollup.
    pub fn record(&mut self, date: DateTime<Utc>) {
        self.count = self.count.saturating_add(1);
        self.first_post = Some(self.first_post.map_or(date, |first| first.min(date)));
        self.last_post = Some(self.last_post.map_or(date, |last| last.max(date)));
    }

    /// Build a rollup from a set of post dates.
    pub fn from_dates(dates: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        let mut agg = Self::default();
        for date in dates {
            agg.record(date);
        }
        agg
    }
}

impl Validate for Aggregate {
    fn validate(&self, _ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        if self.count < 0 {
            out.push(ContractViolation::NegativeCount { count: self.count });
        }
        let has_any = self.first_post.is_some() || self.last_post.is_some();
        if self.count == 0 && has_any {
            out.push(ContractViolation::TimestampsWithoutPosts);
        }
        if self.count > 0 && (self.first_post.is_none() || self.last_post.is_none()) {
            out.push(ContractViolation::MissingTimestamps { count: self.count });
        }
        if let (Some(first_post), Some(last_post)) = (self.first_post, self.last_post) {
            if first_post > last_post {
                out.push(ContractViolation::PostsOutOfOrder {
                    first_post,
                    last_post,
                });
            }
        }
    }
}

/// Comment rollup for one parent content item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentAggregate {
    #[serde(flatten)]
    pub aggregate: Aggregate,
    /// The parent content id.
    pub id: Id,
    /// Distinct commenters.
    #[serde(default, deserialize_with = "wire_serde::null_default::deserialize")]
    pub user_ids: Vec<Id>,
}

impl Identified for CommentAggregate {
    fn id(&self) -> Id {
        self.id
    }
}

impl Validate for CommentAggregate {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.aggregate.validate(ctx, out);
    }
}

/// Activity rollup for one content item, with the last folded event id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityAggregate {
    #[serde(flatten)]
    pub aggregate: Aggregate,
    /// The content id.
    pub id: Id,
    #[serde(default, deserialize_with = "wire_serde::null_default::deserialize")]
    pub user_ids: Vec<Id>,
    /// Id of the newest event included; resume from here.
    #[serde(default)]
    pub last_id: Id,
}

impl Identified for ActivityAggregate {
    fn id(&self) -> Id {
        self.id
    }
}

impl Validate for ActivityAggregate {
    fn validate(&self, ctx: &ValidationContext, out: &mut Vec<ContractViolation>) {
        self.aggregate.validate(ctx, out);
    }
}

// ---------------------------------------------------------------------------
// ActivityTally
// ---------------------------------------------------------------------------

/// Idempotent fold of activity events into one content item's aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTally {
    content_id: Id,
    aggregate: Aggregate,
    user_ids: BTreeSet<Id>,
    /// Counted ids above `floor`.
    seen: BTreeSet<Id>,
    /// Events at or below this id are already in `aggregate`.
    floor: Id,
    /// Newest event id folded in, or the server's `lastId`.
    last_id: Id,
}

impl ActivityTally {
    #[must_use]
    pub const fn new(content_id: Id) -> Self {
        Self {
            content_id,
            aggregate: Aggregate {
                first_post: None,
                last_post: None,
                count: 0,
            },
            user_ids: BTreeSet::new(),
            seen: BTreeSet::new(),
            floor: 0,
            last_id: 0,
        }
    }

    /// Continue from a server aggregate. Events up to its `lastId` are
    /// treated as already counted.
    #[must_use]
    pub fn from_aggregate(agg: &ActivityAggregate) -> Self {
        Self {
            content_id: agg.id,
            aggregate: agg.aggregate.clone(),
            user_ids: agg.user_ids.iter().copied().collect(),
            seen: BTreeSet::new(),
            floor: agg.last_id,
            last_id: agg.last_id,
        }
    }

    #[must_use]
    pub const fn content_id(&self) -> Id {
        self.content_id
    }

    /// Fold one event. Returns `false` when it belongs to another content
    /// item or was already counted.
    pub fn apply(&mut self, event: &Event) -> bool {
        if event.content_id != self.content_id || event.id <= self.floor {
            return false;
        }
        if !self.seen.insert(event.id) {
            return false;
        }
        self.aggregate.record(event.date);
        self.last_id = self.last_id.max(event.id);
        if !event.is_system() {
            self.user_ids.insert(event.user_id);
        }
        true
    }

    /// Fold many events; returns how many were new.
    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) -> usize {
        events.into_iter().filter(|event| self.apply(event)).count()
    }

    #[must_use]
    pub const fn last_id(&self) -> Id {
        self.last_id
    }

    /// Mark every event id up to `watermark` as delivered.
    ///
    /// Once a listen response has been folded, no event at or below its
    /// `lastId` can arrive as new, so the ids kept for de-duplication below
    /// it are dropped.
    pub fn advance_floor(&mut self, watermark: Id) {
        if watermark <= self.floor {
            return;
        }
        self.floor = watermark;
        self.seen = self.seen.split_off(&watermark.saturating_add(1));
    }

    /// Ids still held for de-duplication.
    #[must_use]
    pub fn pending_ids(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn aggregate(&self) -> ActivityAggregate {
        ActivityAggregate {
            aggregate: self.aggregate.clone(),
            id: self.content_id,
            user_ids: self.user_ids.iter().copied().collect(),
            last_id: self.last_id(),
        }
    }
}

/// Activity tallies for many content items, routed by `contentId`.
#[derive(Debug, Clone, Default)]
pub struct ActivityLedger {
    tallies: BTreeMap<Id, ActivityTally>,
    floor: Id,
}

impl ActivityLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from server aggregates, replacing any tally for the same id.
    pub fn seed<'a>(&mut self, aggregates: impl IntoIterator<Item = &'a ActivityAggregate>) {
        for agg in aggregates {
            self.tallies.insert(agg.id, ActivityTally::from_aggregate(agg));
        }
    }

    pub fn apply(&mut self, event: &Event) -> bool {
        if event.id <= self.floor {
            return false;
        }
        self.tallies
            .entry(event.content_id)
            .or_insert_with(|| ActivityTally::new(event.content_id))
            .apply(event)
    }

    /// Advance every tally past `watermark`, usually the resume token after
    /// a listen response was applied.
    pub fn advance_floor(&mut self, watermark: Id) {
        self.floor = self.floor.max(watermark);
        for tally in self.tallies.values_mut() {
            tally.advance_floor(watermark);
        }
    }

    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) -> usize {
        events.into_iter().filter(|event| self.apply(event)).count()
    }

    #[must_use]
    pub fn get(&self, content_id: Id) -> Option<&ActivityTally> {
        self.tallies.get(&content_id)
    }

    pub fn aggregates(&self) -> impl Iterator<Item = ActivityAggregate> + '_ {
        self.tallies.values().map(ActivityTally::aggregate)
    }
}

// ---------------------------------------------------------------------------
// CommentTally
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CommentSnapshot {
    create_date: DateTime<Utc>,
    user_id: Id,
    deleted: bool,
}

/// Fold of comments into one parent's [`CommentAggregate`].
///
/// Comments are keyed by id, so a re-sent or edited comment replaces its
/// earlier snapshot instead of counting twice. Deleted comments drop out of
/// the count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTally {
    parent_id: Id,
    comments: BTreeMap<Id, CommentSnapshot>,
}

impl CommentTally {
    #[must_use]
    pub const fn new(parent_id: Id) -> Self {
        Self {
            parent_id,
            comments: BTreeMap::new(),
        }
    }

    /// Record a comment. Returns `true` if the tally changed.
    pub fn apply(&mut self, comment: &Comment) -> bool {
        if comment.parent_id != self.parent_id {
            return false;
        }
        let snapshot = CommentSnapshot {
            create_date: comment.create_date(),
            user_id: comment.create_user_id(),
            deleted: comment.deleted,
        };
        self.comments.insert(comment.id(), snapshot) != Some(snapshot)
    }

    pub fn apply_all<'a>(&mut self, comments: impl IntoIterator<Item = &'a Comment>) -> usize {
        comments
            .into_iter()
            .filter(|comment| self.apply(comment))
            .count()
    }

    #[must_use]
    pub fn aggregate(&self) -> CommentAggregate {
        let live = || self.comments.values().filter(|c| !c.deleted);
        let user_ids: BTreeSet<Id> = live().map(|c| c.user_id).collect();
        CommentAggregate {
            aggregate: Aggregate::from_dates(live().map(|c| c.create_date)),
            id: self.parent_id,
            user_ids: user_ids.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;
    use crate::entities::{EditRecord, ViewRecord};
    use crate::enums::{CrudAction, EntityType};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 1, 12, 0, 0).unwrap()
    }

    fn event(id: Id, content_id: Id, user_id: Id) -> Event {
        Event {
            id,
            date: base() + Duration::minutes(id),
            user_id,
            content_id,
            kind: EntityType::Content,
            content_type: String::new(),
            action: CrudAction::Update,
            extra: String::new(),
        }
    }

    fn comment(id: Id, parent_id: Id, user_id: Id, deleted: bool) -> Comment {
        let at = base() + Duration::minutes(id);
        Comment {
            entity: EditRecord {
                view: ViewRecord {
                    id,
                    create_date: at,
                },
                edit_date: at,
                create_user_id: user_id,
                edit_user_id: user_id,
            },
            parent_id,
            content: "nice work".into(),
            deleted,
        }
    }

    #[test]
    fn empty_aggregate_is_null_and_valid() {
        let agg = Aggregate::default();
        let json = serde_json::to_value(&agg).unwrap();
        assert_eq!(json, json!({"firstPost": null, "lastPost": null, "count": 0}));
        assert!(agg.violations(&ValidationContext::default()).is_empty());
    }

    #[test]
    fn aggregate_invariants() {
        let ctx = ValidationContext::default();
        let stray = Aggregate {
            first_post: Some(base()),
            last_post: None,
            count: 0,
        };
        assert_eq!(
            stray.violations(&ctx),
            vec![ContractViolation::TimestampsWithoutPosts]
        );

        let missing = Aggregate {
            first_post: None,
            last_post: None,
            count: 3,
        };
        assert_eq!(
            missing.violations(&ctx),
            vec![ContractViolation::MissingTimestamps { count: 3 }]
        );

        let backwards = Aggregate {
            first_post: Some(base()),
            last_post: Some(base() - Duration::days(1)),
            count: 2,
        };
        assert!(matches!(
            backwards.violations(&ctx).as_slice(),
            [ContractViolation::PostsOutOfOrder { .. }]
        ));
    }

    #[test]
    fn record_tracks_bounds() {
        let agg = Aggregate::from_dates([
            base() + Duration::hours(2),
            base(),
            base() + Duration::hours(1),
        ]);
        assert_eq!(agg.count, 3);
        assert_eq!(agg.first_post, Some(base()));
        assert_eq!(agg.last_post, Some(base() + Duration::hours(2)));
    }

    #[test]
    fn tally_ignores_duplicates_and_other_content() {
        let mut tally = ActivityTally::new(300);
        assert!(tally.apply(&event(1, 300, 5)));
        assert!(!tally.apply(&event(1, 300, 5)));
        assert!(!tally.apply(&event(2, 301, 5)));
        assert!(tally.apply(&event(3, 300, -1)));
        let agg = tally.aggregate();
        assert_eq!(agg.aggregate.count, 2);
        assert_eq!(agg.user_ids, vec![5]);
        assert_eq!(agg.last_id, 3);
    }

    #[test]
    fn tally_seeded_from_server_skips_folded_events() {
        let server = ActivityAggregate {
            aggregate: Aggregate::from_dates([base(), base()]),
            id: 300,
            user_ids: vec![7],
            last_id: 10,
        };
        let mut tally = ActivityTally::from_aggregate(&server);
        assert_eq!(tally.apply_all(&[event(9, 300, 8), event(10, 300, 8), event(11, 300, 8)]), 1);
        let agg = tally.aggregate();
        assert_eq!(agg.aggregate.count, 3);
        assert_eq!(agg.user_ids, vec![7, 8]);
        assert_eq!(agg.last_id, 11);
    }

    #[test]
    fn count_saturates_instead_of_overflowing() {
        let server = ActivityAggregate {
            aggregate: Aggregate {
                first_post: Some(base()),
                last_post: Some(base()),
                count: i64::MAX,
            },
            id: 300,
            user_ids: vec![],
            last_id: 1,
        };
        let mut tally = ActivityTally::from_aggregate(&server);
        assert!(tally.apply(&event(2, 300, 5)));
        assert_eq!(tally.aggregate().aggregate.count, i64::MAX);
    }

    #[test]
    fn advancing_the_floor_prunes_seen_ids() {
        let mut tally = ActivityTally::new(300);
        tally.apply_all(&[event(1, 300, 5), event(4, 300, 5), event(9, 300, 5)]);
        assert_eq!(tally.pending_ids(), 3);

        tally.advance_floor(4);
        assert_eq!(tally.pending_ids(), 1);
        assert!(!tally.apply(&event(4, 300, 5)));
        assert!(!tally.apply(&event(9, 300, 5)));
        assert!(!tally.apply(&event(3, 300, 5)));
        assert_eq!(tally.aggregate().aggregate.count, 3);
        assert_eq!(tally.last_id(), 9);

        tally.advance_floor(2);
        assert_eq!(tally.pending_ids(), 1);
    }

    #[test]
    fn ledger_floor_rejects_replays_for_new_content() {
        let mut ledger = ActivityLedger::new();
        ledger.apply_all(&[event(1, 300, 5), event(2, 300, 5)]);
        ledger.advance_floor(2);
        assert_eq!(ledger.get(300).map(ActivityTally::pending_ids), Some(0));

        assert!(!ledger.apply(&event(2, 301, 5)));
        assert!(ledger.get(301).is_none());
        assert!(ledger.apply(&event(3, 301, 5)));
        assert_eq!(ledger.get(300).map(ActivityTally::last_id), Some(2));
    }

    #[test]
    fn ledger_routes_by_content() {
        let mut ledger = ActivityLedger::new();
        let events = [event(1, 300, 5), event(2, 301, 5), event(3, 300, 6), event(3, 300, 6)];
        assert_eq!(ledger.apply_all(&events), 3);
        assert_eq!(ledger.get(300).map(|t| t.aggregate().aggregate.count), Some(2));
        assert_eq!(ledger.aggregates().count(), 2);
    }

    #[test]
    fn comment_tally_replaces_by_id_and_drops_deleted() {
        let mut tally = CommentTally::new(300);
        assert!(tally.apply(&comment(1, 300, 5, false)));
        assert!(tally.apply(&comment(2, 300, 6, false)));
        assert!(!tally.apply(&comment(2, 300, 6, false)));
        assert!(!tally.apply(&comment(3, 999, 6, false)));
        assert_eq!(tally.aggregate().aggregate.count, 2);

        assert!(tally.apply(&comment(2, 300, 6, true)));
        let agg = tally.aggregate();
        assert_eq!(agg.aggregate.count, 1);
        assert_eq!(agg.user_ids, vec![5]);
        assert_eq!(agg.id, 300);
    }
}
