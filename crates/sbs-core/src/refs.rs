//! Reference resolution within a bundle.
//!
//! References between records are plain ids and are never enforced by the
//! server, so a lookup can legitimately come back empty. [`Resolved`] keeps
//! "not in this bundle" and "no reference at all" distinct.
//!
//! A reference only counts as dangling when its target kind is present in
//! the bundle; a bundle without any users says nothing about user ids.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::bundle::Bundle;
use crate::decode::KindBatch;
use crate::entities::{
    Category, Comment, Content, Controlled, Edited, File, Identified, User,
};
use crate::enums::EntityType;
use crate::errors::CoreError;
use crate::ids::{DEFAULT_PERMISSION_KEY, Id, is_unset};

/// Outcome of looking up a referenced id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a, T> {
    Found(&'a T),
    /// The id is set but no such record is in the bundle.
    Missing(EntityType, Id),
    /// The reference is `0` (or another sentinel).
    Unset,
}

impl<'a, T> Resolved<'a, T> {
    #[must_use]
    pub fn found(self) -> Option<&'a T> {
        match self {
            Self::Found(record) => Some(record),
            Self::Missing(..) | Self::Unset => None,
        }
    }

    /// The record, or an error naming what was missing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] unless the record was found.
    pub fn require(self) -> Result<&'a T, CoreError> {
        match self {
            Self::Found(record) => Ok(record),
            Self::Missing(kind, id) => Err(CoreError::Validation(format!(
                "{kind} {id} is not in the bundle"
            ))),
            Self::Unset => Err(CoreError::Validation("reference is unset".to_string())),
        }
    }
}

/// A reference whose target is absent from a bundle that carries its kind.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{source_kind} {source_id} {field} points at missing {target_kind} {target_id}")]
pub struct DanglingReference {
    pub source_kind: EntityType,
    pub source_id: Id,
    pub field: &'static str,
    pub target_kind: EntityType,
    pub target_id: Id,
}

/// Id lookup over the entity kinds that can be referenced.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex<'a> {
    users: Option<BTreeMap<Id, &'a User>>,
    contents: Option<BTreeMap<Id, &'a Content>>,
    categories: Option<BTreeMap<Id, &'a Category>>,
    comments: Option<BTreeMap<Id, &'a Comment>>,
    files: Option<BTreeMap<Id, &'a File>>,
}

fn index<T: Identified>(batch: Option<&KindBatch<T>>) -> Option<BTreeMap<Id, &T>> {
    batch.map(|batch| batch.iter().map(|record| (record.id(), record)).collect())
}

fn resolve<'a, T>(map: Option<&BTreeMap<Id, &'a T>>, kind: EntityType, id: Id) -> Resolved<'a, T> {
    if is_unset(id) {
        return Resolved::Unset;
    }
    match map.and_then(|map| map.get(&id)).copied() {
        Some(record) => Resolved::Found(record),
        None => Resolved::Missing(kind, id),
    }
}

impl<'a> EntityIndex<'a> {
    #[must_use]
    pub fn from_bundle(bundle: &'a Bundle) -> Self {
        Self {
            users: index(bundle.users()),
            contents: index(bundle.contents()),
            categories: index(bundle.categories()),
            comments: index(bundle.comments()),
            files: index(bundle.files()),
        }
    }

    #[must_use]
    pub fn user(&self, id: Id) -> Resolved<'a, User> {
        resolve(self.users.as_ref(), EntityType::User, id)
    }

    #[must_use]
    pub fn content(&self, id: Id) -> Resolved<'a, Content> {
        resolve(self.contents.as_ref(), EntityType::Content, id)
    }

    #[must_use]
    pub fn category(&self, id: Id) -> Resolved<'a, Category> {
        resolve(self.categories.as_ref(), EntityType::Category, id)
    }

    #[must_use]
    pub fn comment(&self, id: Id) -> Resolved<'a, Comment> {
        resolve(self.comments.as_ref(), EntityType::Comment, id)
    }

    #[must_use]
    pub fn file(&self, id: Id) -> Resolved<'a, File> {
        resolve(self.files.as_ref(), EntityType::File, id)
    }

    /// Whether `id` exists among `kind`'s records. `None` when the bundle
    /// carried no records of that kind, or the kind is not indexed.
    #[must_use]
    pub fn contains(&self, kind: EntityType, id: Id) -> Option<bool> {
        match kind {
            EntityType::User => self.users.as_ref().map(|m| m.contains_key(&id)),
            EntityType::Content => self.contents.as_ref().map(|m| m.contains_key(&id)),
            EntityType::Category => self.categories.as_ref().map(|m| m.contains_key(&id)),
            EntityType::Comment => self.comments.as_ref().map(|m| m.contains_key(&id)),
            EntityType::File => self.files.as_ref().map(|m| m.contains_key(&id)),
            _ => None,
        }
    }
}

struct RefScan<'i, 'a> {
    index: &'i EntityIndex<'a>,
    found: Vec<DanglingReference>,
}

impl RefScan<'_, '_> {
    fn check(
        &mut self,
        source_kind: EntityType,
        source_id: Id,
        field: &'static str,
        target_kind: EntityType,
        target_id: Id,
    ) {
        if is_unset(target_id) {
            return;
        }
        if self.index.contains(target_kind, target_id) == Some(false) {
            self.found.push(DanglingReference {
                source_kind,
                source_id,
                field,
                target_kind,
                target_id,
            });
        }
    }

    fn edited<E: Edited>(&mut self, kind: EntityType, record: &E) {
        self.check(kind, record.id(), "createUserId", EntityType::User, record.create_user_id());
        self.check(kind, record.id(), "editUserId", EntityType::User, record.edit_user_id());
    }

    fn controlled<E: Controlled>(&mut self, kind: EntityType, record: &E, parent_kind: Option<EntityType>) {
        self.edited(kind, record);
        if let Some(parent_kind) = parent_kind {
            self.check(kind, record.id(), "parentId", parent_kind, record.parent_id());
        }
        for user in record.permissions().keys().filter(|id| **id != DEFAULT_PERMISSION_KEY) {
            self.check(kind, record.id(), "permissions", EntityType::User, *user);
        }
    }
}

impl EntityIndex<'_> {
    /// Every reference in `bundle` whose target kind is present but whose
    /// target record is not.
    #[must_use]
    pub fn dangling_references(&self, bundle: &Bundle) -> Vec<DanglingReference> {
        let mut scan = RefScan {
            index: self,
            found: Vec::new(),
        };

        for user in bundle.users().into_iter().flat_map(KindBatch::iter) {
            scan.check(EntityType::User, user.id(), "avatar", EntityType::File, user.avatar);
        }
        for content in bundle.contents().into_iter().flat_map(KindBatch::iter) {
            scan.controlled(EntityType::Content, content, Some(EntityType::Category));
        }
        for category in bundle.categories().into_iter().flat_map(KindBatch::iter) {
            scan.controlled(EntityType::Category, category, Some(EntityType::Category));
            for user in &category.local_supers {
                scan.check(EntityType::Category, category.id(), "localSupers", EntityType::User, *user);
            }
        }
        for file in bundle.files().into_iter().flat_map(KindBatch::iter) {
            scan.controlled(EntityType::File, file, None);
        }
        for comment in bundle.comments().into_iter().flat_map(KindBatch::iter) {
            scan.edited(EntityType::Comment, comment);
            scan.check(EntityType::Comment, comment.id(), "parentId", EntityType::Content, comment.parent_id);
        }
        for vote in bundle.votes().into_iter().flat_map(KindBatch::iter) {
            scan.check(EntityType::Vote, vote.id(), "userId", EntityType::User, vote.user_id);
            scan.check(EntityType::Vote, vote.id(), "contentId", EntityType::Content, vote.content_id);
        }
        for watch in bundle.watches().into_iter().flat_map(KindBatch::iter) {
            scan.check(EntityType::Watch, watch.id(), "userId", EntityType::User, watch.user_id);
            scan.check(EntityType::Watch, watch.id(), "contentId", EntityType::Content, watch.content_id);
        }
        for event in bundle.events().into_iter().flat_map(KindBatch::iter) {
            scan.check(EntityType::Activity, event.id, "userId", EntityType::User, event.user_id);
            scan.check(EntityType::Activity, event.id, "contentId", event.kind, event.content_id);
        }
        for agg in bundle.comment_aggregates().into_iter().flat_map(KindBatch::iter) {
            scan.check(EntityType::CommentAggregate, agg.id, "id", EntityType::Content, agg.id);
            for user in &agg.user_ids {
                scan.check(EntityType::CommentAggregate, agg.id, "userIds", EntityType::User, *user);
            }
        }
        for agg in bundle.activity_aggregates().into_iter().flat_map(KindBatch::iter) {
            scan.check(EntityType::ActivityAggregate, agg.id, "id", EntityType::Content, agg.id);
            for user in &agg.user_ids {
                scan.check(EntityType::ActivityAggregate, agg.id, "userIds", EntityType::User, *user);
            }
        }

        scan.found
    }
}

/// Dangling references in `bundle`, resolved against the bundle itself.
#[must_use]
pub fn dangling_references(bundle: &Bundle) -> Vec<DanglingReference> {
    EntityIndex::from_bundle(bundle).dangling_references(bundle)
}
