//! Permission evaluation over controlled entities.
//!
//! A controlled entity carries a map from user id to permission string.
//! Lookup for a requester:
//!
//! 1. the requester's own entry, if present;
//! 2. otherwise the default entry under key `0`;
//! 3. otherwise nothing.
//!
//! Superusers (global, or local supers of an enclosing category) are granted
//! create, update, and delete on top of that. Read always follows the map,
//! so an explicit `""` default hides an entity even from a superuser.
//!
//! For the *current* user, prefer [`my_permissions`]: the server already
//! computed `myPerms` with information the client may not have.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};

use crate::entities::{Category, Controlled, Identified, UserSelf};
use crate::ids::{DEFAULT_PERMISSION_KEY, Id, is_unset};

// ---------------------------------------------------------------------------
// Permission / PermissionSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Create,
    Read,
    Update,
    Delete,
}

impl Permission {
    pub const ALL: [Self; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Create => 'C',
            Self::Read => 'R',
            Self::Update => 'U',
            Self::Delete => 'D',
        }
    }

    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'C' => Some(Self::Create),
            'R' => Some(Self::Read),
            'U' => Some(Self::Update),
            'D' => Some(Self::Delete),
            _ => None,
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Create => 1,
            Self::Read => 2,
            Self::Update => 4,
            Self::Delete => 8,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A set over `{C, R, U, D}`. Letter order and repeats in the source string
/// do not matter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PermissionSet(u8);

impl PermissionSet {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self(0b1111);
    /// What a superuser gets regardless of the map.
    pub const SUPER_GRANTS: Self = Self(1 | 4 | 8);

    /// Parse a permission string, ignoring letters outside `CRUD`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.chars()
            .filter_map(Permission::from_letter)
            .fold(Self::EMPTY, Self::with)
    }

    /// Parse, also returning the unrecognized letters.
    #[must_use]
    pub fn parse_lossy(raw: &str) -> (Self, Vec<char>) {
        let mut unknown = Vec::new();
        let mut set = Self::EMPTY;
        for c in raw.chars() {
            match Permission::from_letter(c) {
                Some(p) => set = set.with(p),
                None => unknown.push(c),
            }
        }
        (set, unknown)
    }

    #[must_use]
    pub const fn contains(self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }

    #[must_use]
    pub const fn with(self, permission: Permission) -> Self {
        Self(self.0 | permission.bit())
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Permission> {
        Permission::ALL.into_iter().filter(move |p| self.contains(*p))
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter().try_for_each(|p| write!(f, "{p}"))
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Requester
// ---------------------------------------------------------------------------

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    Anonymous,
    User { id: Id, super_user: bool },
}

impl Requester {
    #[must_use]
    pub const fn user(id: Id) -> Self {
        Self::User {
            id,
            super_user: false,
        }
    }

    #[must_use]
    pub const fn super_user(id: Id) -> Self {
        Self::User {
            id,
            super_user: true,
        }
    }

    #[must_use]
    pub const fn id(self) -> Option<Id> {
        match self {
            Self::Anonymous => None,
            Self::User { id, .. } => Some(id),
        }
    }

    #[must_use]
    pub const fn is_super(self) -> bool {
        matches!(self, Self::User { super_user: true, .. })
    }
}

impl From<&UserSelf> for Requester {
    fn from(me: &UserSelf) -> Self {
        Self::User {
            id: me.id(),
            super_user: me.super_user,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// The permission string that applies to `requester` before superuser
/// elevation: own entry, else key `0`, else empty.
#[must_use]
pub fn lookup(map: &BTreeMap<Id, String>, requester: Requester) -> PermissionSet {
    let own = requester
        .id()
        .filter(|id| *id != DEFAULT_PERMISSION_KEY)
        .and_then(|id| map.get(&id));
    own.or_else(|| map.get(&DEFAULT_PERMISSION_KEY))
        .map_or(PermissionSet::EMPTY, |raw| PermissionSet::parse(raw))
}

/// Effective permissions for `requester` on an entity with this map.
#[must_use]
pub fn effective_permissions(map: &BTreeMap<Id, String>, requester: Requester) -> PermissionSet {
    let base = lookup(map, requester);
    if requester.is_super() {
        base.union(PermissionSet::SUPER_GRANTS)
    } else {
        base
    }
}

/// [`effective_permissions`] for any controlled entity.
#[must_use]
pub fn permissions_for<E: Controlled + ?Sized>(entity: &E, requester: Requester) -> PermissionSet {
    effective_permissions(entity.permissions(), requester)
}

#[must_use]
pub fn can<E: Controlled + ?Sized>(entity: &E, requester: Requester, permission: Permission) -> bool {
    permissions_for(entity, requester).contains(permission)
}

/// The current user's permissions as computed by the server.
#[must_use]
pub fn my_permissions<E: Controlled + ?Sized>(entity: &E) -> PermissionSet {
    PermissionSet::parse(entity.my_perms())
}

#[must_use]
pub fn can_i<E: Controlled + ?Sized>(entity: &E, permission: Permission) -> bool {
    my_permissions(entity).contains(permission)
}

/// Explicit grantees of one permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grantees {
    /// User ids whose own entry grants it.
    pub users: Vec<Id>,
    /// Whether the default entry grants it to everyone else.
    pub everyone: bool,
}

/// Who the map grants `permission` to, ignoring superusers.
#[must_use]
pub fn who_can<E: Controlled + ?Sized>(entity: &E, permission: Permission) -> Grantees {
    let mut grantees = Grantees::default();
    for (id, raw) in entity.permissions() {
        if !PermissionSet::parse(raw).contains(permission) {
            continue;
        }
        if *id == DEFAULT_PERMISSION_KEY {
            grantees.everyone = true;
        } else {
            grantees.users.push(*id);
        }
    }
    grantees
}

// ---------------------------------------------------------------------------
// CategoryTree
// ---------------------------------------------------------------------------

/// Category lookup for resolving local supers.
///
/// A local super of a category has superuser rights over that category and
/// everything beneath it. Parent chains are followed until they leave the
/// known categories, reach `0`, or revisit a node.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    categories: BTreeMap<Id, CategoryNode>,
}

#[derive(Debug, Clone)]
struct CategoryNode {
    parent_id: Id,
    local_supers: BTreeSet<Id>,
}

impl CategoryTree {
    pub fn new<'a>(categories: impl IntoIterator<Item = &'a Category>) -> Self {
        let categories = categories
            .into_iter()
            .map(|c| {
                (
                    c.id(),
                    CategoryNode {
                        parent_id: c.parent_id(),
                        local_supers: c.local_supers.iter().copied().collect(),
                    },
                )
            })
            .collect();
        Self { categories }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Category ids from `start` upward, `start` included when known.
    #[must_use]
    pub fn ancestors(&self, start: Id) -> Vec<Id> {
        let mut chain = Vec::new();
        let mut visited = BTreeSet::new();
        let mut current = start;
        while !is_unset(current) && visited.insert(current) {
            let Some(node) = self.categories.get(&current) else {
                break;
            };
            chain.push(current);
            current = node.parent_id;
        }
        chain
    }

    /// Whether `user` is a local super of any category enclosing `entity`
    /// (the entity itself included, when it is a category).
    #[must_use]
    pub fn is_local_super<E: Controlled + ?Sized>(&self, entity: &E, user: Id) -> bool {
        let start = if self.categories.contains_key(&entity.id()) {
            entity.id()
        } else {
            entity.parent_id()
        };
        self.ancestors(start).iter().any(|id| {
            self.categories
                .get(id)
                .is_some_and(|node| node.local_supers.contains(&user))
        })
    }

    /// Like [`permissions_for`], but a local super is elevated like a
    /// global superuser.
    #[must_use]
    pub fn effective_permissions<E: Controlled + ?Sized>(
        &self,
        entity: &E,
        requester: Requester,
    ) -> PermissionSet {
        let elevated = match requester {
            Requester::User {
                id,
                super_user: false,
            } if self.is_local_super(entity, id) => Requester::super_user(id),
            other => other,
        };
        permissions_for(entity, elevated)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::entities::Content;

    fn perms(pairs: &[(Id, &str)]) -> BTreeMap<Id, String> {
        pairs.iter().map(|(id, p)| (*id, (*p).to_string())).collect()
    }

    fn category(id: Id, parent_id: Id, local_supers: &[Id]) -> Category {
        serde_json::from_value(json!({
            "id": id,
            "createDate": "2020-01-01T00:00:00Z",
            "editDate": "2020-01-01T00:00:00Z",
            "parentId": parent_id,
            "permissions": {"0": "R"},
            "name": format!("cat{id}"),
            "localSupers": local_supers
        }))
        .unwrap()
    }

    fn content(id: Id, parent_id: Id, permissions: serde_json::Value) -> Content {
        serde_json::from_value(json!({
            "id": id,
            "createDate": "2020-01-01T00:00:00Z",
            "editDate": "2020-01-01T00:00:00Z",
            "parentId": parent_id,
            "permissions": permissions,
            "myPerms": "RU",
            "name": "page",
            "content": "body text"
        }))
        .unwrap()
    }

    #[test]
    fn set_is_order_and_repeat_insensitive() {
        assert_eq!(PermissionSet::parse("DURC"), PermissionSet::parse("crud"));
        assert_eq!(PermissionSet::parse("RRR").to_string(), "R");
        assert_eq!(PermissionSet::parse("DUC").to_string(), "CUD");
    }

    #[test]
    fn unknown_letters_are_ignored() {
        let (set, unknown) = PermissionSet::parse_lossy("RxZ");
        assert_eq!(set.to_string(), "R");
        assert_eq!(unknown, vec!['x', 'Z']);
        assert_eq!(PermissionSet::parse("RxZ"), set);
    }

    #[test]
    fn lookup_falls_back_to_default_key() {
        let map = perms(&[(0, "R"), (5, "RU")]);
        assert_eq!(effective_permissions(&map, Requester::user(5)).to_string(), "RU");
        assert_eq!(effective_permissions(&map, Requester::user(7)).to_string(), "R");
        assert_eq!(effective_permissions(&map, Requester::Anonymous).to_string(), "R");
    }

    #[test]
    fn no_entry_and_no_default_is_empty() {
        let map = perms(&[(5, "RU")]);
        assert!(effective_permissions(&map, Requester::user(7)).is_empty());
        assert!(effective_permissions(&map, Requester::Anonymous).is_empty());
    }

    #[test]
    fn own_entry_overrides_default_even_when_narrower() {
        let map = perms(&[(0, "CR"), (5, "")]);
        assert!(effective_permissions(&map, Requester::user(5)).is_empty());
    }

    #[test]
    fn superuser_gets_cud_but_not_read() {
        let map = perms(&[(0, "")]);
        let set = effective_permissions(&map, Requester::super_user(1));
        assert!(!set.contains(Permission::Read));
        assert!(set.contains(Permission::Create));
        assert!(set.contains(Permission::Update));
        assert!(set.contains(Permission::Delete));
    }

    #[test]
    fn my_perms_are_trusted_for_current_user() {
        let page = content(300, 10, json!({"0": ""}));
        assert!(can_i(&page, Permission::Update));
        assert!(!can(&page, Requester::user(5), Permission::Update));
    }

    #[test]
    fn who_can_lists_explicit_grantees() {
        let page = content(300, 10, json!({"0": "R", "5": "RU", "6": "CRUD", "7": "C"}));
        let editors = who_can(&page, Permission::Update);
        assert_eq!(editors.users, vec![5, 6]);
        assert!(!editors.everyone);
        assert!(who_can(&page, Permission::Read).everyone);
    }

    #[test]
    fn local_super_is_elevated_in_subtree_only() {
        let tree = CategoryTree::new(&[category(1, 0, &[]), category(10, 1, &[42]), category(20, 1, &[])]);
        let inside = content(300, 10, json!({"0": "R"}));
        let outside = content(301, 20, json!({"0": "R"}));

        assert!(tree.is_local_super(&inside, 42));
        assert!(!tree.is_local_super(&outside, 42));
        assert_eq!(tree.effective_permissions(&inside, Requester::user(42)).to_string(), "CRUD");
        assert_eq!(tree.effective_permissions(&outside, Requester::user(42)).to_string(), "R");
    }

    #[test]
    fn category_cycles_terminate() {
        let tree = CategoryTree::new(&[category(1, 2, &[]), category(2, 1, &[])]);
        assert_eq!(tree.ancestors(1), vec![1, 2]);
        let page = content(300, 1, json!({}));
        assert!(!tree.is_local_super(&page, 42));
    }

    #[test]
    fn dangling_parent_stops_walk() {
        let tree = CategoryTree::new(&[category(10, 999, &[42])]);
        assert_eq!(tree.ancestors(10), vec![10]);
        assert!(tree.ancestors(555).is_empty());
    }

    #[test]
    fn requester_from_user_self() {
        let me: UserSelf = serde_json::from_value(json!({
            "id": 9,
            "createDate": "2020-01-01T00:00:00Z",
            "username": "admin",
            "super": true
        }))
        .unwrap();
        assert_eq!(Requester::from(&me), Requester::super_user(9));
    }
}
