//! Identifier conventions.
//!
//! Every entity kind draws its id from one shared integer space, so an id on
//! its own never says what kind of record it points at. Wherever a record
//! stores a cross-entity reference, the kind is implied by the field (see
//! [`crate::refs`]) or carried alongside it (see [`crate::entities::Event`]).

/// Entity identifier, unique across all entity kinds.
pub type Id = i64;

/// Name of a listen chain (a logical subscription channel).
pub type ChainId = String;

/// `parentId` value meaning "no parent".
pub const NO_PARENT: Id = 0;

/// Permission-map key holding the default (anonymous) permission.
pub const DEFAULT_PERMISSION_KEY: Id = 0;

/// `userId` carried by system-generated activity events.
pub const SYSTEM_USER: Id = -1;

/// True when `id` cannot reference a real record (`0` or a sentinel).
#[must_use]
pub const fn is_unset(id: Id) -> bool {
    id <= 0
}
