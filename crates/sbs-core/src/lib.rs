//! # sbs-core
//!
//! Client-side data model for the SmileBASIC Source API.
//!
//! This crate provides the types shared by every other `sbs` crate:
//! - Entity structs composed from the view/edit/control/named record levels
//! - Aggregates and idempotent client-side tallies
//! - Permission evaluation, including category local supers
//! - Per-record decoding of heterogeneous bundles with contract checks
//! - Long-poll listen queries, responses, and resume state
//! - Reference resolution and dangling-reference reports
//! - Search filters and chain read requests
//!
//! Nothing here performs I/O; see `sbs-client` for the HTTP side.

pub mod aggregate;
pub mod bundle;
pub mod contract;
pub mod decode;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod listen;
pub mod permissions;
pub mod refs;
pub mod search;
pub mod wire_serde;
