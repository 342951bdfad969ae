//! Entity structs for every SmileBASIC Source record kind.
//!
//! All structs derive `Serialize`, `Deserialize`, and `JsonSchema` and match
//! the API's flat camelCase objects. Shared levels are composed from the
//! records in [`hierarchy`]; the capability traits give generic code access
//! to them.

mod category;
mod comment;
mod content;
mod event;
mod file;
mod hierarchy;
mod user;
mod vote;
mod watch;

pub use category::Category;
pub use comment::Comment;
pub use content::{Content, ContentAbout};
pub use event::Event;
pub use file::File;
pub(crate) use hierarchy::delegate_hierarchy;
pub use hierarchy::{
    ControlRecord, Controlled, EditRecord, Edited, Identified, NamedRecord, Named, ViewRecord,
    Viewed,
};
pub use user::{User, UserSelf};
pub use vote::Vote;
pub use watch::Watch;
