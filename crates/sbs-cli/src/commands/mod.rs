pub mod check;
pub mod dispatch;
pub mod listen;
pub mod me;
pub mod perms;
