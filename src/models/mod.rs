//! Data models for the polls application.

mod question;
mod user;
mod vote;

pub use question::*;
pub use user::*;
pub use vote::*;
