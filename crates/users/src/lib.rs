//! Users domain module.
//!
//! The persisted user record, its public view, and input validation for
//! registration, profile edits and password changes. No IO.

pub mod user;

pub use user::{ChangePassword, NewUser, UpdateUser, User, UserField, UserView};
