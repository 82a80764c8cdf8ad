//! `stockroom-core`: shared building blocks.
//!
//! Typed identifiers, the error model, and list-query parsing used by every
//! other crate. No IO lives here.

pub mod error;
pub mod id;
pub mod query;
pub mod validate;

pub use error::{DomainError, DomainResult, StoreError};
pub use id::{ProductId, UserId};
pub use query::{ListField, ListQuery, Page, RawListQuery, SearchFilter, SortOrder, SortSpec, natural_cmp};
