//! Products domain module.
//!
//! Catalog records and their input validation, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;

pub use product::{ChangePrice, NewProduct, Product, ProductField, ProductView, UpdateProduct};
