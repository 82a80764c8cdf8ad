//! Infrastructure layer: storage backends for users and products.

pub mod repository;

pub use repository::{
    InMemoryProductRepository, InMemoryUserRepository, PostgresProductRepository,
    PostgresUserRepository, ProductRepository, UserRepository, connect, ensure_schema,
};
