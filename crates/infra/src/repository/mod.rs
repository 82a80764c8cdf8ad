//! Repositories for users and products.
//!
//! Two backends implement every trait here: [`in_memory`] (default, dev/tests)
//! and [`postgres`]. The user repositories also implement the auth
//! `AccountStore`, and the product repositories `ResourceStore`, so login and
//! request admission read the same records the CRUD routes write.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;

use stockroom_core::{ListQuery, Page, ProductId, StoreError, UserId};
use stockroom_products::{Product, ProductField};
use stockroom_users::{User, UserField};

pub use in_memory::{InMemoryProductRepository, InMemoryUserRepository};
pub use postgres::{PostgresProductRepository, PostgresUserRepository, connect, ensure_schema};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self, query: &ListQuery<UserField>) -> Result<Page<User>, StoreError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user. Fails with [`StoreError::Duplicate`] if the email is taken.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    /// Change name and email. `Ok(false)` if the user does not exist.
    async fn update_profile(&self, id: UserId, name: &str, email: &str) -> Result<bool, StoreError>;

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool, StoreError>;

    async fn delete(&self, id: UserId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list(&self, query: &ListQuery<ProductField>) -> Result<Page<Product>, StoreError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn create(&self, product: &Product) -> Result<(), StoreError>;

    /// Overwrite name, category and quantity. `Ok(false)` if absent.
    async fn update(&self, product: &Product) -> Result<bool, StoreError>;

    async fn change_price(&self, id: ProductId, price: f64) -> Result<bool, StoreError>;

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError>;
}
