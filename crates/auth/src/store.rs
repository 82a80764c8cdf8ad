//! Storage contracts the auth core consumes.
//!
//! Implemented by `stockroom-infra` for each backend. The auth crate itself
//! never talks to a database.

use std::sync::Arc;

use async_trait::async_trait;
use stockroom_core::{ProductId, StoreError, UserId};

use crate::account::Account;
use crate::lockout::LockoutState;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up by natural key (email).
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, StoreError>;

    /// Unconditionally overwrite the lockout fields.
    async fn set_lockout(&self, id: UserId, state: LockoutState) -> Result<(), StoreError>;

    /// Write `next` only if the stored fields still equal `expected`.
    ///
    /// Returns `false` when another writer got there first (or the account is
    /// gone). Must be atomic with respect to other calls on the same account.
    async fn compare_and_set_lockout(
        &self,
        id: UserId,
        expected: LockoutState,
        next: LockoutState,
    ) -> Result<bool, StoreError>;
}

/// Existence lookups for resources a token may reference.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn exists(&self, id: ProductId) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        (**self).find_by_identifier(identifier).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn set_lockout(&self, id: UserId, state: LockoutState) -> Result<(), StoreError> {
        (**self).set_lockout(id, state).await
    }

    async fn compare_and_set_lockout(
        &self,
        id: UserId,
        expected: LockoutState,
        next: LockoutState,
    ) -> Result<bool, StoreError> {
        (**self).compare_and_set_lockout(id, expected, next).await
    }
}

#[async_trait]
impl<S> ResourceStore for Arc<S>
where
    S: ResourceStore + ?Sized,
{
    async fn exists(&self, id: ProductId) -> Result<bool, StoreError> {
        (**self).exists(id).await
    }
}
