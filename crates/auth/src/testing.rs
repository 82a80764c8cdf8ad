//! In-crate fakes for verifier and gate tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use stockroom_core::{ProductId, StoreError, UserId};

use crate::account::Account;
use crate::lockout::LockoutState;
use crate::store::{AccountStore, ResourceStore};

#[derive(Default)]
pub struct FakeAccounts {
    accounts: Mutex<HashMap<UserId, Account>>,
    /// Applied right before the next compare-and-set, simulating a racing writer.
    interference: Mutex<Vec<LockoutState>>,
    pub fail: Mutex<bool>,
    pub writes: Mutex<usize>,
}

impl FakeAccounts {
    pub fn insert(&self, account: Account) {
        self.accounts.lock().unwrap().insert(account.id, account);
    }

    pub fn remove(&self, id: UserId) {
        self.accounts.lock().unwrap().remove(&id);
    }

    pub fn lockout(&self, id: UserId) -> LockoutState {
        self.accounts.lock().unwrap()[&id].lockout
    }

    pub fn interfere_with(&self, states: Vec<LockoutState>) {
        *self.interference.lock().unwrap() = states;
    }

    fn check(&self) -> Result<(), StoreError> {
        if *self.fail.lock().unwrap() {
            return Err(StoreError::backend("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for FakeAccounts {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        self.check()?;
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.values().find(|a| a.email == identifier).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, StoreError> {
        self.check()?;
        Ok(self.accounts.lock().unwrap().get(&id).cloned())
    }

    async fn set_lockout(&self, id: UserId, state: LockoutState) -> Result<(), StoreError> {
        self.check()?;
        *self.writes.lock().unwrap() += 1;
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&id) {
            account.lockout = state;
        }
        Ok(())
    }

    async fn compare_and_set_lockout(
        &self,
        id: UserId,
        expected: LockoutState,
        next: LockoutState,
    ) -> Result<bool, StoreError> {
        self.check()?;
        let mut accounts = self.accounts.lock().unwrap();
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(false);
        };
        let mut interference = self.interference.lock().unwrap();
        if !interference.is_empty() {
            account.lockout = interference.remove(0);
        }
        if account.lockout != expected {
            return Ok(false);
        }
        *self.writes.lock().unwrap() += 1;
        account.lockout = next;
        Ok(true)
    }
}

#[derive(Default)]
pub struct FakeProducts {
    pub ids: Mutex<HashSet<ProductId>>,
}

#[async_trait]
impl ResourceStore for FakeProducts {
    async fn exists(&self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.ids.lock().unwrap().contains(&id))
    }
}
