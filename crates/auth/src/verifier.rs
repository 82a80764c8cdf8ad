//! Credential checks: lookup, lockout gate, password check, counter bookkeeping.
//!
//! Logins and password re-checks share one path, so both count toward the lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use stockroom_core::{StoreError, UserId};

use crate::account::Account;
use crate::claims::TokenGrant;
use crate::error::AuthError;
use crate::lockout::{LockStatus, LockoutPolicy};
use crate::password::PasswordHasher;
use crate::store::AccountStore;
use crate::token::TokenIssuer;

/// How many times a failure is re-applied when the compare-and-set loses.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// What a successful login hands back to the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginSuccess {
    pub email: String,
    pub name: String,
    pub user_id: UserId,
    pub token: String,
}

#[derive(Clone)]
pub struct CredentialVerifier {
    accounts: Arc<dyn AccountStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    policy: LockoutPolicy,
}

impl CredentialVerifier {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        hasher: PasswordHasher,
        issuer: TokenIssuer,
        policy: LockoutPolicy,
    ) -> Self {
        Self {
            accounts,
            hasher,
            issuer,
            policy,
        }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    pub async fn check_login_credentials(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<LoginSuccess, AuthError> {
        self.check_login_credentials_at(identifier, password, Utc::now())
            .await
    }

    /// Run one login attempt as of `now`.
    ///
    /// A locked account is rejected before the password is looked at, and the
    /// rejection leaves its counter untouched.
    #[instrument(skip(self, password, now), fields(identifier = %identifier))]
    pub async fn check_login_credentials_at(
        &self,
        identifier: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginSuccess, AuthError> {
        let Some(account) = self.accounts.find_by_identifier(identifier).await? else {
            self.hasher.verify_dummy(password);
            debug!("login for unknown account");
            return Err(AuthError::NoSuchAccount);
        };

        let account = self.authenticate(account, password, now).await?;

        let token = self
            .issuer
            .issue_at(&account, &TokenGrant::default(), now)?;
        info!(user_id = %account.id, "login succeeded");

        Ok(LoginSuccess {
            email: account.email,
            name: account.name,
            user_id: account.id,
            token,
        })
    }

    pub async fn check_password(&self, id: UserId, password: &str) -> Result<(), AuthError> {
        self.check_password_at(id, password, Utc::now()).await
    }

    /// Re-check a known account's password, e.g. before changing it.
    ///
    /// Goes through the same lockout bookkeeping as a login but never issues
    /// a token.
    #[instrument(skip(self, password, now), fields(user_id = %id))]
    pub async fn check_password_at(
        &self,
        id: UserId,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let Some(account) = self.accounts.find_by_id(id).await? else {
            self.hasher.verify_dummy(password);
            return Err(AuthError::NoSuchAccount);
        };

        self.authenticate(account, password, now).await?;
        Ok(())
    }

    /// Lock gate, password check and counter bookkeeping for one attempt.
    async fn authenticate(
        &self,
        account: Account,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, AuthError> {
        if let LockStatus::Locked { until } = self.policy.status(&account.lockout, now) {
            info!(user_id = %account.id, %until, "credential check refused: account locked");
            return Err(AuthError::locked(until, now));
        }

        if !self.hasher.verify(password, &account.password_hash) {
            self.record_failure(&account, now).await?;
            return Err(AuthError::InvalidCredentials);
        }

        let cleared = self.policy.after_success();
        if account.lockout != cleared {
            self.accounts.set_lockout(account.id, cleared).await?;
        }

        Ok(account)
    }

    async fn record_failure(&self, account: &Account, now: DateTime<Utc>) -> Result<(), AuthError> {
        let mut current = account.lockout;

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let next = self.policy.after_failure(&current, now);
            if self
                .accounts
                .compare_and_set_lockout(account.id, current, next)
                .await?
            {
                match next.locked_until {
                    Some(until) => warn!(
                        user_id = %account.id,
                        failed_attempts = next.failed_attempts,
                        %until,
                        "account locked after repeated credential failures"
                    ),
                    None => info!(
                        user_id = %account.id,
                        failed_attempts = next.failed_attempts,
                        "credential check failed: wrong password"
                    ),
                }
                return Ok(());
            }

            debug!(user_id = %account.id, "lockout state changed concurrently; re-reading");
            let Some(fresh) = self.accounts.find_by_id(account.id).await? else {
                return Ok(());
            };
            if self.policy.status(&fresh.lockout, now).is_locked() {
                return Ok(());
            }
            current = fresh.lockout;
        }

        Err(StoreError::Conflict(format!("lockout state of {} kept changing", account.id)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockout::LockoutState;
    use crate::password::HashCost;
    use crate::testing::FakeAccounts;
    use crate::token::TokenValidator;
    use chrono::TimeDelta;

    const SECRET: &[u8] = b"verifier-tests";
    const EMAIL: &str = "a@example.com";
    const PASSWORD: &str = "right-password";

    struct Fixture {
        store: Arc<FakeAccounts>,
        verifier: CredentialVerifier,
        id: UserId,
    }

    fn fixture(lockout: LockoutState) -> Fixture {
        let hasher = PasswordHasher::new(HashCost::minimal()).unwrap();
        let store = Arc::new(FakeAccounts::default());
        let id = UserId::new();
        store.insert(Account {
            id,
            email: EMAIL.to_string(),
            name: "Account A".to_string(),
            password_hash: hasher.hash(PASSWORD).unwrap(),
            lockout,
        });
        let verifier = CredentialVerifier::new(
            store.clone(),
            hasher,
            TokenIssuer::new(SECRET, TimeDelta::hours(1)),
            LockoutPolicy::default(),
        );
        Fixture { store, verifier, id }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn correct_password_yields_token_for_the_account() {
        let f = fixture(LockoutState::default());
        let ok = f
            .verifier
            .check_login_credentials_at(EMAIL, PASSWORD, t0())
            .await
            .unwrap();

        assert_eq!(ok.user_id, f.id);
        assert_eq!(ok.email, EMAIL);
        assert_eq!(ok.name, "Account A");
        let claims = TokenValidator::new(SECRET).validate(&ok.token, t0()).unwrap();
        assert_eq!(claims.sub, f.id);
    }

    #[tokio::test]
    async fn unknown_account_is_a_login_failure() {
        let f = fixture(LockoutState::default());
        let err = f
            .verifier
            .check_login_credentials_at("nobody@example.com", PASSWORD, t0())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NoSuchAccount);
        assert!(err.is_login_failure());
        assert_eq!(*f.store.writes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn wrong_password_increments_counter() {
        let f = fixture(LockoutState {
            failed_attempts: 2,
            locked_until: None,
        });
        let err = f
            .verifier
            .check_login_credentials_at(EMAIL, "nope", t0())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(
            f.store.lockout(f.id),
            LockoutState {
                failed_attempts: 3,
                locked_until: None
            }
        );
    }

    #[tokio::test]
    async fn five_failures_lock_and_sixth_correct_attempt_is_refused() {
        let f = fixture(LockoutState::default());

        for n in 1..=4 {
            let err = f
                .verifier
                .check_login_credentials_at(EMAIL, "wrong", t0())
                .await
                .unwrap_err();
            assert_eq!(err, AuthError::InvalidCredentials);
            assert_eq!(f.store.lockout(f.id).failed_attempts, n);
            assert_eq!(f.store.lockout(f.id).locked_until, None);
        }

        let err = f
            .verifier
            .check_login_credentials_at(EMAIL, "wrong", t0())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        let locked = LockoutState {
            failed_attempts: 5,
            locked_until: Some(t0() + TimeDelta::minutes(30)),
        };
        assert_eq!(f.store.lockout(f.id), locked);

        let later = t0() + TimeDelta::minutes(10);
        let err = f
            .verifier
            .check_login_credentials_at(EMAIL, PASSWORD, later)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::AccountLocked {
                until: t0() + TimeDelta::minutes(30),
                retry_after: TimeDelta::minutes(20),
            }
        );
        assert_eq!(err.retry_after_secs(), Some(20 * 60));
        assert_eq!(f.store.lockout(f.id), locked);
    }

    #[tokio::test]
    async fn locked_account_never_checks_or_counts_wrong_passwords() {
        let until = t0() + TimeDelta::minutes(5);
        let f = fixture(LockoutState {
            failed_attempts: 5,
            locked_until: Some(until),
        });
        for _ in 0..3 {
            let err = f
                .verifier
                .check_login_credentials_at(EMAIL, "wrong", t0())
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::AccountLocked { .. }));
        }
        assert_eq!(f.store.lockout(f.id).failed_attempts, 5);
        assert_eq!(*f.store.writes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn attempt_at_exact_expiry_passes_gate_and_restarts_count() {
        let f = fixture(LockoutState {
            failed_attempts: 5,
            locked_until: Some(t0()),
        });
        let err = f
            .verifier
            .check_login_credentials_at(EMAIL, "wrong", t0())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(
            f.store.lockout(f.id),
            LockoutState {
                failed_attempts: 1,
                locked_until: None
            }
        );
    }

    #[tokio::test]
    async fn correct_password_after_expiry_resets_state() {
        let f = fixture(LockoutState {
            failed_attempts: 5,
            locked_until: Some(t0() - TimeDelta::minutes(1)),
        });
        f.verifier
            .check_login_credentials_at(EMAIL, PASSWORD, t0())
            .await
            .unwrap();
        assert_eq!(f.store.lockout(f.id), LockoutState::default());
    }

    #[tokio::test]
    async fn clean_login_does_not_write() {
        let f = fixture(LockoutState::default());
        f.verifier
            .check_login_credentials_at(EMAIL, PASSWORD, t0())
            .await
            .unwrap();
        assert_eq!(*f.store.writes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn lost_race_is_reapplied_on_fresh_state() {
        let f = fixture(LockoutState::default());
        // A concurrent failure lands between our read and our write.
        f.store.interfere_with(vec![LockoutState {
            failed_attempts: 1,
            locked_until: None,
        }]);
        f.verifier
            .check_login_credentials_at(EMAIL, "wrong", t0())
            .await
            .unwrap_err();
        assert_eq!(f.store.lockout(f.id).failed_attempts, 2);
    }

    #[tokio::test]
    async fn lost_race_against_a_lock_stops_counting() {
        let f = fixture(LockoutState {
            failed_attempts: 4,
            locked_until: None,
        });
        let lock = LockoutState {
            failed_attempts: 5,
            locked_until: Some(t0() + TimeDelta::minutes(30)),
        };
        f.store.interfere_with(vec![lock]);
        let err = f
            .verifier
            .check_login_credentials_at(EMAIL, "wrong", t0())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(f.store.lockout(f.id), lock);
    }

    #[tokio::test]
    async fn endless_contention_surfaces_as_storage_conflict() {
        let f = fixture(LockoutState::default());
        f.store.interfere_with(
            (1..=MAX_TRANSITION_ATTEMPTS as u32)
                .map(|n| LockoutState {
                    failed_attempts: n,
                    locked_until: None,
                })
                .collect(),
        );
        let err = f
            .verifier
            .check_login_credentials_at(EMAIL, "wrong", t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Storage(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn storage_failure_is_not_swallowed() {
        let f = fixture(LockoutState::default());
        *f.store.fail.lock().unwrap() = true;
        let err = f
            .verifier
            .check_login_credentials_at(EMAIL, PASSWORD, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Storage(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn password_recheck_is_refused_while_locked() {
        let until = t0() + TimeDelta::minutes(30);
        let locked = LockoutState {
            failed_attempts: 5,
            locked_until: Some(until),
        };
        let f = fixture(locked);

        let err = f
            .verifier
            .check_password_at(f.id, PASSWORD, t0() + TimeDelta::minutes(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked { .. }));
        assert_eq!(err.retry_after_secs(), Some(29 * 60));
        assert_eq!(f.store.lockout(f.id), locked);
        assert_eq!(*f.store.writes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn wrong_password_recheck_counts_toward_the_lock() {
        let f = fixture(LockoutState::default());

        for _ in 0..5 {
            let err = f
                .verifier
                .check_password_at(f.id, "wrong", t0())
                .await
                .unwrap_err();
            assert_eq!(err, AuthError::InvalidCredentials);
        }
        assert_eq!(
            f.store.lockout(f.id).locked_until,
            Some(t0() + TimeDelta::minutes(30))
        );

        // Login is locked out too.
        let err = f
            .verifier
            .check_login_credentials_at(EMAIL, PASSWORD, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked { .. }));
    }

    #[tokio::test]
    async fn correct_password_recheck_clears_failures() {
        let f = fixture(LockoutState {
            failed_attempts: 3,
            locked_until: None,
        });
        f.verifier.check_password_at(f.id, PASSWORD, t0()).await.unwrap();
        assert_eq!(f.store.lockout(f.id), LockoutState::default());
    }

    #[tokio::test]
    async fn password_recheck_for_unknown_id_writes_nothing() {
        let f = fixture(LockoutState::default());
        let err = f
            .verifier
            .check_password_at(UserId::new(), PASSWORD, t0())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NoSuchAccount);
        assert_eq!(*f.store.writes.lock().unwrap(), 0);
    }
}
