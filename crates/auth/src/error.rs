use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use stockroom_core::StoreError;

/// Everything that can go wrong while logging in or admitting a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No account has the given identifier.
    #[error("no such account")]
    NoSuchAccount,

    /// Too many failed attempts; credentials are not checked until `until`.
    #[error("account locked until {until}")]
    AccountLocked {
        until: DateTime<Utc>,
        retry_after: TimeDelta,
    },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing bearer token")]
    MissingToken,

    #[error("token has expired")]
    TokenExpired,

    #[error("malformed token")]
    TokenMalformed,

    #[error("token signature is invalid")]
    TokenSignatureInvalid,

    /// The token is genuine but its subject no longer exists.
    #[error("token subject no longer exists")]
    UnknownSubject,

    /// The token references a product that no longer exists.
    #[error("referenced resource no longer exists")]
    SecondaryResourceMissing,

    #[error("failed to issue token: {0}")]
    TokenIssue(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AuthError {
    pub fn locked(until: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::AccountLocked {
            until,
            retry_after: until - now,
        }
    }

    /// Unknown account and wrong password must look the same to clients.
    pub fn is_login_failure(&self) -> bool {
        matches!(self, Self::NoSuchAccount | Self::InvalidCredentials)
    }

    /// Whether the request gate turned the request away (as opposed to a
    /// storage failure while checking it).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingToken
                | Self::TokenExpired
                | Self::TokenMalformed
                | Self::TokenSignatureInvalid
                | Self::UnknownSubject
                | Self::SecondaryResourceMissing
        )
    }

    /// Whole seconds a locked-out client should wait, rounded up.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::AccountLocked { retry_after, .. } => {
                let millis = retry_after.num_milliseconds().max(0) as u64;
                Some(millis.div_ceil(1000))
            }
            _ => None,
        }
    }
}
