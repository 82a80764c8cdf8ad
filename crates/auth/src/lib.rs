//! `stockroom-auth`: credential verification, lockout and bearer tokens.
//!
//! Decoupled from HTTP and storage: stores come in through the traits in
//! [`store`], and callers pass `now` wherever time matters.

pub mod account;
pub mod claims;
pub mod error;
pub mod gate;
pub mod lockout;
pub mod password;
pub mod principal;
pub mod store;
pub mod token;
pub mod verifier;

#[cfg(test)]
mod testing;

pub use account::Account;
pub use claims::{PRODUCTS_ACCESS, TokenClaims, TokenGrant, TokenValidationError, validate_claims};
pub use error::AuthError;
pub use gate::{RequestGate, bearer_token};
pub use lockout::{LOCK_DURATION_MINUTES, LockStatus, LockoutPolicy, LockoutState, MAX_FAILED_ATTEMPTS};
pub use password::{HashCost, PasswordError, PasswordHasher};
pub use principal::Subject;
pub use store::{AccountStore, ResourceStore};
pub use token::{DEFAULT_TOKEN_TTL_HOURS, TokenIssuer, TokenValidator};
pub use verifier::{CredentialVerifier, LoginSuccess};
