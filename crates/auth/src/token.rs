//! HS256 bearer tokens: issuance and verification.
//!
//! jsonwebtoken checks the signature and the presence of `sub`/`exp`; the time
//! window is checked by [`validate_claims`] against a caller-supplied `now` so
//! expiry is testable without sleeping.

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};

use crate::account::Account;
use crate::claims::{TokenClaims, TokenGrant, TokenValidationError, validate_claims};
use crate::error::AuthError;

pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Mints signed, time-bounded tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: TimeDelta,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: TimeDelta) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn issue(&self, account: &Account, grant: &TokenGrant) -> Result<String, AuthError> {
        self.issue_at(account, grant, Utc::now())
    }

    pub fn issue_at(
        &self,
        account: &Account,
        grant: &TokenGrant,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        // The wire format has whole seconds.
        let iat = now.with_nanosecond(0).unwrap_or(now);
        let claims = TokenClaims {
            sub: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            iat,
            exp: iat + self.ttl,
            access: grant.access.clone(),
            product_id: grant.product_id,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::TokenIssue(e.to_string()))
    }
}

/// Verifies signature and time window of inbound tokens.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::TokenSignatureInvalid,
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenMalformed,
            })?;

        validate_claims(&data.claims, now).map_err(|e| match e {
            TokenValidationError::Expired => AuthError::TokenExpired,
            TokenValidationError::NotYetValid | TokenValidationError::InvalidTimeWindow => {
                AuthError::TokenMalformed
            }
        })?;

        Ok(data.claims)
    }
}
