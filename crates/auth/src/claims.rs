use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::{ProductId, UserId};

/// Access marker that makes a token depend on a product's existence.
pub const PRODUCTS_ACCESS: &str = "products";

/// JWT claims carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the account id.
    pub sub: UserId,

    pub email: String,

    pub name: String,

    /// Issued-at (seconds since epoch on the wire).
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Expiration (seconds since epoch on the wire).
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
}

impl TokenClaims {
    /// Whether admitting this token requires the product store to be consulted.
    pub fn references_product(&self) -> bool {
        self.product_id.is_some() || self.access.iter().any(|a| a == PRODUCTS_ACCESS)
    }
}

/// Extra claims requested at issuance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenGrant {
    pub access: Vec<String>,
    pub product_id: Option<ProductId>,
}

impl TokenGrant {
    /// A grant tied to one product: the token dies with the product.
    pub fn product(product_id: ProductId) -> Self {
        Self {
            access: vec![PRODUCTS_ACCESS.to_string()],
            product_id: Some(product_id),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens before this, in [`crate::TokenValidator`].
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
