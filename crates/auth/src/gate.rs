//! Request admission for protected routes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::AuthError;
use crate::principal::Subject;
use crate::store::{AccountStore, ResourceStore};
use crate::token::TokenValidator;

/// Extract the token from an `Authorization` header value.
///
/// Accepts `Bearer <token>` and `JWT <token>`, scheme case-insensitive.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    if !(scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("jwt")) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Validates a bearer token and resolves it to a live [`Subject`].
#[derive(Clone)]
pub struct RequestGate {
    validator: TokenValidator,
    accounts: Arc<dyn AccountStore>,
    resources: Arc<dyn ResourceStore>,
}

impl RequestGate {
    pub fn new(
        validator: TokenValidator,
        accounts: Arc<dyn AccountStore>,
        resources: Arc<dyn ResourceStore>,
    ) -> Self {
        Self {
            validator,
            accounts,
            resources,
        }
    }

    /// Admit a request given its raw `Authorization` header.
    pub async fn admit(&self, header: Option<&str>) -> Result<Subject, AuthError> {
        let token = bearer_token(header).ok_or(AuthError::MissingToken)?;
        self.admit_token(token, Utc::now()).await
    }

    pub async fn admit_token(&self, token: &str, now: DateTime<Utc>) -> Result<Subject, AuthError> {
        let claims = self.validator.validate(token, now)?;

        let Some(account) = self.accounts.find_by_id(claims.sub).await? else {
            debug!(sub = %claims.sub, "token subject is gone");
            return Err(AuthError::UnknownSubject);
        };

        if claims.references_product() {
            let present = match claims.product_id {
                Some(id) => self.resources.exists(id).await?,
                None => false,
            };
            if !present {
                debug!(sub = %claims.sub, product_id = ?claims.product_id, "token product is gone");
                return Err(AuthError::SecondaryResourceMissing);
            }
        }

        Ok(Subject {
            user_id: account.id,
            email: account.email,
            name: account.name,
            claims,
        })
    }
}
