use serde::{Deserialize, Serialize};

use stockroom_core::{ProductId, UserId};

use crate::context::SubjectContext;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// Acknowledges a mutation that has nothing else to return.
#[derive(Debug, Serialize)]
pub struct IdResponse<I> {
    pub id: I,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub product_id: ProductId,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
}

impl From<&SubjectContext> for WhoAmI {
    fn from(subject: &SubjectContext) -> Self {
        Self {
            user_id: subject.user_id(),
            email: subject.email().to_string(),
            name: subject.name().to_string(),
            product_id: subject.claims().product_id,
        }
    }
}
