use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use stockroom_auth::{AuthError, PasswordError};
use stockroom_core::{DomainError, StoreError};

/// Shown for both an unknown email and a wrong password.
const LOGIN_FAILED: &str = "Wrong email or password";

/// Every failure a handler can surface, mapped to one JSON error body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("{0}")]
    BadRequest(String),

    /// The current password supplied to a password change did not verify.
    #[error("wrong password")]
    WrongPassword,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn internal(err: &dyn std::error::Error) -> axum::response::Response {
    tracing::error!(error = %err, "request failed");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error",
    )
}

fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::NoSuchAccount | AuthError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", LOGIN_FAILED)
        }
        AuthError::AccountLocked { .. } => {
            let mut response = json_error(
                StatusCode::FORBIDDEN,
                "account_locked",
                "Too many failed login attempts. Try again later",
            );
            if let Some(secs) = err.retry_after_secs() {
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(secs));
            }
            response
        }
        AuthError::MissingToken => {
            json_error(StatusCode::UNAUTHORIZED, "missing_token", "missing bearer token")
        }
        AuthError::TokenExpired => {
            json_error(StatusCode::UNAUTHORIZED, "token_expired", "token has expired")
        }
        AuthError::TokenMalformed | AuthError::TokenSignatureInvalid => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_token", "invalid token")
        }
        AuthError::UnknownSubject => {
            json_error(StatusCode::UNAUTHORIZED, "unknown_subject", "token subject no longer exists")
        }
        AuthError::SecondaryResourceMissing => json_error(
            StatusCode::UNAUTHORIZED,
            "resource_missing",
            "resource referenced by the token no longer exists",
        ),
        AuthError::TokenIssue(_) | AuthError::Storage(_) => internal(&err),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Auth(e) => auth_error_to_response(e),
            ApiError::Domain(DomainError::Validation(msg)) => {
                json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
            }
            ApiError::Domain(DomainError::InvalidId(msg)) => {
                json_error(StatusCode::BAD_REQUEST, "invalid_id", msg)
            }
            ApiError::Domain(DomainError::NotFound) => {
                json_error(StatusCode::NOT_FOUND, "not_found", "not found")
            }
            ApiError::Domain(DomainError::Conflict(msg)) => {
                json_error(StatusCode::CONFLICT, "conflict", msg)
            }
            ApiError::Store(StoreError::Duplicate(_)) => {
                json_error(StatusCode::CONFLICT, "conflict", "resource already exists")
            }
            ApiError::Store(e) => internal(&e),
            ApiError::Password(e) => internal(&e),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::WrongPassword => {
                json_error(StatusCode::FORBIDDEN, "wrong_password", "Wrong password")
            }
        }
    }
}
