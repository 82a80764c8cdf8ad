use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    response::{IntoResponse, Response},
};

use crate::app::dto::LoginRequest;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// `POST /authentication/login`
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;

    let success = services
        .verifier
        .check_login_credentials(&body.email, &body.password)
        .await?;

    Ok(Json(success).into_response())
}
