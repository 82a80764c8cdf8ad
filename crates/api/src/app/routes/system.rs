use axum::{Json, extract::Extension, http::StatusCode};

use crate::app::dto::WhoAmI;
use crate::context::SubjectContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(subject): Extension<SubjectContext>) -> Json<WhoAmI> {
    Json(WhoAmI::from(&subject))
}
