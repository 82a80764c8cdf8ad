use std::sync::Arc;

use axum::{extract::State, http::header::AUTHORIZATION, middleware::Next, response::Response};

use stockroom_auth::RequestGate;

use crate::app::errors::ApiError;
use crate::context::SubjectContext;

#[derive(Clone)]
pub struct AuthState {
    pub gate: Arc<RequestGate>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let subject = state.gate.admit(header.as_deref()).await?;

    req.extensions_mut().insert(SubjectContext::new(subject));

    Ok(next.run(req).await)
}
