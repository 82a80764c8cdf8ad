use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod products;
pub mod system;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/authentication/login", post(auth::login))
        .route("/users", post(users::create_user))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(users::router())
        .merge(products::router())
}
