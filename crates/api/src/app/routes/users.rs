use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};

use stockroom_auth::AuthError;
use stockroom_core::{DomainError, ListQuery, RawListQuery, UserId};
use stockroom_users::{ChangePassword, NewUser, UpdateUser, User, UserField, UserView};

use crate::app::dto::IdResponse;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/users/:id/change-password", patch(change_password))
}

fn parse_id(id: &str) -> Result<UserId, ApiError> {
    Ok(id.parse::<UserId>()?)
}

async fn load(services: &AppServices, id: UserId) -> Result<User, ApiError> {
    services
        .users
        .get(id)
        .await?
        .ok_or_else(|| DomainError::not_found().into())
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<RawListQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(raw) = query?;
    let query = ListQuery::<UserField>::parse(&raw);

    let page = services.users.list(&query).await?;
    Ok(Json(page.map(UserView::from)).into_response())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user = load(&services, parse_id(&id)?).await?;
    Ok(Json(UserView::from(user)).into_response())
}

/// Public registration.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    body.validate()?;

    if services.users.find_by_email(&body.email).await?.is_some() {
        return Err(DomainError::conflict("Email already exists").into());
    }

    let password_hash = services.hasher.hash(&body.password)?;
    let user = User::register(body.name, body.email, password_hash);
    services.users.create(&user).await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserView::from(user))).into_response())
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateUser>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    body.validate()?;

    let mut user = load(&services, id).await?;
    if let Some(other) = services.users.find_by_email(&body.email).await? {
        if other.id != id {
            return Err(DomainError::conflict("Email already exists").into());
        }
    }

    if !services.users.update_profile(id, &body.name, &body.email).await? {
        return Err(DomainError::not_found().into());
    }

    user.name = body.name;
    user.email = body.email;
    Ok(Json(UserView::from(user)).into_response())
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    if !services.users.delete(id).await? {
        return Err(DomainError::not_found().into());
    }

    tracing::info!(user_id = %id, "user deleted");
    Ok(Json(IdResponse { id }).into_response())
}

/// The old password goes through the same lockout as a login: a locked
/// account is refused and a wrong guess counts as a failure.
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<ChangePassword>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    body.validate()?;

    load(&services, id).await?;
    match services.verifier.check_password(id, &body.password_old).await {
        Ok(()) => {}
        Err(AuthError::InvalidCredentials) => return Err(ApiError::WrongPassword),
        Err(AuthError::NoSuchAccount) => return Err(DomainError::not_found().into()),
        Err(e) => return Err(e.into()),
    }

    let password_hash = services.hasher.hash(&body.password_new)?;
    if !services.users.set_password_hash(id, &password_hash).await? {
        return Err(DomainError::not_found().into());
    }

    tracing::info!(user_id = %id, "password changed");
    Ok(Json(IdResponse { id }).into_response())
}
