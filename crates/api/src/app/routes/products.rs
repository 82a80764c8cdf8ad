use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use stockroom_auth::{Account, AuthError, TokenGrant};
use stockroom_core::{DomainError, ListQuery, ProductId, RawListQuery};
use stockroom_products::{ChangePrice, NewProduct, Product, ProductField, ProductView, UpdateProduct};

use crate::app::dto::{AccessTokenResponse, IdResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::SubjectContext;

pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/change-price", post(change_price))
        .route("/products/:id/access-token", post(issue_access_token))
}

fn parse_id(id: &str) -> Result<ProductId, ApiError> {
    Ok(id.parse::<ProductId>()?)
}

async fn load(services: &AppServices, id: ProductId) -> Result<Product, ApiError> {
    services
        .products
        .get(id)
        .await?
        .ok_or_else(|| DomainError::not_found().into())
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<RawListQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(raw) = query?;
    let query = ListQuery::<ProductField>::parse(&raw);

    let page = services.products.list(&query).await?;
    Ok(Json(page.map(ProductView::from)).into_response())
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let product = load(&services, parse_id(&id)?).await?;
    Ok(Json(ProductView::from(product)).into_response())
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let product = body.into_product()?;
    services.products.create(&product).await?;

    tracing::info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(ProductView::from(product))).into_response())
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateProduct>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    body.validate()?;

    let mut product = load(&services, id).await?;
    body.apply_to(&mut product)?;
    if !services.products.update(&product).await? {
        return Err(DomainError::not_found().into());
    }

    Ok(Json(ProductView::from(product)).into_response())
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    if !services.products.delete(id).await? {
        return Err(DomainError::not_found().into());
    }

    tracing::info!(product_id = %id, "product deleted");
    Ok(Json(IdResponse { id }).into_response())
}

pub async fn change_price(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<ChangePrice>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    body.validate()?;

    if !services.products.change_price(id, body.price).await? {
        return Err(DomainError::not_found().into());
    }

    let product = load(&services, id).await?;
    Ok(Json(ProductView::from(product)).into_response())
}

/// Mint a token for the caller that stays valid only while the product exists.
pub async fn issue_access_token(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let product_id = parse_id(&id)?;
    load(&services, product_id).await?;

    let user = services
        .users
        .get(subject.user_id())
        .await?
        .ok_or(AuthError::UnknownSubject)?;

    let token = services
        .issuer
        .issue(&Account::from(user), &TokenGrant::product(product_id))?;

    Ok((
        StatusCode::CREATED,
        Json(AccessTokenResponse { product_id, token }),
    )
        .into_response())
}
