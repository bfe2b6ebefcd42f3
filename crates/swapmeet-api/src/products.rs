use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use swapmeet_db::models::{NewProduct, ProductPatch};
use swapmeet_types::api::{CreateProductRequest, LikeResponse, UpdateProductRequest};
use swapmeet_types::models::ProductStatus;

use crate::AppState;
use crate::assemble::product_response;
use crate::error::{ApiError, join_err};
use crate::middleware::CurrentUser;

pub async fn list_my_products(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = user.id.to_string();
    let products = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_products_by_owner(&uid)?;
        rows.iter()
            .map(|row| product_response(&db.db, row, &uid))
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await
    .map_err(join_err)??;

    Ok(Json(products))
}

/// Marketplace feed: available products from everyone but the requester.
pub async fn list_all_products(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = user.id.to_string();
    let products = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_available_products(&uid)?;
        rows.iter()
            .map(|row| product_response(&db.db, row, &uid))
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await
    .map_err(join_err)??;

    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let status = req.status.unwrap_or(ProductStatus::Available);
    let new = NewProduct {
        title: req.title,
        description: req.description,
        category: req.category.as_str().to_string(),
        image: req.image,
        wanted_items: req.wanted_items,
        location: req.location,
        status: status.as_str().to_string(),
        can_sell: req.can_sell,
    };

    let uid = user.id.to_string();
    let row = state
        .db
        .insert_product(&Uuid::new_v4().to_string(), &uid, &new)?;
    let body = product_response(&state.db, &row, &uid)?;
    Ok((StatusCode::CREATED, Json(body)))
}

// Path ids stay raw strings throughout: an id that matches nothing,
// malformed included, reads as a 404 rather than a 400.
pub async fn get_my_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user.id.to_string();
    let row = state
        .db
        .get_product_owned(&id, &uid)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(product_response(&state.db, &row, &uid)?))
}

/// Partial update over the writable product fields; serves both PUT and
/// PATCH. Someone else's product reads as a 404.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = ProductPatch {
        title: req.title,
        description: req.description,
        category: req.category.map(|c| c.as_str().to_string()),
        image: req.image,
        wanted_items: req.wanted_items,
        location: req.location,
        status: req.status.map(|s| s.as_str().to_string()),
        can_sell: req.can_sell,
    };

    let uid = user.id.to_string();
    let row = state
        .db
        .update_product(&id, &uid, &patch)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(product_response(&state.db, &row, &uid)?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.db.delete_product(&id, &user.id.to_string())?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Idempotent like toggle. The store keeps the denormalized counter in
/// step inside one transaction.
pub async fn toggle_product_like(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let like_id = Uuid::new_v4();

    let (liked, likes_count) = state
        .db
        .toggle_like(&like_id.to_string(), &user.id.to_string(), &id)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(LikeResponse { liked, likes_count }))
}
