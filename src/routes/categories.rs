use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::error::ApiError;
use crate::services::categories;

/// GET /categories
///
/// Public; inactive categories are hidden.
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let items = categories::list_categories(state.store.as_ref(), true).await?;
    Ok(DataResponse::new(items))
}

/// POST /categories
pub async fn create_category(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = categories::create_category(state.store.as_ref(), &auth.user, req).await?;

    Ok(Created(DataResponse::new(category)))
}

/// PUT /categories/:id
pub async fn update_category(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = categories::update_category(state.store.as_ref(), &auth.user, id, req).await?;

    Ok(DataResponse::new(category))
}

/// DELETE /categories/:id
pub async fn delete_category(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    categories::delete_category(state.store.as_ref(), &auth.user, id).await?;

    Ok(NoContent)
}
