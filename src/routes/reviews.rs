use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{Created, DataResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::CreateReviewRequest;
use crate::error::ApiError;
use crate::services::reviews;

/// POST /reviews
pub async fn create_review(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = reviews::create_review(state.store.as_ref(), &auth.user, req).await?;

    Ok(Created(DataResponse::new(created)))
}

/// GET /reviews/user/:user_id
pub async fn list_reviews_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let items = reviews::list_reviews_for_user(state.store.as_ref(), user_id).await?;
    Ok(DataResponse::new(items))
}

/// GET /reviews/my-reviews
///
/// Reviews received by the caller.
pub async fn list_my_reviews(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let items = reviews::list_my_received_reviews(state.store.as_ref(), &auth.user).await?;
    Ok(DataResponse::new(items))
}
