use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::ProcessPaymentRequest;
use crate::error::ApiError;
use crate::services::payments;

/// POST /payments/process
pub async fn process_payment(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = payments::process_payment(state.store.as_ref(), &auth.user, req).await?;

    Ok(DataResponse::new(payment))
}

/// GET /payments/my-payments
pub async fn list_my_payments(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let items = payments::list_my_payments(state.store.as_ref(), &auth.user).await?;
    Ok(DataResponse::new(items))
}

/// GET /payments/:id
pub async fn get_payment(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = payments::get_payment(state.store.as_ref(), &auth.user, id).await?;
    Ok(DataResponse::new(payment))
}
