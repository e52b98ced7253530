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
use crate::domain::{CreateBidRequest, PayBidRequest, UpdateBidStatusRequest};
use crate::error::ApiError;
use crate::services::bids;

/// POST /bids
///
/// Places a bid together with its pending payment.
pub async fn create_bid(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = bids::create_bid(state.store.as_ref(), &state.workflow, &auth.user, req).await?;

    Ok(Created(DataResponse::new(created)))
}

/// POST /bids/:id/process-payment
pub async fn process_bid_payment(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PayBidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let paid = bids::process_bid_payment(state.store.as_ref(), &auth.user, id, req).await?;

    Ok(DataResponse::new(paid))
}

/// GET /bids/tender/:tender_id
///
/// Paid bids, visible to the tender's poster and admins.
pub async fn list_bids_for_tender(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(tender_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let items = bids::list_bids_for_tender(state.store.as_ref(), &auth.user, tender_id).await?;
    Ok(DataResponse::new(items))
}

/// GET /bids/my-bids
pub async fn list_my_bids(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let items = bids::list_my_bids(state.store.as_ref(), &auth.user).await?;
    Ok(DataResponse::new(items))
}

/// PUT /bids/:id/status
pub async fn update_bid_status(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBidStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let bid = bids::update_bid_status(state.store.as_ref(), &auth.user, id, &req.status).await?;

    Ok(DataResponse::new(bid))
}

/// DELETE /bids/:id
pub async fn delete_bid(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    bids::delete_bid(state.store.as_ref(), &auth.user, id).await?;

    Ok(NoContent)
}
