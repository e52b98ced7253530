//! Tender routes
//!
//! Detail reads go through the Redis cache when one is configured; every
//! mutation drops the cached entry.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::pagination::{Paginated, PaginationParams};
use crate::api::response::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{
    AwardTenderRequest, CreateTenderRequest, Tender, TenderFilter, UpdateTenderRequest,
    UpdateTenderStatusRequest,
};
use crate::error::ApiError;
use crate::services::{cache::keys, tenders};

async fn invalidate(state: &AppState, id: Uuid) {
    if let Some(cache) = &state.cache {
        if let Err(e) = cache.delete(&keys::tender(id)).await {
            tracing::warn!(tender_id = %id, error = %e, "Failed to invalidate cached tender");
        }
    }
}

/// POST /tenders
pub async fn create_tender(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTenderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tender = tenders::create_tender(state.store.as_ref(), &auth.user, req).await?;

    Ok(Created(DataResponse::new(tender)))
}

/// GET /tenders
///
/// Public listing, newest first, filtered by `status`, `category` and `search`.
pub async fn list_tenders(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TenderFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (items, total) = tenders::list_tenders(
        state.store.as_ref(),
        &filter,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok(Paginated::new(items, &pagination, total))
}

/// GET /tenders/:id
pub async fn get_tender(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let key = keys::tender(id);
    if let Some(cache) = &state.cache {
        if let Some(tender) = cache.get::<Tender>(&key).await {
            return Ok(DataResponse::new(tender));
        }
    }

    let tender = tenders::get_tender(state.store.as_ref(), id).await?;

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.set(&key, &tender).await {
            tracing::warn!(tender_id = %id, error = %e, "Failed to cache tender");
        }
    }

    Ok(DataResponse::new(tender))
}

/// PUT /tenders/:id
pub async fn update_tender(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTenderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tender = tenders::update_tender(state.store.as_ref(), &auth.user, id, req).await?;
    invalidate(&state, id).await;

    Ok(DataResponse::new(tender))
}

/// PUT /tenders/:id/status
pub async fn update_tender_status(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTenderStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tender =
        tenders::update_tender_status(state.store.as_ref(), &auth.user, id, req.status).await?;
    invalidate(&state, id).await;

    Ok(DataResponse::new(tender))
}

/// PUT /tenders/:id/award
pub async fn award_tender(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AwardTenderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tender = tenders::award_tender(state.store.as_ref(), &auth.user, id, req.bid_id).await?;
    invalidate(&state, id).await;

    Ok(DataResponse::new(tender))
}

/// DELETE /tenders/:id
pub async fn delete_tender(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    tenders::delete_tender(state.store.as_ref(), &auth.user, id).await?;
    invalidate(&state, id).await;

    Ok(NoContent)
}

/// POST /tenders/:id/posting-fee
pub async fn request_posting_fee(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let payment =
        tenders::request_posting_fee(state.store.as_ref(), &state.workflow, &auth.user, id)
            .await?;

    Ok(Created(DataResponse::new(payment)))
}
