use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{ProfilePatch, SubmitDocumentsRequest};
use crate::error::ApiError;
use crate::services::{profiles, verification};

/// GET /profiles
pub async fn get_profile(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = profiles::get_profile(state.store.as_ref(), &auth.user).await?;
    Ok(DataResponse::new(profile))
}

/// POST /profiles, PUT /profiles
///
/// Creates the profile if missing, otherwise patches it.
pub async fn upsert_profile(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<ProfilePatch>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = profiles::upsert_profile(state.store.as_ref(), &auth.user, patch).await?;

    Ok(DataResponse::new(profile))
}

/// PUT /profiles/submit-documents
pub async fn submit_documents(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitDocumentsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = verification::submit_documents(state.store.as_ref(), &auth.user, req).await?;

    Ok(DataResponse::new(status))
}

/// GET /profiles/verification-status
pub async fn verification_status(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let status = verification::verification_status(state.store.as_ref(), &auth.user).await?;
    Ok(DataResponse::new(status))
}
