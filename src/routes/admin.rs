//! Admin routes
//!
//! Admin accounts, task assignment and the document verification queue.
//! Permission checks happen in the services.

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
use crate::domain::{
    AssignTaskRequest, CreateAdminRequest, DocumentDecision, RejectDocumentsRequest,
    UpdatePermissionsRequest, UpdateTaskStatusRequest, UserResponse,
};
use crate::error::ApiError;
use crate::services::{admin, verification};

/// POST /admin
pub async fn create_admin(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = admin::create_admin(
        state.store.as_ref(),
        &state.hasher,
        &state.workflow,
        &auth.user,
        req,
    )
    .await?;

    Ok(Created(DataResponse::new(created)))
}

/// GET /admin
pub async fn list_admins(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let items = admin::list_admins(state.store.as_ref(), &auth.user).await?;
    Ok(DataResponse::new(items))
}

/// PUT /admin/:id/permissions
pub async fn update_permissions(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePermissionsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated =
        admin::update_admin_permissions(state.store.as_ref(), &auth.user, id, req.permissions)
            .await?;

    Ok(DataResponse::new(updated))
}

/// POST /admin/tasks
pub async fn assign_task(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssignTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = admin::assign_task(state.store.as_ref(), &auth.user, req).await?;

    Ok(Created(DataResponse::new(task)))
}

/// GET /admin/tasks/my-tasks
pub async fn list_my_tasks(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let items = admin::list_my_tasks(state.store.as_ref(), &auth.user).await?;
    Ok(DataResponse::new(items))
}

/// PUT /admin/tasks/:id/status
pub async fn update_task_status(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = admin::update_task_status(state.store.as_ref(), &auth.user, id, req).await?;

    Ok(DataResponse::new(task))
}

/// GET /admin/verifications/pending
pub async fn pending_verifications(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let items = verification::pending_verifications(state.store.as_ref(), &auth.user).await?;
    Ok(DataResponse::new(items))
}

/// PUT /admin/verifications/:user_id/verify
pub async fn verify_documents(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = verification::decide_documents(
        state.store.as_ref(),
        &state.notifier,
        &auth.user,
        user_id,
        DocumentDecision::Verify,
    )
    .await?;

    Ok(DataResponse::new(UserResponse::from(user)))
}

/// PUT /admin/verifications/:user_id/reject
pub async fn reject_documents(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<RejectDocumentsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = verification::decide_documents(
        state.store.as_ref(),
        &state.notifier,
        &auth.user,
        user_id,
        DocumentDecision::Reject { reason: req.reason },
    )
    .await?;

    Ok(DataResponse::new(UserResponse::from(user)))
}
