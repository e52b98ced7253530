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
use crate::domain::{AnswerQuestionRequest, AskQuestionRequest};
use crate::error::ApiError;
use crate::services::questions;

/// POST /questions
pub async fn ask_question(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question =
        questions::ask_question(state.store.as_ref(), &auth.user, req.tender_id, &req.question)
            .await?;

    Ok(Created(DataResponse::new(question)))
}

/// PUT /questions/:id/answer
pub async fn answer_question(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question =
        questions::answer_question(state.store.as_ref(), &auth.user, id, &req.answer).await?;

    Ok(DataResponse::new(question))
}

/// GET /questions/tender/:tender_id
pub async fn list_questions_for_tender(
    State(state): State<Arc<AppState>>,
    Path(tender_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let items = questions::list_questions_for_tender(state.store.as_ref(), tender_id).await?;
    Ok(DataResponse::new(items))
}

/// GET /questions/my-questions
pub async fn list_my_questions(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let items = questions::list_my_questions(state.store.as_ref(), &auth.user).await?;
    Ok(DataResponse::new(items))
}
