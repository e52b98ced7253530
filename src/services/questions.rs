//! Tender questions and answers

use chrono::Utc;
use uuid::Uuid;

use super::non_blank;
use super::tenders::load_tender;
use crate::auth::{require_all, Requirement};
use crate::domain::{Question, TenderStatus, User};
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

pub async fn ask_question(
    store: &dyn Store,
    caller: &User,
    tender_id: Uuid,
    text: &str,
) -> ServiceResult<Question> {
    let tender = load_tender(store, tender_id).await?;
    require_all(caller, &[Requirement::NotOwner], Some(tender.posted_by))?;
    if tender.status != TenderStatus::Active {
        return Err(ServiceError::TenderNotActive);
    }
    let text = non_blank(Some(text)).ok_or_else(|| ServiceError::validation("Question text is required"))?;

    let now = Utc::now();
    let question = Question {
        id: Uuid::new_v4(),
        tender_id,
        asked_by: caller.id,
        question: text,
        answer: None,
        answered_by: None,
        answered_at: None,
        created_at: now,
        updated_at: now,
    };
    store.insert_question(&question).await?;

    tracing::info!(question_id = %question.id, tender_id = %tender_id, asked_by = %caller.id, "Question asked");
    Ok(question)
}

/// Answer a question on the caller's tender. Each question is answered once.
pub async fn answer_question(
    store: &dyn Store,
    caller: &User,
    question_id: Uuid,
    answer: &str,
) -> ServiceResult<Question> {
    let question = store
        .get_question(question_id)
        .await?
        .ok_or(ServiceError::NotFound("question"))?;
    let tender = load_tender(store, question.tender_id).await?;
    require_all(caller, &[Requirement::Owner], Some(tender.posted_by))?;

    if question.is_answered() {
        return Err(ServiceError::AlreadyAnswered);
    }
    let answer = non_blank(Some(answer)).ok_or_else(|| ServiceError::validation("Answer text is required"))?;

    let question = store
        .answer_question(question_id, &answer, caller.id, Utc::now())
        .await?;
    tracing::info!(question_id = %question.id, answered_by = %caller.id, "Question answered");
    Ok(question)
}

pub async fn list_questions_for_tender(store: &dyn Store, tender_id: Uuid) -> ServiceResult<Vec<Question>> {
    load_tender(store, tender_id).await?;
    Ok(store.list_questions_for_tender(tender_id).await?)
}

pub async fn list_my_questions(store: &dyn Store, caller: &User) -> ServiceResult<Vec<Question>> {
    Ok(store.list_questions_by_user(caller.id).await?)
}
