use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Question about a tender, answerable once by its poster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub asked_by: Uuid,
    pub question: String,
    pub answer: Option<String>,
    pub answered_by: Option<Uuid>,
    pub answered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }
}

/// Request DTO for asking a question
#[derive(Debug, Clone, Deserialize)]
pub struct AskQuestionRequest {
    pub tender_id: Uuid,
    #[serde(default)]
    pub question: String,
}

/// Request DTO for answering a question
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerQuestionRequest {
    #[serde(default)]
    pub answer: String,
}
