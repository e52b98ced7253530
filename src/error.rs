//! Unified API error handling
//!
//! Services fail with a [`ServiceError`]; each variant is classified into an
//! [`ErrorKind`] which fixes the HTTP status. [`ApiError`] turns either kind
//! of failure into a consistent JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::TenderStatus;
use crate::store::{Guard, StoreError, UniqueKey};

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Unauthorized,
    Conflict,
    Immutable,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict | Self::Immutable => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Marketplace workflow failure
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("Token is invalid or has expired")]
    InvalidToken,

    #[error("{0} must be an http(s) URL to a jpg, jpeg, png, pdf or webp file")]
    InvalidDocumentUrl(&'static str),

    #[error("Task assignee must be an admin")]
    TargetNotAdmin,

    #[error("Super admin accounts cannot be modified")]
    CannotModifySuperAdmin,

    #[error("Already verified")]
    AlreadyVerified,

    #[error("Documents already submitted and awaiting review")]
    AlreadySubmitted,

    #[error("Documents are not pending verification")]
    NotPendingVerification,

    #[error("Cannot change tender status from {from} to {to}")]
    InvalidTransition { from: TenderStatus, to: TenderStatus },

    #[error("Tender status changed concurrently, reload and retry")]
    ConcurrentUpdate,

    #[error("Tender is not active")]
    TenderNotActive,

    #[error("Tender is not completed")]
    TenderNotCompleted,

    #[error("Tender deadline has passed")]
    DeadlinePassed,

    #[error("Tender has bids and cannot be deleted")]
    HasBids,

    #[error("You have already placed a bid on this tender")]
    DuplicateBid,

    #[error("Payment has already been processed")]
    AlreadyProcessed,

    #[error("Question has already been answered")]
    AlreadyAnswered,

    #[error("You have already reviewed this tender")]
    DuplicateReview,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Category name already exists")]
    CategoryNameTaken,

    #[error("Category is referenced by tenders")]
    CategoryInUse,

    #[error("{0} cannot be changed once set")]
    ImmutableField(&'static str),

    #[error("Credential processing failed: {0}")]
    Crypto(String),

    #[error("Store error")]
    Store(StoreError),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidToken | Self::InvalidDocumentUrl(_) | Self::TargetNotAdmin => {
                ErrorKind::Validation
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) | Self::CannotModifySuperAdmin => ErrorKind::Forbidden,
            Self::InvalidCredentials | Self::EmailNotVerified => ErrorKind::Unauthorized,
            Self::AlreadyVerified
            | Self::AlreadySubmitted
            | Self::NotPendingVerification
            | Self::InvalidTransition { .. }
            | Self::ConcurrentUpdate
            | Self::TenderNotActive
            | Self::TenderNotCompleted
            | Self::DeadlinePassed
            | Self::HasBids
            | Self::DuplicateBid
            | Self::AlreadyProcessed
            | Self::AlreadyAnswered
            | Self::DuplicateReview
            | Self::EmailTaken
            | Self::CategoryNameTaken
            | Self::CategoryInUse => ErrorKind::Conflict,
            Self::ImmutableField(_) => ErrorKind::Immutable,
            Self::Crypto(_) | Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InvalidDocumentUrl(_) => "INVALID_DOCUMENT_URL",
            Self::TargetNotAdmin => "TARGET_NOT_ADMIN",
            Self::CannotModifySuperAdmin => "CANNOT_MODIFY_SUPER_ADMIN",
            Self::AlreadyVerified => "ALREADY_VERIFIED",
            Self::AlreadySubmitted => "ALREADY_SUBMITTED",
            Self::NotPendingVerification => "NOT_PENDING_VERIFICATION",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ConcurrentUpdate => "CONCURRENT_UPDATE",
            Self::TenderNotActive => "TENDER_NOT_ACTIVE",
            Self::TenderNotCompleted => "TENDER_NOT_COMPLETED",
            Self::DeadlinePassed => "DEADLINE_PASSED",
            Self::HasBids => "HAS_BIDS",
            Self::DuplicateBid => "DUPLICATE_BID",
            Self::AlreadyProcessed => "ALREADY_PROCESSED",
            Self::AlreadyAnswered => "ALREADY_ANSWERED",
            Self::DuplicateReview => "DUPLICATE_REVIEW",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::CategoryNameTaken => "CATEGORY_NAME_TAKEN",
            Self::CategoryInUse => "CATEGORY_IN_USE",
            Self::ImmutableField(_) => "IMMUTABLE_FIELD",
            Self::Crypto(_) | Self::Store(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::UniqueViolation(UniqueKey::UserEmail) => Self::EmailTaken,
            StoreError::UniqueViolation(UniqueKey::CategoryName) => Self::CategoryNameTaken,
            StoreError::UniqueViolation(UniqueKey::BidPerTender) => Self::DuplicateBid,
            StoreError::UniqueViolation(UniqueKey::ReviewPerTender) => Self::DuplicateReview,
            StoreError::Guard(Guard::TenderHasBids) => Self::HasBids,
            StoreError::Guard(Guard::CategoryInUse) => Self::CategoryInUse,
            StoreError::Guard(Guard::TenderNotActive) => Self::TenderNotActive,
            StoreError::Guard(Guard::TenderStatusChanged) => Self::ConcurrentUpdate,
            StoreError::Guard(Guard::PaymentNotPending) => Self::AlreadyProcessed,
            StoreError::Guard(Guard::QuestionAnswered) => Self::AlreadyAnswered,
            StoreError::Guard(Guard::NotPendingVerification) => Self::NotPendingVerification,
            StoreError::Guard(Guard::DocumentsVerified) => Self::AlreadyVerified,
            other => Self::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error(transparent)]
    Workflow(#[from] ServiceError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Workflow(e) => e.kind().status_code(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Workflow(e) => e.code(),
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Don't leak internal error details
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Workflow(e) if e.kind() == ErrorKind::Internal => {
                "An internal error occurred".to_string()
            }
            Self::Workflow(e) => e.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Workflow(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = ?e, "Internal server error");
            }
            Self::Workflow(ServiceError::Store(e)) => {
                tracing::error!(error = ?e, "Store error");
            }
            Self::Workflow(e @ ServiceError::Crypto(_)) => {
                tracing::error!(error = %e, "Credential error");
            }
            _ => {
                tracing::warn!(error = %self, "API error");
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
            request_id: None,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_map_to_409() {
        let err = ApiError::from(ServiceError::DuplicateBid);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), "DUPLICATE_BID");
    }

    #[test]
    fn immutable_field_is_its_own_kind() {
        let err = ServiceError::ImmutableField("commercial_registration_doc");
        assert_eq!(err.kind(), ErrorKind::Immutable);
        assert_eq!(err.kind().status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn unique_violations_become_domain_conflicts() {
        let err: ServiceError = StoreError::UniqueViolation(UniqueKey::ReviewPerTender).into();
        assert!(matches!(err, ServiceError::DuplicateReview));
        let err: ServiceError = StoreError::Guard(Guard::PaymentNotPending).into();
        assert!(matches!(err, ServiceError::AlreadyProcessed));
    }

    #[test]
    fn store_failures_do_not_leak() {
        let err = ApiError::from(StoreError::UniqueViolation(UniqueKey::TransactionId));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "An internal error occurred");
    }
}
