//! Persistence boundary
//!
//! Every multi-entity write the marketplace needs is a single `Store` call so
//! that implementations can make it atomic: a transaction in [`PgStore`], one
//! write-lock critical section in [`MemoryStore`]. Uniqueness and
//! compare-and-set guards are reported as [`StoreError::UniqueViolation`] and
//! [`StoreError::Guard`] and mapped to domain conflicts by the services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    AdminTask, Bid, BidStatus, Category, DocumentStatus, Payment, PaymentMethod, Profile, Question,
    RatingSummary, Review, Tender, TenderFilter, TenderStatus, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Unique constraints the schema enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    UserEmail,
    ProfileUser,
    CategoryName,
    BidPerTender,
    ReviewPerTender,
    TransactionId,
}

/// Compare-and-set conditions checked inside a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    TenderHasBids,
    CategoryInUse,
    TenderNotActive,
    TenderStatusChanged,
    PaymentNotPending,
    QuestionAnswered,
    NotPendingVerification,
    DocumentsVerified,
}

/// Change to a user row. Each variant touches only its own columns, so
/// concurrent changes of different kinds never overwrite each other.
#[derive(Debug, Clone)]
pub enum UserUpdate {
    /// Mark the email verified and clear the verification token.
    EmailVerified,
    VerificationToken {
        token: String,
        expires: DateTime<Utc>,
    },
    ResetCode {
        hash: String,
        expires: DateTime<Utc>,
    },
    /// Replace the password hash and clear any reset code.
    Password(String),
    Permissions(BTreeSet<String>),
}

impl UserUpdate {
    pub fn apply(&self, user: &mut User, at: DateTime<Utc>) {
        match self {
            Self::EmailVerified => {
                user.is_verified = true;
                user.verification_token = None;
                user.verification_token_expires = None;
            }
            Self::VerificationToken { token, expires } => {
                user.verification_token = Some(token.clone());
                user.verification_token_expires = Some(*expires);
            }
            Self::ResetCode { hash, expires } => {
                user.reset_code_hash = Some(hash.clone());
                user.reset_code_expires = Some(*expires);
            }
            Self::Password(hash) => {
                user.password_hash = hash.clone();
                user.reset_code_hash = None;
                user.reset_code_expires = None;
            }
            Self::Permissions(permissions) => user.permissions = permissions.clone(),
        }
        user.updated_at = at;
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unique constraint violated: {0:?}")]
    UniqueViolation(UniqueKey),

    #[error("write guard failed: {0:?}")]
    Guard(Guard),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // Accounts and profiles

    /// Insert a user together with its profile.
    async fn create_account(&self, user: &User, profile: &Profile) -> StoreResult<()>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// `email` must already be normalized.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_verification_token(&self, token: &str) -> StoreResult<Option<User>>;
    /// Apply `change` to the stored row and return the result.
    async fn update_user(&self, id: Uuid, change: &UserUpdate) -> StoreResult<User>;
    async fn list_admins(&self) -> StoreResult<Vec<(User, Option<Profile>)>>;
    /// Non-admin users whose documents await review, oldest first.
    async fn list_pending_verifications(&self) -> StoreResult<Vec<(User, Option<Profile>)>>;
    async fn get_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    /// Insert or replace the profile keyed by its user. The rating columns
    /// are left to review writes.
    async fn save_profile(&self, profile: &Profile) -> StoreResult<()>;
    /// Change the login email and save the profile together.
    async fn change_email_with_profile(&self, email: &str, profile: &Profile) -> StoreResult<User>;
    /// Save the profile carrying new documents and put the owner back to
    /// pending review, unless the owner is already verified.
    async fn submit_documents(&self, profile: &Profile) -> StoreResult<User>;
    /// Set the document decision and insert the matching task record,
    /// provided the stored status is still pending.
    async fn record_document_decision(
        &self,
        user_id: Uuid,
        status: DocumentStatus,
        rejection_reason: Option<&str>,
        task: &AdminTask,
    ) -> StoreResult<User>;

    // Categories

    async fn insert_category(&self, category: &Category) -> StoreResult<()>;
    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>>;
    async fn list_categories(&self, active_only: bool) -> StoreResult<Vec<Category>>;
    async fn update_category(&self, category: &Category) -> StoreResult<()>;
    async fn delete_category_if_unused(&self, id: Uuid) -> StoreResult<()>;

    // Tenders

    async fn insert_tender(&self, tender: &Tender) -> StoreResult<()>;
    async fn get_tender(&self, id: Uuid) -> StoreResult<Option<Tender>>;
    /// Newest first. Returns the page and the total number of matches.
    async fn list_tenders(
        &self,
        filter: &TenderFilter,
        limit: u32,
        offset: u32,
    ) -> StoreResult<(Vec<Tender>, u64)>;
    /// Write the editable fields; status and award are left untouched.
    async fn update_tender_fields(&self, tender: &Tender) -> StoreResult<Tender>;
    async fn update_tender_status(
        &self,
        id: Uuid,
        from: TenderStatus,
        to: TenderStatus,
    ) -> StoreResult<Tender>;
    /// Award the tender to `bid_id`: accept it, reject every other bid.
    async fn award_tender(&self, tender_id: Uuid, bid_id: Uuid) -> StoreResult<Tender>;
    async fn delete_tender_if_no_bids(&self, id: Uuid) -> StoreResult<()>;

    // Bids

    /// Insert a bid and the payment funding it, while the tender is active.
    async fn create_bid_with_payment(&self, bid: &Bid, payment: &Payment) -> StoreResult<()>;
    async fn get_bid(&self, id: Uuid) -> StoreResult<Option<Bid>>;
    async fn find_bid(&self, tender_id: Uuid, bidder_id: Uuid) -> StoreResult<Option<Bid>>;
    /// Paid bids only, cheapest first.
    async fn list_paid_bids_for_tender(&self, tender_id: Uuid) -> StoreResult<Vec<Bid>>;
    async fn list_bids_by_bidder(&self, bidder_id: Uuid) -> StoreResult<Vec<Bid>>;
    async fn update_bid_status(&self, id: Uuid, status: BidStatus) -> StoreResult<Bid>;
    async fn delete_bid_if_tender_active(&self, id: Uuid) -> StoreResult<()>;

    // Payments

    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()>;
    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>>;
    async fn list_payments_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Payment>>;
    /// Mark a pending payment completed, and its bid paid if it funds one.
    async fn complete_payment(
        &self,
        id: Uuid,
        method: PaymentMethod,
        details: Option<serde_json::Value>,
    ) -> StoreResult<Payment>;

    // Questions

    async fn insert_question(&self, question: &Question) -> StoreResult<()>;
    async fn get_question(&self, id: Uuid) -> StoreResult<Option<Question>>;
    async fn list_questions_for_tender(&self, tender_id: Uuid) -> StoreResult<Vec<Question>>;
    async fn list_questions_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Question>>;
    async fn answer_question(
        &self,
        id: Uuid,
        answer: &str,
        answered_by: Uuid,
        answered_at: DateTime<Utc>,
    ) -> StoreResult<Question>;

    // Reviews

    /// Insert the review and recompute the reviewed user's rating from all
    /// of their reviews.
    async fn insert_review_and_recompute(&self, review: &Review) -> StoreResult<RatingSummary>;
    async fn list_reviews_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Review>>;

    // Admin tasks

    async fn insert_task(&self, task: &AdminTask) -> StoreResult<()>;
    async fn get_task(&self, id: Uuid) -> StoreResult<Option<AdminTask>>;
    async fn list_tasks_for_assignee(&self, admin_id: Uuid) -> StoreResult<Vec<AdminTask>>;
    async fn update_task(&self, task: &AdminTask) -> StoreResult<()>;
}
