//! PostgreSQL store
//!
//! Status columns are TEXT and converted through the domain enums' `parse`
//! helpers. Composite writes run in one transaction; compare-and-set
//! updates carry the expected state in their `WHERE` clause.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{Guard, Store, StoreError, StoreResult, UniqueKey, UserUpdate};
use crate::domain::{
    AdminTask, AdminType, Bid, BidPaymentStatus, BidStatus, Category, DocumentStatus, Payment,
    PaymentMethod, PaymentStatus, Profile, ProfileDetails, Question, RatingSummary, Review,
    TaskPriority, TaskStatus, TaskType, Tender, TenderFilter, TenderStatus, User, UserType,
};

const USER_COLUMNS: &str = "id, email, password_hash, user_type, admin_type, is_verified, \
    document_status, document_rejection_reason, permissions, verification_token, \
    verification_token_expires, reset_code_hash, reset_code_expires, created_at, updated_at";

const PROFILE_COLUMNS: &str =
    "id, user_id, phone, address, rating, rating_count, details, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, name, description, is_active, created_by, created_at, updated_at";

const TENDER_COLUMNS: &str = "id, title, description, category_id, location, contact_email, \
    image, estimated_budget, deadline, posted_by, status, awarded_to, created_at, updated_at";

const BID_COLUMNS: &str = "id, tender_id, bidder_id, amount, description, status, \
    payment_status, payment_amount, payment_id, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, user_id, tender_id, bid_id, amount, payment_method, \
    transaction_id, status, payment_details, created_at, updated_at";

const QUESTION_COLUMNS: &str = "id, tender_id, asked_by, question, answer, answered_by, \
    answered_at, created_at, updated_at";

const REVIEW_COLUMNS: &str =
    "id, tender_id, reviewer_id, reviewed_user_id, rating, comment, created_at";

const TASK_COLUMNS: &str = "id, title, description, assigned_by, assigned_to, task_type, \
    related_user, status, priority, due_date, completion_notes, created_at, updated_at";

/// Translate a unique-constraint failure into the key it guards.
fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let key = match db.constraint() {
                Some("users_email_key") => Some(UniqueKey::UserEmail),
                Some("profiles_user_id_key") => Some(UniqueKey::ProfileUser),
                Some("categories_name_key") => Some(UniqueKey::CategoryName),
                Some("bids_tender_bidder_key") => Some(UniqueKey::BidPerTender),
                Some("reviews_tender_reviewer_key") => Some(UniqueKey::ReviewPerTender),
                Some("payments_transaction_id_key") => Some(UniqueKey::TransactionId),
                _ => None,
            };
            if let Some(key) = key {
                return StoreError::UniqueViolation(key);
            }
        }
    }
    StoreError::Database(err)
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    user_type: String,
    admin_type: Option<String>,
    is_verified: bool,
    document_status: String,
    document_rejection_reason: Option<String>,
    permissions: Vec<String>,
    verification_token: Option<String>,
    verification_token_expires: Option<DateTime<Utc>>,
    reset_code_hash: Option<String>,
    reset_code_expires: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            user_type: UserType::parse(&row.user_type).unwrap_or_default(),
            admin_type: row.admin_type.as_deref().and_then(AdminType::parse),
            is_verified: row.is_verified,
            document_status: DocumentStatus::parse(&row.document_status).unwrap_or_default(),
            document_rejection_reason: row.document_rejection_reason,
            permissions: row.permissions.into_iter().collect(),
            verification_token: row.verification_token,
            verification_token_expires: row.verification_token_expires,
            reset_code_hash: row.reset_code_hash,
            reset_code_expires: row.reset_code_expires,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    user_id: Uuid,
    phone: String,
    address: Option<String>,
    rating: f64,
    rating_count: i32,
    details: Json<ProfileDetails>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            phone: row.phone,
            address: row.address,
            rating: row.rating,
            rating_count: row.rating_count,
            details: row.details.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TenderRow {
    id: Uuid,
    title: String,
    description: String,
    category_id: Uuid,
    location: String,
    contact_email: String,
    image: Option<String>,
    estimated_budget: Decimal,
    deadline: DateTime<Utc>,
    posted_by: Uuid,
    status: String,
    awarded_to: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TenderRow> for Tender {
    fn from(row: TenderRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            category_id: row.category_id,
            location: row.location,
            contact_email: row.contact_email,
            image: row.image,
            estimated_budget: row.estimated_budget,
            deadline: row.deadline,
            posted_by: row.posted_by,
            status: TenderStatus::parse(&row.status).unwrap_or_default(),
            awarded_to: row.awarded_to,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BidRow {
    id: Uuid,
    tender_id: Uuid,
    bidder_id: Uuid,
    amount: Decimal,
    description: String,
    status: String,
    payment_status: String,
    payment_amount: Decimal,
    payment_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BidRow> for Bid {
    fn from(row: BidRow) -> Self {
        Self {
            id: row.id,
            tender_id: row.tender_id,
            bidder_id: row.bidder_id,
            amount: row.amount,
            description: row.description,
            status: BidStatus::parse(&row.status).unwrap_or_default(),
            payment_status: BidPaymentStatus::parse(&row.payment_status).unwrap_or_default(),
            payment_amount: row.payment_amount,
            payment_id: row.payment_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: Uuid,
    tender_id: Option<Uuid>,
    bid_id: Option<Uuid>,
    amount: Decimal,
    payment_method: String,
    transaction_id: String,
    status: String,
    payment_details: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            tender_id: row.tender_id,
            bid_id: row.bid_id,
            amount: row.amount,
            payment_method: PaymentMethod::parse(&row.payment_method).unwrap_or_default(),
            transaction_id: row.transaction_id,
            status: PaymentStatus::parse(&row.status).unwrap_or_default(),
            payment_details: row.payment_details,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QuestionRow {
    id: Uuid,
    tender_id: Uuid,
    asked_by: Uuid,
    question: String,
    answer: Option<String>,
    answered_by: Option<Uuid>,
    answered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: row.id,
            tender_id: row.tender_id,
            asked_by: row.asked_by,
            question: row.question,
            answer: row.answer,
            answered_by: row.answered_by,
            answered_at: row.answered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    tender_id: Uuid,
    reviewer_id: Uuid,
    reviewed_user_id: Uuid,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            tender_id: row.tender_id,
            reviewer_id: row.reviewer_id,
            reviewed_user_id: row.reviewed_user_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: String,
    assigned_by: Uuid,
    assigned_to: Uuid,
    task_type: String,
    related_user: Option<Uuid>,
    status: String,
    priority: String,
    due_date: Option<DateTime<Utc>>,
    completion_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for AdminTask {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            assigned_by: row.assigned_by,
            assigned_to: row.assigned_to,
            task_type: TaskType::parse(&row.task_type).unwrap_or_default(),
            related_user: row.related_user,
            status: TaskStatus::parse(&row.status).unwrap_or_default(),
            priority: TaskPriority::parse(&row.priority).unwrap_or_default(),
            due_date: row.due_date,
            completion_notes: row.completion_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn profiles_for(&self, user_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ANY($1)"
        ))
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.user_id, Profile::from(row)))
            .collect())
    }

    async fn with_profiles(&self, users: Vec<UserRow>) -> StoreResult<Vec<(User, Option<Profile>)>> {
        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        let mut profiles = self.profiles_for(&ids).await?;
        Ok(users
            .into_iter()
            .map(|row| {
                let profile = profiles.remove(&row.id);
                (User::from(row), profile)
            })
            .collect())
    }
}

/// Tell a missing user apart from one that failed the update's guard.
async fn user_guard_failure<'e, E>(executor: E, id: Uuid, guard: Guard) -> StoreError
where
    E: sqlx::PgExecutor<'e>,
{
    let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await;
    match exists {
        Ok(Some(_)) => StoreError::Guard(guard),
        Ok(None) => StoreError::NotFound("user"),
        Err(e) => e.into(),
    }
}

async fn upsert_profile<'e, E>(executor: E, profile: &Profile) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO profiles (id, user_id, phone, address, rating, rating_count, details, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (user_id) DO UPDATE SET
            phone = EXCLUDED.phone,
            address = EXCLUDED.address,
            details = EXCLUDED.details,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(profile.id)
    .bind(profile.user_id)
    .bind(&profile.phone)
    .bind(&profile.address)
    .bind(profile.rating)
    .bind(profile.rating_count)
    .bind(Json(&profile.details))
    .bind(profile.created_at)
    .bind(profile.updated_at)
    .execute(executor)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

async fn insert_task_row<'e, E>(executor: E, task: &AdminTask) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO admin_tasks (id, title, description, assigned_by, assigned_to, task_type,
            related_user, status, priority, due_date, completion_notes, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.assigned_by)
    .bind(task.assigned_to)
    .bind(task.task_type.as_str())
    .bind(task.related_user)
    .bind(task.status.as_str())
    .bind(task.priority.as_str())
    .bind(task.due_date)
    .bind(&task.completion_notes)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(executor)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

async fn insert_payment_row<'e, E>(executor: E, payment: &Payment) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO payments (id, user_id, tender_id, bid_id, amount, payment_method,
            transaction_id, status, payment_details, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(payment.id)
    .bind(payment.user_id)
    .bind(payment.tender_id)
    .bind(payment.bid_id)
    .bind(payment.amount)
    .bind(payment.payment_method.as_str())
    .bind(&payment.transaction_id)
    .bind(payment.status.as_str())
    .bind(&payment.payment_details)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(executor)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_account(&self, user: &User, profile: &Profile) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let permissions: Vec<String> = user.permissions.iter().cloned().collect();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, user_type, admin_type, is_verified,
                document_status, document_rejection_reason, permissions, verification_token,
                verification_token_expires, reset_code_hash, reset_code_expires, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.user_type.as_str())
        .bind(user.admin_type.map(|t| t.as_str()))
        .bind(user.is_verified)
        .bind(user.document_status.as_str())
        .bind(&user.document_rejection_reason)
        .bind(&permissions)
        .bind(&user.verification_token)
        .bind(user.verification_token_expires)
        .bind(&user.reset_code_hash)
        .bind(user.reset_code_expires)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            r#"
            INSERT INTO profiles (id, user_id, phone, address, rating, rating_count, details, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(profile.id)
        .bind(profile.user_id)
        .bind(&profile.phone)
        .bind(&profile.address)
        .bind(profile.rating)
        .bind(profile.rating_count)
        .bind(Json(&profile.details))
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_verification_token(&self, token: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE verification_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_user(&self, id: Uuid, change: &UserUpdate) -> StoreResult<User> {
        let now = Utc::now();
        let row = match change {
            UserUpdate::EmailVerified => {
                sqlx::query_as::<_, UserRow>(&format!(
                    "UPDATE users SET is_verified = TRUE, verification_token = NULL, \
                     verification_token_expires = NULL, updated_at = $2 \
                     WHERE id = $1 RETURNING {USER_COLUMNS}"
                ))
                .bind(id)
                .bind(now)
                .fetch_optional(&self.pool)
                .await
            }
            UserUpdate::VerificationToken { token, expires } => {
                sqlx::query_as::<_, UserRow>(&format!(
                    "UPDATE users SET verification_token = $2, verification_token_expires = $3, \
                     updated_at = $4 WHERE id = $1 RETURNING {USER_COLUMNS}"
                ))
                .bind(id)
                .bind(token)
                .bind(expires)
                .bind(now)
                .fetch_optional(&self.pool)
                .await
            }
            UserUpdate::ResetCode { hash, expires } => {
                sqlx::query_as::<_, UserRow>(&format!(
                    "UPDATE users SET reset_code_hash = $2, reset_code_expires = $3, \
                     updated_at = $4 WHERE id = $1 RETURNING {USER_COLUMNS}"
                ))
                .bind(id)
                .bind(hash)
                .bind(expires)
                .bind(now)
                .fetch_optional(&self.pool)
                .await
            }
            UserUpdate::Password(hash) => {
                sqlx::query_as::<_, UserRow>(&format!(
                    "UPDATE users SET password_hash = $2, reset_code_hash = NULL, \
                     reset_code_expires = NULL, updated_at = $3 \
                     WHERE id = $1 RETURNING {USER_COLUMNS}"
                ))
                .bind(id)
                .bind(hash)
                .bind(now)
                .fetch_optional(&self.pool)
                .await
            }
            UserUpdate::Permissions(permissions) => {
                let permissions: Vec<String> = permissions.iter().cloned().collect();
                sqlx::query_as::<_, UserRow>(&format!(
                    "UPDATE users SET permissions = $2, updated_at = $3 \
                     WHERE id = $1 RETURNING {USER_COLUMNS}"
                ))
                .bind(id)
                .bind(&permissions)
                .bind(now)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(map_db_error)?;
        row.map(Into::into).ok_or(StoreError::NotFound("user"))
    }

    async fn list_admins(&self) -> StoreResult<Vec<(User, Option<Profile>)>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_type = 'admin' ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        self.with_profiles(rows).await
    }

    async fn list_pending_verifications(&self) -> StoreResult<Vec<(User, Option<Profile>)>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE user_type <> 'admin' AND document_status = 'pending' \
             ORDER BY updated_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        self.with_profiles(rows).await
    }

    async fn get_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn save_profile(&self, profile: &Profile) -> StoreResult<()> {
        upsert_profile(&self.pool, profile).await
    }

    async fn change_email_with_profile(&self, email: &str, profile: &Profile) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET email = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(profile.user_id)
        .bind(email)
        .bind(profile.updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or(StoreError::NotFound("user"))?;
        upsert_profile(&mut *tx, profile).await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn submit_documents(&self, profile: &Profile) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET document_status = 'pending', document_rejection_reason = NULL, \
             updated_at = $2 WHERE id = $1 AND document_status <> 'verified' \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(profile.user_id)
        .bind(profile.updated_at)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Err(
                user_guard_failure(&mut *tx, profile.user_id, Guard::DocumentsVerified).await,
            );
        };
        upsert_profile(&mut *tx, profile).await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn record_document_decision(
        &self,
        user_id: Uuid,
        status: DocumentStatus,
        rejection_reason: Option<&str>,
        task: &AdminTask,
    ) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET document_status = $2, document_rejection_reason = $3, \
             updated_at = $4 WHERE id = $1 AND document_status = 'pending' \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(status.as_str())
        .bind(rejection_reason)
        .bind(task.created_at)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Err(
                user_guard_failure(&mut *tx, user_id, Guard::NotPendingVerification).await,
            );
        };
        insert_task_row(&mut *tx, task).await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, is_active, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.created_by)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_categories(&self, active_only: bool) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE (NOT $1 OR is_active) ORDER BY LOWER(name)"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_category(&self, category: &Category) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories SET name = $2, description = $3, is_active = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("category"));
        }
        Ok(())
    }

    async fn delete_category_if_unused(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound("category"));
        }
        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenders WHERE category_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if in_use {
            return Err(StoreError::Guard(Guard::CategoryInUse));
        }
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_tender(&self, tender: &Tender) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tenders (id, title, description, category_id, location, contact_email,
                image, estimated_budget, deadline, posted_by, status, awarded_to, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(tender.id)
        .bind(&tender.title)
        .bind(&tender.description)
        .bind(tender.category_id)
        .bind(&tender.location)
        .bind(&tender.contact_email)
        .bind(&tender.image)
        .bind(tender.estimated_budget)
        .bind(tender.deadline)
        .bind(tender.posted_by)
        .bind(tender.status.as_str())
        .bind(tender.awarded_to)
        .bind(tender.created_at)
        .bind(tender.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn get_tender(&self, id: Uuid) -> StoreResult<Option<Tender>> {
        let row = sqlx::query_as::<_, TenderRow>(&format!(
            "SELECT {TENDER_COLUMNS} FROM tenders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_tenders(
        &self,
        filter: &TenderFilter,
        limit: u32,
        offset: u32,
    ) -> StoreResult<(Vec<Tender>, u64)> {
        let status = filter.status.map(|s| s.as_str());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        const WHERE: &str = "WHERE ($1::text IS NULL OR status = $1) \
            AND ($2::uuid IS NULL OR category_id = $2) \
            AND ($3::text IS NULL OR title ILIKE $3 OR description ILIKE $3 OR location ILIKE $3)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tenders {WHERE}"))
            .bind(status)
            .bind(filter.category)
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, TenderRow>(&format!(
            "SELECT {TENDER_COLUMNS} FROM tenders {WHERE} \
             ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(status)
        .bind(filter.category)
        .bind(&search)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total as u64))
    }

    async fn update_tender_fields(&self, tender: &Tender) -> StoreResult<Tender> {
        let row = sqlx::query_as::<_, TenderRow>(&format!(
            "UPDATE tenders SET title = $2, description = $3, location = $4, contact_email = $5, \
             image = $6, estimated_budget = $7, deadline = $8, updated_at = NOW() \
             WHERE id = $1 RETURNING {TENDER_COLUMNS}"
        ))
        .bind(tender.id)
        .bind(&tender.title)
        .bind(&tender.description)
        .bind(&tender.location)
        .bind(&tender.contact_email)
        .bind(&tender.image)
        .bind(tender.estimated_budget)
        .bind(tender.deadline)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Into::into).ok_or(StoreError::NotFound("tender"))
    }

    async fn update_tender_status(
        &self,
        id: Uuid,
        from: TenderStatus,
        to: TenderStatus,
    ) -> StoreResult<Tender> {
        let row = sqlx::query_as::<_, TenderRow>(&format!(
            "UPDATE tenders SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {TENDER_COLUMNS}"
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenders WHERE id = $1)")
                        .bind(id)
                        .fetch_one(&self.pool)
                        .await?;
                Err(if exists {
                    StoreError::Guard(Guard::TenderStatusChanged)
                } else {
                    StoreError::NotFound("tender")
                })
            }
        }
    }

    async fn award_tender(&self, tender_id: Uuid, bid_id: Uuid) -> StoreResult<Tender> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM tenders WHERE id = $1 FOR UPDATE")
                .bind(tender_id)
                .fetch_optional(&mut *tx)
                .await?;
        match status.as_deref() {
            None => return Err(StoreError::NotFound("tender")),
            Some(s) if s != TenderStatus::Active.as_str() => {
                return Err(StoreError::Guard(Guard::TenderNotActive));
            }
            _ => {}
        }

        let winner: Option<Uuid> =
            sqlx::query_scalar("SELECT bidder_id FROM bids WHERE id = $1 AND tender_id = $2")
                .bind(bid_id)
                .bind(tender_id)
                .fetch_optional(&mut *tx)
                .await?;
        let winner = winner.ok_or(StoreError::NotFound("bid"))?;

        sqlx::query(
            r#"
            UPDATE bids
            SET status = CASE WHEN id = $2 THEN 'accepted' ELSE 'rejected' END,
                updated_at = NOW()
            WHERE tender_id = $1
            "#,
        )
        .bind(tender_id)
        .bind(bid_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, TenderRow>(&format!(
            "UPDATE tenders SET status = 'awarded', awarded_to = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {TENDER_COLUMNS}"
        ))
        .bind(tender_id)
        .bind(winner)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn delete_tender_if_no_bids(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM tenders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound("tender"));
        }
        let has_bids: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bids WHERE tender_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if has_bids {
            return Err(StoreError::Guard(Guard::TenderHasBids));
        }
        sqlx::query("DELETE FROM tenders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn create_bid_with_payment(&self, bid: &Bid, payment: &Payment) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // Shared lock: concurrent bids proceed, status changes wait
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM tenders WHERE id = $1 FOR SHARE")
                .bind(bid.tender_id)
                .fetch_optional(&mut *tx)
                .await?;
        match status.as_deref() {
            None => return Err(StoreError::NotFound("tender")),
            Some(s) if s != TenderStatus::Active.as_str() => {
                return Err(StoreError::Guard(Guard::TenderNotActive));
            }
            _ => {}
        }

        sqlx::query(
            r#"
            INSERT INTO bids (id, tender_id, bidder_id, amount, description, status,
                payment_status, payment_amount, payment_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(bid.id)
        .bind(bid.tender_id)
        .bind(bid.bidder_id)
        .bind(bid.amount)
        .bind(&bid.description)
        .bind(bid.status.as_str())
        .bind(bid.payment_status.as_str())
        .bind(bid.payment_amount)
        .bind(bid.payment_id)
        .bind(bid.created_at)
        .bind(bid.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        insert_payment_row(&mut *tx, payment).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_bid(&self, id: Uuid) -> StoreResult<Option<Bid>> {
        let row = sqlx::query_as::<_, BidRow>(&format!("SELECT {BID_COLUMNS} FROM bids WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_bid(&self, tender_id: Uuid, bidder_id: Uuid) -> StoreResult<Option<Bid>> {
        let row = sqlx::query_as::<_, BidRow>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE tender_id = $1 AND bidder_id = $2"
        ))
        .bind(tender_id)
        .bind(bidder_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_paid_bids_for_tender(&self, tender_id: Uuid) -> StoreResult<Vec<Bid>> {
        let rows = sqlx::query_as::<_, BidRow>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE tender_id = $1 AND payment_status = 'paid' \
             ORDER BY amount ASC, created_at ASC"
        ))
        .bind(tender_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_bids_by_bidder(&self, bidder_id: Uuid) -> StoreResult<Vec<Bid>> {
        let rows = sqlx::query_as::<_, BidRow>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE bidder_id = $1 ORDER BY created_at DESC"
        ))
        .bind(bidder_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_bid_status(&self, id: Uuid, status: BidStatus) -> StoreResult<Bid> {
        let row = sqlx::query_as::<_, BidRow>(&format!(
            "UPDATE bids SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {BID_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Into::into).ok_or(StoreError::NotFound("bid"))
    }

    async fn delete_bid_if_tender_active(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let status: Option<String> = sqlx::query_scalar(
            "SELECT t.status FROM bids b JOIN tenders t ON t.id = b.tender_id \
             WHERE b.id = $1 FOR SHARE OF t",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        match status.as_deref() {
            None => return Err(StoreError::NotFound("bid")),
            Some(s) if s != TenderStatus::Active.as_str() => {
                return Err(StoreError::Guard(Guard::TenderNotActive));
            }
            _ => {}
        }
        sqlx::query("DELETE FROM bids WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()> {
        insert_payment_row(&self.pool, payment).await
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_payments_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn complete_payment(
        &self,
        id: Uuid,
        method: PaymentMethod,
        details: Option<serde_json::Value>,
    ) -> StoreResult<Payment> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE payments SET status = 'completed', payment_method = $2, \
             payment_details = $3, updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(method.as_str())
        .bind(&details)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payments WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists {
                StoreError::Guard(Guard::PaymentNotPending)
            } else {
                StoreError::NotFound("payment")
            });
        };

        if let Some(bid_id) = row.bid_id {
            sqlx::query("UPDATE bids SET payment_status = 'paid', updated_at = NOW() WHERE id = $1")
                .bind(bid_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(row.into())
    }

    async fn insert_question(&self, question: &Question) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO questions (id, tender_id, asked_by, question, answer, answered_by,
                answered_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(question.id)
        .bind(question.tender_id)
        .bind(question.asked_by)
        .bind(&question.question)
        .bind(&question.answer)
        .bind(question.answered_by)
        .bind(question.answered_at)
        .bind(question.created_at)
        .bind(question.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn get_question(&self, id: Uuid) -> StoreResult<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_questions_for_tender(&self, tender_id: Uuid) -> StoreResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE tender_id = $1 ORDER BY created_at DESC"
        ))
        .bind(tender_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_questions_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE asked_by = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn answer_question(
        &self,
        id: Uuid,
        answer: &str,
        answered_by: Uuid,
        answered_at: DateTime<Utc>,
    ) -> StoreResult<Question> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "UPDATE questions SET answer = $2, answered_by = $3, answered_at = $4, updated_at = $4 \
             WHERE id = $1 AND answer IS NULL RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(id)
        .bind(answer)
        .bind(answered_by)
        .bind(answered_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM questions WHERE id = $1)")
                        .bind(id)
                        .fetch_one(&self.pool)
                        .await?;
                Err(if exists {
                    StoreError::Guard(Guard::QuestionAnswered)
                } else {
                    StoreError::NotFound("question")
                })
            }
        }
    }

    async fn insert_review_and_recompute(&self, review: &Review) -> StoreResult<RatingSummary> {
        let mut tx = self.pool.begin().await?;

        // Serializes recomputes for the same reviewed user
        let profile_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM profiles WHERE user_id = $1 FOR UPDATE")
                .bind(review.reviewed_user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let profile_id = profile_id.ok_or(StoreError::NotFound("profile"))?;

        sqlx::query(
            r#"
            INSERT INTO reviews (id, tender_id, reviewer_id, reviewed_user_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id)
        .bind(review.tender_id)
        .bind(review.reviewer_id)
        .bind(review.reviewed_user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let ratings: Vec<i32> =
            sqlx::query_scalar("SELECT rating FROM reviews WHERE reviewed_user_id = $1")
                .bind(review.reviewed_user_id)
                .fetch_all(&mut *tx)
                .await?;
        let summary = RatingSummary::from_ratings(&ratings);

        sqlx::query(
            "UPDATE profiles SET rating = $2, rating_count = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(profile_id)
        .bind(summary.rating)
        .bind(summary.rating_count)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(summary)
    }

    async fn list_reviews_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE reviewed_user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_task(&self, task: &AdminTask) -> StoreResult<()> {
        insert_task_row(&self.pool, task).await
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<AdminTask>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM admin_tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_tasks_for_assignee(&self, admin_id: Uuid) -> StoreResult<Vec<AdminTask>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM admin_tasks WHERE assigned_to = $1 ORDER BY created_at DESC"
        ))
        .bind(admin_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_task(&self, task: &AdminTask) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE admin_tasks SET title = $2, description = $3, status = $4, priority = $5,
                due_date = $6, completion_notes = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(&task.completion_notes)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("task"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("road"), "%road%");
    }
}
