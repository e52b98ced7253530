//! Fixtures shared by the service unit tests

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::{LogEmailSender, Notifier, WorkflowConfig};
use crate::auth::PasswordHasher;
use crate::domain::{
    permissions, AdminDetails, AdminType, BusinessDetails, Category, CreateBidRequest,
    CreateTenderRequest, DocumentStatus, IndividualDetails, Profile, ProfileDetails, Tender, User,
    UserType,
};
use crate::store::{MemoryStore, Store};

pub fn store() -> MemoryStore {
    MemoryStore::new()
}

pub fn hasher() -> PasswordHasher {
    PasswordHasher::with_params(256, 1, 1).unwrap()
}

pub fn notifier() -> Notifier {
    Notifier::new(Arc::new(LogEmailSender), "http://localhost:8080")
}

pub fn config() -> WorkflowConfig {
    WorkflowConfig::default()
}

fn base_user(user_type: UserType, admin_type: Option<AdminType>) -> User {
    let now = Utc::now();
    let id = Uuid::new_v4();
    User {
        id,
        email: format!("{}@example.com", id.simple()),
        password_hash: String::new(),
        user_type,
        admin_type,
        is_verified: true,
        document_status: DocumentStatus::Pending,
        document_rejection_reason: None,
        permissions: Default::default(),
        verification_token: None,
        verification_token_expires: None,
        reset_code_hash: None,
        reset_code_expires: None,
        created_at: now,
        updated_at: now,
    }
}

async fn insert(store: &dyn Store, user: User) -> User {
    let details = match user.user_type {
        UserType::Individual => ProfileDetails::Individual(IndividualDetails {
            full_name: "Test Person".into(),
            personal_email: Some(user.email.clone()),
            ..Default::default()
        }),
        UserType::Business => ProfileDetails::Business(BusinessDetails {
            company_name: "Test Trading LLC".into(),
            company_email: Some(user.email.clone()),
            ..Default::default()
        }),
        UserType::Admin => ProfileDetails::Admin(AdminDetails::default()),
    };
    let profile = Profile::new(user.id, "+97450000000".into(), details);
    store.create_account(&user, &profile).await.unwrap();
    user
}

pub async fn individual(store: &dyn Store, status: DocumentStatus) -> User {
    let mut user = base_user(UserType::Individual, None);
    user.document_status = status;
    insert(store, user).await
}

pub async fn business(store: &dyn Store, status: DocumentStatus) -> User {
    let mut user = base_user(UserType::Business, None);
    user.document_status = status;
    insert(store, user).await
}

pub async fn super_admin(store: &dyn Store) -> User {
    let mut user = base_user(UserType::Admin, Some(AdminType::Super));
    user.document_status = DocumentStatus::Verified;
    user.permissions = permissions::canonical_set([permissions::ALL]);
    insert(store, user).await
}

pub async fn admin(store: &dyn Store, perms: &[&str]) -> User {
    let mut user = base_user(UserType::Admin, Some(AdminType::Normal));
    user.document_status = DocumentStatus::Verified;
    user.permissions = permissions::canonical_set(perms);
    insert(store, user).await
}

pub async fn category(store: &dyn Store, active: bool) -> Category {
    let now = Utc::now();
    let id = Uuid::new_v4();
    let category = Category {
        id,
        name: format!("Construction {}", id.simple()),
        description: None,
        is_active: active,
        created_by: None,
        created_at: now,
        updated_at: now,
    };
    store.insert_category(&category).await.unwrap();
    category
}

pub fn tender_request(category_id: Uuid) -> CreateTenderRequest {
    CreateTenderRequest {
        title: "Road resurfacing".into(),
        description: "Resurface 2km of road".into(),
        category_id: Some(category_id),
        location: "Doha".into(),
        contact_email: "tenders@example.com".into(),
        image: None,
        estimated_budget: Some(Decimal::from(25_000)),
        deadline: Some(Utc::now() + Duration::days(14)),
    }
}

/// Active tender posted by a fresh verified individual.
pub async fn active_tender(store: &dyn Store) -> (User, Tender) {
    let poster = individual(store, DocumentStatus::Verified).await;
    let category = category(store, true).await;
    let tender = crate::services::tenders::create_tender(store, &poster, tender_request(category.id))
        .await
        .unwrap();
    (poster, tender)
}

pub fn bid_request(tender_id: Uuid, amount: i64) -> CreateBidRequest {
    CreateBidRequest {
        tender_id,
        amount: Some(Decimal::from(amount)),
        description: "We can deliver within six weeks".into(),
    }
}
