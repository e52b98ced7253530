//! Tender lifecycle
//!
//! Status changes go through `TenderStatus::allowed_transitions` and are
//! written compare-and-set on the status the caller observed, so a racing
//! change surfaces as `ConcurrentUpdate` instead of being overwritten.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{non_blank, WorkflowConfig};
use crate::auth::{require_all, Requirement};
use crate::domain::{
    is_valid_email, CreateTenderRequest, Payment, Tender, TenderFilter, TenderStatus,
    UpdateTenderRequest, User,
};
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

fn required(field: &str, value: &str) -> ServiceResult<String> {
    non_blank(Some(value)).ok_or_else(|| ServiceError::validation(format!("{field} is required")))
}

fn positive_budget(budget: Decimal) -> ServiceResult<Decimal> {
    if budget <= Decimal::ZERO {
        return Err(ServiceError::validation("Estimated budget must be greater than zero"));
    }
    Ok(budget)
}

fn contact_email(value: &str) -> ServiceResult<String> {
    let email = value.trim();
    if !is_valid_email(email) {
        return Err(ServiceError::validation("A valid contact email is required"));
    }
    Ok(email.to_string())
}

pub(crate) async fn load_tender(store: &dyn Store, id: Uuid) -> ServiceResult<Tender> {
    store
        .get_tender(id)
        .await?
        .ok_or(ServiceError::NotFound("tender"))
}

pub async fn create_tender(
    store: &dyn Store,
    caller: &User,
    req: CreateTenderRequest,
) -> ServiceResult<Tender> {
    require_all(caller, &[Requirement::DocumentVerified], None)?;

    let title = required("Title", &req.title)?;
    let description = required("Description", &req.description)?;
    let location = required("Location", &req.location)?;
    let contact_email = contact_email(&req.contact_email)?;
    let category_id = req
        .category_id
        .ok_or_else(|| ServiceError::validation("Category is required"))?;
    let estimated_budget = positive_budget(
        req.estimated_budget
            .ok_or_else(|| ServiceError::validation("Estimated budget is required"))?,
    )?;
    let deadline = req
        .deadline
        .ok_or_else(|| ServiceError::validation("Deadline is required"))?;

    let now = Utc::now();
    if deadline <= now {
        return Err(ServiceError::validation("Deadline must be in the future"));
    }

    let category = store
        .get_category(category_id)
        .await?
        .ok_or(ServiceError::NotFound("category"))?;
    if !category.is_active {
        return Err(ServiceError::validation("Category is not active"));
    }

    let tender = Tender {
        id: Uuid::new_v4(),
        title,
        description,
        category_id,
        location,
        contact_email,
        image: non_blank(req.image.as_deref()),
        estimated_budget,
        deadline,
        posted_by: caller.id,
        status: TenderStatus::Active,
        awarded_to: None,
        created_at: now,
        updated_at: now,
    };
    store.insert_tender(&tender).await?;

    tracing::info!(tender_id = %tender.id, posted_by = %caller.id, "Tender created");
    Ok(tender)
}

/// Newest first, with the total number of matches.
pub async fn list_tenders(
    store: &dyn Store,
    filter: &TenderFilter,
    limit: u32,
    offset: u32,
) -> ServiceResult<(Vec<Tender>, u64)> {
    Ok(store.list_tenders(filter, limit, offset).await?)
}

pub async fn get_tender(store: &dyn Store, id: Uuid) -> ServiceResult<Tender> {
    load_tender(store, id).await
}

pub async fn update_tender(
    store: &dyn Store,
    caller: &User,
    id: Uuid,
    req: UpdateTenderRequest,
) -> ServiceResult<Tender> {
    let mut tender = load_tender(store, id).await?;
    require_all(caller, &[Requirement::OwnerOrAdmin], Some(tender.posted_by))?;

    if let Some(title) = non_blank(req.title.as_deref()) {
        tender.title = title;
    }
    if let Some(description) = non_blank(req.description.as_deref()) {
        tender.description = description;
    }
    if let Some(location) = non_blank(req.location.as_deref()) {
        tender.location = location;
    }
    if let Some(email) = non_blank(req.contact_email.as_deref()) {
        tender.contact_email = contact_email(&email)?;
    }
    if let Some(image) = non_blank(req.image.as_deref()) {
        tender.image = Some(image);
    }
    if let Some(budget) = req.estimated_budget {
        tender.estimated_budget = positive_budget(budget)?;
    }
    if let Some(deadline) = req.deadline {
        if deadline <= Utc::now() {
            return Err(ServiceError::validation("Deadline must be in the future"));
        }
        tender.deadline = deadline;
    }

    let tender = store.update_tender_fields(&tender).await?;
    tracing::info!(tender_id = %tender.id, user_id = %caller.id, "Tender updated");
    Ok(tender)
}

pub async fn update_tender_status(
    store: &dyn Store,
    caller: &User,
    id: Uuid,
    next: TenderStatus,
) -> ServiceResult<Tender> {
    let tender = load_tender(store, id).await?;
    require_all(caller, &[Requirement::OwnerOrAdmin], Some(tender.posted_by))?;

    if !tender.status.can_transition_to(next) {
        return Err(ServiceError::InvalidTransition {
            from: tender.status,
            to: next,
        });
    }
    let updated = store.update_tender_status(id, tender.status, next).await?;

    tracing::info!(
        tender_id = %id,
        from = %tender.status,
        to = %next,
        user_id = %caller.id,
        "Tender status changed"
    );
    Ok(updated)
}

/// Award the tender to one of its bids. The chosen bid is accepted and every
/// other bid rejected in the same write.
pub async fn award_tender(
    store: &dyn Store,
    caller: &User,
    id: Uuid,
    bid_id: Uuid,
) -> ServiceResult<Tender> {
    let tender = load_tender(store, id).await?;
    require_all(caller, &[Requirement::Owner], Some(tender.posted_by))?;

    if tender.status != TenderStatus::Active {
        return Err(ServiceError::TenderNotActive);
    }
    store
        .get_bid(bid_id)
        .await?
        .filter(|b| b.tender_id == id)
        .ok_or(ServiceError::NotFound("bid"))?;

    let awarded = store.award_tender(id, bid_id).await?;
    tracing::info!(
        tender_id = %id,
        bid_id = %bid_id,
        awarded_to = ?awarded.awarded_to,
        "Tender awarded"
    );
    Ok(awarded)
}

pub async fn delete_tender(store: &dyn Store, caller: &User, id: Uuid) -> ServiceResult<()> {
    let tender = load_tender(store, id).await?;
    require_all(caller, &[Requirement::OwnerOrAdmin], Some(tender.posted_by))?;

    store.delete_tender_if_no_bids(id).await?;
    tracing::info!(tender_id = %id, user_id = %caller.id, "Tender deleted");
    Ok(())
}

/// Open a pending posting-fee payment for the poster. Nothing depends on it
/// being settled.
pub async fn request_posting_fee(
    store: &dyn Store,
    config: &WorkflowConfig,
    caller: &User,
    id: Uuid,
) -> ServiceResult<Payment> {
    let tender = load_tender(store, id).await?;
    require_all(caller, &[Requirement::Owner], Some(tender.posted_by))?;

    let payment = Payment::pending(caller.id, Some(tender.id), None, config.tender_posting_fee);
    store.insert_payment(&payment).await?;

    tracing::info!(tender_id = %id, payment_id = %payment.id, "Posting fee requested");
    Ok(payment)
}
