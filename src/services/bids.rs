//! Bid submission and the payment each bid carries

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::tenders::load_tender;
use super::WorkflowConfig;
use crate::auth::{require_all, Requirement};
use crate::domain::{
    Bid, BidCreatedResponse, BidPaymentResponse, BidPaymentStatus, BidStatus, CreateBidRequest,
    PayBidRequest, Payment, PaymentMethod, TenderStatus, User, UserType,
};
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

async fn load_bid(store: &dyn Store, id: Uuid) -> ServiceResult<Bid> {
    store
        .get_bid(id)
        .await?
        .ok_or(ServiceError::NotFound("bid"))
}

pub(crate) fn chosen_method(method: PaymentMethod) -> ServiceResult<PaymentMethod> {
    if method == PaymentMethod::Pending {
        return Err(ServiceError::validation("A payment method is required"));
    }
    Ok(method)
}

/// Place a bid. The bid and its pending submission-fee payment are created
/// together.
pub async fn create_bid(
    store: &dyn Store,
    config: &WorkflowConfig,
    caller: &User,
    req: CreateBidRequest,
) -> ServiceResult<BidCreatedResponse> {
    require_all(
        caller,
        &[
            Requirement::UserType(UserType::Business),
            Requirement::DocumentVerified,
        ],
        None,
    )?;

    let tender = load_tender(store, req.tender_id).await?;
    require_all(caller, &[Requirement::NotOwner], Some(tender.posted_by))?;

    let now = Utc::now();
    if tender.status != TenderStatus::Active {
        return Err(ServiceError::TenderNotActive);
    }
    if tender.deadline < now {
        return Err(ServiceError::DeadlinePassed);
    }

    let amount = req
        .amount
        .ok_or_else(|| ServiceError::validation("Bid amount is required"))?;
    if amount < Decimal::ZERO {
        return Err(ServiceError::validation("Bid amount cannot be negative"));
    }
    if store.find_bid(tender.id, caller.id).await?.is_some() {
        return Err(ServiceError::DuplicateBid);
    }

    let bid_id = Uuid::new_v4();
    let payment = Payment::pending(caller.id, Some(tender.id), Some(bid_id), config.bid_payment_fee);
    let bid = Bid {
        id: bid_id,
        tender_id: tender.id,
        bidder_id: caller.id,
        amount,
        description: req.description.trim().to_string(),
        status: BidStatus::Submitted,
        payment_status: BidPaymentStatus::Pending,
        payment_amount: config.bid_payment_fee,
        payment_id: Some(payment.id),
        created_at: now,
        updated_at: now,
    };
    store.create_bid_with_payment(&bid, &payment).await?;

    tracing::info!(
        bid_id = %bid.id,
        tender_id = %tender.id,
        bidder_id = %caller.id,
        payment_id = %payment.id,
        "Bid created"
    );
    Ok(BidCreatedResponse {
        bid,
        payment_reference: payment.transaction_id,
    })
}

/// Settle the submission fee of the caller's bid.
pub async fn process_bid_payment(
    store: &dyn Store,
    caller: &User,
    bid_id: Uuid,
    req: PayBidRequest,
) -> ServiceResult<BidPaymentResponse> {
    let bid = load_bid(store, bid_id).await?;
    require_all(caller, &[Requirement::Owner], Some(bid.bidder_id))?;

    if bid.payment_status != BidPaymentStatus::Pending {
        return Err(ServiceError::AlreadyProcessed);
    }
    let method = chosen_method(req.payment_method)?;
    let payment_id = bid.payment_id.ok_or(ServiceError::NotFound("payment"))?;

    let payment = store
        .complete_payment(payment_id, method, req.payment_details)
        .await?;
    let bid = load_bid(store, bid_id).await?;

    tracing::info!(bid_id = %bid.id, payment_id = %payment.id, method = %method, "Bid payment processed");
    Ok(BidPaymentResponse { bid, payment })
}

/// Paid bids on a tender, cheapest first. Poster or admin only.
pub async fn list_bids_for_tender(
    store: &dyn Store,
    caller: &User,
    tender_id: Uuid,
) -> ServiceResult<Vec<Bid>> {
    let tender = load_tender(store, tender_id).await?;
    require_all(caller, &[Requirement::OwnerOrAdmin], Some(tender.posted_by))?;
    Ok(store.list_paid_bids_for_tender(tender_id).await?)
}

pub async fn list_my_bids(store: &dyn Store, caller: &User) -> ServiceResult<Vec<Bid>> {
    Ok(store.list_bids_by_bidder(caller.id).await?)
}

pub async fn update_bid_status(
    store: &dyn Store,
    caller: &User,
    bid_id: Uuid,
    status: &str,
) -> ServiceResult<Bid> {
    let status = BidStatus::parse(status.trim()).ok_or_else(|| {
        ServiceError::validation("Status must be one of submitted, under_review, rejected, accepted")
    })?;
    let bid = load_bid(store, bid_id).await?;
    let tender = load_tender(store, bid.tender_id).await?;
    require_all(caller, &[Requirement::OwnerOrAdmin], Some(tender.posted_by))?;

    let bid = store.update_bid_status(bid_id, status).await?;
    tracing::info!(bid_id = %bid.id, status = %status, user_id = %caller.id, "Bid status updated");
    Ok(bid)
}

/// Withdraw a bid while its tender is still active.
pub async fn delete_bid(store: &dyn Store, caller: &User, bid_id: Uuid) -> ServiceResult<()> {
    let bid = load_bid(store, bid_id).await?;
    require_all(caller, &[Requirement::OwnerOrAdmin], Some(bid.bidder_id))?;

    store.delete_bid_if_tender_active(bid_id).await?;
    tracing::info!(bid_id = %bid_id, tender_id = %bid.tender_id, user_id = %caller.id, "Bid deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentStatus, PaymentStatus};
    use crate::services::{tenders, testing};

    fn card() -> PayBidRequest {
        PayBidRequest {
            payment_method: PaymentMethod::CreditCard,
            payment_details: Some(serde_json::json!({ "last4": "4242" })),
        }
    }

    #[tokio::test]
    async fn bid_creates_pending_payment() {
        let store = testing::store();
        let (_, tender) = testing::active_tender(&store).await;
        let bidder = testing::business(&store, DocumentStatus::Verified).await;

        let created = create_bid(&store, &testing::config(), &bidder, testing::bid_request(tender.id, 18_500))
            .await
            .unwrap();
        assert_eq!(created.bid.payment_status, BidPaymentStatus::Pending);
        assert_eq!(created.bid.payment_amount, Decimal::from(100));

        let payment = store
            .get_payment(created.bid.payment_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.bid_id, Some(created.bid.id));
        assert_eq!(payment.transaction_id, created.payment_reference);
    }

    #[tokio::test]
    async fn bidding_gates() {
        let store = testing::store();
        let config = testing::config();
        let (poster, tender) = testing::active_tender(&store).await;

        let individual = testing::individual(&store, DocumentStatus::Verified).await;
        let err = create_bid(&store, &config, &individual, testing::bid_request(tender.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let unverified = testing::business(&store, DocumentStatus::Pending).await;
        let err = create_bid(&store, &config, &unverified, testing::bid_request(tender.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let bidder = testing::business(&store, DocumentStatus::Verified).await;
        create_bid(&store, &config, &bidder, testing::bid_request(tender.id, 1))
            .await
            .unwrap();
        let err = create_bid(&store, &config, &bidder, testing::bid_request(tender.id, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateBid));

        tenders::update_tender_status(&store, &poster, tender.id, TenderStatus::Closed)
            .await
            .unwrap();
        let late = testing::business(&store, DocumentStatus::Verified).await;
        let err = create_bid(&store, &config, &late, testing::bid_request(tender.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TenderNotActive));
    }

    #[tokio::test]
    async fn poster_cannot_bid_on_own_tender() {
        let store = testing::store();
        let poster = testing::business(&store, DocumentStatus::Verified).await;
        let category = testing::category(&store, true).await;
        let tender = tenders::create_tender(&store, &poster, testing::tender_request(category.id))
            .await
            .unwrap();

        let err = create_bid(&store, &testing::config(), &poster, testing::bid_request(tender.id, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn expired_deadline_rejects_bids() {
        let store = testing::store();
        let (_, mut tender) = testing::active_tender(&store).await;
        tender.deadline = Utc::now() - chrono::Duration::minutes(5);
        store.update_tender_fields(&tender).await.unwrap();

        let bidder = testing::business(&store, DocumentStatus::Verified).await;
        let err = create_bid(&store, &testing::config(), &bidder, testing::bid_request(tender.id, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DeadlinePassed));
    }

    #[tokio::test]
    async fn payment_is_processed_once_and_unlocks_listing() {
        let store = testing::store();
        let (poster, tender) = testing::active_tender(&store).await;
        let bidder = testing::business(&store, DocumentStatus::Verified).await;
        let created = create_bid(&store, &testing::config(), &bidder, testing::bid_request(tender.id, 900))
            .await
            .unwrap();

        assert!(list_bids_for_tender(&store, &poster, tender.id).await.unwrap().is_empty());

        let err = process_bid_payment(&store, &poster, created.bid.id, card()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let paid = process_bid_payment(&store, &bidder, created.bid.id, card()).await.unwrap();
        assert_eq!(paid.bid.payment_status, BidPaymentStatus::Paid);
        assert_eq!(paid.payment.status, PaymentStatus::Completed);
        assert_eq!(paid.payment.payment_method, PaymentMethod::CreditCard);

        let err = process_bid_payment(&store, &bidder, created.bid.id, card()).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyProcessed));

        let listed = list_bids_for_tender(&store, &poster, tender.id).await.unwrap();
        assert_eq!(listed.len(), 1);

        let err = list_bids_for_tender(&store, &bidder, tender.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn paid_bids_are_listed_cheapest_first() {
        let store = testing::store();
        let (poster, tender) = testing::active_tender(&store).await;
        for amount in [3_000, 1_000, 2_000] {
            let bidder = testing::business(&store, DocumentStatus::Verified).await;
            let created = create_bid(&store, &testing::config(), &bidder, testing::bid_request(tender.id, amount))
                .await
                .unwrap();
            process_bid_payment(&store, &bidder, created.bid.id, card()).await.unwrap();
        }

        let amounts: Vec<Decimal> = list_bids_for_tender(&store, &poster, tender.id)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.amount)
            .collect();
        assert_eq!(
            amounts,
            vec![Decimal::from(1_000), Decimal::from(2_000), Decimal::from(3_000)]
        );
    }

    #[tokio::test]
    async fn status_update_validates_value_and_caller() {
        let store = testing::store();
        let (poster, tender) = testing::active_tender(&store).await;
        let bidder = testing::business(&store, DocumentStatus::Verified).await;
        let created = create_bid(&store, &testing::config(), &bidder, testing::bid_request(tender.id, 5))
            .await
            .unwrap();

        let err = update_bid_status(&store, &poster, created.bid.id, "won").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = update_bid_status(&store, &bidder, created.bid.id, "accepted")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let bid = update_bid_status(&store, &poster, created.bid.id, "under_review")
            .await
            .unwrap();
        assert_eq!(bid.status, BidStatus::UnderReview);
    }

    #[tokio::test]
    async fn bid_withdrawal_only_while_active() {
        let store = testing::store();
        let (poster, tender) = testing::active_tender(&store).await;
        let first = testing::business(&store, DocumentStatus::Verified).await;
        let second = testing::business(&store, DocumentStatus::Verified).await;
        let a = create_bid(&store, &testing::config(), &first, testing::bid_request(tender.id, 5))
            .await
            .unwrap();
        let b = create_bid(&store, &testing::config(), &second, testing::bid_request(tender.id, 6))
            .await
            .unwrap();

        delete_bid(&store, &first, a.bid.id).await.unwrap();
        let payment = store.get_payment(a.bid.payment_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(payment.bid_id, None);

        tenders::update_tender_status(&store, &poster, tender.id, TenderStatus::Closed)
            .await
            .unwrap();
        let err = delete_bid(&store, &second, b.bid.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::TenderNotActive));
    }
}
