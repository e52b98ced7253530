//! Post-completion reviews and rating aggregation

use chrono::Utc;
use uuid::Uuid;

use super::non_blank;
use super::tenders::load_tender;
use crate::auth::{require_all, Requirement};
use crate::domain::{CreateReviewRequest, Review, ReviewCreatedResponse, TenderStatus, User};
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

/// The poster of a completed tender reviews the bidder it was awarded to.
/// The reviewed user's rating is recomputed from all of their reviews in the
/// same write.
pub async fn create_review(
    store: &dyn Store,
    caller: &User,
    req: CreateReviewRequest,
) -> ServiceResult<ReviewCreatedResponse> {
    let tender = load_tender(store, req.tender_id).await?;
    require_all(caller, &[Requirement::Owner], Some(tender.posted_by))?;

    if tender.status != TenderStatus::Completed {
        return Err(ServiceError::TenderNotCompleted);
    }
    if tender.awarded_to != Some(req.reviewed_user_id) {
        return Err(ServiceError::validation(
            "Only the awarded bidder can be reviewed for this tender",
        ));
    }
    if !(1..=5).contains(&req.rating) {
        return Err(ServiceError::validation("Rating must be between 1 and 5"));
    }

    let review = Review {
        id: Uuid::new_v4(),
        tender_id: tender.id,
        reviewer_id: caller.id,
        reviewed_user_id: req.reviewed_user_id,
        rating: req.rating,
        comment: non_blank(req.comment.as_deref()),
        created_at: Utc::now(),
    };
    let summary = store.insert_review_and_recompute(&review).await?;

    tracing::info!(
        review_id = %review.id,
        tender_id = %tender.id,
        reviewed_user_id = %review.reviewed_user_id,
        rating = summary.rating,
        rating_count = summary.rating_count,
        "Review created"
    );
    Ok(ReviewCreatedResponse {
        review,
        reviewed_user_rating: summary,
    })
}

pub async fn list_reviews_for_user(store: &dyn Store, user_id: Uuid) -> ServiceResult<Vec<Review>> {
    Ok(store.list_reviews_for_user(user_id).await?)
}

pub async fn list_my_received_reviews(store: &dyn Store, caller: &User) -> ServiceResult<Vec<Review>> {
    Ok(store.list_reviews_for_user(caller.id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentStatus, Tender};
    use crate::services::{bids, tenders, testing};

    /// Tender posted by a fresh user, awarded to `bidder` and completed.
    async fn completed_tender(store: &dyn Store, bidder: &User) -> (User, Tender) {
        let (poster, tender) = testing::active_tender(store).await;
        let created = bids::create_bid(store, &testing::config(), bidder, testing::bid_request(tender.id, 100))
            .await
            .unwrap();
        tenders::award_tender(store, &poster, tender.id, created.bid.id)
            .await
            .unwrap();
        let tender = tenders::update_tender_status(store, &poster, tender.id, TenderStatus::Completed)
            .await
            .unwrap();
        (poster, tender)
    }

    fn review(tender: &Tender, reviewed: Uuid, rating: i32) -> CreateReviewRequest {
        CreateReviewRequest {
            tender_id: tender.id,
            reviewed_user_id: reviewed,
            rating,
            comment: Some("Delivered on time".into()),
        }
    }

    #[tokio::test]
    async fn rating_is_the_mean_of_all_reviews() {
        let store = testing::store();
        let bidder = testing::business(&store, DocumentStatus::Verified).await;

        let (first_poster, first) = completed_tender(&store, &bidder).await;
        let created = create_review(&store, &first_poster, review(&first, bidder.id, 5))
            .await
            .unwrap();
        assert_eq!(created.reviewed_user_rating.rating, 5.0);
        assert_eq!(created.reviewed_user_rating.rating_count, 1);

        let (second_poster, second) = completed_tender(&store, &bidder).await;
        let created = create_review(&store, &second_poster, review(&second, bidder.id, 2))
            .await
            .unwrap();
        assert_eq!(created.reviewed_user_rating.rating, 3.5);
        assert_eq!(created.reviewed_user_rating.rating_count, 2);

        let profile = store.get_profile_by_user(bidder.id).await.unwrap().unwrap();
        assert_eq!(profile.rating, 3.5);
        assert_eq!(profile.rating_count, 2);
        assert_eq!(list_reviews_for_user(&store, bidder.id).await.unwrap().len(), 2);
        assert_eq!(list_my_received_reviews(&store, &bidder).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn second_review_of_same_tender_is_duplicate() {
        let store = testing::store();
        let bidder = testing::business(&store, DocumentStatus::Verified).await;
        let (poster, tender) = completed_tender(&store, &bidder).await;

        create_review(&store, &poster, review(&tender, bidder.id, 4)).await.unwrap();
        let err = create_review(&store, &poster, review(&tender, bidder.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateReview));
    }

    #[tokio::test]
    async fn review_preconditions() {
        let store = testing::store();
        let bidder = testing::business(&store, DocumentStatus::Verified).await;
        let (poster, tender) = completed_tender(&store, &bidder).await;
        let stranger = testing::individual(&store, DocumentStatus::Verified).await;

        let err = create_review(&store, &bidder, review(&tender, bidder.id, 4)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = create_review(&store, &poster, review(&tender, stranger.id, 4)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        for rating in [0, 6] {
            let err = create_review(&store, &poster, review(&tender, bidder.id, rating))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "rating {rating}");
        }

        let (active_poster, active) = testing::active_tender(&store).await;
        let err = create_review(&store, &active_poster, review(&active, bidder.id, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TenderNotCompleted));
    }
}
