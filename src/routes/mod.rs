pub mod admin;
pub mod auth;
pub mod bids;
pub mod categories;
pub mod health;
pub mod payments;
pub mod profiles;
pub mod questions;
pub mod reviews;
pub mod tenders;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify-email/:token", get(auth::verify_email))
        .route("/auth/resend-verification", post(auth::resend_verification))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/verify-reset-code", post(auth::verify_reset_code))
        .route("/auth/reset-password", put(auth::reset_password))
        .route("/auth/me", get(auth::me))
        // Profiles
        .route(
            "/profiles",
            get(profiles::get_profile)
                .post(profiles::upsert_profile)
                .put(profiles::upsert_profile),
        )
        .route("/profiles/submit-documents", put(profiles::submit_documents))
        .route(
            "/profiles/verification-status",
            get(profiles::verification_status),
        )
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            put(categories::update_category).delete(categories::delete_category),
        )
        // Tenders
        .route(
            "/tenders",
            get(tenders::list_tenders).post(tenders::create_tender),
        )
        .route(
            "/tenders/:id",
            get(tenders::get_tender)
                .put(tenders::update_tender)
                .delete(tenders::delete_tender),
        )
        .route("/tenders/:id/status", put(tenders::update_tender_status))
        .route("/tenders/:id/award", put(tenders::award_tender))
        .route("/tenders/:id/posting-fee", post(tenders::request_posting_fee))
        // Bids
        .route("/bids", post(bids::create_bid))
        .route("/bids/my-bids", get(bids::list_my_bids))
        .route("/bids/tender/:tender_id", get(bids::list_bids_for_tender))
        .route("/bids/:id", axum::routing::delete(bids::delete_bid))
        .route("/bids/:id/process-payment", post(bids::process_bid_payment))
        .route("/bids/:id/status", put(bids::update_bid_status))
        // Questions
        .route("/questions", post(questions::ask_question))
        .route("/questions/my-questions", get(questions::list_my_questions))
        .route(
            "/questions/tender/:tender_id",
            get(questions::list_questions_for_tender),
        )
        .route("/questions/:id/answer", put(questions::answer_question))
        // Reviews
        .route("/reviews", post(reviews::create_review))
        .route("/reviews/my-reviews", get(reviews::list_my_reviews))
        .route("/reviews/user/:user_id", get(reviews::list_reviews_for_user))
        // Payments
        .route("/payments/process", post(payments::process_payment))
        .route("/payments/my-payments", get(payments::list_my_payments))
        .route("/payments/:id", get(payments::get_payment))
        // Admin
        .route("/admin", get(admin::list_admins).post(admin::create_admin))
        .route("/admin/:id/permissions", put(admin::update_permissions))
        .route("/admin/tasks", post(admin::assign_task))
        .route("/admin/tasks/my-tasks", get(admin::list_my_tasks))
        .route("/admin/tasks/:id/status", put(admin::update_task_status))
        .route(
            "/admin/verifications/pending",
            get(admin::pending_verifications),
        )
        .route(
            "/admin/verifications/:user_id/verify",
            put(admin::verify_documents),
        )
        .route(
            "/admin/verifications/:user_id/reject",
            put(admin::reject_documents),
        )
}
