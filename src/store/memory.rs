//! In-memory store for development and testing
//!
//! All state sits behind one `RwLock`, so every composite write runs in a
//! single critical section and is observed atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::{Guard, Store, StoreError, StoreResult, UniqueKey, UserUpdate};
use crate::domain::{
    AdminTask, Bid, BidPaymentStatus, BidStatus, Category, DocumentStatus, Payment, PaymentMethod,
    PaymentStatus, Profile, Question, RatingSummary, Review, Tender, TenderFilter, TenderStatus,
    User,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
    categories: HashMap<Uuid, Category>,
    tenders: HashMap<Uuid, Tender>,
    bids: HashMap<Uuid, Bid>,
    payments: HashMap<Uuid, Payment>,
    questions: HashMap<Uuid, Question>,
    reviews: HashMap<Uuid, Review>,
    tasks: HashMap<Uuid, AdminTask>,
}

impl State {
    fn email_taken(&self, email: &str, except: Uuid) -> bool {
        self.users.values().any(|u| u.id != except && u.email == email)
    }

    fn profile_for(&self, user_id: Uuid) -> Option<&Profile> {
        self.profiles.values().find(|p| p.user_id == user_id)
    }

    fn category_name_taken(&self, name: &str, except: Uuid) -> bool {
        self.categories
            .values()
            .any(|c| c.id != except && c.name.eq_ignore_ascii_case(name))
    }

    fn upsert_profile(&mut self, profile: &Profile) {
        let mut profile = profile.clone();
        let existing = self
            .profile_for(profile.user_id)
            .map(|p| (p.id, p.rating, p.rating_count));
        if let Some((id, rating, rating_count)) = existing {
            if id != profile.id {
                self.profiles.remove(&id);
            }
            profile.rating = rating;
            profile.rating_count = rating_count;
        }
        self.profiles.insert(profile.id, profile);
    }
}

/// In-memory storage for development and testing
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_account(&self, user: &User, profile: &Profile) -> StoreResult<()> {
        let mut state = self.state.write();
        if state.email_taken(&user.email, user.id) {
            return Err(StoreError::UniqueViolation(UniqueKey::UserEmail));
        }
        if state.profile_for(user.id).is_some() {
            return Err(StoreError::UniqueViolation(UniqueKey::ProfileUser));
        }
        state.users.insert(user.id, user.clone());
        state.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read();
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_verification_token(&self, token: &str) -> StoreResult<Option<User>> {
        let state = self.state.read();
        Ok(state
            .users
            .values()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn update_user(&self, id: Uuid, change: &UserUpdate) -> StoreResult<User> {
        let mut state = self.state.write();
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
        change.apply(user, Utc::now());
        Ok(user.clone())
    }

    async fn list_admins(&self) -> StoreResult<Vec<(User, Option<Profile>)>> {
        let state = self.state.read();
        let mut admins: Vec<_> = state
            .users
            .values()
            .filter(|u| u.is_admin())
            .map(|u| (u.clone(), state.profile_for(u.id).cloned()))
            .collect();
        newest_first(&mut admins, |(u, _)| u.created_at);
        Ok(admins)
    }

    async fn list_pending_verifications(&self) -> StoreResult<Vec<(User, Option<Profile>)>> {
        let state = self.state.read();
        let mut pending: Vec<_> = state
            .users
            .values()
            .filter(|u| !u.is_admin() && u.document_status == DocumentStatus::Pending)
            .map(|u| (u.clone(), state.profile_for(u.id).cloned()))
            .collect();
        pending.sort_by_key(|(u, _)| u.updated_at);
        Ok(pending)
    }

    async fn get_profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.state.read().profile_for(user_id).cloned())
    }

    async fn save_profile(&self, profile: &Profile) -> StoreResult<()> {
        let mut state = self.state.write();
        if !state.users.contains_key(&profile.user_id) {
            return Err(StoreError::NotFound("user"));
        }
        state.upsert_profile(profile);
        Ok(())
    }

    async fn change_email_with_profile(&self, email: &str, profile: &Profile) -> StoreResult<User> {
        let mut state = self.state.write();
        if !state.users.contains_key(&profile.user_id) {
            return Err(StoreError::NotFound("user"));
        }
        if state.email_taken(email, profile.user_id) {
            return Err(StoreError::UniqueViolation(UniqueKey::UserEmail));
        }
        state.upsert_profile(profile);
        let user = state
            .users
            .get_mut(&profile.user_id)
            .ok_or(StoreError::NotFound("user"))?;
        user.email = email.to_string();
        user.updated_at = profile.updated_at;
        Ok(user.clone())
    }

    async fn submit_documents(&self, profile: &Profile) -> StoreResult<User> {
        let mut state = self.state.write();
        match state.users.get(&profile.user_id) {
            None => return Err(StoreError::NotFound("user")),
            Some(u) if u.document_status == DocumentStatus::Verified => {
                return Err(StoreError::Guard(Guard::DocumentsVerified))
            }
            Some(_) => {}
        }
        state.upsert_profile(profile);
        let user = state
            .users
            .get_mut(&profile.user_id)
            .ok_or(StoreError::NotFound("user"))?;
        user.document_status = DocumentStatus::Pending;
        user.document_rejection_reason = None;
        user.updated_at = profile.updated_at;
        Ok(user.clone())
    }

    async fn record_document_decision(
        &self,
        user_id: Uuid,
        status: DocumentStatus,
        rejection_reason: Option<&str>,
        task: &AdminTask,
    ) -> StoreResult<User> {
        let mut state = self.state.write();
        let user = state.users.get_mut(&user_id).ok_or(StoreError::NotFound("user"))?;
        if user.document_status != DocumentStatus::Pending {
            return Err(StoreError::Guard(Guard::NotPendingVerification));
        }
        user.document_status = status;
        user.document_rejection_reason = rejection_reason.map(str::to_string);
        user.updated_at = task.created_at;
        let user = user.clone();
        state.tasks.insert(task.id, task.clone());
        Ok(user)
    }

    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        let mut state = self.state.write();
        if state.category_name_taken(&category.name, category.id) {
            return Err(StoreError::UniqueViolation(UniqueKey::CategoryName));
        }
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.state.read().categories.get(&id).cloned())
    }

    async fn list_categories(&self, active_only: bool) -> StoreResult<Vec<Category>> {
        let state = self.state.read();
        let mut categories: Vec<_> = state
            .categories
            .values()
            .filter(|c| !active_only || c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(categories)
    }

    async fn update_category(&self, category: &Category) -> StoreResult<()> {
        let mut state = self.state.write();
        if !state.categories.contains_key(&category.id) {
            return Err(StoreError::NotFound("category"));
        }
        if state.category_name_taken(&category.name, category.id) {
            return Err(StoreError::UniqueViolation(UniqueKey::CategoryName));
        }
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category_if_unused(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write();
        if !state.categories.contains_key(&id) {
            return Err(StoreError::NotFound("category"));
        }
        if state.tenders.values().any(|t| t.category_id == id) {
            return Err(StoreError::Guard(Guard::CategoryInUse));
        }
        state.categories.remove(&id);
        Ok(())
    }

    async fn insert_tender(&self, tender: &Tender) -> StoreResult<()> {
        let mut state = self.state.write();
        if !state.categories.contains_key(&tender.category_id) {
            return Err(StoreError::NotFound("category"));
        }
        state.tenders.insert(tender.id, tender.clone());
        Ok(())
    }

    async fn get_tender(&self, id: Uuid) -> StoreResult<Option<Tender>> {
        Ok(self.state.read().tenders.get(&id).cloned())
    }

    async fn list_tenders(
        &self,
        filter: &TenderFilter,
        limit: u32,
        offset: u32,
    ) -> StoreResult<(Vec<Tender>, u64)> {
        let state = self.state.read();
        let mut matching: Vec<_> = state
            .tenders
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        newest_first(&mut matching, |t| t.created_at);
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_tender_fields(&self, tender: &Tender) -> StoreResult<Tender> {
        let mut state = self.state.write();
        let stored = state
            .tenders
            .get_mut(&tender.id)
            .ok_or(StoreError::NotFound("tender"))?;
        stored.title = tender.title.clone();
        stored.description = tender.description.clone();
        stored.location = tender.location.clone();
        stored.contact_email = tender.contact_email.clone();
        stored.image = tender.image.clone();
        stored.estimated_budget = tender.estimated_budget;
        stored.deadline = tender.deadline;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn update_tender_status(
        &self,
        id: Uuid,
        from: TenderStatus,
        to: TenderStatus,
    ) -> StoreResult<Tender> {
        let mut state = self.state.write();
        let stored = state.tenders.get_mut(&id).ok_or(StoreError::NotFound("tender"))?;
        if stored.status != from {
            return Err(StoreError::Guard(Guard::TenderStatusChanged));
        }
        stored.status = to;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn award_tender(&self, tender_id: Uuid, bid_id: Uuid) -> StoreResult<Tender> {
        let mut state = self.state.write();
        let tender = state
            .tenders
            .get(&tender_id)
            .ok_or(StoreError::NotFound("tender"))?;
        if tender.status != TenderStatus::Active {
            return Err(StoreError::Guard(Guard::TenderNotActive));
        }
        let winner = state
            .bids
            .get(&bid_id)
            .filter(|b| b.tender_id == tender_id)
            .map(|b| b.bidder_id)
            .ok_or(StoreError::NotFound("bid"))?;

        let now = Utc::now();
        for bid in state.bids.values_mut().filter(|b| b.tender_id == tender_id) {
            bid.status = if bid.id == bid_id {
                BidStatus::Accepted
            } else {
                BidStatus::Rejected
            };
            bid.updated_at = now;
        }
        let tender = state
            .tenders
            .get_mut(&tender_id)
            .ok_or(StoreError::NotFound("tender"))?;
        tender.status = TenderStatus::Awarded;
        tender.awarded_to = Some(winner);
        tender.updated_at = now;
        Ok(tender.clone())
    }

    async fn delete_tender_if_no_bids(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write();
        if !state.tenders.contains_key(&id) {
            return Err(StoreError::NotFound("tender"));
        }
        if state.bids.values().any(|b| b.tender_id == id) {
            return Err(StoreError::Guard(Guard::TenderHasBids));
        }
        state.tenders.remove(&id);
        state.questions.retain(|_, q| q.tender_id != id);
        for payment in state.payments.values_mut() {
            if payment.tender_id == Some(id) {
                payment.tender_id = None;
            }
        }
        Ok(())
    }

    async fn create_bid_with_payment(&self, bid: &Bid, payment: &Payment) -> StoreResult<()> {
        let mut state = self.state.write();
        let tender = state
            .tenders
            .get(&bid.tender_id)
            .ok_or(StoreError::NotFound("tender"))?;
        if tender.status != TenderStatus::Active {
            return Err(StoreError::Guard(Guard::TenderNotActive));
        }
        if state
            .bids
            .values()
            .any(|b| b.tender_id == bid.tender_id && b.bidder_id == bid.bidder_id)
        {
            return Err(StoreError::UniqueViolation(UniqueKey::BidPerTender));
        }
        if state
            .payments
            .values()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(StoreError::UniqueViolation(UniqueKey::TransactionId));
        }
        state.bids.insert(bid.id, bid.clone());
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get_bid(&self, id: Uuid) -> StoreResult<Option<Bid>> {
        Ok(self.state.read().bids.get(&id).cloned())
    }

    async fn find_bid(&self, tender_id: Uuid, bidder_id: Uuid) -> StoreResult<Option<Bid>> {
        let state = self.state.read();
        Ok(state
            .bids
            .values()
            .find(|b| b.tender_id == tender_id && b.bidder_id == bidder_id)
            .cloned())
    }

    async fn list_paid_bids_for_tender(&self, tender_id: Uuid) -> StoreResult<Vec<Bid>> {
        let state = self.state.read();
        let mut bids: Vec<_> = state
            .bids
            .values()
            .filter(|b| b.tender_id == tender_id && b.payment_status == BidPaymentStatus::Paid)
            .cloned()
            .collect();
        bids.sort_by(|a, b| a.amount.cmp(&b.amount).then(a.created_at.cmp(&b.created_at)));
        Ok(bids)
    }

    async fn list_bids_by_bidder(&self, bidder_id: Uuid) -> StoreResult<Vec<Bid>> {
        let state = self.state.read();
        let mut bids: Vec<_> = state
            .bids
            .values()
            .filter(|b| b.bidder_id == bidder_id)
            .cloned()
            .collect();
        newest_first(&mut bids, |b| b.created_at);
        Ok(bids)
    }

    async fn update_bid_status(&self, id: Uuid, status: BidStatus) -> StoreResult<Bid> {
        let mut state = self.state.write();
        let bid = state.bids.get_mut(&id).ok_or(StoreError::NotFound("bid"))?;
        bid.status = status;
        bid.updated_at = Utc::now();
        Ok(bid.clone())
    }

    async fn delete_bid_if_tender_active(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write();
        let tender_id = state
            .bids
            .get(&id)
            .map(|b| b.tender_id)
            .ok_or(StoreError::NotFound("bid"))?;
        let active = state
            .tenders
            .get(&tender_id)
            .is_some_and(|t| t.status == TenderStatus::Active);
        if !active {
            return Err(StoreError::Guard(Guard::TenderNotActive));
        }
        state.bids.remove(&id);
        for payment in state.payments.values_mut() {
            if payment.bid_id == Some(id) {
                payment.bid_id = None;
            }
        }
        Ok(())
    }

    async fn insert_payment(&self, payment: &Payment) -> StoreResult<()> {
        let mut state = self.state.write();
        if state
            .payments
            .values()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(StoreError::UniqueViolation(UniqueKey::TransactionId));
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.state.read().payments.get(&id).cloned())
    }

    async fn list_payments_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Payment>> {
        let state = self.state.read();
        let mut payments: Vec<_> = state
            .payments
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut payments, |p| p.created_at);
        Ok(payments)
    }

    async fn complete_payment(
        &self,
        id: Uuid,
        method: PaymentMethod,
        details: Option<serde_json::Value>,
    ) -> StoreResult<Payment> {
        let mut state = self.state.write();
        let now = Utc::now();
        let payment = state
            .payments
            .get_mut(&id)
            .ok_or(StoreError::NotFound("payment"))?;
        if payment.status != PaymentStatus::Pending {
            return Err(StoreError::Guard(Guard::PaymentNotPending));
        }
        payment.status = PaymentStatus::Completed;
        payment.payment_method = method;
        payment.payment_details = details;
        payment.updated_at = now;
        let payment = payment.clone();

        if let Some(bid) = payment.bid_id.and_then(|bid_id| state.bids.get_mut(&bid_id)) {
            bid.payment_status = BidPaymentStatus::Paid;
            bid.updated_at = now;
        }
        Ok(payment)
    }

    async fn insert_question(&self, question: &Question) -> StoreResult<()> {
        let mut state = self.state.write();
        if !state.tenders.contains_key(&question.tender_id) {
            return Err(StoreError::NotFound("tender"));
        }
        state.questions.insert(question.id, question.clone());
        Ok(())
    }

    async fn get_question(&self, id: Uuid) -> StoreResult<Option<Question>> {
        Ok(self.state.read().questions.get(&id).cloned())
    }

    async fn list_questions_for_tender(&self, tender_id: Uuid) -> StoreResult<Vec<Question>> {
        let state = self.state.read();
        let mut questions: Vec<_> = state
            .questions
            .values()
            .filter(|q| q.tender_id == tender_id)
            .cloned()
            .collect();
        newest_first(&mut questions, |q| q.created_at);
        Ok(questions)
    }

    async fn list_questions_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Question>> {
        let state = self.state.read();
        let mut questions: Vec<_> = state
            .questions
            .values()
            .filter(|q| q.asked_by == user_id)
            .cloned()
            .collect();
        newest_first(&mut questions, |q| q.created_at);
        Ok(questions)
    }

    async fn answer_question(
        &self,
        id: Uuid,
        answer: &str,
        answered_by: Uuid,
        answered_at: DateTime<Utc>,
    ) -> StoreResult<Question> {
        let mut state = self.state.write();
        let question = state
            .questions
            .get_mut(&id)
            .ok_or(StoreError::NotFound("question"))?;
        if question.is_answered() {
            return Err(StoreError::Guard(Guard::QuestionAnswered));
        }
        question.answer = Some(answer.to_string());
        question.answered_by = Some(answered_by);
        question.answered_at = Some(answered_at);
        question.updated_at = answered_at;
        Ok(question.clone())
    }

    async fn insert_review_and_recompute(&self, review: &Review) -> StoreResult<RatingSummary> {
        let mut state = self.state.write();
        if state
            .reviews
            .values()
            .any(|r| r.tender_id == review.tender_id && r.reviewer_id == review.reviewer_id)
        {
            return Err(StoreError::UniqueViolation(UniqueKey::ReviewPerTender));
        }
        let profile_id = state
            .profile_for(review.reviewed_user_id)
            .map(|p| p.id)
            .ok_or(StoreError::NotFound("profile"))?;
        state.reviews.insert(review.id, review.clone());

        let ratings: Vec<i32> = state
            .reviews
            .values()
            .filter(|r| r.reviewed_user_id == review.reviewed_user_id)
            .map(|r| r.rating)
            .collect();
        let summary = RatingSummary::from_ratings(&ratings);
        if let Some(profile) = state.profiles.get_mut(&profile_id) {
            profile.rating = summary.rating;
            profile.rating_count = summary.rating_count;
            profile.updated_at = Utc::now();
        }
        Ok(summary)
    }

    async fn list_reviews_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Review>> {
        let state = self.state.read();
        let mut reviews: Vec<_> = state
            .reviews
            .values()
            .filter(|r| r.reviewed_user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut reviews, |r| r.created_at);
        Ok(reviews)
    }

    async fn insert_task(&self, task: &AdminTask) -> StoreResult<()> {
        self.state.write().tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<AdminTask>> {
        Ok(self.state.read().tasks.get(&id).cloned())
    }

    async fn list_tasks_for_assignee(&self, admin_id: Uuid) -> StoreResult<Vec<AdminTask>> {
        let state = self.state.read();
        let mut tasks: Vec<_> = state
            .tasks
            .values()
            .filter(|t| t.assigned_to == admin_id)
            .cloned()
            .collect();
        newest_first(&mut tasks, |t| t.created_at);
        Ok(tasks)
    }

    async fn update_task(&self, task: &AdminTask) -> StoreResult<()> {
        let mut state = self.state.write();
        if !state.tasks.contains_key(&task.id) {
            return Err(StoreError::NotFound("task"));
        }
        state.tasks.insert(task.id, task.clone());
        Ok(())
    }
}
