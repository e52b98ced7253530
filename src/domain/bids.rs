use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bid status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Submitted,
    UnderReview,
    Rejected,
    Accepted,
}

impl Default for BidStatus {
    fn default() -> Self {
        Self::Submitted
    }
}

text_enum!(BidStatus {
    Submitted => "submitted",
    UnderReview => "under_review",
    Rejected => "rejected",
    Accepted => "accepted",
});

/// Payment state of the bid's submission fee
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BidPaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl Default for BidPaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

text_enum!(BidPaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
});

/// Bid entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub bidder_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub status: BidStatus,
    pub payment_status: BidPaymentStatus,
    pub payment_amount: Decimal,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a bid
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBidRequest {
    pub tender_id: Uuid,
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: String,
}

/// Request DTO for a bid status change
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBidStatusRequest {
    pub status: String,
}

/// Response DTO for a freshly created bid, with the payment to settle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidCreatedResponse {
    #[serde(flatten)]
    pub bid: Bid,
    pub payment_reference: String,
}

/// Response DTO for a settled bid payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidPaymentResponse {
    pub bid: Bid,
    pub payment: crate::domain::Payment,
}
