//! Payment domain types
//!
//! Payments are simulated: processing a pending payment records the method
//! and details and marks it completed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
});

/// Payment method; `pending` until the payer chooses one
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    BankTransfer,
    Wallet,
    Pending,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        Self::Pending
    }
}

text_enum!(PaymentMethod {
    CreditCard => "credit_card",
    BankTransfer => "bank_transfer",
    Wallet => "wallet",
    Pending => "pending",
});

/// Payment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tender_id: Option<Uuid>,
    pub bid_id: Option<Uuid>,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub payment_details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// A new pending payment with a fresh transaction reference.
    pub fn pending(
        user_id: Uuid,
        tender_id: Option<Uuid>,
        bid_id: Option<Uuid>,
        amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            tender_id,
            bid_id,
            amount,
            payment_method: PaymentMethod::Pending,
            transaction_id: Uuid::new_v4().to_string(),
            status: PaymentStatus::Pending,
            payment_details: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request DTO for settling a bid's payment
#[derive(Debug, Clone, Deserialize)]
pub struct PayBidRequest {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_details: Option<serde_json::Value>,
}

/// Request DTO for settling any payment by id
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessPaymentRequest {
    pub payment_id: Uuid,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_details: Option<serde_json::Value>,
}
