//! Marketplace workflow services
//!
//! Free functions over `&dyn Store`. Each operation checks its caller with
//! `authorize`, validates input and entity state, then performs a single
//! store write. Collaborators (hasher, token issuer, notifier) are passed
//! in explicitly.

use chrono::Duration;
use rust_decimal::Decimal;

pub mod accounts;
pub mod admin;
pub mod bids;
pub mod cache;
pub mod categories;
pub mod mailer;
pub mod notifications;
pub mod payments;
pub mod profiles;
pub mod questions;
pub mod reviews;
pub mod tenders;
pub mod verification;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::RedisCache;
pub use mailer::{EmailSender, LogEmailSender, SmtpEmailSender};
pub use notifications::Notifier;

/// Tunable workflow parameters, read from configuration
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub password_min_length: usize,
    pub bid_payment_fee: Decimal,
    pub tender_posting_fee: Decimal,
    pub verification_token_ttl: Duration,
    pub password_reset_ttl: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            password_min_length: 8,
            bid_payment_fee: Decimal::from(100),
            tender_posting_fee: Decimal::from(50),
            verification_token_ttl: Duration::hours(24),
            password_reset_ttl: Duration::minutes(60),
        }
    }
}

/// Trimmed value, or `None` when blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
