//! Tender domain types
//!
//! `TenderStatus::allowed_transitions` is the single source of truth for the
//! tender state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tender status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TenderStatus {
    Active,
    Awarded,
    Closed,
    Rejected,
    Completed,
}

impl Default for TenderStatus {
    fn default() -> Self {
        Self::Active
    }
}

text_enum!(TenderStatus {
    Active => "active",
    Awarded => "awarded",
    Closed => "closed",
    Rejected => "rejected",
    Completed => "completed",
});

impl TenderStatus {
    /// States reachable in one step from `self`.
    pub fn allowed_transitions(&self) -> &'static [TenderStatus] {
        match self {
            Self::Active => &[Self::Awarded, Self::Closed, Self::Rejected],
            Self::Awarded => &[Self::Completed],
            Self::Closed | Self::Rejected | Self::Completed => &[],
        }
    }

    pub fn can_transition_to(&self, next: TenderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// Tender entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tender {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub location: String,
    pub contact_email: String,
    pub image: Option<String>,
    pub estimated_budget: Decimal,
    pub deadline: DateTime<Utc>,
    pub posted_by: Uuid,
    pub status: TenderStatus,
    pub awarded_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tender {
    pub fn is_open_for_bids(&self, now: DateTime<Utc>) -> bool {
        self.status == TenderStatus::Active && self.deadline >= now
    }
}

/// Request DTO for creating a tender
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenderRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub image: Option<String>,
    pub estimated_budget: Option<Decimal>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Request DTO for updating a tender
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTenderRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub estimated_budget: Option<Decimal>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// Request DTO for a status change
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTenderStatusRequest {
    pub status: TenderStatus,
}

/// Request DTO for awarding a tender
#[derive(Debug, Clone, Deserialize)]
pub struct AwardTenderRequest {
    pub bid_id: Uuid,
}

/// Query filters for the public tender listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenderFilter {
    #[serde(default)]
    pub status: Option<TenderStatus>,
    #[serde(default)]
    pub category: Option<Uuid>,
    #[serde(default)]
    pub search: Option<String>,
}

impl TenderFilter {
    /// Case-insensitive match of `search` against title, description and location.
    pub fn matches(&self, tender: &Tender) -> bool {
        if let Some(status) = self.status {
            if tender.status != status {
                return false;
            }
        }
        if let Some(category) = self.category {
            if tender.category_id != category {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [&tender.title, &tender.description, &tender.location]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use TenderStatus::*;
        let all = [Active, Awarded, Closed, Rejected, Completed];
        let allowed = [
            (Active, Awarded),
            (Active, Closed),
            (Active, Rejected),
            (Awarded, Completed),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states() {
        assert!(TenderStatus::Closed.is_terminal());
        assert!(TenderStatus::Rejected.is_terminal());
        assert!(TenderStatus::Completed.is_terminal());
        assert!(!TenderStatus::Awarded.is_terminal());
    }
}
