//! Profile domain types
//!
//! One profile per user. The per-type attributes live in `ProfileDetails`,
//! a tagged union keyed by the account's user type, so an individual can
//! never carry business registration fields and vice versa.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::users::{DocumentStatus, UserType};

/// Attributes of an individual account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndividualDetails {
    pub full_name: String,
    pub national_id: Option<String>,
    pub national_id_front: Option<String>,
    pub national_id_back: Option<String>,
    pub personal_email: Option<String>,
}

/// Attributes of a business account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessDetails {
    pub company_name: String,
    pub company_email: Option<String>,
    pub contact_person_name: Option<String>,
    pub commercial_registration_number: Option<String>,
    pub commercial_registration_doc: Option<String>,
}

/// Attributes of an admin account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminDetails {
    pub admin_name: Option<String>,
    pub admin_position: Option<String>,
}

/// Per-user-type profile attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "user_type", rename_all = "snake_case")]
pub enum ProfileDetails {
    Individual(IndividualDetails),
    Business(BusinessDetails),
    Admin(AdminDetails),
}

impl ProfileDetails {
    pub fn user_type(&self) -> UserType {
        match self {
            Self::Individual(_) => UserType::Individual,
            Self::Business(_) => UserType::Business,
            Self::Admin(_) => UserType::Admin,
        }
    }

    /// Identity documents currently on file.
    pub fn documents(&self) -> DocumentSet {
        match self {
            Self::Individual(d) => DocumentSet {
                national_id: d.national_id.clone(),
                national_id_front: d.national_id_front.clone(),
                national_id_back: d.national_id_back.clone(),
                ..Default::default()
            },
            Self::Business(d) => DocumentSet {
                commercial_registration_number: d.commercial_registration_number.clone(),
                commercial_registration_doc: d.commercial_registration_doc.clone(),
                ..Default::default()
            },
            Self::Admin(_) => DocumentSet::default(),
        }
    }

    /// Contact email shown on the profile; mirrors the login email.
    pub fn set_contact_email(&mut self, email: &str) {
        match self {
            Self::Individual(d) => d.personal_email = Some(email.to_string()),
            Self::Business(d) => d.company_email = Some(email.to_string()),
            Self::Admin(_) => {}
        }
    }
}

/// User profile entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub phone: String,
    pub address: Option<String>,
    pub rating: f64,
    pub rating_count: i32,
    #[serde(flatten)]
    pub details: ProfileDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: Uuid, phone: String, details: ProfileDetails) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            phone,
            address: None,
            rating: 0.0,
            rating_count: 0,
            details,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Identity document fields, flattened for review screens
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSet {
    pub national_id: Option<String>,
    pub national_id_front: Option<String>,
    pub national_id_back: Option<String>,
    pub commercial_registration_number: Option<String>,
    pub commercial_registration_doc: Option<String>,
}

impl DocumentSet {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Request DTO for creating or updating a profile.
///
/// Fields belonging to another user type are rejected, not ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Contact email; also becomes the login email
    #[serde(default)]
    pub email: Option<String>,

    // Individual
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub national_id_front: Option<String>,
    #[serde(default)]
    pub national_id_back: Option<String>,

    // Business
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub contact_person_name: Option<String>,
    #[serde(default)]
    pub commercial_registration_number: Option<String>,
    #[serde(default)]
    pub commercial_registration_doc: Option<String>,

    // Admin
    #[serde(default)]
    pub admin_name: Option<String>,
    #[serde(default)]
    pub admin_position: Option<String>,
}

/// Request DTO for submitting identity documents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitDocumentsRequest {
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub national_id_front: Option<String>,
    #[serde(default)]
    pub national_id_back: Option<String>,
    #[serde(default)]
    pub commercial_registration_number: Option<String>,
    #[serde(default)]
    pub commercial_registration_doc: Option<String>,
}

/// Documents required for review, by account type
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSubmission {
    Individual {
        national_id: String,
        national_id_front: String,
        national_id_back: String,
    },
    Business {
        commercial_registration_number: String,
        commercial_registration_doc: String,
    },
}

/// Response DTO for the verification status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct VerificationStatusResponse {
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub documents: DocumentSet,
}
