//! User account types
//!
//! The account row carries credentials and verification state; it is never
//! serialized directly. `UserResponse` is the public view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Account type, fixed at registration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Individual,
    Business,
    Admin,
}

impl Default for UserType {
    fn default() -> Self {
        Self::Individual
    }
}

text_enum!(UserType {
    Individual => "individual",
    Business => "business",
    Admin => "admin",
});

/// Admin tier; present iff the user is an admin
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AdminType {
    Super,
    Normal,
}

text_enum!(AdminType {
    Super => "super",
    Normal => "normal",
});

/// Identity document review state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Verified,
    Rejected,
}

impl Default for DocumentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

text_enum!(DocumentStatus {
    Pending => "pending",
    Verified => "verified",
    Rejected => "rejected",
});

/// Permission names grantable to normal admins.
pub mod permissions {
    /// Wildcard held by super admins.
    pub const ALL: &str = "all";
    pub const VERIFY_DOCUMENTS: &str = "verify_documents";

    /// Older clients send this name for the same capability.
    const VERIFY_DOCUMENTS_ALIAS: &str = "document_verification";

    /// Canonical spelling of a permission name.
    pub fn canonical(name: &str) -> String {
        let name = name.trim().to_lowercase();
        if name == VERIFY_DOCUMENTS_ALIAS {
            VERIFY_DOCUMENTS.to_string()
        } else {
            name
        }
    }

    pub fn canonical_set<I, S>(names: I) -> std::collections::BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|n| canonical(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect()
    }
}

/// User account entity
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub admin_type: Option<AdminType>,
    pub is_verified: bool,
    pub document_status: DocumentStatus,
    pub document_rejection_reason: Option<String>,
    pub permissions: BTreeSet<String>,
    pub verification_token: Option<String>,
    pub verification_token_expires: Option<DateTime<Utc>>,
    pub reset_code_hash: Option<String>,
    pub reset_code_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }

    pub fn is_super_admin(&self) -> bool {
        self.is_admin() && self.admin_type == Some(AdminType::Super)
    }

    pub fn is_document_verified(&self) -> bool {
        self.document_status == DocumentStatus::Verified
    }

    /// Super admins hold every permission; normal admins need the name or
    /// the `all` wildcard. Non-admins hold none.
    pub fn has_permission(&self, name: &str) -> bool {
        if !self.is_admin() {
            return false;
        }
        if self.is_super_admin() {
            return true;
        }
        let name = permissions::canonical(name);
        self.permissions.contains(permissions::ALL) || self.permissions.contains(&name)
    }
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub admin_type: Option<AdminType>,
    pub is_verified: bool,
    pub document_status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_rejection_reason: Option<String>,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            user_type: u.user_type,
            admin_type: u.admin_type,
            is_verified: u.is_verified,
            document_status: u.document_status,
            document_rejection_reason: u.document_rejection_reason.clone(),
            permissions: u.permissions.iter().cloned().collect(),
            created_at: u.created_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self::from(&u)
    }
}

/// Short reference embedded in listings (poster, bidder, reviewer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            user_type: u.user_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin(admin_type: AdminType, perms: &[&str]) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "ops@example.com".into(),
            password_hash: String::new(),
            user_type: UserType::Admin,
            admin_type: Some(admin_type),
            is_verified: true,
            document_status: DocumentStatus::Verified,
            document_rejection_reason: None,
            permissions: permissions::canonical_set(perms),
            verification_token: None,
            verification_token_expires: None,
            reset_code_hash: None,
            reset_code_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn alias_permission_is_canonicalized() {
        let user = admin(AdminType::Normal, &["document_verification"]);
        assert!(user.permissions.contains(permissions::VERIFY_DOCUMENTS));
        assert!(user.has_permission("verify_documents"));
        assert!(user.has_permission("document_verification"));
    }

    #[test]
    fn super_admin_holds_everything() {
        let user = admin(AdminType::Super, &[]);
        assert!(user.has_permission(permissions::VERIFY_DOCUMENTS));
        assert!(user.has_permission("content_moderation"));
    }

    #[test]
    fn normal_admin_without_grant_is_denied() {
        let user = admin(AdminType::Normal, &["user_support"]);
        assert!(!user.has_permission(permissions::VERIFY_DOCUMENTS));
    }

    #[test]
    fn text_round_trip() {
        for status in [DocumentStatus::Pending, DocumentStatus::Verified, DocumentStatus::Rejected] {
            assert_eq!(DocumentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(UserType::parse("vendor"), None);
    }
}
