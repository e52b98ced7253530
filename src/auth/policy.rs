//! Capability checks
//!
//! Every service operation calls [`authorize`] at its entry with the
//! requirement it needs and, where relevant, the id of the user owning the
//! resource being touched.

use uuid::Uuid;

use crate::domain::{User, UserType};
use crate::error::ServiceError;

/// What an operation demands of its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement<'a> {
    /// Any authenticated user
    Any,
    /// The resource owner
    Owner,
    /// The resource owner or any admin
    OwnerOrAdmin,
    /// Any admin
    Admin,
    SuperAdmin,
    /// Super admin or an admin holding the named permission
    Permission(&'a str),
    /// A specific account type
    UserType(UserType),
    /// Identity documents approved
    DocumentVerified,
    /// Anyone except the resource owner
    NotOwner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Forbidden(String),
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Turn a denial into a `Forbidden` service error.
    pub fn into_result(self) -> Result<(), ServiceError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Forbidden(reason) => Err(ServiceError::Forbidden(reason)),
        }
    }
}

fn deny(reason: &str) -> Authorization {
    Authorization::Forbidden(reason.to_string())
}

/// Decide whether `user` satisfies `requirement` for a resource owned by
/// `resource_owner`. Owner-based requirements deny when no owner is given.
pub fn authorize(user: &User, requirement: &Requirement<'_>, resource_owner: Option<Uuid>) -> Authorization {
    let is_owner = resource_owner == Some(user.id);
    match requirement {
        Requirement::Any => Authorization::Allowed,
        Requirement::Owner if is_owner => Authorization::Allowed,
        Requirement::Owner => deny("Only the owner may perform this action"),
        Requirement::OwnerOrAdmin if is_owner || user.is_admin() => Authorization::Allowed,
        Requirement::OwnerOrAdmin => deny("Only the owner or an admin may perform this action"),
        Requirement::Admin if user.is_admin() => Authorization::Allowed,
        Requirement::Admin => deny("Admin access required"),
        Requirement::SuperAdmin if user.is_super_admin() => Authorization::Allowed,
        Requirement::SuperAdmin => deny("Super admin access required"),
        Requirement::Permission(name) if user.has_permission(name) => Authorization::Allowed,
        Requirement::Permission(name) => {
            Authorization::Forbidden(format!("Missing permission: {name}"))
        }
        Requirement::UserType(t) if user.user_type == *t => Authorization::Allowed,
        Requirement::UserType(t) => Authorization::Forbidden(format!("Only {t} accounts may perform this action")),
        Requirement::DocumentVerified if user.is_document_verified() => Authorization::Allowed,
        Requirement::DocumentVerified => deny("Documents must be verified first"),
        Requirement::NotOwner if resource_owner.is_some() && !is_owner => Authorization::Allowed,
        Requirement::NotOwner => deny("Not allowed on your own resource"),
    }
}

/// Check every requirement in order, failing on the first denial.
pub fn require_all(
    user: &User,
    requirements: &[Requirement<'_>],
    resource_owner: Option<Uuid>,
) -> Result<(), ServiceError> {
    for requirement in requirements {
        authorize(user, requirement, resource_owner).into_result()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{permissions, AdminType, DocumentStatus};
    use chrono::Utc;

    fn user(user_type: UserType, admin_type: Option<AdminType>, perms: &[&str]) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "someone@example.com".into(),
            password_hash: String::new(),
            user_type,
            admin_type,
            is_verified: true,
            document_status: DocumentStatus::Pending,
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
    fn owner_checks() {
        let owner = user(UserType::Individual, None, &[]);
        let other = user(UserType::Business, None, &[]);
        let admin = user(UserType::Admin, Some(AdminType::Normal), &[]);

        assert!(authorize(&owner, &Requirement::Owner, Some(owner.id)).is_allowed());
        assert!(!authorize(&other, &Requirement::Owner, Some(owner.id)).is_allowed());
        assert!(!authorize(&admin, &Requirement::Owner, Some(owner.id)).is_allowed());
        assert!(authorize(&admin, &Requirement::OwnerOrAdmin, Some(owner.id)).is_allowed());
        assert!(!authorize(&owner, &Requirement::Owner, None).is_allowed());
    }

    #[test]
    fn not_owner_excludes_the_owner() {
        let owner = user(UserType::Individual, None, &[]);
        let other = user(UserType::Business, None, &[]);
        assert!(authorize(&other, &Requirement::NotOwner, Some(owner.id)).is_allowed());
        assert!(!authorize(&owner, &Requirement::NotOwner, Some(owner.id)).is_allowed());
    }

    #[test]
    fn permission_accepts_alias_and_super() {
        let reviewer = user(UserType::Admin, Some(AdminType::Normal), &["document_verification"]);
        let plain = user(UserType::Admin, Some(AdminType::Normal), &[]);
        let root = user(UserType::Admin, Some(AdminType::Super), &[permissions::ALL]);
        let need = Requirement::Permission(permissions::VERIFY_DOCUMENTS);

        assert!(authorize(&reviewer, &need, None).is_allowed());
        assert!(authorize(&root, &need, None).is_allowed());
        assert_eq!(
            authorize(&plain, &need, None),
            Authorization::Forbidden("Missing permission: verify_documents".into())
        );
    }

    #[test]
    fn require_all_stops_at_first_denial() {
        let business = user(UserType::Business, None, &[]);
        let err = require_all(
            &business,
            &[Requirement::UserType(UserType::Business), Requirement::DocumentVerified],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(msg) if msg.contains("verified")));
    }
}
