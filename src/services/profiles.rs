//! Profile reads and updates

use chrono::Utc;
use url::Url;

use super::accounts::checked_email;
use super::non_blank;
use crate::domain::{
    AdminDetails, BusinessDetails, IndividualDetails, Profile, ProfileDetails, ProfilePatch, User,
    UserType,
};
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

const DOCUMENT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "pdf", "webp"];

/// Trimmed document URL, or `InvalidDocumentUrl` naming `field`.
pub(crate) fn document_url(field: &'static str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    let url = Url::parse(value).map_err(|_| ServiceError::InvalidDocumentUrl(field))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ServiceError::InvalidDocumentUrl(field));
    }
    let extension = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension {
        Some(ext) if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) => Ok(value.to_string()),
        _ => Err(ServiceError::InvalidDocumentUrl(field)),
    }
}

fn optional_document(field: &'static str, value: Option<&str>) -> ServiceResult<Option<String>> {
    non_blank(value).map(|v| document_url(field, &v)).transpose()
}

fn reject_foreign(user_type: UserType, fields: &[(&str, bool)]) -> ServiceResult<()> {
    if let Some((name, _)) = fields.iter().find(|(_, present)| *present) {
        return Err(ServiceError::validation(format!(
            "Field '{name}' does not apply to {user_type} profiles"
        )));
    }
    Ok(())
}

/// Fail if the patch carries fields that belong to another user type.
fn check_patch_fields(user_type: UserType, patch: &ProfilePatch) -> ServiceResult<()> {
    let individual = [
        ("full_name", patch.full_name.is_some()),
        ("national_id", patch.national_id.is_some()),
        ("national_id_front", patch.national_id_front.is_some()),
        ("national_id_back", patch.national_id_back.is_some()),
    ];
    let business = [
        ("company_name", patch.company_name.is_some()),
        ("contact_person_name", patch.contact_person_name.is_some()),
        (
            "commercial_registration_number",
            patch.commercial_registration_number.is_some(),
        ),
        (
            "commercial_registration_doc",
            patch.commercial_registration_doc.is_some(),
        ),
    ];
    let admin = [
        ("admin_name", patch.admin_name.is_some()),
        ("admin_position", patch.admin_position.is_some()),
    ];

    match user_type {
        UserType::Individual => {
            reject_foreign(user_type, &business)?;
            reject_foreign(user_type, &admin)
        }
        UserType::Business => {
            reject_foreign(user_type, &individual)?;
            reject_foreign(user_type, &admin)
        }
        UserType::Admin => {
            reject_foreign(user_type, &individual)?;
            reject_foreign(user_type, &business)
        }
    }
}

fn empty_details(user_type: UserType) -> ProfileDetails {
    match user_type {
        UserType::Individual => ProfileDetails::Individual(IndividualDetails::default()),
        UserType::Business => ProfileDetails::Business(BusinessDetails::default()),
        UserType::Admin => ProfileDetails::Admin(AdminDetails::default()),
    }
}

fn apply_details(details: &mut ProfileDetails, patch: &ProfilePatch) -> ServiceResult<()> {
    match details {
        ProfileDetails::Individual(d) => {
            if let Some(name) = non_blank(patch.full_name.as_deref()) {
                d.full_name = name;
            }
            if let Some(id) = non_blank(patch.national_id.as_deref()) {
                d.national_id = Some(id);
            }
            if let Some(url) = optional_document("national_id_front", patch.national_id_front.as_deref())? {
                d.national_id_front = Some(url);
            }
            if let Some(url) = optional_document("national_id_back", patch.national_id_back.as_deref())? {
                d.national_id_back = Some(url);
            }
            if d.full_name.trim().is_empty() {
                return Err(ServiceError::validation("Full name is required"));
            }
        }
        ProfileDetails::Business(d) => {
            if let Some(name) = non_blank(patch.company_name.as_deref()) {
                d.company_name = name;
            }
            if let Some(contact) = non_blank(patch.contact_person_name.as_deref()) {
                d.contact_person_name = Some(contact);
            }
            if let Some(number) = non_blank(patch.commercial_registration_number.as_deref()) {
                d.commercial_registration_number = Some(number);
            }
            if let Some(url) = optional_document(
                "commercial_registration_doc",
                patch.commercial_registration_doc.as_deref(),
            )? {
                match d.commercial_registration_doc.as_deref() {
                    Some(existing) if existing != url => {
                        return Err(ServiceError::ImmutableField("commercial_registration_doc"))
                    }
                    _ => d.commercial_registration_doc = Some(url),
                }
            }
            if d.company_name.trim().is_empty() {
                return Err(ServiceError::validation("Company name is required"));
            }
        }
        ProfileDetails::Admin(d) => {
            if let Some(name) = non_blank(patch.admin_name.as_deref()) {
                d.admin_name = Some(name);
            }
            if let Some(position) = non_blank(patch.admin_position.as_deref()) {
                d.admin_position = Some(position);
            }
        }
    }
    Ok(())
}

pub async fn get_profile(store: &dyn Store, user: &User) -> ServiceResult<Profile> {
    store
        .get_profile_by_user(user.id)
        .await?
        .ok_or(ServiceError::NotFound("profile"))
}

/// Create or update the caller's profile.
///
/// A changed contact email also becomes the login email; both are written
/// together or not at all.
pub async fn upsert_profile(
    store: &dyn Store,
    user: &User,
    patch: ProfilePatch,
) -> ServiceResult<Profile> {
    check_patch_fields(user.user_type, &patch)?;

    let existing = store.get_profile_by_user(user.id).await?;
    let created = existing.is_none();
    let mut profile = match existing {
        Some(profile) => profile,
        None => {
            let phone = non_blank(patch.phone.as_deref())
                .ok_or_else(|| ServiceError::validation("Phone number is required"))?;
            Profile::new(user.id, phone, empty_details(user.user_type))
        }
    };

    if let Some(phone) = non_blank(patch.phone.as_deref()) {
        profile.phone = phone;
    }
    if let Some(address) = non_blank(patch.address.as_deref()) {
        profile.address = Some(address);
    }
    apply_details(&mut profile.details, &patch)?;

    let new_email = match non_blank(patch.email.as_deref()) {
        Some(email) => Some(checked_email(&email)?),
        None => None,
    };
    profile.updated_at = Utc::now();

    match new_email {
        Some(email) if email != user.email => {
            profile.details.set_contact_email(&email);
            store.change_email_with_profile(&email, &profile).await?;
            tracing::info!(user_id = %user.id, "Login email changed with profile update");
        }
        _ => {
            if created {
                profile.details.set_contact_email(&user.email);
            }
            store.save_profile(&profile).await?;
        }
    }

    tracing::info!(user_id = %user.id, created = created, "Profile saved");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentStatus;
    use crate::services::testing;

    #[test]
    fn document_urls() {
        assert!(document_url("doc", "https://cdn.example.com/ids/front.JPG").is_ok());
        assert!(document_url("doc", "http://files.example.com/cr.pdf?sig=abc").is_ok());
        for bad in [
            "ftp://files.example.com/cr.pdf",
            "https://files.example.com/cr.exe",
            "https://files.example.com/",
            "not a url",
            "file:///etc/cr.pdf",
        ] {
            assert!(
                matches!(document_url("doc", bad), Err(ServiceError::InvalidDocumentUrl("doc"))),
                "{bad}"
            );
        }
    }

    #[tokio::test]
    async fn foreign_fields_are_rejected() {
        let store = testing::store();
        let user = testing::individual(&store, DocumentStatus::Pending).await;
        let patch = ProfilePatch {
            company_name: Some("Acme".into()),
            ..Default::default()
        };
        let err = upsert_profile(&store, &user, patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("company_name")));
    }

    #[tokio::test]
    async fn registration_doc_cannot_be_replaced() {
        let store = testing::store();
        let user = testing::business(&store, DocumentStatus::Pending).await;
        let first = ProfilePatch {
            commercial_registration_doc: Some("https://cdn.example.com/cr-1.pdf".into()),
            ..Default::default()
        };
        upsert_profile(&store, &user, first).await.unwrap();

        let second = ProfilePatch {
            commercial_registration_doc: Some("https://cdn.example.com/cr-2.pdf".into()),
            ..Default::default()
        };
        let err = upsert_profile(&store, &user, second).await.unwrap_err();
        assert!(matches!(err, ServiceError::ImmutableField("commercial_registration_doc")));
    }

    #[tokio::test]
    async fn email_change_updates_login_email() {
        let store = testing::store();
        let user = testing::business(&store, DocumentStatus::Pending).await;
        let patch = ProfilePatch {
            email: Some("Procurement@Example.com".into()),
            address: Some("West Bay, Doha".into()),
            ..Default::default()
        };
        let profile = upsert_profile(&store, &user, patch).await.unwrap();

        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "procurement@example.com");
        match profile.details {
            ProfileDetails::Business(d) => {
                assert_eq!(d.company_email.as_deref(), Some("procurement@example.com"))
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[tokio::test]
    async fn taken_email_writes_nothing() {
        let store = testing::store();
        let other = testing::individual(&store, DocumentStatus::Pending).await;
        let user = testing::individual(&store, DocumentStatus::Pending).await;
        let patch = ProfilePatch {
            email: Some(other.email.clone()),
            address: Some("Lusail".into()),
            ..Default::default()
        };
        let err = upsert_profile(&store, &user, patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmailTaken));

        let profile = store.get_profile_by_user(user.id).await.unwrap().unwrap();
        assert!(profile.address.is_none());
    }
}
