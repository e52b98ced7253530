//! Identity document submission and review

use chrono::Utc;
use uuid::Uuid;

use super::non_blank;
use super::profiles::document_url;
use super::Notifier;
use crate::auth::{require_all, Requirement};
use crate::domain::{
    permissions, AdminTask, DocumentDecision, DocumentStatus, DocumentSubmission, PendingVerification,
    ProfileDetails, SubmitDocumentsRequest, TaskPriority, TaskStatus, TaskType, User, UserType,
    VerificationStatusResponse,
};
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

fn required(field: &str, value: Option<&str>) -> ServiceResult<String> {
    non_blank(value).ok_or_else(|| ServiceError::validation(format!("{field} is required")))
}

/// Validate a raw submission into the variant the account type needs.
fn parse_submission(
    user_type: UserType,
    req: &SubmitDocumentsRequest,
) -> ServiceResult<DocumentSubmission> {
    match user_type {
        UserType::Individual => {
            let front = required("national_id_front", req.national_id_front.as_deref())?;
            let back = required("national_id_back", req.national_id_back.as_deref())?;
            Ok(DocumentSubmission::Individual {
                national_id: required("national_id", req.national_id.as_deref())?,
                national_id_front: document_url("national_id_front", &front)?,
                national_id_back: document_url("national_id_back", &back)?,
            })
        }
        UserType::Business => {
            let doc = required(
                "commercial_registration_doc",
                req.commercial_registration_doc.as_deref(),
            )?;
            Ok(DocumentSubmission::Business {
                commercial_registration_number: required(
                    "commercial_registration_number",
                    req.commercial_registration_number.as_deref(),
                )?,
                commercial_registration_doc: document_url("commercial_registration_doc", &doc)?,
            })
        }
        UserType::Admin => Err(ServiceError::forbidden(
            "Admin accounts do not submit identity documents",
        )),
    }
}

/// Submit identity documents for review. Allowed on first submission and
/// after a rejection.
pub async fn submit_documents(
    store: &dyn Store,
    user: &User,
    req: SubmitDocumentsRequest,
) -> ServiceResult<VerificationStatusResponse> {
    if user.is_admin() {
        return Err(ServiceError::forbidden(
            "Admin accounts do not submit identity documents",
        ));
    }

    let current = store
        .get_user(user.id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    let mut profile = store
        .get_profile_by_user(user.id)
        .await?
        .ok_or(ServiceError::NotFound("profile"))?;

    match current.document_status {
        DocumentStatus::Verified => return Err(ServiceError::AlreadyVerified),
        DocumentStatus::Pending if !profile.details.documents().is_empty() => {
            return Err(ServiceError::AlreadySubmitted)
        }
        DocumentStatus::Pending | DocumentStatus::Rejected => {}
    }

    let submission = parse_submission(user.user_type, &req)?;
    match (&mut profile.details, submission) {
        (
            ProfileDetails::Individual(d),
            DocumentSubmission::Individual {
                national_id,
                national_id_front,
                national_id_back,
            },
        ) => {
            d.national_id = Some(national_id);
            d.national_id_front = Some(national_id_front);
            d.national_id_back = Some(national_id_back);
        }
        (
            ProfileDetails::Business(d),
            DocumentSubmission::Business {
                commercial_registration_number,
                commercial_registration_doc,
            },
        ) => {
            if let Some(existing) = d.commercial_registration_doc.as_deref() {
                if existing != commercial_registration_doc {
                    return Err(ServiceError::ImmutableField("commercial_registration_doc"));
                }
            }
            d.commercial_registration_number = Some(commercial_registration_number);
            d.commercial_registration_doc = Some(commercial_registration_doc);
        }
        _ => {
            return Err(ServiceError::validation(
                "Profile does not match the account type",
            ))
        }
    }

    profile.updated_at = Utc::now();
    let user = store.submit_documents(&profile).await?;

    tracing::info!(user_id = %user.id, "Documents submitted for verification");
    Ok(VerificationStatusResponse {
        status: user.document_status,
        rejection_reason: None,
        documents: profile.details.documents(),
    })
}

pub async fn verification_status(
    store: &dyn Store,
    user: &User,
) -> ServiceResult<VerificationStatusResponse> {
    let documents = store
        .get_profile_by_user(user.id)
        .await?
        .map(|p| p.details.documents())
        .unwrap_or_default();
    Ok(VerificationStatusResponse {
        status: user.document_status,
        rejection_reason: user.document_rejection_reason.clone(),
        documents,
    })
}

/// Users awaiting a document decision, oldest submission first.
pub async fn pending_verifications(
    store: &dyn Store,
    admin: &User,
) -> ServiceResult<Vec<PendingVerification>> {
    require_all(admin, &[Requirement::Permission(permissions::VERIFY_DOCUMENTS)], None)?;

    let pending = store.list_pending_verifications().await?;
    Ok(pending
        .into_iter()
        .filter_map(|(user, profile)| {
            let profile = profile?;
            let documents = profile.details.documents();
            if documents.is_empty() {
                return None;
            }
            let display_name = match &profile.details {
                ProfileDetails::Individual(d) => Some(d.full_name.clone()),
                ProfileDetails::Business(d) => Some(d.company_name.clone()),
                ProfileDetails::Admin(d) => d.admin_name.clone(),
            };
            Some(PendingVerification {
                user_id: user.id,
                email: user.email,
                user_type: user.user_type,
                display_name,
                documents,
                submitted_at: user.updated_at,
            })
        })
        .collect())
}

/// Approve or reject a user's pending documents.
///
/// The decision and a completed review task are stored together; the user
/// is emailed afterwards.
pub async fn decide_documents(
    store: &dyn Store,
    notifier: &Notifier,
    admin: &User,
    user_id: Uuid,
    decision: DocumentDecision,
) -> ServiceResult<User> {
    require_all(admin, &[Requirement::Permission(permissions::VERIFY_DOCUMENTS)], None)?;

    let target = store
        .get_user(user_id)
        .await?
        .filter(|u| !u.is_admin())
        .ok_or(ServiceError::NotFound("user"))?;
    if target.document_status != DocumentStatus::Pending {
        return Err(ServiceError::NotPendingVerification);
    }

    let (status, notes) = match &decision {
        DocumentDecision::Verify => (DocumentStatus::Verified, "Documents verified".to_string()),
        DocumentDecision::Reject { reason } => {
            let reason = non_blank(Some(reason.as_str()))
                .ok_or_else(|| ServiceError::validation("A rejection reason is required"))?;
            (DocumentStatus::Rejected, reason)
        }
    };

    let rejection_reason = match status {
        DocumentStatus::Rejected => Some(notes.as_str()),
        _ => None,
    };

    let now = Utc::now();
    let task = AdminTask {
        id: Uuid::new_v4(),
        title: format!("Document verification: {}", target.email),
        description: format!("Documents {} for {}", status, target.email),
        assigned_by: admin.id,
        assigned_to: admin.id,
        task_type: TaskType::DocumentVerification,
        related_user: Some(target.id),
        status: TaskStatus::Completed,
        priority: TaskPriority::Medium,
        due_date: None,
        completion_notes: Some(notes.clone()),
        created_at: now,
        updated_at: now,
    };
    let target = store
        .record_document_decision(target.id, status, rejection_reason, &task)
        .await?;

    tracing::info!(
        user_id = %target.id,
        admin_id = %admin.id,
        status = %status,
        "Document decision recorded"
    );

    match status {
        DocumentStatus::Verified => notifier.send_documents_verified(&target.email).await,
        _ => notifier.send_documents_rejected(&target.email, &notes).await,
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProfilePatch;
    use crate::services::profiles::upsert_profile;
    use crate::services::testing;

    fn individual_docs() -> SubmitDocumentsRequest {
        SubmitDocumentsRequest {
            national_id: Some("28763400123".into()),
            national_id_front: Some("https://cdn.example.com/ids/front.jpg".into()),
            national_id_back: Some("https://cdn.example.com/ids/back.png".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn submit_then_resubmit_is_rejected_until_decided() {
        let store = testing::store();
        let user = testing::individual(&store, DocumentStatus::Pending).await;

        let status = submit_documents(&store, &user, individual_docs()).await.unwrap();
        assert_eq!(status.status, DocumentStatus::Pending);
        assert!(!status.documents.is_empty());

        let user = store.get_user(user.id).await.unwrap().unwrap();
        let err = submit_documents(&store, &user, individual_docs()).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadySubmitted));
    }

    #[tokio::test]
    async fn verified_user_cannot_resubmit() {
        let store = testing::store();
        let user = testing::individual(&store, DocumentStatus::Verified).await;
        let err = submit_documents(&store, &user, individual_docs()).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyVerified));
    }

    #[tokio::test]
    async fn business_requires_registration_doc() {
        let store = testing::store();
        let user = testing::business(&store, DocumentStatus::Pending).await;
        let req = SubmitDocumentsRequest {
            commercial_registration_number: Some("CR-5521".into()),
            ..Default::default()
        };
        let err = submit_documents(&store, &user, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn reject_then_resubmit_then_verify() {
        let store = testing::store();
        let reviewer = testing::admin(&store, &["document_verification"]).await;
        let user = testing::individual(&store, DocumentStatus::Pending).await;
        submit_documents(&store, &user, individual_docs()).await.unwrap();

        let queue = pending_verifications(&store, &reviewer).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].user_id, user.id);

        let err = decide_documents(
            &store,
            &testing::notifier(),
            &reviewer,
            user.id,
            DocumentDecision::Reject { reason: "  ".into() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let rejected = decide_documents(
            &store,
            &testing::notifier(),
            &reviewer,
            user.id,
            DocumentDecision::Reject {
                reason: "Back side is unreadable".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(rejected.document_status, DocumentStatus::Rejected);

        let status = verification_status(&store, &rejected).await.unwrap();
        assert_eq!(status.rejection_reason.as_deref(), Some("Back side is unreadable"));

        let resubmitted = submit_documents(&store, &rejected, individual_docs()).await.unwrap();
        assert_eq!(resubmitted.status, DocumentStatus::Pending);
        assert!(resubmitted.rejection_reason.is_none());

        let verified = decide_documents(
            &store,
            &testing::notifier(),
            &reviewer,
            user.id,
            DocumentDecision::Verify,
        )
        .await
        .unwrap();
        assert!(verified.is_document_verified());

        let tasks = store.list_tasks_for_assignee(reviewer.id).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks
            .iter()
            .all(|t| t.status == TaskStatus::Completed && t.related_user == Some(user.id)));
    }

    fn business_docs(doc: &str) -> SubmitDocumentsRequest {
        SubmitDocumentsRequest {
            commercial_registration_number: Some("CR-5521".into()),
            commercial_registration_doc: Some(format!("https://cdn.example.com/{doc}")),
            ..Default::default()
        }
    }

    async fn reject(store: &dyn Store, reviewer: &User, user_id: Uuid) {
        let reason = DocumentDecision::Reject {
            reason: "Registration expired".into(),
        };
        decide_documents(store, &testing::notifier(), reviewer, user_id, reason)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn resubmission_keeps_the_registration_doc() {
        let store = testing::store();
        let reviewer = testing::super_admin(&store).await;
        let user = testing::business(&store, DocumentStatus::Pending).await;
        submit_documents(&store, &user, business_docs("cr-1.pdf")).await.unwrap();
        reject(&store, &reviewer, user.id).await;

        let err = submit_documents(&store, &user, business_docs("cr-2.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ImmutableField("commercial_registration_doc")));
        let profile = store.get_profile_by_user(user.id).await.unwrap().unwrap();
        match profile.details {
            ProfileDetails::Business(d) => assert_eq!(
                d.commercial_registration_doc.as_deref(),
                Some("https://cdn.example.com/cr-1.pdf")
            ),
            other => panic!("unexpected details: {other:?}"),
        }

        let status = submit_documents(&store, &user, business_docs("cr-1.pdf")).await.unwrap();
        assert_eq!(status.status, DocumentStatus::Pending);
    }

    #[tokio::test]
    async fn stale_caller_cannot_undo_a_decision() {
        let store = testing::store();
        let reviewer = testing::super_admin(&store).await;
        let stale = testing::individual(&store, DocumentStatus::Pending).await;
        submit_documents(&store, &stale, individual_docs()).await.unwrap();
        decide_documents(&store, &testing::notifier(), &reviewer, stale.id, DocumentDecision::Verify)
            .await
            .unwrap();

        let patch = ProfilePatch {
            email: Some("renamed@example.com".into()),
            ..Default::default()
        };
        upsert_profile(&store, &stale, patch).await.unwrap();
        let err = submit_documents(&store, &stale, individual_docs()).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyVerified));

        let stored = store.get_user(stale.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "renamed@example.com");
        assert_eq!(stored.document_status, DocumentStatus::Verified);
    }

    #[tokio::test]
    async fn decision_keeps_a_newer_email() {
        let store = testing::store();
        let reviewer = testing::super_admin(&store).await;
        let user = testing::business(&store, DocumentStatus::Pending).await;
        submit_documents(&store, &user, business_docs("cr-1.pdf")).await.unwrap();

        let patch = ProfilePatch {
            email: Some("procurement@example.com".into()),
            ..Default::default()
        };
        upsert_profile(&store, &user, patch).await.unwrap();
        reject(&store, &reviewer, user.id).await;

        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "procurement@example.com");
        assert_eq!(stored.document_rejection_reason.as_deref(), Some("Registration expired"));
    }

    #[tokio::test]
    async fn decision_requires_permission_and_pending_state() {
        let store = testing::store();
        let plain = testing::admin(&store, &[]).await;
        let root = testing::super_admin(&store).await;
        let user = testing::individual(&store, DocumentStatus::Verified).await;

        let err = pending_verifications(&store, &plain).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = decide_documents(&store, &testing::notifier(), &root, user.id, DocumentDecision::Verify)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotPendingVerification));

        let err = decide_documents(&store, &testing::notifier(), &root, plain.id, DocumentDecision::Verify)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("user")));
    }
}
