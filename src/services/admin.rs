//! Admin accounts and task tracking

use chrono::Utc;
use std::collections::BTreeSet;
use uuid::Uuid;

use super::accounts::{check_password_policy, checked_email, hash_password};
use super::{non_blank, WorkflowConfig};
use crate::auth::{require_all, PasswordHasher, Requirement};
use crate::domain::{
    permissions, AdminDetails, AdminSummary, AdminTask, AdminType, AssignTaskRequest,
    CreateAdminRequest, DocumentStatus, Profile, ProfileDetails, TaskStatus, UpdateTaskStatusRequest,
    User, UserType,
};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{Store, UserUpdate};

fn summarize(user: &User, profile: Option<&Profile>) -> AdminSummary {
    let (admin_name, admin_position) = match profile.map(|p| &p.details) {
        Some(ProfileDetails::Admin(d)) => (d.admin_name.clone(), d.admin_position.clone()),
        _ => (None, None),
    };
    AdminSummary {
        id: user.id,
        email: user.email.clone(),
        admin_type: user.admin_type,
        permissions: user.permissions.iter().cloned().collect(),
        admin_name,
        admin_position,
        created_at: user.created_at,
    }
}

fn admin_permissions(admin_type: AdminType, requested: &[String]) -> BTreeSet<String> {
    match admin_type {
        AdminType::Super => permissions::canonical_set([permissions::ALL]),
        AdminType::Normal => permissions::canonical_set(requested),
    }
}

fn new_admin(
    email: String,
    password_hash: String,
    admin_type: AdminType,
    permissions: BTreeSet<String>,
) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email,
        password_hash,
        user_type: UserType::Admin,
        admin_type: Some(admin_type),
        is_verified: true,
        document_status: DocumentStatus::Verified,
        document_rejection_reason: None,
        permissions,
        verification_token: None,
        verification_token_expires: None,
        reset_code_hash: None,
        reset_code_expires: None,
        created_at: now,
        updated_at: now,
    }
}

/// Create an admin account. Super admins only.
pub async fn create_admin(
    store: &dyn Store,
    hasher: &PasswordHasher,
    config: &WorkflowConfig,
    caller: &User,
    req: CreateAdminRequest,
) -> ServiceResult<AdminSummary> {
    require_all(caller, &[Requirement::SuperAdmin], None)?;

    let admin_type = AdminType::parse(req.admin_type.trim())
        .ok_or_else(|| ServiceError::validation("admin_type must be 'super' or 'normal'"))?;
    let email = checked_email(&req.email)?;
    check_password_policy(config, &req.password)?;

    let user = new_admin(
        email,
        hash_password(hasher, &req.password)?,
        admin_type,
        admin_permissions(admin_type, &req.permissions),
    );
    let profile = Profile::new(
        user.id,
        non_blank(Some(req.phone.as_str())).unwrap_or_default(),
        ProfileDetails::Admin(AdminDetails {
            admin_name: non_blank(req.admin_name.as_deref()),
            admin_position: non_blank(req.admin_position.as_deref()),
        }),
    );
    store.create_account(&user, &profile).await?;

    tracing::info!(
        admin_id = %user.id,
        admin_type = %admin_type,
        created_by = %caller.id,
        "Admin created"
    );
    Ok(summarize(&user, Some(&profile)))
}

pub async fn list_admins(store: &dyn Store, caller: &User) -> ServiceResult<Vec<AdminSummary>> {
    require_all(caller, &[Requirement::SuperAdmin], None)?;
    let admins = store.list_admins().await?;
    Ok(admins
        .iter()
        .map(|(user, profile)| summarize(user, profile.as_ref()))
        .collect())
}

/// Replace a normal admin's permission set.
pub async fn update_admin_permissions(
    store: &dyn Store,
    caller: &User,
    admin_id: Uuid,
    requested: Vec<String>,
) -> ServiceResult<AdminSummary> {
    require_all(caller, &[Requirement::SuperAdmin], None)?;

    let target = store
        .get_user(admin_id)
        .await?
        .filter(User::is_admin)
        .ok_or(ServiceError::NotFound("admin"))?;
    if target.is_super_admin() {
        return Err(ServiceError::CannotModifySuperAdmin);
    }

    let change = UserUpdate::Permissions(permissions::canonical_set(&requested));
    let target = store.update_user(target.id, &change).await?;

    tracing::info!(admin_id = %target.id, permissions = ?target.permissions, "Admin permissions updated");
    let profile = store.get_profile_by_user(target.id).await?;
    Ok(summarize(&target, profile.as_ref()))
}

pub async fn assign_task(
    store: &dyn Store,
    caller: &User,
    req: AssignTaskRequest,
) -> ServiceResult<AdminTask> {
    require_all(caller, &[Requirement::SuperAdmin], None)?;

    let title = non_blank(Some(req.title.as_str()))
        .ok_or_else(|| ServiceError::validation("Task title is required"))?;
    let assignee = store
        .get_user(req.assigned_to)
        .await?
        .ok_or(ServiceError::NotFound("assignee"))?;
    if !assignee.is_admin() {
        return Err(ServiceError::TargetNotAdmin);
    }
    if let Some(related) = req.related_user {
        store
            .get_user(related)
            .await?
            .ok_or(ServiceError::NotFound("related user"))?;
    }

    let now = Utc::now();
    let task = AdminTask {
        id: Uuid::new_v4(),
        title,
        description: req.description.trim().to_string(),
        assigned_by: caller.id,
        assigned_to: assignee.id,
        task_type: req.task_type,
        related_user: req.related_user,
        status: TaskStatus::Pending,
        priority: req.priority,
        due_date: req.due_date,
        completion_notes: None,
        created_at: now,
        updated_at: now,
    };
    store.insert_task(&task).await?;

    tracing::info!(task_id = %task.id, assigned_to = %assignee.id, "Admin task assigned");
    Ok(task)
}

pub async fn list_my_tasks(store: &dyn Store, caller: &User) -> ServiceResult<Vec<AdminTask>> {
    require_all(caller, &[Requirement::Admin], None)?;
    Ok(store.list_tasks_for_assignee(caller.id).await?)
}

/// Move a task to any status. Only its assignee may do this.
pub async fn update_task_status(
    store: &dyn Store,
    caller: &User,
    task_id: Uuid,
    req: UpdateTaskStatusRequest,
) -> ServiceResult<AdminTask> {
    let mut task = store
        .get_task(task_id)
        .await?
        .ok_or(ServiceError::NotFound("task"))?;
    require_all(caller, &[Requirement::Admin, Requirement::Owner], Some(task.assigned_to))?;

    task.status = req.status;
    if let Some(notes) = non_blank(req.completion_notes.as_deref()) {
        task.completion_notes = Some(notes);
    }
    task.updated_at = Utc::now();
    store.update_task(&task).await?;

    tracing::info!(task_id = %task.id, status = %task.status, "Admin task updated");
    Ok(task)
}

/// Create the bootstrap super admin unless an account with `email` exists.
/// Returns whether an account was created.
pub async fn seed_super_admin(
    store: &dyn Store,
    hasher: &PasswordHasher,
    email: &str,
    password: &str,
) -> ServiceResult<bool> {
    let email = checked_email(email)?;
    if store.find_user_by_email(&email).await?.is_some() {
        tracing::debug!("Super admin already present");
        return Ok(false);
    }

    let user = new_admin(
        email,
        hash_password(hasher, password)?,
        AdminType::Super,
        admin_permissions(AdminType::Super, &[]),
    );
    let profile = Profile::new(
        user.id,
        String::new(),
        ProfileDetails::Admin(AdminDetails {
            admin_name: Some("Super Admin".to_string()),
            admin_position: None,
        }),
    );
    match store.create_account(&user, &profile).await {
        Ok(()) => {
            tracing::info!(admin_id = %user.id, "Super admin seeded");
            Ok(true)
        }
        // Another instance seeded it first
        Err(e) => match ServiceError::from(e) {
            ServiceError::EmailTaken => Ok(false),
            other => Err(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskType;
    use crate::services::testing;

    fn admin_request(email: &str, admin_type: &str, perms: &[&str]) -> CreateAdminRequest {
        CreateAdminRequest {
            email: email.to_string(),
            password: "admin-password".into(),
            phone: "+97444400000".into(),
            admin_type: admin_type.to_string(),
            admin_name: Some("Reviewer".into()),
            admin_position: Some("Compliance".into()),
            permissions: perms.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn super_admin_creates_admins() {
        let store = testing::store();
        let root = testing::super_admin(&store).await;

        let created = create_admin(
            &store,
            &testing::hasher(),
            &testing::config(),
            &root,
            admin_request("reviewer@example.com", "normal", &["document_verification"]),
        )
        .await
        .unwrap();
        assert_eq!(created.admin_type, Some(AdminType::Normal));
        assert_eq!(created.permissions, vec!["verify_documents".to_string()]);

        let stored = store.get_user(created.id).await.unwrap().unwrap();
        assert!(stored.is_verified);
        assert!(stored.is_document_verified());

        let root2 = create_admin(
            &store,
            &testing::hasher(),
            &testing::config(),
            &root,
            admin_request("root2@example.com", "super", &[]),
        )
        .await
        .unwrap();
        assert_eq!(root2.permissions, vec!["all".to_string()]);

        assert_eq!(list_admins(&store, &root).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn normal_admin_cannot_create_admins() {
        let store = testing::store();
        let normal = testing::admin(&store, &["all"]).await;
        let err = create_admin(
            &store,
            &testing::hasher(),
            &testing::config(),
            &normal,
            admin_request("x@example.com", "normal", &[]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn invalid_admin_type_is_rejected() {
        let store = testing::store();
        let root = testing::super_admin(&store).await;
        let err = create_admin(
            &store,
            &testing::hasher(),
            &testing::config(),
            &root,
            admin_request("x@example.com", "owner", &[]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn permissions_of_super_admin_are_fixed() {
        let store = testing::store();
        let root = testing::super_admin(&store).await;
        let other_root = testing::super_admin(&store).await;
        let normal = testing::admin(&store, &[]).await;
        let user = testing::individual(&store, DocumentStatus::Pending).await;

        let err = update_admin_permissions(&store, &root, other_root.id, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CannotModifySuperAdmin));

        let err = update_admin_permissions(&store, &root, user.id, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("admin")));

        let updated = update_admin_permissions(
            &store,
            &root,
            normal.id,
            vec!["content_moderation".into(), "document_verification".into()],
        )
        .await
        .unwrap();
        assert_eq!(
            updated.permissions,
            vec!["content_moderation".to_string(), "verify_documents".to_string()]
        );
    }

    #[tokio::test]
    async fn permission_change_keeps_a_newer_password() {
        let store = testing::store();
        let root = testing::super_admin(&store).await;
        let normal = testing::admin(&store, &[]).await;

        let reset = UserUpdate::Password("argon2-after-reset".into());
        store.update_user(normal.id, &reset).await.unwrap();
        update_admin_permissions(&store, &root, normal.id, vec!["verify_documents".into()])
            .await
            .unwrap();

        let stored = store.get_user(normal.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "argon2-after-reset");
        assert!(stored.permissions.contains("verify_documents"));
    }

    #[tokio::test]
    async fn tasks_go_to_admins_and_only_the_assignee_updates() {
        let store = testing::store();
        let root = testing::super_admin(&store).await;
        let normal = testing::admin(&store, &[]).await;
        let other = testing::admin(&store, &[]).await;
        let user = testing::business(&store, DocumentStatus::Pending).await;

        let req = |assigned_to| AssignTaskRequest {
            title: "Review flagged tender".into(),
            description: String::new(),
            assigned_to,
            task_type: TaskType::ContentModeration,
            related_user: Some(user.id),
            priority: Default::default(),
            due_date: None,
        };

        let err = assign_task(&store, &root, req(user.id)).await.unwrap_err();
        assert!(matches!(err, ServiceError::TargetNotAdmin));

        let task = assign_task(&store, &root, req(normal.id)).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(list_my_tasks(&store, &normal).await.unwrap().len(), 1);

        let update = || UpdateTaskStatusRequest {
            status: TaskStatus::Completed,
            completion_notes: Some("Removed".into()),
        };
        let err = update_task_status(&store, &other, task.id, update()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let done = update_task_status(&store, &normal, task.id, update()).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.completion_notes.as_deref(), Some("Removed"));
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = testing::store();
        let hasher = testing::hasher();
        assert!(seed_super_admin(&store, &hasher, "Root@Example.com", "bootstrap-pw").await.unwrap());
        assert!(!seed_super_admin(&store, &hasher, "root@example.com", "bootstrap-pw").await.unwrap());

        let root = store.find_user_by_email("root@example.com").await.unwrap().unwrap();
        assert!(root.is_super_admin());
    }
}
