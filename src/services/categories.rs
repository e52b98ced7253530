//! Tender category registry

use chrono::Utc;
use uuid::Uuid;

use super::non_blank;
use crate::auth::{require_all, Requirement};
use crate::domain::{Category, CreateCategoryRequest, UpdateCategoryRequest, User};
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

pub async fn list_categories(store: &dyn Store, active_only: bool) -> ServiceResult<Vec<Category>> {
    Ok(store.list_categories(active_only).await?)
}

pub async fn create_category(
    store: &dyn Store,
    caller: &User,
    req: CreateCategoryRequest,
) -> ServiceResult<Category> {
    require_all(caller, &[Requirement::Admin], None)?;

    let name = non_blank(Some(req.name.as_str()))
        .ok_or_else(|| ServiceError::validation("Category name is required"))?;
    let now = Utc::now();
    let category = Category {
        id: Uuid::new_v4(),
        name,
        description: non_blank(req.description.as_deref()),
        is_active: true,
        created_by: Some(caller.id),
        created_at: now,
        updated_at: now,
    };
    store.insert_category(&category).await?;

    tracing::info!(category_id = %category.id, name = %category.name, "Category created");
    Ok(category)
}

pub async fn update_category(
    store: &dyn Store,
    caller: &User,
    id: Uuid,
    req: UpdateCategoryRequest,
) -> ServiceResult<Category> {
    require_all(caller, &[Requirement::Admin], None)?;

    let mut category = store
        .get_category(id)
        .await?
        .ok_or(ServiceError::NotFound("category"))?;
    if let Some(name) = req.name.as_deref() {
        category.name = non_blank(Some(name))
            .ok_or_else(|| ServiceError::validation("Category name cannot be blank"))?;
    }
    if let Some(description) = req.description.as_deref() {
        category.description = non_blank(Some(description));
    }
    if let Some(active) = req.is_active {
        category.is_active = active;
    }
    category.updated_at = Utc::now();
    store.update_category(&category).await?;

    tracing::info!(category_id = %category.id, "Category updated");
    Ok(category)
}

/// Delete a category no tender refers to.
pub async fn delete_category(store: &dyn Store, caller: &User, id: Uuid) -> ServiceResult<()> {
    require_all(caller, &[Requirement::Admin], None)?;
    store.delete_category_if_unused(id).await?;
    tracing::info!(category_id = %id, "Category deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentStatus;
    use crate::services::testing;

    fn request(name: &str) -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn names_are_unique_ignoring_case() {
        let store = testing::store();
        let admin = testing::admin(&store, &[]).await;
        create_category(&store, &admin, request("Construction")).await.unwrap();
        let err = create_category(&store, &admin, request("construction"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CategoryNameTaken));
    }

    #[tokio::test]
    async fn only_admins_manage_categories() {
        let store = testing::store();
        let user = testing::business(&store, DocumentStatus::Verified).await;
        let err = create_category(&store, &user, request("IT")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn inactive_categories_are_hidden_from_public_listing() {
        let store = testing::store();
        let admin = testing::admin(&store, &[]).await;
        let category = create_category(&store, &admin, request("Catering")).await.unwrap();
        update_category(
            &store,
            &admin,
            category.id,
            UpdateCategoryRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(list_categories(&store, true).await.unwrap().is_empty());
        assert_eq!(list_categories(&store, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn referenced_category_cannot_be_deleted() {
        let store = testing::store();
        let admin = testing::admin(&store, &[]).await;
        let (_, tender) = testing::active_tender(&store).await;

        let err = delete_category(&store, &admin, tender.category_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::CategoryInUse));

        let unused = create_category(&store, &admin, request("Unused")).await.unwrap();
        delete_category(&store, &admin, unused.id).await.unwrap();
        assert!(store.get_category(unused.id).await.unwrap().is_none());
    }
}
