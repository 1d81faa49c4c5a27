//! # Workspace Repository
//!
//! CRUD operations for travel agency workspaces.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{Page, PageRequest};
use crate::error::RepositoryError;
use crate::models::workspace::{self, Entity as Workspace};

/// Fields for updating a workspace; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateWorkspace {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

/// Repository for Workspace database operations
pub struct WorkspaceRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> WorkspaceRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: String) -> Result<workspace::Model, RepositoryError> {
        let name = validate_workspace_name(&name)?;
        let now = Utc::now();

        workspace::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<workspace::Model>, RepositoryError> {
        Workspace::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        page: PageRequest,
    ) -> Result<Page<workspace::Model>, RepositoryError> {
        let rows = Workspace::find()
            .order_by_asc(workspace::Column::Name)
            .offset(page.offset)
            .limit(page.fetch_limit())
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(Page::from_fetched(rows, page))
    }

    pub async fn update(
        &self,
        id: Uuid,
        update: UpdateWorkspace,
    ) -> Result<workspace::Model, RepositoryError> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Workspace not found"))?;

        let mut active = existing.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(validate_workspace_name(&name)?);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Workspace not found"))?;

        existing
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

fn validate_workspace_name(name: &str) -> Result<String, RepositoryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::validation_error(
            "Workspace name cannot be empty",
        ));
    }
    if trimmed.chars().count() > 255 {
        return Err(RepositoryError::validation_error(
            "Workspace name cannot exceed 255 characters",
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_name_is_trimmed_and_bounded() {
        assert_eq!(
            validate_workspace_name("  Nile Travel ").unwrap(),
            "Nile Travel"
        );
        assert!(validate_workspace_name("   ").is_err());
        assert!(validate_workspace_name(&"x".repeat(256)).is_err());
    }
}
