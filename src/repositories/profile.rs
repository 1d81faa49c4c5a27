//! # Profile Repository
//!
//! CRUD operations for user profiles, enforcing the role/workspace pairing:
//! travel agents belong to exactly one workspace, every other role to none.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{Page, PageRequest};
use crate::error::RepositoryError;
use crate::models::profile::{self, Entity as Profile, Role};
use crate::models::{offering, request};
use crate::models::workspace::Entity as Workspace;

/// Data for creating a profile
#[derive(Debug, Clone)]
pub struct NewProfile {
    /// Identity subject; generated when absent
    pub id: Option<Uuid>,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub workspace_id: Option<Uuid>,
}

/// Fields for updating a profile; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    /// `Some(None)` detaches the profile from its workspace
    pub workspace_id: Option<Option<Uuid>>,
}

pub struct ProfileRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ProfileRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, new: NewProfile) -> Result<profile::Model, RepositoryError> {
        let email = normalize_email(&new.email)?;
        self.validate_membership(new.role, new.workspace_id).await?;

        let now = Utc::now();
        profile::ActiveModel {
            id: Set(new.id.unwrap_or_else(Uuid::new_v4)),
            email: Set(email),
            full_name: Set(normalize_optional(new.full_name)),
            role: Set(new.role),
            workspace_id: Set(new.workspace_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<profile::Model>, RepositoryError> {
        Profile::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<profile::Model>, RepositoryError> {
        Profile::find()
            .filter(profile::Column::Email.eq(email.trim().to_lowercase()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        role: Option<Role>,
        page: PageRequest,
    ) -> Result<Page<profile::Model>, RepositoryError> {
        let mut query = Profile::find();
        if let Some(role) = role {
            query = query.filter(profile::Column::Role.eq(role));
        }

        let rows = query
            .order_by_asc(profile::Column::Email)
            .offset(page.offset)
            .limit(page.fetch_limit())
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(Page::from_fetched(rows, page))
    }

    /// Ids of every admin and super admin, for back-office notifications.
    pub async fn admin_ids(&self) -> Result<Vec<Uuid>, RepositoryError> {
        Profile::find()
            .select_only()
            .column(profile::Column::Id)
            .filter(profile::Column::Role.is_in([Role::Admin, Role::SuperAdmin]))
            .into_tuple::<Uuid>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        id: Uuid,
        update: UpdateProfile,
    ) -> Result<profile::Model, RepositoryError> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Profile not found"))?;

        let role = update.role.unwrap_or(existing.role);
        let workspace_id = match update.workspace_id {
            Some(workspace_id) => workspace_id,
            None if role.requires_workspace() => existing.workspace_id,
            // Leaving the agent role drops the workspace link.
            None => None,
        };
        self.validate_membership(role, workspace_id).await?;

        let mut active = existing.into_active_model();
        if update.full_name.is_some() {
            active.full_name = Set(normalize_optional(update.full_name));
        }
        active.role = Set(role);
        active.workspace_id = Set(workspace_id);
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
            .ok_or_else(|| RepositoryError::not_found("Profile not found"))?;

        if self.has_booking_history(id).await? {
            return Err(RepositoryError::Conflict(
                "Profile has requests or offerings on record and cannot be deleted".to_string(),
            ));
        }

        existing
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    /// Whether the profile authored a request or placed an offering.
    async fn has_booking_history(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let requests = request::Entity::find()
            .filter(request::Column::CreatedBy.eq(id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if requests > 0 {
            return Ok(true);
        }

        let offerings = offering::Entity::find()
            .filter(offering::Column::ProviderId.eq(id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(offerings > 0)
    }

    async fn validate_membership(
        &self,
        role: Role,
        workspace_id: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        match (role.requires_workspace(), workspace_id) {
            (true, None) => Err(RepositoryError::validation_error(
                "Travel agents must belong to a workspace",
            )),
            (false, Some(_)) => Err(RepositoryError::validation_error(format!(
                "Role {} cannot belong to a workspace",
                role
            ))),
            (true, Some(workspace_id)) => {
                let exists = Workspace::find_by_id(workspace_id)
                    .one(self.db)
                    .await
                    .map_err(RepositoryError::database_error)?
                    .is_some();
                if exists {
                    Ok(())
                } else {
                    Err(RepositoryError::validation_error("Workspace does not exist"))
                }
            }
            (false, None) => Ok(()),
        }
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"))
}

fn normalize_email(email: &str) -> Result<String, RepositoryError> {
    let email = email.trim().to_lowercase();
    if email.len() > 320 || !email_pattern().is_match(&email) {
        return Err(RepositoryError::validation_error("Invalid email address"));
    }
    Ok(email)
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            normalize_email("  Agent@Example.COM ").unwrap(),
            "agent@example.com"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@b@c.com").is_err());
        assert!(normalize_email("user@localhost").is_err());
    }

    #[test]
    fn blank_optional_text_becomes_none() {
        assert_eq!(normalize_optional(Some("   ".to_string())), None);
        assert_eq!(
            normalize_optional(Some(" Sara ".to_string())),
            Some("Sara".to_string())
        );
    }
}
