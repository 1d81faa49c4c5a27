//! # Commission Repository
//!
//! Per-workspace commission rates. A workspace has at most one active rate;
//! activating a rate deactivates the others.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::cursor::{Page, PageRequest};
use crate::error::RepositoryError;
use crate::models::commission::{self, Entity as Commission};

#[derive(Debug, Clone)]
pub struct NewCommission {
    pub workspace_id: Uuid,
    pub rate_percent: f64,
    pub is_active: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCommission {
    pub rate_percent: Option<f64>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

pub struct CommissionRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CommissionRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, new: NewCommission) -> Result<commission::Model, RepositoryError> {
        validate_rate(new.rate_percent)?;
        if new.is_active {
            self.deactivate_workspace(new.workspace_id, None).await?;
        }

        let now = Utc::now();
        commission::ActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(new.workspace_id),
            rate_percent: Set(new.rate_percent),
            is_active: Set(new.is_active),
            notes: Set(new.notes.filter(|n| !n.trim().is_empty())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<commission::Model>, RepositoryError> {
        Commission::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        workspace_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<commission::Model>, RepositoryError> {
        let mut query = Commission::find();
        if let Some(workspace_id) = workspace_id {
            query = query.filter(commission::Column::WorkspaceId.eq(workspace_id));
        }

        let rows = query
            .order_by_desc(commission::Column::CreatedAt)
            .order_by_desc(commission::Column::Id)
            .offset(page.offset)
            .limit(page.fetch_limit())
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(Page::from_fetched(rows, page))
    }

    /// The workspace's active commission, if one is configured.
    pub async fn active_for_workspace(
        &self,
        workspace_id: Uuid,
    ) -> Result<Option<commission::Model>, RepositoryError> {
        Commission::find()
            .filter(commission::Column::WorkspaceId.eq(workspace_id))
            .filter(commission::Column::IsActive.eq(true))
            .order_by_desc(commission::Column::UpdatedAt)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        id: Uuid,
        update: UpdateCommission,
    ) -> Result<commission::Model, RepositoryError> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Commission not found"))?;

        if let Some(rate) = update.rate_percent {
            validate_rate(rate)?;
        }
        if update.is_active == Some(true) {
            self.deactivate_workspace(existing.workspace_id, Some(existing.id))
                .await?;
        }

        let mut active = existing.into_active_model();
        if let Some(rate) = update.rate_percent {
            active.rate_percent = Set(rate);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(notes) = update.notes {
            active.notes = Set(Some(notes).filter(|n| !n.trim().is_empty()));
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
            .ok_or_else(|| RepositoryError::not_found("Commission not found"))?;

        existing
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    async fn deactivate_workspace(
        &self,
        workspace_id: Uuid,
        keep: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let mut update = Commission::update_many()
            .col_expr(commission::Column::IsActive, Expr::value(false))
            .filter(commission::Column::WorkspaceId.eq(workspace_id))
            .filter(commission::Column::IsActive.eq(true));
        if let Some(keep) = keep {
            update = update.filter(commission::Column::Id.ne(keep));
        }

        update
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

fn validate_rate(rate_percent: f64) -> Result<(), RepositoryError> {
    if !rate_percent.is_finite() || !(0.0..=100.0).contains(&rate_percent) {
        return Err(RepositoryError::validation_error(
            "Commission rate must be between 0 and 100 percent",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commission_rate_bounds() {
        assert!(validate_rate(0.0).is_ok());
        assert!(validate_rate(7.5).is_ok());
        assert!(validate_rate(100.0).is_ok());
        assert!(validate_rate(-0.1).is_err());
        assert!(validate_rate(100.1).is_err());
        assert!(validate_rate(f64::NAN).is_err());
    }
}
