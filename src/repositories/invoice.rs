//! # Invoice Repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::AccessScope;
use crate::cursor::{Page, PageRequest};
use crate::error::RepositoryError;
use crate::models::invoice::{self, Entity as Invoice, InvoiceStatus};

pub struct InvoiceRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> InvoiceRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        invoice: invoice::ActiveModel,
    ) -> Result<invoice::Model, RepositoryError> {
        invoice
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<invoice::Model>, RepositoryError> {
        Invoice::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_visible(
        &self,
        scope: AccessScope,
        id: Uuid,
    ) -> Result<Option<invoice::Model>, RepositoryError> {
        let mut query = Invoice::find_by_id(id);
        match scope {
            AccessScope::Admin => {}
            AccessScope::Agent { workspace_id } => {
                query = query.filter(invoice::Column::WorkspaceId.eq(workspace_id));
            }
            AccessScope::Provider { .. } => return Ok(None),
        }

        query
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_offering(
        &self,
        offering_id: Uuid,
    ) -> Result<Option<invoice::Model>, RepositoryError> {
        Invoice::find()
            .filter(invoice::Column::OfferingId.eq(offering_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Lists invoices: agents get their workspace's, providers none, admins all.
    pub async fn list(
        &self,
        scope: AccessScope,
        status: Option<InvoiceStatus>,
        page: PageRequest,
    ) -> Result<Page<invoice::Model>, RepositoryError> {
        let mut query = Invoice::find();
        match scope {
            AccessScope::Admin => {}
            AccessScope::Agent { workspace_id } => {
                query = query.filter(invoice::Column::WorkspaceId.eq(workspace_id));
            }
            AccessScope::Provider { .. } => return Ok(Page::from_fetched(Vec::new(), page)),
        }
        if let Some(status) = status {
            query = query.filter(invoice::Column::Status.eq(status));
        }

        let rows = query
            .order_by_desc(invoice::Column::CreatedAt)
            .order_by_desc(invoice::Column::Id)
            .offset(page.offset)
            .limit(page.fetch_limit())
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(Page::from_fetched(rows, page))
    }

    /// Applies a status transition, stamping `issued_at` / `paid_at`.
    pub async fn transition(
        &self,
        existing: invoice::Model,
        next: InvoiceStatus,
    ) -> Result<invoice::Model, RepositoryError> {
        if !existing.status.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "Invoice cannot move from {:?} to {:?}",
                existing.status, next
            )));
        }

        let now = Utc::now();
        let mut active = existing.into_active_model();
        active.status = Set(next);
        match next {
            InvoiceStatus::Issued => active.issued_at = Set(Some(now.into())),
            InvoiceStatus::Paid => active.paid_at = Set(Some(now.into())),
            InvoiceStatus::Draft | InvoiceStatus::Void => {}
        }
        active.updated_at = Set(now.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
