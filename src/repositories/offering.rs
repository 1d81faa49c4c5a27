//! # Offering Repository
//!
//! Persistence for provider bids. Lifecycle rules live in
//! [`crate::bidding`]; this layer only stores and filters.

use chrono::Utc;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, Query},
};
use uuid::Uuid;

use super::AccessScope;
use crate::cursor::{Page, PageRequest};
use crate::error::RepositoryError;
use crate::models::offering::{self, Entity as Offering, OfferingStatus};
use crate::models::request;

/// Optional list filters
#[derive(Debug, Clone, Copy, Default)]
pub struct OfferingFilter {
    pub request_id: Option<Uuid>,
    pub status: Option<OfferingStatus>,
}

pub struct OfferingRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> OfferingRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        offering: offering::ActiveModel,
    ) -> Result<offering::Model, RepositoryError> {
        offering
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Writes `offering` only while the stored row is still PENDING.
    ///
    /// Returns `None` when another writer moved the offering on first.
    pub async fn save_if_pending(
        &self,
        offering: offering::ActiveModel,
    ) -> Result<Option<offering::Model>, RepositoryError> {
        self.save_guarded(offering, false).await
    }

    /// Like [`Self::save_if_pending`], and additionally requires that no margin has been applied.
    pub async fn save_if_unquoted(
        &self,
        offering: offering::ActiveModel,
    ) -> Result<Option<offering::Model>, RepositoryError> {
        self.save_guarded(offering, true).await
    }

    async fn save_guarded(
        &self,
        offering: offering::ActiveModel,
        unquoted: bool,
    ) -> Result<Option<offering::Model>, RepositoryError> {
        let mut update = Offering::update(offering)
            .filter(offering::Column::Status.eq(OfferingStatus::Pending));
        if unquoted {
            update = update.filter(offering::Column::MarginPercent.is_null());
        }

        match update.exec(self.db).await {
            Ok(model) => Ok(Some(model)),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(err) => Err(RepositoryError::database_error(err)),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<offering::Model>, RepositoryError> {
        Offering::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Fetches an offering only if the caller may see it.
    pub async fn get_visible(
        &self,
        scope: AccessScope,
        id: Uuid,
    ) -> Result<Option<offering::Model>, RepositoryError> {
        Offering::find_by_id(id)
            .filter(visibility(scope))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// The provider's live bid on a request, if any.
    pub async fn find_pending_for_provider(
        &self,
        request_id: Uuid,
        provider_id: Uuid,
    ) -> Result<Option<offering::Model>, RepositoryError> {
        Offering::find()
            .filter(offering::Column::RequestId.eq(request_id))
            .filter(offering::Column::ProviderId.eq(provider_id))
            .filter(offering::Column::Status.eq(OfferingStatus::Pending))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        scope: AccessScope,
        filter: OfferingFilter,
        page: PageRequest,
    ) -> Result<Page<offering::Model>, RepositoryError> {
        let mut query = Offering::find().filter(visibility(scope));
        if let Some(request_id) = filter.request_id {
            query = query.filter(offering::Column::RequestId.eq(request_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(offering::Column::Status.eq(status));
        }

        let rows = query
            .order_by_desc(offering::Column::CreatedAt)
            .order_by_desc(offering::Column::Id)
            .offset(page.offset)
            .limit(page.fetch_limit())
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(Page::from_fetched(rows, page))
    }

    /// Pending offerings on `request_id` other than `except_id`.
    pub async fn pending_siblings(
        &self,
        request_id: Uuid,
        except_id: Uuid,
    ) -> Result<Vec<offering::Model>, RepositoryError> {
        Offering::find()
            .filter(offering::Column::RequestId.eq(request_id))
            .filter(offering::Column::Id.ne(except_id))
            .filter(offering::Column::Status.eq(OfferingStatus::Pending))
            .order_by_asc(offering::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Cancels every pending sibling of `except_id` in one statement.
    pub async fn cancel_pending_siblings(
        &self,
        request_id: Uuid,
        except_id: Uuid,
    ) -> Result<u64, RepositoryError> {
        let result = Offering::update_many()
            .col_expr(
                offering::Column::Status,
                Expr::value(OfferingStatus::Canceled.to_value()),
            )
            .col_expr(
                offering::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(offering::Column::RequestId.eq(request_id))
            .filter(offering::Column::Id.ne(except_id))
            .filter(offering::Column::Status.eq(OfferingStatus::Pending))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }

    pub async fn count_by_status(
        &self,
        status: OfferingStatus,
    ) -> Result<u64, RepositoryError> {
        Offering::find()
            .filter(offering::Column::Status.eq(status))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

/// Row filter implementing offering visibility for `scope`.
///
/// Agents only see bids that have been quoted (or confirmed) on their own
/// workspace's requests; canceled bids stay hidden from them.
pub(crate) fn visibility(scope: AccessScope) -> Condition {
    match scope {
        AccessScope::Admin => Condition::all(),
        AccessScope::Provider { provider_id } => {
            Condition::all().add(offering::Column::ProviderId.eq(provider_id))
        }
        AccessScope::Agent { workspace_id } => Condition::all()
            .add(
                offering::Column::RequestId.in_subquery(
                    Query::select()
                        .column(request::Column::Id)
                        .from(request::Entity)
                        .and_where(request::Column::WorkspaceId.eq(workspace_id))
                        .to_owned(),
                ),
            )
            .add(offering::Column::TotalFinalPrice.is_not_null())
            .add(offering::Column::Status.ne(OfferingStatus::Canceled)),
    }
}
