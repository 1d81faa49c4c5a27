//! # Notification Repository
//!
//! Per-recipient notification feed.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::cursor::{Page, PageRequest};
use crate::error::RepositoryError;
use crate::models::notification::{self, Entity as Notification, NotificationKind};

/// A notification to be delivered
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub request_id: Option<Uuid>,
    pub offering_id: Option<Uuid>,
}

pub struct NotificationRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> NotificationRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        new: NewNotification,
    ) -> Result<notification::Model, RepositoryError> {
        notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            recipient_id: Set(new.recipient_id),
            kind: Set(new.kind),
            title: Set(new.title),
            message: Set(new.message),
            request_id: Set(new.request_id),
            offering_id: Set(new.offering_id),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    /// Inserts a batch of notifications, returning how many were written.
    pub async fn create_many(
        &self,
        notifications: Vec<NewNotification>,
    ) -> Result<usize, RepositoryError> {
        let count = notifications.len();
        for new in notifications {
            self.create(new).await?;
        }
        Ok(count)
    }

    pub async fn list(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<Page<notification::Model>, RepositoryError> {
        let mut query =
            Notification::find().filter(notification::Column::RecipientId.eq(recipient_id));
        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        let rows = query
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .offset(page.offset)
            .limit(page.fetch_limit())
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(Page::from_fetched(rows, page))
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<u64, RepositoryError> {
        Notification::find()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Marks one of the recipient's notifications read. Other users' rows are not found.
    pub async fn mark_read(
        &self,
        recipient_id: Uuid,
        id: Uuid,
    ) -> Result<notification::Model, RepositoryError> {
        let existing = Notification::find_by_id(id)
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Notification not found"))?;

        if existing.is_read {
            return Ok(existing);
        }

        let mut active = existing.into_active_model();
        active.is_read = Set(true);
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64, RepositoryError> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }
}
