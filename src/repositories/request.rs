//! # Request Repository
//!
//! Accommodation requests with tenant-aware visibility:
//! agents see their workspace's requests, providers see open requests plus
//! any they have bid on, admins see everything.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, Query},
};
use uuid::Uuid;

use super::AccessScope;
use crate::cursor::{Page, PageRequest};
use crate::error::RepositoryError;
use crate::models::offering;
use crate::models::request::{self, Entity as Request, PackageType, RequestStatus};
use crate::pricing::{self, RoomCounts};

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub city: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: RoomCounts,
    pub package_type: PackageType,
    pub notes: Option<String>,
}

/// Fields for updating a request; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub city: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub rooms: Option<RoomCounts>,
    pub package_type: Option<PackageType>,
    pub notes: Option<String>,
}

impl UpdateRequest {
    /// Whether the update touches anything a provider priced a bid against.
    pub fn changes_terms(&self) -> bool {
        self.city.is_some()
            || self.check_in.is_some()
            || self.check_out.is_some()
            || self.rooms.is_some()
            || self.package_type.is_some()
    }
}

pub struct RequestRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> RequestRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        workspace_id: Uuid,
        created_by: Uuid,
        new: NewRequest,
    ) -> Result<request::Model, RepositoryError> {
        let city = validate_city(&new.city)?;
        validate_stay(new.check_in, new.check_out, &new.rooms)?;
        let now = Utc::now();

        request::ActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            created_by: Set(created_by),
            city: Set(city),
            check_in: Set(new.check_in),
            check_out: Set(new.check_out),
            single_rooms: Set(new.rooms.single),
            double_rooms: Set(new.rooms.double),
            triple_rooms: Set(new.rooms.triple),
            quad_rooms: Set(new.rooms.quad),
            package_type: Set(new.package_type),
            notes: Set(normalize_notes(new.notes)),
            status: Set(RequestStatus::Submitted),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<request::Model>, RepositoryError> {
        Request::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Fetches a request only if the caller may see it.
    pub async fn get_visible(
        &self,
        scope: AccessScope,
        id: Uuid,
    ) -> Result<Option<request::Model>, RepositoryError> {
        Request::find_by_id(id)
            .filter(visibility(scope))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        scope: AccessScope,
        status: Option<RequestStatus>,
        page: PageRequest,
    ) -> Result<Page<request::Model>, RepositoryError> {
        let mut query = Request::find().filter(visibility(scope));
        if let Some(status) = status {
            query = query.filter(request::Column::Status.eq(status));
        }

        let rows = query
            .order_by_desc(request::Column::CreatedAt)
            .order_by_desc(request::Column::Id)
            .offset(page.offset)
            .limit(page.fetch_limit())
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(Page::from_fetched(rows, page))
    }

    /// Edits a request. Only allowed until the first quote.
    ///
    /// Once providers have pending bids, only the notes may change: bid totals
    /// are priced against the stay and rooms as they were at submission.
    pub async fn update(
        &self,
        existing: request::Model,
        update: UpdateRequest,
    ) -> Result<request::Model, RepositoryError> {
        ensure_editable(&existing)?;
        if update.changes_terms() && self.pending_offering_count(existing.id).await? > 0 {
            return Err(RepositoryError::Conflict(
                "Request has pending offerings; only notes can be changed".to_string(),
            ));
        }

        let check_in = update.check_in.unwrap_or(existing.check_in);
        let check_out = update.check_out.unwrap_or(existing.check_out);
        let rooms = update.rooms.unwrap_or_else(|| existing.room_counts());
        validate_stay(check_in, check_out, &rooms)?;

        let mut active = existing.into_active_model();
        if let Some(city) = update.city {
            active.city = Set(validate_city(&city)?);
        }
        active.check_in = Set(check_in);
        active.check_out = Set(check_out);
        active.single_rooms = Set(rooms.single);
        active.double_rooms = Set(rooms.double);
        active.triple_rooms = Set(rooms.triple);
        active.quad_rooms = Set(rooms.quad);
        if let Some(package_type) = update.package_type {
            active.package_type = Set(package_type);
        }
        if update.notes.is_some() {
            active.notes = Set(normalize_notes(update.notes));
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn pending_offering_count(&self, request_id: Uuid) -> Result<u64, RepositoryError> {
        offering::Entity::find()
            .filter(offering::Column::RequestId.eq(request_id))
            .filter(offering::Column::Status.eq(offering::OfferingStatus::Pending))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, existing: request::Model) -> Result<(), RepositoryError> {
        ensure_editable(&existing)?;
        existing
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    /// Moves a request to `next` if it is currently in one of `from`.
    ///
    /// Returns whether a row changed, so concurrent transitions can be detected.
    pub async fn transition_status(
        &self,
        id: Uuid,
        from: &[RequestStatus],
        next: RequestStatus,
    ) -> Result<bool, RepositoryError> {
        let result = Request::update_many()
            .col_expr(request::Column::Status, Expr::value(next.to_value()))
            .col_expr(
                request::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(request::Column::Id.eq(id))
            .filter(request::Column::Status.is_in(from.iter().copied()))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<u64, RepositoryError> {
        Request::find()
            .filter(request::Column::Status.eq(status))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

/// Row filter implementing request visibility for `scope`.
pub(crate) fn visibility(scope: AccessScope) -> Condition {
    match scope {
        AccessScope::Admin => Condition::all(),
        AccessScope::Agent { workspace_id } => {
            Condition::all().add(request::Column::WorkspaceId.eq(workspace_id))
        }
        AccessScope::Provider { provider_id } => Condition::any()
            .add(request::Column::Status.is_in([RequestStatus::Submitted, RequestStatus::Quoted]))
            .add(
                request::Column::Id.in_subquery(
                    Query::select()
                        .column(offering::Column::RequestId)
                        .from(offering::Entity)
                        .and_where(offering::Column::ProviderId.eq(provider_id))
                        .to_owned(),
                ),
            ),
    }
}

fn ensure_editable(existing: &request::Model) -> Result<(), RepositoryError> {
    if existing.status != RequestStatus::Submitted {
        return Err(RepositoryError::Conflict(format!(
            "Request is {:?} and can no longer be changed",
            existing.status
        )));
    }
    Ok(())
}

fn validate_city(city: &str) -> Result<String, RepositoryError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(RepositoryError::validation_error("City cannot be empty"));
    }
    Ok(city.to_string())
}

fn validate_stay(
    check_in: NaiveDate,
    check_out: NaiveDate,
    rooms: &RoomCounts,
) -> Result<(), RepositoryError> {
    pricing::nights(check_in, check_out)
        .map_err(|e| RepositoryError::validation_error(e.to_string()))?;
    rooms
        .validate()
        .map_err(|e| RepositoryError::validation_error(e.to_string()))?;
    if rooms.total_rooms() == 0 {
        return Err(RepositoryError::validation_error(
            "At least one room must be requested",
        ));
    }
    Ok(())
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn stay_requires_rooms_and_positive_nights() {
        let rooms = RoomCounts {
            double: 2,
            ..Default::default()
        };
        assert!(validate_stay(date(1), date(3), &rooms).is_ok());
        assert!(validate_stay(date(3), date(3), &rooms).is_err());
        assert!(validate_stay(date(1), date(3), &RoomCounts::default()).is_err());

        let negative = RoomCounts {
            single: -1,
            double: 3,
            ..Default::default()
        };
        assert!(validate_stay(date(1), date(3), &negative).is_err());
    }

    #[test]
    fn notes_only_updates_leave_terms_alone() {
        let notes = UpdateRequest {
            notes: Some("Near Haram please".to_string()),
            ..Default::default()
        };
        assert!(!notes.changes_terms());

        let stay = UpdateRequest {
            check_out: Some(date(9)),
            ..Default::default()
        };
        assert!(stay.changes_terms());
    }

    #[test]
    fn only_submitted_requests_are_editable() {
        let now = Utc::now();
        let mut model = request::Model {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            city: "Madinah".to_string(),
            check_in: date(1),
            check_out: date(4),
            single_rooms: 0,
            double_rooms: 1,
            triple_rooms: 0,
            quad_rooms: 0,
            package_type: PackageType::RoomOnly,
            notes: None,
            status: RequestStatus::Submitted,
            created_at: now.into(),
            updated_at: now.into(),
        };
        assert!(ensure_editable(&model).is_ok());

        model.status = RequestStatus::Quoted;
        assert!(matches!(
            ensure_editable(&model),
            Err(RepositoryError::Conflict(_))
        ));
    }
}
