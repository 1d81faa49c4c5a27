//! # Hotel Repository
//!
//! Provider-owned hotel records.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::cursor::{Page, PageRequest};
use crate::error::RepositoryError;
use crate::models::hotel::{self, Entity as Hotel};

#[derive(Debug, Clone)]
pub struct HotelInput {
    pub name: String,
    pub city: String,
    pub star_rating: Option<i16>,
    pub address: Option<String>,
}

pub struct HotelRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> HotelRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        provider_id: Uuid,
        input: HotelInput,
    ) -> Result<hotel::Model, RepositoryError> {
        let input = validate_hotel(input)?;
        let now = Utc::now();

        hotel::ActiveModel {
            id: Set(Uuid::new_v4()),
            provider_id: Set(provider_id),
            name: Set(input.name),
            city: Set(input.city),
            star_rating: Set(input.star_rating),
            address: Set(input.address),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<hotel::Model>, RepositoryError> {
        Hotel::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Lists hotels, restricted to one provider when `provider_id` is set.
    pub async fn list(
        &self,
        provider_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<hotel::Model>, RepositoryError> {
        let mut query = Hotel::find();
        if let Some(provider_id) = provider_id {
            query = query.filter(hotel::Column::ProviderId.eq(provider_id));
        }

        let rows = query
            .order_by_asc(hotel::Column::Name)
            .order_by_asc(hotel::Column::Id)
            .offset(page.offset)
            .limit(page.fetch_limit())
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(Page::from_fetched(rows, page))
    }

    pub async fn update(
        &self,
        existing: hotel::Model,
        input: HotelInput,
    ) -> Result<hotel::Model, RepositoryError> {
        let input = validate_hotel(input)?;

        let mut active = existing.into_active_model();
        active.name = Set(input.name);
        active.city = Set(input.city);
        active.star_rating = Set(input.star_rating);
        active.address = Set(input.address);
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, existing: hotel::Model) -> Result<(), RepositoryError> {
        existing
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

fn validate_hotel(input: HotelInput) -> Result<HotelInput, RepositoryError> {
    let name = input.name.trim().to_string();
    let city = input.city.trim().to_string();

    if name.is_empty() {
        return Err(RepositoryError::validation_error("Hotel name cannot be empty"));
    }
    if city.is_empty() {
        return Err(RepositoryError::validation_error("Hotel city cannot be empty"));
    }
    if let Some(stars) = input.star_rating
        && !(1..=5).contains(&stars)
    {
        return Err(RepositoryError::validation_error(
            "Star rating must be between 1 and 5",
        ));
    }

    Ok(HotelInput {
        name,
        city,
        star_rating: input.star_rating,
        address: input
            .address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(stars: Option<i16>) -> HotelInput {
        HotelInput {
            name: " Dar Al Eiman ".to_string(),
            city: "Makkah".to_string(),
            star_rating: stars,
            address: Some("  ".to_string()),
        }
    }

    #[test]
    fn hotel_input_is_normalized() {
        let validated = validate_hotel(input(Some(4))).unwrap();
        assert_eq!(validated.name, "Dar Al Eiman");
        assert_eq!(validated.address, None);
    }

    #[test]
    fn star_rating_out_of_range_is_rejected() {
        assert!(validate_hotel(input(Some(0))).is_err());
        assert!(validate_hotel(input(Some(6))).is_err());
        assert!(validate_hotel(input(None)).is_ok());
    }
}
