//! # Pricing
//!
//! Margin and stay-cost arithmetic. Amounts are integer minor currency units;
//! margins are percentages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Upper bound accepted for an admin margin, in percent.
pub const MAX_MARGIN_PERCENT: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("check-out date must be after check-in date")]
    InvalidStay,
    #[error("margin must be between 0 and {max} percent, got {value}")]
    InvalidMargin { value: f64, max: f64 },
    #[error("no price given for requested {0} rooms")]
    MissingPrice(RoomCategory),
    #[error("{0} room price cannot be negative")]
    NegativePrice(RoomCategory),
    #[error("room count cannot be negative")]
    NegativeCount,
    #[error("price calculation overflowed")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomCategory {
    Single,
    Double,
    Triple,
    Quad,
}

impl std::fmt::Display for RoomCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoomCategory::Single => "single",
            RoomCategory::Double => "double",
            RoomCategory::Triple => "triple",
            RoomCategory::Quad => "quad",
        };
        f.write_str(name)
    }
}

/// Number of rooms requested per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RoomCounts {
    pub single: i32,
    pub double: i32,
    pub triple: i32,
    pub quad: i32,
}

impl RoomCounts {
    pub fn entries(&self) -> [(RoomCategory, i32); 4] {
        [
            (RoomCategory::Single, self.single),
            (RoomCategory::Double, self.double),
            (RoomCategory::Triple, self.triple),
            (RoomCategory::Quad, self.quad),
        ]
    }

    pub fn total_rooms(&self) -> i64 {
        self.entries().iter().map(|(_, count)| *count as i64).sum()
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.entries().iter().any(|(_, count)| *count < 0) {
            return Err(PricingError::NegativeCount);
        }
        Ok(())
    }
}

/// Nightly price per room, per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoomPrices {
    pub single: Option<i64>,
    pub double: Option<i64>,
    pub triple: Option<i64>,
    pub quad: Option<i64>,
}

impl RoomPrices {
    pub fn get(&self, category: RoomCategory) -> Option<i64> {
        match category {
            RoomCategory::Single => self.single,
            RoomCategory::Double => self.double,
            RoomCategory::Triple => self.triple,
            RoomCategory::Quad => self.quad,
        }
    }

    fn entries(&self) -> [(RoomCategory, Option<i64>); 4] {
        [
            (RoomCategory::Single, self.single),
            (RoomCategory::Double, self.double),
            (RoomCategory::Triple, self.triple),
            (RoomCategory::Quad, self.quad),
        ]
    }

    /// Rejects negative prices and prices missing for requested categories.
    pub fn validate_for(&self, counts: &RoomCounts) -> Result<(), PricingError> {
        for (category, price) in self.entries() {
            if price.is_some_and(|value| value < 0) {
                return Err(PricingError::NegativePrice(category));
            }
        }
        for (category, count) in counts.entries() {
            if count > 0 && self.get(category).is_none() {
                return Err(PricingError::MissingPrice(category));
            }
        }
        Ok(())
    }
}

pub fn validate_margin(margin_percent: f64) -> Result<(), PricingError> {
    if !margin_percent.is_finite() || !(0.0..=MAX_MARGIN_PERCENT).contains(&margin_percent) {
        return Err(PricingError::InvalidMargin {
            value: margin_percent,
            max: MAX_MARGIN_PERCENT,
        });
    }
    Ok(())
}

/// `base * (1 + margin / 100)`, rounded half away from zero to a minor unit.
pub fn final_price(base: i64, margin_percent: f64) -> Result<i64, PricingError> {
    validate_margin(margin_percent)?;
    let adjusted = (base as f64 * (1.0 + margin_percent / 100.0)).round();
    if !adjusted.is_finite() || adjusted.abs() >= i64::MAX as f64 {
        return Err(PricingError::Overflow);
    }
    Ok(adjusted as i64)
}

/// Applies the margin to every priced category.
pub fn apply_margin(prices: &RoomPrices, margin_percent: f64) -> Result<RoomPrices, PricingError> {
    let adjust = |price: Option<i64>| price.map(|p| final_price(p, margin_percent)).transpose();
    Ok(RoomPrices {
        single: adjust(prices.single)?,
        double: adjust(prices.double)?,
        triple: adjust(prices.triple)?,
        quad: adjust(prices.quad)?,
    })
}

/// Nights between check-in and check-out.
pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> Result<i64, PricingError> {
    let nights = (check_out - check_in).num_days();
    if nights <= 0 {
        return Err(PricingError::InvalidStay);
    }
    Ok(nights)
}

/// Cost of one night for all requested rooms. Unrequested categories are ignored.
pub fn nightly_cost(counts: &RoomCounts, prices: &RoomPrices) -> Result<i64, PricingError> {
    counts.validate()?;
    prices.validate_for(counts)?;

    counts
        .entries()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .try_fold(0i64, |total, (category, count)| {
            let price = prices
                .get(category)
                .ok_or(PricingError::MissingPrice(category))?;
            price
                .checked_mul(count as i64)
                .and_then(|line| total.checked_add(line))
                .ok_or(PricingError::Overflow)
        })
}

/// Cost of the whole stay.
pub fn stay_cost(counts: &RoomCounts, prices: &RoomPrices, nights: i64) -> Result<i64, PricingError> {
    if nights <= 0 {
        return Err(PricingError::InvalidStay);
    }
    nightly_cost(counts, prices)?
        .checked_mul(nights)
        .ok_or(PricingError::Overflow)
}

/// `amount * rate / 100`, rounded half away from zero.
pub fn percentage_of(amount: i64, rate_percent: f64) -> Result<i64, PricingError> {
    let value = (amount as f64 * rate_percent / 100.0).round();
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return Err(PricingError::Overflow);
    }
    Ok(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn final_price_applies_margin() {
        assert_eq!(final_price(10_000, 10.0).unwrap(), 11_000);
        assert_eq!(final_price(10_000, 0.0).unwrap(), 10_000);
        assert_eq!(final_price(45_050, 12.5).unwrap(), 50_681);
    }

    #[test]
    fn final_price_rounds_half_away_from_zero() {
        // 333 * 1.15 = 382.95
        assert_eq!(final_price(333, 15.0).unwrap(), 383);
        // 5 * 1.5 = 7.5
        assert_eq!(final_price(5, 50.0).unwrap(), 8);
    }

    #[test]
    fn margin_bounds_are_enforced() {
        assert!(validate_margin(-1.0).is_err());
        assert!(validate_margin(f64::NAN).is_err());
        assert!(validate_margin(f64::INFINITY).is_err());
        assert!(validate_margin(MAX_MARGIN_PERCENT + 0.5).is_err());
        assert!(validate_margin(MAX_MARGIN_PERCENT).is_ok());
    }

    #[test]
    fn nights_requires_positive_stay() {
        assert_eq!(nights(date(2025, 3, 1), date(2025, 3, 4)).unwrap(), 3);
        assert_eq!(
            nights(date(2025, 3, 4), date(2025, 3, 4)),
            Err(PricingError::InvalidStay)
        );
        assert_eq!(
            nights(date(2025, 3, 5), date(2025, 3, 4)),
            Err(PricingError::InvalidStay)
        );
    }

    #[test]
    fn stay_cost_sums_categories_across_nights() {
        let counts = RoomCounts {
            single: 2,
            double: 1,
            triple: 0,
            quad: 0,
        };
        let prices = RoomPrices {
            single: Some(30_000),
            double: Some(45_000),
            triple: None,
            quad: None,
        };

        assert_eq!(nightly_cost(&counts, &prices).unwrap(), 105_000);
        assert_eq!(stay_cost(&counts, &prices, 4).unwrap(), 420_000);
    }

    #[test]
    fn unrequested_categories_may_be_unpriced_but_requested_may_not() {
        let counts = RoomCounts {
            single: 0,
            double: 0,
            triple: 1,
            quad: 0,
        };
        let prices = RoomPrices {
            single: Some(100),
            ..Default::default()
        };

        assert_eq!(
            nightly_cost(&counts, &prices),
            Err(PricingError::MissingPrice(RoomCategory::Triple))
        );
    }

    #[test]
    fn negative_inputs_are_rejected() {
        let counts = RoomCounts {
            single: 1,
            ..Default::default()
        };
        let prices = RoomPrices {
            single: Some(-5),
            ..Default::default()
        };
        assert_eq!(
            nightly_cost(&counts, &prices),
            Err(PricingError::NegativePrice(RoomCategory::Single))
        );

        let counts = RoomCounts {
            single: -1,
            ..Default::default()
        };
        assert_eq!(
            nightly_cost(&counts, &RoomPrices::default()),
            Err(PricingError::NegativeCount)
        );
    }

    #[test]
    fn overflow_is_reported() {
        let counts = RoomCounts {
            quad: i32::MAX,
            ..Default::default()
        };
        let prices = RoomPrices {
            quad: Some(i64::MAX / 2),
            ..Default::default()
        };
        assert_eq!(nightly_cost(&counts, &prices), Err(PricingError::Overflow));
    }

    #[test]
    fn apply_margin_keeps_unpriced_categories_empty() {
        let prices = RoomPrices {
            single: Some(20_000),
            double: None,
            triple: Some(30_000),
            quad: None,
        };
        let adjusted = apply_margin(&prices, 20.0).unwrap();
        assert_eq!(adjusted.single, Some(24_000));
        assert_eq!(adjusted.double, None);
        assert_eq!(adjusted.triple, Some(36_000));
        assert_eq!(adjusted.quad, None);
    }

    #[test]
    fn percentage_of_rounds() {
        assert_eq!(percentage_of(100_000, 5.0).unwrap(), 5_000);
        assert_eq!(percentage_of(999, 2.5).unwrap(), 25);
        assert_eq!(percentage_of(0, 7.0).unwrap(), 0);
    }
}
