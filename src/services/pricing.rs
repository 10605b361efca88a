use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub days: u32,
    pub price_cents: i64,
}

/// Per-bike rental prices keyed by day count, sorted by `days`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceTable {
    tiers: Vec<PriceTier>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let tiers = [
            (1, 9_000),
            (2, 17_000),
            (3, 24_000),
            (4, 30_000),
            (5, 36_000),
            (6, 41_000),
            (7, 45_000),
            (10, 62_000),
            (14, 80_000),
            (21, 112_000),
            (30, 150_000),
        ]
        .into_iter()
        .map(|(days, price_cents)| PriceTier { days, price_cents })
        .collect();
        Self { tiers }
    }
}

impl PriceTable {
    pub fn new(mut tiers: Vec<PriceTier>) -> anyhow::Result<Self> {
        if tiers.is_empty() {
            return Err(anyhow::anyhow!("price table must have at least one tier"));
        }
        tiers.sort_by_key(|t| t.days);
        for tier in &tiers {
            if tier.days == 0 {
                return Err(anyhow::anyhow!("price tier days must be at least 1"));
            }
            if tier.price_cents <= 0 {
                return Err(anyhow::anyhow!(
                    "price for {} day(s) must be positive",
                    tier.days
                ));
            }
        }
        if let Some(pair) = tiers.windows(2).find(|w| w[0].days == w[1].days) {
            return Err(anyhow::anyhow!("duplicate price tier for {} day(s)", pair[0].days));
        }
        Ok(Self { tiers })
    }

    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let tiers: Vec<PriceTier> = serde_json::from_str(s)?;
        Self::new(tiers)
    }

    pub fn tiers(&self) -> &[PriceTier] {
        &self.tiers
    }

    /// Per-bike price for a rental of `days` days, or `None` if it does not
    /// fit in an `i64`.
    ///
    /// Exact tiers win. Day counts between two tiers are interpolated
    /// linearly towards the next-higher tier, and rentals longer than the
    /// largest tier scale that tier's price proportionally. Derived prices
    /// are rounded up to a whole currency unit.
    pub fn price_for_days(&self, days: u32) -> Option<i64> {
        let first = self.tiers[0];
        let last = self.tiers[self.tiers.len() - 1];

        if days <= first.days {
            return Some(first.price_cents);
        }

        if days > last.days {
            let raw = div_ceil(last.price_cents.checked_mul(days as i64)?, last.days as i64)?;
            return round_up_to_unit(raw);
        }

        match self.tiers.binary_search_by_key(&days, |t| t.days) {
            Ok(idx) => Some(self.tiers[idx].price_cents),
            Err(upper_idx) => {
                let lower = self.tiers[upper_idx - 1];
                let upper = self.tiers[upper_idx];
                let span = (upper.days - lower.days) as i64;
                let step = (upper.price_cents - lower.price_cents)
                    .checked_mul((days - lower.days) as i64)?;
                round_up_to_unit(lower.price_cents.checked_add(div_ceil(step, span)?)?)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub table: PriceTable,
    pub down_payment_percent: i64,
    pub deposit_per_bike_cents: i64,
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            table: PriceTable::default(),
            down_payment_percent: 30,
            deposit_per_bike_cents: 50_000,
            currency: "eur".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: u32,
    pub quantity: u32,
    pub price_per_bike_cents: i64,
    pub total_cents: i64,
    pub down_payment_cents: i64,
    pub deposit_cents: i64,
    pub currency: String,
}

/// Largest number of motorcycles a single booking may request.
pub const MAX_BIKES_PER_BOOKING: u32 = 100;

/// Longest rental accepted, in days.
pub const MAX_RENTAL_DAYS: u32 = 365;

/// Inclusive calendar days between pickup and return.
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> u32 {
    ((end - start).num_days() + 1).max(0) as u32
}

pub fn validate_range(start: NaiveDate, end: NaiveDate, quantity: u32) -> Result<(), AppError> {
    if end < start {
        return Err(AppError::Validation(
            "end_date must not be before start_date".to_string(),
        ));
    }
    if quantity == 0 {
        return Err(AppError::Validation(
            "at least one motorcycle must be requested".to_string(),
        ));
    }
    if quantity > MAX_BIKES_PER_BOOKING {
        return Err(AppError::Validation(format!(
            "at most {MAX_BIKES_PER_BOOKING} motorcycles can be booked at once"
        )));
    }
    if rental_days(start, end) > MAX_RENTAL_DAYS {
        return Err(AppError::Validation(format!(
            "rentals are limited to {MAX_RENTAL_DAYS} days"
        )));
    }
    Ok(())
}

pub fn quote(
    config: &PricingConfig,
    start: NaiveDate,
    end: NaiveDate,
    quantity: u32,
) -> Result<Quote, AppError> {
    validate_range(start, end, quantity)?;

    let days = rental_days(start, end);
    let price_per_bike_cents = config.table.price_for_days(days).ok_or_else(price_overflow)?;
    let total_cents = price_per_bike_cents
        .checked_mul(quantity as i64)
        .ok_or_else(price_overflow)?;
    let deposit_cents = config
        .deposit_per_bike_cents
        .checked_mul(quantity as i64)
        .ok_or_else(price_overflow)?;

    Ok(Quote {
        start_date: start,
        end_date: end,
        days,
        quantity,
        price_per_bike_cents,
        total_cents,
        down_payment_cents: down_payment_for(config, total_cents)?,
        deposit_cents,
        currency: config.currency.clone(),
    })
}

pub fn down_payment_for(config: &PricingConfig, total_cents: i64) -> Result<i64, AppError> {
    let scaled = total_cents
        .checked_mul(config.down_payment_percent)
        .ok_or_else(price_overflow)?;
    let down = div_ceil(scaled, 100).ok_or_else(price_overflow)?;
    Ok(down.min(total_cents))
}

fn price_overflow() -> AppError {
    AppError::Validation("price is out of range".to_string())
}

fn div_ceil(num: i64, den: i64) -> Option<i64> {
    Some(num.checked_add(den - 1)? / den)
}

fn round_up_to_unit(cents: i64) -> Option<i64> {
    div_ceil(cents, 100)?.checked_mul(100)
}
