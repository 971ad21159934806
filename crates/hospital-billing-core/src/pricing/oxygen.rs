//! Time-based O2 and ISO billing.
//!
//! Oxygen is billed per liter delivered (flow × hours), ISO per minute of
//! use. The two services are priced independently and may be added together.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{format_taka, invalid, product, quotient, sum, PricingResult, Quote};
use crate::config::PricingConfig;
use crate::models::{LineItemCandidate, ServicePricing};
use crate::time::{elapsed, TimeGrain};

const HOURS_PER_DAY: Decimal = dec!(24);
const MINUTES_PER_HOUR: Decimal = dec!(60);

#[derive(Debug, Clone, PartialEq)]
pub struct OxygenRequest {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Overrides the tariff flow
    pub liters_per_hour: Option<Decimal>,
    /// Overrides the tariff rate
    pub rate_per_liter_hour: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsoRequest {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Overrides the tariff rate
    pub rate_per_minute: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct O2IsoRequest {
    pub oxygen: Option<OxygenRequest>,
    pub iso: Option<IsoRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OxygenCharge {
    pub hours: Decimal,
    pub liters_per_hour: Decimal,
    pub total_liters: Decimal,
    pub rate_per_liter_hour: Decimal,
    pub total_cost: Decimal,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsoCharge {
    pub minutes: Decimal,
    /// Display only
    pub hours: Decimal,
    /// Display only
    pub days: Decimal,
    pub rate_per_minute: Decimal,
    pub total_cost: Decimal,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct O2IsoQuote {
    pub oxygen: Option<OxygenCharge>,
    pub iso: Option<IsoCharge>,
    pub combined_total: Decimal,
}

impl OxygenCharge {
    pub fn quote(&self) -> Quote {
        Quote {
            quantity: self.total_liters,
            unit_price: self.rate_per_liter_hour,
            total_price: self.total_cost,
            explanation: self.explanation.clone(),
        }
    }
}

impl IsoCharge {
    pub fn quote(&self) -> Quote {
        Quote {
            quantity: self.minutes,
            unit_price: self.rate_per_minute,
            total_price: self.total_cost,
            explanation: self.explanation.clone(),
        }
    }
}

impl O2IsoQuote {
    /// One simple line per service: liters × rate, minutes × rate.
    pub fn into_candidates(self, category: &str) -> Vec<LineItemCandidate> {
        let line = |name: &str, item_type: &str, quote: Quote| LineItemCandidate {
            category: category.to_string(),
            name: name.to_string(),
            item_type: item_type.to_string(),
            strength: String::new(),
            quantity: quote.quantity,
            unit_price: quote.unit_price,
            total_price: quote.total_price,
            description: quote.explanation,
            source_checkbox: None,
            bundled: false,
        };

        let mut lines = Vec::new();
        if let Some(oxygen) = &self.oxygen {
            lines.push(line("O2", "Oxygen Service", oxygen.quote()));
        }
        if let Some(iso) = &self.iso {
            lines.push(line("ISO", "ISO Service", iso.quote()));
        }
        lines
    }
}

/// Price O2 and/or ISO. Any invalid range fails the whole calculation.
pub fn price_o2_iso(
    request: &O2IsoRequest,
    oxygen_tariff: Option<&ServicePricing>,
    iso_tariff: Option<&ServicePricing>,
    config: &PricingConfig,
) -> PricingResult<O2IsoQuote> {
    if request.oxygen.is_none() && request.iso.is_none() {
        return Err(invalid("enter O2 or ISO start and end times"));
    }

    let oxygen = request
        .oxygen
        .as_ref()
        .map(|r| price_oxygen(r, oxygen_tariff, config))
        .transpose()?;
    let iso = request
        .iso
        .as_ref()
        .map(|r| price_iso(r, iso_tariff, config))
        .transpose()?;

    let combined_total = sum(
        oxygen.as_ref().map_or(Decimal::ZERO, |c| c.total_cost),
        iso.as_ref().map_or(Decimal::ZERO, |c| c.total_cost),
    )?;

    Ok(O2IsoQuote {
        oxygen,
        iso,
        combined_total,
    })
}

fn price_oxygen(
    request: &OxygenRequest,
    tariff: Option<&ServicePricing>,
    config: &PricingConfig,
) -> PricingResult<OxygenCharge> {
    let hours = elapsed(request.start, request.end, TimeGrain::Hours)?;

    let flow = request
        .liters_per_hour
        .or_else(|| tariff.and_then(|t| t.liters_per_hour))
        .unwrap_or(config.o2_liters_per_hour);
    let tariff_rate = match tariff {
        Some(t) => oxygen_rate(t, config.o2_liters_per_hour)?,
        None => None,
    };
    let rate = request
        .rate_per_liter_hour
        .or(tariff_rate)
        .unwrap_or(config.o2_rate_per_liter_hour);
    if flow <= Decimal::ZERO || rate <= Decimal::ZERO {
        return Err(invalid("oxygen flow and rate must be positive"));
    }

    let total_liters = product(flow, hours)?;
    let total_cost = product(total_liters, rate)?;
    Ok(OxygenCharge {
        hours,
        liters_per_hour: flow,
        total_liters,
        rate_per_liter_hour: rate,
        total_cost,
        explanation: format!(
            "{} L/hr × {:.2} hr = {:.2} L × {} = {}",
            flow.normalize(),
            hours,
            total_liters,
            format_taka(rate),
            format_taka(total_cost)
        ),
    })
}

fn price_iso(
    request: &IsoRequest,
    tariff: Option<&ServicePricing>,
    config: &PricingConfig,
) -> PricingResult<IsoCharge> {
    let minutes = elapsed(request.start, request.end, TimeGrain::Minutes)?;

    let rate = request
        .rate_per_minute
        .or_else(|| tariff.and_then(iso_rate))
        .unwrap_or(config.iso_rate_per_minute);
    if rate <= Decimal::ZERO {
        return Err(invalid("ISO rate must be positive"));
    }

    let hours = minutes / MINUTES_PER_HOUR;
    let total_cost = product(minutes, rate)?;
    Ok(IsoCharge {
        minutes,
        hours,
        days: hours / HOURS_PER_DAY,
        rate_per_minute: rate,
        total_cost,
        explanation: format!(
            "{:.0} min × {} = {}",
            minutes,
            format_taka(rate),
            format_taka(total_cost)
        ),
    })
}

/// Per liter-hour rate from a tariff.
///
/// The base rate (else the price) buys one billing period, e.g. "1hour", at
/// the tariff flow. `default_flow` stands in when the tariff has none.
fn oxygen_rate(tariff: &ServicePricing, default_flow: Decimal) -> PricingResult<Option<Decimal>> {
    let Some(period_price) = tariff
        .base_rate
        .filter(|r| *r > Decimal::ZERO)
        .or(Some(tariff.price).filter(|p| *p > Decimal::ZERO))
    else {
        return Ok(None);
    };
    let flow = tariff
        .liters_per_hour
        .filter(|l| *l > Decimal::ZERO)
        .unwrap_or(default_flow);
    if flow <= Decimal::ZERO {
        return Ok(None);
    }
    let liter_hours = product(period_hours(&tariff.unit), flow)?;
    quotient(period_price, liter_hours).map(Some)
}

/// Length of a billing period label such as "1hour", "2 hours" or "30minute".
fn period_hours(unit: &str) -> Decimal {
    let unit = unit.trim().to_lowercase();
    let count: String = unit
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let count = count
        .parse::<Decimal>()
        .ok()
        .filter(|c| *c > Decimal::ZERO)
        .unwrap_or(Decimal::ONE);
    if unit.contains("min") {
        count / MINUTES_PER_HOUR
    } else {
        count
    }
}

/// Per minute rate from a tariff: explicit base rate, else price scaled by unit.
fn iso_rate(tariff: &ServicePricing) -> Option<Decimal> {
    if let Some(rate) = tariff.base_rate.filter(|r| *r > Decimal::ZERO) {
        return Some(rate);
    }
    if tariff.price <= Decimal::ZERO {
        return None;
    }
    if tariff.unit.to_lowercase().contains("hour") {
        Some(tariff.price / MINUTES_PER_HOUR)
    } else {
        Some(tariff.price)
    }
}
