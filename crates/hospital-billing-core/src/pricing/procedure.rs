//! OR procedure pricing.
//!
//! total = base (complex, then discount) + additional surgeries
//!       + units × unit rate + C-Arm fee

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{format_taka, invalid, product, sum, PricingResult, Quote};
use crate::config::PricingConfig;
use crate::models::{Item, LineItemCandidate};

/// Category of manually entered OR lines.
pub const OR_CATEGORY: &str = "OR";

/// Modifiers applied to a surgery price.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SurgeryOptions {
    pub is_complex: bool,
    pub has_discount: bool,
    pub has_c_arm: bool,
}

/// Another surgery performed in the same session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalSurgery {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub options: SurgeryOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalSurgeryCost {
    pub name: String,
    /// Modified surgery price
    pub cost: Decimal,
    pub c_arm_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcedureRequest {
    /// Catalog procedure with modifiers
    Catalog {
        units: u32,
        options: SurgeryOptions,
        additional: Vec<AdditionalSurgery>,
    },
    /// Base price typed in by the operator
    Manual { base_price: Decimal },
}

/// A priced OR procedure, staged before it goes onto the bill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrSelection {
    pub procedure: String,
    /// Category the committed line is billed under
    pub category: String,
    pub units: u32,
    pub base_cost: Decimal,
    pub additional_surgeries: Vec<AdditionalSurgeryCost>,
    pub additional_surgeries_cost: Decimal,
    pub units_cost: Decimal,
    pub c_arm_cost: Decimal,
    pub is_complex: bool,
    pub has_discount: bool,
    pub total_cost: Decimal,
    pub manual: bool,
    pub explanation: String,
}

impl OrSelection {
    pub fn quote(&self) -> Quote {
        Quote {
            quantity: Decimal::ONE,
            unit_price: self.total_cost,
            total_price: self.total_cost,
            explanation: self.explanation.clone(),
        }
    }

    pub fn into_candidate(self) -> LineItemCandidate {
        LineItemCandidate {
            category: self.category,
            name: self.procedure,
            item_type: if self.manual { "Manual".into() } else { "Procedure".into() },
            strength: String::new(),
            quantity: Decimal::ONE,
            unit_price: self.total_cost,
            total_price: self.total_cost,
            description: self.explanation,
            source_checkbox: None,
            bundled: true,
        }
    }
}

/// Apply the complex multiplier, then the discount.
fn modified_price(price: Decimal, options: SurgeryOptions, config: &PricingConfig) -> PricingResult<Decimal> {
    let mut cost = price;
    if options.is_complex {
        cost = product(cost, config.complex_multiplier)?;
    }
    if options.has_discount {
        cost = product(cost, config.discount_multiplier)?;
    }
    Ok(cost)
}

fn c_arm(options: SurgeryOptions, config: &PricingConfig) -> Decimal {
    if options.has_c_arm {
        config.c_arm_fee
    } else {
        Decimal::ZERO
    }
}

pub fn price_procedure(
    item: &Item,
    request: &ProcedureRequest,
    config: &PricingConfig,
) -> PricingResult<OrSelection> {
    let (units, options, additional) = match request {
        ProcedureRequest::Manual { base_price } => {
            let mut selection = price_manual_procedure(&item.name, *base_price, config)?;
            selection.category = item.category.clone();
            return Ok(selection);
        }
        ProcedureRequest::Catalog {
            units,
            options,
            additional,
        } => (*units, *options, additional),
    };

    if item.price <= Decimal::ZERO {
        return Err(invalid(format!("'{}' has no price", item.name)));
    }

    let units = units.clamp(1, config.max_or_units.max(1));
    let base_cost = modified_price(item.price, options, config)?;

    let mut additional_surgeries = Vec::with_capacity(additional.len());
    for surgery in additional {
        if surgery.price <= Decimal::ZERO {
            return Err(invalid(format!(
                "additional surgery '{}' needs a price",
                surgery.name
            )));
        }
        additional_surgeries.push(AdditionalSurgeryCost {
            name: surgery.name.clone(),
            cost: modified_price(surgery.price, surgery.options, config)?,
            c_arm_cost: c_arm(surgery.options, config),
        });
    }
    let mut additional_surgeries_cost = Decimal::ZERO;
    for surgery in &additional_surgeries {
        additional_surgeries_cost = sum(additional_surgeries_cost, sum(surgery.cost, surgery.c_arm_cost)?)?;
    }

    let units_cost = product(Decimal::from(units), config.or_unit_rate)?;
    let c_arm_cost = c_arm(options, config);
    let total_cost = sum(sum(base_cost, additional_surgeries_cost)?, sum(units_cost, c_arm_cost)?)?;

    let mut parts = vec![format!("Base {}", format_taka(base_cost))];
    if additional_surgeries_cost > Decimal::ZERO {
        parts.push(format!("Additional {}", format_taka(additional_surgeries_cost)));
    }
    parts.push(format!("{} units {}", units, format_taka(units_cost)));
    if c_arm_cost > Decimal::ZERO {
        parts.push(format!("C-Arm {}", format_taka(c_arm_cost)));
    }
    let explanation = format!("{} = {}", parts.join(" + "), format_taka(total_cost));

    Ok(OrSelection {
        procedure: item.name.clone(),
        category: item.category.clone(),
        units,
        base_cost,
        additional_surgeries,
        additional_surgeries_cost,
        units_cost,
        c_arm_cost,
        is_complex: options.is_complex,
        has_discount: options.has_discount,
        total_cost,
        manual: false,
        explanation,
    })
}

/// Manual entry: base price plus one OR unit, no modifiers.
pub fn price_manual_procedure(
    name: &str,
    base_price: Decimal,
    config: &PricingConfig,
) -> PricingResult<OrSelection> {
    if name.trim().is_empty() {
        return Err(invalid("procedure name is required"));
    }
    if base_price <= Decimal::ZERO {
        return Err(invalid("manual procedure price must be positive"));
    }
    let units_cost = config.or_unit_rate;
    let total_cost = sum(base_price, units_cost)?;
    Ok(OrSelection {
        procedure: name.trim().to_string(),
        category: OR_CATEGORY.to_string(),
        units: 1,
        base_cost: base_price,
        additional_surgeries: Vec::new(),
        additional_surgeries_cost: Decimal::ZERO,
        units_cost,
        c_arm_cost: Decimal::ZERO,
        is_complex: false,
        has_discount: false,
        total_cost,
        manual: true,
        explanation: format!(
            "Base {} + 1 unit {} = {}",
            format_taka(base_price),
            format_taka(units_cost),
            format_taka(total_cost)
        ),
    })
}
