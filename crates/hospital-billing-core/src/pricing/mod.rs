//! Pricing rules engine.
//!
//! One pure rule per pricing shape:
//! - [`medicine`]: dose → dispensing units
//! - [`xray`]: view-combination pricing
//! - [`oxygen`]: time-based O2/ISO billing
//! - [`procedure`]: OR surcharge stacking
//! - [`room`]: inpatient seat & admission fee
//! - standard: quantity × price
//!
//! [`PricingEngine::price`] looks the item's category up once in the
//! registry and runs the matching rule.

pub mod medicine;
pub mod oxygen;
pub mod procedure;
pub mod room;
pub mod xray;

pub use medicine::*;
pub use oxygen::*;
pub use procedure::*;
pub use room::*;
pub use xray::*;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PricingConfig;
use crate::models::{Item, LineItemCandidate};
use crate::registry::{CategoryRegistry, PricingShape};
use crate::time::TimeError;

/// Pricing errors. No line item is produced when a rule fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid time range: {0}")]
    InvalidRange(#[from] TimeError),

    #[error("Category '{category}' is priced as {expected:?}, not {requested:?}")]
    ShapeMismatch {
        category: String,
        expected: PricingShape,
        requested: PricingShape,
    },
}

pub type PricingResult<T> = Result<T, PricingError>;

pub(crate) fn invalid(msg: impl Into<String>) -> PricingError {
    PricingError::InvalidInput(msg.into())
}

fn too_large() -> PricingError {
    invalid("amount is too large to price")
}

// Overflow-checked arithmetic for amounts derived from operator input.

pub(crate) fn product(a: Decimal, b: Decimal) -> PricingResult<Decimal> {
    a.checked_mul(b).ok_or_else(too_large)
}

pub(crate) fn sum(a: Decimal, b: Decimal) -> PricingResult<Decimal> {
    a.checked_add(b).ok_or_else(too_large)
}

pub(crate) fn quotient(a: Decimal, b: Decimal) -> PricingResult<Decimal> {
    a.checked_div(b).ok_or_else(too_large)
}

/// Render an amount as Bangladeshi Taka with two decimals.
pub fn format_taka(amount: Decimal) -> String {
    format!("৳{:.2}", amount)
}

/// Common result shape of every rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub explanation: String,
}

/// Input for quantity × price categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StandardRequest {
    /// Defaults to 1
    pub quantity: Option<Decimal>,
}

/// Structured input, one variant per pricing shape.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingInput {
    Standard(StandardRequest),
    Medicine(MedicineRequest),
    Xray(XrayRequest),
    Room(RoomRequest),
    O2Iso(O2IsoRequest),
    Procedure(ProcedureRequest),
}

impl PricingInput {
    pub fn shape(&self) -> PricingShape {
        match self {
            PricingInput::Standard(_) => PricingShape::Standard,
            PricingInput::Medicine(_) => PricingShape::Medicine,
            PricingInput::Xray(_) => PricingShape::Xray,
            PricingInput::Room(_) => PricingShape::Room,
            PricingInput::O2Iso(_) => PricingShape::O2Iso,
            PricingInput::Procedure(_) => PricingShape::Procedure,
        }
    }
}

/// Stateless rule dispatcher.
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: PricingConfig,
    registry: CategoryRegistry,
}

impl PricingEngine {
    pub fn new(config: PricingConfig, registry: CategoryRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// Price an item into bill line candidates.
    ///
    /// Rejects input whose shape differs from the item's category shape.
    pub fn price(&self, item: &Item, input: &PricingInput) -> PricingResult<Vec<LineItemCandidate>> {
        let expected = self.registry.shape_of(&item.category);
        if input.shape() != expected {
            return Err(PricingError::ShapeMismatch {
                category: item.category.clone(),
                expected,
                requested: input.shape(),
            });
        }

        let candidates = match input {
            PricingInput::Standard(request) => {
                let quote = self.standard(item, request)?;
                vec![LineItemCandidate::simple(
                    item,
                    quote.quantity,
                    quote.unit_price,
                    quote.explanation,
                )]
            }
            PricingInput::Medicine(request) => vec![self.medicine(item, request)?.into_candidate(item)],
            PricingInput::Xray(request) => vec![self.xray(item, request)?.into_candidate(item)],
            PricingInput::Room(request) => vec![self.room(Some(item), request)?.into_candidate(item)],
            PricingInput::O2Iso(request) => self
                .o2_iso(
                    request,
                    item.oxygen_pricing.as_ref(),
                    item.iso_pricing.as_ref(),
                )?
                .into_candidates(&item.category),
            PricingInput::Procedure(request) => {
                vec![self.procedure(item, request)?.into_candidate()]
            }
        };

        tracing::debug!(
            category = %item.category,
            item = %item.name,
            lines = candidates.len(),
            "priced item"
        );
        Ok(candidates)
    }

    /// quantity × price.
    pub fn standard(&self, item: &Item, request: &StandardRequest) -> PricingResult<Quote> {
        if item.price <= Decimal::ZERO {
            return Err(invalid(format!("'{}' has no price", item.name)));
        }
        let quantity = request.quantity.unwrap_or(Decimal::ONE);
        if quantity <= Decimal::ZERO {
            return Err(invalid("quantity must be positive"));
        }
        let total = product(quantity, item.price)?;
        Ok(Quote {
            quantity,
            unit_price: item.price,
            total_price: total,
            explanation: format!(
                "{} × {} = {}",
                quantity.normalize(),
                format_taka(item.price),
                format_taka(total)
            ),
        })
    }

    /// Medicine dose-to-quantity rule.
    pub fn medicine(&self, item: &Item, request: &MedicineRequest) -> PricingResult<DoseCalculation> {
        calculate_dose(item, request)
    }

    /// X-ray view pricing rule.
    pub fn xray(&self, item: &Item, request: &XrayRequest) -> PricingResult<XrayQuote> {
        price_xray(item, request, &self.config)
    }

    /// O2/ISO time-based rule. Catalog tariffs override configured defaults.
    pub fn o2_iso(
        &self,
        request: &O2IsoRequest,
        oxygen_tariff: Option<&crate::models::ServicePricing>,
        iso_tariff: Option<&crate::models::ServicePricing>,
    ) -> PricingResult<O2IsoQuote> {
        price_o2_iso(request, oxygen_tariff, iso_tariff, &self.config)
    }

    /// OR procedure rule.
    pub fn procedure(&self, item: &Item, request: &ProcedureRequest) -> PricingResult<OrSelection> {
        price_procedure(item, request, &self.config)
    }

    /// Manually entered OR procedure (base + one unit).
    pub fn manual_procedure(&self, name: &str, base_price: Decimal) -> PricingResult<OrSelection> {
        price_manual_procedure(name, base_price, &self.config)
    }

    /// Seat & admission fee. The item, when given, supplies the bed rate.
    pub fn room(&self, item: Option<&Item>, request: &RoomRequest) -> PricingResult<RoomQuote> {
        price_room(item, request, &self.config)
    }
}
