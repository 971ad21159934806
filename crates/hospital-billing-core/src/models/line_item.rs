//! Bill line item models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::item::Item;

/// A priced row proposed for the bill, before the cart assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItemCandidate {
    pub category: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub strength: String,
    /// Dispensed quantity; informational only for bundled lines
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    /// Human-readable calculation summary
    pub description: String,
    /// UI toggle that produced this line, used to reverse the addition
    pub source_checkbox: Option<String>,
    /// Total is a pre-computed bundle cost rather than quantity × unit price
    pub bundled: bool,
}

impl LineItemCandidate {
    /// A line whose total is quantity × unit price.
    pub fn simple(item: &Item, quantity: Decimal, unit_price: Decimal, description: String) -> Self {
        Self {
            category: item.category.clone(),
            name: item.name.clone(),
            item_type: item.item_type.clone(),
            strength: item.strength.clone(),
            quantity,
            unit_price,
            total_price: quantity * unit_price,
            description,
            source_checkbox: None,
            bundled: false,
        }
    }

    /// A line priced as a bundle (multi-view X-ray, OR with add-ons, room fee).
    pub fn bundle(item: &Item, total: Decimal, description: String) -> Self {
        Self {
            category: item.category.clone(),
            name: item.name.clone(),
            item_type: item.item_type.clone(),
            strength: item.strength.clone(),
            quantity: Decimal::ONE,
            unit_price: total,
            total_price: total,
            description,
            source_checkbox: None,
            bundled: true,
        }
    }

    /// Override the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Tag the line with the UI toggle that produced it.
    pub fn with_checkbox(mut self, checkbox_id: impl Into<String>) -> Self {
        self.source_checkbox = Some(checkbox_id.into());
        self
    }
}

/// A row in the bill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillLineItem {
    /// Unique within the session
    pub id: u64,
    pub category: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub strength: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub description: String,
    pub source_checkbox: Option<String>,
    pub bundled: bool,
}

impl BillLineItem {
    pub(crate) fn from_candidate(id: u64, candidate: LineItemCandidate) -> Self {
        Self {
            id,
            category: candidate.category,
            name: candidate.name,
            item_type: candidate.item_type,
            strength: candidate.strength,
            quantity: candidate.quantity,
            unit_price: candidate.unit_price,
            total_price: candidate.total_price,
            description: candidate.description,
            source_checkbox: candidate.source_checkbox,
            bundled: candidate.bundled,
        }
    }

    /// Whether `candidate` can be folded into this line without changing
    /// what one unit costs.
    pub(crate) fn accepts(&self, candidate: &LineItemCandidate) -> bool {
        !self.bundled && !candidate.bundled && self.unit_price == candidate.unit_price
    }

    /// Fold another candidate for the same (name, category) into this line.
    /// Callers check [`BillLineItem::accepts`] first.
    pub(crate) fn absorb(&mut self, candidate: &LineItemCandidate) {
        self.quantity += candidate.quantity;
        self.total_price = self.quantity * self.unit_price;
    }
}
