//! Catalog item models.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::registry::{CategoryRegistry, PricingShape};

static STRENGTH_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?|\.\d+").expect("valid strength pattern"));

/// Reasons a catalog item is rejected by the item store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ItemError {
    #[error("Item name is required")]
    MissingName,

    #[error("Price must be greater than zero for '{0}'")]
    NonPositivePrice(String),

    #[error("Price of '{0}' is too large")]
    PriceTooLarge(String),

    #[error("X-ray item '{0}' needs AP, LAT, OBLIQUE and BOTH prices")]
    IncompleteXrayPricing(String),

    #[error("O2/ISO item '{0}' needs oxygen or ISO pricing")]
    MissingServicePricing(String),

    #[error("Room item '{0}' needs a room type and daily rate")]
    MissingRoomDetails(String),
}

/// A single billable entry in the hospital catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Store-assigned identifier (None until inserted)
    pub id: Option<i64>,
    /// Category key (e.g., "Medicine", "X-ray", "Dr. Fee")
    pub category: String,
    /// Optional subcategory within the category
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Display name
    pub name: String,
    /// Free-form type (e.g., "Tablet", "Syrup", "Oxygen Service")
    #[serde(rename = "type", default)]
    pub item_type: String,
    /// Free-form strength with an embedded number (e.g., "500mg", "100 ml")
    #[serde(default)]
    pub strength: String,
    /// Base price; per-unit, per-view or per-day depending on category
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    /// Per-view X-ray prices
    #[serde(default)]
    pub xray_pricing: Option<XrayPricing>,
    /// Oxygen tariff
    #[serde(default)]
    pub oxygen_pricing: Option<ServicePricing>,
    /// ISO tariff
    #[serde(default)]
    pub iso_pricing: Option<ServicePricing>,
    /// Bed/cabin details
    #[serde(default)]
    pub room: Option<RoomDetails>,
    /// Seeded by the system rather than entered by a user
    #[serde(default)]
    pub is_system_data: bool,
}

/// Per-view X-ray prices. Missing views fall back to the item's base price.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct XrayPricing {
    pub ap: Option<Decimal>,
    pub lat: Option<Decimal>,
    pub oblique: Option<Decimal>,
    pub both: Option<Decimal>,
}

/// Time-based service tariff (O2 or ISO).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePricing {
    /// Billing unit label (e.g., "1hour", "1minute")
    pub unit: String,
    /// Price per billing unit
    pub price: Decimal,
    /// Oxygen flow (O2 only)
    #[serde(default)]
    pub liters_per_hour: Option<Decimal>,
    /// Price of one billing period at the tariff flow (O2) or per minute (ISO)
    #[serde(default)]
    pub base_rate: Option<Decimal>,
}

/// Bed or cabin classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    General,
    Private,
}

/// Bed/cabin details for room-priced items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetails {
    pub room_type: RoomType,
    /// e.g., "Private 1"
    #[serde(default)]
    pub private_type: Option<String>,
    pub daily_rate: Decimal,
}

impl Item {
    /// Create a new item with required fields.
    pub fn new(category: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: None,
            category: category.into(),
            subcategory: None,
            name: name.into(),
            item_type: String::new(),
            strength: String::new(),
            price,
            description: String::new(),
            xray_pricing: None,
            oxygen_pricing: None,
            iso_pricing: None,
            room: None,
            is_system_data: false,
        }
    }

    /// Pricing shape of this item's category.
    pub fn shape(&self) -> PricingShape {
        CategoryRegistry::builtin().shape_of(&self.category)
    }

    /// First number embedded in the strength text, or zero.
    pub fn strength_value(&self) -> Decimal {
        parse_strength(&self.strength)
    }

    /// Case- and whitespace-insensitive (name, category) key.
    pub fn identity_key(&self) -> (String, String) {
        (normalize_key(&self.name), normalize_key(&self.category))
    }

    /// Validate and normalize before the item is stored.
    ///
    /// X-ray items take the cheapest view price as their base price.
    pub fn prepare_for_store(&mut self) -> Result<(), ItemError> {
        if self.name.trim().is_empty() {
            return Err(ItemError::MissingName);
        }

        match self.shape() {
            PricingShape::Xray => {
                let pricing = self
                    .xray_pricing
                    .as_ref()
                    .ok_or_else(|| ItemError::IncompleteXrayPricing(self.name.clone()))?;
                let views = [pricing.ap, pricing.lat, pricing.oblique, pricing.both];
                if views.iter().any(|v| v.map_or(true, |p| p <= Decimal::ZERO)) {
                    return Err(ItemError::IncompleteXrayPricing(self.name.clone()));
                }
                if let Some(min) = views.iter().flatten().min() {
                    self.price = *min;
                }
            }
            PricingShape::O2Iso => {
                if self.oxygen_pricing.is_none() && self.iso_pricing.is_none() {
                    return Err(ItemError::MissingServicePricing(self.name.clone()));
                }
            }
            PricingShape::Room => {
                if let Some(room) = &self.room {
                    if room.daily_rate <= Decimal::ZERO {
                        return Err(ItemError::MissingRoomDetails(self.name.clone()));
                    }
                    self.price = room.daily_rate;
                }
            }
            _ => {}
        }

        if self.price <= Decimal::ZERO {
            return Err(ItemError::NonPositivePrice(self.name.clone()));
        }
        Ok(())
    }

    /// Merge a newer record for the same (name, category) into this one.
    ///
    /// Non-empty text from `newer` wins, the higher positive price is kept and
    /// X-ray view prices are merged by maximum.
    pub fn merged_with(&self, newer: &Item) -> Item {
        let mut merged = self.clone();
        if !newer.item_type.trim().is_empty() {
            merged.item_type = newer.item_type.clone();
        }
        if !newer.strength.trim().is_empty() {
            merged.strength = newer.strength.clone();
        }
        merged.price = choose_better_price(self.price, newer.price);
        merged.xray_pricing = merge_xray_pricing(self.xray_pricing.as_ref(), newer.xray_pricing.as_ref());
        if merged.oxygen_pricing.is_none() {
            merged.oxygen_pricing = newer.oxygen_pricing.clone();
        }
        if merged.iso_pricing.is_none() {
            merged.iso_pricing = newer.iso_pricing.clone();
        }
        if merged.room.is_none() {
            merged.room = newer.room.clone();
        }
        merged
    }
}

/// Extract the first embedded decimal number (e.g., "500mg" → 500, "2.5 ml" → 2.5).
pub fn parse_strength(strength: &str) -> Decimal {
    STRENGTH_NUMBER
        .find(strength)
        .and_then(|m| Decimal::from_str(m.as_str()).ok())
        .unwrap_or(Decimal::ZERO)
}

/// Higher of two positive prices, otherwise whichever is non-zero.
pub fn choose_better_price(existing: Decimal, incoming: Decimal) -> Decimal {
    let existing = existing.max(Decimal::ZERO);
    let incoming = incoming.max(Decimal::ZERO);
    if existing > Decimal::ZERO && incoming > Decimal::ZERO {
        existing.max(incoming)
    } else if incoming > Decimal::ZERO {
        incoming
    } else {
        existing
    }
}

/// Per-view maximum of two X-ray price sets.
pub fn merge_xray_pricing(
    existing: Option<&XrayPricing>,
    incoming: Option<&XrayPricing>,
) -> Option<XrayPricing> {
    match (existing, incoming) {
        (None, None) => None,
        (Some(e), None) => Some(e.clone()),
        (None, Some(n)) => Some(n.clone()),
        (Some(e), Some(n)) => {
            let pick = |a: Option<Decimal>, b: Option<Decimal>| {
                let best = a.unwrap_or_default().max(b.unwrap_or_default());
                (best > Decimal::ZERO).then_some(best)
            };
            Some(XrayPricing {
                ap: pick(e.ap, n.ap),
                lat: pick(e.lat, n.lat),
                oblique: pick(e.oblique, n.oblique),
                both: pick(e.both, n.both),
            })
        }
    }
}

pub(crate) fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn xray_item() -> Item {
        let mut item = Item::new("X-ray", "Chest", dec!(0));
        item.xray_pricing = Some(XrayPricing {
            ap: Some(dec!(350)),
            lat: Some(dec!(300)),
            oblique: Some(dec!(400)),
            both: Some(dec!(600)),
        });
        item
    }

    #[test]
    fn test_parse_strength() {
        assert_eq!(parse_strength("500mg"), dec!(500));
        assert_eq!(parse_strength("Amoxicillin 2.5 ml/5ml"), dec!(2.5));
        assert_eq!(parse_strength(".5 g"), dec!(0.5));
        assert_eq!(parse_strength("n/a"), Decimal::ZERO);
        assert_eq!(parse_strength(""), Decimal::ZERO);
    }

    #[test]
    fn test_xray_base_price_is_cheapest_view() {
        let mut item = xray_item();
        item.prepare_for_store().unwrap();
        assert_eq!(item.price, dec!(300));
    }

    #[test]
    fn test_xray_requires_all_views() {
        let mut item = xray_item();
        item.xray_pricing.as_mut().unwrap().oblique = None;
        assert_eq!(
            item.prepare_for_store(),
            Err(ItemError::IncompleteXrayPricing("Chest".into()))
        );
    }

    #[test]
    fn test_standard_item_requires_price_and_name() {
        let mut item = Item::new("Lab", "CBC", dec!(0));
        assert!(matches!(item.prepare_for_store(), Err(ItemError::NonPositivePrice(_))));

        let mut unnamed = Item::new("Lab", "  ", dec!(100));
        assert_eq!(unnamed.prepare_for_store(), Err(ItemError::MissingName));
    }

    #[test]
    fn test_o2_iso_requires_service_pricing() {
        let mut item = Item::new("O2, ISO", "O2", dec!(130));
        assert!(matches!(
            item.prepare_for_store(),
            Err(ItemError::MissingServicePricing(_))
        ));
    }

    #[test]
    fn test_choose_better_price() {
        assert_eq!(choose_better_price(dec!(100), dec!(120)), dec!(120));
        assert_eq!(choose_better_price(dec!(100), dec!(0)), dec!(100));
        assert_eq!(choose_better_price(dec!(0), dec!(80)), dec!(80));
    }

    #[test]
    fn test_merge_prefers_new_text_and_higher_prices() {
        let mut base = Item::new("Medicine", "Napa", dec!(2));
        base.item_type = "Tablet".into();
        base.strength = "500mg".into();

        let mut newer = Item::new("Medicine", "napa ", dec!(3));
        newer.strength = "".into();
        newer.item_type = "Tablet ER".into();

        let merged = base.merged_with(&newer);
        assert_eq!(merged.item_type, "Tablet ER");
        assert_eq!(merged.strength, "500mg");
        assert_eq!(merged.price, dec!(3));
        assert_eq!(base.identity_key(), newer.identity_key());
    }

    #[test]
    fn test_merge_xray_pricing_by_view() {
        let a = XrayPricing { ap: Some(dec!(300)), lat: None, oblique: Some(dec!(500)), both: None };
        let b = XrayPricing { ap: Some(dec!(350)), lat: Some(dec!(200)), oblique: None, both: None };
        let merged = merge_xray_pricing(Some(&a), Some(&b)).unwrap();
        assert_eq!(merged.ap, Some(dec!(350)));
        assert_eq!(merged.lat, Some(dec!(200)));
        assert_eq!(merged.oblique, Some(dec!(500)));
        assert_eq!(merged.both, None);
    }
}
