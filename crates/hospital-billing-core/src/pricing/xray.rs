//! X-ray view-combination pricing.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{format_taka, invalid, product, sum, PricingResult, Quote};
use crate::config::PricingConfig;
use crate::models::{Item, LineItemCandidate};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum XrayView {
    Ap,
    Lat,
    Oblique,
    Both,
}

impl fmt::Display for XrayView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            XrayView::Ap => "AP",
            XrayView::Lat => "LAT",
            XrayView::Oblique => "OBLIQUE",
            XrayView::Both => "BOTH",
        };
        f.write_str(s)
    }
}

/// Selected views. BOTH excludes the individual views and vice versa.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewSelection {
    ap: bool,
    lat: bool,
    oblique: bool,
    both: bool,
}

impl ViewSelection {
    /// Apply toggles in order, as a user clicking checkboxes would.
    pub fn from_views(views: impl IntoIterator<Item = XrayView>) -> Self {
        let mut selection = Self::default();
        for view in views {
            selection.set(view, true);
        }
        selection
    }

    pub fn set(&mut self, view: XrayView, on: bool) {
        match view {
            XrayView::Both => {
                self.both = on;
                if on {
                    self.ap = false;
                    self.lat = false;
                    self.oblique = false;
                }
            }
            single => {
                match single {
                    XrayView::Ap => self.ap = on,
                    XrayView::Lat => self.lat = on,
                    _ => self.oblique = on,
                }
                if on {
                    self.both = false;
                }
            }
        }
    }

    pub fn is_selected(&self, view: XrayView) -> bool {
        match view {
            XrayView::Ap => self.ap,
            XrayView::Lat => self.lat,
            XrayView::Oblique => self.oblique,
            XrayView::Both => self.both,
        }
    }

    pub fn views(&self) -> Vec<XrayView> {
        [XrayView::Ap, XrayView::Lat, XrayView::Oblique, XrayView::Both]
            .into_iter()
            .filter(|v| self.is_selected(*v))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        !(self.ap || self.lat || self.oblique || self.both)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XrayMode {
    Views(ViewSelection),
    /// Amount typed in by the operator
    Manual { amount: Decimal },
}

#[derive(Debug, Clone, PartialEq)]
pub struct XrayRequest {
    pub mode: XrayMode,
    pub portable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XrayQuote {
    /// Empty for manual pricing
    pub views: Vec<XrayView>,
    /// Cost before the portable surcharge
    pub base_cost: Decimal,
    pub portable_fee: Decimal,
    pub total: Decimal,
    /// Cheap BOTH view switched on the flexible rule
    pub flexible: bool,
    pub explanation: String,
}

impl XrayQuote {
    pub fn quote(&self) -> Quote {
        Quote {
            quantity: Decimal::ONE,
            unit_price: self.total,
            total_price: self.total,
            explanation: self.explanation.clone(),
        }
    }

    /// Bundled line named after the views, e.g. "Chest (AP + LAT, Portable)".
    pub fn into_candidate(self, item: &Item) -> LineItemCandidate {
        let tags: Vec<String> = self.views.iter().map(|v| v.to_string()).collect();
        let mut label = if tags.is_empty() {
            "Manual".to_string()
        } else {
            tags.join(" + ")
        };
        if self.portable_fee > Decimal::ZERO {
            label.push_str(", Portable");
        }
        let name = format!("{} ({})", item.name, label);
        LineItemCandidate::bundle(item, self.total, self.explanation).named(name)
    }
}

pub fn price_xray(item: &Item, request: &XrayRequest, config: &PricingConfig) -> PricingResult<XrayQuote> {
    let portable_fee = if request.portable {
        config.xray_portable_fee
    } else {
        Decimal::ZERO
    };

    let (views, base_cost, flexible, breakdown) = match &request.mode {
        XrayMode::Manual { amount } => {
            if *amount <= Decimal::ZERO {
                return Err(invalid("manual X-ray amount must be positive"));
            }
            (Vec::new(), *amount, false, format!("Manual {}", format_taka(*amount)))
        }
        XrayMode::Views(selection) => {
            if selection.is_empty() {
                return Err(invalid("select at least one X-ray view"));
            }
            let (cost, flexible) = view_cost(item, selection, config)?;
            let views = selection.views();
            let labels: Vec<String> = views.iter().map(|v| v.to_string()).collect();
            let breakdown = format!("{} {}", labels.join(" + "), format_taka(cost));
            (views, cost, flexible, breakdown)
        }
    };

    if base_cost <= Decimal::ZERO {
        return Err(invalid(format!("'{}' has no X-ray price", item.name)));
    }

    let total = sum(base_cost, portable_fee)?;
    let explanation = if portable_fee > Decimal::ZERO {
        format!(
            "{} + Portable {} = {}",
            breakdown,
            format_taka(portable_fee),
            format_taka(total)
        )
    } else {
        breakdown
    };

    Ok(XrayQuote {
        views,
        base_cost,
        portable_fee,
        total,
        flexible,
        explanation,
    })
}

fn view_cost(item: &Item, selection: &ViewSelection, config: &PricingConfig) -> PricingResult<(Decimal, bool)> {
    let pricing = item.xray_pricing.clone().unwrap_or_default();
    let flexible = pricing
        .both
        .is_some_and(|both| both < config.xray_flexible_threshold);

    if selection.both {
        let cost = match (pricing.both, pricing.ap, pricing.lat) {
            _ if flexible => item.price,
            (Some(both), _, _) => both,
            (None, Some(ap), Some(lat)) => sum(ap, lat)?,
            _ => product(item.price, Decimal::TWO)?,
        };
        return Ok((cost, flexible));
    }

    let singles = [
        (selection.ap, pricing.ap),
        (selection.lat, pricing.lat),
        (selection.oblique, pricing.oblique),
    ];
    let count = singles.iter().filter(|(on, _)| *on).count();
    let cost = match count {
        2 if flexible => item.price,
        3 if flexible => product(item.price, Decimal::TWO)?,
        _ => singles
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, price)| price.unwrap_or(item.price))
            .try_fold(Decimal::ZERO, sum)?,
    };
    Ok((cost, flexible))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::XrayPricing;
    use rust_decimal_macros::dec;

    fn chest(both: Decimal) -> Item {
        let mut item = Item::new("X-ray", "Chest", dec!(300));
        item.xray_pricing = Some(XrayPricing {
            ap: Some(dec!(300)),
            lat: Some(dec!(350)),
            oblique: Some(dec!(400)),
            both: Some(both),
        });
        item
    }

    fn views(list: &[XrayView], portable: bool) -> XrayRequest {
        XrayRequest {
            mode: XrayMode::Views(ViewSelection::from_views(list.iter().copied())),
            portable,
        }
    }

    fn total(item: &Item, request: XrayRequest) -> Decimal {
        price_xray(item, &request, &PricingConfig::default()).unwrap().total
    }

    #[test]
    fn test_flexible_two_and_three_views() {
        let item = chest(dec!(600));
        assert_eq!(total(&item, views(&[XrayView::Ap, XrayView::Lat], false)), dec!(300));
        assert_eq!(
            total(&item, views(&[XrayView::Ap, XrayView::Lat, XrayView::Oblique], false)),
            dec!(600)
        );
    }

    #[test]
    fn test_non_flexible_sums_views() {
        let item = chest(dec!(800));
        assert_eq!(total(&item, views(&[XrayView::Ap, XrayView::Lat], false)), dec!(650));
        assert_eq!(total(&item, views(&[XrayView::Oblique], false)), dec!(400));
    }

    #[test]
    fn test_both_view() {
        assert_eq!(total(&chest(dec!(800)), views(&[XrayView::Both], false)), dec!(800));
        assert_eq!(total(&chest(dec!(600)), views(&[XrayView::Both], false)), dec!(300));

        let mut no_both = chest(dec!(800));
        no_both.xray_pricing.as_mut().unwrap().both = None;
        assert_eq!(total(&no_both, views(&[XrayView::Both], false)), dec!(650));

        let bare = Item::new("X-ray", "Skull", dec!(250));
        assert_eq!(total(&bare, views(&[XrayView::Both], false)), dec!(500));
    }

    #[test]
    fn test_missing_view_price_uses_base() {
        let bare = Item::new("X-ray", "Skull", dec!(250));
        assert_eq!(total(&bare, views(&[XrayView::Ap, XrayView::Oblique], false)), dec!(500));
    }

    #[test]
    fn test_portable_surcharge() {
        let item = chest(dec!(800));
        let quote = price_xray(&item, &views(&[XrayView::Ap], true), &PricingConfig::default()).unwrap();
        assert_eq!(quote.base_cost, dec!(300));
        assert_eq!(quote.portable_fee, dec!(70));
        assert_eq!(quote.total, dec!(370));

        let candidate = quote.into_candidate(&item);
        assert_eq!(candidate.name, "Chest (AP, Portable)");
        assert!(candidate.bundled);
    }

    #[test]
    fn test_manual_mode() {
        let item = chest(dec!(800));
        let request = XrayRequest {
            mode: XrayMode::Manual { amount: dec!(450) },
            portable: true,
        };
        assert_eq!(total(&item, request), dec!(520));
    }

    #[test]
    fn test_empty_selection_rejected() {
        let item = chest(dec!(800));
        assert!(price_xray(&item, &views(&[], false), &PricingConfig::default()).is_err());
    }

    #[test]
    fn test_both_excludes_single_views() {
        let selection = ViewSelection::from_views([XrayView::Ap, XrayView::Lat, XrayView::Both]);
        assert_eq!(selection.views(), vec![XrayView::Both]);

        let selection = ViewSelection::from_views([XrayView::Both, XrayView::Oblique]);
        assert_eq!(selection.views(), vec![XrayView::Oblique]);
    }
}
