//! Bill totals and per-category subtotals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::BillLineItem;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySubtotal {
    pub category: String,
    pub line_count: usize,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub grand_total: Decimal,
    pub line_count: usize,
    /// In order of first appearance on the bill
    pub subtotals: Vec<CategorySubtotal>,
}

impl Totals {
    pub fn compute(lines: &[BillLineItem]) -> Self {
        let mut subtotals: Vec<CategorySubtotal> = Vec::new();
        for line in lines {
            match subtotals.iter_mut().find(|s| s.category == line.category) {
                Some(entry) => {
                    entry.line_count += 1;
                    entry.subtotal += line.total_price;
                }
                None => subtotals.push(CategorySubtotal {
                    category: line.category.clone(),
                    line_count: 1,
                    subtotal: line.total_price,
                }),
            }
        }

        Self {
            grand_total: lines.iter().map(|l| l.total_price).sum(),
            line_count: lines.len(),
            subtotals,
        }
    }

    pub fn subtotal(&self, category: &str) -> Decimal {
        self.subtotals
            .iter()
            .find(|s| s.category == category)
            .map_or(Decimal::ZERO, |s| s.subtotal)
    }
}
