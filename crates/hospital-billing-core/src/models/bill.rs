//! Saved bill models.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::line_item::BillLineItem;

/// Patient header printed on a bill.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    pub name: String,
    pub opd_number: String,
    pub hospital_number: String,
    /// `YYYY-MM-DD`, inpatient only
    pub admission_date: Option<String>,
    /// `YYYY-MM-DD`, inpatient only
    pub discharge_date: Option<String>,
}

/// A finalized bill snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedBill {
    /// Unique bill ID
    pub bill_id: String,
    /// Human-facing number (e.g., "IP-2024-512345")
    pub bill_number: String,
    pub patient: PatientInfo,
    pub items: Vec<BillLineItem>,
    pub total_amount: Decimal,
    pub created_at: String,
}

impl SavedBill {
    /// Snapshot the given lines under a new bill ID.
    pub fn new(bill_number: String, patient: PatientInfo, items: Vec<BillLineItem>) -> Self {
        let total_amount = items.iter().map(|i| i.total_price).sum();
        Self {
            bill_id: uuid::Uuid::new_v4().to_string(),
            bill_number,
            patient,
            items,
            total_amount,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Serialize line items for storage.
    pub fn items_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.items)
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// `{prefix}-{year}-{last six digits of the millisecond timestamp}`.
pub fn generate_bill_number(prefix: &str, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().unsigned_abs();
    format!("{}-{}-{:06}", prefix, now.year(), millis % 1_000_000)
}
