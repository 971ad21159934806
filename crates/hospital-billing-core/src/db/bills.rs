//! Saved bill database operations.

use std::str::FromStr;

use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Database, DbError, DbResult};
use crate::models::SavedBill;

/// Store-wide counters for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatistics {
    /// (category, item count), by category name
    pub items_by_category: Vec<(String, usize)>,
    pub total_items: usize,
    pub total_bills: usize,
    pub total_revenue: Decimal,
}

impl Database {
    /// Persist a finalized bill.
    pub fn save_bill(&self, bill: &SavedBill) -> DbResult<()> {
        let patient_json = serde_json::to_string(&bill.patient)?;
        let items_json = bill.items_json()?;

        self.conn.execute(
            r#"
            INSERT INTO bills (bill_id, bill_number, patient, items, total_amount, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                bill.bill_id,
                bill.bill_number,
                patient_json,
                items_json,
                bill.total_amount.to_string(),
                bill.created_at,
            ],
        )?;
        tracing::info!(bill_number = %bill.bill_number, total = %bill.total_amount, "bill saved");
        Ok(())
    }

    /// Get a bill by ID.
    pub fn get_bill(&self, bill_id: &str) -> DbResult<Option<SavedBill>> {
        self.conn
            .query_row(
                r#"
                SELECT bill_id, bill_number, patient, items, total_amount, created_at
                FROM bills
                WHERE bill_id = ?
                "#,
                [bill_id],
                BillRow::from_row,
            )
            .optional()?
            .map(SavedBill::try_from)
            .transpose()
    }

    /// Most recent bills first.
    pub fn list_bills(&self, limit: usize) -> DbResult<Vec<SavedBill>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT bill_id, bill_number, patient, items, total_amount, created_at
            FROM bills
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], BillRow::from_row)?;
        let mut bills = Vec::new();
        for row in rows {
            bills.push(row?.try_into()?);
        }
        Ok(bills)
    }

    pub fn statistics(&self) -> DbResult<StoreStatistics> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) FROM items GROUP BY category ORDER BY category COLLATE NOCASE",
        )?;
        let items_by_category = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let total_items = items_by_category.iter().map(|(_, n)| n).sum();

        // Amounts are decimal TEXT, so sum them here rather than in SQL.
        let mut stmt = self.conn.prepare("SELECT total_amount FROM bills")?;
        let amounts = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut total_revenue = Decimal::ZERO;
        for amount in &amounts {
            total_revenue += Decimal::from_str(amount)?;
        }

        Ok(StoreStatistics {
            items_by_category,
            total_items,
            total_bills: amounts.len(),
            total_revenue,
        })
    }
}

/// Intermediate row struct for database mapping.
struct BillRow {
    bill_id: String,
    bill_number: String,
    patient: String,
    items: String,
    total_amount: String,
    created_at: String,
}

impl BillRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            bill_id: row.get(0)?,
            bill_number: row.get(1)?,
            patient: row.get(2)?,
            items: row.get(3)?,
            total_amount: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl TryFrom<BillRow> for SavedBill {
    type Error = DbError;

    fn try_from(row: BillRow) -> Result<Self, Self::Error> {
        Ok(SavedBill {
            bill_id: row.bill_id,
            bill_number: row.bill_number,
            patient: serde_json::from_str(&row.patient)?,
            items: serde_json::from_str(&row.items)?,
            total_amount: Decimal::from_str(&row.total_amount)?,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillLineItem, Item, PatientInfo};
    use rust_decimal_macros::dec;

    fn line(id: u64, name: &str, total: Decimal) -> BillLineItem {
        BillLineItem {
            id,
            category: "Lab".into(),
            name: name.into(),
            item_type: String::new(),
            strength: String::new(),
            quantity: dec!(1),
            unit_price: total,
            total_price: total,
            description: String::new(),
            source_checkbox: None,
            bundled: false,
        }
    }

    fn bill(number: &str, created_at: &str, total: Decimal) -> SavedBill {
        let mut bill = SavedBill::new(
            number.into(),
            PatientInfo {
                name: "Rahim".into(),
                opd_number: "OPD-12".into(),
                ..Default::default()
            },
            vec![line(1, "CBC", total)],
        );
        bill.created_at = created_at.into();
        bill
    }

    #[test]
    fn test_save_and_get() {
        let db = Database::open_in_memory().unwrap();
        let saved = bill("OP-2024-000001", "2024-01-01T10:00:00Z", dec!(350.25));
        db.save_bill(&saved).unwrap();

        let loaded = db.get_bill(&saved.bill_id).unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(db.get_bill("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.save_bill(&bill("OP-1", "2024-01-01T10:00:00Z", dec!(100))).unwrap();
        db.save_bill(&bill("OP-3", "2024-01-03T10:00:00Z", dec!(300))).unwrap();
        db.save_bill(&bill("OP-2", "2024-01-02T10:00:00Z", dec!(200))).unwrap();

        let bills = db.list_bills(2).unwrap();
        let numbers: Vec<_> = bills.iter().map(|b| b.bill_number.as_str()).collect();
        assert_eq!(numbers, vec!["OP-3", "OP-2"]);
    }

    #[test]
    fn test_statistics() {
        let db = Database::open_in_memory().unwrap();
        db.add_item(&Item::new("Lab", "CBC", dec!(350))).unwrap();
        db.add_item(&Item::new("Lab", "RBS", dec!(150))).unwrap();
        db.add_item(&Item::new("Dr. Fee", "Consultant", dec!(800))).unwrap();
        db.save_bill(&bill("OP-1", "2024-01-01T10:00:00Z", dec!(100.50))).unwrap();
        db.save_bill(&bill("OP-2", "2024-01-02T10:00:00Z", dec!(200.25))).unwrap();

        let stats = db.statistics().unwrap();
        assert_eq!(stats.total_items, 3);
        assert_eq!(
            stats.items_by_category,
            vec![("Dr. Fee".to_string(), 1), ("Lab".to_string(), 2)]
        );
        assert_eq!(stats.total_bills, 2);
        assert_eq!(stats.total_revenue, dec!(300.75));
    }
}
