//! Item usage counters backing smart suggestions.

use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::{Database, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageStat {
    pub category: String,
    pub item_name: String,
    pub count: u64,
    pub last_used: String,
}

impl Database {
    /// Count one use of an item.
    pub fn record_usage(&self, category: &str, item_name: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO usage_stats (category, item_name, count, last_used)
            VALUES (?1, ?2, 1, datetime('now'))
            ON CONFLICT(category, item_name) DO UPDATE SET
                count = count + 1,
                last_used = datetime('now')
            "#,
            params![category.trim(), item_name.trim()],
        )?;
        Ok(())
    }

    /// Most used items in a category.
    pub fn top_used(&self, category: &str, limit: usize) -> DbResult<Vec<UsageStat>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT category, item_name, count, last_used
            FROM usage_stats
            WHERE category = ?1 COLLATE NOCASE
            ORDER BY count DESC, last_used DESC, item_name
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![category.trim(), limit as i64], |row| {
            Ok(UsageStat {
                category: row.get(0)?,
                item_name: row.get(1)?,
                count: row.get::<_, i64>(2)? as u64,
                last_used: row.get(3)?,
            })
        })?;

        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_rank() {
        let db = Database::open_in_memory().unwrap();
        db.record_usage("Lab", "CBC").unwrap();
        db.record_usage("Lab", "RBS").unwrap();
        db.record_usage("Lab", "CBC").unwrap();
        db.record_usage("Medicine", "Napa").unwrap();

        let top = db.top_used("lab", 10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].item_name, "CBC");
        assert_eq!(top[0].count, 2);

        assert_eq!(db.top_used("Lab", 1).unwrap().len(), 1);
        assert!(db.top_used("X-ray", 5).unwrap().is_empty());
    }
}
