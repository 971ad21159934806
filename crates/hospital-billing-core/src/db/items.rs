//! Catalog item database operations.

use std::collections::HashMap;
use std::str::FromStr;

use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use super::{Database, DbError, DbResult};
use crate::models::{normalize_key, Item, ItemError, ServicePricing, XrayPricing};

/// Category holding the O2 and ISO tariffs.
pub const O2_ISO_CATEGORY: &str = "O2, ISO";

const ITEM_COLUMNS: &str = "id, category, subcategory, name, type, strength, price, description, \
                            xray_pricing, oxygen_pricing, iso_pricing, room, is_system_data";

/// Minimum score for a fuzzy search hit.
const SEARCH_THRESHOLD: f64 = 0.55;

/// Existing items sharing a new item's name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateCheck {
    /// Same name, same category
    pub exact_matches: Vec<Item>,
    /// Same name, other category
    pub similar_matches: Vec<Item>,
}

impl DuplicateCheck {
    pub fn is_duplicate(&self) -> bool {
        !self.exact_matches.is_empty()
    }

    pub fn has_similar(&self) -> bool {
        !self.similar_matches.is_empty()
    }
}

/// Result of [`Database::add_item_or_merge`].
#[derive(Debug, Clone, PartialEq)]
pub enum ItemWrite {
    Inserted(Item),
    /// Folded into the existing row
    Merged(Item),
}

impl ItemWrite {
    pub fn item(&self) -> &Item {
        match self {
            ItemWrite::Inserted(item) | ItemWrite::Merged(item) => item,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub duplicates_removed: usize,
    pub groups_merged: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CopyReport {
    pub copied: usize,
    /// Source item names with no counterpart in the target category
    pub unmatched: Vec<String>,
}

/// A fuzzy search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemMatch {
    pub item: Item,
    /// 0.0 - 1.0
    pub score: f64,
}

impl Database {
    /// Validate and insert a new item. Exact duplicates are rejected unless
    /// the item is system data.
    pub fn add_item(&self, item: &Item) -> DbResult<Item> {
        let mut item = item.clone();
        item.prepare_for_store()?;

        if !item.is_system_data && self.check_duplicate(&item)?.is_duplicate() {
            return Err(DbError::Duplicate {
                name: item.name.clone(),
                category: item.category.clone(),
            });
        }

        let id = self.insert_row(&item)?;
        item.id = Some(id);
        tracing::info!(id, category = %item.category, name = %item.name, "item added");
        Ok(item)
    }

    /// Insert, or merge into the existing (name, category) row.
    pub fn add_item_or_merge(&self, item: &Item) -> DbResult<ItemWrite> {
        let mut incoming = item.clone();
        incoming.prepare_for_store()?;

        match self.check_duplicate(&incoming)?.exact_matches.into_iter().next() {
            Some(existing) => {
                let merged = existing.merged_with(&incoming);
                self.write_row(&merged)?;
                tracing::info!(id = ?merged.id, name = %merged.name, "item merged into existing entry");
                Ok(ItemWrite::Merged(merged))
            }
            None => {
                let id = self.insert_row(&incoming)?;
                incoming.id = Some(id);
                Ok(ItemWrite::Inserted(incoming))
            }
        }
    }

    /// Validate and overwrite an existing item.
    pub fn update_item(&self, item: &Item) -> DbResult<Item> {
        let mut item = item.clone();
        item.prepare_for_store()?;
        self.write_row(&item)?;
        Ok(item)
    }

    /// Delete an item by ID.
    pub fn delete_item(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM items WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Delete every item in a category.
    pub fn clear_category(&self, category: &str) -> DbResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM items WHERE lower(trim(category)) = ?",
            [normalize_key(category)],
        )?;
        tracing::info!(category, removed, "category cleared");
        Ok(removed)
    }

    /// Get an item by ID.
    pub fn get_item(&self, id: i64) -> DbResult<Option<Item>> {
        let sql = format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS);
        let row = self.conn.query_row(&sql, [id], ItemRow::from_row).optional()?;
        row.map(Item::try_from).transpose()
    }

    /// All items, oldest first.
    pub fn get_all_items(&self) -> DbResult<Vec<Item>> {
        let sql = format!("SELECT {} FROM items ORDER BY id", ITEM_COLUMNS);
        self.query_items(&sql, params![])
    }

    /// Items in a category (case-insensitive), by name.
    pub fn get_items_by_category(&self, category: &str) -> DbResult<Vec<Item>> {
        let sql = format!(
            "SELECT {} FROM items WHERE lower(trim(category)) = ? ORDER BY name COLLATE NOCASE, id",
            ITEM_COLUMNS
        );
        self.query_items(&sql, [normalize_key(category)])
    }

    /// Find items sharing this item's name.
    pub fn check_duplicate(&self, item: &Item) -> DbResult<DuplicateCheck> {
        let sql = format!(
            "SELECT {} FROM items WHERE lower(trim(name)) = ? ORDER BY id",
            ITEM_COLUMNS
        );
        let same_name = self.query_items(&sql, [normalize_key(&item.name)])?;
        let category = normalize_key(&item.category);

        let (exact_matches, similar_matches) = same_name
            .into_iter()
            .filter(|existing| item.id.is_none() || existing.id != item.id)
            .partition(|existing| normalize_key(&existing.category) == category);

        Ok(DuplicateCheck {
            exact_matches,
            similar_matches,
        })
    }

    /// Merge every (name, category) group into its oldest row.
    pub fn cleanup_duplicates(&mut self) -> DbResult<CleanupReport> {
        let items = self.get_all_items()?;

        let mut groups: HashMap<(String, String), Vec<Item>> = HashMap::new();
        let mut order = Vec::new();
        for item in items {
            let key = item.identity_key();
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(item);
        }

        let mut report = CleanupReport::default();
        let tx = self.conn.transaction()?;
        for key in order {
            let Some(group) = groups.remove(&key) else {
                continue;
            };
            let mut rest = group.into_iter();
            let Some(base) = rest.next() else {
                continue;
            };
            let duplicates: Vec<Item> = rest.collect();
            if duplicates.is_empty() {
                continue;
            }

            let merged = duplicates.iter().fold(base, |acc, dup| acc.merged_with(dup));
            write_row_on(&tx, &merged)?;
            for dup in &duplicates {
                tx.execute("DELETE FROM items WHERE id = ?", [dup.id])?;
            }
            report.duplicates_removed += duplicates.len();
            report.groups_merged += 1;
        }
        tx.commit()?;

        tracing::info!(
            removed = report.duplicates_removed,
            groups = report.groups_merged,
            "duplicate cleanup finished"
        );
        Ok(report)
    }

    /// Scale every price in a category by `percent` (e.g. 10 for +10%),
    /// rounded to 2 decimal places, half away from zero.
    pub fn adjust_category_pricing(&mut self, category: &str, percent: Decimal) -> DbResult<usize> {
        let factor = Decimal::ONE + percent / dec!(100);
        if factor <= Decimal::ZERO {
            return Err(DbError::InvalidItem(ItemError::NonPositivePrice(
                format!("{}% adjustment of {}", percent, category),
            )));
        }

        let items = self.get_items_by_category(category)?;
        let tx = self.conn.transaction()?;
        for item in &items {
            let mut adjusted = item.clone();
            adjusted.price = scale(item.price, factor, &item.name)?;
            if let Some(x) = adjusted.xray_pricing.as_mut() {
                for view in [&mut x.ap, &mut x.lat, &mut x.oblique, &mut x.both] {
                    *view = view.map(|p| scale(p, factor, &item.name)).transpose()?;
                }
            }
            if let Some(room) = adjusted.room.as_mut() {
                room.daily_rate = scale(room.daily_rate, factor, &item.name)?;
            }
            write_row_on(&tx, &adjusted)?;
        }
        tx.commit()?;

        tracing::info!(category, %percent, items = items.len(), "category pricing adjusted");
        Ok(items.len())
    }

    /// Copy prices (and X-ray view prices) onto same-named items of another
    /// category.
    pub fn copy_category_pricing(&mut self, source: &str, target: &str) -> DbResult<CopyReport> {
        let source_items = self.get_items_by_category(source)?;
        let target_items = self.get_items_by_category(target)?;

        let mut report = CopyReport::default();
        let tx = self.conn.transaction()?;
        for src in &source_items {
            let name = normalize_key(&src.name);
            match target_items.iter().find(|t| normalize_key(&t.name) == name) {
                Some(dest) => {
                    let mut updated = dest.clone();
                    updated.price = src.price;
                    if src.xray_pricing.is_some() {
                        updated.xray_pricing = src.xray_pricing.clone();
                    }
                    write_row_on(&tx, &updated)?;
                    report.copied += 1;
                }
                None => report.unmatched.push(src.name.clone()),
            }
        }
        tx.commit()?;

        tracing::info!(source, target, copied = report.copied, "category pricing copied");
        Ok(report)
    }

    /// Insert default O2 and ISO tariffs when the category is empty.
    ///
    /// Returns whether anything was inserted.
    pub fn seed_default_o2_iso(&self) -> DbResult<bool> {
        if !self.get_items_by_category(O2_ISO_CATEGORY)?.is_empty() {
            return Ok(false);
        }

        for item in default_o2_iso_items() {
            self.add_item(&item)?;
        }
        tracing::info!("default O2/ISO pricing configured");
        Ok(true)
    }

    /// Fuzzy name search, best first.
    pub fn search_items(&self, query: &str, category: Option<&str>, limit: usize) -> DbResult<Vec<ItemMatch>> {
        let query = normalize_key(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let items = match category {
            Some(c) => self.get_items_by_category(c)?,
            None => self.get_all_items()?,
        };

        let mut matches: Vec<ItemMatch> = items
            .into_iter()
            .map(|item| {
                let score = name_score(&query, &normalize_key(&item.name));
                ItemMatch { item, score }
            })
            .filter(|m| m.score >= SEARCH_THRESHOLD)
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);
        Ok(matches)
    }

    fn query_items<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, ItemRow::from_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?.try_into()?);
        }
        Ok(items)
    }

    fn insert_row(&self, item: &Item) -> DbResult<i64> {
        let row = ItemRow::try_from(item)?;
        self.conn.execute(
            r#"
            INSERT INTO items (
                category, subcategory, name, type, strength, price, description,
                xray_pricing, oxygen_pricing, iso_pricing, room, is_system_data
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                row.category,
                row.subcategory,
                row.name,
                row.item_type,
                row.strength,
                row.price,
                row.description,
                row.xray_pricing,
                row.oxygen_pricing,
                row.iso_pricing,
                row.room,
                row.is_system_data,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn write_row(&self, item: &Item) -> DbResult<()> {
        write_row_on(&self.conn, item)
    }
}

/// Overwrite an existing row (works on a connection or a transaction).
fn write_row_on(conn: &rusqlite::Connection, item: &Item) -> DbResult<()> {
    let id = item
        .id
        .ok_or_else(|| DbError::NotFound(format!("item '{}' has no id", item.name)))?;
    let row = ItemRow::try_from(item)?;
    let rows_affected = conn.execute(
        r#"
        UPDATE items SET
            category = ?2,
            subcategory = ?3,
            name = ?4,
            type = ?5,
            strength = ?6,
            price = ?7,
            description = ?8,
            xray_pricing = ?9,
            oxygen_pricing = ?10,
            iso_pricing = ?11,
            room = ?12,
            is_system_data = ?13,
            updated_at = datetime('now')
        WHERE id = ?1
        "#,
        params![
            id,
            row.category,
            row.subcategory,
            row.name,
            row.item_type,
            row.strength,
            row.price,
            row.description,
            row.xray_pricing,
            row.oxygen_pricing,
            row.iso_pricing,
            row.room,
            row.is_system_data,
        ],
    )?;
    if rows_affected == 0 {
        return Err(DbError::NotFound(format!("item {}", id)));
    }
    Ok(())
}

fn scale(price: Decimal, factor: Decimal, name: &str) -> Result<Decimal, ItemError> {
    price
        .checked_mul(factor)
        .map(|p| p.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .ok_or_else(|| ItemError::PriceTooLarge(name.to_string()))
}

/// Combined Jaro-Winkler / Levenshtein similarity, with substring hits
/// ranked near the top.
fn name_score(query: &str, name: &str) -> f64 {
    let fuzzy = jaro_winkler(query, name) * 0.6 + normalized_levenshtein(query, name) * 0.4;
    if name.starts_with(query) {
        fuzzy.max(0.95)
    } else if name.contains(query) {
        fuzzy.max(0.85)
    } else {
        fuzzy
    }
}

/// O2 at 2 L/hr for 130 (65 per liter-hour) and ISO at 30 per minute.
pub fn default_o2_iso_items() -> Vec<Item> {
    let mut o2 = Item::new(O2_ISO_CATEGORY, "O2 (Default)", dec!(130));
    o2.item_type = "Oxygen Service".into();
    o2.description = "Default O2 service - 2L per hour at ৳130".into();
    o2.oxygen_pricing = Some(ServicePricing {
        unit: "1hour".into(),
        price: dec!(130),
        liters_per_hour: Some(dec!(2)),
        base_rate: Some(dec!(130)),
    });
    o2.is_system_data = true;

    let mut iso = Item::new(O2_ISO_CATEGORY, "ISO (Default)", dec!(30));
    iso.item_type = "ISO Service".into();
    iso.description = "Default ISO service - ৳30 per minute".into();
    iso.iso_pricing = Some(ServicePricing {
        unit: "1minute".into(),
        price: dec!(30),
        liters_per_hour: None,
        base_rate: Some(dec!(30)),
    });
    iso.is_system_data = true;

    vec![o2, iso]
}

/// Intermediate row struct for database mapping.
struct ItemRow {
    id: Option<i64>,
    category: String,
    subcategory: Option<String>,
    name: String,
    item_type: String,
    strength: String,
    price: String,
    description: String,
    xray_pricing: Option<String>,
    oxygen_pricing: Option<String>,
    iso_pricing: Option<String>,
    room: Option<String>,
    is_system_data: bool,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category: row.get(1)?,
            subcategory: row.get(2)?,
            name: row.get(3)?,
            item_type: row.get(4)?,
            strength: row.get(5)?,
            price: row.get(6)?,
            description: row.get(7)?,
            xray_pricing: row.get(8)?,
            oxygen_pricing: row.get(9)?,
            iso_pricing: row.get(10)?,
            room: row.get(11)?,
            is_system_data: row.get(12)?,
        })
    }
}

impl TryFrom<&Item> for ItemRow {
    type Error = DbError;

    fn try_from(item: &Item) -> Result<Self, Self::Error> {
        Ok(ItemRow {
            id: item.id,
            category: item.category.trim().to_string(),
            subcategory: item.subcategory.clone(),
            name: item.name.trim().to_string(),
            item_type: item.item_type.clone(),
            strength: item.strength.clone(),
            price: item.price.to_string(),
            description: item.description.clone(),
            xray_pricing: to_json(item.xray_pricing.as_ref())?,
            oxygen_pricing: to_json(item.oxygen_pricing.as_ref())?,
            iso_pricing: to_json(item.iso_pricing.as_ref())?,
            room: to_json(item.room.as_ref())?,
            is_system_data: item.is_system_data,
        })
    }
}

impl TryFrom<ItemRow> for Item {
    type Error = DbError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Item {
            id: row.id,
            category: row.category,
            subcategory: row.subcategory,
            name: row.name,
            item_type: row.item_type,
            strength: row.strength,
            price: Decimal::from_str(&row.price)?,
            description: row.description,
            xray_pricing: from_json::<XrayPricing>(row.xray_pricing)?,
            oxygen_pricing: from_json(row.oxygen_pricing)?,
            iso_pricing: from_json(row.iso_pricing)?,
            room: from_json(row.room)?,
            is_system_data: row.is_system_data,
        })
    }
}

fn to_json<T: Serialize>(value: Option<&T>) -> DbResult<Option<String>> {
    Ok(value.map(serde_json::to_string).transpose()?)
}

fn from_json<T: for<'de> Deserialize<'de>>(value: Option<String>) -> DbResult<Option<T>> {
    Ok(value.map(|s| serde_json::from_str(&s)).transpose()?)
}
