//! Item store and usage tracking contracts.
//!
//! Pricing and cart code never touch storage directly; callers load items
//! through [`ItemStore`] and pass them in as plain data.

use crate::db::{Database, DbError};
use crate::models::Item;

/// Persistent catalog of billable items.
pub trait ItemStore {
    type Error: std::error::Error;

    fn items_by_category(&self, category: &str) -> Result<Vec<Item>, Self::Error>;
    fn all_items(&self) -> Result<Vec<Item>, Self::Error>;
    fn add_item(&self, item: &Item) -> Result<Item, Self::Error>;
    fn update_item(&self, item: &Item) -> Result<Item, Self::Error>;
    fn delete_item(&self, id: i64) -> Result<bool, Self::Error>;
    fn clear_category(&self, category: &str) -> Result<usize, Self::Error>;
}

/// Best-effort usage counter.
pub trait UsageRecorder {
    type Error: std::error::Error;

    fn record_usage(&self, category: &str, item_name: &str) -> Result<(), Self::Error>;
}

/// Items for a picker. A store failure is distinct from an empty category.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryItems {
    Available(Vec<Item>),
    Unavailable { reason: String },
}

impl CategoryItems {
    pub fn items(&self) -> &[Item] {
        match self {
            CategoryItems::Available(items) => items,
            CategoryItems::Unavailable { .. } => &[],
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CategoryItems::Available(_))
    }
}

/// Load a category, mapping store errors to [`CategoryItems::Unavailable`].
pub fn load_category<S: ItemStore>(store: &S, category: &str) -> CategoryItems {
    match store.items_by_category(category) {
        Ok(items) => CategoryItems::Available(items),
        Err(e) => {
            tracing::warn!(category, error = %e, "item store unavailable");
            CategoryItems::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

/// Record a use; failures are logged and dropped.
pub fn record_usage_best_effort<R: UsageRecorder>(recorder: &R, category: &str, item_name: &str) {
    if let Err(e) = recorder.record_usage(category, item_name) {
        tracing::warn!(category, item_name, error = %e, "usage tracking failed");
    }
}

impl ItemStore for Database {
    type Error = DbError;

    fn items_by_category(&self, category: &str) -> Result<Vec<Item>, DbError> {
        self.get_items_by_category(category)
    }

    fn all_items(&self) -> Result<Vec<Item>, DbError> {
        self.get_all_items()
    }

    fn add_item(&self, item: &Item) -> Result<Item, DbError> {
        Database::add_item(self, item)
    }

    fn update_item(&self, item: &Item) -> Result<Item, DbError> {
        Database::update_item(self, item)
    }

    fn delete_item(&self, id: i64) -> Result<bool, DbError> {
        Database::delete_item(self, id)
    }

    fn clear_category(&self, category: &str) -> Result<usize, DbError> {
        Database::clear_category(self, category)
    }
}

impl UsageRecorder for Database {
    type Error = DbError;

    fn record_usage(&self, category: &str, item_name: &str) -> Result<(), DbError> {
        Database::record_usage(self, category, item_name)
    }
}
