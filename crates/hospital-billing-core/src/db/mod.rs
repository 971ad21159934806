//! Database layer for the hospital billing core.

mod bills;
mod items;
mod schema;
mod usage;

pub use bills::*;
pub use items::*;
pub use schema::*;
pub use usage::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::models::ItemError;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stored amount is not a decimal: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid item: {0}")]
    InvalidItem(#[from] ItemError),

    #[error("Duplicate item: \"{name}\" already exists in category \"{category}\"")]
    Duplicate { name: String, category: String },
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}
