//! SQLite schema definition.

/// Complete database schema for the billing core.
///
/// Amounts are stored as decimal TEXT so they round-trip exactly.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Catalog items
-- ============================================================================

CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    subcategory TEXT,
    name TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT '',
    strength TEXT NOT NULL DEFAULT '',
    price TEXT NOT NULL,                          -- decimal
    description TEXT NOT NULL DEFAULT '',
    xray_pricing TEXT,                            -- JSON object {ap, lat, oblique, both}
    oxygen_pricing TEXT,                          -- JSON object {unit, price, ...}
    iso_pricing TEXT,                             -- JSON object {unit, price, ...}
    room TEXT,                                    -- JSON object {roomType, privateType, dailyRate}
    is_system_data INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_items_category ON items(category COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_items_name ON items(name COLLATE NOCASE);

-- ============================================================================
-- Saved bills
-- ============================================================================

CREATE TABLE IF NOT EXISTS bills (
    bill_id TEXT PRIMARY KEY,
    bill_number TEXT NOT NULL,
    patient TEXT NOT NULL,                        -- JSON object
    items TEXT NOT NULL,                          -- JSON array of line items
    total_amount TEXT NOT NULL,                   -- decimal
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bills_created_at ON bills(created_at);
CREATE INDEX IF NOT EXISTS idx_bills_number ON bills(bill_number);

-- ============================================================================
-- Usage statistics (smart suggestions)
-- ============================================================================

CREATE TABLE IF NOT EXISTS usage_stats (
    category TEXT NOT NULL,
    item_name TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 0,
    last_used TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (category, item_name)
);
"#;
