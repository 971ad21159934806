//! Hospital Billing Core Library
//!
//! Category-driven pricing and bill construction for outpatient and
//! inpatient billing counters.
//!
//! # Architecture
//!
//! ```text
//!   UI picker input
//!         │
//!         ▼
//!   CategoryRegistry ──► PricingShape
//!         │
//!         ▼
//!   PricingEngine::price(item, PricingInput)
//!         │   medicine │ xray │ o2/iso │ procedure │ room │ standard
//!         ▼
//!   LineItemCandidate
//!         │
//!         ▼
//!   Cart::add ──► Added │ Merged │ Replaced │ DuplicateBlocked
//!         │
//!         ▼
//!   Totals (grand total, per-category subtotals)
//!         │
//!         ▼
//!   SavedBill ──► SQLite (items, bills, usage_stats)
//! ```
//!
//! # Modules
//!
//! - [`time`]: duration and time-span helpers
//! - [`registry`]: category configuration
//! - [`pricing`]: per-category pricing rules
//! - [`cart`]: bill state, OR staging and totals
//! - [`db`]: SQLite item store, saved bills and usage statistics
//! - [`store`]: item store and usage tracking contracts
//! - [`config`]: layered configuration
//! - [`logging`]: tracing setup

pub mod cart;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod pricing;
pub mod registry;
pub mod store;
pub mod time;

// Re-export commonly used types
pub use cart::{AddOutcome, Cart, OrStaging, Totals};
pub use config::{BillingConfig, PricingConfig};
pub use db::Database;
pub use models::{BillLineItem, Item, LineItemCandidate, PatientInfo, SavedBill};
pub use pricing::{PricingEngine, PricingError, PricingInput};
pub use registry::{CategoryRegistry, PricingShape};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use models::{RoomDetails, RoomType, ServicePricing, XrayPricing};
use pricing::{
    AdditionalSurgery, DoseCalculation, DoseUnit, IsoRequest, MedicineRequest, O2IsoQuote,
    O2IsoRequest, OrSelection, OxygenRequest, ProcedureRequest, RoomQuote, RoomRequest,
    StandardRequest, SurgeryOptions, ViewSelection, XrayMode, XrayRequest, XrayView,
};
use store::{load_category, record_usage_best_effort, CategoryItems};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum BillingCoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Duplicate item: {0}")]
    DuplicateItem(String),

    #[error("Item store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for BillingCoreError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(_) => BillingCoreError::NotFound(e.to_string()),
            db::DbError::InvalidItem(_) => BillingCoreError::InvalidInput(e.to_string()),
            db::DbError::Duplicate { .. } => BillingCoreError::DuplicateItem(e.to_string()),
            _ => BillingCoreError::DatabaseError(e.to_string()),
        }
    }
}

impl From<PricingError> for BillingCoreError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::InvalidRange(_) => BillingCoreError::InvalidRange(e.to_string()),
            _ => BillingCoreError::InvalidInput(e.to_string()),
        }
    }
}

impl From<cart::CartError> for BillingCoreError {
    fn from(e: cart::CartError) -> Self {
        match e {
            cart::CartError::NotFound(_) => BillingCoreError::NotFound(e.to_string()),
            cart::CartError::InvalidInput(_) => BillingCoreError::InvalidInput(e.to_string()),
        }
    }
}

impl From<time::TimeError> for BillingCoreError {
    fn from(e: time::TimeError) -> Self {
        match e {
            time::TimeError::InvalidRange { .. } => BillingCoreError::InvalidRange(e.to_string()),
            _ => BillingCoreError::InvalidInput(e.to_string()),
        }
    }
}

impl From<config::ConfigError> for BillingCoreError {
    fn from(e: config::ConfigError) -> Self {
        BillingCoreError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for BillingCoreError {
    fn from(e: serde_json::Error) -> Self {
        BillingCoreError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for BillingCoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        BillingCoreError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install the log subscriber. Returns false if one was already installed.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    let default = BillingConfig::default().log_filter;
    logging::init(filter.as_deref().unwrap_or(&default))
}

/// Open or create a database at the given path with default tariffs.
#[uniffi::export]
pub fn open_billing_core(path: String) -> Result<Arc<BillingCore>, BillingCoreError> {
    let config = BillingConfig {
        database_path: PathBuf::from(path),
        ..BillingConfig::default()
    };
    BillingCore::open(config)
}

/// Open using layered configuration (defaults, TOML file, environment).
#[uniffi::export]
pub fn open_billing_core_with_config(
    config_path: Option<String>,
) -> Result<Arc<BillingCore>, BillingCoreError> {
    let config = BillingConfig::load(config_path.as_deref().map(std::path::Path::new))?;
    BillingCore::open(config)
}

/// Create an in-memory core (for testing).
#[uniffi::export]
pub fn open_billing_core_in_memory() -> Result<Arc<BillingCore>, BillingCoreError> {
    let config = BillingConfig::default();
    let db = Database::open_in_memory()?;
    Ok(Arc::new(BillingCore::with_database(db, &config)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Per-counter bill state.
struct Session {
    cart: Cart,
    or_staging: OrStaging,
}

/// Thread-safe billing core for FFI.
///
/// Locks are always taken database first, then session.
#[derive(uniffi::Object)]
pub struct BillingCore {
    db: Arc<Mutex<Database>>,
    session: Mutex<Session>,
    engine: PricingEngine,
    bill_number_prefix: String,
}

impl BillingCore {
    fn open(config: BillingConfig) -> Result<Arc<Self>, BillingCoreError> {
        let db = Database::open(&config.database_path)?;
        tracing::info!(path = %config.database_path.display(), "billing database opened");
        Ok(Arc::new(Self::with_database(db, &config)))
    }

    fn with_database(db: Database, config: &BillingConfig) -> Self {
        let registry = CategoryRegistry::new();
        Self {
            db: Arc::new(Mutex::new(db)),
            session: Mutex::new(Session {
                cart: Cart::new(registry.clone()),
                or_staging: OrStaging::new(),
            }),
            engine: PricingEngine::new(config.pricing.clone(), registry),
            bill_number_prefix: config.bill_number_prefix.clone(),
        }
    }

    fn load_item(&self, id: i64) -> Result<Item, BillingCoreError> {
        let db = self.db.lock()?;
        db.get_item(id)?
            .ok_or_else(|| BillingCoreError::NotFound(format!("item {}", id)))
    }

    /// Add priced lines, counting a use of `item` when the bill changed.
    fn add_candidates(
        &self,
        candidates: Vec<LineItemCandidate>,
        item: Option<&Item>,
    ) -> Result<Vec<FfiAddOutcome>, BillingCoreError> {
        let db = self.db.lock()?;
        let mut session = self.session.lock()?;
        let outcomes = session.cart.add_all(candidates)?;

        if let Some(item) = item {
            if outcomes.iter().any(|o| o.line_id().is_some()) {
                record_usage_best_effort(&*db, &item.category, &item.name);
            }
        }
        Ok(outcomes.into_iter().map(FfiAddOutcome::from).collect())
    }

    fn add_single(
        &self,
        candidate: LineItemCandidate,
        item: Option<&Item>,
    ) -> Result<FfiAddOutcome, BillingCoreError> {
        self.add_candidates(vec![candidate], item)?
            .pop()
            .ok_or_else(|| BillingCoreError::InvalidInput("nothing to add".into()))
    }

    /// Catalog tariffs for O2 and ISO, first match of each.
    fn o2_iso_tariffs(&self) -> Result<(Option<ServicePricing>, Option<ServicePricing>), BillingCoreError> {
        let db = self.db.lock()?;
        let items = db.get_items_by_category(db::O2_ISO_CATEGORY)?;
        let oxygen = items.iter().find_map(|i| i.oxygen_pricing.clone());
        let iso = items.iter().find_map(|i| i.iso_pricing.clone());
        Ok((oxygen, iso))
    }

    fn o2_iso_quote(&self, request: &FfiO2IsoRequest) -> Result<O2IsoQuote, BillingCoreError> {
        let request = request.to_request()?;
        let (oxygen, iso) = self.o2_iso_tariffs()?;
        Ok(self.engine.o2_iso(&request, oxygen.as_ref(), iso.as_ref())?)
    }

    fn room_quote(&self, request: &FfiRoomRequest) -> Result<(Option<Item>, RoomQuote), BillingCoreError> {
        let item = request.item_id.map(|id| self.load_item(id)).transpose()?;
        let quote = self.engine.room(item.as_ref(), &request.to_request()?)?;
        Ok((item, quote))
    }
}

#[uniffi::export]
impl BillingCore {
    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// All billing categories in picker order.
    pub fn categories(&self) -> Vec<FfiCategory> {
        self.engine
            .registry()
            .all()
            .into_iter()
            .map(|c| FfiCategory {
                name: c.name.clone(),
                shape: format!("{:?}", c.shape).to_lowercase(),
                exclusive: c.exclusive,
                group: c.group.title().to_string(),
                icon: c.icon.clone(),
            })
            .collect()
    }

    /// Items in a category. A store failure is reported as `StoreUnavailable`.
    pub fn items_by_category(&self, category: String) -> Result<Vec<FfiItem>, BillingCoreError> {
        let db = self.db.lock()?;
        match load_category(&*db, &category) {
            CategoryItems::Available(items) => Ok(items.into_iter().map(FfiItem::from).collect()),
            CategoryItems::Unavailable { reason } => Err(BillingCoreError::StoreUnavailable(reason)),
        }
    }

    pub fn get_item(&self, id: i64) -> Result<Option<FfiItem>, BillingCoreError> {
        let db = self.db.lock()?;
        Ok(db.get_item(id)?.map(FfiItem::from))
    }

    /// Add a catalog item. Exact duplicates are rejected.
    pub fn add_item(&self, item: FfiItem) -> Result<FfiItem, BillingCoreError> {
        let db = self.db.lock()?;
        let item = Item::try_from(item)?;
        Ok(db.add_item(&item)?.into())
    }

    /// Add a catalog item, merging into an existing entry of the same name.
    pub fn add_or_merge_item(&self, item: FfiItem) -> Result<FfiItemWrite, BillingCoreError> {
        let db = self.db.lock()?;
        let item = Item::try_from(item)?;
        let write = db.add_item_or_merge(&item)?;
        let merged = matches!(write, db::ItemWrite::Merged(_));
        Ok(FfiItemWrite {
            item: write.item().clone().into(),
            merged,
        })
    }

    pub fn update_item(&self, item: FfiItem) -> Result<FfiItem, BillingCoreError> {
        let db = self.db.lock()?;
        let item = Item::try_from(item)?;
        Ok(db.update_item(&item)?.into())
    }

    pub fn delete_item(&self, id: i64) -> Result<bool, BillingCoreError> {
        let db = self.db.lock()?;
        Ok(db.delete_item(id)?)
    }

    pub fn clear_category(&self, category: String) -> Result<u32, BillingCoreError> {
        let db = self.db.lock()?;
        Ok(db.clear_category(&category)? as u32)
    }

    /// Merge duplicate (name, category) entries. Returns rows removed.
    pub fn cleanup_duplicates(&self) -> Result<u32, BillingCoreError> {
        let mut db = self.db.lock()?;
        Ok(db.cleanup_duplicates()?.duplicates_removed as u32)
    }

    /// Scale a category's prices by a percentage. Returns items updated.
    pub fn adjust_category_pricing(&self, category: String, percent: f64) -> Result<u32, BillingCoreError> {
        let percent = to_decimal(percent, "percent")?;
        let mut db = self.db.lock()?;
        Ok(db.adjust_category_pricing(&category, percent)? as u32)
    }

    /// Copy prices onto same-named items. Returns items updated.
    pub fn copy_category_pricing(&self, source: String, target: String) -> Result<u32, BillingCoreError> {
        let mut db = self.db.lock()?;
        Ok(db.copy_category_pricing(&source, &target)?.copied as u32)
    }

    /// Insert default O2/ISO tariffs if that category is empty.
    pub fn seed_default_o2_iso(&self) -> Result<bool, BillingCoreError> {
        let db = self.db.lock()?;
        Ok(db.seed_default_o2_iso()?)
    }

    /// Fuzzy item search for pickers.
    pub fn search_items(
        &self,
        query: String,
        category: Option<String>,
        limit: u32,
    ) -> Result<Vec<FfiItemMatch>, BillingCoreError> {
        let db = self.db.lock()?;
        let matches = db.search_items(&query, category.as_deref(), limit as usize)?;
        Ok(matches
            .into_iter()
            .map(|m| FfiItemMatch {
                item: m.item.into(),
                score: m.score,
            })
            .collect())
    }

    // =========================================================================
    // Pricing and Bill Operations
    // =========================================================================

    /// Add a quantity × price item.
    pub fn add_standard_item(
        &self,
        item_id: i64,
        quantity: Option<f64>,
        checkbox_id: Option<String>,
    ) -> Result<FfiAddOutcome, BillingCoreError> {
        let item = self.load_item(item_id)?;
        let request = StandardRequest {
            quantity: quantity.map(|q| to_decimal(q, "quantity")).transpose()?,
        };
        let mut candidates = self.engine.price(&item, &PricingInput::Standard(request))?;
        if let Some(checkbox) = checkbox_id {
            candidates = candidates.into_iter().map(|c| c.with_checkbox(checkbox.clone())).collect();
        }
        let candidate = candidates
            .pop()
            .ok_or_else(|| BillingCoreError::InvalidInput("nothing to add".into()))?;
        self.add_single(candidate, Some(&item))
    }

    /// Preview a medicine dose calculation.
    pub fn calculate_medicine(&self, request: FfiMedicineRequest) -> Result<FfiDoseCalculation, BillingCoreError> {
        let item = self.load_item(request.item_id)?;
        let calc = self.engine.medicine(&item, &request.to_request()?)?;
        Ok(calc.into())
    }

    pub fn add_medicine(&self, request: FfiMedicineRequest) -> Result<FfiAddOutcome, BillingCoreError> {
        let item = self.load_item(request.item_id)?;
        let input = PricingInput::Medicine(request.to_request()?);
        let candidate = self
            .engine
            .price(&item, &input)?
            .pop()
            .ok_or_else(|| BillingCoreError::InvalidInput("nothing to add".into()))?;
        self.add_single(candidate, Some(&item))
    }

    pub fn add_xray(&self, request: FfiXrayRequest) -> Result<FfiAddOutcome, BillingCoreError> {
        let item = self.load_item(request.item_id)?;
        let input = PricingInput::Xray(request.to_request()?);
        let candidate = self
            .engine
            .price(&item, &input)?
            .pop()
            .ok_or_else(|| BillingCoreError::InvalidInput("nothing to add".into()))?;
        self.add_single(candidate, Some(&item))
    }

    /// Preview O2/ISO charges.
    pub fn quote_o2_iso(&self, request: FfiO2IsoRequest) -> Result<FfiO2IsoQuote, BillingCoreError> {
        Ok(self.o2_iso_quote(&request)?.into())
    }

    /// Add O2 and/or ISO lines. Nothing is added if either range is invalid.
    ///
    /// A `checkbox_id` tags both lines, so one `remove_by_checkbox` takes
    /// them off together.
    pub fn add_o2_iso(&self, request: FfiO2IsoRequest) -> Result<Vec<FfiAddOutcome>, BillingCoreError> {
        let quote = self.o2_iso_quote(&request)?;
        let mut candidates = quote.into_candidates(db::O2_ISO_CATEGORY);
        if let Some(checkbox) = request.checkbox_id {
            candidates = candidates.into_iter().map(|c| c.with_checkbox(checkbox.clone())).collect();
        }
        self.add_candidates(candidates, None)
    }

    /// Preview the seat & admission fee.
    pub fn quote_room(&self, request: FfiRoomRequest) -> Result<FfiRoomQuote, BillingCoreError> {
        Ok(self.room_quote(&request)?.1.into())
    }

    pub fn add_room_fee(&self, request: FfiRoomRequest) -> Result<FfiAddOutcome, BillingCoreError> {
        let (item, quote) = self.room_quote(&request)?;
        let tariff = item.unwrap_or_else(|| Item::new("Bed/Cabin Charges", "Seat & Ad. Fee", quote.bed_rate));
        self.add_single(quote.into_candidate(&tariff), None)
    }

    /// Price a catalog procedure and stage it.
    pub fn stage_procedure(&self, request: FfiProcedureRequest) -> Result<FfiOrSelection, BillingCoreError> {
        let item = self.load_item(request.item_id)?;
        let selection = self.engine.procedure(&item, &request.to_request()?)?;
        self.stage(selection)
    }

    /// Stage a manually priced procedure (base + one OR unit).
    pub fn stage_manual_procedure(&self, name: String, base_price: f64) -> Result<FfiOrSelection, BillingCoreError> {
        let base_price = to_decimal(base_price, "base price")?;
        let selection = self.engine.manual_procedure(&name, base_price)?;
        self.stage(selection)
    }

    pub fn staged_procedures(&self) -> Result<Vec<FfiOrSelection>, BillingCoreError> {
        let session = self.session.lock()?;
        Ok(session
            .or_staging
            .selections()
            .iter()
            .cloned()
            .map(FfiOrSelection::from)
            .collect())
    }

    pub fn remove_staged_procedure(&self, index: u32) -> Result<FfiOrSelection, BillingCoreError> {
        let mut session = self.session.lock()?;
        Ok(session.or_staging.remove(index as usize)?.into())
    }

    /// Move all staged procedures onto the bill.
    pub fn commit_procedures(&self) -> Result<Vec<FfiAddOutcome>, BillingCoreError> {
        let mut session = self.session.lock()?;
        let Session { cart, or_staging } = &mut *session;
        let outcomes = or_staging.commit(cart)?;
        Ok(outcomes.into_iter().map(FfiAddOutcome::from).collect())
    }

    pub fn remove_line(&self, id: u64) -> Result<FfiLineItem, BillingCoreError> {
        let mut session = self.session.lock()?;
        Ok(session.cart.remove(id)?.into())
    }

    pub fn remove_by_checkbox(&self, checkbox_id: String) -> Result<Vec<FfiLineItem>, BillingCoreError> {
        let mut session = self.session.lock()?;
        let removed = session.cart.remove_by_checkbox(&checkbox_id)?;
        Ok(removed.into_iter().map(FfiLineItem::from).collect())
    }

    /// Empty the bill and the OR staging list.
    pub fn clear_bill(&self) -> Result<(), BillingCoreError> {
        let mut session = self.session.lock()?;
        session.cart.clear();
        session.or_staging.clear();
        Ok(())
    }

    pub fn bill_lines(&self) -> Result<Vec<FfiLineItem>, BillingCoreError> {
        let session = self.session.lock()?;
        Ok(session.cart.lines().iter().cloned().map(FfiLineItem::from).collect())
    }

    pub fn bill_totals(&self) -> Result<FfiTotals, BillingCoreError> {
        let session = self.session.lock()?;
        Ok(session.cart.totals().clone().into())
    }

    // =========================================================================
    // Saved Bills and Statistics
    // =========================================================================

    /// Save the current bill and start a new one.
    pub fn save_bill(&self, patient: FfiPatientInfo) -> Result<FfiSavedBill, BillingCoreError> {
        let db = self.db.lock()?;
        let mut session = self.session.lock()?;
        if session.cart.is_empty() {
            return Err(BillingCoreError::InvalidInput("the bill has no items".into()));
        }

        let bill = SavedBill::new(
            models::generate_bill_number(&self.bill_number_prefix, chrono::Utc::now()),
            patient.into(),
            session.cart.lines().to_vec(),
        );
        db.save_bill(&bill)?;
        session.cart.clear();
        Ok(bill.into())
    }

    pub fn recent_bills(&self, limit: u32) -> Result<Vec<FfiSavedBill>, BillingCoreError> {
        let db = self.db.lock()?;
        Ok(db
            .list_bills(limit as usize)?
            .into_iter()
            .map(FfiSavedBill::from)
            .collect())
    }

    /// Export a saved bill as JSON.
    pub fn export_bill_json(&self, bill_id: String) -> Result<String, BillingCoreError> {
        let db = self.db.lock()?;
        let bill = db
            .get_bill(&bill_id)?
            .ok_or_else(|| BillingCoreError::NotFound(format!("bill {}", bill_id)))?;
        Ok(bill.to_json()?)
    }

    pub fn statistics(&self) -> Result<FfiStatistics, BillingCoreError> {
        let db = self.db.lock()?;
        Ok(db.statistics()?.into())
    }

    /// Most used items in a category.
    pub fn suggestions(&self, category: String, limit: u32) -> Result<Vec<FfiUsageStat>, BillingCoreError> {
        let db = self.db.lock()?;
        Ok(db
            .top_used(&category, limit as usize)?
            .into_iter()
            .map(|s| FfiUsageStat {
                category: s.category,
                item_name: s.item_name,
                count: s.count,
                last_used: s.last_used,
            })
            .collect())
    }
}

impl BillingCore {
    fn stage(&self, selection: OrSelection) -> Result<FfiOrSelection, BillingCoreError> {
        let mut session = self.session.lock()?;
        session.or_staging.push(selection.clone());
        Ok(selection.into())
    }
}

// =========================================================================
// Amount Conversion
// =========================================================================

fn to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}

fn opt_to_f64(amount: Option<Decimal>) -> Option<f64> {
    amount.map(to_f64)
}

fn to_decimal(value: f64, field: &str) -> Result<Decimal, BillingCoreError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(6).normalize())
        .ok_or_else(|| BillingCoreError::InvalidInput(format!("{} is not a number: {}", field, value)))
}

fn opt_to_decimal(value: Option<f64>, field: &str) -> Result<Option<Decimal>, BillingCoreError> {
    value.map(|v| to_decimal(v, field)).transpose()
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe billing category.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCategory {
    pub name: String,
    /// standard | medicine | xray | room | o2iso | procedure
    pub shape: String,
    pub exclusive: bool,
    pub group: String,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiRoomType {
    General,
    Private,
}

impl From<RoomType> for FfiRoomType {
    fn from(t: RoomType) -> Self {
        match t {
            RoomType::General => FfiRoomType::General,
            RoomType::Private => FfiRoomType::Private,
        }
    }
}

impl From<FfiRoomType> for RoomType {
    fn from(t: FfiRoomType) -> Self {
        match t {
            FfiRoomType::General => RoomType::General,
            FfiRoomType::Private => RoomType::Private,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiXrayPricing {
    pub ap: Option<f64>,
    pub lat: Option<f64>,
    pub oblique: Option<f64>,
    pub both: Option<f64>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiServicePricing {
    pub unit: String,
    pub price: f64,
    pub liters_per_hour: Option<f64>,
    pub base_rate: Option<f64>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRoomDetails {
    pub room_type: FfiRoomType,
    pub private_type: Option<String>,
    pub daily_rate: f64,
}

/// FFI-safe catalog item.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiItem {
    pub id: Option<i64>,
    pub category: String,
    pub subcategory: Option<String>,
    pub name: String,
    pub item_type: String,
    pub strength: String,
    pub price: f64,
    pub description: String,
    pub xray_pricing: Option<FfiXrayPricing>,
    pub oxygen_pricing: Option<FfiServicePricing>,
    pub iso_pricing: Option<FfiServicePricing>,
    pub room: Option<FfiRoomDetails>,
    pub is_system_data: bool,
}

impl From<Item> for FfiItem {
    fn from(item: Item) -> Self {
        let service = |p: ServicePricing| FfiServicePricing {
            unit: p.unit,
            price: to_f64(p.price),
            liters_per_hour: opt_to_f64(p.liters_per_hour),
            base_rate: opt_to_f64(p.base_rate),
        };
        Self {
            id: item.id,
            category: item.category,
            subcategory: item.subcategory,
            name: item.name,
            item_type: item.item_type,
            strength: item.strength,
            price: to_f64(item.price),
            description: item.description,
            xray_pricing: item.xray_pricing.map(|x| FfiXrayPricing {
                ap: opt_to_f64(x.ap),
                lat: opt_to_f64(x.lat),
                oblique: opt_to_f64(x.oblique),
                both: opt_to_f64(x.both),
            }),
            oxygen_pricing: item.oxygen_pricing.map(service),
            iso_pricing: item.iso_pricing.map(service),
            room: item.room.map(|r| FfiRoomDetails {
                room_type: r.room_type.into(),
                private_type: r.private_type,
                daily_rate: to_f64(r.daily_rate),
            }),
            is_system_data: item.is_system_data,
        }
    }
}

impl TryFrom<FfiItem> for Item {
    type Error = BillingCoreError;

    fn try_from(item: FfiItem) -> Result<Self, Self::Error> {
        let service = |p: FfiServicePricing| -> Result<ServicePricing, BillingCoreError> {
            Ok(ServicePricing {
                unit: p.unit,
                price: to_decimal(p.price, "service price")?,
                liters_per_hour: opt_to_decimal(p.liters_per_hour, "liters per hour")?,
                base_rate: opt_to_decimal(p.base_rate, "base rate")?,
            })
        };

        Ok(Item {
            id: item.id,
            category: item.category,
            subcategory: item.subcategory,
            name: item.name,
            item_type: item.item_type,
            strength: item.strength,
            price: to_decimal(item.price, "price")?,
            description: item.description,
            xray_pricing: item
                .xray_pricing
                .map(|x| -> Result<XrayPricing, BillingCoreError> {
                    Ok(XrayPricing {
                        ap: opt_to_decimal(x.ap, "AP price")?,
                        lat: opt_to_decimal(x.lat, "LAT price")?,
                        oblique: opt_to_decimal(x.oblique, "OBLIQUE price")?,
                        both: opt_to_decimal(x.both, "BOTH price")?,
                    })
                })
                .transpose()?,
            oxygen_pricing: item.oxygen_pricing.map(service).transpose()?,
            iso_pricing: item.iso_pricing.map(service).transpose()?,
            room: item
                .room
                .map(|r| -> Result<RoomDetails, BillingCoreError> {
                    Ok(RoomDetails {
                        room_type: r.room_type.into(),
                        private_type: r.private_type,
                        daily_rate: to_decimal(r.daily_rate, "daily rate")?,
                    })
                })
                .transpose()?,
            is_system_data: item.is_system_data,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiItemWrite {
    pub item: FfiItem,
    pub merged: bool,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiItemMatch {
    pub item: FfiItem,
    pub score: f64,
}

/// FFI-safe bill line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLineItem {
    pub id: u64,
    pub category: String,
    pub name: String,
    pub item_type: String,
    pub strength: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub description: String,
    pub source_checkbox: Option<String>,
    pub bundled: bool,
}

impl From<BillLineItem> for FfiLineItem {
    fn from(line: BillLineItem) -> Self {
        Self {
            id: line.id,
            category: line.category,
            name: line.name,
            item_type: line.item_type,
            strength: line.strength,
            quantity: to_f64(line.quantity),
            unit_price: to_f64(line.unit_price),
            total_price: to_f64(line.total_price),
            description: line.description,
            source_checkbox: line.source_checkbox,
            bundled: line.bundled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum FfiAddOutcome {
    Added { id: u64 },
    Merged { id: u64 },
    Replaced { id: u64, removed: u32 },
    DuplicateBlocked { existing_id: u64 },
}

impl From<AddOutcome> for FfiAddOutcome {
    fn from(outcome: AddOutcome) -> Self {
        match outcome {
            AddOutcome::Added { id } => FfiAddOutcome::Added { id },
            AddOutcome::Merged { id } => FfiAddOutcome::Merged { id },
            AddOutcome::Replaced { id, removed } => FfiAddOutcome::Replaced {
                id,
                removed: removed as u32,
            },
            AddOutcome::DuplicateBlocked { existing_id } => FfiAddOutcome::DuplicateBlocked { existing_id },
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCategorySubtotal {
    pub category: String,
    pub line_count: u32,
    pub subtotal: f64,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTotals {
    pub grand_total: f64,
    pub line_count: u32,
    pub subtotals: Vec<FfiCategorySubtotal>,
}

impl From<Totals> for FfiTotals {
    fn from(totals: Totals) -> Self {
        Self {
            grand_total: to_f64(totals.grand_total),
            line_count: totals.line_count as u32,
            subtotals: totals
                .subtotals
                .into_iter()
                .map(|s| FfiCategorySubtotal {
                    category: s.category,
                    line_count: s.line_count as u32,
                    subtotal: to_f64(s.subtotal),
                })
                .collect(),
        }
    }
}

/// Medicine prescription for an item.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicineRequest {
    pub item_id: i64,
    pub dose_amount: Option<f64>,
    /// e.g. "tablet", "ml", "tsp", "gm"
    pub dose_unit: String,
    pub frequency_per_day: f64,
    pub duration_value: f64,
    /// days | weeks | months
    pub duration_unit: String,
}

impl FfiMedicineRequest {
    fn to_request(&self) -> Result<MedicineRequest, BillingCoreError> {
        Ok(MedicineRequest {
            // A non-numeric dose falls back to the default of one.
            dose_amount: self.dose_amount.and_then(Decimal::from_f64),
            dose_unit: self.dose_unit.parse::<DoseUnit>()?,
            frequency_per_day: to_decimal(self.frequency_per_day, "frequency")?,
            duration_value: to_decimal(self.duration_value, "duration")?,
            duration_unit: self.duration_unit.parse()?,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoseCalculation {
    pub dose_amount: f64,
    pub dose_unit: String,
    pub frequency_per_day: f64,
    pub duration_days: f64,
    pub units_needed: f64,
    pub unit_price: f64,
    pub total_cost: f64,
    pub explanation: String,
}

impl From<DoseCalculation> for FfiDoseCalculation {
    fn from(calc: DoseCalculation) -> Self {
        Self {
            dose_amount: to_f64(calc.dose_amount),
            dose_unit: calc.dose_unit.to_string(),
            frequency_per_day: to_f64(calc.frequency_per_day),
            duration_days: to_f64(calc.duration_days),
            units_needed: to_f64(calc.units_needed),
            unit_price: to_f64(calc.unit_price),
            total_cost: to_f64(calc.total_cost),
            explanation: calc.explanation,
        }
    }
}

/// X-ray order. `manual_amount` switches to manual pricing.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiXrayRequest {
    pub item_id: i64,
    /// AP | LAT | OBLIQUE | BOTH, applied in order
    pub views: Vec<String>,
    pub portable: bool,
    pub manual_amount: Option<f64>,
}

impl FfiXrayRequest {
    fn to_request(&self) -> Result<XrayRequest, BillingCoreError> {
        let mode = match self.manual_amount {
            Some(amount) => XrayMode::Manual {
                amount: to_decimal(amount, "manual amount")?,
            },
            None => {
                let views = self
                    .views
                    .iter()
                    .map(|v| match v.trim().to_uppercase().as_str() {
                        "AP" => Ok(XrayView::Ap),
                        "LAT" => Ok(XrayView::Lat),
                        "OBLIQUE" => Ok(XrayView::Oblique),
                        "BOTH" => Ok(XrayView::Both),
                        other => Err(BillingCoreError::InvalidInput(format!("unknown X-ray view '{}'", other))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                XrayMode::Views(ViewSelection::from_views(views))
            }
        };
        Ok(XrayRequest {
            mode,
            portable: self.portable,
        })
    }
}

/// O2/ISO usage windows as `YYYY-MM-DDTHH:MM[:SS]` strings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiO2IsoRequest {
    pub o2_start: Option<String>,
    pub o2_end: Option<String>,
    pub liters_per_hour: Option<f64>,
    pub iso_start: Option<String>,
    pub iso_end: Option<String>,
    pub checkbox_id: Option<String>,
}

impl FfiO2IsoRequest {
    fn to_request(&self) -> Result<O2IsoRequest, BillingCoreError> {
        let oxygen = parse_window(&self.o2_start, &self.o2_end)?
            .map(|(start, end)| -> Result<OxygenRequest, BillingCoreError> {
                Ok(OxygenRequest {
                    start,
                    end,
                    liters_per_hour: opt_to_decimal(self.liters_per_hour, "liters per hour")?,
                    rate_per_liter_hour: None,
                })
            })
            .transpose()?;
        let iso = parse_window(&self.iso_start, &self.iso_end)?.map(|(start, end)| IsoRequest {
            start,
            end,
            rate_per_minute: None,
        });

        Ok(O2IsoRequest { oxygen, iso })
    }
}

/// A usage window is either fully given or absent.
fn parse_window(
    start: &Option<String>,
    end: &Option<String>,
) -> Result<Option<(chrono::NaiveDateTime, chrono::NaiveDateTime)>, BillingCoreError> {
    match (start, end) {
        (Some(s), Some(e)) => Ok(Some((time::parse_datetime(s)?, time::parse_datetime(e)?))),
        (None, None) => Ok(None),
        _ => Err(BillingCoreError::InvalidInput(
            "both start and end times are required".into(),
        )),
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiO2IsoQuote {
    pub o2_hours: Option<f64>,
    pub o2_liters: Option<f64>,
    pub o2_cost: Option<f64>,
    pub iso_minutes: Option<f64>,
    pub iso_hours: Option<f64>,
    pub iso_days: Option<f64>,
    pub iso_cost: Option<f64>,
    pub combined_total: f64,
    pub explanation: String,
}

impl From<O2IsoQuote> for FfiO2IsoQuote {
    fn from(quote: O2IsoQuote) -> Self {
        let explanation = [
            quote.oxygen.as_ref().map(|o| format!("O2: {}", o.explanation)),
            quote.iso.as_ref().map(|i| format!("ISO: {}", i.explanation)),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("; ");

        Self {
            o2_hours: quote.oxygen.as_ref().map(|o| to_f64(o.hours)),
            o2_liters: quote.oxygen.as_ref().map(|o| to_f64(o.total_liters)),
            o2_cost: quote.oxygen.as_ref().map(|o| to_f64(o.total_cost)),
            iso_minutes: quote.iso.as_ref().map(|i| to_f64(i.minutes)),
            iso_hours: quote.iso.as_ref().map(|i| to_f64(i.hours)),
            iso_days: quote.iso.as_ref().map(|i| to_f64(i.days)),
            iso_cost: quote.iso.as_ref().map(|i| to_f64(i.total_cost)),
            combined_total: to_f64(quote.combined_total),
            explanation,
        }
    }
}

/// Inpatient stay. `item_id` picks a specific bed or cabin tariff.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRoomRequest {
    pub item_id: Option<i64>,
    /// `YYYY-MM-DD`
    pub admission_date: String,
    /// `YYYY-MM-DD`
    pub discharge_date: String,
    pub visitations: u32,
    pub room_type: Option<FfiRoomType>,
}

impl FfiRoomRequest {
    fn to_request(&self) -> Result<RoomRequest, BillingCoreError> {
        Ok(RoomRequest {
            admission: time::parse_date(&self.admission_date)?,
            discharge: time::parse_date(&self.discharge_date)?,
            visitations: self.visitations,
            room_type: self.room_type.map(RoomType::from),
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRoomQuote {
    pub room_type: FfiRoomType,
    pub stay_days: u32,
    pub admission_fee: f64,
    pub bed_rate: f64,
    pub bed_charge: f64,
    pub visitation_fee: f64,
    pub total: f64,
    pub explanation: String,
}

impl From<RoomQuote> for FfiRoomQuote {
    fn from(quote: RoomQuote) -> Self {
        Self {
            room_type: quote.room_type.into(),
            stay_days: quote.stay_days,
            admission_fee: to_f64(quote.admission_fee),
            bed_rate: to_f64(quote.bed_rate),
            bed_charge: to_f64(quote.bed_charge),
            visitation_fee: to_f64(quote.visitation_fee),
            total: to_f64(quote.total),
            explanation: quote.explanation,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, uniffi::Record)]
pub struct FfiSurgeryOptions {
    pub is_complex: bool,
    pub has_discount: bool,
    pub has_c_arm: bool,
}

impl From<FfiSurgeryOptions> for SurgeryOptions {
    fn from(o: FfiSurgeryOptions) -> Self {
        SurgeryOptions {
            is_complex: o.is_complex,
            has_discount: o.has_discount,
            has_c_arm: o.has_c_arm,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAdditionalSurgery {
    pub name: String,
    pub price: f64,
    pub options: FfiSurgeryOptions,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProcedureRequest {
    pub item_id: i64,
    pub units: u32,
    pub options: FfiSurgeryOptions,
    pub additional: Vec<FfiAdditionalSurgery>,
}

impl FfiProcedureRequest {
    fn to_request(&self) -> Result<ProcedureRequest, BillingCoreError> {
        let additional = self
            .additional
            .iter()
            .map(|s| -> Result<AdditionalSurgery, BillingCoreError> {
                Ok(AdditionalSurgery {
                    name: s.name.clone(),
                    price: to_decimal(s.price, "surgery price")?,
                    options: s.options.into(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProcedureRequest::Catalog {
            units: self.units,
            options: self.options.into(),
            additional,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOrSelection {
    pub procedure: String,
    pub category: String,
    pub units: u32,
    pub base_cost: f64,
    pub additional_surgeries_cost: f64,
    pub units_cost: f64,
    pub c_arm_cost: f64,
    pub is_complex: bool,
    pub has_discount: bool,
    pub total_cost: f64,
    pub manual: bool,
    pub explanation: String,
}

impl From<OrSelection> for FfiOrSelection {
    fn from(s: OrSelection) -> Self {
        Self {
            procedure: s.procedure,
            category: s.category,
            units: s.units,
            base_cost: to_f64(s.base_cost),
            additional_surgeries_cost: to_f64(s.additional_surgeries_cost),
            units_cost: to_f64(s.units_cost),
            c_arm_cost: to_f64(s.c_arm_cost),
            is_complex: s.is_complex,
            has_discount: s.has_discount,
            total_cost: to_f64(s.total_cost),
            manual: s.manual,
            explanation: s.explanation,
        }
    }
}

/// FFI-safe patient header.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientInfo {
    pub name: String,
    pub opd_number: String,
    pub hospital_number: String,
    pub admission_date: Option<String>,
    pub discharge_date: Option<String>,
}

impl From<FfiPatientInfo> for PatientInfo {
    fn from(p: FfiPatientInfo) -> Self {
        PatientInfo {
            name: p.name,
            opd_number: p.opd_number,
            hospital_number: p.hospital_number,
            admission_date: p.admission_date,
            discharge_date: p.discharge_date,
        }
    }
}

impl From<PatientInfo> for FfiPatientInfo {
    fn from(p: PatientInfo) -> Self {
        Self {
            name: p.name,
            opd_number: p.opd_number,
            hospital_number: p.hospital_number,
            admission_date: p.admission_date,
            discharge_date: p.discharge_date,
        }
    }
}

/// FFI-safe saved bill.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSavedBill {
    pub bill_id: String,
    pub bill_number: String,
    pub patient: FfiPatientInfo,
    pub items: Vec<FfiLineItem>,
    pub total_amount: f64,
    pub created_at: String,
}

impl From<SavedBill> for FfiSavedBill {
    fn from(bill: SavedBill) -> Self {
        Self {
            bill_id: bill.bill_id,
            bill_number: bill.bill_number,
            patient: bill.patient.into(),
            items: bill.items.into_iter().map(FfiLineItem::from).collect(),
            total_amount: to_f64(bill.total_amount),
            created_at: bill.created_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCategoryCount {
    pub category: String,
    pub count: u32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStatistics {
    pub items_by_category: Vec<FfiCategoryCount>,
    pub total_items: u32,
    pub total_bills: u32,
    pub total_revenue: f64,
}

impl From<db::StoreStatistics> for FfiStatistics {
    fn from(stats: db::StoreStatistics) -> Self {
        Self {
            items_by_category: stats
                .items_by_category
                .into_iter()
                .map(|(category, count)| FfiCategoryCount {
                    category,
                    count: count as u32,
                })
                .collect(),
            total_items: stats.total_items as u32,
            total_bills: stats.total_bills as u32,
            total_revenue: to_f64(stats.total_revenue),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUsageStat {
    pub category: String,
    pub item_name: String,
    pub count: u64,
    pub last_used: String,
}
