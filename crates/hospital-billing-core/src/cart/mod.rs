//! In-memory bill under construction.
//!
//! Adding a line follows these rules, in order:
//! 1. Exclusive categories (Registration, Dr. Fee, Medic Fee) replace any
//!    existing line of that category.
//! 2. A line produced by a UI toggle is blocked if that toggle already
//!    produced a line.
//! 3. A line matching an existing (name, category) is blocked if the
//!    existing line came from a toggle. Otherwise it merges into a simple
//!    line at the same unit price.
//! 4. Anything else, bundles included, is appended with a fresh id.

mod staging;
mod totals;

pub use staging::*;
pub use totals::*;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{normalize_key, BillLineItem, LineItemCandidate};
use crate::registry::CategoryRegistry;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CartError {
    #[error("Invalid line item: {0}")]
    InvalidInput(String),

    #[error("Not on the bill: {0}")]
    NotFound(String),
}

pub type CartResult<T> = Result<T, CartError>;

/// Largest amount a single line may carry. Keeps bill totals well inside
/// `Decimal` range.
pub const MAX_LINE_TOTAL: Decimal = dec!(1000000000000);

/// What [`Cart::add`] did with a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AddOutcome {
    /// Appended as line `id`
    Added { id: u64 },
    /// Folded into existing line `id`
    Merged { id: u64 },
    /// Existing lines of an exclusive category were removed first
    Replaced { id: u64, removed: usize },
    /// Already on the bill; nothing changed
    DuplicateBlocked { existing_id: u64 },
}

impl AddOutcome {
    /// Line holding the candidate, if the bill changed.
    pub fn line_id(&self) -> Option<u64> {
        match self {
            AddOutcome::Added { id } | AddOutcome::Merged { id } | AddOutcome::Replaced { id, .. } => {
                Some(*id)
            }
            AddOutcome::DuplicateBlocked { .. } => None,
        }
    }
}

/// Ordered line items with running totals.
#[derive(Debug, Clone)]
pub struct Cart {
    registry: CategoryRegistry,
    lines: Vec<BillLineItem>,
    totals: Totals,
    next_id: u64,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(CategoryRegistry::default())
    }
}

impl Cart {
    pub fn new(registry: CategoryRegistry) -> Self {
        Self {
            registry,
            lines: Vec::new(),
            totals: Totals::default(),
            next_id: 1,
        }
    }

    pub fn lines(&self) -> &[BillLineItem] {
        &self.lines
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn get(&self, id: u64) -> Option<&BillLineItem> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Add a priced line according to the exclusivity and merge rules.
    pub fn add(&mut self, candidate: LineItemCandidate) -> CartResult<AddOutcome> {
        validate(&candidate)?;
        let toggles = self.toggles();
        let outcome = self.place(candidate, &toggles);

        self.recompute();
        tracing::debug!(?outcome, total = %self.totals.grand_total, "cart add");
        Ok(outcome)
    }

    /// Add several candidates as one unit.
    ///
    /// Every candidate is validated before the bill changes, so an invalid
    /// one leaves the bill untouched. Toggle duplicates are checked against
    /// the bill as it stood before the batch, which lets one toggle produce
    /// several lines.
    pub fn add_all(&mut self, candidates: Vec<LineItemCandidate>) -> CartResult<Vec<AddOutcome>> {
        for candidate in &candidates {
            validate(candidate)?;
        }
        let toggles = self.toggles();
        let outcomes: Vec<_> = candidates
            .into_iter()
            .map(|c| self.place(c, &toggles))
            .collect();

        self.recompute();
        tracing::debug!(?outcomes, total = %self.totals.grand_total, "cart add batch");
        Ok(outcomes)
    }

    /// Remove one line by id.
    pub fn remove(&mut self, id: u64) -> CartResult<BillLineItem> {
        let index = self
            .lines
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| CartError::NotFound(format!("line {}", id)))?;
        let removed = self.lines.remove(index);
        self.recompute();
        tracing::debug!(id, name = %removed.name, "cart remove");
        Ok(removed)
    }

    /// Remove every line produced by a UI toggle.
    pub fn remove_by_checkbox(&mut self, checkbox_id: &str) -> CartResult<Vec<BillLineItem>> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.lines)
            .into_iter()
            .partition(|l| l.source_checkbox.as_deref() == Some(checkbox_id));
        self.lines = kept;
        if removed.is_empty() {
            return Err(CartError::NotFound(format!("checkbox {}", checkbox_id)));
        }
        self.recompute();
        tracing::debug!(checkbox_id, count = removed.len(), "cart remove by checkbox");
        Ok(removed)
    }

    /// Empty the bill. Line ids keep increasing.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.recompute();
    }

    /// Drain all lines, leaving an empty bill.
    pub fn take_lines(&mut self) -> Vec<BillLineItem> {
        let lines = std::mem::take(&mut self.lines);
        self.recompute();
        lines
    }

    /// Toggle ids on the bill with the first line each produced.
    fn toggles(&self) -> Vec<(String, u64)> {
        let mut toggles: Vec<(String, u64)> = Vec::new();
        for line in &self.lines {
            if let Some(checkbox) = &line.source_checkbox {
                if !toggles.iter().any(|(c, _)| c == checkbox) {
                    toggles.push((checkbox.clone(), line.id));
                }
            }
        }
        toggles
    }

    fn place(&mut self, candidate: LineItemCandidate, toggles: &[(String, u64)]) -> AddOutcome {
        if self.registry.is_exclusive(&candidate.category) {
            let category = normalize_key(&candidate.category);
            let before = self.lines.len();
            self.lines.retain(|l| normalize_key(&l.category) != category);
            let removed = before - self.lines.len();
            let id = self.append(candidate);
            return AddOutcome::Replaced { id, removed };
        }

        if let Some(checkbox) = candidate.source_checkbox.as_deref() {
            return match toggles.iter().find(|(c, _)| c == checkbox) {
                Some((_, existing_id)) => AddOutcome::DuplicateBlocked {
                    existing_id: *existing_id,
                },
                None => AddOutcome::Added {
                    id: self.append(candidate),
                },
            };
        }

        let name = normalize_key(&candidate.name);
        let category = normalize_key(&candidate.category);
        let same = |l: &BillLineItem| normalize_key(&l.name) == name && normalize_key(&l.category) == category;
        if let Some(existing) = self.lines.iter().find(|l| same(l) && l.source_checkbox.is_some()) {
            return AddOutcome::DuplicateBlocked {
                existing_id: existing.id,
            };
        }
        // Bundles and lines at another unit price stay separate.
        match self.lines.iter_mut().find(|l| same(l) && l.accepts(&candidate)) {
            Some(existing) => {
                existing.absorb(&candidate);
                AddOutcome::Merged { id: existing.id }
            }
            None => AddOutcome::Added {
                id: self.append(candidate),
            },
        }
    }

    fn append(&mut self, candidate: LineItemCandidate) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.lines.push(BillLineItem::from_candidate(id, candidate));
        id
    }

    fn recompute(&mut self) {
        self.totals = Totals::compute(&self.lines);
    }
}

fn validate(candidate: &LineItemCandidate) -> CartResult<()> {
    if candidate.name.trim().is_empty() {
        return Err(CartError::InvalidInput("line has no name".into()));
    }
    if candidate.unit_price <= Decimal::ZERO || candidate.total_price <= Decimal::ZERO {
        return Err(CartError::InvalidInput(format!("'{}' has no price", candidate.name)));
    }
    if candidate.quantity <= Decimal::ZERO {
        return Err(CartError::InvalidInput(format!(
            "'{}' quantity must be positive",
            candidate.name
        )));
    }
    if candidate.total_price > MAX_LINE_TOTAL || candidate.quantity > MAX_LINE_TOTAL {
        return Err(CartError::InvalidInput(format!(
            "'{}' exceeds {}",
            candidate.name,
            crate::pricing::format_taka(MAX_LINE_TOTAL)
        )));
    }
    Ok(())
}
