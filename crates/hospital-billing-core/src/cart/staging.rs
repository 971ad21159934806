//! OR procedure staging list.
//!
//! Procedures are priced and reviewed one by one, then committed to the
//! bill together as individual lines.

use rust_decimal::Decimal;

use super::{AddOutcome, Cart, CartError, CartResult};
use crate::pricing::OrSelection;

pub use crate::pricing::OR_CATEGORY;

#[derive(Debug, Clone, Default)]
pub struct OrStaging {
    selections: Vec<OrSelection>,
}

impl OrStaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, selection: OrSelection) {
        tracing::debug!(procedure = %selection.procedure, total = %selection.total_cost, "staged procedure");
        self.selections.push(selection);
    }

    pub fn remove(&mut self, index: usize) -> CartResult<OrSelection> {
        if index >= self.selections.len() {
            return Err(CartError::NotFound(format!("staged procedure {}", index)));
        }
        Ok(self.selections.remove(index))
    }

    pub fn selections(&self) -> &[OrSelection] {
        &self.selections
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn clear(&mut self) {
        self.selections.clear();
    }

    pub fn total(&self) -> Decimal {
        self.selections.iter().map(|s| s.total_cost).sum()
    }

    /// Move every staged procedure onto the bill, one line each.
    ///
    /// If any line is rejected nothing is committed and every selection
    /// stays staged.
    pub fn commit(&mut self, cart: &mut Cart) -> CartResult<Vec<AddOutcome>> {
        let candidates = self
            .selections
            .iter()
            .cloned()
            .map(OrSelection::into_candidate)
            .collect();
        let outcomes = cart.add_all(candidates)?;
        self.selections.clear();
        tracing::debug!(count = outcomes.len(), "committed staged procedures");
        Ok(outcomes)
    }
}
