//! Domain models for the billing core.

mod bill;
mod item;
mod line_item;

pub use bill::*;
pub use item::*;
pub use line_item::*;

pub(crate) use item::normalize_key;
