//! Category configuration registry.
//!
//! Maps each billing category to:
//! - its pricing shape (which rule prices it)
//! - whether it is exclusive (at most one line on a bill)
//! - its display group and icon

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static BUILTIN: Lazy<CategoryRegistry> = Lazy::new(CategoryRegistry::new);

/// How items in a category are priced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PricingShape {
    /// quantity × price
    Standard,
    /// dose-to-quantity conversion
    Medicine,
    /// view-combination pricing
    Xray,
    /// seat & admission fee over a stay
    Room,
    /// time-based O2/ISO billing
    O2Iso,
    /// OR procedure surcharge stacking
    Procedure,
}

/// Display grouping for category pickers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CategoryGroup {
    Admission,
    Medical,
    Diagnostics,
    Accommodation,
}

impl CategoryGroup {
    pub fn title(&self) -> &'static str {
        match self {
            CategoryGroup::Admission => "Admission & Registration",
            CategoryGroup::Medical => "Medical Services",
            CategoryGroup::Diagnostics => "Diagnostics & Procedures",
            CategoryGroup::Accommodation => "Accommodation & Supplies",
        }
    }
}

/// Static description of one billing category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryConfig {
    pub name: String,
    pub shape: PricingShape,
    /// At most one line of this category may be on a bill
    pub exclusive: bool,
    pub group: CategoryGroup,
    /// UI-only
    pub icon: String,
}

/// Read-only lookup from category name to configuration.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    /// Keyed by lowercase name
    categories: HashMap<String, CategoryConfig>,
    /// Declaration order, for pickers
    order: Vec<String>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryRegistry {
    /// Create a registry with the hospital's built-in categories.
    pub fn new() -> Self {
        let mut registry = Self {
            categories: HashMap::new(),
            order: Vec::new(),
        };
        for config in Self::default_categories() {
            registry.register(config);
        }
        registry
    }

    /// Shared built-in registry.
    pub fn builtin() -> &'static CategoryRegistry {
        &BUILTIN
    }

    /// Add or replace a category.
    pub fn register(&mut self, config: CategoryConfig) {
        let key = config.name.trim().to_lowercase();
        if !self.categories.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.categories.insert(key, config);
    }

    /// Look up a category (case-insensitive).
    pub fn get(&self, category: &str) -> Option<&CategoryConfig> {
        self.categories.get(&category.trim().to_lowercase())
    }

    /// Pricing shape; unknown categories price as standard.
    pub fn shape_of(&self, category: &str) -> PricingShape {
        self.get(category)
            .map(|c| c.shape)
            .unwrap_or(PricingShape::Standard)
    }

    /// Whether a category allows only one line; unknown categories do not.
    pub fn is_exclusive(&self, category: &str) -> bool {
        self.get(category).is_some_and(|c| c.exclusive)
    }

    /// All categories in declaration order.
    pub fn all(&self) -> Vec<&CategoryConfig> {
        self.order
            .iter()
            .filter_map(|key| self.categories.get(key))
            .collect()
    }

    /// Categories in a display group.
    pub fn in_group(&self, group: CategoryGroup) -> Vec<&CategoryConfig> {
        self.all().into_iter().filter(|c| c.group == group).collect()
    }

    fn default_categories() -> Vec<CategoryConfig> {
        use CategoryGroup::*;
        use PricingShape::*;

        let entry = |name: &str, shape, exclusive, group, icon: &str| CategoryConfig {
            name: name.to_string(),
            shape,
            exclusive,
            group,
            icon: icon.to_string(),
        };

        vec![
            // Admission & registration
            entry("Registration", Standard, true, Admission, "fas fa-clipboard-list"),
            entry("Admission Fee", Standard, false, Admission, "fas fa-hospital-user"),
            entry("Admission Fee Private", Standard, false, Admission, "fas fa-door-closed"),
            // Medical services
            entry("Dr. Fee", Standard, true, Medical, "fas fa-user-md"),
            entry("Medic Fee", Standard, true, Medical, "fas fa-user-nurse"),
            entry("Off-Charge/OB", Standard, false, Medical, "fas fa-baby"),
            entry("Visitation General", Standard, false, Medical, "fas fa-user-friends"),
            entry("Visitation Private", Standard, false, Medical, "fas fa-user-md"),
            entry("O2, ISO", O2Iso, false, Medical, "fas fa-lungs"),
            entry("Limb and Brace", Standard, false, Medical, "fas fa-hand-paper"),
            // Diagnostics & procedures
            entry("Lab", Standard, false, Diagnostics, "fas fa-flask"),
            entry("X-ray", Xray, false, Diagnostics, "fas fa-x-ray"),
            entry("Procedure", Procedure, false, Diagnostics, "fas fa-stethoscope"),
            entry("OR", Procedure, false, Diagnostics, "fas fa-procedures"),
            // Accommodation & supplies
            entry("Bed Fee General", Room, false, Accommodation, "fas fa-bed"),
            entry("Private Room Charges", Room, false, Accommodation, "fas fa-door-open"),
            entry("Baby Bed Fee(General)", Room, false, Accommodation, "fas fa-baby"),
            entry("Baby Bed Fee(Private)", Room, false, Accommodation, "fas fa-baby"),
            entry("Bed/Cabin Charges", Room, false, Accommodation, "fas fa-bed"),
            entry("Medicine", Medicine, false, Accommodation, "fas fa-pills"),
        ]
    }
}
