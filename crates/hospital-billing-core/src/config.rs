//! Layered configuration: defaults, then `hospital-billing.toml`, then
//! `HOSPITAL_BILLING_*` environment variables (`__` separates nested keys).

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hospital-billing.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "HOSPITAL_BILLING_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Parse(#[from] figment::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Prefix for generated bill numbers
    pub bill_number_prefix: String,
    pub pricing: PricingConfig,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("hospital_billing.db"),
            log_filter: "hospital_billing_core=info".to_string(),
            bill_number_prefix: "OP".to_string(),
            pricing: PricingConfig::default(),
        }
    }
}

impl BillingConfig {
    /// Load from an explicit file, or the default file if it exists.
    pub fn load(path_override: Option<&Path>) -> ConfigResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(BillingConfig::default()));

        match path_override {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Ok(figment.extract()?)
    }

    /// Parse a TOML string over the defaults (no environment).
    pub fn from_toml_str(toml: &str) -> ConfigResult<Self> {
        Ok(Figment::from(Serialized::defaults(BillingConfig::default()))
            .merge(Toml::string(toml))
            .extract()?)
    }
}

/// Tariff constants used by the pricing rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    /// OR charge per unit
    pub or_unit_rate: Decimal,
    /// Flat C-Arm fee
    pub c_arm_fee: Decimal,
    pub complex_multiplier: Decimal,
    pub discount_multiplier: Decimal,
    pub max_or_units: u32,
    /// Flat surcharge for portable X-ray
    pub xray_portable_fee: Decimal,
    /// BOTH-view price below which flexible X-ray pricing applies
    pub xray_flexible_threshold: Decimal,
    pub o2_liters_per_hour: Decimal,
    pub o2_rate_per_liter_hour: Decimal,
    pub iso_rate_per_minute: Decimal,
    pub general_room: RoomTariff,
    pub private_room: RoomTariff,
}

/// Seat & admission tariff for one room class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomTariff {
    pub admission: Decimal,
    /// Used when no specific room rate is given
    pub bed_per_day: Decimal,
    pub visitation: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            or_unit_rate: dec!(440),
            c_arm_fee: dec!(4000),
            complex_multiplier: dec!(1.5),
            discount_multiplier: dec!(0.5),
            max_or_units: 10,
            xray_portable_fee: dec!(70),
            xray_flexible_threshold: dec!(700),
            o2_liters_per_hour: dec!(2),
            o2_rate_per_liter_hour: dec!(65),
            iso_rate_per_minute: dec!(30),
            general_room: RoomTariff {
                admission: dec!(200),
                bed_per_day: dec!(100),
                visitation: dec!(50),
            },
            private_room: RoomTariff {
                admission: dec!(500),
                bed_per_day: dec!(300),
                visitation: dec!(100),
            },
        }
    }
}
