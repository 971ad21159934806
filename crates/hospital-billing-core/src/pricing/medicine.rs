//! Medicine dose-to-quantity conversion.
//!
//! A prescription (dose, unit, frequency, duration) is turned into the
//! number of dispensing units (tablets, bottles, vials, inhalers, tubes)
//! that have to be billed. Container-based forms divide the total volume
//! by the strength printed on the item, falling back to a typical pack size.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{format_taka, invalid, product, quotient, PricingError, PricingResult};
use crate::models::{Item, LineItemCandidate};
use crate::time::{to_days, DurationUnit};

/// Syrup bottle volume assumed when the strength is missing.
const DEFAULT_BOTTLE_ML: Decimal = dec!(100);
/// Puffs per inhaler assumed when the strength is missing.
const DEFAULT_INHALER_PUFFS: Decimal = dec!(200);
/// Tube weight assumed when the strength is missing.
const DEFAULT_TUBE_GRAMS: Decimal = dec!(10);
const ML_PER_TSP: Decimal = dec!(5);
const TSP_PER_TBSP: Decimal = dec!(3);

/// Unit the dose is prescribed in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoseUnit {
    Qty,
    Tablet,
    Capsule,
    Mg,
    Ml,
    Cc,
    G,
    Drops,
    Puffs,
    Tsp,
    Tbsp,
    Ointment,
    Solution,
    Formula,
    Inhaler,
    Tube,
}

impl FromStr for DoseUnit {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_lowercase().as_str() {
            "qty" => DoseUnit::Qty,
            "tablet" => DoseUnit::Tablet,
            "capsule" => DoseUnit::Capsule,
            "mg" => DoseUnit::Mg,
            "ml" => DoseUnit::Ml,
            "cc" => DoseUnit::Cc,
            "g" | "gm" => DoseUnit::G,
            "drops" => DoseUnit::Drops,
            "puffs" => DoseUnit::Puffs,
            "tsp" => DoseUnit::Tsp,
            "tbsp" => DoseUnit::Tbsp,
            "ointment" => DoseUnit::Ointment,
            "solution" => DoseUnit::Solution,
            "formula" => DoseUnit::Formula,
            "inhaler" => DoseUnit::Inhaler,
            "tube" => DoseUnit::Tube,
            other => return Err(invalid(format!("unknown dose unit '{}'", other))),
        };
        Ok(unit)
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DoseUnit::Qty => "qty",
            DoseUnit::Tablet => "tablet",
            DoseUnit::Capsule => "capsule",
            DoseUnit::Mg => "mg",
            DoseUnit::Ml => "ml",
            DoseUnit::Cc => "cc",
            DoseUnit::G => "g",
            DoseUnit::Drops => "drops",
            DoseUnit::Puffs => "puffs",
            DoseUnit::Tsp => "tsp",
            DoseUnit::Tbsp => "tbsp",
            DoseUnit::Ointment => "ointment",
            DoseUnit::Solution => "solution",
            DoseUnit::Formula => "formula",
            DoseUnit::Inhaler => "inhaler",
            DoseUnit::Tube => "tube",
        };
        f.write_str(s)
    }
}

/// Dispensing form derived from the item's free-form type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MedicineForm {
    Tablet,
    Capsule,
    Syrup,
    Solution,
    Formula,
    Injection,
    Inhaler,
    /// Ointment, cream or gel
    Topical,
    Other,
}

impl MedicineForm {
    /// Classify by keyword. "Injection solution" is an injection.
    pub fn from_type(item_type: &str) -> Self {
        let t = item_type.to_lowercase();
        if t.contains("injection") {
            MedicineForm::Injection
        } else if t.contains("inhaler") {
            MedicineForm::Inhaler
        } else if ["ointment", "cream", "gel"].iter().any(|k| t.contains(k)) {
            MedicineForm::Topical
        } else if t.contains("syrup") {
            MedicineForm::Syrup
        } else if t.contains("solution") {
            MedicineForm::Solution
        } else if t.contains("formula") {
            MedicineForm::Formula
        } else if t.contains("capsule") {
            MedicineForm::Capsule
        } else if t.contains("tablet") {
            MedicineForm::Tablet
        } else {
            MedicineForm::Other
        }
    }
}

/// Which conversion produced the unit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseRule {
    /// Solid dose counted per tablet/capsule
    SolidCount,
    /// Solid dose prescribed in mg, divided by strength
    SolidStrength,
    /// Tablespoon volume, billed exactly
    Tablespoon,
    /// Liquid ordered by bottle count
    BottleCount,
    /// Liquid volume divided by bottle size
    BottleVolume,
    /// Injection volume divided by vial size
    InjectionVolume,
    /// Injection mg divided by strength
    InjectionStrength,
    /// Puffs divided by inhaler size
    InhalerPuffs,
    /// Inhaler ordered by count
    InhalerCount,
    /// Grams divided by tube size
    TopicalWeight,
    /// Tube ordered by count
    TopicalCount,
    /// dose × frequency × days
    Fallback,
}

/// A prescription to convert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRequest {
    /// Defaults to 1 when unset or not positive
    pub dose_amount: Option<Decimal>,
    pub dose_unit: DoseUnit,
    pub frequency_per_day: Decimal,
    pub duration_value: Decimal,
    #[serde(default)]
    pub duration_unit: DurationUnit,
}

/// Result of a dose conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseCalculation {
    pub dose_amount: Decimal,
    pub dose_unit: DoseUnit,
    pub frequency_per_day: Decimal,
    pub duration_days: Decimal,
    /// Whole units except for tablespoon doses
    pub units_needed: Decimal,
    pub unit_price: Decimal,
    pub total_cost: Decimal,
    pub rule: DoseRule,
    pub explanation: String,
}

impl DoseCalculation {
    pub fn quote(&self) -> super::Quote {
        super::Quote {
            quantity: self.units_needed,
            unit_price: self.unit_price,
            total_price: self.total_cost,
            explanation: self.explanation.clone(),
        }
    }

    pub fn into_candidate(self, item: &Item) -> LineItemCandidate {
        LineItemCandidate::simple(item, self.units_needed, self.unit_price, self.explanation)
    }
}

/// Convert a prescription into billable units of `item`.
pub fn calculate_dose(item: &Item, request: &MedicineRequest) -> PricingResult<DoseCalculation> {
    let freq = request.frequency_per_day;
    if freq <= Decimal::ZERO {
        return Err(invalid("frequency per day must be positive"));
    }
    let days = to_days(request.duration_value, request.duration_unit)
        .ok_or_else(|| invalid("duration is too long"))?;
    if days <= Decimal::ZERO {
        return Err(invalid("duration must be positive"));
    }
    if item.price <= Decimal::ZERO {
        return Err(invalid(format!("'{}' has no price", item.name)));
    }

    let dose = request
        .dose_amount
        .filter(|d| *d > Decimal::ZERO)
        .unwrap_or(Decimal::ONE);
    let unit = request.dose_unit;
    let strength = item.strength_value();
    let form = MedicineForm::from_type(&item.item_type);

    let (rule, units) = units_for(form, unit, dose, freq, days, strength)?;
    let total_cost = product(units, item.price)?;

    let explanation = format!(
        "{} {} × {}/day × {} days = {} units × {} = {}",
        dose.normalize(),
        unit,
        freq.normalize(),
        days.normalize(),
        units.normalize(),
        format_taka(item.price),
        format_taka(total_cost)
    );

    tracing::debug!(item = %item.name, ?rule, %units, "dose calculated");

    Ok(DoseCalculation {
        dose_amount: dose,
        dose_unit: unit,
        frequency_per_day: freq,
        duration_days: days,
        units_needed: units,
        unit_price: item.price,
        total_cost,
        rule,
        explanation,
    })
}

fn units_for(
    form: MedicineForm,
    unit: DoseUnit,
    dose: Decimal,
    freq: Decimal,
    days: Decimal,
    strength: Decimal,
) -> PricingResult<(DoseRule, Decimal)> {
    use DoseUnit::*;

    let course = |per_dose: Decimal| -> PricingResult<Decimal> { product(product(per_dose, freq)?, days) };
    let fallback = || -> PricingResult<(DoseRule, Decimal)> { Ok((DoseRule::Fallback, course(dose)?.ceil())) };

    // Tablespoon doses are billed by volume for any form.
    if unit == Tbsp {
        return Ok((DoseRule::Tablespoon, course(product(dose, TSP_PER_TBSP)?)?));
    }

    let picked = match form {
        MedicineForm::Tablet | MedicineForm::Capsule => match unit {
            Qty | Tablet | Capsule => (DoseRule::SolidCount, course(dose)?.ceil()),
            Mg if strength > Decimal::ZERO => {
                (DoseRule::SolidStrength, course(quotient(dose, strength)?)?.ceil())
            }
            _ => return fallback(),
        },
        MedicineForm::Syrup | MedicineForm::Solution | MedicineForm::Formula => match unit {
            Qty => (DoseRule::BottleCount, dose.ceil()),
            Ml | Cc => (
                DoseRule::BottleVolume,
                containers(course(dose)?, strength, Some(DEFAULT_BOTTLE_ML))?,
            ),
            Tsp => (
                DoseRule::BottleVolume,
                containers(course(product(dose, ML_PER_TSP)?)?, strength, Some(DEFAULT_BOTTLE_ML))?,
            ),
            _ => return fallback(),
        },
        MedicineForm::Injection => match unit {
            Ml | Cc => (DoseRule::InjectionVolume, containers(course(dose)?, strength, None)?),
            Mg if strength > Decimal::ZERO => {
                (DoseRule::InjectionStrength, course(quotient(dose, strength)?)?.ceil())
            }
            _ => return fallback(),
        },
        MedicineForm::Inhaler => match unit {
            Puffs => (
                DoseRule::InhalerPuffs,
                containers(course(dose)?, strength, Some(DEFAULT_INHALER_PUFFS))?,
            ),
            _ => (DoseRule::InhalerCount, dose.ceil()),
        },
        MedicineForm::Topical => match unit {
            G => (
                DoseRule::TopicalWeight,
                containers(course(dose)?, strength, Some(DEFAULT_TUBE_GRAMS))?,
            ),
            _ => (DoseRule::TopicalCount, dose.ceil()),
        },
        MedicineForm::Other => return fallback(),
    };
    Ok(picked)
}

/// Containers needed for `total`, sized by strength or a default pack size.
fn containers(total: Decimal, strength: Decimal, default_size: Option<Decimal>) -> PricingResult<Decimal> {
    let size = if strength > Decimal::ZERO {
        Some(strength)
    } else {
        default_size
    };
    match size {
        Some(size) => Ok(quotient(total, size)?.ceil()),
        None => Ok(total.ceil()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn medicine(item_type: &str, strength: &str, price: Decimal) -> Item {
        let mut item = Item::new("Medicine", "Test", price);
        item.item_type = item_type.into();
        item.strength = strength.into();
        item
    }

    fn request(dose: Option<Decimal>, unit: DoseUnit, freq: Decimal, days: Decimal) -> MedicineRequest {
        MedicineRequest {
            dose_amount: dose,
            dose_unit: unit,
            frequency_per_day: freq,
            duration_value: days,
            duration_unit: DurationUnit::Days,
        }
    }

    fn units(item: &Item, req: MedicineRequest) -> (DoseRule, Decimal) {
        let calc = calculate_dose(item, &req).unwrap();
        (calc.rule, calc.units_needed)
    }

    #[test]
    fn test_tablet_count() {
        let item = medicine("Tablet", "500mg", dec!(2));
        let calc = calculate_dose(&item, &request(Some(dec!(1)), DoseUnit::Tablet, dec!(2), dec!(3))).unwrap();
        assert_eq!(calc.units_needed, dec!(6));
        assert_eq!(calc.total_cost, dec!(12));
        assert_eq!(calc.rule, DoseRule::SolidCount);
    }

    #[test]
    fn test_tablet_mg_divides_by_strength() {
        let item = medicine("Tablet", "5 mg", dec!(4));
        assert_eq!(
            units(&item, request(Some(dec!(1.5)), DoseUnit::Mg, dec!(2), dec!(3))),
            (DoseRule::SolidStrength, dec!(2))
        );
    }

    #[test]
    fn test_tablet_mg_without_strength_falls_back() {
        let item = medicine("Capsule", "", dec!(4));
        assert_eq!(
            units(&item, request(Some(dec!(250)), DoseUnit::Mg, dec!(1), dec!(2))),
            (DoseRule::Fallback, dec!(500))
        );
    }

    #[test]
    fn test_tablespoon_is_exact() {
        let item = medicine("Syrup", "100ml", dec!(1));
        let calc = calculate_dose(&item, &request(Some(dec!(2)), DoseUnit::Tbsp, dec!(1), dec!(5))).unwrap();
        assert_eq!(calc.units_needed, dec!(30));
        assert_eq!(calc.rule, DoseRule::Tablespoon);

        let tablet = medicine("Tablet", "", dec!(0.5));
        let calc = calculate_dose(&tablet, &request(Some(dec!(0.5)), DoseUnit::Tbsp, dec!(1), dec!(1))).unwrap();
        assert_eq!(calc.units_needed, dec!(1.5));
        assert_eq!(calc.total_cost, dec!(0.75));
    }

    #[test]
    fn test_syrup_branches() {
        let item = medicine("Syrup", "60 ml", dec!(85));
        assert_eq!(
            units(&item, request(Some(dec!(2)), DoseUnit::Qty, dec!(3), dec!(7))),
            (DoseRule::BottleCount, dec!(2))
        );
        // 5 ml × 3 × 7 = 105 ml → 2 bottles of 60 ml
        assert_eq!(
            units(&item, request(Some(dec!(5)), DoseUnit::Ml, dec!(3), dec!(7))),
            (DoseRule::BottleVolume, dec!(2))
        );
        // 1 tsp × 3 × 7 = 105 ml
        assert_eq!(
            units(&item, request(Some(dec!(1)), DoseUnit::Tsp, dec!(3), dec!(7))),
            (DoseRule::BottleVolume, dec!(2))
        );

        let no_strength = medicine("Suspension Syrup", "", dec!(85));
        assert_eq!(
            units(&no_strength, request(Some(dec!(5)), DoseUnit::Cc, dec!(3), dec!(7))),
            (DoseRule::BottleVolume, dec!(2))
        );
    }

    #[test]
    fn test_injection_branches() {
        let vial = medicine("Injection", "2ml", dec!(30));
        assert_eq!(
            units(&vial, request(Some(dec!(1)), DoseUnit::Ml, dec!(2), dec!(3))),
            (DoseRule::InjectionVolume, dec!(3))
        );

        let no_strength = medicine("Injection", "", dec!(30));
        assert_eq!(
            units(&no_strength, request(Some(dec!(1.5)), DoseUnit::Ml, dec!(1), dec!(3))),
            (DoseRule::InjectionVolume, dec!(5))
        );

        let mg = medicine("Injection Solution", "500 mg", dec!(120));
        assert_eq!(
            units(&mg, request(Some(dec!(1000)), DoseUnit::Mg, dec!(2), dec!(2))),
            (DoseRule::InjectionStrength, dec!(8))
        );
    }

    #[test]
    fn test_inhaler_branches() {
        let item = medicine("Inhaler", "", dec!(350));
        assert_eq!(
            units(&item, request(Some(dec!(2)), DoseUnit::Puffs, dec!(4), dec!(30))),
            (DoseRule::InhalerPuffs, dec!(2))
        );
        assert_eq!(
            units(&item, request(Some(dec!(1)), DoseUnit::Inhaler, dec!(2), dec!(30))),
            (DoseRule::InhalerCount, dec!(1))
        );
    }

    #[test]
    fn test_topical_branches() {
        let item = medicine("Cream", "15 g", dec!(90));
        assert_eq!(
            units(&item, request(Some(dec!(1)), DoseUnit::G, dec!(2), dec!(10))),
            (DoseRule::TopicalWeight, dec!(2))
        );
        let gel = medicine("Gel", "", dec!(90));
        assert_eq!(
            units(&gel, request(Some(dec!(1)), DoseUnit::G, dec!(2), dec!(10))),
            (DoseRule::TopicalWeight, dec!(2))
        );
        assert_eq!(
            units(&gel, request(Some(dec!(1)), DoseUnit::Tube, dec!(2), dec!(10))),
            (DoseRule::TopicalCount, dec!(1))
        );
    }

    #[test]
    fn test_unknown_form_falls_back() {
        let item = medicine("Powder", "", dec!(5));
        assert_eq!(
            units(&item, request(Some(dec!(1)), DoseUnit::Drops, dec!(3), dec!(2))),
            (DoseRule::Fallback, dec!(6))
        );
    }

    #[test]
    fn test_missing_dose_defaults_to_one() {
        let item = medicine("Tablet", "", dec!(1));
        let calc = calculate_dose(&item, &request(None, DoseUnit::Tablet, dec!(2), dec!(2))).unwrap();
        assert_eq!(calc.dose_amount, dec!(1));
        assert_eq!(calc.units_needed, dec!(4));

        let calc = calculate_dose(&item, &request(Some(dec!(-3)), DoseUnit::Tablet, dec!(2), dec!(2))).unwrap();
        assert_eq!(calc.units_needed, dec!(4));
    }

    #[test]
    fn test_weeks_and_months() {
        let item = medicine("Tablet", "", dec!(1));
        let mut req = request(Some(dec!(1)), DoseUnit::Tablet, dec!(1), dec!(2));
        req.duration_unit = DurationUnit::Weeks;
        assert_eq!(calculate_dose(&item, &req).unwrap().units_needed, dec!(14));
        req.duration_unit = DurationUnit::Months;
        req.duration_value = dec!(1);
        assert_eq!(calculate_dose(&item, &req).unwrap().units_needed, dec!(30));
    }

    #[test]
    fn test_invalid_inputs_produce_no_result() {
        let item = medicine("Tablet", "", dec!(1));
        assert!(calculate_dose(&item, &request(None, DoseUnit::Tablet, dec!(0), dec!(3))).is_err());
        assert!(calculate_dose(&item, &request(None, DoseUnit::Tablet, dec!(1), dec!(0))).is_err());

        let free = medicine("Tablet", "", dec!(0));
        assert!(matches!(
            calculate_dose(&free, &request(None, DoseUnit::Tablet, dec!(1), dec!(1))),
            Err(PricingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_absurd_course_is_an_error() {
        let huge = dec!(1000000000000000);
        let tablet = medicine("Tablet", "500mg", dec!(2));
        for unit in [DoseUnit::Tablet, DoseUnit::Mg, DoseUnit::Tbsp] {
            assert!(matches!(
                calculate_dose(&tablet, &request(Some(huge), unit, huge, huge)),
                Err(PricingError::InvalidInput(_))
            ));
        }

        let syrup = medicine("Syrup", "", dec!(80));
        assert!(calculate_dose(&syrup, &request(Some(huge), DoseUnit::Ml, huge, huge)).is_err());

        let mut forever = request(Some(dec!(1)), DoseUnit::Tablet, dec!(1), Decimal::MAX);
        forever.duration_unit = DurationUnit::Months;
        assert!(calculate_dose(&tablet, &forever).is_err());

        // Units fit but the cost does not.
        let priceless = medicine("Tablet", "", Decimal::MAX);
        assert!(calculate_dose(&priceless, &request(Some(dec!(2)), DoseUnit::Tablet, dec!(1), dec!(1))).is_err());
    }

    #[test]
    fn test_dose_unit_parsing() {
        assert_eq!("gm".parse::<DoseUnit>().unwrap(), DoseUnit::G);
        assert_eq!(" TBSP ".parse::<DoseUnit>().unwrap(), DoseUnit::Tbsp);
        assert!("spoonful".parse::<DoseUnit>().is_err());
    }

    #[test]
    fn test_form_classification() {
        assert_eq!(MedicineForm::from_type("Injection Solution"), MedicineForm::Injection);
        assert_eq!(MedicineForm::from_type("Oral Solution"), MedicineForm::Solution);
        assert_eq!(MedicineForm::from_type("Eye Ointment"), MedicineForm::Topical);
        assert_eq!(MedicineForm::from_type("Capsule"), MedicineForm::Capsule);
        assert_eq!(MedicineForm::from_type(""), MedicineForm::Other);
    }

    proptest! {
        #[test]
        fn prop_solid_units_are_whole_and_cover_course(
            dose in 1u32..5,
            freq in 1u32..5,
            days in 1u32..60,
        ) {
            let item = medicine("Tablet", "", dec!(2));
            let req = request(
                Some(Decimal::from(dose)),
                DoseUnit::Tablet,
                Decimal::from(freq),
                Decimal::from(days),
            );
            let calc = calculate_dose(&item, &req).unwrap();
            prop_assert_eq!(calc.units_needed, calc.units_needed.trunc());
            prop_assert_eq!(calc.units_needed, Decimal::from(dose * freq * days));
            prop_assert_eq!(calc.total_cost, calc.units_needed * dec!(2));
        }
    }
}
