//! Golden tests for the pricing rules.
//!
//! Each case pins an amount the billing counter quotes to patients.

use hospital_billing_core::models::{Item, RoomType, XrayPricing};
use hospital_billing_core::pricing::*;
use hospital_billing_core::time::{parse_date, parse_datetime, DurationUnit};
use hospital_billing_core::Cart;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn medicine(item_type: &str, strength: &str, price: Decimal) -> Item {
    let mut item = Item::new("Medicine", "Test Medicine", price);
    item.item_type = item_type.into();
    item.strength = strength.into();
    item
}

fn prescription(dose: Decimal, unit: DoseUnit, freq: Decimal, days: Decimal) -> MedicineRequest {
    MedicineRequest {
        dose_amount: Some(dose),
        dose_unit: unit,
        frequency_per_day: freq,
        duration_value: days,
        duration_unit: DurationUnit::Days,
    }
}

/// A medicine golden case.
struct DoseCase {
    id: &'static str,
    item_type: &'static str,
    strength: &'static str,
    dose: Decimal,
    unit: DoseUnit,
    freq: Decimal,
    days: Decimal,
    expected_units: Decimal,
}

fn dose_cases() -> Vec<DoseCase> {
    vec![
        DoseCase {
            id: "tablet-count",
            item_type: "Tablet",
            strength: "500 mg",
            dose: dec!(1),
            unit: DoseUnit::Tablet,
            freq: dec!(2),
            days: dec!(3),
            expected_units: dec!(6),
        },
        DoseCase {
            id: "tablet-by-strength",
            item_type: "Tablet",
            strength: "5 mg",
            dose: dec!(1.5),
            unit: DoseUnit::Mg,
            freq: dec!(2),
            days: dec!(3),
            expected_units: dec!(2),
        },
        DoseCase {
            id: "tablespoon-exact",
            item_type: "Syrup",
            strength: "100 ml",
            dose: dec!(2),
            unit: DoseUnit::Tbsp,
            freq: dec!(1),
            days: dec!(5),
            expected_units: dec!(30),
        },
        DoseCase {
            id: "syrup-teaspoon-bottles",
            item_type: "Syrup",
            strength: "60 ml",
            dose: dec!(1),
            unit: DoseUnit::Tsp,
            freq: dec!(3),
            days: dec!(5),
            expected_units: dec!(2),
        },
        DoseCase {
            id: "syrup-default-bottle",
            item_type: "Syrup",
            strength: "",
            dose: dec!(10),
            unit: DoseUnit::Ml,
            freq: dec!(3),
            days: dec!(5),
            expected_units: dec!(2),
        },
        DoseCase {
            id: "injection-raw-ml",
            item_type: "Injection",
            strength: "",
            dose: dec!(1.5),
            unit: DoseUnit::Ml,
            freq: dec!(1),
            days: dec!(3),
            expected_units: dec!(5),
        },
        DoseCase {
            id: "inhaler-default-puffs",
            item_type: "Inhaler",
            strength: "",
            dose: dec!(2),
            unit: DoseUnit::Puffs,
            freq: dec!(4),
            days: dec!(30),
            expected_units: dec!(2),
        },
        DoseCase {
            id: "cream-default-tube",
            item_type: "Cream",
            strength: "",
            dose: dec!(2),
            unit: DoseUnit::G,
            freq: dec!(2),
            days: dec!(7),
            expected_units: dec!(3),
        },
    ]
}

#[test]
fn test_medicine_golden_cases() {
    let engine = PricingEngine::default();
    for case in dose_cases() {
        let item = medicine(case.item_type, case.strength, dec!(10));
        let request = prescription(case.dose, case.unit, case.freq, case.days);
        let calc = engine
            .medicine(&item, &request)
            .unwrap_or_else(|e| panic!("{}: {}", case.id, e));
        assert_eq!(calc.units_needed, case.expected_units, "{}", case.id);
        assert_eq!(calc.total_cost, case.expected_units * dec!(10), "{}", case.id);
    }
}

#[test]
fn test_medicine_weeks_and_months() {
    let engine = PricingEngine::default();
    let item = medicine("Capsule", "20 mg", dec!(7.5));
    let mut request = prescription(dec!(1), DoseUnit::Capsule, dec!(1), dec!(2));

    request.duration_unit = DurationUnit::Weeks;
    assert_eq!(engine.medicine(&item, &request).unwrap().units_needed, dec!(14));

    request.duration_unit = DurationUnit::Months;
    let calc = engine.medicine(&item, &request).unwrap();
    assert_eq!(calc.units_needed, dec!(60));
    assert_eq!(calc.total_cost, dec!(450));
}

#[test]
fn test_medicine_line_through_dispatch() {
    let engine = PricingEngine::default();
    let item = medicine("Tablet", "500 mg", dec!(2.5));
    let request = prescription(dec!(1), DoseUnit::Tablet, dec!(3), dec!(5));

    let lines = engine.price(&item, &PricingInput::Medicine(request)).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, dec!(15));
    assert_eq!(lines[0].total_price, dec!(37.5));
}

#[test]
fn test_medicine_rejects_zero_frequency() {
    let engine = PricingEngine::default();
    let item = medicine("Tablet", "500 mg", dec!(2.5));
    let request = prescription(dec!(1), DoseUnit::Tablet, dec!(0), dec!(5));
    assert!(matches!(
        engine.medicine(&item, &request),
        Err(PricingError::InvalidInput(_))
    ));
}

fn chest() -> Item {
    let mut item = Item::new("X-ray", "Chest", dec!(300));
    item.xray_pricing = Some(XrayPricing {
        ap: Some(dec!(400)),
        lat: Some(dec!(450)),
        oblique: Some(dec!(500)),
        both: Some(dec!(600)),
    });
    item
}

fn xray(views: &[XrayView], portable: bool) -> XrayRequest {
    XrayRequest {
        mode: XrayMode::Views(ViewSelection::from_views(views.iter().copied())),
        portable,
    }
}

#[test]
fn test_xray_flexible_pairs_and_triples() {
    let engine = PricingEngine::default();
    let item = chest();

    let pair = engine.xray(&item, &xray(&[XrayView::Ap, XrayView::Lat], false)).unwrap();
    assert!(pair.flexible);
    assert_eq!(pair.total, dec!(300));

    let triple = engine
        .xray(&item, &xray(&[XrayView::Ap, XrayView::Lat, XrayView::Oblique], false))
        .unwrap();
    assert_eq!(triple.total, dec!(600));
}

#[test]
fn test_xray_single_view_portable() {
    let engine = PricingEngine::default();
    let quote = engine.xray(&chest(), &xray(&[XrayView::Lat], true)).unwrap();
    assert_eq!(quote.base_cost, dec!(450));
    assert_eq!(quote.portable_fee, dec!(70));
    assert_eq!(quote.total, dec!(520));

    let line = quote.into_candidate(&chest());
    assert_eq!(line.name, "Chest (LAT, Portable)");
    assert!(line.bundled);
}

#[test]
fn test_xray_strict_pricing_sums_views() {
    let engine = PricingEngine::default();
    let mut item = chest();
    if let Some(pricing) = item.xray_pricing.as_mut() {
        pricing.both = Some(dec!(800));
    }

    let pair = engine.xray(&item, &xray(&[XrayView::Ap, XrayView::Lat], false)).unwrap();
    assert!(!pair.flexible);
    assert_eq!(pair.total, dec!(850));

    let both = engine.xray(&item, &xray(&[XrayView::Both], false)).unwrap();
    assert_eq!(both.total, dec!(800));
}

#[test]
fn test_xray_manual_amount() {
    let engine = PricingEngine::default();
    let request = XrayRequest {
        mode: XrayMode::Manual { amount: dec!(1200) },
        portable: true,
    };
    assert_eq!(engine.xray(&chest(), &request).unwrap().total, dec!(1270));
}

#[test]
fn test_xray_empty_selection_rejected() {
    let engine = PricingEngine::default();
    assert!(matches!(
        engine.xray(&chest(), &xray(&[], false)),
        Err(PricingError::InvalidInput(_))
    ));
}

#[test]
fn test_oxygen_two_hours() {
    let engine = PricingEngine::default();
    let request = O2IsoRequest {
        oxygen: Some(OxygenRequest {
            start: parse_datetime("2024-01-01T00:00").unwrap(),
            end: parse_datetime("2024-01-01T02:00").unwrap(),
            liters_per_hour: Some(dec!(2)),
            rate_per_liter_hour: None,
        }),
        iso: None,
    };

    let quote = engine.o2_iso(&request, None, None).unwrap();
    let oxygen = quote.oxygen.unwrap();
    assert_eq!(oxygen.hours, dec!(2));
    assert_eq!(oxygen.total_liters, dec!(4));
    assert_eq!(oxygen.total_cost, dec!(260));
    assert_eq!(quote.combined_total, dec!(260));
}

#[test]
fn test_oxygen_and_iso_combined() {
    let engine = PricingEngine::default();
    let request = O2IsoRequest {
        oxygen: Some(OxygenRequest {
            start: parse_datetime("2024-01-01T08:00").unwrap(),
            end: parse_datetime("2024-01-01T09:30").unwrap(),
            liters_per_hour: None,
            rate_per_liter_hour: None,
        }),
        iso: Some(IsoRequest {
            start: parse_datetime("2024-01-01T08:00").unwrap(),
            end: parse_datetime("2024-01-01T08:45").unwrap(),
            rate_per_minute: None,
        }),
    };

    let quote = engine.o2_iso(&request, None, None).unwrap();
    // 1.5 h × 2 L × 65 = 195; 45 min × 30 = 1350
    assert_eq!(quote.combined_total, dec!(1545));

    let lines = quote.into_candidates("O2, ISO");
    let names: Vec<_> = lines.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["O2", "ISO"]);
    assert_eq!(lines[1].quantity, dec!(45));
}

#[test]
fn test_invalid_range_leaves_cart_untouched() {
    let engine = PricingEngine::default();
    let mut cart = Cart::default();
    let request = O2IsoRequest {
        oxygen: Some(OxygenRequest {
            start: parse_datetime("2024-01-01T00:00").unwrap(),
            end: parse_datetime("2024-01-01T02:00").unwrap(),
            liters_per_hour: None,
            rate_per_liter_hour: None,
        }),
        iso: Some(IsoRequest {
            start: parse_datetime("2024-01-01T05:00").unwrap(),
            end: parse_datetime("2024-01-01T04:00").unwrap(),
            rate_per_minute: None,
        }),
    };

    match engine.o2_iso(&request, None, None) {
        Err(PricingError::InvalidRange(_)) => {}
        other => panic!("expected invalid range, got {:?}", other),
    }
    assert!(cart.is_empty());
    assert_eq!(cart.totals().grand_total, Decimal::ZERO);

    // The valid half alone still prices.
    let oxygen_only = O2IsoRequest {
        iso: None,
        ..request
    };
    let lines = engine
        .o2_iso(&oxygen_only, None, None)
        .unwrap()
        .into_candidates("O2, ISO");
    cart.add_all(lines).unwrap();
    assert_eq!(cart.totals().grand_total, dec!(260));
}

#[test]
fn test_or_complex_with_discount() {
    let engine = PricingEngine::default();
    let item = Item::new("Procedure", "Laparotomy", dec!(1000));
    let request = ProcedureRequest::Catalog {
        units: 1,
        options: SurgeryOptions {
            is_complex: true,
            has_discount: true,
            has_c_arm: false,
        },
        additional: vec![],
    };

    let selection = engine.procedure(&item, &request).unwrap();
    assert_eq!(selection.base_cost, dec!(750));
    assert_eq!(selection.units_cost, dec!(440));
    assert_eq!(selection.total_cost, dec!(1190));
}

#[test]
fn test_or_additional_surgeries_and_c_arm() {
    let engine = PricingEngine::default();
    let item = Item::new("Procedure", "ORIF Femur", dec!(20000));
    let request = ProcedureRequest::Catalog {
        units: 3,
        options: SurgeryOptions {
            has_c_arm: true,
            ..Default::default()
        },
        additional: vec![AdditionalSurgery {
            name: "K-wire".into(),
            price: dec!(2000),
            options: SurgeryOptions {
                has_discount: true,
                has_c_arm: true,
                ..Default::default()
            },
        }],
    };

    let selection = engine.procedure(&item, &request).unwrap();
    // 1000 discounted + 4000 own C-Arm
    assert_eq!(selection.additional_surgeries_cost, dec!(5000));
    assert_eq!(selection.total_cost, dec!(20000) + dec!(5000) + dec!(1320) + dec!(4000));
}

#[test]
fn test_or_units_clamped() {
    let engine = PricingEngine::default();
    let item = Item::new("Procedure", "Appendectomy", dec!(8000));
    let request = ProcedureRequest::Catalog {
        units: 25,
        options: SurgeryOptions::default(),
        additional: vec![],
    };
    let selection = engine.procedure(&item, &request).unwrap();
    assert_eq!(selection.units, 10);
    assert_eq!(selection.units_cost, dec!(4400));
}

#[test]
fn test_manual_or() {
    let engine = PricingEngine::default();
    let selection = engine.manual_procedure("Debridement", dec!(3000)).unwrap();
    assert!(selection.manual);
    assert_eq!(selection.total_cost, dec!(3440));
}

#[test]
fn test_room_general_three_days() {
    let engine = PricingEngine::default();
    let request = RoomRequest {
        admission: parse_date("2024-03-01").unwrap(),
        discharge: parse_date("2024-03-04").unwrap(),
        visitations: 2,
        room_type: Some(RoomType::General),
    };
    let quote = engine.room(None, &request).unwrap();
    assert_eq!(quote.total, dec!(600));
}

#[test]
fn test_room_same_day_rejected() {
    let engine = PricingEngine::default();
    let request = RoomRequest {
        admission: parse_date("2024-03-01").unwrap(),
        discharge: parse_date("2024-03-01").unwrap(),
        visitations: 0,
        room_type: None,
    };
    assert!(matches!(engine.room(None, &request), Err(PricingError::InvalidInput(_))));
}

#[test]
fn test_shape_mismatch_rejected() {
    let engine = PricingEngine::default();
    let request = StandardRequest { quantity: None };
    assert!(matches!(
        engine.price(&chest(), &PricingInput::Standard(request)),
        Err(PricingError::ShapeMismatch { .. })
    ));
}
