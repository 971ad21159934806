//! Inpatient seat & admission fee.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{format_taka, invalid, product, sum, PricingResult, Quote};
use crate::config::PricingConfig;
use crate::models::{Item, LineItemCandidate, RoomType};
use crate::time::stay_days;

/// Line name used on the bill.
pub const SEAT_AND_ADMISSION_FEE: &str = "Seat & Ad. Fee";

#[derive(Debug, Clone, PartialEq)]
pub struct RoomRequest {
    pub admission: NaiveDate,
    pub discharge: NaiveDate,
    pub visitations: u32,
    /// Falls back to the item's room type, then general
    pub room_type: Option<RoomType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomQuote {
    pub room_type: RoomType,
    pub stay_days: u32,
    pub admission_fee: Decimal,
    pub bed_rate: Decimal,
    pub bed_charge: Decimal,
    pub visitation_fee: Decimal,
    pub total: Decimal,
    pub explanation: String,
}

impl RoomQuote {
    pub fn quote(&self) -> Quote {
        Quote {
            quantity: Decimal::ONE,
            unit_price: self.total,
            total_price: self.total,
            explanation: self.explanation.clone(),
        }
    }

    pub fn into_candidate(self, item: &Item) -> LineItemCandidate {
        LineItemCandidate::bundle(item, self.total, self.explanation).named(SEAT_AND_ADMISSION_FEE)
    }
}

/// admission + days × bed rate + visits × visitation rate.
///
/// A private room item supplies its own daily rate; otherwise the tariff's
/// default bed rate applies.
pub fn price_room(item: Option<&Item>, request: &RoomRequest, config: &PricingConfig) -> PricingResult<RoomQuote> {
    let days = stay_days(request.admission, request.discharge);
    if days == 0 {
        return Err(invalid("discharge date must be after admission date"));
    }

    let room_type = request
        .room_type
        .or_else(|| item.and_then(|i| i.room.as_ref()).map(|r| r.room_type))
        .unwrap_or(RoomType::General);
    let tariff = match room_type {
        RoomType::General => &config.general_room,
        RoomType::Private => &config.private_room,
    };

    let bed_rate = item
        .and_then(|i| i.room.as_ref().map(|r| r.daily_rate).or(Some(i.price)))
        .filter(|rate| *rate > Decimal::ZERO)
        .unwrap_or(tariff.bed_per_day);

    let admission_fee = tariff.admission;
    let bed_charge = product(bed_rate, Decimal::from(days))?;
    let visitation_fee = product(tariff.visitation, Decimal::from(request.visitations))?;
    let total = sum(sum(admission_fee, bed_charge)?, visitation_fee)?;

    Ok(RoomQuote {
        room_type,
        stay_days: days,
        admission_fee,
        bed_rate,
        bed_charge,
        visitation_fee,
        total,
        explanation: format!(
            "Admission {} + {} days × {} + {} visits × {} = {}",
            format_taka(admission_fee),
            days,
            format_taka(bed_rate),
            request.visitations,
            format_taka(tariff.visitation),
            format_taka(total)
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoomDetails;
    use crate::time::parse_date;
    use rust_decimal_macros::dec;

    fn stay(from: &str, to: &str, visits: u32, room_type: Option<RoomType>) -> RoomRequest {
        RoomRequest {
            admission: parse_date(from).unwrap(),
            discharge: parse_date(to).unwrap(),
            visitations: visits,
            room_type,
        }
    }

    #[test]
    fn test_general_bed_three_days() {
        let quote = price_room(None, &stay("2024-03-01", "2024-03-04", 2, None), &PricingConfig::default()).unwrap();
        assert_eq!(quote.stay_days, 3);
        assert_eq!(quote.total, dec!(600));
    }

    #[test]
    fn test_private_default_rate() {
        let request = stay("2024-03-01", "2024-03-03", 1, Some(RoomType::Private));
        let quote = price_room(None, &request, &PricingConfig::default()).unwrap();
        // 500 + 2 × 300 + 100
        assert_eq!(quote.total, dec!(1200));
    }

    #[test]
    fn test_private_room_item_rate() {
        let mut cabin = Item::new("Private Room Charges", "Private 1", dec!(800));
        cabin.room = Some(RoomDetails {
            room_type: RoomType::Private,
            private_type: Some("Private 1".into()),
            daily_rate: dec!(800),
        });
        let quote =
            price_room(Some(&cabin), &stay("2024-03-01", "2024-03-02", 0, None), &PricingConfig::default()).unwrap();
        assert_eq!(quote.room_type, RoomType::Private);
        assert_eq!(quote.total, dec!(1300));

        let candidate = quote.into_candidate(&cabin);
        assert_eq!(candidate.name, SEAT_AND_ADMISSION_FEE);
        assert_eq!(candidate.total_price, dec!(1300));
    }

    #[test]
    fn test_same_day_rejected() {
        let result = price_room(None, &stay("2024-03-01", "2024-03-01", 0, None), &PricingConfig::default());
        assert!(result.is_err());
    }
}
