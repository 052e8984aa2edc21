//! Discounts and effective-price computation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::truncate_cents;

/// A time-bounded percentage reduction over a set of perfumes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Discount {
    pub id: Uuid,
    pub name: String,
    pub perfume_ids: Vec<Uuid>,
    /// Percentage in 0..=100.
    pub rate: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub active: bool,
}

impl Discount {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && self.starts_at <= now && now <= self.ends_at
    }

    pub fn apply(&self, base_price: Decimal) -> Decimal {
        effective_price(base_price, self.rate)
    }
}

/// Discounted unit price, truncated to cents. Truncation (never
/// rounding up) keeps the charged price at or below the exact value.
pub fn effective_price(base_price: Decimal, rate: Decimal) -> Decimal {
    let discounted = base_price * (Decimal::ONE - rate / Decimal::ONE_HUNDRED);
    truncate_cents(discounted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_percent_off_one_hundred() {
        assert_eq!(
            effective_price(Decimal::new(10000, 2), Decimal::new(20, 0)),
            Decimal::new(8000, 2)
        );
    }

    #[test]
    fn fractional_result_truncates_down() {
        // 100.005 at 10% off is 90.0045, charged as 90.00.
        assert_eq!(
            effective_price(Decimal::new(100005, 3), Decimal::new(10, 0)),
            Decimal::new(9000, 2)
        );
    }

    #[test]
    fn zero_rate_is_identity() {
        let base = Decimal::new(4999, 2);
        assert_eq!(effective_price(base, Decimal::ZERO), base);
    }

    #[test]
    fn liveness_respects_window_and_flag() {
        let now = Utc::now();
        let mut d = Discount {
            id: Uuid::new_v4(),
            name: "Summer".into(),
            perfume_ids: vec![],
            rate: Decimal::new(15, 0),
            starts_at: now - chrono::Duration::days(1),
            ends_at: now + chrono::Duration::days(1),
            active: true,
        };
        assert!(d.is_live(now));
        d.active = false;
        assert!(!d.is_live(now));
        d.active = true;
        d.ends_at = now - chrono::Duration::hours(1);
        assert!(!d.is_live(now));
    }
}
