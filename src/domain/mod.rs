//! Domain model: perfumes, discounts, orders, refunds, payment masking.

pub mod card;
pub mod discount;
pub mod order;
pub mod perfume;
pub mod refund;

use rust_decimal::{Decimal, RoundingStrategy};

/// Truncate an amount to whole cents, never rounding up.
pub fn truncate_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_never_rounds_up() {
        assert_eq!(truncate_cents(Decimal::new(900045, 4)), Decimal::new(9000, 2));
        assert_eq!(truncate_cents(Decimal::new(79999, 3)), Decimal::new(7999, 2));
        assert_eq!(truncate_cents(Decimal::new(8000, 2)), Decimal::new(8000, 2));
    }
}
