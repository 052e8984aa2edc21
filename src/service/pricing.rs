//! Pricing resolver

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::discount::Discount;
use crate::error::Result;
use crate::store::DiscountStore;

/// Resolves the effective unit price of a perfume after at most one
/// currently live discount. No discount is the default path, not a
/// failure.
#[derive(Clone)]
pub struct PricingResolver {
    discounts: DiscountStore,
}

impl PricingResolver {
    pub fn new(discounts: DiscountStore) -> Self {
        Self { discounts }
    }

    /// Returns the effective price and the id of the discount that
    /// produced it, if any.
    pub async fn resolve_price(
        &self,
        perfume_id: Uuid,
        base_price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(Decimal, Option<Uuid>)> {
        let discount = self.discounts.active_for_perfume(perfume_id, now).await?;
        Ok(pick_price(discount, base_price, now))
    }
}

/// The SQL lookup preselects; `is_live` is the deciding predicate.
fn pick_price(
    discount: Option<Discount>,
    base_price: Decimal,
    now: DateTime<Utc>,
) -> (Decimal, Option<Uuid>) {
    match discount.filter(|d| d.is_live(now)) {
        Some(d) => (d.apply(base_price), Some(d.id)),
        None => (base_price, None),
    }
}
