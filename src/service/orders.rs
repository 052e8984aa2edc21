//! Order builder and lifecycle operations

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::card::MaskedCard;
use crate::domain::order::{Address, Order, OrderLine, OrderStatus, PaymentStatus};
use crate::error::{AppError, Result};
use crate::notify::{self, Notifier};
use crate::store::{CartStore, OrderStore, PerfumeStore};

use super::PricingResolver;

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    orders: OrderStore,
    perfumes: PerfumeStore,
    carts: CartStore,
    pricing: PricingResolver,
    notifier: Arc<dyn Notifier>,
}

pub struct CheckoutInput {
    pub email: String,
    pub shipping_address: Address,
    pub tax_id: Option<String>,
    pub card_number: String,
    pub card_holder: String,
    pub card_expiry: String,
    pub card_cvc: String,
}

impl OrderService {
    pub fn new(
        pool: PgPool,
        orders: OrderStore,
        perfumes: PerfumeStore,
        carts: CartStore,
        pricing: PricingResolver,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { pool, orders, perfumes, carts, pricing, notifier }
    }

    /// Build an order from the user's cart.
    ///
    /// Validation and pricing happen before anything persists, so a bad
    /// cart line fails the whole operation with no partial order. The
    /// insert, the stock decrements, and the cart clear share one
    /// transaction, with the decrements sequenced strictly after the
    /// insert. The invoice email goes out only after commit and its
    /// failure never reverts the order.
    pub async fn checkout(&self, user_id: Uuid, input: CheckoutInput) -> Result<Order> {
        let cart = self.carts.details(user_id).await?;
        if cart.is_empty() {
            return Err(AppError::client("cart is empty"));
        }

        let now = Utc::now();
        let mut lines = Vec::with_capacity(cart.len());
        let mut discount_ids: Vec<Uuid> = Vec::new();
        for item in &cart {
            let perfume = self.perfumes.get(item.perfume_id).await?;
            if !perfume.active {
                return Err(AppError::client(format!(
                    "perfume {} is no longer available",
                    perfume.name
                )));
            }
            let variant = perfume.variant(item.volume).ok_or_else(|| {
                AppError::client(format!(
                    "invalid volume {}ml for perfume {}",
                    item.volume, perfume.name
                ))
            })?;
            let (effective, applied) =
                self.pricing.resolve_price(perfume.id, variant.price, now).await?;
            if let Some(id) = applied {
                if !discount_ids.contains(&id) {
                    discount_ids.push(id);
                }
            }
            lines.push(OrderLine {
                perfume_id: perfume.id,
                name: perfume.name.clone(),
                volume: item.volume,
                quantity: item.quantity,
                unit_price: variant.price,
                discounted_unit_price: effective,
                total_price: effective * Decimal::from(item.quantity),
            });
        }
        let (total_amount, discount_amount) = order_totals(&lines);

        let mut tx = self.pool.begin().await?;
        let invoice_number = self.orders.next_invoice_number(&mut tx).await?;
        let order = Order {
            id: Uuid::now_v7(),
            user_id,
            email: input.email,
            lines,
            total_amount,
            discount_ids,
            discount_amount,
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Pending,
            shipping_address: input.shipping_address,
            tax_id: input.tax_id,
            payment_reference: format!("PAY-{}", Uuid::new_v4().simple()),
            invoice_number,
            invoice_url: format!("/invoices/{invoice_number}.pdf"),
            card: MaskedCard::from_raw(
                &input.card_number,
                &input.card_holder,
                &input.card_expiry,
                &input.card_cvc,
            ),
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(&mut tx, &order).await?;
        for line in &order.lines {
            self.perfumes
                .decrement_stock(&mut tx, line.perfume_id, line.volume, line.quantity)
                .await?;
        }
        self.carts.clear_in(&mut tx, user_id).await?;
        tx.commit().await?;

        let notifier = Arc::clone(&self.notifier);
        let emailed = order.clone();
        tokio::spawn(async move {
            let document = notify::render_invoice(&emailed);
            if let Err(e) = notifier.send_invoice_email(&emailed, &document).await {
                tracing::warn!(order_id = %emailed.id, error = ?e, "invoice email failed");
            }
        });

        Ok(order)
    }

    pub async fn get(&self, order_id: Uuid, user_id: Uuid) -> Result<Order> {
        let order = self.orders.get(order_id).await?;
        if order.user_id != user_id {
            return Err(AppError::NotFound("order"));
        }
        Ok(order)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.orders.list_for_user(user_id).await
    }

    /// Cancel an order that has not left PROCESSING: restock every line
    /// and hard-delete the record.
    pub async fn cancel(&self, order_id: Uuid, user_id: Uuid) -> Result<()> {
        let order = self.orders.get(order_id).await?;
        if order.user_id != user_id {
            return Err(AppError::NotFound("order"));
        }
        if !order.can_cancel() {
            return Err(AppError::client("only processing orders can be canceled"));
        }
        let mut tx = self.pool.begin().await?;
        for line in &order.lines {
            self.perfumes
                .restock(&mut tx, line.perfume_id, line.volume, line.quantity)
                .await?;
        }
        self.orders.delete(&mut tx, order.id).await?;
        tx.commit().await?;
        tracing::info!(order_id = %order.id, "order canceled");
        Ok(())
    }
}

/// Total charged and total discount given across the lines.
fn order_totals(lines: &[OrderLine]) -> (Decimal, Decimal) {
    let total = lines.iter().map(|l| l.total_price).sum();
    let discount = lines
        .iter()
        .map(|l| (l.unit_price - l.discounted_unit_price) * Decimal::from(l.quantity))
        .sum();
    (total, discount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i32, unit: Decimal, discounted: Decimal) -> OrderLine {
        OrderLine {
            perfume_id: Uuid::new_v4(),
            name: "Test".into(),
            volume: 50,
            quantity: qty,
            unit_price: unit,
            discounted_unit_price: discounted,
            total_price: discounted * Decimal::from(qty),
        }
    }

    #[test]
    fn totals_sum_lines_and_discount_deltas() {
        let lines = vec![
            line(2, Decimal::new(10000, 2), Decimal::new(8000, 2)),
            line(1, Decimal::new(5000, 2), Decimal::new(5000, 2)),
        ];
        let (total, discount) = order_totals(&lines);
        assert_eq!(total, Decimal::new(21000, 2));
        assert_eq!(discount, Decimal::new(4000, 2));
    }

    #[test]
    fn total_equals_line_sum_at_creation() {
        let lines = vec![line(3, Decimal::new(3333, 2), Decimal::new(3333, 2))];
        let (total, _) = order_totals(&lines);
        let sum: Decimal = lines.iter().map(|l| l.total_price).sum();
        assert_eq!(total, sum);
    }
}
