//! Invoice notification seam
//!
//! Email delivery and PDF rendering live outside this service. The
//! core renders a plain-text invoice document and hands it to a
//! [`Notifier`]; delivery is best-effort and always happens after the
//! order has committed.

use async_trait::async_trait;

use crate::domain::order::Order;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_invoice_email(&self, order: &Order, document: &[u8]) -> anyhow::Result<()>;
}

/// Stand-in sink that logs instead of delivering.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_invoice_email(&self, order: &Order, document: &[u8]) -> anyhow::Result<()> {
        tracing::info!(
            order_id = %order.id,
            invoice = order.invoice_number,
            recipient = %order.email,
            bytes = document.len(),
            "invoice email dispatched"
        );
        Ok(())
    }
}

pub fn render_invoice(order: &Order) -> Vec<u8> {
    let mut doc = String::new();
    doc.push_str(&format!("INVOICE #{}\n", order.invoice_number));
    doc.push_str(&format!("Order {} for {}\n\n", order.id, order.shipping_address.name));
    for line in &order.lines {
        doc.push_str(&format!(
            "{:>3} x {} {}ml @ {} = {}\n",
            line.quantity, line.name, line.volume, line.discounted_unit_price, line.total_price
        ));
    }
    if !order.discount_amount.is_zero() {
        doc.push_str(&format!("\nDiscount applied: -{}\n", order.discount_amount));
    }
    doc.push_str(&format!("\nTotal: {}\n", order.total_amount));
    doc.push_str(&format!("Card ending in {}\n", order.card.last_four));
    doc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::MaskedCard;
    use crate::domain::order::{Address, OrderStatus, PaymentStatus};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn invoice_never_contains_hashed_card_fields() {
        let order = Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: "buyer@example.com".into(),
            lines: vec![],
            total_amount: Decimal::ZERO,
            discount_ids: vec![],
            discount_amount: Decimal::ZERO,
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Pending,
            shipping_address: Address::default(),
            tax_id: None,
            payment_reference: "PAY-TEST".into(),
            invoice_number: 100042,
            invoice_url: "/invoices/100042.pdf".into(),
            card: MaskedCard::from_raw("4111111111111111", "T", "12/27", "123"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let doc = String::from_utf8(render_invoice(&order)).unwrap();
        assert!(doc.contains("100042"));
        assert!(doc.contains("ending in 1111"));
        assert!(!doc.contains(&order.card.number_hash));
    }
}
