//! Order aggregate
//!
//! Orders are immutable at creation and afterwards change only through
//! three paths: refund approval (line quantity/amount reduction), the
//! fulfillment simulator (status fields only), and cancellation while
//! still PROCESSING (hard delete, handled at the store layer).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::card::MaskedCard;
use super::refund::RefundLine;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Processing,
    InTransit,
    Delivered,
    Canceled,
    Refunded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Canceled => "CANCELED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(Self::Processing),
            "IN_TRANSIT" => Ok(Self::InTransit),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELED" => Ok(Self::Canceled),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(format!("unknown order status {other:?}")),
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(format!("unknown payment status {other:?}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderLine {
    pub perfume_id: Uuid,
    pub name: String,
    pub volume: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discounted_unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub street: String,
    pub city: String,
    pub zip: String,
    pub country: String,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub lines: Vec<OrderLine>,
    pub total_amount: Decimal,
    pub discount_ids: Vec<Uuid>,
    pub discount_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: Address,
    pub tax_id: Option<String>,
    pub payment_reference: String,
    pub invoice_number: i64,
    pub invoice_url: String,
    pub card: MaskedCard,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn line(&self, perfume_id: Uuid, volume: i32) -> Option<&OrderLine> {
        self.lines
            .iter()
            .find(|l| l.perfume_id == perfume_id && l.volume == volume)
    }

    /// Fraction of the order total attributable to order-level discount.
    pub fn discount_ratio(&self) -> Decimal {
        if self.total_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.discount_amount / self.total_amount
        }
    }

    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }

    pub fn can_cancel(&self) -> bool {
        self.status == OrderStatus::Processing
    }

    /// Apply approved refund lines: reduce or remove the matching order
    /// lines, reconcile the total, and flip both statuses to REFUNDED
    /// when nothing remains. Returns whether the order emptied.
    ///
    /// The total/line-sum invariant is broken only inside this call and
    /// restored by the final recalculation before the caller commits.
    pub fn apply_refund(&mut self, refund_lines: &[RefundLine]) -> bool {
        for refund in refund_lines {
            if let Some(line) = self
                .lines
                .iter_mut()
                .find(|l| l.perfume_id == refund.perfume_id && l.volume == refund.volume)
            {
                line.quantity -= refund.quantity;
                line.total_price -= refund.amount;
            }
        }
        self.lines.retain(|l| l.quantity > 0);
        self.recalculate();

        let emptied = self.lines.is_empty();
        if emptied {
            self.status = OrderStatus::Refunded;
            self.payment_status = PaymentStatus::Refunded;
        }
        self.updated_at = Utc::now();
        emptied
    }

    fn recalculate(&mut self) {
        self.total_amount = self.lines.iter().map(|l| l.total_price).sum();
    }
}
