//! Refund requests: eligibility, proportional amounts, duplicate guard

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::order::{Order, OrderStatus, PaymentStatus};
use super::truncate_cents;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::str::FromStr for RefundStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(format!("unknown refund status {other:?}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefundLine {
    pub perfume_id: Uuid,
    pub volume: i32,
    pub quantity: i32,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefundRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub lines: Vec<RefundLine>,
    pub total_amount: Decimal,
    pub status: RefundStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// One requested line, before amounts are computed.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RequestedItem {
    pub perfume_id: Uuid,
    pub volume: i32,
    pub quantity: i32,
}

#[derive(Debug, Error)]
pub enum RefundError {
    #[error("refund request contains no items")]
    EmptyRequest,
    #[error("order does not belong to the requesting user")]
    NotOwner,
    #[error("only delivered orders can be refunded")]
    NotDelivered,
    #[error("order payment is not completed")]
    PaymentIncomplete,
    #[error("refund period expired")]
    WindowExpired,
    #[error("perfume {perfume_id} is not part of the order")]
    ItemNotInOrder { perfume_id: Uuid },
    #[error("perfume {perfume_id} was not ordered in volume {volume}ml")]
    VolumeMismatch { perfume_id: Uuid, volume: i32 },
    #[error("refund quantity {requested} exceeds ordered quantity {ordered}")]
    QuantityExceeded { requested: i32, ordered: i32 },
    #[error("a refund request for this order already covers one of the items")]
    Duplicate,
}

/// Validate eligibility and compute per-line refund amounts.
///
/// The order-level discount is spread proportionally across refunded
/// units via `discount_amount / total_amount`, regardless of which
/// concrete discount applied to which line.
pub fn build_refund_lines(
    order: &Order,
    user_id: Uuid,
    items: &[RequestedItem],
    now: DateTime<Utc>,
    window_days: i64,
) -> Result<Vec<RefundLine>, RefundError> {
    if items.is_empty() {
        return Err(RefundError::EmptyRequest);
    }
    if order.user_id != user_id {
        return Err(RefundError::NotOwner);
    }
    if order.status != OrderStatus::Delivered {
        return Err(RefundError::NotDelivered);
    }
    if order.payment_status != PaymentStatus::Completed {
        return Err(RefundError::PaymentIncomplete);
    }
    if order.age_days(now) > window_days {
        return Err(RefundError::WindowExpired);
    }

    let ratio = order.discount_ratio();
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let line = match order.line(item.perfume_id, item.volume) {
            Some(line) => line,
            None if order.lines.iter().any(|l| l.perfume_id == item.perfume_id) => {
                return Err(RefundError::VolumeMismatch {
                    perfume_id: item.perfume_id,
                    volume: item.volume,
                })
            }
            None => return Err(RefundError::ItemNotInOrder { perfume_id: item.perfume_id }),
        };
        if item.quantity < 1 || item.quantity > line.quantity {
            return Err(RefundError::QuantityExceeded {
                requested: item.quantity,
                ordered: line.quantity,
            });
        }
        let amount = truncate_cents(
            line.unit_price * (Decimal::ONE - ratio) * Decimal::from(item.quantity),
        );
        lines.push(RefundLine {
            perfume_id: item.perfume_id,
            volume: item.volume,
            quantity: item.quantity,
            amount,
        });
    }
    Ok(lines)
}

/// Duplicate guard: a PENDING or REJECTED request on the same order
/// that overlaps on perfume id blocks a new submission. Blocking on
/// REJECTED mirrors long-standing behavior; see DESIGN.md before
/// changing it.
pub fn has_overlapping_request(existing: &[RefundRequest], items: &[RequestedItem]) -> bool {
    existing
        .iter()
        .filter(|r| matches!(r.status, RefundStatus::Pending | RefundStatus::Rejected))
        .any(|r| {
            r.lines
                .iter()
                .any(|l| items.iter().any(|i| i.perfume_id == l.perfume_id))
        })
}
