//! Refund request engine

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::refund::{
    build_refund_lines, has_overlapping_request, RefundRequest, RefundStatus, RequestedItem,
};
use crate::error::{AppError, Result};
use crate::store::{OrderStore, PerfumeStore, RefundStore};

#[derive(Clone)]
pub struct RefundService {
    pool: PgPool,
    orders: OrderStore,
    perfumes: PerfumeStore,
    refunds: RefundStore,
    window_days: i64,
}

impl RefundService {
    pub fn new(
        pool: PgPool,
        orders: OrderStore,
        perfumes: PerfumeStore,
        refunds: RefundStore,
        window_days: i64,
    ) -> Self {
        Self { pool, orders, perfumes, refunds, window_days }
    }

    /// Validate eligibility and file a PENDING request. Nothing on the
    /// order changes until approval.
    pub async fn create(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        items: Vec<RequestedItem>,
    ) -> Result<RefundRequest> {
        let order = self.orders.get(order_id).await?;
        // Ownership and eligibility come before the duplicate guard; a
        // caller who does not own the order learns nothing about its
        // refund history.
        let lines = build_refund_lines(&order, user_id, &items, Utc::now(), self.window_days)
            .map_err(|e| AppError::client(e.to_string()))?;
        let existing = self.refunds.list_for_order(order_id).await?;
        if has_overlapping_request(&existing, &items) {
            return Err(AppError::client(
                "a refund request for this order already covers one of the items",
            ));
        }
        let total_amount: Decimal = lines.iter().map(|l| l.amount).sum();
        let request = RefundRequest {
            id: Uuid::now_v7(),
            user_id,
            order_id,
            lines,
            total_amount,
            status: RefundStatus::Pending,
            rejection_reason: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        self.refunds.insert(&request).await?;
        tracing::info!(
            refund_id = %request.id,
            order_id = %order_id,
            amount = %request.total_amount,
            "refund request filed"
        );
        Ok(request)
    }

    /// Approve a pending request: restock each refunded line, shrink or
    /// remove the order lines, and mark the request processed, all in
    /// one transaction. A mid-loop failure reverts every aggregate.
    pub async fn approve(&self, refund_id: Uuid) -> Result<()> {
        let request = self.refunds.get(refund_id).await?;
        if request.status != RefundStatus::Pending {
            return Err(AppError::client("refund request was already processed"));
        }

        let mut tx = self.pool.begin().await?;
        // Row lock: a concurrent approval on the same order waits here
        // and then sees this one's committed line list.
        let mut order = self.orders.get_for_update(&mut tx, request.order_id).await?;
        for line in &request.lines {
            self.perfumes
                .restock(&mut tx, line.perfume_id, line.volume, line.quantity)
                .await?;
        }
        let emptied = order.apply_refund(&request.lines);
        self.orders.update_after_refund(&mut tx, &order).await?;
        self.refunds.resolve(&mut tx, refund_id, RefundStatus::Approved, None).await?;
        tx.commit().await?;

        tracing::info!(
            refund_id = %refund_id,
            order_id = %order.id,
            emptied,
            "refund approved"
        );
        Ok(())
    }

    pub async fn reject(&self, refund_id: Uuid, reason: &str) -> Result<()> {
        let request = self.refunds.get(refund_id).await?;
        if request.status != RefundStatus::Pending {
            return Err(AppError::client("refund request was already processed"));
        }
        let mut conn = self.pool.acquire().await?;
        self.refunds
            .resolve(&mut conn, refund_id, RefundStatus::Rejected, Some(reason))
            .await?;
        tracing::info!(refund_id = %refund_id, reason, "refund rejected");
        Ok(())
    }

    pub async fn list_pending(&self) -> Result<Vec<RefundRequest>> {
        self.refunds.list_pending().await
    }

    pub async fn list_for_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Vec<RefundRequest>> {
        let order = self.orders.get(order_id).await?;
        if order.user_id != user_id {
            return Err(AppError::NotFound("order"));
        }
        self.refunds.list_for_order(order_id).await
    }
}
