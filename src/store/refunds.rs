//! Refund request storage

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::refund::{RefundLine, RefundRequest, RefundStatus};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct RefundStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct RefundRow {
    id: Uuid,
    user_id: Uuid,
    order_id: Uuid,
    items: Json<Vec<RefundLine>>,
    total_amount: Decimal,
    status: String,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RefundRow> for RefundRequest {
    type Error = AppError;

    fn try_from(r: RefundRow) -> Result<Self> {
        Ok(RefundRequest {
            id: r.id,
            user_id: r.user_id,
            order_id: r.order_id,
            lines: r.items.0,
            total_amount: r.total_amount,
            status: r.status.parse().map_err(|e: String| AppError::Internal(anyhow!(e)))?,
            rejection_reason: r.rejection_reason,
            created_at: r.created_at,
            processed_at: r.processed_at,
        })
    }
}

impl RefundStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, request: &RefundRequest) -> Result<()> {
        sqlx::query(
            "INSERT INTO refund_requests (id, user_id, order_id, items, total_amount, \
             status, rejection_reason, created_at, processed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(request.id)
        .bind(request.user_id)
        .bind(request.order_id)
        .bind(Json(&request.lines))
        .bind(request.total_amount)
        .bind(request.status.as_str())
        .bind(&request.rejection_reason)
        .bind(request.created_at)
        .bind(request.processed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<RefundRequest> {
        let row = sqlx::query_as::<_, RefundRow>("SELECT * FROM refund_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("refund request"))?;
        row.try_into()
    }

    pub async fn list_for_order(&self, order_id: Uuid) -> Result<Vec<RefundRequest>> {
        let rows = sqlx::query_as::<_, RefundRow>(
            "SELECT * FROM refund_requests WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RefundRequest::try_from).collect()
    }

    pub async fn list_pending(&self) -> Result<Vec<RefundRequest>> {
        let rows = sqlx::query_as::<_, RefundRow>(
            "SELECT * FROM refund_requests WHERE status = 'PENDING' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RefundRequest::try_from).collect()
    }

    /// Move a PENDING request to its terminal state. Fails as a client
    /// error when the request was already processed.
    pub async fn resolve(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: RefundStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        let done = sqlx::query(
            "UPDATE refund_requests SET status = $2, rejection_reason = $3, \
             processed_at = NOW() WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(reason)
        .execute(&mut *conn)
        .await?;
        if done.rows_affected() == 0 {
            return Err(AppError::client("refund request was already processed"));
        }
        Ok(())
    }
}
