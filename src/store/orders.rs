//! Order storage

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::card::MaskedCard;
use crate::domain::order::{Address, Order, OrderLine};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct OrderStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    email: String,
    items: Json<Vec<OrderLine>>,
    total_amount: Decimal,
    discount_ids: Vec<Uuid>,
    discount_amount: Decimal,
    status: String,
    payment_status: String,
    shipping_address: Json<Address>,
    tax_id: Option<String>,
    payment_reference: String,
    invoice_number: i64,
    invoice_url: String,
    card: Json<MaskedCard>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order {
            id: r.id,
            user_id: r.user_id,
            email: r.email,
            lines: r.items.0,
            total_amount: r.total_amount,
            discount_ids: r.discount_ids,
            discount_amount: r.discount_amount,
            status: r.status.parse().map_err(|e: String| AppError::Internal(anyhow!(e)))?,
            payment_status: r
                .payment_status
                .parse()
                .map_err(|e: String| AppError::Internal(anyhow!(e)))?,
            shipping_address: r.shipping_address.0,
            tax_id: r.tax_id,
            payment_reference: r.payment_reference,
            invoice_number: r.invoice_number,
            invoice_url: r.invoice_url,
            card: r.card.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

impl OrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Invoice numbers come from a dedicated sequence: monotonic and
    /// collision-free.
    pub async fn next_invoice_number(&self, conn: &mut PgConnection) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT nextval('invoice_number_seq')")
            .fetch_one(&mut *conn)
            .await?;
        Ok(n)
    }

    pub async fn insert(&self, conn: &mut PgConnection, order: &Order) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, email, items, total_amount, discount_ids, \
             discount_amount, status, payment_status, shipping_address, tax_id, \
             payment_reference, invoice_number, invoice_url, card, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(&order.email)
        .bind(Json(&order.lines))
        .bind(order.total_amount)
        .bind(&order.discount_ids)
        .bind(order.discount_amount)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(Json(&order.shipping_address))
        .bind(&order.tax_id)
        .bind(&order.payment_reference)
        .bind(order.invoice_number)
        .bind(&order.invoice_url)
        .bind(Json(&order.card))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Order> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("order"))?;
        row.try_into()
    }

    /// Fetch with a row lock held until the caller's transaction ends.
    /// Concurrent refund approvals on the same order serialize here,
    /// so each one reads the line list the previous commit left.
    pub async fn get_for_update(&self, conn: &mut PgConnection, id: Uuid) -> Result<Order> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(AppError::NotFound("order"))?;
        row.try_into()
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    /// Persist the outcome of an approved refund in one statement.
    pub async fn update_after_refund(&self, conn: &mut PgConnection, order: &Order) -> Result<()> {
        sqlx::query(
            "UPDATE orders SET items = $2, total_amount = $3, status = $4, \
             payment_status = $5, updated_at = NOW() WHERE id = $1",
        )
        .bind(order.id)
        .bind(Json(&order.lines))
        .bind(order.total_amount)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Hard delete; only the cancel-while-PROCESSING path uses this.
    pub async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn ids_awaiting_payment(&self) -> Result<Vec<Uuid>> {
        let ids: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM orders WHERE status = 'PROCESSING' AND payment_status = 'PENDING'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    pub async fn ids_in_transit(&self) -> Result<Vec<Uuid>> {
        let ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM orders WHERE status = 'IN_TRANSIT'")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Simulator step: payment completes and the order leaves the
    /// warehouse. Guarded on the current state so a concurrent cancel
    /// or refund is never overwritten.
    pub async fn mark_paid_and_shipped(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE orders SET payment_status = 'COMPLETED', status = 'IN_TRANSIT', \
             updated_at = NOW() \
             WHERE id = $1 AND status = 'PROCESSING' AND payment_status = 'PENDING'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_delivered(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE orders SET status = 'DELIVERED', updated_at = NOW() \
             WHERE id = $1 AND status = 'IN_TRANSIT'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
