//! Discount storage

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::discount::Discount;
use crate::error::Result;

#[derive(Clone)]
pub struct DiscountStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct DiscountRow {
    id: Uuid,
    name: String,
    perfume_ids: Vec<Uuid>,
    rate: Decimal,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    active: bool,
}

impl From<DiscountRow> for Discount {
    fn from(r: DiscountRow) -> Self {
        Discount {
            id: r.id,
            name: r.name,
            perfume_ids: r.perfume_ids,
            rate: r.rate,
            starts_at: r.starts_at,
            ends_at: r.ends_at,
            active: r.active,
        }
    }
}

impl DiscountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// At most one live discount covering the perfume; most recently
    /// created wins when several overlap.
    pub async fn active_for_perfume(
        &self,
        perfume_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Discount>> {
        let row = sqlx::query_as::<_, DiscountRow>(
            "SELECT id, name, perfume_ids, rate, starts_at, ends_at, active FROM discounts \
             WHERE active AND starts_at <= $2 AND ends_at >= $2 AND $1 = ANY(perfume_ids) \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(perfume_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Discount::from))
    }

    pub async fn list(&self) -> Result<Vec<Discount>> {
        let rows = sqlx::query_as::<_, DiscountRow>(
            "SELECT id, name, perfume_ids, rate, starts_at, ends_at, active FROM discounts \
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Discount::from).collect())
    }

    pub async fn insert(&self, discount: &Discount) -> Result<()> {
        sqlx::query(
            "INSERT INTO discounts (id, name, perfume_ids, rate, starts_at, ends_at, active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())",
        )
        .bind(discount.id)
        .bind(&discount.name)
        .bind(&discount.perfume_ids)
        .bind(discount.rate)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(discount.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
