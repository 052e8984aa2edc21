//! Perfume catalog storage, including atomic stock movements

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::perfume::{Perfume, Variant};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct PerfumeStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct PerfumeRow {
    id: Uuid,
    name: String,
    brand: String,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    volume: i32,
    price: Decimal,
    stock: i32,
    active: bool,
}

impl From<VariantRow> for Variant {
    fn from(r: VariantRow) -> Self {
        Variant { volume: r.volume, price: r.price, stock: r.stock, active: r.active }
    }
}

impl PerfumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<Perfume> {
        let row = sqlx::query_as::<_, PerfumeRow>("SELECT * FROM perfumes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("perfume"))?;
        let variants = self.variants_of(id).await?;
        Ok(assemble(row, variants))
    }

    pub async fn list_active(&self) -> Result<Vec<Perfume>> {
        let rows = sqlx::query_as::<_, PerfumeRow>(
            "SELECT * FROM perfumes WHERE active ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let variants = self.variants_of(row.id).await?;
            out.push(assemble(row, variants));
        }
        Ok(out)
    }

    pub async fn insert(&self, perfume: &Perfume) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO perfumes (id, name, brand, description, active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(perfume.id)
        .bind(&perfume.name)
        .bind(&perfume.brand)
        .bind(&perfume.description)
        .bind(perfume.active)
        .bind(perfume.created_at)
        .execute(&mut *tx)
        .await?;
        for v in &perfume.variants {
            sqlx::query(
                "INSERT INTO perfume_variants (perfume_id, volume, price, stock, active) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(perfume.id)
            .bind(v.volume)
            .bind(v.price)
            .bind(v.stock)
            .bind(v.active)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Conditional decrement scoped to (perfume, volume). The stock
    /// check and the decrement are a single statement, so concurrent
    /// orders cannot drive stock below zero.
    pub async fn decrement_stock(
        &self,
        conn: &mut PgConnection,
        perfume_id: Uuid,
        volume: i32,
        quantity: i32,
    ) -> Result<()> {
        let done = sqlx::query(
            "UPDATE perfume_variants SET stock = stock - $3 \
             WHERE perfume_id = $1 AND volume = $2 AND stock >= $3",
        )
        .bind(perfume_id)
        .bind(volume)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
        if done.rows_affected() == 0 {
            return Err(AppError::client(format!(
                "insufficient stock for perfume {perfume_id} in volume {volume}ml"
            )));
        }
        Ok(())
    }

    pub async fn restock(
        &self,
        conn: &mut PgConnection,
        perfume_id: Uuid,
        volume: i32,
        quantity: i32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE perfume_variants SET stock = stock + $3 \
             WHERE perfume_id = $1 AND volume = $2",
        )
        .bind(perfume_id)
        .bind(volume)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn variants_of(&self, perfume_id: Uuid) -> Result<Vec<Variant>> {
        let rows = sqlx::query_as::<_, VariantRow>(
            "SELECT volume, price, stock, active FROM perfume_variants \
             WHERE perfume_id = $1 ORDER BY volume",
        )
        .bind(perfume_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Variant::from).collect())
    }
}

fn assemble(row: PerfumeRow, variants: Vec<Variant>) -> Perfume {
    Perfume {
        id: row.id,
        name: row.name,
        brand: row.brand,
        description: row.description,
        active: row.active,
        variants,
        created_at: row.created_at,
    }
}
