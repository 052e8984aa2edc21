//! Cart storage
//!
//! The order builder only reads a snapshot and clears it after
//! checkout; line management is plain upsert/delete.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::Result;

#[derive(Clone)]
pub struct CartStore {
    pool: PgPool,
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub perfume_id: Uuid,
    pub volume: i32,
    pub quantity: i32,
}

impl CartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn details(&self, user_id: Uuid) -> Result<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT perfume_id, volume, quantity FROM cart_items \
             WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    pub async fn add(&self, user_id: Uuid, line: &CartLine) -> Result<()> {
        sqlx::query(
            "INSERT INTO cart_items (user_id, perfume_id, volume, quantity, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (user_id, perfume_id, volume) \
             DO UPDATE SET quantity = cart_items.quantity + $4",
        )
        .bind(user_id)
        .bind(line.perfume_id)
        .bind(line.volume)
        .bind(line.quantity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Transactional variant used by checkout.
    pub async fn clear_in(&self, conn: &mut PgConnection, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
