//! Postgres-backed store: one JSONB row per key in `kv_store`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use crate::store::{ResumeStore, STORAGE_KEY};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps `pool`, creating the `kv_store` table when missing.
    pub async fn new(pool: PgPool) -> Result<Self> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key        TEXT PRIMARY KEY,
                value      JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create kv_store table")?;
        info!("kv_store table ready");
        Ok(())
    }
}

#[async_trait]
impl ResumeStore for PgStore {
    async fn load(&self) -> Result<Option<String>> {
        let value: Option<Value> =
            sqlx::query_scalar("SELECT value FROM kv_store WHERE key = $1")
                .bind(STORAGE_KEY)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to load master resume")?;
        Ok(value.map(|v| v.to_string()))
    }

    async fn save(&self, document: &str) -> Result<()> {
        let value: Value =
            serde_json::from_str(document).context("Refusing to store a non-JSON document")?;
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(STORAGE_KEY)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("Failed to save master resume")?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("postgres kv_store[{STORAGE_KEY}]")
    }
}
