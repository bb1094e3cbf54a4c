// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Postgres-backed [`Store`] implementation.
//!
//! Grounded on `PostgresStore[T]` (`agent_platform/shared/postgres_store.py`):
//! one table per logical store, a single `JSONB` `data` column, upsert on
//! the primary key. Spec §4.1/§6's persisted schema:
//! `(key TEXT PRIMARY KEY, data JSONB NOT NULL, created_at, updated_at)`.
//!
//! `Store<T>`'s methods are synchronous (spec §9: "coroutine-free model");
//! this implementation owns a dedicated Tokio runtime and bridges every call
//! through `Handle::block_on`, the same blocking-over-async shape `reqwest`'s
//! blocking client uses elsewhere in this workspace.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use agentgov_core::error::{GovernorError, Result};
use agentgov_core::store::Store;

pub struct PgStore<T> {
    pool: PgPool,
    table: String,
    runtime: tokio::runtime::Runtime,
    _marker: std::marker::PhantomData<T>,
}

impl<T> PgStore<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned,
{
    /// Connect to `database_url` and create `table` (if absent) to back
    /// this logical store. `table` must already be a valid SQL identifier —
    /// callers control it, it is never derived from request input.
    pub fn connect(database_url: &str, table: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| GovernorError::Configuration(format!("failed to start tokio runtime: {}", e)))?;

        let table = table.to_string();
        let pool = runtime.block_on(async {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .map_err(|e| GovernorError::ServiceUnavailable {
                    service: "postgres".to_string(),
                    reason: e.to_string(),
                })?;
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    key TEXT PRIMARY KEY,
                    data JSONB NOT NULL,
                    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
                )",
                table
            ))
            .execute(&pool)
            .await
            .map_err(|e| GovernorError::StoreWrite(format!("failed to create table {}: {}", table, e)))?;
            Ok::<PgPool, GovernorError>(pool)
        })?;

        Ok(Self {
            pool,
            table,
            runtime,
            _marker: std::marker::PhantomData,
        })
    }
}

impl<T> Store<T> for PgStore<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned,
{
    fn put(&self, key: &str, value: T) -> Result<()> {
        let json = serde_json::to_value(&value)
            .map_err(|e| GovernorError::StoreWrite(format!("serialization failed: {}", e)))?;
        self.runtime.block_on(async {
            sqlx::query(&format!(
                "INSERT INTO {} (key, data, updated_at) VALUES ($1, $2, NOW())
                 ON CONFLICT (key) DO UPDATE SET data = $2, updated_at = NOW()",
                self.table
            ))
            .bind(key)
            .bind(&json)
            .execute(&self.pool)
            .await
            .map_err(|e| GovernorError::StoreWrite(e.to_string()))?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> Result<Option<T>> {
        self.runtime.block_on(async {
            let row = sqlx::query(&format!("SELECT data FROM {} WHERE key = $1", self.table))
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| GovernorError::StoreRead(e.to_string()))?;
            match row {
                None => Ok(None),
                Some(row) => {
                    let data: serde_json::Value = row.try_get("data").map_err(|e| GovernorError::StoreRead(e.to_string()))?;
                    let value: T = serde_json::from_value(data)
                        .map_err(|e| GovernorError::StoreRead(format!("deserialization failed: {}", e)))?;
                    Ok(Some(value))
                }
            }
        })
    }

    fn list(&self, prefix: &str) -> Result<Vec<T>> {
        self.runtime.block_on(async {
            let pattern = format!("{}%", prefix);
            let rows = sqlx::query(&format!(
                "SELECT data FROM {} WHERE key LIKE $1 ORDER BY created_at",
                self.table
            ))
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GovernorError::StoreRead(e.to_string()))?;

            rows.into_iter()
                .map(|row| {
                    let data: serde_json::Value = row.try_get("data").map_err(|e| GovernorError::StoreRead(e.to_string()))?;
                    serde_json::from_value(data)
                        .map_err(|e| GovernorError::StoreRead(format!("deserialization failed: {}", e)))
                })
                .collect()
        })
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.runtime.block_on(async {
            let result = sqlx::query(&format!("DELETE FROM {} WHERE key = $1", self.table))
                .bind(key)
                .execute(&self.pool)
                .await
                .map_err(|e| GovernorError::StoreWrite(e.to_string()))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.runtime.block_on(async {
            let row = sqlx::query(&format!("SELECT 1 FROM {} WHERE key = $1", self.table))
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| GovernorError::StoreRead(e.to_string()))?;
            Ok(row.is_some())
        })
    }
}