//! PostgreSQL gateway over a sqlx pool.

use crate::config::ServerConfig;
use crate::error::StoreError;
use crate::model::{Include, RecordDescriptor, Row};
use crate::sql::{cascade_deletes, delete, insert, select_all, select_by_id, update, PgBindValue, QueryBuf};
use crate::store::{from_pg_id, to_pg_id, Gateway, GatewayTx};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{PgPool, Transaction};

#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        PgGateway { pool }
    }

    pub async fn connect(config: &ServerConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(PgGateway { pool })
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn insert(&self, desc: &'static RecordDescriptor, row: &Row) -> Result<u64, StoreError> {
        insert_row(&self.pool, desc, row).await
    }

    async fn find_all(
        &self,
        desc: &'static RecordDescriptor,
        includes: &[Include],
    ) -> Result<Vec<Value>, StoreError> {
        let q = select_all(desc, includes);
        tracing::debug!(sql = %q.sql, "query");
        let rows = sqlx::query_scalar::<_, Value>(&q.sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_id(
        &self,
        desc: &'static RecordDescriptor,
        id: u64,
        includes: &[Include],
    ) -> Result<Option<Value>, StoreError> {
        let id = to_pg_id(id)?;
        let q = select_by_id(desc, includes);
        tracing::debug!(sql = %q.sql, id, "query");
        let row = sqlx::query_scalar::<_, Value>(&q.sql)
            .bind(PgBindValue::I64(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_by_id(
        &self,
        desc: &'static RecordDescriptor,
        id: u64,
        patch: &Row,
    ) -> Result<bool, StoreError> {
        to_pg_id(id)?;
        let q = update(desc, id, patch);
        let updated = fetch_optional_id(&self.pool, &q).await?;
        Ok(updated.is_some())
    }

    async fn delete_by_id(&self, desc: &'static RecordDescriptor, id: u64) -> Result<bool, StoreError> {
        let id = to_pg_id(id)?;
        let mut tx = self.pool.begin().await?;
        for sql in cascade_deletes(desc) {
            tracing::debug!(sql = %sql, id, "query (tx)");
            sqlx::query(&sql)
                .bind(PgBindValue::I64(id))
                .execute(&mut *tx)
                .await?;
        }
        let q = delete(desc);
        tracing::debug!(sql = %q.sql, id, "query (tx)");
        let deleted = sqlx::query_scalar::<_, i64>(&q.sql)
            .bind(PgBindValue::I64(id))
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(deleted.is_some())
    }

    async fn begin(&self) -> Result<Box<dyn GatewayTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Open transaction; sqlx rolls it back when dropped uncommitted.
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl GatewayTx for PgTx {
    async fn insert(&mut self, desc: &'static RecordDescriptor, row: &Row) -> Result<u64, StoreError> {
        insert_row(&mut *self.tx, desc, row).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

async fn insert_row<'c, E>(executor: E, desc: &RecordDescriptor, row: &Row) -> Result<u64, StoreError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let q = insert(desc, row);
    let id = fetch_optional_id(executor, &q)
        .await?
        .ok_or_else(|| StoreError::other(format!("insert into {} returned no id", desc.table)))?;
    Ok(id)
}

async fn fetch_optional_id<'c, E>(executor: E, q: &QueryBuf) -> Result<Option<u64>, StoreError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    match query.fetch_optional(executor).await? {
        Some(id) => Ok(Some(from_pg_id(id)?)),
        None => Ok(None),
    }
}
