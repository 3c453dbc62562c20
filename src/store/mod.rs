//! Persistence gateway: the storage contract the resource service runs against.
//!
//! Records cross this boundary as JSON rows described by a [`RecordDescriptor`], so one
//! gateway serves every record type. Two backends ship with the crate: PostgreSQL and an
//! in-memory store for tests and demos.

mod memory;
mod postgres;

pub use memory::MemoryGateway;
pub use postgres::PgGateway;

use crate::error::StoreError;
use crate::model::{Include, RecordDescriptor, Row};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Insert one row; returns the identifier the backend assigned.
    async fn insert(&self, desc: &'static RecordDescriptor, row: &Row) -> Result<u64, StoreError>;

    /// Every record ordered by identifier, with `includes` loaded under their relation names.
    async fn find_all(
        &self,
        desc: &'static RecordDescriptor,
        includes: &[Include],
    ) -> Result<Vec<Value>, StoreError>;

    async fn find_by_id(
        &self,
        desc: &'static RecordDescriptor,
        id: u64,
        includes: &[Include],
    ) -> Result<Option<Value>, StoreError>;

    /// Write the columns present in `patch`. Returns false when no row has this identifier.
    async fn update_by_id(
        &self,
        desc: &'static RecordDescriptor,
        id: u64,
        patch: &Row,
    ) -> Result<bool, StoreError>;

    /// Delete the row and, recursively, every child reachable through the descriptor's
    /// relations. Returns false when no row has this identifier.
    async fn delete_by_id(&self, desc: &'static RecordDescriptor, id: u64) -> Result<bool, StoreError>;

    /// Open a transactional scope. Dropping the handle without `commit` rolls back.
    async fn begin(&self) -> Result<Box<dyn GatewayTx>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait GatewayTx: Send {
    async fn insert(&mut self, desc: &'static RecordDescriptor, row: &Row) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Backend identifiers are BIGINT; larger values cannot name a stored row.
pub(crate) fn to_pg_id(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::not_found(format!("id {} out of range", id)))
}

pub(crate) fn from_pg_id(id: i64) -> Result<u64, StoreError> {
    u64::try_from(id).map_err(|_| StoreError::other(format!("negative id {} returned", id)))
}
