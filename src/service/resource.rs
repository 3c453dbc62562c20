//! Generic resource operations for any [`Record`] type against a [`Gateway`].

use crate::error::{AppError, ConfigError, StoreError};
use crate::model::{record_row, resolve_includes, ChildSet, Record, RecordDescriptor, Row};
use crate::store::{Gateway, GatewayTx};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

/// Largest identifier accepted from a path; stored identifiers are BIGINT.
const MAX_ID: u64 = i64::MAX as u64;

/// Parse a path identifier as an unsigned integer.
pub fn parse_id(raw: &str) -> Result<u64, AppError> {
    let id: u64 = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", raw)))?;
    if id > MAX_ID {
        return Err(AppError::BadRequest(format!("id {} out of range", id)));
    }
    Ok(id)
}

fn decode<D: DeserializeOwned>(payload: &[u8]) -> Result<D, AppError> {
    serde_json::from_slice(payload).map_err(|e| AppError::BadRequest(format!("invalid request body: {}", e)))
}

fn from_stored<T: Record>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::Store(StoreError::from(e)))
}

/// Strings bound to uuid-typed columns must parse as UUIDs.
fn check_typed_values(desc: &RecordDescriptor, row: &Row) -> Result<(), String> {
    for column in desc.columns {
        let is_uuid = column.pg_type.is_some_and(|t| t.eq_ignore_ascii_case("uuid"));
        if !is_uuid {
            continue;
        }
        if let Some(Value::String(s)) = row.get(column.name) {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(format!("{}.{}: '{}' is not a valid uuid", desc.name, column.name, s));
            }
        }
    }
    Ok(())
}

pub struct ResourceService<T> {
    gateway: Arc<dyn Gateway>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceService<T> {
    fn clone(&self) -> Self {
        ResourceService {
            gateway: self.gateway.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> ResourceService<T> {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        ResourceService {
            gateway,
            _record: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &'static RecordDescriptor {
        T::descriptor()
    }

    /// Insert the record's own columns. Child collections in the payload are not stored,
    /// and the returned record carries none.
    pub async fn create(&self, payload: &[u8]) -> Result<T, AppError> {
        let desc = T::descriptor();
        let record: T = decode(payload)?;
        let mut row = record_row(desc, &record).map_err(StoreError::from)?;
        check_typed_values(desc, &row).map_err(AppError::BadRequest)?;
        let id = self.gateway.insert(desc, &row).await?;
        tracing::info!(resource = desc.name, id, "created");
        row.insert(desc.id_column.to_string(), Value::from(id));
        from_stored(Value::Object(row))
    }

    /// Insert the record and every child collection it declares in one transaction. Children
    /// get their parent's identifier before insert; any failure rolls the whole write back.
    pub async fn create_with_children(&self, payload: &[u8]) -> Result<T, AppError> {
        let desc = T::descriptor();
        let mut record: T = decode(payload)?;
        let row = record_row(desc, &record).map_err(StoreError::from)?;
        check_typed_values(desc, &row).map_err(AppError::BadRequest)?;

        let mut tx = self.gateway.begin().await?;
        let id = match tx.insert(desc, &row).await {
            Ok(id) => id,
            Err(e) => {
                rollback(tx, desc).await;
                return Err(e.into());
            }
        };
        record.set_id(id);

        let outcome = insert_children(&mut tx, desc, id, record.children()).await;
        match outcome {
            Ok(count) => {
                tx.commit().await?;
                tracing::info!(resource = desc.name, id, children = count, "created");
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(resource = desc.name, error = %e, "child insert failed, rolling back");
                rollback(tx, desc).await;
                Err(e)
            }
        }
    }

    /// Every record with the named relations loaded. No records at all is NotFound.
    pub async fn read_all<S: AsRef<str> + Sync>(&self, relations: &[S]) -> Result<Vec<T>, AppError> {
        let desc = T::descriptor();
        let includes = resolve_includes(desc, relations).map_err(AppError::UnknownRelation)?;
        let rows = self.gateway.find_all(desc, &includes).await?;
        if rows.is_empty() {
            return Err(AppError::NotFound(format!("no {} records", desc.name)));
        }
        rows.into_iter().map(from_stored).collect()
    }

    pub async fn read_by_id<S: AsRef<str> + Sync>(&self, id: &str, relations: &[S]) -> Result<T, AppError> {
        let desc = T::descriptor();
        let id = parse_id(id)?;
        let includes = resolve_includes(desc, relations).map_err(AppError::UnknownRelation)?;
        let row = self
            .gateway
            .find_by_id(desc, id, &includes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", desc.name, id)))?;
        from_stored(row)
    }

    /// Apply the fields present in the payload; everything else keeps its stored value.
    /// Returns the record as stored after the write.
    pub async fn update(&self, id: &str, payload: &[u8]) -> Result<T, AppError> {
        let desc = T::descriptor();
        let id = parse_id(id)?;
        let patch: T::Patch = decode(payload)?;
        let row = record_row(desc, &patch).map_err(StoreError::from)?;
        check_typed_values(desc, &row).map_err(AppError::BadRequest)?;

        // Separate existence check; a delete landing before the write surfaces below.
        if self.gateway.find_by_id(desc, id, &[]).await?.is_none() {
            return Err(AppError::NotFound(format!("{} {}", desc.name, id)));
        }
        if !self.gateway.update_by_id(desc, id, &row).await? {
            return Err(AppError::NotFound(format!("{} {}", desc.name, id)));
        }
        tracing::info!(resource = desc.name, id, fields = row.len(), "updated");

        let stored = self
            .gateway
            .find_by_id(desc, id, &[])
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", desc.name, id)))?;
        from_stored(stored)
    }

    /// Delete the record and its descendants. A missing identifier is NotFound.
    pub async fn delete(&self, id: &str) -> Result<u64, AppError> {
        let desc = T::descriptor();
        let id = parse_id(id)?;
        if !self.gateway.delete_by_id(desc, id).await? {
            return Err(AppError::NotFound(format!("{} {}", desc.name, id)));
        }
        tracing::info!(resource = desc.name, id, "deleted");
        Ok(id)
    }
}

async fn rollback(tx: Box<dyn GatewayTx>, desc: &RecordDescriptor) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(resource = desc.name, error = %e, "rollback failed");
    }
}

/// Insert child sets breadth-first: the parent's collections in declaration order, each in
/// payload order, then the collections of those children. Returns the number of rows written.
async fn insert_children<'a>(
    tx: &mut Box<dyn GatewayTx>,
    parent: &'static RecordDescriptor,
    parent_id: u64,
    sets: Vec<ChildSet<'a>>,
) -> Result<usize, AppError> {
    let mut queue: VecDeque<(&'static RecordDescriptor, u64, ChildSet<'a>)> =
        sets.into_iter().map(|set| (parent, parent_id, set)).collect();
    let mut inserted = 0;

    while let Some((parent, parent_id, set)) = queue.pop_front() {
        let relation_name = set.relation;
        let relation = parent.relation(relation_name).ok_or_else(|| ConfigError::Descriptor {
            record: parent.name,
            message: format!("relation '{}' not declared", relation_name),
        })?;

        for (index, row) in set.rows.into_iter().enumerate() {
            let child = row.row_descriptor();
            if !std::ptr::eq(child, relation.child()) {
                return Err(ConfigError::Descriptor {
                    record: parent.name,
                    message: format!("relation '{}' holds {} rows", relation_name, child.name),
                }
                .into());
            }

            row.assign_parent(parent_id);
            let data = row.to_row().map_err(StoreError::from)?;
            check_typed_values(child, &data)
                .map_err(|m| AppError::BadRequest(format!("{}[{}]: {}", relation_name, index, m)))?;
            if data.get(relation.foreign_key).and_then(Value::as_u64) != Some(parent_id) {
                return Err(ConfigError::Descriptor {
                    record: child.name,
                    message: format!("foreign key '{}' not populated", relation.foreign_key),
                }
                .into());
            }

            let id = tx.insert(child, &data).await.map_err(|source| AppError::Child {
                relation: relation_name,
                index,
                source,
            })?;
            row.assign_id(id);
            inserted += 1;

            for nested in row.nested() {
                if !nested.is_empty() {
                    queue.push_back((child, id, nested));
                }
            }
        }
    }
    Ok(inserted)
}
