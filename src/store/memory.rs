//! In-memory gateway for tests and demos: uniqueness per descriptor, cascade delete,
//! nested eager loading and staged transactions.

use crate::error::StoreError;
use crate::model::{Include, RecordDescriptor, Row};
use crate::sql::MAX_RELATION_DEPTH;
use crate::store::{Gateway, GatewayTx};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Shared in-memory store. Clones share the same tables; every operation, and every open
/// transaction for its whole lifetime, holds the store lock.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    tables: Arc<Mutex<Tables>>,
    offline: Arc<AtomicBool>,
}

#[derive(Clone, Default)]
struct Tables {
    rows: HashMap<String, BTreeMap<u64, Row>>,
    sequences: HashMap<String, u64>,
}

fn table_key(desc: &RecordDescriptor) -> String {
    match desc.schema {
        Some(schema) => format!("{}.{}", schema, desc.table),
        None => desc.table.to_string(),
    }
}

impl Tables {
    fn insert(&mut self, desc: &RecordDescriptor, row: &Row) -> Result<u64, StoreError> {
        let mut stored = Row::new();
        for c in desc.columns {
            if let Some(v) = row.get(c.name) {
                stored.insert(c.name.to_string(), v.clone());
            }
        }
        self.check_unique(desc, &stored, None)?;
        let key = table_key(desc);
        let seq = self.sequences.entry(key.clone()).or_insert(0);
        *seq += 1;
        let id = *seq;
        stored.insert(desc.id_column.to_string(), Value::from(id));
        self.rows.entry(key).or_default().insert(id, stored);
        Ok(id)
    }

    fn check_unique(&self, desc: &RecordDescriptor, candidate: &Row, skip: Option<u64>) -> Result<(), StoreError> {
        let Some(table) = self.rows.get(&table_key(desc)) else {
            return Ok(());
        };
        for col in desc.unique_columns() {
            let Some(v) = candidate.get(col.name).filter(|v| !v.is_null()) else {
                continue;
            };
            if table
                .iter()
                .any(|(id, r)| Some(*id) != skip && r.get(col.name) == Some(v))
            {
                return Err(StoreError::unique(format!(
                    "duplicate key value violates unique constraint \"{}_{}_key\"",
                    desc.table, col.name
                )));
            }
        }
        Ok(())
    }

    fn get(&self, desc: &RecordDescriptor, id: u64) -> Option<&Row> {
        self.rows.get(&table_key(desc)).and_then(|t| t.get(&id))
    }

    fn children_of(&self, child: &RecordDescriptor, foreign_key: &str, parent_id: u64) -> Vec<(u64, &Row)> {
        self.rows
            .get(&table_key(child))
            .map(|t| {
                t.iter()
                    .filter(|(_, r)| r.get(foreign_key).and_then(Value::as_u64) == Some(parent_id))
                    .map(|(id, r)| (*id, r))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn load(&self, row: &Row, id: u64, includes: &[Include], depth: usize) -> Value {
        let mut obj = row.clone();
        if depth < MAX_RELATION_DEPTH {
            for inc in includes {
                let child = inc.child();
                let children: Vec<Value> = self
                    .children_of(child, inc.relation.foreign_key, id)
                    .into_iter()
                    .map(|(cid, crow)| self.load(crow, cid, &inc.nested, depth + 1))
                    .collect();
                obj.insert(inc.relation.name.to_string(), Value::Array(children));
            }
        }
        Value::Object(obj)
    }

    fn update(&mut self, desc: &RecordDescriptor, id: u64, patch: &Row) -> Result<bool, StoreError> {
        let Some(existing) = self.get(desc, id) else {
            return Ok(false);
        };
        let mut merged = existing.clone();
        for c in desc.columns {
            if let Some(v) = patch.get(c.name) {
                merged.insert(c.name.to_string(), v.clone());
            }
        }
        self.check_unique(desc, &merged, Some(id))?;
        if let Some(table) = self.rows.get_mut(&table_key(desc)) {
            table.insert(id, merged);
        }
        Ok(true)
    }

    fn delete(&mut self, desc: &RecordDescriptor, id: u64, depth: usize) -> bool {
        if depth < MAX_RELATION_DEPTH {
            for rel in desc.relations {
                let child = rel.child();
                let child_ids: Vec<u64> = self
                    .children_of(child, rel.foreign_key, id)
                    .into_iter()
                    .map(|(cid, _)| cid)
                    .collect();
                for cid in child_ids {
                    self.delete(child, cid, depth + 1);
                }
            }
        }
        self.rows
            .get_mut(&table_key(desc))
            .and_then(|t| t.remove(&id))
            .is_some()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail as a backend outage would.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored rows for a descriptor.
    pub async fn row_count(&self, desc: &RecordDescriptor) -> usize {
        let tables = self.tables.lock().await;
        tables.rows.get(&table_key(desc)).map(BTreeMap::len).unwrap_or(0)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::other("backend offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn insert(&self, desc: &'static RecordDescriptor, row: &Row) -> Result<u64, StoreError> {
        self.check_online()?;
        let mut tables = self.tables.lock().await;
        tables.insert(desc, row)
    }

    async fn find_all(
        &self,
        desc: &'static RecordDescriptor,
        includes: &[Include],
    ) -> Result<Vec<Value>, StoreError> {
        self.check_online()?;
        let tables = self.tables.lock().await;
        let out = tables
            .rows
            .get(&table_key(desc))
            .map(|t| t.iter().map(|(id, r)| tables.load(r, *id, includes, 0)).collect())
            .unwrap_or_default();
        Ok(out)
    }

    async fn find_by_id(
        &self,
        desc: &'static RecordDescriptor,
        id: u64,
        includes: &[Include],
    ) -> Result<Option<Value>, StoreError> {
        self.check_online()?;
        let tables = self.tables.lock().await;
        Ok(tables.get(desc, id).map(|r| tables.load(r, id, includes, 0)))
    }

    async fn update_by_id(
        &self,
        desc: &'static RecordDescriptor,
        id: u64,
        patch: &Row,
    ) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut tables = self.tables.lock().await;
        tables.update(desc, id, patch)
    }

    async fn delete_by_id(&self, desc: &'static RecordDescriptor, id: u64) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut tables = self.tables.lock().await;
        Ok(tables.delete(desc, id, 0))
    }

    async fn begin(&self) -> Result<Box<dyn GatewayTx>, StoreError> {
        self.check_online()?;
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}

/// Writes go to a private copy that replaces the shared tables on commit.
struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl GatewayTx for MemoryTx {
    async fn insert(&mut self, desc: &'static RecordDescriptor, row: &Row) -> Result<u64, StoreError> {
        self.working.insert(desc, row)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
